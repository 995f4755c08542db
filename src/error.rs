use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed hex color: {0:?}")]
    MalformedHex(String),

    #[error("No colors selected")]
    NoColorsSelected,

    #[error("No color mappings provided")]
    NoMappings,

    #[error("Coordinate ({x}, {y}) is outside the {width}x{height} image")]
    OutOfBounds { x: u32, y: u32, width: u32, height: u32 },

    #[error("Seed pixel ({x}, {y}) is transparent (alpha {alpha})")]
    TransparentSeed { x: u32, y: u32, alpha: u8 },

    #[error("No pixels matched the seed color")]
    NoMatch,

    #[error("No usable pixels to build a palette from")]
    EmptyPalette,

    #[error("Palette slot {index} does not exist (palette has {len} slots)")]
    InvalidSlotIndex { index: usize, len: usize },

    #[error("Region growth stopped at the {limit} pixel limit")]
    ResourceLimitExceeded { limit: usize },
}

/// Coarse failure classes the calling layer builds user-facing messages from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    OutOfBounds,
    TransparentSeed,
    NoMatch,
    EmptyPalette,
    InvalidSlotIndex,
    ResourceLimitExceeded,
    Io,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidInput(_)
            | EngineError::MalformedHex(_)
            | EngineError::NoColorsSelected
            | EngineError::NoMappings
            | EngineError::Json(_) => ErrorKind::InvalidInput,
            EngineError::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            EngineError::TransparentSeed { .. } => ErrorKind::TransparentSeed,
            EngineError::NoMatch => ErrorKind::NoMatch,
            EngineError::EmptyPalette => ErrorKind::EmptyPalette,
            EngineError::InvalidSlotIndex { .. } => ErrorKind::InvalidSlotIndex,
            EngineError::ResourceLimitExceeded { .. } => ErrorKind::ResourceLimitExceeded,
            EngineError::Image(_) | EngineError::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

// Serialize as the display string for JSON-speaking callers
impl serde::Serialize for EngineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
