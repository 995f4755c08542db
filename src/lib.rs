//! Pixel-level color processing engine for the photo editor.
//!
//! Every operation takes a decoded `RgbaImage` plus a settings struct and
//! returns either a new image or a descriptor. Inputs are borrowed, so a
//! failed call never leaves a half-processed buffer behind.
//!
//! - [`knockout`]: chroma-key removal with soft edges
//! - [`palette_extract`]: dominant colors from a quantized histogram
//! - [`region`]: perceptual flood fill from a seed pixel
//! - [`recolor`]: palette-slot substitution with blend modes
//! - [`texture_cut`]: luma-driven alpha cutting

pub mod buffer;
pub mod colorspace;
pub mod error;
pub mod feather;
pub mod knockout;
pub mod palette_extract;
pub mod progress;
pub mod recolor;
pub mod region;
pub mod texture_cut;

pub use colorspace::{LabColor, RgbColor};
pub use error::{EngineError, ErrorKind, Result};
pub use knockout::{knockout, KnockoutResult, KnockoutSettings, ReplaceMode};
pub use palette_extract::{extract_palette, ColorInfo, PaletteAlgorithm, PaletteSettings, PaletteSize};
pub use progress::{Progress, ProgressSink, Silent, Stage};
pub use recolor::{recolor, BlendMode, ColorMapping, MappingApplication, RecolorResult, RecolorSettings};
pub use region::{detect_region, ColorRegion, LimitPolicy, RegionSettings};
pub use texture_cut::{cut_with_texture, CutResult, CutSettings, TransformSettings};
