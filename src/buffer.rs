//! Pixel buffer helpers
//!
//! The engine works on `image::RgbaImage` (row-major RGBA8). These helpers
//! cover the decoder boundary and the linear-index bookkeeping shared by the
//! flood fill and the mask passes.

use image::{Rgba, RgbaImage};
use crate::error::{EngineError, Result};

/// Wrap a decoded RGBA byte array as an image, checking its length.
pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<RgbaImage> {
    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        return Err(EngineError::InvalidInput(format!(
            "buffer holds {} bytes, {}x{} RGBA needs {}",
            data.len(),
            width,
            height,
            expected
        )));
    }

    RgbaImage::from_raw(width, height, data).ok_or_else(|| {
        EngineError::InvalidInput(format!("cannot build {}x{} image", width, height))
    })
}

/// Bounds-checked pixel read
pub fn pixel_at(img: &RgbaImage, x: u32, y: u32) -> Result<Rgba<u8>> {
    img.get_pixel_checked(x, y).copied().ok_or(EngineError::OutOfBounds {
        x,
        y,
        width: img.width(),
        height: img.height(),
    })
}

#[inline]
pub(crate) fn linear_index(x: u32, y: u32, width: u32) -> usize {
    y as usize * width as usize + x as usize
}

/// Fixed-size bit set keyed by linear pixel index.
pub(crate) struct PixelBitSet {
    words: Vec<u64>,
}

impl PixelBitSet {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
        }
    }

    /// Sets the bit, returning true if it was previously clear.
    #[inline]
    pub(crate) fn insert(&mut self, idx: usize) -> bool {
        let word = &mut self.words[idx / 64];
        let bit = 1u64 << (idx % 64);
        let was_clear = *word & bit == 0;
        *word |= bit;
        was_clear
    }
}
