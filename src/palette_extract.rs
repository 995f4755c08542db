//! Dominant color palette extraction
//!
//! Downscale, sample on a fixed stride, drop background/anti-alias pixels,
//! bucket what is left into a quantized histogram and keep the most frequent
//! buckets.

use std::borrow::Cow;
use std::collections::HashMap;

use image::imageops::FilterType;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::colorspace::{
    color_name, quantize_color, rgb_to_hex, rgb_to_hsl, HslColor, LightnessCategory, RgbColor,
};
use crate::error::{EngineError, Result};
use crate::progress::{ProgressSink, Silent, Stage, StageReporter};

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PaletteSize {
    Nine,
    ThirtySix,
}

impl PaletteSize {
    pub fn count(self) -> usize {
        match self {
            PaletteSize::Nine => 9,
            PaletteSize::ThirtySix => 36,
        }
    }
}

impl TryFrom<u32> for PaletteSize {
    type Error = String;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        match value {
            9 => Ok(PaletteSize::Nine),
            36 => Ok(PaletteSize::ThirtySix),
            other => Err(format!("palette size must be 9 or 36, got {}", other)),
        }
    }
}

impl From<PaletteSize> for u32 {
    fn from(size: PaletteSize) -> Self {
        size.count() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteAlgorithm {
    /// Fast pass: 300px working size, every 8th pixel, 16-wide buckets
    Smart,
    /// Finer pass: 500px working size, every 4th pixel, 8-wide buckets
    Detailed,
}

impl PaletteAlgorithm {
    pub fn max_dimension(self) -> u32 {
        match self {
            PaletteAlgorithm::Smart => 300,
            PaletteAlgorithm::Detailed => 500,
        }
    }

    pub fn sample_step(self) -> usize {
        match self {
            PaletteAlgorithm::Smart => 8,
            PaletteAlgorithm::Detailed => 4,
        }
    }

    pub fn bucket_size(self) -> u8 {
        match self {
            PaletteAlgorithm::Smart => 16,
            PaletteAlgorithm::Detailed => 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteSettings {
    pub palette_size: PaletteSize,
    pub algorithm: PaletteAlgorithm,
}

impl Default for PaletteSettings {
    fn default() -> Self {
        Self {
            palette_size: PaletteSize::Nine,
            algorithm: PaletteAlgorithm::Smart,
        }
    }
}

/// One dominant color. `percentage` and `prominence` are relative to the
/// pixels that survived sampling, not to the whole image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorInfo {
    pub hex: String,
    pub rgb: RgbColor,
    pub hsl: HslColor,
    pub percentage: f64,
    pub name: String,
    pub category: LightnessCategory,
    pub prominence: f64,
    pub pixel_count: usize,
}

// Pixels rejected before bucketing
const MIN_SAMPLE_ALPHA: u8 = 200;
const NEAR_WHITE: u8 = 250;
const NEAR_BLACK: u8 = 5;

const SAMPLE_REPORT_INTERVAL: u64 = 4096;

fn is_background(pixel: &image::Rgba<u8>) -> bool {
    let [r, g, b, a] = pixel.0;
    a < MIN_SAMPLE_ALPHA
        || (r > NEAR_WHITE && g > NEAR_WHITE && b > NEAR_WHITE)
        || (r < NEAR_BLACK && g < NEAR_BLACK && b < NEAR_BLACK)
}

/// Shrink so the longer side fits `max_dim`; small images are borrowed as-is.
fn working_copy(img: &RgbaImage, max_dim: u32) -> Cow<'_, RgbaImage> {
    let (width, height) = img.dimensions();
    let longest = width.max(height);
    if longest <= max_dim {
        return Cow::Borrowed(img);
    }

    let scale = max_dim as f64 / longest as f64;
    let new_width = ((width as f64 * scale).round() as u32).max(1);
    let new_height = ((height as f64 * scale).round() as u32).max(1);

    Cow::Owned(image::imageops::resize(img, new_width, new_height, FilterType::Triangle))
}

pub fn extract_palette(img: &RgbaImage, settings: &PaletteSettings) -> Result<Vec<ColorInfo>> {
    extract_palette_with_progress(img, settings, &mut Silent)
}

pub fn extract_palette_with_progress(
    img: &RgbaImage,
    settings: &PaletteSettings,
    progress: &mut dyn ProgressSink,
) -> Result<Vec<ColorInfo>> {
    let algorithm = settings.algorithm;
    let work = working_copy(img, algorithm.max_dimension());
    let step = algorithm.sample_step();
    let bucket = algorithm.bucket_size();

    let total_pixels = work.width() as usize * work.height() as usize;
    let mut reporter = StageReporter::new(
        progress,
        Stage::Sample,
        total_pixels.div_ceil(step) as u64,
        SAMPLE_REPORT_INTERVAL,
    );

    // Insertion-ordered histogram so equal counts keep first-seen order
    let mut slots: HashMap<RgbColor, usize> = HashMap::new();
    let mut buckets: Vec<(RgbColor, usize)> = Vec::new();
    let mut sampled = 0usize;

    for (n, pixel) in work.pixels().step_by(step).enumerate() {
        reporter.tick(n as u64 + 1);
        if is_background(pixel) {
            continue;
        }

        sampled += 1;
        let key = quantize_color(RgbColor::from_pixel(pixel), bucket);
        match slots.get(&key) {
            Some(&slot) => buckets[slot].1 += 1,
            None => {
                slots.insert(key, buckets.len());
                buckets.push((key, 1));
            }
        }
    }
    reporter.finish();

    if sampled == 0 {
        return Err(EngineError::EmptyPalette);
    }

    // Stable: ties stay in discovery order
    buckets.sort_by(|a, b| b.1.cmp(&a.1));
    buckets.truncate(settings.palette_size.count());

    let colors: Vec<ColorInfo> = buckets
        .into_iter()
        .map(|(rgb, count)| {
            let hsl = rgb_to_hsl(rgb);
            let prominence = count as f64 / sampled as f64;
            ColorInfo {
                hex: rgb_to_hex(rgb),
                rgb,
                hsl,
                percentage: prominence * 100.0,
                name: color_name(hsl),
                category: LightnessCategory::from_lightness(hsl.l),
                prominence,
                pixel_count: count,
            }
        })
        .collect();

    tracing::debug!(
        sampled,
        distinct = slots.len(),
        returned = colors.len(),
        "palette extracted"
    );

    Ok(colors)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_single_color_on_white() {
        let mut img = RgbaImage::from_pixel(40, 40, Rgba([255, 255, 255, 255]));
        for y in 10..30 {
            for x in 10..30 {
                img.put_pixel(x, y, Rgba([200, 40, 40, 255]));
            }
        }

        let palette = extract_palette(&img, &PaletteSettings::default()).unwrap();
        assert_eq!(palette.len(), 1);
        assert_eq!(palette[0].rgb, RgbColor::new(192, 32, 32));
        assert_eq!(palette[0].hex, "#c02020");
        assert!((palette[0].percentage - 100.0).abs() < 1e-9);
        assert!((palette[0].prominence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_transparent_image_is_empty() {
        let img = RgbaImage::from_pixel(16, 16, Rgba([120, 30, 200, 0]));
        let err = extract_palette(&img, &PaletteSettings::default()).unwrap_err();
        assert!(matches!(err, EngineError::EmptyPalette));
    }

    #[test]
    fn test_sorted_by_frequency_with_stable_ties() {
        // Stride 4 over a 16x4 image samples columns 0, 4, 8 and 12 of each row
        let mut img = RgbaImage::from_pixel(16, 4, Rgba([0, 0, 200, 255]));
        for y in 0..4 {
            img.put_pixel(0, y, Rgba([200, 0, 0, 255]));
            img.put_pixel(4, y, Rgba([0, 200, 0, 255]));
        }

        let settings = PaletteSettings {
            palette_size: PaletteSize::Nine,
            algorithm: PaletteAlgorithm::Detailed,
        };
        let palette = extract_palette(&img, &settings).unwrap();
        let order: Vec<_> = palette.iter().map(|c| (c.hex.as_str(), c.pixel_count)).collect();
        // Red and green tie; red was seen first
        assert_eq!(order, vec![("#0000c8", 8), ("#c80000", 4), ("#00c800", 4)]);
        assert!((palette[0].percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_palette_size_limits_output() {
        let mut img = RgbaImage::new(64, 64);
        for (i, pixel) in img.pixels_mut().enumerate() {
            let v = (i % 64) as u8 * 3 + 20;
            *pixel = Rgba([v, 255 - v, (v / 2) + 40, 255]);
        }
        let settings = PaletteSettings {
            palette_size: PaletteSize::Nine,
            algorithm: PaletteAlgorithm::Detailed,
        };
        let palette = extract_palette(&img, &settings).unwrap();
        assert_eq!(palette.len(), 9);
        for pair in palette.windows(2) {
            assert!(pair[0].pixel_count >= pair[1].pixel_count);
        }
    }

    #[test]
    fn test_large_image_is_downscaled() {
        let img = RgbaImage::from_pixel(900, 600, Rgba([90, 140, 60, 255]));
        let work = working_copy(&img, 300);
        assert_eq!(work.dimensions(), (300, 200));
    }

    #[test]
    fn test_palette_size_serde() {
        let settings: PaletteSettings =
            serde_json::from_str(r#"{"palette_size": 36, "algorithm": "detailed"}"#).unwrap();
        assert_eq!(settings.palette_size, PaletteSize::ThirtySix);
        assert!(serde_json::from_str::<PaletteSettings>(r#"{"palette_size": 10}"#).is_err());
    }
}
