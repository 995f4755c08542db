//! Perceptual flood fill
//!
//! Grows a 4-connected region from a seed pixel, accepting neighbors whose
//! CIEDE2000 distance to the seed color is within tolerance. Iterative BFS
//! with a bit set keyed by linear index; growth stops at a pixel cap.

use std::collections::VecDeque;

use image::{GrayImage, Luma, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::buffer::{linear_index, pixel_at, PixelBitSet};
use crate::colorspace::{delta_e2000, rgb_to_lab, LabColor, RgbColor};
use crate::error::{EngineError, Result};
use crate::progress::{ProgressSink, Silent, Stage, StageReporter};

/// Pixels with alpha below this are treated as region boundaries
pub const MIN_REGION_ALPHA: u8 = 10;

pub const DEFAULT_MAX_PIXELS: usize = 1_000_000;

const FILL_REPORT_INTERVAL: u64 = 4096;

// ============================================================================
// SETTINGS
// ============================================================================

/// What to do when growth reaches `max_pixels`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitPolicy {
    /// Return the region found so far with `truncated` set
    Truncate,
    /// Fail with `ResourceLimitExceeded`
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionSettings {
    /// CIEDE2000 distance from the seed color (default: 10)
    pub tolerance: f64,
    /// Safety cap on accepted pixels (default: 1,000,000)
    pub max_pixels: usize,
    pub limit_policy: LimitPolicy,
}

impl Default for RegionSettings {
    fn default() -> Self {
        Self {
            tolerance: 10.0,
            max_pixels: DEFAULT_MAX_PIXELS,
            limit_policy: LimitPolicy::Truncate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorRegion {
    /// Accepted pixels in discovery order
    pub pixels: Vec<(u32, u32)>,
    pub bounds: Bounds,
    pub average_color: RgbColor,
    pub lab_color: LabColor,
    pub pixel_count: usize,
    /// Percent of the whole image
    pub coverage: f64,
    /// Uniformity score 0-100 (100 = every pixel matches the seed exactly)
    pub confidence: f64,
    /// Growth hit `max_pixels` before the region was exhausted
    pub truncated: bool,
}

impl ColorRegion {
    /// Rasterize as a selection mask (255 inside the region, 0 elsewhere).
    pub fn mask(&self, width: u32, height: u32) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        for &(x, y) in &self.pixels {
            if x < width && y < height {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        mask
    }
}

// ============================================================================
// FLOOD FILL
// ============================================================================

pub fn detect_region(img: &RgbaImage, seed: (u32, u32), settings: &RegionSettings) -> Result<ColorRegion> {
    detect_region_with_progress(img, seed, settings, &mut Silent)
}

pub fn detect_region_with_progress(
    img: &RgbaImage,
    seed: (u32, u32),
    settings: &RegionSettings,
    progress: &mut dyn ProgressSink,
) -> Result<ColorRegion> {
    let (width, height) = img.dimensions();
    let (seed_x, seed_y) = seed;

    let seed_pixel = pixel_at(img, seed_x, seed_y)?;
    if seed_pixel[3] < MIN_REGION_ALPHA {
        return Err(EngineError::TransparentSeed {
            x: seed_x,
            y: seed_y,
            alpha: seed_pixel[3],
        });
    }

    let seed_lab = rgb_to_lab(RgbColor::from_pixel(&seed_pixel));
    let tolerance = settings.tolerance.max(0.0);
    let max_pixels = settings.max_pixels;
    let total = width as usize * height as usize;

    let mut visited = PixelBitSet::new(total);
    let mut queue: VecDeque<(u32, u32)> = VecDeque::with_capacity(1024);
    let mut accepted: Vec<(u32, u32)> = Vec::new();
    let mut delta_sum = 0.0f64;
    let mut sums = [0u64; 3];
    let mut bounds = Bounds {
        min_x: seed_x,
        min_y: seed_y,
        max_x: seed_x,
        max_y: seed_y,
    };
    let mut truncated = false;

    let mut reporter = StageReporter::new(
        progress,
        Stage::Fill,
        max_pixels.min(total) as u64,
        FILL_REPORT_INTERVAL,
    );

    visited.insert(linear_index(seed_x, seed_y, width));
    queue.push_back((seed_x, seed_y));

    while let Some((x, y)) = queue.pop_front() {
        let pixel = img.get_pixel(x, y);
        if pixel[3] < MIN_REGION_ALPHA {
            continue;
        }

        let delta = delta_e2000(seed_lab, rgb_to_lab(RgbColor::from_pixel(pixel)));
        if delta > tolerance {
            continue;
        }

        // Only a pixel that would have been accepted counts as hitting the cap
        if accepted.len() >= max_pixels {
            truncated = true;
            break;
        }

        accepted.push((x, y));
        delta_sum += delta;
        sums[0] += pixel[0] as u64;
        sums[1] += pixel[1] as u64;
        sums[2] += pixel[2] as u64;
        bounds.min_x = bounds.min_x.min(x);
        bounds.min_y = bounds.min_y.min(y);
        bounds.max_x = bounds.max_x.max(x);
        bounds.max_y = bounds.max_y.max(y);
        reporter.tick(accepted.len() as u64);

        let neighbors = [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ];
        for (nx, ny) in neighbors {
            if nx >= width || ny >= height {
                continue;
            }
            if visited.insert(linear_index(nx, ny, width)) {
                queue.push_back((nx, ny));
            }
        }
    }
    reporter.finish();

    let count = accepted.len();
    if count == 0 {
        return Err(EngineError::NoMatch);
    }

    if truncated {
        tracing::warn!(limit = max_pixels, "flood fill reached pixel limit");
        if settings.limit_policy == LimitPolicy::Fail {
            return Err(EngineError::ResourceLimitExceeded { limit: max_pixels });
        }
    }

    let average_color = RgbColor::new(
        (sums[0] as f64 / count as f64).round() as u8,
        (sums[1] as f64 / count as f64).round() as u8,
        (sums[2] as f64 / count as f64).round() as u8,
    );

    let mean_delta = delta_sum / count as f64;
    let confidence = if tolerance > 0.0 {
        (100.0 - (mean_delta / tolerance) * 100.0).clamp(0.0, 100.0)
    } else {
        100.0
    };

    tracing::debug!(
        seed_x,
        seed_y,
        pixels = count,
        confidence,
        truncated,
        "region detected"
    );

    Ok(ColorRegion {
        pixels: accepted,
        bounds,
        average_color,
        lab_color: rgb_to_lab(average_color),
        pixel_count: count,
        coverage: count as f64 / total as f64 * 100.0,
        confidence,
        truncated,
    })
}

// ============================================================================
// TESTS
// ============================================================================
