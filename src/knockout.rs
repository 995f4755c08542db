//! Color knockout (chroma key)
//!
//! Removes every pixel within a Euclidean RGB radius of any target color.
//! Passes:
//! 1. Classify every pixel as matched/unmatched, O(W*H)
//! 2. Anti-alias: for matched pixels only, distance to the nearest unmatched
//!    pixel in the 3x3 window gives a one-pixel soft edge, O(9 * matched).
//!    Disabling anti-aliasing skips this pass entirely.
//! 3. Apply the replace mode
//! 4. Optional alpha feather
//!
//! Runs on a copy; the input image is never modified.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::buffer::linear_index;
use crate::colorspace::{color_distance, RgbColor, MAX_RGB_DISTANCE};
use crate::error::{EngineError, Result};
use crate::feather::feather_alpha;
use crate::progress::{ProgressSink, Silent, Stage, StageReporter};

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplaceMode {
    /// Fade matched pixels to transparent
    Transparency,
    /// Flatten matched pixels to opaque white
    Color,
    /// Black/white debug overlay of the knockout mask
    Mask,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnockoutSettings {
    /// 0-100, scaled onto the full RGB distance range (default: 30)
    pub tolerance: f64,
    pub replace_mode: ReplaceMode,
    /// Alpha blur radius in pixels, 0-20 (default: 0)
    pub feather: u32,
    /// Soften the one-pixel boundary of the knockout (default: true)
    pub anti_aliasing: bool,
}

impl Default for KnockoutSettings {
    fn default() -> Self {
        Self {
            tolerance: 30.0,
            replace_mode: ReplaceMode::Transparency,
            feather: 0,
            anti_aliasing: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KnockoutResult {
    pub image: RgbaImage,
    /// Pixels within tolerance of any target
    pub matched: usize,
    /// Matched pixels that touch an unmatched neighbor
    pub edge_pixels: usize,
}

/// Sentinel grid distance for matched pixels with no unmatched neighbor
const INTERIOR_DISTANCE: f64 = 2.0;

// ============================================================================
// MATCHING
// ============================================================================

pub fn knockout_threshold(tolerance: f64) -> f64 {
    (tolerance.clamp(0.0, 100.0) / 100.0) * MAX_RGB_DISTANCE
}

/// True if `pixel` is within `threshold` of any target.
#[inline]
pub fn matches_any_color(pixel: RgbColor, targets: &[RgbColor], threshold: f64) -> bool {
    targets.iter().any(|&c| color_distance(pixel, c) <= threshold)
}

/// Grid distance to the nearest unmatched pixel in the 3x3 window, or the
/// interior sentinel when there is none. Out-of-image neighbors are ignored.
fn edge_distance(matched: &[bool], x: u32, y: u32, width: u32, height: u32) -> f64 {
    let mut nearest = INTERIOR_DISTANCE;
    for dy in -1i32..=1 {
        for dx in -1i32..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x as i64 + dx as i64;
            let ny = y as i64 + dy as i64;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                continue;
            }
            if !matched[linear_index(nx as u32, ny as u32, width)] {
                let d = ((dx * dx + dy * dy) as f64).sqrt();
                nearest = nearest.min(d);
            }
        }
    }
    nearest
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

pub fn knockout(img: &RgbaImage, targets: &[RgbColor], settings: &KnockoutSettings) -> Result<KnockoutResult> {
    knockout_with_progress(img, targets, settings, &mut Silent)
}

pub fn knockout_with_progress(
    img: &RgbaImage,
    targets: &[RgbColor],
    settings: &KnockoutSettings,
    progress: &mut dyn ProgressSink,
) -> Result<KnockoutResult> {
    if targets.is_empty() {
        return Err(EngineError::NoColorsSelected);
    }

    let (width, height) = img.dimensions();
    let threshold = knockout_threshold(settings.tolerance);

    // Pass 1: classify
    let mut matched = vec![false; width as usize * height as usize];
    let mut matched_count = 0usize;
    let mut reporter = StageReporter::rows(progress, Stage::Classify, height);
    for y in 0..height {
        for x in 0..width {
            let pixel = RgbColor::from_pixel(img.get_pixel(x, y));
            if matches_any_color(pixel, targets, threshold) {
                matched[linear_index(x, y, width)] = true;
                matched_count += 1;
            }
        }
        reporter.tick(y as u64 + 1);
    }
    reporter.finish();

    // Pass 2: alpha modifier per matched pixel (0 = untouched, 1 = fully knocked out)
    let mut modifier = vec![0.0f64; matched.len()];
    let mut edge_pixels = 0usize;
    if settings.anti_aliasing {
        let mut reporter = StageReporter::rows(progress, Stage::AntiAlias, height);
        for y in 0..height {
            for x in 0..width {
                let idx = linear_index(x, y, width);
                if !matched[idx] {
                    continue;
                }
                let distance = edge_distance(&matched, x, y, width, height);
                if distance < INTERIOR_DISTANCE {
                    edge_pixels += 1;
                }
                modifier[idx] = distance.min(INTERIOR_DISTANCE) / INTERIOR_DISTANCE;
            }
            reporter.tick(y as u64 + 1);
        }
        reporter.finish();
    } else {
        for (m, &hit) in modifier.iter_mut().zip(&matched) {
            if hit {
                *m = 1.0;
            }
        }
    }

    // Pass 3: apply
    let mut out = img.clone();
    let mut reporter = StageReporter::rows(progress, Stage::Apply, height);
    for y in 0..height {
        for x in 0..width {
            let idx = linear_index(x, y, width);
            let pixel = out.get_pixel_mut(x, y);
            match settings.replace_mode {
                ReplaceMode::Transparency => {
                    if matched[idx] {
                        pixel[3] = (255.0 * (1.0 - modifier[idx])).round() as u8;
                    }
                }
                ReplaceMode::Color => {
                    if matched[idx] {
                        *pixel = Rgba([255, 255, 255, 255]);
                    }
                }
                ReplaceMode::Mask => {
                    *pixel = if modifier[idx] > 0.5 {
                        Rgba([0, 0, 0, 255])
                    } else {
                        Rgba([255, 255, 255, 255])
                    };
                }
            }
        }
        reporter.tick(y as u64 + 1);
    }
    reporter.finish();

    // Pass 4: feather
    if settings.feather > 0 {
        feather_alpha(&mut out, settings.feather, progress);
    }

    tracing::debug!(
        targets = targets.len(),
        threshold,
        matched = matched_count,
        edge_pixels,
        "knockout applied"
    );

    Ok(KnockoutResult {
        image: out,
        matched: matched_count,
        edge_pixels,
    })
}

// ============================================================================
// TESTS
// ============================================================================
