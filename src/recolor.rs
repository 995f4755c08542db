//! Palette-slot recoloring
//!
//! Each mapping swaps one palette slot for a new color. A pixel belongs to a
//! slot when every channel is inside an axis-aligned window around the slot
//! color (a cube, unlike knockout's Euclidean sphere).

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::colorspace::{delta_e2000, hex_to_rgb, rgb_to_lab, RgbColor};
use crate::error::{EngineError, Result};
use crate::palette_extract::ColorInfo;
use crate::progress::{ProgressSink, Silent, Stage, StageReporter, ROW_INTERVAL};

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorMapping {
    /// Index into the palette the mapping is applied against
    pub slot: usize,
    /// Replacement color as hex
    pub new_hex: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    Replace,
    Overlay,
    Multiply,
}

impl BlendMode {
    #[inline]
    pub fn blend(self, old: u8, new: u8) -> u8 {
        match self {
            BlendMode::Replace => new,
            BlendMode::Overlay => ((old as f64 + new as f64) / 2.0).round() as u8,
            BlendMode::Multiply => ((old as f64 * new as f64) / 255.0).round() as u8,
        }
    }
}

/// How mappings interact when a pixel falls inside several windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingApplication {
    /// Mappings run in list order over the same buffer, so a later mapping
    /// sees (and may re-match) pixels an earlier one already recolored.
    Sequential,
    /// Every mapping matches and blends against the untouched input; when
    /// several match one pixel the last mapping in the list wins.
    FromOriginal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecolorSettings {
    pub mappings: Vec<ColorMapping>,
    pub blend_mode: BlendMode,
    /// 0-100, scaled to a per-channel window of 0-255 (default: 20)
    pub tolerance: f64,
    /// Leave every pixel with alpha < 255 alone (default: true)
    pub preserve_transparency: bool,
    pub application: MappingApplication,
}

impl Default for RecolorSettings {
    fn default() -> Self {
        Self {
            mappings: Vec::new(),
            blend_mode: BlendMode::Replace,
            tolerance: 20.0,
            preserve_transparency: true,
            application: MappingApplication::Sequential,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecolorResult {
    pub image: RgbaImage,
    /// Pixels whose RGB each mapping actually changed, in mapping order
    pub affected: Vec<usize>,
}

/// Why two mappings may interfere
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictReason {
    /// The two slot colors are perceptually close, so their windows overlap
    SimilarSlots { delta_e: f64 },
    /// The earlier mapping's output lands inside the later mapping's window
    Chained,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingConflict {
    /// Position of the earlier mapping in the list
    pub first: usize,
    /// Position of the later mapping in the list
    pub second: usize,
    pub reason: ConflictReason,
}

// ============================================================================
// MATCHING
// ============================================================================

pub fn channel_window(tolerance: f64) -> f64 {
    (tolerance.clamp(0.0, 100.0) / 100.0) * 255.0
}

/// Per-channel window test; an exact match always counts, even at zero tolerance.
#[inline]
pub fn in_window(pixel: RgbColor, slot: RgbColor, window: f64) -> bool {
    let inside = |a: u8, b: u8| {
        let d = (a as i16 - b as i16).abs();
        d == 0 || (d as f64) < window
    };
    inside(pixel.r, slot.r) && inside(pixel.g, slot.g) && inside(pixel.b, slot.b)
}

/// Resolve mappings against the palette, failing before any pixel is touched.
fn resolve_mappings(palette: &[RgbColor], mappings: &[ColorMapping]) -> Result<Vec<(RgbColor, RgbColor)>> {
    if mappings.is_empty() {
        return Err(EngineError::NoMappings);
    }

    mappings
        .iter()
        .map(|m| {
            let slot = *palette.get(m.slot).ok_or(EngineError::InvalidSlotIndex {
                index: m.slot,
                len: palette.len(),
            })?;
            Ok((slot, hex_to_rgb(&m.new_hex)?))
        })
        .collect()
}

/// Palette slot colors in order, for feeding extractor output into `recolor`.
pub fn slot_colors(palette: &[ColorInfo]) -> Vec<RgbColor> {
    palette.iter().map(|c| c.rgb).collect()
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

pub fn recolor(img: &RgbaImage, palette: &[RgbColor], settings: &RecolorSettings) -> Result<RecolorResult> {
    recolor_with_progress(img, palette, settings, &mut Silent)
}

pub fn recolor_with_progress(
    img: &RgbaImage,
    palette: &[RgbColor],
    settings: &RecolorSettings,
    progress: &mut dyn ProgressSink,
) -> Result<RecolorResult> {
    let resolved = resolve_mappings(palette, &settings.mappings)?;
    let window = channel_window(settings.tolerance);
    let blend = settings.blend_mode;
    let (width, height) = img.dimensions();

    let mut out = img.clone();
    let mut affected = Vec::with_capacity(resolved.len());
    let mut reporter = StageReporter::new(
        progress,
        Stage::Recolor,
        height as u64 * resolved.len() as u64,
        ROW_INTERVAL as u64,
    );

    for (i, &(slot, new)) in resolved.iter().enumerate() {
        let mut changed = 0usize;

        for y in 0..height {
            for x in 0..width {
                let source = match settings.application {
                    MappingApplication::Sequential => *out.get_pixel(x, y),
                    MappingApplication::FromOriginal => *img.get_pixel(x, y),
                };

                if settings.preserve_transparency && img.get_pixel(x, y)[3] < 255 {
                    continue;
                }
                if !in_window(RgbColor::from_pixel(&source), slot, window) {
                    continue;
                }

                let blended = [
                    blend.blend(source[0], new.r),
                    blend.blend(source[1], new.g),
                    blend.blend(source[2], new.b),
                ];
                let pixel = out.get_pixel_mut(x, y);
                if pixel.0[..3] != blended {
                    pixel.0[..3].copy_from_slice(&blended);
                    changed += 1;
                }
            }
            reporter.tick(i as u64 * height as u64 + y as u64 + 1);
        }

        affected.push(changed);
    }
    reporter.finish();

    tracing::debug!(
        mappings = resolved.len(),
        window,
        affected = affected.iter().sum::<usize>(),
        "recolor applied"
    );

    Ok(RecolorResult { image: out, affected })
}

/// Flag mapping pairs likely to interfere: slots closer than `delta_e_threshold`
/// (CIEDE2000), or an earlier mapping whose output falls in a later slot's window.
pub fn mapping_conflicts(
    palette: &[RgbColor],
    settings: &RecolorSettings,
    delta_e_threshold: f64,
) -> Result<Vec<MappingConflict>> {
    let resolved = resolve_mappings(palette, &settings.mappings)?;
    let window = channel_window(settings.tolerance);
    let mut conflicts = Vec::new();

    for (first, &(slot_a, new_a)) in resolved.iter().enumerate() {
        for (offset, &(slot_b, _)) in resolved[first + 1..].iter().enumerate() {
            let second = first + 1 + offset;

            let delta_e = delta_e2000(rgb_to_lab(slot_a), rgb_to_lab(slot_b));
            if delta_e < delta_e_threshold {
                conflicts.push(MappingConflict {
                    first,
                    second,
                    reason: ConflictReason::SimilarSlots { delta_e },
                });
            }

            if settings.application == MappingApplication::Sequential
                && in_window(new_a, slot_b, window)
            {
                conflicts.push(MappingConflict {
                    first,
                    second,
                    reason: ConflictReason::Chained,
                });
            }
        }
    }

    Ok(conflicts)
}

// ============================================================================
// TESTS
// ============================================================================
