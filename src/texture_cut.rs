//! Texture-driven alpha cutting
//!
//! The texture is rendered onto a canvas the size of the base image (rotated
//! and scaled about the base image's center, then stretched or tiled), and
//! its luma drives how much of each base pixel's alpha survives: dark texture
//! cuts toward transparent, bright texture keeps the alpha.
//!
//! Pixels are addressed by their centers, so the pivot of a `w` x `h` canvas
//! is `((w - 1) / 2, (h - 1) / 2)`. Canvas pixels the texture does not reach
//! read as transparent black and cut fully.

use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{warp, Interpolation, Projection};
use serde::{Deserialize, Serialize};

use crate::colorspace::luma;
use crate::error::{EngineError, Result};
use crate::feather::feather_alpha;
use crate::progress::{Progress, ProgressSink, Silent, Stage, StageReporter};

const MIN_SCALE: f64 = 0.1;

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CutSettings {
    /// Cut strength 0-1 (default: 1.0)
    pub amount: f64,
    /// Alpha blur radius in pixels, 0-20 (default: 0)
    pub feather_px: u32,
    /// Bright texture cuts instead of dark (default: false)
    pub invert: bool,
}

impl Default for CutSettings {
    fn default() -> Self {
        Self {
            amount: 1.0,
            feather_px: 0,
            invert: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformSettings {
    /// 0.1-5 (default: 1.0)
    pub scale: f64,
    /// Degrees, clockwise (default: 0)
    pub rotation: f64,
    /// Repeat the texture at its native size instead of stretching it (default: false)
    pub tile: bool,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            scale: 1.0,
            rotation: 0.0,
            tile: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CutResult {
    pub image: RgbaImage,
    /// Pixels whose alpha was lowered
    pub affected: usize,
}

// ============================================================================
// TEXTURE RENDERING
// ============================================================================

/// Center of the middle pixel (or the point between the two middle pixels)
fn pivot(width: u32, height: u32) -> (f32, f32) {
    ((width as f32 - 1.0) / 2.0, (height as f32 - 1.0) / 2.0)
}

/// Canvas-space transform: rotate and scale about the base image center.
fn canvas_projection(width: u32, height: u32, transform: &TransformSettings) -> Projection {
    let (cx, cy) = pivot(width, height);
    let scale = transform.scale.max(MIN_SCALE) as f32;

    Projection::translate(cx, cy)
        * Projection::rotate((transform.rotation as f32).to_radians())
        * Projection::scale(scale, scale)
        * Projection::translate(-cx, -cy)
}

/// Map a canvas coordinate back into untransformed texture space.
fn inverse_point(x: f32, y: f32, width: u32, height: u32, transform: &TransformSettings) -> (f32, f32) {
    let (cx, cy) = pivot(width, height);
    let scale = transform.scale.max(MIN_SCALE) as f32;
    let (sin, cos) = (transform.rotation as f32).to_radians().sin_cos();

    let dx = x - cx;
    let dy = y - cy;
    let rx = dx * cos + dy * sin;
    let ry = -dx * sin + dy * cos;

    (cx + rx / scale, cy + ry / scale)
}

/// Render `texture` onto a `width` x `height` canvas. Canvas pixels the
/// texture does not cover are left as transparent black.
pub fn render_texture(
    texture: &RgbaImage,
    width: u32,
    height: u32,
    transform: &TransformSettings,
) -> Result<RgbaImage> {
    let (tw, th) = texture.dimensions();
    if tw == 0 || th == 0 {
        return Err(EngineError::InvalidInput("texture has no pixels".to_string()));
    }
    if width == 0 || height == 0 {
        return Ok(RgbaImage::new(width, height));
    }

    if !transform.tile {
        let stretched = if (tw, th) == (width, height) {
            texture.clone()
        } else {
            image::imageops::resize(texture, width, height, FilterType::Triangle)
        };
        let projection = canvas_projection(width, height, transform);
        return Ok(warp(&stretched, &projection, Interpolation::Nearest, Rgba([0, 0, 0, 0])));
    }

    let mut canvas = RgbaImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let (u, v) = inverse_point(x as f32, y as f32, width, height, transform);
            let tx = (u.round() as i64).rem_euclid(tw as i64) as u32;
            let ty = (v.round() as i64).rem_euclid(th as i64) as u32;
            canvas.put_pixel(x, y, *texture.get_pixel(tx, ty));
        }
    }
    Ok(canvas)
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

pub fn cut_with_texture(
    base: &RgbaImage,
    texture: &RgbaImage,
    cut: &CutSettings,
    transform: &TransformSettings,
) -> Result<CutResult> {
    cut_with_texture_with_progress(base, texture, cut, transform, &mut Silent)
}

pub fn cut_with_texture_with_progress(
    base: &RgbaImage,
    texture: &RgbaImage,
    cut: &CutSettings,
    transform: &TransformSettings,
    progress: &mut dyn ProgressSink,
) -> Result<CutResult> {
    let (width, height) = base.dimensions();

    let canvas = render_texture(texture, width, height, transform)?;
    progress.report(Progress {
        stage: Stage::Render,
        done: 1,
        total: 1,
    });

    let amount = cut.amount.clamp(0.0, 1.0);
    let mut out = base.clone();
    let mut affected = 0usize;

    let mut reporter = StageReporter::rows(progress, Stage::Cut, height);
    for y in 0..height {
        for x in 0..width {
            let pixel = out.get_pixel_mut(x, y);
            let old_alpha = pixel[3];
            // Cutting never restores alpha
            if old_alpha == 0 {
                continue;
            }

            // Luma comes from RGB alone; texture alpha plays no part
            let tex = canvas.get_pixel(x, y);
            let mut l = luma(tex[0], tex[1], tex[2]);
            if cut.invert {
                l = 1.0 - l;
            }
            let strength = 1.0 - (1.0 - l) * amount;
            let new_alpha = (old_alpha as f64 * strength).floor().clamp(0.0, 255.0) as u8;

            if new_alpha < old_alpha {
                affected += 1;
            }
            pixel[3] = new_alpha;
        }
        reporter.tick(y as u64 + 1);
    }
    reporter.finish();

    if cut.feather_px > 0 {
        feather_alpha(&mut out, cut.feather_px, progress);
    }

    tracing::debug!(
        width,
        height,
        tile = transform.tile,
        rotation = transform.rotation,
        scale = transform.scale,
        affected,
        "texture cut applied"
    );

    Ok(CutResult { image: out, affected })
}

// ============================================================================
// TESTS
// ============================================================================
