//! Color space conversions and color difference metrics
//!
//! - sRGB <-> CIE L*a*b* (D65) and CIEDE2000 for perceptual comparisons
//! - Euclidean RGB distance for whole-image scans where LAB is too costly
//! - HSL (via the `palette` crate), hex strings, histogram bucketing, naming

use palette::{Hsl, IntoColor, Srgb};
use serde::{Deserialize, Serialize};
use crate::error::{EngineError, Result};

/// Largest possible Euclidean distance between two RGB colors, sqrt(255^2 * 3)
pub const MAX_RGB_DISTANCE: f64 = 441.673;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[inline]
    pub fn from_pixel(pixel: &image::Rgba<u8>) -> Self {
        Self::new(pixel[0], pixel[1], pixel[2])
    }
}

/// CIE L*a*b* color, D65 white point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabColor {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

/// Hue in degrees [0, 360), saturation and lightness in percent [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HslColor {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightnessCategory {
    Light,
    Mid,
    Dark,
}

impl LightnessCategory {
    pub fn from_lightness(l: f64) -> Self {
        if l >= 70.0 {
            LightnessCategory::Light
        } else if l < 30.0 {
            LightnessCategory::Dark
        } else {
            LightnessCategory::Mid
        }
    }
}

// ============================================================================
// RGB <-> LAB
// ============================================================================

// D65 reference white
const XN: f64 = 0.95047;
const YN: f64 = 1.00000;
const ZN: f64 = 1.08883;

const EPSILON: f64 = 0.008856;
const DELTA: f64 = 6.0 / 29.0;

fn srgb_to_linear(c: u8) -> f64 {
    let c = c as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f64) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let v = if c <= 0.0031308 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

fn lab_f(t: f64) -> f64 {
    if t > EPSILON {
        t.cbrt()
    } else {
        t / 3.0 * (29.0 / 6.0) * (29.0 / 6.0) + 4.0 / 29.0
    }
}

fn lab_f_inv(t: f64) -> f64 {
    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}

/// Convert sRGB (0-255) to L*a*b*
pub fn rgb_to_lab(color: RgbColor) -> LabColor {
    let rl = srgb_to_linear(color.r);
    let gl = srgb_to_linear(color.g);
    let bl = srgb_to_linear(color.b);

    let x = rl * 0.4124564 + gl * 0.3575761 + bl * 0.1804375;
    let y = rl * 0.2126729 + gl * 0.7151522 + bl * 0.0721750;
    let z = rl * 0.0193339 + gl * 0.1191920 + bl * 0.9503041;

    let fx = lab_f(x / XN);
    let fy = lab_f(y / YN);
    let fz = lab_f(z / ZN);

    LabColor {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// Convert L*a*b* back to sRGB, clamping out-of-gamut values
pub fn lab_to_rgb(lab: LabColor) -> RgbColor {
    let fy = (lab.l + 16.0) / 116.0;
    let fx = lab.a / 500.0 + fy;
    let fz = fy - lab.b / 200.0;

    let x = lab_f_inv(fx) * XN;
    let y = lab_f_inv(fy) * YN;
    let z = lab_f_inv(fz) * ZN;

    let rl = x * 3.2404542 + y * -1.5371385 + z * -0.4985314;
    let gl = x * -0.9692660 + y * 1.8760108 + z * 0.0415560;
    let bl = x * 0.0556434 + y * -0.2040259 + z * 1.0572252;

    RgbColor::new(linear_to_srgb(rl), linear_to_srgb(gl), linear_to_srgb(bl))
}

// ============================================================================
// COLOR DIFFERENCE
// ============================================================================

fn hue_degrees(b: f64, a_prime: f64) -> f64 {
    if b == 0.0 && a_prime == 0.0 {
        return 0.0;
    }
    let h = b.atan2(a_prime).to_degrees();
    if h < 0.0 {
        h + 360.0
    } else {
        h
    }
}

/// CIEDE2000 color difference (kL = kC = kH = 1)
pub fn delta_e2000(lab1: LabColor, lab2: LabColor) -> f64 {
    const POW25_7: f64 = 6_103_515_625.0; // 25^7

    let c1 = lab1.a.hypot(lab1.b);
    let c2 = lab2.a.hypot(lab2.b);
    let c_bar7 = ((c1 + c2) / 2.0).powi(7);
    let g = 0.5 * (1.0 - (c_bar7 / (c_bar7 + POW25_7)).sqrt());

    let a1p = lab1.a * (1.0 + g);
    let a2p = lab2.a * (1.0 + g);
    let c1p = a1p.hypot(lab1.b);
    let c2p = a2p.hypot(lab2.b);
    let h1p = hue_degrees(lab1.b, a1p);
    let h2p = hue_degrees(lab2.b, a2p);

    let dl = lab2.l - lab1.l;
    let dc = c2p - c1p;
    let chroma_product = c1p * c2p;

    let dh = if chroma_product == 0.0 {
        0.0
    } else {
        let diff = h2p - h1p;
        if diff > 180.0 {
            diff - 360.0
        } else if diff < -180.0 {
            diff + 360.0
        } else {
            diff
        }
    };
    let d_big_h = 2.0 * chroma_product.sqrt() * (dh.to_radians() / 2.0).sin();

    let l_bar = (lab1.l + lab2.l) / 2.0;
    let c_bar_p = (c1p + c2p) / 2.0;
    let h_bar_p = if chroma_product == 0.0 {
        h1p + h2p
    } else if (h1p - h2p).abs() <= 180.0 {
        (h1p + h2p) / 2.0
    } else if h1p + h2p < 360.0 {
        (h1p + h2p + 360.0) / 2.0
    } else {
        (h1p + h2p - 360.0) / 2.0
    };

    let t = 1.0 - 0.17 * (h_bar_p - 30.0).to_radians().cos()
        + 0.24 * (2.0 * h_bar_p).to_radians().cos()
        + 0.32 * (3.0 * h_bar_p + 6.0).to_radians().cos()
        - 0.20 * (4.0 * h_bar_p - 63.0).to_radians().cos();

    let d_theta = 30.0 * (-((h_bar_p - 275.0) / 25.0).powi(2)).exp();
    let c_bar_p7 = c_bar_p.powi(7);
    let rc = 2.0 * (c_bar_p7 / (c_bar_p7 + POW25_7)).sqrt();

    let l_offset = (l_bar - 50.0).powi(2);
    let sl = 1.0 + 0.015 * l_offset / (20.0 + l_offset).sqrt();
    let sc = 1.0 + 0.045 * c_bar_p;
    let sh = 1.0 + 0.015 * c_bar_p * t;
    let rt = -(2.0 * d_theta).to_radians().sin() * rc;

    let l_term = dl / sl;
    let c_term = dc / sc;
    let h_term = d_big_h / sh;

    (l_term * l_term + c_term * c_term + h_term * h_term + rt * c_term * h_term)
        .max(0.0)
        .sqrt()
}

/// Euclidean distance in raw RGB, range [0, MAX_RGB_DISTANCE]
#[inline]
pub fn color_distance(a: RgbColor, b: RgbColor) -> f64 {
    let dr = a.r as f64 - b.r as f64;
    let dg = a.g as f64 - b.g as f64;
    let db = a.b as f64 - b.b as f64;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Snap each channel down to the start of its bucket.
pub fn quantize_color(color: RgbColor, bucket_size: u8) -> RgbColor {
    let bucket = bucket_size.max(1);
    RgbColor::new(
        (color.r / bucket) * bucket,
        (color.g / bucket) * bucket,
        (color.b / bucket) * bucket,
    )
}

/// Perceptual brightness 0.299R + 0.587G + 0.114B, normalized to [0, 1]
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> f64 {
    (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) / 255.0
}

// ============================================================================
// HSL
// ============================================================================

pub fn rgb_to_hsl(color: RgbColor) -> HslColor {
    let hsl: Hsl = Srgb::new(color.r, color.g, color.b)
        .into_format::<f32>()
        .into_color();

    HslColor {
        h: hsl.hue.into_positive_degrees() as f64,
        s: hsl.saturation as f64 * 100.0,
        l: hsl.lightness as f64 * 100.0,
    }
}

pub fn hsl_to_rgb(hsl: HslColor) -> RgbColor {
    let rgb: Srgb = Hsl::new(
        hsl.h as f32,
        (hsl.s / 100.0).clamp(0.0, 1.0) as f32,
        (hsl.l / 100.0).clamp(0.0, 1.0) as f32,
    )
    .into_color();
    let rgb: Srgb<u8> = rgb.into_format();

    RgbColor::new(rgb.red, rgb.green, rgb.blue)
}

/// Human-readable name from hue family plus a lightness qualifier
pub fn color_name(hsl: HslColor) -> String {
    if hsl.s < 10.0 {
        return if hsl.l >= 90.0 {
            "White".to_string()
        } else if hsl.l <= 10.0 {
            "Black".to_string()
        } else {
            qualified("Gray", hsl.l)
        };
    }

    let family = match hsl.h {
        h if !(15.0..345.0).contains(&h) => "Red",
        h if h < 45.0 => "Orange",
        h if h < 70.0 => "Yellow",
        h if h < 165.0 => "Green",
        h if h < 195.0 => "Cyan",
        h if h < 255.0 => "Blue",
        h if h < 290.0 => "Purple",
        _ => "Pink",
    };

    qualified(family, hsl.l)
}

fn qualified(family: &str, lightness: f64) -> String {
    match LightnessCategory::from_lightness(lightness) {
        LightnessCategory::Light => format!("Light {}", family),
        LightnessCategory::Mid => family.to_string(),
        LightnessCategory::Dark => format!("Dark {}", family),
    }
}

// ============================================================================
// HEX
// ============================================================================

/// Lowercase `#rrggbb`
pub fn rgb_to_hex(color: RgbColor) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

/// Parse `#rrggbb`, `rrggbb`, `#rgb` or `rgb` (case-insensitive)
pub fn hex_to_rgb(hex: &str) -> Result<RgbColor> {
    let trimmed = hex.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    let malformed = || EngineError::MalformedHex(hex.to_string());

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(malformed());
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| malformed());

    match digits.len() {
        6 => Ok(RgbColor::new(
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        )),
        3 => {
            let r = channel(&digits[0..1])?;
            let g = channel(&digits[1..2])?;
            let b = channel(&digits[2..3])?;
            Ok(RgbColor::new(r * 17, g * 17, b * 17))
        }
        _ => Err(malformed()),
    }
}

pub fn normalize_hex(hex: &str) -> Result<String> {
    hex_to_rgb(hex).map(rgb_to_hex)
}

// ============================================================================
// TESTS
// ============================================================================
