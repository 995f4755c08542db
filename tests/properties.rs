//! End-to-end checks of the engine's documented guarantees through the public API.

use color_engine::buffer::from_raw;
use color_engine::colorspace::{
    color_distance, delta_e2000, hex_to_rgb, rgb_to_hex, rgb_to_lab, MAX_RGB_DISTANCE,
};
use color_engine::{
    cut_with_texture, detect_region, extract_palette, knockout, recolor, BlendMode, ColorMapping,
    CutSettings, EngineError, ErrorKind, KnockoutSettings, PaletteSettings, RecolorSettings,
    RegionSettings, ReplaceMode, RgbColor, TransformSettings,
};
use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;

fn sample_colors() -> Vec<RgbColor> {
    vec![
        RgbColor::new(0, 0, 0),
        RgbColor::new(255, 255, 255),
        RgbColor::new(255, 0, 0),
        RgbColor::new(17, 6, 2),
        RgbColor::new(120, 200, 45),
        RgbColor::new(33, 66, 250),
        RgbColor::new(128, 128, 128),
    ]
}

#[test]
fn delta_e2000_is_zero_on_identity_and_symmetric() {
    for &a in &sample_colors() {
        let la = rgb_to_lab(a);
        assert_eq!(delta_e2000(la, la), 0.0);
        for &b in &sample_colors() {
            let lb = rgb_to_lab(b);
            assert_eq!(delta_e2000(la, lb), delta_e2000(lb, la));
        }
    }
}

#[test]
fn color_distance_is_bounded() {
    for &a in &sample_colors() {
        assert_eq!(color_distance(a, a), 0.0);
        for &b in &sample_colors() {
            let d = color_distance(a, b);
            assert!((0.0..=MAX_RGB_DISTANCE).contains(&d));
        }
    }
}

#[test]
fn hex_round_trip_normalizes() {
    for hex in ["#000000", "#FFFFFF", "#a1B2c3", "7f7f7f", "#00ff00"] {
        let expected = format!("#{}", hex.trim_start_matches('#').to_lowercase());
        assert_eq!(rgb_to_hex(hex_to_rgb(hex).unwrap()), expected);
    }
}

#[test]
fn knockout_exact_color_at_zero_tolerance() {
    let img = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
    let settings = KnockoutSettings {
        tolerance: 0.0,
        replace_mode: ReplaceMode::Transparency,
        feather: 0,
        anti_aliasing: true,
    };
    let result = knockout(&img, &[RgbColor::new(255, 0, 0)], &settings).unwrap();
    assert!(result.image.pixels().all(|p| p[3] == 0));
}

#[test]
fn knockout_full_tolerance_clears_any_image() {
    let mut img = RgbaImage::new(9, 7);
    for (i, p) in img.pixels_mut().enumerate() {
        *p = Rgba([(i * 29 % 256) as u8, (i * 71 % 256) as u8, (i * 113 % 256) as u8, 255]);
    }
    let settings = KnockoutSettings {
        tolerance: 100.0,
        ..KnockoutSettings::default()
    };
    let result = knockout(&img, &[RgbColor::new(255, 255, 255)], &settings).unwrap();
    assert_eq!(result.matched, 63);
    assert!(result.image.pixels().all(|p| p[3] == 0));
}

#[test]
fn region_on_uniform_image_covers_everything() {
    let img = RgbaImage::from_pixel(12, 9, Rgba([70, 90, 110, 255]));
    for tolerance in [0.0, 2.5, 10.0] {
        let settings = RegionSettings {
            tolerance,
            ..RegionSettings::default()
        };
        let region = detect_region(&img, (5, 4), &settings).unwrap();
        assert_eq!(region.pixel_count, 108);
        assert_eq!(region.coverage, 100.0);
        assert_eq!(region.confidence, 100.0);
    }
}

#[test]
fn region_skips_single_outlier() {
    let mut img = RgbaImage::from_pixel(10, 8, Rgba([230, 210, 40, 255]));
    img.put_pixel(6, 3, Rgba([20, 20, 160, 255]));
    let region = detect_region(&img, (2, 2), &RegionSettings::default()).unwrap();
    assert_eq!(region.pixel_count, 79);
}

#[test]
fn recolor_replaces_exact_slot_only() {
    let mut img = RgbaImage::from_pixel(3, 3, Rgba([50, 60, 70, 255]));
    img.put_pixel(1, 1, Rgba([51, 60, 70, 255]));
    let settings = RecolorSettings {
        mappings: vec![ColorMapping {
            slot: 0,
            new_hex: "#ff8800".to_string(),
        }],
        blend_mode: BlendMode::Replace,
        tolerance: 0.0,
        ..RecolorSettings::default()
    };
    let result = recolor(&img, &[RgbColor::new(50, 60, 70)], &settings).unwrap();
    assert_eq!(result.image.get_pixel(0, 0).0, [255, 136, 0, 255]);
    assert_eq!(result.image.get_pixel(1, 1).0, [51, 60, 70, 255]);
}

#[test]
fn recolor_never_touches_translucent_pixels_when_preserving() {
    let mut img = RgbaImage::new(4, 4);
    for (i, p) in img.pixels_mut().enumerate() {
        *p = Rgba([50, 60, 70, (i * 17) as u8]);
    }
    let settings = RecolorSettings {
        mappings: vec![ColorMapping {
            slot: 0,
            new_hex: "#000000".to_string(),
        }],
        tolerance: 100.0,
        preserve_transparency: true,
        ..RecolorSettings::default()
    };
    let result = recolor(&img, &[RgbColor::new(50, 60, 70)], &settings).unwrap();
    for (before, after) in img.pixels().zip(result.image.pixels()) {
        if before[3] < 255 {
            assert_eq!(before, after);
        } else {
            assert_eq!(after.0, [0, 0, 0, 255]);
        }
    }
}

#[test]
fn texture_cut_black_and_white_extremes() {
    let base = RgbaImage::from_pixel(5, 5, Rgba([10, 20, 30, 255]));
    let cut = CutSettings {
        amount: 1.0,
        feather_px: 0,
        invert: false,
    };

    let black = RgbaImage::from_pixel(7, 3, Rgba([0, 0, 0, 255]));
    let result = cut_with_texture(&base, &black, &cut, &TransformSettings::default()).unwrap();
    assert!(result.image.pixels().all(|p| p[3] == 0));

    let white = RgbaImage::from_pixel(7, 3, Rgba([255, 255, 255, 255]));
    let result = cut_with_texture(&base, &white, &cut, &TransformSettings::default()).unwrap();
    assert_eq!(result.image, base);
}

#[test]
fn palette_of_single_color_image() {
    let mut img = RgbaImage::from_pixel(64, 48, Rgba([0, 0, 0, 0]));
    for y in 8..40 {
        for x in 8..56 {
            img.put_pixel(x, y, Rgba([40, 100, 220, 255]));
        }
    }
    let palette = extract_palette(&img, &PaletteSettings::default()).unwrap();
    assert_eq!(palette.len(), 1);
    assert!((palette[0].percentage - 100.0).abs() < 1e-9);
}

#[test]
fn errors_map_to_taxonomy() {
    let img = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
    let err = detect_region(&img, (5, 5), &RegionSettings::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfBounds);

    let err = knockout(&img, &[], &KnockoutSettings::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = from_raw(2, 2, vec![0; 3]).unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[test]
fn knockout_result_survives_png_encoding() {
    let img = RgbaImage::from_pixel(6, 6, Rgba([0, 255, 0, 255]));
    let result = knockout(&img, &[RgbColor::new(0, 255, 0)], &KnockoutSettings::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("knocked.png");
    result.image.save(&path).unwrap();
    let reloaded = image::open(&path).unwrap().to_rgba8();
    assert_eq!(reloaded, result.image);
}
