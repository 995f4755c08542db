//! Alpha-channel feathering shared by knockout and texture cutting.
//!
//! The alpha channel is pulled into a `GrayImage`, box-filtered with
//! imageproc (edge pixels are replicated past the border) and written back.
//! RGB is left untouched.

use image::{GrayImage, Luma, RgbaImage};
use imageproc::filter::box_filter;

use crate::progress::{ProgressSink, Stage, StageReporter};

/// Largest radius the engine will blur with
pub const MAX_FEATHER_RADIUS: u32 = 20;

/// Box-blur the alpha channel in place with the given radius in pixels.
pub fn feather_alpha(img: &mut RgbaImage, radius: u32, progress: &mut dyn ProgressSink) {
    let r = radius.min(MAX_FEATHER_RADIUS);
    let (width, height) = img.dimensions();
    if r == 0 || width == 0 || height == 0 {
        return;
    }

    let alpha = GrayImage::from_fn(width, height, |x, y| Luma([img.get_pixel(x, y)[3]]));
    let blurred = box_filter(&alpha, r, r);

    let mut reporter = StageReporter::rows(progress, Stage::Feather, height);
    for y in 0..height {
        for x in 0..width {
            img.get_pixel_mut(x, y)[3] = blurred.get_pixel(x, y)[0];
        }
        reporter.tick(y as u64 + 1);
    }
    reporter.finish();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Silent;
    use image::Rgba;

    #[test]
    fn test_zero_radius_is_noop() {
        let mut img = RgbaImage::from_pixel(3, 3, Rgba([10, 20, 30, 0]));
        img.put_pixel(1, 1, Rgba([10, 20, 30, 255]));
        let before = img.clone();
        feather_alpha(&mut img, 0, &mut Silent);
        assert_eq!(img, before);
    }

    #[test]
    fn test_uniform_alpha_unchanged() {
        let mut img = RgbaImage::from_pixel(8, 5, Rgba([1, 2, 3, 77]));
        feather_alpha(&mut img, 3, &mut Silent);
        assert!(img.pixels().all(|p| p[3] == 77));
    }

    #[test]
    fn test_blurs_alpha_only() {
        let mut img = RgbaImage::from_pixel(5, 1, Rgba([200, 100, 50, 0]));
        img.put_pixel(2, 0, Rgba([200, 100, 50, 255]));
        feather_alpha(&mut img, 1, &mut Silent);

        // Window of 3 around the opaque pixel
        assert_eq!(img.get_pixel(2, 0)[3], 85);
        assert_eq!(img.get_pixel(1, 0)[3], 85);
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert!(img.pixels().all(|p| p[0] == 200 && p[1] == 100 && p[2] == 50));
    }

    #[test]
    fn test_edge_pixel_is_replicated() {
        let mut img = RgbaImage::from_pixel(4, 1, Rgba([0, 0, 0, 0]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        feather_alpha(&mut img, 1, &mut Silent);
        // Window at x = 0 reads the border pixel twice: (255 + 255 + 0) / 3
        assert_eq!(img.get_pixel(0, 0)[3], 170);
        assert_eq!(img.get_pixel(1, 0)[3], 85);
        assert_eq!(img.get_pixel(3, 0)[3], 0);
    }

    #[test]
    fn test_radius_is_capped() {
        let mut capped = RgbaImage::from_pixel(60, 1, Rgba([0, 0, 0, 0]));
        capped.put_pixel(30, 0, Rgba([0, 0, 0, 255]));
        let mut huge = capped.clone();
        feather_alpha(&mut capped, MAX_FEATHER_RADIUS, &mut Silent);
        feather_alpha(&mut huge, 500, &mut Silent);
        assert_eq!(capped, huge);
    }
}
