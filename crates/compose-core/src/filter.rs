//! The per-pixel filter pipeline.
//!
//! The six stages run in a fixed order so the exported artifact matches the
//! live preview bit-for-bit no matter which native filter primitives the
//! preview's runtime happens to support. Stage math follows the standard
//! CSS/SVG filter definitions; everything is computed in f32 and quantized
//! once at the end.
//!
//! `blur` is preview-only and deliberately absent here.

use framebooth_layout_model::FilterSettings;
use image::RgbaImage;

/// Rec. 601 luma weights shared by the grayscale and saturate stages.
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Apply the filter pipeline to `image` in place.
///
/// All-neutral settings skip the pass entirely. Alpha is never touched.
pub fn apply_filters(image: &mut RgbaImage, settings: &FilterSettings) {
    if settings.is_neutral() {
        return;
    }

    let hue_matrix = hue_rotate_matrix(settings.hue_rotate);

    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let rgb = filter_rgb([r as f32, g as f32, b as f32], settings, &hue_matrix);
        pixel.0 = [rgb[0], rgb[1], rgb[2], a];
    }
}

/// Run one RGB triple through the six stages and quantize.
fn filter_rgb(mut rgb: [f32; 3], settings: &FilterSettings, hue_matrix: &[[f32; 3]; 3]) -> [u8; 3] {
    // 1. brightness
    let brightness = settings.brightness / 100.0;
    for c in &mut rgb {
        *c *= brightness;
    }

    // 2. contrast: pivot around mid-gray
    let contrast = settings.contrast / 100.0;
    for c in &mut rgb {
        *c = *c * contrast + 128.0 * (1.0 - contrast);
    }

    // 3. grayscale: blend toward luma
    let gray = settings.grayscale / 100.0;
    if gray > 0.0 {
        let luma = LUMA_R * rgb[0] + LUMA_G * rgb[1] + LUMA_B * rgb[2];
        for c in &mut rgb {
            *c += (luma - *c) * gray;
        }
    }

    // 4. sepia: blend toward the standard sepia matrix output
    let sepia = settings.sepia / 100.0;
    if sepia > 0.0 {
        let [r, g, b] = rgb;
        let sr = 0.393 * r + 0.769 * g + 0.189 * b;
        let sg = 0.349 * r + 0.686 * g + 0.168 * b;
        let sb = 0.272 * r + 0.534 * g + 0.131 * b;
        rgb = [
            r + (sr - r) * sepia,
            g + (sg - g) * sepia,
            b + (sb - b) * sepia,
        ];
    }

    // 5. saturate: scale distance from luma (100 = no change)
    let saturate = settings.saturate / 100.0;
    if (saturate - 1.0).abs() > f32::EPSILON {
        let luma = LUMA_R * rgb[0] + LUMA_G * rgb[1] + LUMA_B * rgb[2];
        for c in &mut rgb {
            *c = luma + (*c - luma) * saturate;
        }
    }

    // 6. hue rotation
    if settings.hue_rotate.abs() > f32::EPSILON {
        let [r, g, b] = rgb;
        rgb = [
            hue_matrix[0][0] * r + hue_matrix[0][1] * g + hue_matrix[0][2] * b,
            hue_matrix[1][0] * r + hue_matrix[1][1] * g + hue_matrix[1][2] * b,
            hue_matrix[2][0] * r + hue_matrix[2][1] * g + hue_matrix[2][2] * b,
        ];
    }

    [
        quantize(rgb[0]),
        quantize(rgb[1]),
        quantize(rgb[2]),
    ]
}

fn quantize(channel: f32) -> u8 {
    channel.clamp(0.0, 255.0).round() as u8
}

/// The standard SVG hue-rotation matrix for `degrees`.
fn hue_rotate_matrix(degrees: f32) -> [[f32; 3]; 3] {
    let radians = degrees.to_radians();
    let cos = radians.cos();
    let sin = radians.sin();
    [
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn test_image() -> RgbaImage {
        let mut image = RgbaImage::new(4, 2);
        for (i, pixel) in image.pixels_mut().enumerate() {
            let v = (i * 31 % 256) as u8;
            *pixel = Rgba([v, 255 - v, (v / 2) + 40, 255]);
        }
        image
    }

    #[test]
    fn neutral_settings_are_identity() {
        let original = test_image();
        let mut filtered = original.clone();
        apply_filters(&mut filtered, &FilterSettings::NEUTRAL);
        assert_eq!(filtered, original);
    }

    #[test]
    fn blur_alone_still_skips_the_pass() {
        let original = test_image();
        let mut filtered = original.clone();
        let mut settings = FilterSettings::NEUTRAL;
        settings.blur = 8.0;
        apply_filters(&mut filtered, &settings);
        assert_eq!(filtered, original);
    }

    #[test]
    fn full_grayscale_equalizes_channels() {
        let mut image = test_image();
        let mut settings = FilterSettings::NEUTRAL;
        settings.grayscale = 100.0;
        apply_filters(&mut image, &settings);
        for pixel in image.pixels() {
            let [r, g, b, _] = pixel.0;
            assert!(r.abs_diff(g) <= 1 && g.abs_diff(b) <= 1, "not gray: {:?}", pixel);
        }
    }

    #[test]
    fn brightness_scales_channels() {
        let mut image = RgbaImage::from_pixel(1, 1, Rgba([100, 60, 20, 255]));
        let mut settings = FilterSettings::NEUTRAL;
        settings.brightness = 50.0;
        apply_filters(&mut image, &settings);
        assert_eq!(image.get_pixel(0, 0).0, [50, 30, 10, 255]);
    }

    #[test]
    fn contrast_pivots_around_mid_gray() {
        let mut image = RgbaImage::from_pixel(1, 1, Rgba([128, 128, 128, 255]));
        let mut settings = FilterSettings::NEUTRAL;
        settings.contrast = 200.0;
        apply_filters(&mut image, &settings);
        // Mid-gray is the fixed point of the contrast stage.
        assert_eq!(image.get_pixel(0, 0).0, [128, 128, 128, 255]);

        let mut image = RgbaImage::from_pixel(1, 1, Rgba([160, 96, 128, 255]));
        apply_filters(&mut image, &settings);
        assert_eq!(image.get_pixel(0, 0).0, [192, 64, 128, 255]);
    }

    #[test]
    fn zero_saturation_matches_grayscale() {
        let mut desaturated = test_image();
        let mut settings = FilterSettings::NEUTRAL;
        settings.saturate = 0.0;
        apply_filters(&mut desaturated, &settings);

        let mut grayed = test_image();
        let mut settings = FilterSettings::NEUTRAL;
        settings.grayscale = 100.0;
        apply_filters(&mut grayed, &settings);

        for (a, b) in desaturated.pixels().zip(grayed.pixels()) {
            for c in 0..3 {
                assert!(a.0[c].abs_diff(b.0[c]) <= 1);
            }
        }
    }

    #[test]
    fn hue_rotate_360_is_near_identity() {
        let original = test_image();
        let mut rotated = original.clone();
        let mut settings = FilterSettings::NEUTRAL;
        settings.hue_rotate = 360.0;
        apply_filters(&mut rotated, &settings);
        for (a, b) in rotated.pixels().zip(original.pixels()) {
            for c in 0..3 {
                assert!(a.0[c].abs_diff(b.0[c]) <= 1, "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn channels_clamp_instead_of_wrapping() {
        let mut image = RgbaImage::from_pixel(1, 1, Rgba([250, 5, 128, 255]));
        let mut settings = FilterSettings::NEUTRAL;
        settings.brightness = 300.0;
        apply_filters(&mut image, &settings);
        let [r, _, b, a] = image.get_pixel(0, 0).0;
        assert_eq!(r, 255);
        assert_eq!(b, 255);
        assert_eq!(a, 255);
    }

    #[test]
    fn alpha_is_preserved() {
        let mut image = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 77]));
        let mut settings = FilterSettings::NEUTRAL;
        settings.sepia = 100.0;
        settings.contrast = 150.0;
        apply_filters(&mut image, &settings);
        assert_eq!(image.get_pixel(0, 0).0[3], 77);
    }

    #[test]
    fn pipeline_is_deterministic() {
        let mut settings = FilterSettings::NEUTRAL;
        settings.brightness = 80.0;
        settings.sepia = 40.0;
        settings.hue_rotate = 33.0;

        let mut first = test_image();
        apply_filters(&mut first, &settings);
        let mut second = test_image();
        apply_filters(&mut second, &settings);
        assert_eq!(first, second);
    }
}
