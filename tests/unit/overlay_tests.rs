// Overlay generation, bridge and compositing tests
// These use a synthetic stamp, so no font needs to be installed

use image::{Rgba, RgbaImage};
use rstest::rstest;
use tilemark::watermark::{
    bgr_to_rgba, compose_overlay, composite_frame, rgba_to_bgr, BgrFrame, WatermarkConfig,
};
use tilemark::WatermarkError;

fn stamp() -> RgbaImage {
    let mut stamp = RgbaImage::new(12, 6);
    for (x, y, pixel) in stamp.enumerate_pixels_mut() {
        if (x + y) % 3 != 0 {
            *pixel = Rgba([169, 169, 169, 51]);
        }
    }
    stamp
}

fn small_config() -> WatermarkConfig {
    WatermarkConfig {
        text: "abc".to_string(),
        font_size: 6,
        ..WatermarkConfig::default()
    }
}

fn gradient_frame(width: u32, height: u32) -> BgrFrame {
    let mut data = Vec::with_capacity(BgrFrame::buffer_len(width, height));
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[(x * 7) as u8, (y * 5) as u8, ((x + y) * 3) as u8]);
        }
    }
    BgrFrame::new(width, height, data).unwrap()
}

#[rstest]
#[case(1, 1)]
#[case(2, 2)]
#[case(64, 48)]
#[case(97, 31)]
#[case(31, 97)]
#[case(320, 180)]
fn test_overlay_matches_media_size(#[case] width: u32, #[case] height: u32) {
    let overlay = compose_overlay(width, height, &stamp(), &small_config()).unwrap();
    assert_eq!(overlay.dimensions(), (width, height));
    assert_eq!(overlay.image().dimensions(), (width, height));
}

#[test]
fn test_overlay_is_deterministic() {
    let config = small_config();
    let a = compose_overlay(120, 90, &stamp(), &config).unwrap();
    let b = compose_overlay(120, 90, &stamp(), &config).unwrap();
    assert_eq!(a.image(), b.image());
    assert!(a.covered_pixels() > 0);
}

#[rstest]
#[case(0.0)]
#[case(30.0)]
#[case(-20.0)]
#[case(90.0)]
fn test_overlay_alpha_never_exceeds_stamp_alpha(#[case] angle: f32) {
    let config = WatermarkConfig {
        angle,
        ..small_config()
    };
    let overlay = compose_overlay(80, 60, &stamp(), &config).unwrap();
    assert!(overlay.image().pixels().all(|p| p[3] == 0 || p[3] == 51));
}

#[test]
fn test_bridge_round_trip_is_exact() {
    let frame = gradient_frame(37, 23);
    let rgba = bgr_to_rgba(&frame).unwrap();
    assert_eq!(rgba.dimensions(), (37, 23));
    assert!(rgba.pixels().all(|p| p[3] == 255));
    assert_eq!(rgba_to_bgr(&rgba), frame);
}

#[test]
fn test_uncovered_pixels_are_bit_identical() {
    let frame = gradient_frame(80, 60);
    let overlay = compose_overlay(80, 60, &stamp(), &small_config()).unwrap();
    let out = composite_frame(&frame, &overlay).unwrap();

    let mut covered = 0;
    for (x, y, pixel) in overlay.image().enumerate_pixels() {
        if pixel[3] == 0 {
            assert_eq!(out.pixel(x, y), frame.pixel(x, y), "pixel ({}, {})", x, y);
        } else {
            covered += 1;
        }
    }
    assert!(covered > 0);
    assert_ne!(out, frame);
}

#[test]
fn test_tiny_media_gets_transparent_overlay() {
    let frame = BgrFrame::new(2, 2, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]).unwrap();
    let overlay = compose_overlay(2, 2, &stamp(), &WatermarkConfig::with_text("WM")).unwrap();
    assert_eq!(overlay.covered_pixels(), 0);

    let out = composite_frame(&frame, &overlay).unwrap();
    assert_eq!(out, frame);
}

#[test]
fn test_composite_rejects_mismatched_overlay() {
    let overlay = compose_overlay(10, 10, &stamp(), &small_config()).unwrap();
    assert!(matches!(
        composite_frame(&gradient_frame(11, 10), &overlay),
        Err(WatermarkError::InvalidInput(_))
    ));
}
