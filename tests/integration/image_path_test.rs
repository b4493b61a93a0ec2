// End-to-end still image watermarking

use super::test_harness::{watermarker, write_checkerboard};
use image::Rgba;
use tilemark::WatermarkError;

#[test]
fn test_png_is_watermarked_and_keeps_size() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("photo.png");
    let output = dir.path().join("photo_wm.png");
    let original = write_checkerboard(&input, 120, 80);

    watermarker(2).watermark_image(&input, &output).unwrap();

    let result = image::open(&output).unwrap().to_rgba8();
    assert_eq!(result.dimensions(), (120, 80));
    let changed = result
        .pixels()
        .zip(original.pixels())
        .filter(|(a, b)| a != b)
        .count();
    assert!(changed > 0);
    assert!(changed < 120 * 80);
}

#[test]
fn test_same_input_gives_same_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    write_checkerboard(&input, 64, 64);
    let first = dir.path().join("a.png");
    let second = dir.path().join("b.png");

    watermarker(1).watermark_image(&input, &first).unwrap();
    watermarker(4).watermark_image(&input, &second).unwrap();

    let a = image::open(&first).unwrap().to_rgba8();
    let b = image::open(&second).unwrap().to_rgba8();
    assert_eq!(a, b);
}

#[test]
fn test_jpeg_output_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    let output = dir.path().join("out.jpg");
    write_checkerboard(&input, 48, 32);

    watermarker(1).watermark_image(&input, &output).unwrap();

    assert_eq!(
        image::ImageFormat::from_path(&output).unwrap(),
        image::ImageFormat::Jpeg
    );
    let decoded = image::open(&output).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (48, 32));
}

#[test]
fn test_translucent_source_keeps_alpha_channel() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("glass.png");
    let output = dir.path().join("glass_wm.png");
    image::RgbaImage::from_pixel(40, 40, Rgba([0, 0, 255, 0]))
        .save(&input)
        .unwrap();

    watermarker(1).watermark_image(&input, &output).unwrap();

    let result = image::open(&output).unwrap().to_rgba8();
    // Uncovered pixels stay fully transparent, covered ones pick up the watermark alpha
    assert!(result.pixels().any(|p| p[3] == 0));
    assert!(result.pixels().any(|p| p[3] == 51));
}

#[test]
fn test_undecodable_source_is_invalid_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.png");
    std::fs::write(&input, b"\x89PNG but not really").unwrap();
    let output = dir.path().join("out.png");

    let result = watermarker(1).watermark_image(&input, &output);
    assert!(matches!(result, Err(WatermarkError::InvalidInput(_))));
    assert!(!output.exists());
}

#[test]
fn test_failure_leaves_existing_destination_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("existing.png");
    std::fs::write(&output, b"previous result").unwrap();

    let result = watermarker(1).watermark_image(&dir.path().join("missing.png"), &output);
    assert!(result.is_err());
    assert_eq!(std::fs::read(&output).unwrap(), b"previous result");

    // No staging leftovers either
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".tilemark-partial-"))
        .collect();
    assert!(leftovers.is_empty());
}
