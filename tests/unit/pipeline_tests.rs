// Parallel frame pipeline tests

use image::RgbaImage;
use rstest::rstest;
use tilemark::pipeline::FramePipeline;
use tilemark::watermark::{compose_overlay, composite_frame, BgrFrame, Overlay, WatermarkConfig};
use tilemark::WatermarkError;

fn overlay(width: u32, height: u32) -> Overlay {
    let config = WatermarkConfig {
        text: "x".to_string(),
        font_size: 3,
        ..WatermarkConfig::default()
    };
    let stamp = RgbaImage::from_pixel(4, 3, image::Rgba([255, 255, 255, 120]));
    compose_overlay(width, height, &stamp, &config).unwrap()
}

fn frames(count: usize) -> Vec<BgrFrame> {
    (0..count)
        .map(|i| BgrFrame::filled(48, 32, [(i * 11) as u8, (i * 5) as u8, 200]))
        .collect()
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(8)]
fn test_pipeline_matches_sequential_compositing(#[case] workers: usize) {
    let overlay = overlay(48, 32);
    let input = frames(40);
    let expected: Vec<BgrFrame> = input
        .iter()
        .map(|f| composite_frame(f, &overlay).unwrap())
        .collect();

    let pipeline = FramePipeline::new(workers).unwrap();
    assert_eq!(pipeline.workers(), workers);
    let output = pipeline.composite(input, &overlay).unwrap();

    assert_eq!(output.len(), 40);
    assert_eq!(output, expected);
}

#[test]
fn test_wrong_sized_frame_fails_whole_batch() {
    let overlay = overlay(48, 32);
    let mut input = frames(12);
    input[9] = BgrFrame::filled(47, 32, [0, 0, 0]);

    let pipeline = FramePipeline::new(4).unwrap();
    let result = pipeline.composite(input, &overlay);
    assert!(matches!(
        result,
        Err(WatermarkError::Processing { index: 9, .. })
    ));
}

#[test]
fn test_map_ordered_generic_values() {
    let pipeline = FramePipeline::new(3).unwrap();
    let words = vec!["tiled", "text", "watermark"];
    let lengths = pipeline
        .map_ordered(words, |_, word| Ok(word.len()))
        .unwrap();
    assert_eq!(lengths, vec![5, 4, 9]);
}
