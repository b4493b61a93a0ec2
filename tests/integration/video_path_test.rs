// End-to-end video watermarking through ffmpeg

use super::test_harness::{ffmpeg_available, make_test_clip, stream_types, watermarker};
use tilemark::video::{EncoderConfig, FfmpegSource, VideoSource};
use tilemark::WatermarkError;

#[test]
#[ignore] // Requires ffmpeg and ffprobe
fn test_video_is_watermarked_with_audio_preserved() {
    if !ffmpeg_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("clip.mp4");
    let output = dir.path().join("clip_wm.mp4");
    make_test_clip(&input, 2);

    let written = watermarker(4).watermark_video(&input, &output).unwrap();
    assert_eq!(written, output);

    let types = stream_types(&output);
    assert!(types.contains(&"video".to_string()));
    assert!(types.contains(&"audio".to_string()));

    let source = FfmpegSource::open(&input, &EncoderConfig::default()).unwrap();
    let result = FfmpegSource::open(&output, &EncoderConfig::default()).unwrap();
    assert_eq!(result.metadata().width, source.metadata().width);
    assert_eq!(result.metadata().height, source.metadata().height);
    assert_eq!(result.metadata().frame_rate, source.metadata().frame_rate);
}

#[test]
#[ignore] // Requires ffmpeg and ffprobe
fn test_decoded_frame_count_survives_round_trip() {
    if !ffmpeg_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("clip.mp4");
    let output = dir.path().join("clip_wm.mp4");
    make_test_clip(&input, 1);

    watermarker(2).watermark_video(&input, &output).unwrap();

    let config = EncoderConfig::default();
    let before = FfmpegSource::open(&input, &config).unwrap().read_frames().unwrap();
    let after = FfmpegSource::open(&output, &config).unwrap().read_frames().unwrap();
    assert_eq!(before.len(), after.len());
    assert_ne!(before, after);
}

#[test]
#[ignore] // Requires ffprobe
fn test_non_video_input_is_invalid_input() {
    if !ffmpeg_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.mp4");
    std::fs::write(&input, b"plain text pretending to be a video").unwrap();
    let output = dir.path().join("out.mp4");

    let result = watermarker(1).watermark_video(&input, &output);
    assert!(matches!(result, Err(WatermarkError::InvalidInput(_))));
    assert!(!output.exists());
}
