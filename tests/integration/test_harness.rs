// Shared helpers for the integration tests

use image::{Rgba, RgbaImage};
use std::path::Path;
use std::process::Command;
use tilemark::video::EncoderConfig;
use tilemark::watermark::WatermarkConfig;
use tilemark::{FramePipeline, Watermarker};

/// Watermarker with a synthetic stamp, dense enough to cover small media.
pub fn watermarker(workers: usize) -> Watermarker {
    let config = WatermarkConfig {
        text: "tm".to_string(),
        font_size: 5,
        ..WatermarkConfig::default()
    };
    let stamp = RgbaImage::from_pixel(8, 5, Rgba([169, 169, 169, 51]));
    Watermarker::with_stamp(
        config,
        stamp,
        FramePipeline::new(workers).expect("pool"),
        EncoderConfig::default(),
    )
    .expect("watermarker")
}

/// Write a checkerboard PNG to `path`.
pub fn write_checkerboard(path: &Path, width: u32, height: u32) -> RgbaImage {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        if (x / 4 + y / 4) % 2 == 0 {
            Rgba([240, 240, 240, 255])
        } else {
            Rgba([20, 60, 120, 255])
        }
    });
    image.save(path).expect("write test image");
    image
}

pub fn ffmpeg_available() -> bool {
    which::which("ffmpeg").is_ok() && which::which("ffprobe").is_ok()
}

/// Generate a short test clip with a sine audio track.
pub fn make_test_clip(path: &Path, seconds: u32) {
    let status = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y"])
        .args(["-f", "lavfi", "-i"])
        .arg(format!("testsrc=size=96x64:rate=10:duration={}", seconds))
        .args(["-f", "lavfi", "-i"])
        .arg(format!("sine=frequency=440:duration={}", seconds))
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-c:a", "aac", "-shortest"])
        .arg(path)
        .status()
        .expect("run ffmpeg");
    assert!(status.success(), "failed to generate test clip");
}

/// Stream types reported by ffprobe, e.g. ["video", "audio"].
pub fn stream_types(path: &Path) -> Vec<String> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-show_entries", "stream=codec_type", "-of", "csv=p=0"])
        .arg(path)
        .output()
        .expect("run ffprobe");
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}
