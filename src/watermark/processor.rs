//! Watermark processor: the image and video entry points.
//!
//! A [`Watermarker`] renders the text stamp once at construction. Each
//! operation then builds one overlay sized to its media and reuses it for
//! every frame.
//!
//! # Example
//!
//! ```ignore
//! use tilemark::{Config, Watermarker};
//!
//! let config = Config::from_file("tilemark.yaml")?;
//! let watermarker = Watermarker::from_config(&config)?;
//! watermarker.watermark_image(Path::new("in.jpg"), Path::new("out.png"))?;
//! watermarker.watermark_video(Path::new("in.mp4"), Path::new("out.mp4"))?;
//! ```

use ab_glyph::Font;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use super::compositor::composite_image;
use super::config::WatermarkConfig;
use super::font::load_resolved_font;
use super::overlay::{compose_overlay, render_stamp, Overlay};
use crate::config::Config;
use crate::error::{Result, WatermarkError};
use crate::output::StagedFile;
use crate::pipeline::FramePipeline;
use crate::video::{EncoderConfig, FfmpegSink, FfmpegSource, VideoSink, VideoSource};

/// Output format for a still image, chosen from the destination extension.
///
/// Unknown or missing extensions fall back to PNG.
pub fn output_format(path: &Path) -> ImageFormat {
    let writable = [
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::Gif,
        ImageFormat::WebP,
    ];
    match ImageFormat::from_path(path) {
        Ok(format) if writable.contains(&format) => format,
        _ => ImageFormat::Png,
    }
}

/// Applies the configured watermark to images and videos.
pub struct Watermarker {
    config: WatermarkConfig,
    stamp: RgbaImage,
    pipeline: FramePipeline,
    encoder: EncoderConfig,
}

impl std::fmt::Debug for Watermarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watermarker")
            .field("text", &self.config.text)
            .field("stamp", &self.stamp.dimensions())
            .field("workers", &self.pipeline.workers())
            .finish()
    }
}

impl Watermarker {
    /// Create a watermarker, rendering the text with `font`.
    pub fn new<F: Font>(
        config: WatermarkConfig,
        font: &F,
        pipeline: FramePipeline,
        encoder: EncoderConfig,
    ) -> Result<Self> {
        let stamp = render_stamp(&config, font)?;
        Self::with_stamp(config, stamp, pipeline, encoder)
    }

    /// Create a watermarker around an already rendered stamp.
    pub fn with_stamp(
        config: WatermarkConfig,
        stamp: RgbaImage,
        pipeline: FramePipeline,
        encoder: EncoderConfig,
    ) -> Result<Self> {
        config.validate()?;
        encoder.validate()?;

        Ok(Self {
            config,
            stamp,
            pipeline,
            encoder,
        })
    }

    /// Build everything from a loaded configuration file.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let resolver = config.font.resolver();
        let font = load_resolved_font(resolver.as_ref())?;
        let pipeline = FramePipeline::from_config(&config.pipeline)?;

        Self::new(
            config.watermark.clone(),
            &font,
            pipeline,
            config.encoder.clone(),
        )
    }

    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &FramePipeline {
        &self.pipeline
    }

    /// Overlay sized for `width x height` media.
    pub fn overlay_for(&self, width: u32, height: u32) -> Result<Overlay> {
        compose_overlay(width, height, &self.stamp, &self.config)
    }

    /// Watermark an in-memory RGBA image.
    pub fn watermark_rgba(&self, image: &RgbaImage) -> Result<RgbaImage> {
        let (width, height) = image.dimensions();
        let overlay = self.overlay_for(width, height)?;
        composite_image(image, &overlay)
    }

    /// Watermark the still image at `input` and write it to `output`.
    ///
    /// The destination is replaced only once the encoded image is complete.
    pub fn watermark_image(&self, input: &Path, output: &Path) -> Result<PathBuf> {
        let started = Instant::now();
        info!(input = %input.display(), output = %output.display(), "Watermarking image");

        let source = image::open(input).map_err(|e| WatermarkError::image_decode(input, e))?;
        let rgba = source.to_rgba8();
        let watermarked = self.watermark_rgba(&rgba)?;

        let format = output_format(output);
        let staged = StagedFile::new(output)?;
        let encoded = match format {
            // JPEG has no alpha channel
            ImageFormat::Jpeg => DynamicImage::ImageRgba8(watermarked)
                .to_rgb8()
                .save_with_format(staged.temp_path(), format),
            _ => watermarked.save_with_format(staged.temp_path(), format),
        };
        encoded.map_err(|e| WatermarkError::image_encode(output, e))?;
        let written = staged.commit()?;

        info!(
            output = %written.display(),
            width = rgba.width(),
            height = rgba.height(),
            format = ?format,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Image watermarked"
        );
        Ok(written)
    }

    /// Watermark every frame of `source` and hand the result to `sink`.
    ///
    /// The sink is only invoked when every frame composited successfully.
    /// Returns the number of frames written.
    pub fn watermark_video_with(
        &self,
        source: &mut dyn VideoSource,
        sink: &mut dyn VideoSink,
    ) -> Result<usize> {
        let metadata = source.metadata().clone();
        let overlay = self.overlay_for(metadata.width, metadata.height)?;

        let frames = source.read_frames()?;
        if frames.is_empty() {
            return Err(WatermarkError::invalid_input("video contains no frames"));
        }
        debug!(
            frames = frames.len(),
            width = metadata.width,
            height = metadata.height,
            frame_rate = %metadata.frame_rate,
            "Decoded video"
        );

        let composited = self.pipeline.composite(frames, &overlay)?;
        sink.write(&composited, metadata.frame_rate, metadata.audio.as_ref())?;

        Ok(composited.len())
    }

    /// Watermark the video at `input` and encode it to `output` with ffmpeg.
    pub fn watermark_video(&self, input: &Path, output: &Path) -> Result<PathBuf> {
        let started = Instant::now();
        info!(
            input = %input.display(),
            output = %output.display(),
            workers = self.pipeline.workers(),
            "Watermarking video"
        );

        let mut source = FfmpegSource::open(input, &self.encoder)?;
        let mut sink = FfmpegSink::new(output, &self.encoder);
        let frames = self.watermark_video_with(&mut source, &mut sink)?;

        info!(
            output = %output.display(),
            frames,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Video watermarked"
        );
        Ok(output.to_path_buf())
    }
}
