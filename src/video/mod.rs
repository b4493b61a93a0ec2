//! Video decoding and encoding collaborators.
//!
//! The watermarking core only depends on the [`VideoSource`] and
//! [`VideoSink`] traits. [`ffmpeg`] provides the production implementation
//! that drives the `ffprobe` / `ffmpeg` command-line tools.

pub mod ffmpeg;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, WatermarkError};
use crate::watermark::BgrFrame;

pub use ffmpeg::{EncoderConfig, FfmpegSink, FfmpegSource};

/// Exact rational frame rate, e.g. 30000/1001 for NTSC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub fn new(num: u32, den: u32) -> Result<Self> {
        if num == 0 || den == 0 {
            return Err(WatermarkError::invalid_input(format!(
                "invalid frame rate {}/{}",
                num, den
            )));
        }
        Ok(Self { num, den })
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl FromStr for FrameRate {
    type Err = WatermarkError;

    /// Parse "30/1", "30000/1001" or a plain integer "25".
    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: &str| {
            part.trim().parse::<u32>().map_err(|_| {
                WatermarkError::invalid_input(format!("invalid frame rate '{}'", s))
            })
        };

        match s.split_once('/') {
            Some((num, den)) => Self::new(parse(num)?, parse(den)?),
            None => Self::new(parse(s)?, 1),
        }
    }
}

/// Reference to the source's audio stream, passed through unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTrack {
    /// File the audio stream is read from
    pub source: PathBuf,
    /// Codec name reported by the prober, if known
    pub codec: Option<String>,
}

/// What the decoder knows about a video before reading frames.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    pub audio: Option<AudioTrack>,
}

/// Decoded video input.
pub trait VideoSource {
    fn metadata(&self) -> &VideoMetadata;

    /// Decode every frame, in source order.
    fn read_frames(&mut self) -> Result<Vec<BgrFrame>>;
}

/// Encoded video output.
pub trait VideoSink {
    /// Encode `frames` at `frame_rate`, muxing `audio` when present.
    fn write(
        &mut self,
        frames: &[BgrFrame],
        frame_rate: FrameRate,
        audio: Option<&AudioTrack>,
    ) -> Result<()>;
}
