//! ffmpeg-based video source and sink.
//!
//! - [`FfmpegSource`] probes the input with `ffprobe` and decodes frames as
//!   raw `bgr24` from an `ffmpeg` child process
//! - [`FfmpegSink`] pipes raw `bgr24` frames into `ffmpeg`, maps the audio
//!   stream of the original file and re-encodes the video
//!
//! The sink writes to a staged temporary file and renames it into place only
//! after ffmpeg exits successfully.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use tracing::{debug, info};

use super::{AudioTrack, FrameRate, VideoMetadata, VideoSink, VideoSource};
use crate::error::{Result, WatermarkError};
use crate::output::StagedFile;
use crate::watermark::BgrFrame;

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_audio_codec() -> String {
    "copy".to_string()
}

fn default_pixel_format() -> String {
    "yuv420p".to_string()
}

/// Encoder section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Path to ffmpeg (default: found on PATH)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<String>,

    /// Path to ffprobe (default: found on PATH)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffprobe_path: Option<String>,

    /// Output video codec (default: "libx264")
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    /// Output audio codec; "copy" passes the source stream through (default: "copy")
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Output pixel format (default: "yuv420p")
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Additional ffmpeg output arguments (e.g. ["-crf", "18"])
    #[serde(default)]
    pub output_args: Vec<String>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            pixel_format: default_pixel_format(),
            output_args: Vec::new(),
        }
    }
}

fn locate(configured: Option<&String>, binary: &str) -> String {
    match configured {
        Some(path) => path.clone(),
        None => which::which(binary).map_or_else(
            |_| binary.to_string(),
            |p| p.to_string_lossy().to_string(),
        ),
    }
}

impl EncoderConfig {
    pub fn ffmpeg(&self) -> String {
        locate(self.ffmpeg_path.as_ref(), "ffmpeg")
    }

    pub fn ffprobe(&self) -> String {
        locate(self.ffprobe_path.as_ref(), "ffprobe")
    }

    pub fn validate(&self) -> Result<()> {
        if self.video_codec.trim().is_empty() {
            return Err(WatermarkError::configuration("encoder video_codec cannot be empty"));
        }
        if self.audio_codec.trim().is_empty() {
            return Err(WatermarkError::configuration("encoder audio_codec cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Interpret `ffprobe -print_format json -show_streams` output.
fn parse_probe(json: &[u8], source: &Path) -> Result<VideoMetadata> {
    let probe: FfprobeOutput = serde_json::from_slice(json).map_err(|e| {
        WatermarkError::invalid_input(format!("unreadable ffprobe output: {}", e))
    })?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| {
            WatermarkError::invalid_input(format!("no video stream in {}", source.display()))
        })?;

    let width = video.width.unwrap_or(0);
    let height = video.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(WatermarkError::invalid_input(format!(
            "video {} has degenerate dimensions {}x{}",
            source.display(),
            width,
            height
        )));
    }

    // r_frame_rate is "0/0" for some containers; fall back to the average
    let frame_rate = [video.r_frame_rate.as_deref(), video.avg_frame_rate.as_deref()]
        .into_iter()
        .flatten()
        .find_map(|rate| rate.parse::<FrameRate>().ok())
        .ok_or_else(|| {
            WatermarkError::invalid_input(format!(
                "video {} has no usable frame rate",
                source.display()
            ))
        })?;

    let audio = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .map(|s| AudioTrack {
            source: source.to_path_buf(),
            codec: s.codec_name.clone(),
        });

    Ok(VideoMetadata {
        width,
        height,
        frame_rate,
        audio,
    })
}

/// Read until `buf` is full or EOF. Returns the number of bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Split a raw `bgr24` stream into frames.
///
/// A trailing partial frame is `InvalidInput`; read failures are `Io`.
fn read_frame_stream<R: Read>(
    reader: &mut R,
    width: u32,
    height: u32,
    source: &Path,
) -> Result<Vec<BgrFrame>> {
    let frame_len = BgrFrame::buffer_len(width, height);
    let mut frames = Vec::new();

    loop {
        let mut buf = vec![0u8; frame_len];
        let read = read_full(reader, &mut buf)?;
        if read == 0 {
            break;
        }
        if read < frame_len {
            return Err(WatermarkError::invalid_input(format!(
                "truncated frame {} in {} ({} of {} bytes)",
                frames.len(),
                source.display(),
                read,
                frame_len
            )));
        }
        frames.push(BgrFrame::new(width, height, buf)?);
    }

    Ok(frames)
}

/// Drain a child's stderr on its own thread; a full stderr pipe stalls ffmpeg.
fn drain_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    child.stderr.take().map(|mut stderr| {
        std::thread::spawn(move || {
            let mut text = String::new();
            let _ = stderr.read_to_string(&mut text);
            text
        })
    })
}

fn collect_stderr(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Video input decoded by an `ffmpeg` child process.
#[derive(Debug)]
pub struct FfmpegSource {
    path: PathBuf,
    ffmpeg: String,
    metadata: VideoMetadata,
}

impl FfmpegSource {
    /// Probe `path` and prepare it for decoding.
    pub fn open(path: &Path, config: &EncoderConfig) -> Result<Self> {
        if !path.is_file() {
            return Err(WatermarkError::invalid_input(format!(
                "video file not found: {}",
                path.display()
            )));
        }

        let ffprobe = config.ffprobe();
        let output = Command::new(&ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|e| WatermarkError::io(format!("failed to run {}: {}", ffprobe, e)))?;

        if !output.status.success() {
            return Err(WatermarkError::invalid_input(format!(
                "ffprobe could not read {} ({})",
                path.display(),
                output.status
            )));
        }

        let metadata = parse_probe(&output.stdout, path)?;
        debug!(
            path = %path.display(),
            width = metadata.width,
            height = metadata.height,
            frame_rate = %metadata.frame_rate,
            has_audio = metadata.audio.is_some(),
            "Probed video"
        );

        Ok(Self {
            path: path.to_path_buf(),
            ffmpeg: config.ffmpeg(),
            metadata,
        })
    }

    fn decode_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-noautorotate", "-i"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push(self.path.to_string_lossy().to_string());
        args.extend(
            ["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "bgr24", "-"]
                .iter()
                .map(|s| s.to_string()),
        );
        args
    }
}

impl VideoSource for FfmpegSource {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn read_frames(&mut self) -> Result<Vec<BgrFrame>> {
        let mut child = Command::new(&self.ffmpeg)
            .args(self.decode_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| WatermarkError::io(format!("failed to run {}: {}", self.ffmpeg, e)))?;

        let stderr = drain_stderr(&mut child);
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| WatermarkError::io("failed to capture ffmpeg stdout"))?;

        let decoded = read_frame_stream(
            &mut stdout,
            self.metadata.width,
            self.metadata.height,
            &self.path,
        );
        if decoded.is_err() {
            // Stop the decoder before reaping it
            let _ = child.kill();
        }
        drop(stdout);

        let status = child.wait()?;
        let stderr = collect_stderr(stderr);
        let frames = decoded?;
        if !status.success() {
            return Err(WatermarkError::invalid_input(format!(
                "ffmpeg failed to decode {} ({}): {}",
                self.path.display(),
                status,
                stderr
            )));
        }

        debug!(path = %self.path.display(), frames = frames.len(), "Decoded video frames");
        Ok(frames)
    }
}

/// Video output encoded by an `ffmpeg` child process.
#[derive(Debug)]
pub struct FfmpegSink {
    destination: PathBuf,
    config: EncoderConfig,
}

impl FfmpegSink {
    pub fn new(destination: &Path, config: &EncoderConfig) -> Self {
        Self {
            destination: destination.to_path_buf(),
            config: config.clone(),
        }
    }

    /// Build the ffmpeg argument list for encoding to `output`.
    ///
    /// Input 0 is raw `bgr24` on stdin; input 1, when present, is the original
    /// file whose audio stream is mapped (optional, `1:a:0?`).
    pub fn build_args(
        &self,
        output: &Path,
        width: u32,
        height: u32,
        frame_rate: FrameRate,
        audio: Option<&AudioTrack>,
    ) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-y"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        // Raw frames on stdin
        args.extend([
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "bgr24".to_string(),
            "-s".to_string(),
            format!("{}x{}", width, height),
            "-r".to_string(),
            frame_rate.to_string(),
            "-i".to_string(),
            "-".to_string(),
        ]);

        if let Some(track) = audio {
            args.push("-i".to_string());
            args.push(track.source.to_string_lossy().to_string());
        }

        args.push("-map".to_string());
        args.push("0:v:0".to_string());
        if audio.is_some() {
            args.push("-map".to_string());
            args.push("1:a:0?".to_string());
            args.push("-c:a".to_string());
            args.push(self.config.audio_codec.clone());
        }

        args.push("-c:v".to_string());
        args.push(self.config.video_codec.clone());
        args.push("-pix_fmt".to_string());
        args.push(self.config.pixel_format.clone());
        args.push("-r".to_string());
        args.push(frame_rate.to_string());

        args.extend(self.config.output_args.clone());
        args.push(output.to_string_lossy().to_string());
        args
    }
}

impl VideoSink for FfmpegSink {
    fn write(
        &mut self,
        frames: &[BgrFrame],
        frame_rate: FrameRate,
        audio: Option<&AudioTrack>,
    ) -> Result<()> {
        let first = frames
            .first()
            .ok_or_else(|| WatermarkError::invalid_input("cannot encode a video without frames"))?;
        let (width, height) = first.dimensions();

        let staged = StagedFile::new(&self.destination)?;
        let ffmpeg = self.config.ffmpeg();
        let args = self.build_args(staged.temp_path(), width, height, frame_rate, audio);
        debug!(ffmpeg = %ffmpeg, args = ?args, "Starting encoder");

        let mut child = Command::new(&ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| WatermarkError::io(format!("failed to run {}: {}", ffmpeg, e)))?;

        let stderr = drain_stderr(&mut child);
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| WatermarkError::io("failed to capture ffmpeg stdin"))?;

        let mut write_result = Ok(());
        for frame in frames {
            if frame.dimensions() != (width, height) {
                write_result = Err(WatermarkError::invalid_input(format!(
                    "frame size changed mid-stream: {}x{} then {}x{}",
                    width,
                    height,
                    frame.width(),
                    frame.height()
                )));
                break;
            }
            if let Err(e) = stdin.write_all(frame.as_bytes()) {
                write_result = Err(WatermarkError::Io(e));
                break;
            }
        }
        // Closing stdin signals end of stream
        drop(stdin);

        let status = child.wait()?;
        let stderr = collect_stderr(stderr);

        // A failed write usually means ffmpeg quit; its exit status and stderr say why
        if let Err(e @ WatermarkError::InvalidInput(_)) = write_result {
            return Err(e);
        }
        if !status.success() {
            // `staged` is dropped here and removes the partial output
            return Err(WatermarkError::io(format!(
                "ffmpeg failed to encode {} ({}): {}",
                self.destination.display(),
                status,
                stderr
            )));
        }
        write_result?;

        let path = staged.commit()?;
        info!(
            output = %path.display(),
            frames = frames.len(),
            codec = %self.config.video_codec,
            "Encoded video"
        );
        Ok(())
    }
}
