//! Error types for watermarking operations

use thiserror::Error;

/// Centralized error type for watermarking
///
/// Categorizes failures into 4 kinds so callers can decide whether to
/// fix their setup, their input, or simply retry the whole operation.
#[derive(Error, Debug)]
pub enum WatermarkError {
    /// Font asset missing or unreadable, invalid configuration values
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Source media cannot be decoded or has degenerate dimensions
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A worker failed while compositing a frame
    #[error("Processing error on frame {index}: {reason}")]
    Processing { index: usize, reason: String },

    /// Destination unwritable or encoding failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatermarkError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn processing(index: usize, reason: impl Into<String>) -> Self {
        Self::Processing {
            index,
            reason: reason.into(),
        }
    }

    /// Build an `Io` error from a message (encoder exit status, missing binary, ...)
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(std::io::Error::new(std::io::ErrorKind::Other, message.into()))
    }

    /// Map a decoding failure of the source image at `path`.
    pub fn image_decode(path: &std::path::Path, err: image::ImageError) -> Self {
        Self::InvalidInput(format!("cannot decode {}: {}", path.display(), err))
    }

    /// Map an encoding failure while writing the image at `path`.
    pub fn image_encode(path: &std::path::Path, err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Self::Io(e),
            other => Self::io(format!("cannot encode {}: {}", path.display(), other)),
        }
    }

    /// Short category name, used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::InvalidInput(_) => "invalid_input",
            Self::Processing { .. } => "processing",
            Self::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, WatermarkError>;
