// tilemark: tiled text watermarks for images and videos

pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline; // Parallel frame compositing with order restoration
pub mod video;
pub mod watermark;

pub use config::Config;
pub use error::{Result, WatermarkError};
pub use pipeline::FramePipeline;
pub use watermark::{Overlay, Watermarker};
