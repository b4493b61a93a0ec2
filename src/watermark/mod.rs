//! Watermark module for applying tiled text watermarks to images and frames.
//!
//! One overlay is generated per operation and reused for every frame or
//! image it applies to.
//!
//! # Features
//!
//! - **Tiled, rotated text** rendered once into a stamp and repeated over a 4x canvas
//! - **Pixel-format bridge** between decoded BGR frames and RGBA compositing images
//! - **Alpha compositing** that leaves uncovered pixels bit-identical
//! - **Pluggable fonts** through the [`FontResolver`] trait
//!
//! # Configuration Example
//!
//! ```yaml
//! watermark:
//!   text: "Confidential"
//!   font_size: 45
//!   angle: 45
//!   color: "#A9A9A933"
//! font:
//!   search_dirs: ["./assets"]
//!   file_name: "MiSans-Medium.ttf"
//! ```

pub mod bridge;
pub mod compositor;
pub mod config;
pub mod font;
pub mod overlay;
pub mod processor;
pub mod text_renderer;

// Re-export main types for convenience
pub use bridge::{bgr_to_rgba, rgba_to_bgr, BgrFrame};
pub use compositor::{composite_frame, composite_image};
pub use config::WatermarkConfig;
pub use font::{load_font, load_resolved_font, FontConfig, FontPath, FontResolver, FontSearch};
pub use overlay::{
    compose_overlay, generate_overlay, render_stamp, rotate_and_crop, tile_origins, tile_stamp,
    Overlay, TileLayout,
};
pub use processor::Watermarker;
pub use text_renderer::{measure_text, parse_hex_color, render_text, Color, TextRenderOptions};
