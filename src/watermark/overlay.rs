//! Overlay generation.
//!
//! Builds the single tiled, rotated, semi-transparent watermark layer that
//! is blended onto every frame of a video or onto a still image.
//!
//! # Algorithm
//!
//! 1. Render the text once into an RGBA stamp.
//! 2. Tile the stamp over a transparent canvas of 4W x 4H, starting at
//!    `origin` and stepping by the configured column/row steps until the
//!    far canvas edges minus `margin`.
//! 3. Rotate the canvas counter-clockwise about its center (canvas size kept,
//!    nearest-neighbour sampling, uncovered corners transparent).
//! 4. Keep the box `(W, H, 2W, 2H)`.
//!
//! Steps 3 and 4 are fused: only the kept pixels are sampled, which gives the
//! same pixels as rotating the whole canvas and cropping afterwards.

use ab_glyph::Font;
use image::{Rgba, RgbaImage};
use tracing::debug;

use super::compositor::blend_over;
use super::config::WatermarkConfig;
use super::text_renderer::{render_text, TextRenderOptions};
use crate::error::{Result, WatermarkError};

/// Canvas side length, in multiples of the target side length.
pub const CANVAS_SCALE: u32 = 4;

/// The precomputed watermark layer, sized exactly to the target media.
///
/// Immutable once built; workers share it by reference.
#[derive(Clone, PartialEq, Eq)]
pub struct Overlay {
    image: RgbaImage,
}

impl std::fmt::Debug for Overlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overlay")
            .field("dimensions", &self.image.dimensions())
            .finish()
    }
}

impl Overlay {
    /// Wrap an existing RGBA layer.
    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Number of pixels with non-zero alpha.
    pub fn covered_pixels(&self) -> usize {
        self.image.pixels().filter(|p| p[3] > 0).count()
    }
}

/// Where tiles start on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLayout {
    pub origin: u32,
    pub margin: u32,
    pub column_step: u32,
    pub row_step: u32,
}

impl TileLayout {
    pub fn from_config(config: &WatermarkConfig) -> Self {
        Self {
            origin: config.origin,
            margin: config.margin,
            column_step: config.column_step(),
            row_step: config.row_step(),
        }
    }
}

fn axis_origins(extent: u32, origin: u32, margin: u32, step: u32) -> Vec<u32> {
    let end = extent as i64 - margin as i64;
    let step = step.max(1) as i64;
    let mut origins = Vec::new();
    let mut position = origin as i64;
    while position < end {
        origins.push(position as u32);
        position += step;
    }
    origins
}

/// Calculate tile origins for a canvas, row by row.
///
/// Empty when the canvas is too small to hold a single tile origin.
pub fn tile_origins(canvas_width: u32, canvas_height: u32, layout: &TileLayout) -> Vec<(u32, u32)> {
    let xs = axis_origins(canvas_width, layout.origin, layout.margin, layout.column_step);
    let ys = axis_origins(canvas_height, layout.origin, layout.margin, layout.row_step);

    ys.iter()
        .flat_map(|&y| xs.iter().map(move |&x| (x, y)))
        .collect()
}

/// Blend `stamp` onto `canvas` with its top-left corner at (x, y), clipped to the canvas.
fn paint_stamp(canvas: &mut RgbaImage, stamp: &RgbaImage, x: u32, y: u32) {
    let x_end = (x as u64 + stamp.width() as u64).min(canvas.width() as u64) as u32;
    let y_end = (y as u64 + stamp.height() as u64).min(canvas.height() as u64) as u32;

    for ty in y..y_end {
        for tx in x..x_end {
            let src = *stamp.get_pixel(tx - x, ty - y);
            if src[3] == 0 {
                continue;
            }
            let dst = *canvas.get_pixel(tx, ty);
            canvas.put_pixel(tx, ty, blend_over(dst, src));
        }
    }
}

/// Paint the stamp at every tile origin. Returns the number of tiles painted.
pub fn tile_stamp(canvas: &mut RgbaImage, stamp: &RgbaImage, layout: &TileLayout) -> usize {
    let origins = tile_origins(canvas.width(), canvas.height(), layout);
    for &(x, y) in &origins {
        paint_stamp(canvas, stamp, x, y);
    }
    origins.len()
}

fn round15(v: f64) -> f64 {
    (v * 1e15).round() / 1e15
}

/// Rotate `canvas` counter-clockwise by `degrees` about its center and return
/// the `crop_width x crop_height` region whose top-left corner is at
/// (`crop_x`, `crop_y`) in rotated-canvas coordinates.
///
/// Sampling is nearest-neighbour at pixel centers; samples falling outside
/// the canvas are transparent.
pub fn rotate_and_crop(
    canvas: &RgbaImage,
    degrees: f32,
    crop_x: u32,
    crop_y: u32,
    crop_width: u32,
    crop_height: u32,
) -> RgbaImage {
    let radians = -(degrees as f64 % 360.0).to_radians();
    let cos = round15(radians.cos());
    let sin = round15(radians.sin());

    let src_w = canvas.width() as f64;
    let src_h = canvas.height() as f64;
    let cx = src_w / 2.0;
    let cy = src_h / 2.0;

    let mut output = RgbaImage::new(crop_width, crop_height);

    for oy in 0..crop_height {
        let dy = (crop_y + oy) as f64 + 0.5 - cy;
        for ox in 0..crop_width {
            let dx = (crop_x + ox) as f64 + 0.5 - cx;

            // Inverse mapping: output pixel center -> source position
            let sx = cos * dx + sin * dy + cx;
            let sy = -sin * dx + cos * dy + cy;

            if sx < 0.0 || sy < 0.0 || sx >= src_w || sy >= src_h {
                continue;
            }

            let pixel: Rgba<u8> = *canvas.get_pixel(sx as u32, sy as u32);
            if pixel[3] != 0 {
                output.put_pixel(ox, oy, pixel);
            }
        }
    }

    output
}

/// Build an overlay from a pre-rendered stamp.
///
/// Validates the target size and the configuration, tiles the stamp over
/// the 4x canvas, rotates and crops back to `width x height`.
pub fn compose_overlay(
    width: u32,
    height: u32,
    stamp: &RgbaImage,
    config: &WatermarkConfig,
) -> Result<Overlay> {
    if width == 0 || height == 0 {
        return Err(WatermarkError::invalid_input(format!(
            "cannot build a watermark overlay for {}x{} media",
            width, height
        )));
    }
    config.validate()?;

    let canvas_width = width.checked_mul(CANVAS_SCALE);
    let canvas_height = height.checked_mul(CANVAS_SCALE);
    let (canvas_width, canvas_height) = match (canvas_width, canvas_height) {
        (Some(w), Some(h)) => (w, h),
        _ => {
            return Err(WatermarkError::invalid_input(format!(
                "media dimensions {}x{} are too large",
                width, height
            )))
        }
    };

    let mut canvas = RgbaImage::new(canvas_width, canvas_height);
    let layout = TileLayout::from_config(config);
    let tiles = tile_stamp(&mut canvas, stamp, &layout);

    let overlay = rotate_and_crop(&canvas, config.angle, width, height, width, height);

    debug!(
        width,
        height,
        tiles,
        angle = config.angle,
        "Generated watermark overlay"
    );

    Ok(Overlay::from_image(overlay))
}

/// Render the text stamp that gets tiled over the canvas.
///
/// The stamp depends only on the configuration, so it can be rendered once
/// and reused for media of any size.
pub fn render_stamp<F: Font>(config: &WatermarkConfig, font: &F) -> Result<RgbaImage> {
    config.validate()?;

    let options = TextRenderOptions {
        text: config.text.clone(),
        font_size: config.font_size as f32,
        color: config.fill_color()?,
        line_spacing: config.line_spacing as f32,
    };
    render_text(font, &options)
}

/// Generate the watermark overlay for `width x height` media.
pub fn generate_overlay<F: Font>(
    width: u32,
    height: u32,
    config: &WatermarkConfig,
    font: &F,
) -> Result<Overlay> {
    if width == 0 || height == 0 {
        return Err(WatermarkError::invalid_input(format!(
            "cannot build a watermark overlay for {}x{} media",
            width, height
        )));
    }

    let stamp = render_stamp(config, font)?;
    compose_overlay(width, height, &stamp, config)
}
