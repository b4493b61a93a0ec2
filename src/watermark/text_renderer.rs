//! Text watermark rendering.
//!
//! Renders (possibly multi-line) watermark text into a small RGBA "stamp"
//! that the overlay generator repeats across its canvas.
//!
//! # Features
//!
//! - Hex color parsing (#RGB, #RRGGBB and #RRGGBBAA formats)
//! - Multi-line text with configurable line spacing
//! - Anti-aliased glyph coverage folded into the fill alpha, so the stamp
//!   never exceeds the fill color's own alpha
//!
//! # Example
//!
//! ```ignore
//! use tilemark::watermark::text_renderer::{render_text, TextRenderOptions, parse_hex_color};
//!
//! let options = TextRenderOptions {
//!     text: "Copyright 2025".to_string(),
//!     font_size: 24.0,
//!     color: parse_hex_color("#FFFFFF80").unwrap(),
//!     line_spacing: 4.0,
//! };
//!
//! let stamp = render_text(&font, &options).unwrap();
//! ```

use ab_glyph::{Font, GlyphId, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};

use crate::error::{Result, WatermarkError};

/// Straight-alpha RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Fully opaque color.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

}

/// Options for text rendering.
#[derive(Debug, Clone)]
pub struct TextRenderOptions {
    /// The text to render. `\n` starts a new line.
    pub text: String,
    /// Font size in pixels.
    pub font_size: f32,
    /// Fill color, alpha included.
    pub color: Color,
    /// Extra pixels between lines.
    pub line_spacing: f32,
}

impl Default for TextRenderOptions {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 45.0,
            color: Color::new(169, 169, 169, 51),
            line_spacing: 4.0,
        }
    }
}

fn hex_component(hex: &str) -> Result<u8> {
    u8::from_str_radix(hex, 16)
        .map_err(|_| WatermarkError::configuration(format!("Invalid hex digit in '{}'", hex)))
}

/// Parse a hex color string into RGBA components.
///
/// Supports #RGB, #RRGGBB (opaque) and #RRGGBBAA formats.
///
/// # Examples
///
/// ```ignore
/// let gray = parse_hex_color("#A9A9A933").unwrap();
/// assert_eq!(gray, Color::new(169, 169, 169, 51));
/// ```
pub fn parse_hex_color(hex: &str) -> Result<Color> {
    let hex = hex
        .strip_prefix('#')
        .ok_or_else(|| WatermarkError::configuration("Color must start with '#'"))?;

    if !hex.is_ascii() {
        return Err(WatermarkError::configuration(format!(
            "Invalid hex color '#{}'",
            hex
        )));
    }

    match hex.len() {
        3 => {
            // #RGB format - each digit doubled: 0xF -> 0xFF
            let r = hex_component(&hex[0..1])?;
            let g = hex_component(&hex[1..2])?;
            let b = hex_component(&hex[2..3])?;
            Ok(Color::rgb(r * 17, g * 17, b * 17))
        }
        6 => Ok(Color::rgb(
            hex_component(&hex[0..2])?,
            hex_component(&hex[2..4])?,
            hex_component(&hex[4..6])?,
        )),
        8 => Ok(Color::new(
            hex_component(&hex[0..2])?,
            hex_component(&hex[2..4])?,
            hex_component(&hex[4..6])?,
            hex_component(&hex[6..8])?,
        )),
        _ => Err(WatermarkError::configuration(format!(
            "Color must be #RGB, #RRGGBB or #RRGGBBAA format, got {} characters",
            hex.len()
        ))),
    }
}

fn line_width<F: Font>(font: &F, scale: PxScale, line: &str) -> f32 {
    let scaled_font = font.as_scaled(scale);
    let mut width = 0.0f32;
    let mut prev_glyph: Option<GlyphId> = None;

    for c in line.chars() {
        let glyph_id = scaled_font.glyph_id(c);
        if let Some(prev) = prev_glyph {
            width += scaled_font.kern(prev, glyph_id);
        }
        width += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    width
}

/// Calculate the dimensions of rendered (multi-line) text.
///
/// Returns (width, height) in pixels.
pub fn measure_text<F: Font>(
    font: &F,
    text: &str,
    font_size: f32,
    line_spacing: f32,
) -> (u32, u32) {
    let scale = PxScale::from(font_size);
    let scaled_font = font.as_scaled(scale);

    let lines: Vec<&str> = text.split('\n').collect();
    let width = lines
        .iter()
        .map(|line| line_width(font, scale, line))
        .fold(0.0f32, f32::max);

    let line_height = scaled_font.height();
    let height = line_height * lines.len() as f32 + line_spacing * (lines.len() - 1) as f32;

    // Small padding for glyphs that overhang their advance
    let padding = 2;
    (
        width.ceil() as u32 + padding,
        height.ceil() as u32 + padding,
    )
}

/// Render text to an RGBA stamp with a transparent background.
pub fn render_text<F: Font>(font: &F, options: &TextRenderOptions) -> Result<RgbaImage> {
    if options.text.is_empty() {
        return Err(WatermarkError::configuration("Cannot render empty text"));
    }
    if options.font_size <= 0.0 {
        return Err(WatermarkError::configuration(format!(
            "Font size must be positive, got {}",
            options.font_size
        )));
    }

    let scale = PxScale::from(options.font_size);
    let scaled_font = font.as_scaled(scale);

    let (width, height) =
        measure_text(font, &options.text, options.font_size, options.line_spacing);
    let mut image = RgbaImage::new(width.max(1), height.max(1));

    let ascent = scaled_font.ascent();
    let line_advance = scaled_font.height() + options.line_spacing;

    for (line_index, line) in options.text.split('\n').enumerate() {
        let baseline_y = line_index as f32 * line_advance + ascent;
        let mut cursor_x = 0.0f32;
        let mut prev_glyph: Option<GlyphId> = None;

        for c in line.chars() {
            let glyph_id = scaled_font.glyph_id(c);

            if let Some(prev) = prev_glyph {
                cursor_x += scaled_font.kern(prev, glyph_id);
            }

            let position = ab_glyph::point(cursor_x, baseline_y);
            let glyph = glyph_id.with_scale_and_position(scale, position);

            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();

                outlined.draw(|px, py, coverage| {
                    let x = px as i32 + bounds.min.x as i32;
                    let y = py as i32 + bounds.min.y as i32;

                    if x >= 0 && y >= 0 && x < image.width() as i32 && y < image.height() as i32 {
                        let pixel_alpha = (coverage.clamp(0.0, 1.0) * options.color.a as f32) as u8;
                        if pixel_alpha == 0 {
                            return;
                        }
                        // Overlapping glyph edges keep the stronger coverage
                        let existing = image.get_pixel(x as u32, y as u32)[3];
                        if pixel_alpha > existing {
                            let pixel = Rgba([
                                options.color.r,
                                options.color.g,
                                options.color.b,
                                pixel_alpha,
                            ]);
                            image.put_pixel(x as u32, y as u32, pixel);
                        }
                    }
                });
            }

            cursor_x += scaled_font.h_advance(glyph_id);
            prev_glyph = Some(glyph_id);
        }
    }

    Ok(image)
}
