//! Watermark style configuration.
//!
//! Defines the text watermark and its tiling layout. Every tiling constant
//! (column/row spacing, tile origin, canvas margin) is a configuration value
//! with a default, so the overlay generator never hard-codes them.
//!
//! ```yaml
//! watermark:
//!   text: "Confidential"
//!   font_size: 45
//!   angle: 45
//!   color: "#A9A9A933"
//!   column_spacing: 1
//!   row_spacing: 4
//! ```

use serde::{Deserialize, Serialize};

use super::text_renderer::{parse_hex_color, Color};
use crate::error::{Result, WatermarkError};

// Default values
fn default_text() -> String {
    "Watermark".to_string()
}

fn default_font_size() -> u32 {
    45
}

fn default_angle() -> f32 {
    45.0
}

fn default_color() -> String {
    // Muted gray (169, 169, 169) at 20% opacity
    "#A9A9A933".to_string()
}

fn default_column_spacing() -> u32 {
    1
}

fn default_row_spacing() -> u32 {
    4
}

fn default_origin() -> u32 {
    10
}

fn default_margin() -> u32 {
    10
}

fn default_line_spacing() -> u32 {
    4
}

/// Text watermark configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Watermark text, may contain `\n` for multi-line tiles (default: "Watermark")
    #[serde(default = "default_text")]
    pub text: String,

    /// Font size in pixels (default: 45)
    #[serde(default = "default_font_size")]
    pub font_size: u32,

    /// Counter-clockwise rotation in degrees (default: 45)
    #[serde(default = "default_angle")]
    pub angle: f32,

    /// Fill color as `#RRGGBB` or `#RRGGBBAA` (default: "#A9A9A933")
    #[serde(default = "default_color")]
    pub color: String,

    /// Horizontal tile step, in multiples of `font_size * chars(text)` (default: 1)
    #[serde(default = "default_column_spacing")]
    pub column_spacing: u32,

    /// Vertical tile step, in multiples of `font_size` (default: 4)
    #[serde(default = "default_row_spacing")]
    pub row_spacing: u32,

    /// Offset of the first tile from the canvas origin, in pixels (default: 10)
    #[serde(default = "default_origin")]
    pub origin: u32,

    /// No tile starts within this many pixels of the far canvas edges (default: 10)
    #[serde(default = "default_margin")]
    pub margin: u32,

    /// Extra pixels between lines of multi-line text (default: 4)
    #[serde(default = "default_line_spacing")]
    pub line_spacing: u32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: default_text(),
            font_size: default_font_size(),
            angle: default_angle(),
            color: default_color(),
            column_spacing: default_column_spacing(),
            row_spacing: default_row_spacing(),
            origin: default_origin(),
            margin: default_margin(),
            line_spacing: default_line_spacing(),
        }
    }
}

impl WatermarkConfig {
    /// Create a configuration with the given text and default styling.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Parsed fill color.
    pub fn fill_color(&self) -> Result<Color> {
        parse_hex_color(&self.color)
    }

    /// Horizontal tile step, or `None` if it does not fit in a `u32`.
    pub fn checked_column_step(&self) -> Option<u32> {
        let chars = u32::try_from(self.text.chars().count()).ok()?;
        self.column_spacing
            .checked_mul(self.font_size)?
            .checked_mul(chars)
    }

    /// Vertical tile step, or `None` if it does not fit in a `u32`.
    pub fn checked_row_step(&self) -> Option<u32> {
        self.row_spacing.checked_mul(self.font_size)
    }

    /// Horizontal distance between tile origins in pixels.
    pub fn column_step(&self) -> u32 {
        self.checked_column_step().unwrap_or(u32::MAX).max(1)
    }

    /// Vertical distance between tile origins in pixels.
    pub fn row_step(&self) -> u32 {
        self.checked_row_step().unwrap_or(u32::MAX).max(1)
    }

    /// Check the invariants the overlay generator relies on.
    pub fn validate(&self) -> Result<()> {
        if self.text.is_empty() {
            return Err(WatermarkError::configuration(
                "watermark text cannot be empty",
            ));
        }
        if self.font_size == 0 {
            return Err(WatermarkError::configuration(
                "font_size must be a positive integer",
            ));
        }
        if self.column_spacing == 0 || self.row_spacing == 0 {
            return Err(WatermarkError::configuration(format!(
                "tile spacing multipliers must be positive integers (column: {}, row: {})",
                self.column_spacing, self.row_spacing
            )));
        }
        if self.checked_column_step().is_none() || self.checked_row_step().is_none() {
            return Err(WatermarkError::configuration(format!(
                "tile step overflows: font_size {} with spacing multipliers (column: {}, row: {})",
                self.font_size, self.column_spacing, self.row_spacing
            )));
        }
        if !self.angle.is_finite() {
            return Err(WatermarkError::configuration(format!(
                "angle must be a finite number of degrees, got {}",
                self.angle
            )));
        }
        self.fill_color()?;
        Ok(())
    }
}
