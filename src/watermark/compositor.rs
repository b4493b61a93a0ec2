//! Watermark compositor for blending the overlay onto frames and images.
//!
//! Both entry points are pure: they read the source and the overlay and
//! return a new buffer.
//!
//! - [`composite_frame`] - video frames (opaque BGR), via the pixel-format bridge
//! - [`composite_image`] - still images (RGBA, source may carry alpha)
//!
//! Pixels where the overlay alpha is 0 are copied untouched, so regions the
//! watermark does not cover stay bit-identical.

use image::{Rgba, RgbaImage};

use super::bridge::{bgr_to_rgba, rgba_to_bgr, BgrFrame};
use super::overlay::Overlay;
use crate::error::{Result, WatermarkError};

fn check_dimensions(target: (u32, u32), overlay: &Overlay) -> Result<()> {
    if target != overlay.dimensions() {
        return Err(WatermarkError::invalid_input(format!(
            "overlay is {}x{} but target is {}x{}",
            overlay.width(),
            overlay.height(),
            target.0,
            target.1
        )));
    }
    Ok(())
}

/// Blend one overlay pixel onto an opaque pixel.
///
/// `out = src * (1 - a) + overlay * a` per color channel, rounded to nearest.
#[inline]
pub(crate) fn blend_opaque(src: Rgba<u8>, overlay: Rgba<u8>) -> Rgba<u8> {
    let alpha = overlay[3] as u32;
    if alpha == 0 {
        return src;
    }

    let mix = |s: u8, o: u8| -> u8 {
        ((s as u32 * (255 - alpha) + o as u32 * alpha + 127) / 255) as u8
    };

    Rgba([
        mix(src[0], overlay[0]),
        mix(src[1], overlay[1]),
        mix(src[2], overlay[2]),
        src[3],
    ])
}

/// Blend two straight-alpha pixels with the Porter-Duff "over" operator.
///
/// result = foreground + background * (1 - foreground.alpha)
pub(crate) fn blend_over(background: Rgba<u8>, foreground: Rgba<u8>) -> Rgba<u8> {
    if foreground[3] == 0 {
        return background;
    }

    let fg_alpha = foreground[3] as f32 / 255.0;
    let bg_alpha = background[3] as f32 / 255.0;
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Alpha-blend the overlay onto one video frame.
///
/// The frame goes through the bridge to RGBA, is blended, and comes back
/// as BGR. The input frame is not modified.
pub fn composite_frame(frame: &BgrFrame, overlay: &Overlay) -> Result<BgrFrame> {
    check_dimensions(frame.dimensions(), overlay)?;

    let mut rgba = bgr_to_rgba(frame)?;
    for (dst, src) in rgba.pixels_mut().zip(overlay.image().pixels()) {
        *dst = blend_opaque(*dst, *src);
    }

    Ok(rgba_to_bgr(&rgba))
}

/// Alpha-composite the overlay onto an RGBA image.
pub fn composite_image(image: &RgbaImage, overlay: &Overlay) -> Result<RgbaImage> {
    check_dimensions(image.dimensions(), overlay)?;

    let mut output = image.clone();
    for (dst, src) in output.pixels_mut().zip(overlay.image().pixels()) {
        *dst = blend_over(*dst, *src);
    }

    Ok(output)
}
