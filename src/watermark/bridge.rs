//! Conversion between decoded video frames and compositing images.
//!
//! Decoders and encoders exchange frames as interleaved BGR bytes
//! ([`BgrFrame`]); compositing works on straight-alpha RGBA images
//! ([`image::RgbaImage`]). Conversions are pure channel reorders, so an
//! opaque frame survives `bgr_to_rgba` followed by `rgba_to_bgr` bit-exactly.

use image::RgbaImage;

use crate::error::{Result, WatermarkError};

/// Bytes per BGR pixel.
pub const BGR_CHANNELS: usize = 3;

/// One decoded video frame: row-major, interleaved blue-green-red bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct BgrFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for BgrFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BgrFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl BgrFrame {
    /// Wrap a raw buffer, checking that its length matches the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = Self::buffer_len(width, height);
        if data.len() != expected {
            return Err(WatermarkError::invalid_input(format!(
                "BGR frame {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A frame filled with one color.
    pub fn filled(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let data = bgr.repeat(width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    /// Number of bytes a `width x height` BGR frame occupies.
    pub fn buffer_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BGR_CHANNELS
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// BGR triple at (x, y). Panics when out of bounds, like `image::ImageBuffer::get_pixel`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let offset = (y as usize * self.width as usize + x as usize) * BGR_CHANNELS;
        [self.data[offset], self.data[offset + 1], self.data[offset + 2]]
    }

    /// Buffer length still matches the dimensions.
    pub(crate) fn is_well_formed(&self) -> bool {
        self.data.len() == Self::buffer_len(self.width, self.height)
    }

    /// Construct without validation; used by tests simulating corrupt decoder output.
    #[doc(hidden)]
    pub fn from_raw_unchecked(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }
}

/// Forward: BGR frame to an opaque RGBA image.
pub fn bgr_to_rgba(frame: &BgrFrame) -> Result<RgbaImage> {
    if !frame.is_well_formed() {
        return Err(WatermarkError::invalid_input(format!(
            "malformed frame buffer: {} bytes for {}x{}",
            frame.data.len(),
            frame.width,
            frame.height
        )));
    }

    let mut rgba = Vec::with_capacity(frame.width as usize * frame.height as usize * 4);
    for bgr in frame.data.chunks_exact(BGR_CHANNELS) {
        rgba.extend_from_slice(&[bgr[2], bgr[1], bgr[0], 255]);
    }

    RgbaImage::from_raw(frame.width, frame.height, rgba)
        .ok_or_else(|| WatermarkError::invalid_input("RGBA buffer size mismatch"))
}

/// Reverse: drop alpha and reorder to BGR.
pub fn rgba_to_bgr(image: &RgbaImage) -> BgrFrame {
    let mut data = Vec::with_capacity(BgrFrame::buffer_len(image.width(), image.height()));
    for rgba in image.as_raw().chunks_exact(4) {
        data.extend_from_slice(&[rgba[2], rgba[1], rgba[0]]);
    }

    BgrFrame {
        width: image.width(),
        height: image.height(),
        data,
    }
}
