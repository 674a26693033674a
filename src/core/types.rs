//! Pixel buffers exchanged between callers and engine handles.
//!
//! A [`PixelBuffer`] is always RGBA8, row-major, with no padding. It is the
//! only unit of pixel data that crosses the executor boundary; engine memory
//! is never aliased by a caller buffer.

use crate::core::error::{FilterGraphError, FilterGraphResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::RgbaImage;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

/// Width of the histogram image produced for every graph run.
pub const HISTOGRAM_WIDTH: u32 = 256;

/// Height of the histogram image produced for every graph run.
pub const HISTOGRAM_HEIGHT: u32 = 100;

/// Bytes per RGBA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Caller-owned RGBA byte buffer with explicit dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBuffer {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// RGBA bytes; base64 encoded on the wire
    #[serde(serialize_with = "encode_bytes", deserialize_with = "decode_bytes")]
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a zero-filled (transparent black) buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; Self::byte_len(width, height)],
        }
    }

    /// Create a buffer with every pixel set to `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(Self::byte_len(width, height))
            .collect();
        Self { width, height, data }
    }

    /// Wrap existing RGBA bytes. The buffer is not checked; see [`Self::validate`].
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self { width, height, data }
    }

    /// Create an empty buffer shaped for the histogram output.
    pub fn histogram() -> Self {
        Self::new(HISTOGRAM_WIDTH, HISTOGRAM_HEIGHT)
    }

    /// Decode an image file of any supported format into RGBA.
    pub fn open(path: &Path) -> FilterGraphResult<Self> {
        Ok(image::open(path)?.to_rgba8().into())
    }

    /// Encode the buffer to `path`; the format follows the extension.
    pub fn save(&self, path: &Path) -> FilterGraphResult<()> {
        let image = RgbaImage::try_from(self.clone()).map_err(FilterGraphError::MalformedRequest)?;
        image.save(path)?;
        Ok(())
    }

    /// Number of bytes an RGBA buffer of the given size occupies.
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }

    /// Check that the buffer is well formed: non-empty and correctly sized.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "buffer dimensions must be non-zero, got {}x{}",
                self.width, self.height
            ));
        }
        let expected = Self::byte_len(self.width, self.height);
        if self.data.len() != expected {
            return Err(format!(
                "buffer of {}x{} needs {} bytes, got {}",
                self.width,
                self.height,
                expected,
                self.data.len()
            ));
        }
        Ok(())
    }

    /// Whether the buffer matches the given dimensions.
    pub fn has_dimensions(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    /// Read the pixel at (x, y).
    ///
    /// Panics if the coordinates are outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = self.offset(x, y);
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ]
    }

    /// Overwrite the pixel at (x, y).
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let offset = self.offset(x, y);
        self.data[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&rgba);
    }

    /// Iterate over all pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.data
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|px| [px[0], px[1], px[2], px[3]])
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::from_rgba(width, height, image.into_raw())
    }
}

impl TryFrom<PixelBuffer> for RgbaImage {
    type Error = String;

    fn try_from(buffer: PixelBuffer) -> Result<Self, Self::Error> {
        buffer.validate()?;
        RgbaImage::from_raw(buffer.width, buffer.height, buffer.data)
            .ok_or_else(|| "buffer does not hold a full RGBA image".to_string())
    }
}

fn encode_bytes<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(data))
}

fn decode_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    BASE64.decode(encoded).map_err(serde::de::Error::custom)
}
