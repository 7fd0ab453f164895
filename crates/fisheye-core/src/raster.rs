use crate::CalibError;
use serde::{Deserialize, Serialize};

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: usize,
    pub height: usize,
}

impl ImageSize {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

/// Owned 8-bit raster, row-major with interleaved channels.
///
/// Supports 1 (gray), 2 (gray + alpha), 3 (RGB) and 4 (RGBA) channels.
/// The buffer length always equals `width * height * channels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<u8>,
}

impl Raster {
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self, CalibError> {
        if width == 0 || height == 0 {
            return Err(CalibError::invalid(format!(
                "raster must be non-empty, got {width}x{height}"
            )));
        }
        if !(1..=4).contains(&channels) {
            return Err(CalibError::invalid(format!(
                "raster must have 1..=4 channels, got {channels}"
            )));
        }
        let expected = width * height * channels;
        if data.len() != expected {
            return Err(CalibError::invalid(format!(
                "raster buffer has {} bytes, expected {expected} ({width}x{height}x{channels})",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Single-channel raster from a gray buffer.
    pub fn from_gray(width: usize, height: usize, data: Vec<u8>) -> Result<Self, CalibError> {
        Self::new(width, height, 1, data)
    }

    /// Raster with every sample set to `value`.
    pub fn filled(
        width: usize,
        height: usize,
        channels: usize,
        value: u8,
    ) -> Result<Self, CalibError> {
        Self::new(width, height, channels, vec![value; width * height * channels])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width * self.channels
    }

    /// Channel samples of the pixel at `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let start = (y * self.width + x) * self.channels;
        &self.data[start..start + self.channels]
    }

    /// Luma of every pixel as `f32` in `[0, 255]`.
    ///
    /// Color inputs use BT.601 weights; alpha is ignored.
    pub fn luma_f32(&self) -> Vec<f32> {
        match self.channels {
            1 | 2 => self
                .data
                .chunks_exact(self.channels)
                .map(|px| px[0] as f32)
                .collect(),
            _ => self
                .data
                .chunks_exact(self.channels)
                .map(|px| 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32)
                .collect(),
        }
    }

    /// Single-channel copy of this raster.
    pub fn to_gray(&self) -> Raster {
        if self.channels == 1 {
            return self.clone();
        }
        let data = self
            .luma_f32()
            .into_iter()
            .map(|v| v.round().clamp(0.0, 255.0) as u8)
            .collect();
        Raster {
            width: self.width,
            height: self.height,
            channels: 1,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        let err = Raster::new(4, 4, 3, vec![0; 10]).unwrap_err();
        assert!(matches!(err, CalibError::InvalidInput(_)));
    }

    #[test]
    fn rejects_empty_raster() {
        assert!(Raster::new(0, 4, 1, Vec::new()).is_err());
        assert!(Raster::new(4, 4, 5, vec![0; 80]).is_err());
    }

    #[test]
    fn gray_conversion_uses_bt601_weights() {
        let rgb = Raster::new(2, 1, 3, vec![255, 0, 0, 0, 0, 255]).unwrap();
        let gray = rgb.to_gray();
        assert_eq!(gray.channels(), 1);
        assert_eq!(gray.data(), &[76, 29]);
    }

    #[test]
    fn pixel_accessor_returns_channels() {
        let r = Raster::new(2, 2, 2, (0..8).collect()).unwrap();
        assert_eq!(r.pixel(1, 1), &[6, 7]);
        assert_eq!(r.stride(), 4);
    }
}
