//! Container decoding and encoding on top of the `image` crate.

use fisheye_core::{CalibError, Raster};
use image::{
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType, PngEncoder},
        webp::WebPEncoder,
    },
    DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_JPEG_QUALITY: u8 = 95;
pub const DEFAULT_PNG_COMPRESSION: u8 = 3;

/// Encoded output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossy; quality 1–100.
    #[default]
    Jpeg,
    /// Lossless; quality is a compression level 0–9.
    Png,
    /// Lossless; quality is ignored.
    Webp,
}

impl OutputFormat {
    /// Format for an extension such as `".jpg"`, `"jpeg"` or `"PNG"`.
    pub fn from_extension(ext: &str) -> Result<Self, CalibError> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            other => Err(CalibError::invalid(format!(
                "unsupported image extension '{other}'"
            ))),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, CalibError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| CalibError::invalid(format!("{} has no extension", path.display())))?;
        Self::from_extension(ext)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

fn codec_err(err: impl std::fmt::Display) -> CalibError {
    CalibError::Codec(err.to_string())
}

/// Decode container bytes, keeping gray, gray+alpha, RGB or RGBA layout.
pub fn decode(bytes: &[u8]) -> Result<Raster, CalibError> {
    let img = image::load_from_memory(bytes).map_err(codec_err)?;
    let (w, h) = (img.width() as usize, img.height() as usize);
    let color = img.color();
    match (color.channel_count(), color.has_alpha()) {
        (1, _) => Raster::new(w, h, 1, img.to_luma8().into_raw()),
        (2, _) => Raster::new(w, h, 2, img.to_luma_alpha8().into_raw()),
        (_, true) => Raster::new(w, h, 4, img.to_rgba8().into_raw()),
        _ => Raster::new(w, h, 3, img.to_rgb8().into_raw()),
    }
}

/// Decode container bytes to single-channel luma.
pub fn decode_gray(bytes: &[u8]) -> Result<Raster, CalibError> {
    let img = image::load_from_memory(bytes).map_err(codec_err)?;
    Raster::from_gray(img.width() as usize, img.height() as usize, img.to_luma8().into_raw())
}

fn to_dynamic(raster: &Raster) -> Result<DynamicImage, CalibError> {
    let (w, h) = (raster.width() as u32, raster.height() as u32);
    let data = raster.data().to_vec();
    let img = match raster.channels() {
        1 => GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
        2 => GrayAlphaImage::from_raw(w, h, data).map(DynamicImage::ImageLumaA8),
        3 => RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
        _ => RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
    };
    img.ok_or_else(|| codec_err("raster buffer does not match its dimensions"))
}

fn png_compression(level: u8) -> CompressionType {
    match level {
        0..=2 => CompressionType::Fast,
        3..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Encode `raster` as `format`.
///
/// `quality` is the JPEG quality (default 95, clamped to 1–100) or the PNG
/// compression level (default 3, at most 9). WebP output is lossless. JPEG
/// drops any alpha channel.
pub fn encode(
    raster: &Raster,
    format: OutputFormat,
    quality: Option<u8>,
) -> Result<Vec<u8>, CalibError> {
    let img = to_dynamic(raster)?;
    let mut buf = Vec::new();
    match format {
        OutputFormat::Jpeg => {
            let q = quality.unwrap_or(DEFAULT_JPEG_QUALITY).clamp(1, 100);
            let img = match raster.channels() {
                2 => DynamicImage::ImageLuma8(img.to_luma8()),
                4 => DynamicImage::ImageRgb8(img.to_rgb8()),
                _ => img,
            };
            img.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, q))
                .map_err(codec_err)?;
        }
        OutputFormat::Png => {
            let level = quality.unwrap_or(DEFAULT_PNG_COMPRESSION);
            if level > 9 {
                return Err(CalibError::invalid(format!(
                    "png compression level must be 0-9, got {level}"
                )));
            }
            let compression = png_compression(level);
            let encoder = PngEncoder::new_with_quality(&mut buf, compression, FilterType::Adaptive);
            img.write_with_encoder(encoder).map_err(codec_err)?;
        }
        OutputFormat::Webp => {
            img.write_with_encoder(WebPEncoder::new_lossless(&mut buf))
                .map_err(codec_err)?;
        }
    }
    Ok(buf)
}
