use crate::codec::{self, OutputFormat};
use fisheye_core::{CalibError, FisheyeCamera, Raster, Real};
use fisheye_undistort::{Border, Undistorter};
use serde::{Deserialize, Serialize};

/// How the undistorted image is sized and encoded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndistortOptions {
    /// Output canvas relative to the input; larger keeps more field of view.
    pub scale: Real,
    pub format: OutputFormat,
    /// Format-specific quality, see [`codec::encode`].
    pub quality: Option<u8>,
    pub border: Border,
}

impl Default for UndistortOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            format: OutputFormat::Jpeg,
            quality: None,
            border: Border::default(),
        }
    }
}

/// Remove fisheye distortion from `image` and return the raster.
///
/// `k` must be `[[fx, 0, cx], [0, fy, cy], [0, 0, 1]]` with positive finite
/// focal lengths and `d` exactly four finite coefficients.
pub fn undistort_raster(
    image: &Raster,
    k: &[[f64; 3]; 3],
    d: &[f64],
    opts: &UndistortOptions,
) -> Result<Raster, CalibError> {
    let camera = FisheyeCamera::try_from_parts(k, d)?;
    Undistorter::new(camera, image.size(), opts.scale)?.apply(image, &opts.border)
}

/// Remove fisheye distortion from `image` and encode the result.
pub fn undistort(
    image: &Raster,
    k: &[[f64; 3]; 3],
    d: &[f64],
    opts: &UndistortOptions,
) -> Result<Vec<u8>, CalibError> {
    let out = undistort_raster(image, k, d, opts)?;
    codec::encode(&out, opts.format, opts.quality)
}

/// Like [`undistort`], starting from container bytes.
pub fn undistort_encoded(
    bytes: &[u8],
    k: &[[f64; 3]; 3],
    d: &[f64],
    opts: &UndistortOptions,
) -> Result<Vec<u8>, CalibError> {
    undistort(&codec::decode(bytes)?, k, d, opts)
}
