//! Fisheye undistortion.
//!
//! [`UndistortionMap`] stores, for every output pixel, the source pixel that
//! the fisheye camera sees along the same ray as a pinhole camera with the
//! new intrinsics. [`resample`] applies a map to any raster of the source
//! size, so one map serves a whole sequence of frames.

mod map;
mod resample;
mod scale;

pub use map::*;
pub use resample::*;
pub use scale::*;

use fisheye_core::{CalibError, FisheyeCamera, ImageSize, Intrinsics, Raster};

/// Map plus the source size it was built for.
#[derive(Debug, Clone)]
pub struct Undistorter {
    camera: FisheyeCamera,
    new_k: Intrinsics,
    src_size: ImageSize,
    map: UndistortionMap,
}

impl Undistorter {
    /// Undistorter for `src_size` images at the given output `scale`.
    pub fn new(camera: FisheyeCamera, src_size: ImageSize, scale: f64) -> Result<Self, CalibError> {
        let (new_k, out_size) = new_camera_for_scale(&camera, src_size, scale)?;
        let map = UndistortionMap::build(&camera, &new_k, out_size)?;
        Ok(Self {
            camera,
            new_k,
            src_size,
            map,
        })
    }

    pub fn camera(&self) -> &FisheyeCamera {
        &self.camera
    }

    /// Pinhole intrinsics of the undistorted output.
    pub fn new_intrinsics(&self) -> &Intrinsics {
        &self.new_k
    }

    pub fn output_size(&self) -> ImageSize {
        self.map.size()
    }

    pub fn map(&self) -> &UndistortionMap {
        &self.map
    }

    pub fn apply(&self, raster: &Raster, border: &Border) -> Result<Raster, CalibError> {
        if raster.size() != self.src_size {
            return Err(CalibError::invalid(format!(
                "raster is {}x{}, undistorter expects {}x{}",
                raster.width(),
                raster.height(),
                self.src_size.width,
                self.src_size.height
            )));
        }
        resample(raster, &self.map, border)
    }
}
