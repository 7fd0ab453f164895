//! End-to-end fisheye calibration and undistortion.
//!
//! ```ignore
//! use fisheye_pipeline::{calibrate, undistort, UndistortOptions};
//!
//! let params = calibrate(&images, 9, 6)?;
//! let jpeg = undistort(&frame, &params.k, &params.d, &UndistortOptions::default())?;
//! ```
//!
//! [`calibrate_with_config`] returns a full [`CalibrationReport`];
//! [`calibrate_corner_sets`] starts from already detected corners.
//! The `*_encoded` variants accept JPEG/PNG/WebP container bytes.

mod calibrate;
pub mod codec;
mod config;
mod report;
mod undistort;

pub use calibrate::*;
pub use codec::OutputFormat;
pub use config::*;
pub use report::*;
pub use undistort::*;

pub use fisheye_core::{
    CalibError, CalibrationParams, CheckerboardSpec, CornerSet, ImageSize, Raster,
};
pub use fisheye_undistort::Border;
