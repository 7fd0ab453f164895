//! High-level entry crate for fisheye calibration and undistortion.
//!
//! ## One-call API
//!
//! ```no_run
//! use fisheye::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let images: Vec<Raster> = /* gray frames showing a 9x6 inner-corner board */
//! # vec![];
//! let params = calibrate(&images, 9, 6)?;
//! println!("K = {:?}, D = {:?}", params.k, params.d);
//!
//! let frame: Raster = /* any frame from the same camera */
//! # Raster::filled(640, 480, 3, 0)?;
//! let jpeg = undistort(&frame, &params.k, &params.d, &UndistortOptions::default())?;
//! std::fs::write("flat.jpg", jpeg)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Building blocks
//!
//! For video or batch work, build an [`undistort::Undistorter`] once and
//! apply it to every frame. Corner detection, pose seeding and the
//! least-squares refinement are available separately:
//!
//! ```no_run
//! use fisheye::detect::{detect_corners, DetectorConfig};
//! use fisheye::core::CheckerboardSpec;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let raster = fisheye::core::Raster::filled(640, 480, 1, 0)?;
//! let found = detect_corners(&raster, &CheckerboardSpec::new(9, 6), &DetectorConfig::default())?;
//! println!("{} corners, spacing {:.1}px", found.corners.len(), found.spacing);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - **[`pipeline`]**: `calibrate` / `undistort` entry points, configs, reports, codecs
//! - **[`core`]**: math types, Kannala–Brandt camera, checkerboard geometry, rasters
//! - **[`detect`]**: ChESS-based checkerboard corner detector
//! - **[`linear`]**: homography and pose seeding
//! - **[`optim`]**: least-squares backends and the fisheye intrinsics problem
//! - **[`undistort`]**: undistortion maps and resampling
//! - **[`prelude`]**: common re-exports

/// `calibrate` / `undistort` entry points with their configs and reports.
pub mod pipeline {
    pub use fisheye_pipeline::*;
}

/// Math types, camera model, pattern geometry, rasters and synthetic data.
pub mod core {
    pub use fisheye_core::*;
}

/// Checkerboard corner detection.
pub mod detect {
    pub use fisheye_detect::*;
}

/// Closed-form seeding.
pub mod linear {
    pub use fisheye_linear::*;
}

/// Non-linear least-squares backends and problems.
pub mod optim {
    pub use fisheye_optim::*;
}

/// Undistortion maps and resampling.
pub mod undistort {
    pub use fisheye_undistort::*;
}

/// Convenient re-exports for common use cases.
///
/// Import with `use fisheye::prelude::*;`.
pub mod prelude {
    pub use crate::core::{
        CalibError, CalibrationParams, CheckerboardSpec, CornerSet, FisheyeCamera, ImageSize,
        Intrinsics, Iso3, KannalaBrandt4, Pt2, Pt3, Raster, Real,
    };

    pub use crate::pipeline::{
        calibrate, calibrate_corner_sets, calibrate_encoded, calibrate_with_config, undistort,
        undistort_encoded, undistort_raster, CalibrationConfig, CalibrationReport, OutputFormat,
        UndistortOptions,
    };

    pub use crate::detect::DetectorConfig;
    pub use crate::optim::{FixMask, SolveOptions, SolverBackend};
    pub use crate::undistort::{Border, Undistorter};
}
