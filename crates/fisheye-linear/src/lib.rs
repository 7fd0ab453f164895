//! Linear initialisation for fisheye calibration.
//!
//! Everything here is closed-form: a normalised DLT homography, the planar
//! pose decomposition of a homography, and the intrinsics/pose seed that
//! starts the non-linear refinement in `fisheye-optim`.

mod homography;
mod init;
pub mod math;
mod planar_pose;

pub use homography::*;
pub use init::*;
pub use planar_pose::*;
