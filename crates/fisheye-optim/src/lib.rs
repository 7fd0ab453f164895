//! Non-linear optimization for fisheye calibration.
//!
//! - [`NllsProblem`] describes a dense least-squares problem.
//! - [`LmSolver`] is the in-house damped Gauss–Newton (Levenberg–Marquardt)
//!   loop with deadline support; [`MinpackBackend`] runs the same problems
//!   through the `levenberg-marquardt` crate.
//! - [`problems::fisheye_intrinsics`] packs shared K, D and per-view poses
//!   into one flat vector and minimises reprojection error.

mod backend;
mod error;
mod factors;
mod jacobian_ad;
mod lm;
mod minpack;
pub mod problems;
mod traits;

pub use backend::*;
pub use error::*;
pub use lm::*;
pub use minpack::*;
pub use problems::fisheye_intrinsics::*;
pub use traits::*;
