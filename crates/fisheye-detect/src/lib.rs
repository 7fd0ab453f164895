//! Checkerboard inner-corner detection.
//!
//! The detector works in four stages:
//!
//! 1. [`response`]: dense ChESS saddle response on a box-smoothed luma image.
//! 2. [`candidates`]: thresholding, non-maximum suppression and centre-of-mass
//!    refinement of the response peaks.
//! 3. [`grid`]: breadth-first lattice growth from a central seed, search for the
//!    unique complete `W × H` window and canonical ordering.
//! 4. [`subpix`]: gradient-orthogonality refinement on the unsmoothed image.
//!
//! Missing or ambiguous grids are hard failures ([`DetectError::NotFound`]);
//! sub-pixel non-convergence is only counted in [`CornerDetection::unconverged`].

pub mod candidates;
mod config;
mod detector;
mod error;
pub mod grid;
mod image;
pub mod response;
pub mod subpix;

pub use candidates::{find_candidates, Candidate};
pub use config::*;
pub use detector::*;
pub use error::*;
pub use grid::{assemble_grid, OrderedGrid};
pub use image::ImageF32;
pub use response::{chess_response, ResponseMap};
pub use subpix::{half_window, refine_corner, Refined};
