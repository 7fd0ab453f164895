//! Deterministic synthetic data: board poses, projected corners, pixel
//! noise and rendered checkerboard images.

pub mod noise;
pub mod planar;
pub mod render;

pub use noise::*;
pub use planar::*;
pub use render::*;
