//! Core math and geometry primitives for the fisheye calibration workspace.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `Pt3`, ...),
//! - the shared error type [`CalibError`],
//! - an owned 8-bit [`Raster`] used by every image-consuming stage,
//! - the Kannala–Brandt fisheye camera model ([`FisheyeCamera`]),
//! - checkerboard geometry ([`CheckerboardSpec`], [`PatternModel`], [`CornerSet`]),
//! - deterministic synthetic data generators for tests and demos.
//!
//! Camera pipeline:
//! `pixel = K ∘ kannala_brandt(θ) ∘ direction(p_c)`

/// Error type shared by all crates of the workspace.
pub mod error;
/// Linear algebra type aliases and helpers.
pub mod math;
/// Camera models: intrinsics, fisheye distortion and the composed camera.
pub mod models;
/// Serializable `{K, D}` calibration parameters.
pub mod params;
/// Checkerboard pattern geometry and corner observations.
pub mod pattern;
/// Owned 8-bit raster images.
pub mod raster;
/// Deterministic synthetic data for tests and demos.
pub mod synthetic;

pub use error::*;
pub use math::*;
pub use models::*;
pub use params::*;
pub use pattern::*;
pub use raster::*;
