use thiserror::Error;

/// Errors surfaced by calibration and undistortion.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibError {
    /// An image did not yield a complete checkerboard grid.
    #[error("checkerboard corners not found: {0}")]
    CornerNotFound(String),
    /// Too few usable views to constrain the calibration.
    #[error("insufficient observations: {found} usable views, at least {required} required")]
    InsufficientObservations { found: usize, required: usize },
    /// The non-linear solve did not reach tolerance or hit a singular system.
    #[error("calibration failed to converge: {0}")]
    FailedToConverge(String),
    /// Malformed pattern spec, camera parameters or raster.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Image container decoding or encoding failed.
    #[error("image codec error: {0}")]
    Codec(String),
}

impl CalibError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
