use fisheye_core::CalibError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetectError {
    /// No complete, unambiguous corner grid in the image.
    #[error("{0}")]
    NotFound(String),
    #[error("invalid detector input: {0}")]
    InvalidInput(String),
}

impl From<DetectError> for CalibError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::NotFound(reason) => CalibError::CornerNotFound(reason),
            DetectError::InvalidInput(reason) => CalibError::InvalidInput(reason),
        }
    }
}

impl From<CalibError> for DetectError {
    fn from(err: CalibError) -> Self {
        DetectError::InvalidInput(err.to_string())
    }
}
