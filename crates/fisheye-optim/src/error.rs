use fisheye_core::{CalibError, Real};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveError {
    #[error("parameter vector has length {got}, problem expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("invalid problem: {0}")]
    InvalidProblem(String),
    #[error("non-finite residuals or jacobian at iteration {iteration}")]
    NonFinite { iteration: usize },
    #[error("damped normal equations are singular at iteration {iteration} (damping {damping:e})")]
    SingularSystem { iteration: usize, damping: Real },
    #[error("time budget of {budget_ms} ms exceeded after {iterations} iterations")]
    TimeBudgetExceeded { budget_ms: u64, iterations: usize },
    #[error(
        "no meaningful decrease in {iterations} iterations ({initial_cost:e} -> {final_cost:e})"
    )]
    NoProgress {
        iterations: usize,
        initial_cost: Real,
        final_cost: Real,
    },
    #[error("solver backend failed: {0}")]
    Backend(String),
}

impl From<SolveError> for CalibError {
    fn from(err: SolveError) -> Self {
        match err {
            SolveError::DimensionMismatch { .. } | SolveError::InvalidProblem(_) => {
                CalibError::InvalidInput(err.to_string())
            }
            _ => CalibError::FailedToConverge(err.to_string()),
        }
    }
}
