use crate::{
    LmSolver, MinpackBackend, NllsProblem, NllsSolverBackend, SolveError, SolveOptions,
    SolveReport,
};
use fisheye_core::Real;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Solver selection, as it appears in configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverBackend {
    /// In-house damped Gauss–Newton loop ([`LmSolver`]).
    #[default]
    Lm,
    /// MINPACK port from the `levenberg-marquardt` crate ([`MinpackBackend`]).
    Minpack,
}

impl NllsSolverBackend for SolverBackend {
    fn solve<P: NllsProblem + ?Sized>(
        &self,
        problem: &P,
        x0: DVector<Real>,
        opts: &SolveOptions,
    ) -> Result<(DVector<Real>, SolveReport), SolveError> {
        match self {
            SolverBackend::Lm => LmSolver::default().solve(problem, x0, opts),
            SolverBackend::Minpack => MinpackBackend.solve(problem, x0, opts),
        }
    }
}
