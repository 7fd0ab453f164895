use crate::SolveError;
use fisheye_core::Real;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Dense non-linear least squares problem `min ½‖r(x)‖²`.
pub trait NllsProblem {
    /// Number of parameters in the optimization vector.
    fn num_params(&self) -> usize;
    /// Number of residual rows in the problem.
    fn num_residuals(&self) -> usize;
    /// Residuals for the current parameters.
    fn residuals(&self, x: &DVector<Real>) -> DVector<Real>;
    /// Jacobian `∂r/∂x` for the current parameters.
    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Maximum number of accepted-or-rejected Jacobian evaluations.
    ///
    /// The MINPACK backend follows its own convention `max_iters * (n + 1)`
    /// function evaluations.
    pub max_iters: usize,
    /// Relative tolerance on the cost reduction.
    pub ftol: Real,
    /// Tolerance on the largest gradient component.
    pub gtol: Real,
    /// Relative tolerance on parameter updates.
    pub xtol: Real,
    /// Initial Marquardt damping, relative to the diagonal of `JᵀJ`.
    pub initial_damping: Real,
    /// Wall-clock budget for one solve, in milliseconds.
    pub time_budget_ms: Option<u64>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iters: 100,
            ftol: 1e-8,
            gtol: 1e-10,
            xtol: 1e-10,
            initial_damping: 1e-3,
            time_budget_ms: None,
        }
    }
}

/// Why a solve stopped successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Relative cost decrease fell below `ftol`.
    CostTolerance,
    /// Gradient fell below `gtol`.
    Gradient,
    /// Step fell below `xtol` relative to the parameters.
    StepTolerance,
    /// Cost is numerically zero.
    CostZero,
    /// No damped step decreases the cost any more.
    Stationary,
    /// Iteration cap reached after a meaningful decrease.
    MaxIterations,
    /// Nothing to optimize.
    NoParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveReport {
    pub iterations: usize,
    pub initial_cost: Real,
    pub final_cost: Real,
    pub converged: bool,
    pub termination: Termination,
}

pub trait NllsSolverBackend {
    fn solve<P: NllsProblem + ?Sized>(
        &self,
        problem: &P,
        x0: DVector<Real>,
        opts: &SolveOptions,
    ) -> Result<(DVector<Real>, SolveReport), SolveError>;
}

/// Fraction of the initial cost that counts as real progress when the
/// iteration cap is hit.
pub(crate) const MEANINGFUL_DECREASE: Real = 1e-3;

pub(crate) fn made_progress(initial_cost: Real, final_cost: Real) -> bool {
    final_cost <= initial_cost * (1.0 - MEANINGFUL_DECREASE)
}
