use crate::{
    made_progress, NllsProblem, NllsSolverBackend, SolveError, SolveOptions, SolveReport,
    Termination,
};
use fisheye_core::Real;
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt, TerminationReason};
use log::warn;
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn};
use std::time::Instant;

struct LmWrapper<'a, P: NllsProblem + ?Sized> {
    problem: &'a P,
    params: DVector<Real>,
}

impl<'a, P: NllsProblem + ?Sized> LeastSquaresProblem<Real, Dyn, Dyn> for LmWrapper<'a, P> {
    type ResidualStorage = Owned<Real, Dyn>;
    type JacobianStorage = Owned<Real, Dyn, Dyn>;
    type ParameterStorage = Owned<Real, Dyn>;

    fn set_params(&mut self, x: &DVector<Real>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<Real> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<Real>> {
        Some(self.problem.residuals(&self.params))
    }

    fn jacobian(&self) -> Option<DMatrix<Real>> {
        Some(self.problem.jacobian(&self.params))
    }
}

/// Backend running problems through the MINPACK port in `levenberg-marquardt`.
///
/// The crate offers no cancellation; the time budget is checked once the
/// solve returns.
#[derive(Debug, Default, Clone)]
pub struct MinpackBackend;

impl NllsSolverBackend for MinpackBackend {
    fn solve<P: NllsProblem + ?Sized>(
        &self,
        problem: &P,
        x0: DVector<Real>,
        opts: &SolveOptions,
    ) -> Result<(DVector<Real>, SolveReport), SolveError> {
        let n = problem.num_params();
        if x0.len() != n {
            return Err(SolveError::DimensionMismatch {
                expected: n,
                got: x0.len(),
            });
        }
        let r0 = problem.residuals(&x0);
        if r0.iter().any(|v| !v.is_finite()) {
            return Err(SolveError::NonFinite { iteration: 0 });
        }
        let initial_cost = 0.5 * r0.norm_squared();

        let lm = LevenbergMarquardt::new()
            .with_ftol(opts.ftol)
            .with_xtol(opts.xtol)
            .with_gtol(opts.gtol)
            .with_patience(opts.max_iters.max(1));

        let started = Instant::now();
        let wrapper = LmWrapper {
            problem,
            params: x0,
        };
        let (wrapper, report) = lm.minimize(wrapper);
        let x_opt = wrapper.params();
        let iterations = report.number_of_evaluations;

        if let Some(budget_ms) = opts.time_budget_ms {
            if started.elapsed().as_millis() > u128::from(budget_ms) {
                return Err(SolveError::TimeBudgetExceeded {
                    budget_ms,
                    iterations,
                });
            }
        }

        let final_cost = 0.5 * problem.residuals(&x_opt).norm_squared();
        if !final_cost.is_finite() {
            return Err(SolveError::NonFinite { iteration: iterations });
        }
        let solve_report = |converged, termination| SolveReport {
            iterations,
            initial_cost,
            final_cost,
            converged,
            termination,
        };

        let termination = match report.termination {
            TerminationReason::ResidualsZero => Termination::CostZero,
            TerminationReason::Orthogonal => Termination::Gradient,
            TerminationReason::Converged { ftol: true, .. } => Termination::CostTolerance,
            TerminationReason::Converged { .. } => Termination::StepTolerance,
            TerminationReason::NoParameters => Termination::NoParameters,
            TerminationReason::LostPatience => {
                if !made_progress(initial_cost, final_cost) {
                    return Err(SolveError::NoProgress {
                        iterations,
                        initial_cost,
                        final_cost,
                    });
                }
                warn!("minpack: evaluation cap hit, cost {initial_cost:.6e} -> {final_cost:.6e}");
                return Ok((x_opt, solve_report(false, Termination::MaxIterations)));
            }
            TerminationReason::Numerical(what) => {
                return Err(SolveError::Backend(format!("numerical failure in {what}")));
            }
            other => return Err(SolveError::Backend(format!("{other:?}"))),
        };

        Ok((x_opt, solve_report(true, termination)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneDimProblem;

    impl NllsProblem for OneDimProblem {
        fn num_params(&self) -> usize {
            1
        }

        fn num_residuals(&self) -> usize {
            1
        }

        fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
            DVector::from_element(1, x[0] - 3.0)
        }

        fn jacobian(&self, _x: &DVector<Real>) -> DMatrix<Real> {
            DMatrix::from_element(1, 1, 1.0)
        }
    }

    #[test]
    fn minpack_backend_solves_trivial_problem() {
        let (x_opt, report) = MinpackBackend
            .solve(&OneDimProblem, DVector::from_element(1, 10.0), &SolveOptions::default())
            .unwrap();

        assert!(
            (x_opt[0] - 3.0).abs() < 1e-6,
            "expected optimizer to reach 3.0, got {}",
            x_opt[0]
        );
        assert!(report.final_cost < 1e-12, "final cost too high: {}", report.final_cost);
        assert!(report.converged, "backend did not report convergence: {report:?}");
        assert!(report.iterations > 0);
    }
}
