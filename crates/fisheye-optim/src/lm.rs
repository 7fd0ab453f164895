//! Damped Gauss–Newton (Levenberg–Marquardt) solver.
//!
//! Each iteration evaluates the Jacobian at the current parameter snapshot,
//! solves `(JᵀJ + λ diag(JᵀJ)) δ = -Jᵀr` by Cholesky and proposes `x + δ`.
//! The proposal replaces the snapshot only if it lowers the cost; otherwise
//! λ grows and the damped system is solved again.

use crate::{
    made_progress, NllsProblem, NllsSolverBackend, SolveError, SolveOptions, SolveReport,
    Termination,
};
use fisheye_core::Real;
use log::{debug, warn};
use nalgebra::DVector;
use std::time::{Duration, Instant};

/// Floor for diagonal entries of `JᵀJ` used as damping weights.
const MIN_DIAGONAL: Real = 1e-12;
const NEGLIGIBLE_COST: Real = 1e-28;

#[derive(Debug, Clone, Copy)]
pub struct LmSolver {
    damping_min: Real,
    damping_max: Real,
    damping_increase_factor: Real,
    damping_decrease_factor: Real,
}

impl Default for LmSolver {
    fn default() -> Self {
        Self {
            damping_min: 1e-12,
            damping_max: 1e12,
            damping_increase_factor: 10.0,
            damping_decrease_factor: 0.1,
        }
    }
}

impl LmSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the damping parameter bounds.
    pub fn with_damping_bounds(mut self, min: Real, max: Real) -> Self {
        self.damping_min = min;
        self.damping_max = max;
        self
    }

    /// Set the damping adjustment factors.
    pub fn with_damping_factors(mut self, increase: Real, decrease: Real) -> Self {
        self.damping_increase_factor = increase;
        self.damping_decrease_factor = decrease;
        self
    }
}

struct AcceptedStep {
    x: DVector<Real>,
    r: DVector<Real>,
    cost: Real,
    step_norm: Real,
    predicted: Real,
}

fn all_finite(v: &DVector<Real>) -> bool {
    v.iter().all(|x| x.is_finite())
}

fn check_deadline(
    deadline: Option<(Instant, u64)>,
    iterations: usize,
) -> Result<(), SolveError> {
    match deadline {
        Some((at, budget_ms)) if Instant::now() >= at => {
            Err(SolveError::TimeBudgetExceeded {
                budget_ms,
                iterations,
            })
        }
        _ => Ok(()),
    }
}

impl NllsSolverBackend for LmSolver {
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
        let deadline = opts
            .time_budget_ms
            .map(|ms| (Instant::now() + Duration::from_millis(ms), ms));

        let mut x = x0;
        let mut r = problem.residuals(&x);
        if !all_finite(&r) {
            return Err(SolveError::NonFinite { iteration: 0 });
        }
        let initial_cost = 0.5 * r.norm_squared();
        let mut cost = initial_cost;

        let report = |iterations, cost, converged, termination| SolveReport {
            iterations,
            initial_cost,
            final_cost: cost,
            converged,
            termination,
        };

        if n == 0 {
            return Ok((x, report(0, cost, true, Termination::NoParameters)));
        }

        let mut damping = opts.initial_damping.max(self.damping_min);
        let mut iterations = 0;
        let mut termination = None;
        debug!("lm: {n} params, {} residuals, initial cost {initial_cost:.6e}", r.len());

        while iterations < opts.max_iters {
            check_deadline(deadline, iterations)?;
            if cost <= NEGLIGIBLE_COST {
                termination = Some(Termination::CostZero);
                break;
            }

            let j = problem.jacobian(&x);
            if j.iter().any(|v| !v.is_finite()) {
                return Err(SolveError::NonFinite { iteration: iterations });
            }
            let jt = j.transpose();
            let jtj = &jt * &j;
            let g = &jt * &r;
            if g.amax() <= opts.gtol {
                termination = Some(Termination::Gradient);
                break;
            }
            iterations += 1;

            let diag = jtj.diagonal().map(|d| d.max(MIN_DIAGONAL));
            let accepted = loop {
                let mut a = jtj.clone();
                for i in 0..n {
                    a[(i, i)] += damping * diag[i];
                }
                let chol = a.cholesky().ok_or(SolveError::SingularSystem {
                    iteration: iterations,
                    damping,
                })?;
                let delta = chol.solve(&(-&g));
                let x_new = &x + &delta;
                let r_new = problem.residuals(&x_new);
                let cost_new = 0.5 * r_new.norm_squared();

                if all_finite(&r_new) && cost_new < cost {
                    let predicted =
                        0.5 * delta.dot(&(diag.component_mul(&delta) * damping - &g));
                    damping = (damping * self.damping_decrease_factor).max(self.damping_min);
                    break Some(AcceptedStep {
                        x: x_new,
                        r: r_new,
                        cost: cost_new,
                        step_norm: delta.norm(),
                        predicted,
                    });
                }

                damping *= self.damping_increase_factor;
                if damping > self.damping_max {
                    break None;
                }
                check_deadline(deadline, iterations)?;
            };

            let Some(step) = accepted else {
                termination = Some(Termination::Stationary);
                break;
            };

            let prev_cost = cost;
            x = step.x;
            r = step.r;
            cost = step.cost;
            debug!(
                "lm iter {iterations}: cost {cost:.6e}, step {:.3e}, damping {damping:.3e}",
                step.step_norm
            );

            let actual = prev_cost - cost;
            if actual <= opts.ftol * prev_cost && step.predicted <= opts.ftol * prev_cost {
                termination = Some(Termination::CostTolerance);
                break;
            }
            if step.step_norm <= opts.xtol * (x.norm() + opts.xtol) {
                termination = Some(Termination::StepTolerance);
                break;
            }
        }

        match termination {
            Some(t) => {
                debug!("lm: {t:?} after {iterations} iterations, cost {cost:.6e}");
                Ok((x, report(iterations, cost, true, t)))
            }
            None if made_progress(initial_cost, cost) => {
                warn!(
                    "lm: iteration cap {} reached, cost {initial_cost:.6e} -> {cost:.6e}",
                    opts.max_iters
                );
                Ok((x, report(iterations, cost, false, Termination::MaxIterations)))
            }
            None => Err(SolveError::NoProgress {
                iterations,
                initial_cost,
                final_cost: cost,
            }),
        }
    }
}
