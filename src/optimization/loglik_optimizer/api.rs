//! High-level entry point for maximizing a [`LogLikelihood`].
use argmin::core::{CostFunction, Gradient, TerminationReason, TerminationStatus};

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        FnEvalMap, OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, LogLikelihood, MLEOptions},
    },
};

/// Maximize `ℓ(θ)` with L-BFGS from the starting point `theta0`.
///
/// Calls `f.check(theta0, data)` first, wraps `(f, data)` in an
/// [`ArgMinAdapter`] exposing `c(θ) = -ℓ(θ)`, builds the solver selected by
/// `opts.line_searcher` and runs it under the iteration cap and time budget
/// of `opts`.
///
/// A start whose gradient norm is already within `tol_grad` is returned as
/// converged without running the solver; a line search along a zero
/// direction would otherwise fail on flat objectives.
///
/// # Errors
/// - Errors from `f.check`.
/// - Builder errors (rejected tolerances).
/// - Runtime errors from the solver, including errors raised by `f.value`.
///
/// # Example
/// ```no_run
/// use ndarray::array;
/// use occupancy_forecast::optimization::errors::OptResult;
/// use occupancy_forecast::optimization::loglik_optimizer::{
///     maximize, LogLikelihood, MLEOptions, Theta,
/// };
///
/// struct Quadratic;
/// impl LogLikelihood for Quadratic {
///     type Data = f64;
///     fn value(&self, theta: &Theta, target: &f64) -> OptResult<f64> {
///         Ok(-(theta[0] - target).powi(2))
///     }
///     fn check(&self, _: &Theta, _: &f64) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let out = maximize(&Quadratic, array![0.0], &3.0, &MLEOptions::default())?;
/// assert!((out.theta_hat[0] - 3.0).abs() < 1e-4);
/// # Ok::<(), occupancy_forecast::optimization::errors::OptError>(())
/// ```
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    if let Some(tol_grad) = opts.tols.tol_grad {
        let grad = problem.gradient(&theta0)?;
        if grad.iter().all(|g| g.is_finite()) && grad.dot(&grad).sqrt() <= tol_grad {
            let value = -problem.cost(&theta0)?;
            return OptimOutcome::new(
                Some(theta0),
                value,
                TerminationStatus::Terminated(TerminationReason::SolverConverged),
                0,
                FnEvalMap::new(),
                Some(grad),
            );
        }
    }
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptError;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    struct ShiftedBowl;

    impl LogLikelihood for ShiftedBowl {
        type Data = (f64, f64);

        fn value(&self, theta: &Theta, data: &(f64, f64)) -> OptResult<f64> {
            Ok(-(theta[0] - data.0).powi(2) - 2.0 * (theta[1] - data.1).powi(2))
        }

        fn check(&self, theta: &Theta, _: &(f64, f64)) -> OptResult<()> {
            if theta.len() != 2 {
                return Err(OptError::ThetaLengthMismatch { expected: 2, actual: theta.len() });
            }
            Ok(())
        }
    }

    #[test]
    // Purpose
    // -------
    // End-to-end maximization of a concave quadratic with finite-difference
    // gradients under both line searches.
    //
    // Given
    // -----
    // - ℓ(θ) = -(θ₀ - 1.5)² - 2(θ₁ + 0.5)², start at the origin.
    //
    // Expect
    // ------
    // - θ̂ ≈ (1.5, -0.5), ℓ(θ̂) ≈ 0 and a converged outcome.
    fn maximize_recovers_quadratic_optimum() {
        for line_searcher in [LineSearcher::MoreThuente, LineSearcher::HagerZhang] {
            // Arrange
            let opts = MLEOptions { line_searcher, ..MLEOptions::default() };

            // Act
            let out = maximize(&ShiftedBowl, array![0.0, 0.0], &(1.5, -0.5), &opts)
                .expect("maximization should succeed");

            // Assert
            assert!(out.converged, "status: {}", out.status);
            assert_abs_diff_eq!(out.theta_hat[0], 1.5, epsilon = 1e-4);
            assert_abs_diff_eq!(out.theta_hat[1], -0.5, epsilon = 1e-4);
            assert_abs_diff_eq!(out.value, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn maximize_returns_stationary_start_without_iterating() {
        let out = maximize(&ShiftedBowl, array![1.5, -0.5], &(1.5, -0.5), &MLEOptions::default())
            .expect("maximization should succeed");
        assert!(out.converged);
        assert_eq!(out.iterations, 0);
        assert_abs_diff_eq!(out.value, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn maximize_rejects_wrong_dimension_before_running() {
        let err = maximize(&ShiftedBowl, array![0.0], &(0.0, 0.0), &MLEOptions::default())
            .expect_err("check should reject theta");
        assert_eq!(err, OptError::ThetaLengthMismatch { expected: 2, actual: 1 });
    }
}
