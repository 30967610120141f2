//! loglik_optimizer::builders — L-BFGS solver construction.
//!
//! Purpose
//! -------
//! Build the two L-BFGS variants the occupancy fits use, applying the
//! tolerance and memory settings of [`MLEOptions`]. Initial parameters,
//! iteration caps and the wall-clock budget are executor concerns and are
//! applied by [`run_lbfgs`](super::run::run_lbfgs).
//!
//! Conventions
//! -----------
//! - Solvers operate on [`Theta`], [`Grad`] and [`Cost`].
//! - History size is `opts.lbfgs_mem` or [`DEFAULT_LBFGS_MEM`].
//! - Tolerances rejected by Argmin surface as [`OptError`](crate::optimization::errors::OptError)
//!   through `From<argmin::core::Error>`.
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::MLEOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, Theta,
        },
    },
};

/// L-BFGS with Hager–Zhang line search, configured from `opts`.
///
/// # Errors
/// Returns an error if Argmin rejects one of the configured tolerances.
pub fn build_optimizer_hager_zhang(opts: &MLEOptions) -> OptResult<LbfgsHagerZhang> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsHagerZhang::new(HagerZhangLS::new(), mem), opts)
}

/// L-BFGS with More–Thuente line search, configured from `opts`.
///
/// More–Thuente is the default for occupancy fits: the profiled causal
/// objective is flat in places and the stricter Wolfe conditions of
/// Hager–Zhang stall more often there.
///
/// # Errors
/// Returns an error if Argmin rejects one of the configured tolerances.
pub fn build_optimizer_more_thuente(opts: &MLEOptions) -> OptResult<LbfgsMoreThuente> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsMoreThuente::new(MoreThuenteLS::new(), mem), opts)
}

/// Apply the optional gradient and cost-change tolerances to a solver.
///
/// A `None` tolerance leaves Argmin's default in place.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::loglik_optimizer::traits::{LineSearcher, Tolerances};
    use std::time::Duration;

    fn options(line_searcher: LineSearcher, mem: Option<usize>) -> MLEOptions {
        let tols =
            Tolerances::new(Some(1e-6), Some(1e-9), Some(50)).expect("Tolerances should be valid");
        MLEOptions::new(tols, line_searcher, mem, Some(Duration::from_secs(1)))
            .expect("MLEOptions should be valid")
    }

    #[test]
    // Purpose
    // -------
    // Both builders accept default and explicit history sizes.
    //
    // Given
    // -----
    // - Valid tolerances, `lbfgs_mem` of `None` and `Some(11)`.
    //
    // Expect
    // ------
    // - Every combination builds a solver.
    fn builders_accept_default_and_explicit_memory() {
        // Arrange
        let cases = [None, Some(11)];

        // Act & Assert
        for mem in cases {
            assert!(build_optimizer_hager_zhang(&options(LineSearcher::HagerZhang, mem)).is_ok());
            assert!(build_optimizer_more_thuente(&options(LineSearcher::MoreThuente, mem)).is_ok());
        }
    }

    #[test]
    // Purpose
    // -------
    // `configure_lbfgs` leaves Argmin defaults when only `max_iter` is set.
    //
    // Given
    // -----
    // - Tolerances with both `tol_grad` and `tol_cost` absent.
    //
    // Expect
    // ------
    // - Configuration succeeds.
    fn configure_lbfgs_respects_absent_tolerances() {
        // Arrange
        let raw = LBFGS::new(MoreThuenteLS::new(), DEFAULT_LBFGS_MEM);
        let tols = Tolerances::new(None, None, Some(50)).expect("Tolerances should be valid");
        let opts = MLEOptions::new(tols, LineSearcher::MoreThuente, None, None)
            .expect("MLEOptions should be valid");

        // Act
        let configured = configure_lbfgs(raw, &opts);

        // Assert
        assert!(configured.is_ok());
    }
}
