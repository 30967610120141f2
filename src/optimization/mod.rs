//! optimization — MLE stack, parameter transforms, and unified error surface.
//!
//! Purpose
//! -------
//! Provide the optimization layer shared by both occupancy models: an
//! Argmin-backed log-likelihood maximizer, numerically stable maps from
//! unconstrained optimizer space into bounded or stationary model space, and
//! a single error/result surface. Model code implements a log-likelihood,
//! chooses tolerances and a time budget, and obtains fitted parameters and
//! diagnostics without touching backend solver details.
//!
//! Key behaviors
//! -------------
//! - Expose a high-level API for **maximizing log-likelihoods** `ℓ(θ)`
//!   (`loglik_optimizer`), including solver choice, stopping criteria, and a
//!   per-fit wall-clock budget.
//! - Supply shared numerical primitives (`numerical_stability`) for
//!   box-bounded parameters and for the partial-autocorrelation map that
//!   keeps ARMA polynomials stationary and invertible.
//! - Normalize configuration issues, numerical failures, and backend solver
//!   errors into a single enum (`errors::OptError`) with a common result
//!   alias (`OptResult<T>`).
//!
//! Invariants & assumptions
//! ------------------------
//! - Optimizers operate in an unconstrained parameter space `θ`; invalid
//!   states are reported as `OptError`, not panics.
//! - An outcome is only flagged `converged` when the solver met one of its
//!   tolerances. Hitting the iteration cap or the time budget leaves
//!   `converged == false`, and model layers treat that as a divergent fit.
//!
//! Conventions
//! -----------
//! - All solvers maximize `ℓ(θ)` by minimizing `c(θ) = -ℓ(θ)`; user-facing
//!   values are expressed in terms of `ℓ`.
//! - This module and its submodules avoid I/O and logging; the calibration
//!   and evaluation layers report progress.
//!
//! Downstream usage
//! ----------------
//! - `models::causal` maximizes a profiled Gaussian log-likelihood over the
//!   admission-delay and length-of-stay distribution parameters.
//! - `models::sarimax` maximizes the conditional Gaussian log-likelihood of
//!   a regression with seasonal ARMA errors.
//!
//! Testing notes
//! -------------
//! - Unit tests in the submodules cover solver wiring, tolerance handling,
//!   transforms, and error conversions; model tests exercise full fits.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
