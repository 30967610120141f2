//! Validation helpers for log-likelihood optimization.
//!
//! Option constructors, the cost adapter and outcome construction all route
//! their consistency checks through here so each failure maps to one
//! [`OptError`] variant:
//!
//! - tolerances must be finite and strictly positive when given;
//! - gradients must match `θ` in length and be finite;
//! - estimates must exist and be finite, as must the objective value;
//! - a per-fit time budget, when given, must be non-zero.
use std::time::Duration;

use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{Grad, Theta},
};

/// Index and value of the first non-finite entry, if any.
fn first_non_finite<'a>(values: impl IntoIterator<Item = &'a f64>) -> Option<(usize, f64)> {
    values.into_iter().copied().enumerate().find(|(_, v)| !v.is_finite())
}

/// Shared rule for optional tolerances; `make` builds the caller's variant.
fn verify_tolerance(
    tol: Option<f64>, make: fn(f64, &'static str) -> OptError,
) -> OptResult<()> {
    match tol {
        Some(t) if !t.is_finite() => Err(make(t, "Tolerance must be finite.")),
        Some(t) if t <= 0.0 => Err(make(t, "Tolerance must be positive.")),
        _ => Ok(()),
    }
}

/// # Errors
/// [`OptError::InvalidTolGrad`] if the value is non-finite or ≤ 0.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    verify_tolerance(tol, |tol, reason| OptError::InvalidTolGrad { tol, reason })
}

/// # Errors
/// [`OptError::InvalidTolCost`] if the value is non-finite or ≤ 0.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    verify_tolerance(tol, |tol, reason| OptError::InvalidTolCost { tol, reason })
}

/// # Errors
/// - [`OptError::GradientDimMismatch`] if `grad.len() != dim`.
/// - [`OptError::InvalidGradient`] for the first non-finite element.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    match first_non_finite(grad) {
        Some((index, value)) => Err(OptError::InvalidGradient {
            index,
            value,
            reason: "Gradient elements must be finite.",
        }),
        None => Ok(()),
    }
}

/// Unwrap the solver's best parameters.
///
/// # Errors
/// - [`OptError::MissingThetaHat`] if the solver produced none.
/// - [`OptError::InvalidThetaHat`] for the first non-finite element.
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    let theta = theta_hat.ok_or(OptError::MissingThetaHat)?;
    match first_non_finite(&theta) {
        Some((index, value)) => Err(OptError::InvalidThetaHat {
            index,
            value,
            reason: "Parameter estimates must be finite.",
        }),
        None => Ok(theta),
    }
}

/// # Errors
/// [`OptError::NonFiniteCost`] for `NaN` or `±∞`.
pub fn validate_value(value: f64) -> OptResult<()> {
    if value.is_finite() { Ok(()) } else { Err(OptError::NonFiniteCost { value }) }
}

/// # Errors
/// [`OptError::InvalidTimeBudget`] for `Some(Duration::ZERO)`.
pub fn verify_time_budget(budget: Option<Duration>) -> OptResult<()> {
    match budget {
        Some(b) if b.is_zero() => Err(OptError::InvalidTimeBudget { millis: b.as_millis() }),
        _ => Ok(()),
    }
}
