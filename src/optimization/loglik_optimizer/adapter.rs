//! Adapter that exposes a [`LogLikelihood`] as an `argmin` problem.
//!
//! Maximizing `ℓ(θ)` becomes minimizing `c(θ) = -ℓ(θ)`. Analytic gradients
//! are negated; otherwise the **cost** is finite-differenced directly, so no
//! sign flip is needed on that branch. Neither occupancy model ships an
//! analytic gradient, so the finite-difference branch is the hot path.
use std::cell::RefCell;

use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        traits::LogLikelihood,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;

/// Bridges a [`LogLikelihood`] and its data to `argmin`'s `CostFunction` and
/// `Gradient` traits.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<F: LogLikelihood> CostFunction for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Output = Cost;

    /// `c(θ) = -ℓ(θ)`; a non-finite `ℓ` is an [`OptError::NonFiniteCost`].
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let ll = self.f.value(theta, self.data)?;
        if !ll.is_finite() {
            return Err(OptError::NonFiniteCost { value: ll }.into());
        }
        Ok(-ll)
    }
}

impl<F: LogLikelihood> Gradient for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Gradient of the cost at `θ`.
    ///
    /// With no analytic gradient, central differences are tried first. If a
    /// cost evaluation failed during differencing, or the result is not
    /// finite, forward differences are tried once before giving up. This
    /// matters near the edges of the bounded parameter maps, where one side
    /// of a central stencil can leave the region the model accepts.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let dim = theta.len();
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, dim)?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => {
                let first_err: RefCell<Option<Error>> = RefCell::new(None);
                let cost = |t: &Theta| -> f64 {
                    self.cost(t).unwrap_or_else(|e| {
                        first_err.borrow_mut().get_or_insert(e);
                        f64::NAN
                    })
                };
                let central = theta.central_diff(&cost);
                if first_err.borrow().is_none() && validate_grad(&central, dim).is_ok() {
                    return Ok(central);
                }
                forward_gradient(theta, &cost, &first_err)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Forward-difference fallback. Errors captured while differencing take
/// precedence over validation errors on the resulting vector.
fn forward_gradient<G: Fn(&Theta) -> f64>(
    theta: &Theta, cost: &G, first_err: &RefCell<Option<Error>>,
) -> Result<Grad, Error> {
    first_err.replace(None);
    let grad = theta.forward_diff(cost);
    if let Some(err) = first_err.take() {
        return Err(err);
    }
    validate_grad(&grad, theta.len())?;
    Ok(grad)
}
