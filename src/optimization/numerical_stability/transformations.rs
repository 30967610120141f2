//! Numerically stable parameter transforms.
//!
//! Optimizers run in unconstrained `θ` space. The helpers here map each
//! coordinate into the region the occupancy models accept:
//!
//! - [`safe_logistic`], [`to_bounded`] / [`from_bounded`]: ℝ ↔ (lower, upper),
//!   used for the causal model's box-bounded distribution parameters.
//! - [`pacf_to_coefficients`]: ℝᵏ → coefficients of a stationary AR(k)
//!   polynomial, used for the ARMA parts of the statistical model.
//!
//! The logistic branches on the sign of `x` so neither tail overflows.

/// Shrink factor applied to partial autocorrelations so mapped polynomials
/// keep their roots strictly outside the unit circle.
pub const STATIONARITY_MARGIN: f64 = 1e-3;

/// Clamp used before taking a logit, keeping `from_bounded` finite at the
/// box edges.
pub const LOGIT_EPS: f64 = 1e-9;

/// `1 / (1 + exp(-x))`, evaluated without overflow in either tail.
pub fn safe_logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Map `x ∈ ℝ` into the open box `(lower, upper)`.
pub fn to_bounded(x: f64, lower: f64, upper: f64) -> f64 {
    lower + (upper - lower) * safe_logistic(x)
}

/// Inverse of [`to_bounded`]. Values on or beyond an edge are pulled inside
/// by [`LOGIT_EPS`] first.
pub fn from_bounded(value: f64, lower: f64, upper: f64) -> f64 {
    let u = ((value - lower) / (upper - lower)).clamp(LOGIT_EPS, 1.0 - LOGIT_EPS);
    (u / (1.0 - u)).ln()
}

/// Map unconstrained reals to the coefficients `φ₁..φₖ` of a stationary
/// AR polynomial `1 - φ₁B - … - φₖBᵏ`.
///
/// Each input becomes a partial autocorrelation `rⱼ = tanh(xⱼ)(1 - margin)`,
/// then the Durbin–Levinson recursion builds the coefficients:
/// `φ⁽ʲ⁾ⱼ = rⱼ` and `φ⁽ʲ⁾ᵢ = φ⁽ʲ⁻¹⁾ᵢ - rⱼ φ⁽ʲ⁻¹⁾ⱼ₋ᵢ`.
/// Every output therefore
/// corresponds to a polynomial with all roots outside the unit circle.
/// An empty input maps to an empty output.
pub fn pacf_to_coefficients(raw: &[f64]) -> Vec<f64> {
    let mut phi: Vec<f64> = Vec::with_capacity(raw.len());
    for &x in raw {
        let r = x.tanh() * (1.0 - STATIONARITY_MARGIN);
        let prev = phi.clone();
        let k = prev.len();
        for i in 0..k {
            phi[i] = prev[i] - r * prev[k - 1 - i];
        }
        phi.push(r);
    }
    phi
}
