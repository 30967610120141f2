//! Conditional sum-of-squares likelihood for regression with seasonal
//! ARMA errors.
//!
//! Model on the differenced, standardized scale:
//! `w[t] = c + β·x[t] + u[t]`, `A(B) u[t] = M(B) e[t]`, `e ~ N(0, σ²)` with
//! `A(B) = (1 − Σ φᵢBⁱ)(1 − Σ ΦᵢBˢⁱ)` and `M(B) = (1 + Σ θᵢBⁱ)(1 + Σ ΘᵢBˢⁱ)`.
//!
//! Parameter vector layout: `[c?, β, φ-raw (p), θ-raw (q), Φ-raw (P), Θ-raw (Q)]`
//! where `c` is present only without differencing and seasonal blocks only for
//! seasonal orders. Raw AR/MA blocks are unconstrained and mapped through
//! [`pacf_to_coefficients`], so every evaluated polynomial is stationary and
//! invertible. σ² is concentrated out.
use crate::{
    models::sarimax::{
        order::SarimaxOrder,
        polynomial::{ar_polynomial, ma_polynomial, multiply},
    },
    optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::{LogLikelihood, Theta},
        numerical_stability::pacf_to_coefficients,
    },
};

/// Floor on the concentrated innovation variance.
const SIGMA2_FLOOR: f64 = 1e-12;

/// Constrained coefficients decoded from a raw parameter vector.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Coefficients {
    pub constant: f64,
    pub beta: f64,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
}

impl Coefficients {
    pub fn theta_len(order: &SarimaxOrder) -> usize {
        order.n_coefficients()
    }

    pub fn from_theta(theta: &Theta, order: &SarimaxOrder) -> Self {
        let raw = theta.to_vec();
        let mut at = 0;
        let mut take = |n: usize| {
            let block = raw[at..at + n].to_vec();
            at += n;
            block
        };
        let constant = if order.has_constant() { take(1)[0] } else { 0.0 };
        let beta = take(1)[0];
        let ar = pacf_to_coefficients(&take(order.p));
        let ma: Vec<f64> = pacf_to_coefficients(&take(order.q)).iter().map(|c| -c).collect();
        let (sp, sq) =
            if order.is_seasonal() { (order.seasonal_p, order.seasonal_q) } else { (0, 0) };
        let seasonal_ar = pacf_to_coefficients(&take(sp));
        let seasonal_ma: Vec<f64> = pacf_to_coefficients(&take(sq)).iter().map(|c| -c).collect();
        Self { constant, beta, ar, ma, seasonal_ar, seasonal_ma }
    }

    /// Expanded `A(B)`, constant term first.
    pub fn ar_poly(&self, period: usize) -> Vec<f64> {
        multiply(&ar_polynomial(&self.ar, 1), &ar_polynomial(&self.seasonal_ar, period))
    }

    /// Expanded `M(B)`, constant term first.
    pub fn ma_poly(&self, period: usize) -> Vec<f64> {
        multiply(&ma_polynomial(&self.ma, 1), &ma_polynomial(&self.seasonal_ma, period))
    }
}

/// Differenced, standardized data for one candidate order.
#[derive(Debug, Clone)]
pub(crate) struct CssData {
    pub w: Vec<f64>,
    pub x: Vec<f64>,
    pub order: SarimaxOrder,
    /// First index with a residual. Shared across candidates so their
    /// likelihoods cover the same observations.
    pub start: usize,
}

/// Residual recursion output.
#[derive(Debug, Clone)]
pub(crate) struct Residuals {
    pub u: Vec<f64>,
    pub e: Vec<f64>,
    pub sigma2: f64,
    pub n_eff: usize,
    pub log_likelihood: f64,
}

/// Run the CSS recursion for `coefs` over `data`.
pub(crate) fn css_residuals(coefs: &Coefficients, data: &CssData) -> Residuals {
    let s = data.order.effective_period();
    let a = coefs.ar_poly(s);
    let m = coefs.ma_poly(s);
    let n = data.w.len();
    let u: Vec<f64> =
        data.w.iter().zip(&data.x).map(|(w, x)| w - coefs.constant - coefs.beta * x).collect();
    let mut e = vec![0.0; n];
    let start = data.start.max(a.len() - 1);
    for t in start..n {
        let ar_part: f64 = a.iter().enumerate().map(|(k, ak)| ak * u[t - k]).sum();
        let ma_part: f64 = m
            .iter()
            .enumerate()
            .skip(1)
            .take_while(|(k, _)| *k <= t - start)
            .map(|(k, mk)| mk * e[t - k])
            .sum();
        e[t] = ar_part - ma_part;
    }
    let n_eff = n.saturating_sub(start);
    let sse: f64 = e[start..].iter().map(|v| v * v).sum();
    let sigma2 = (sse / n_eff.max(1) as f64).max(SIGMA2_FLOOR);
    let log_likelihood =
        -0.5 * n_eff as f64 * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
    Residuals { u, e, sigma2, n_eff, log_likelihood }
}

/// Concentrated CSS log-likelihood of one candidate order.
#[derive(Debug, Default)]
pub(crate) struct CssLikelihood;

impl LogLikelihood for CssLikelihood {
    type Data = CssData;

    fn value(&self, theta: &Theta, data: &CssData) -> OptResult<f64> {
        let coefs = Coefficients::from_theta(theta, &data.order);
        Ok(css_residuals(&coefs, data).log_likelihood)
    }

    fn check(&self, theta: &Theta, data: &CssData) -> OptResult<()> {
        let expected = Coefficients::theta_len(&data.order);
        if theta.len() != expected {
            return Err(OptError::ThetaLengthMismatch { expected, actual: theta.len() });
        }
        if let Some((index, &value)) = theta.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(OptError::InvalidThetaInput { index, value });
        }
        if data.w.len() != data.x.len() {
            return Err(OptError::InvalidModelInput {
                reason: format!(
                    "target has {} values but regressor has {}",
                    data.w.len(),
                    data.x.len()
                ),
            });
        }
        if data.w.len() <= data.start + expected {
            return Err(OptError::InvalidModelInput {
                reason: format!(
                    "{} residuals cannot identify {expected} coefficients",
                    data.w.len().saturating_sub(data.start)
                ),
            });
        }
        Ok(())
    }
}
