//! Lag-polynomial arithmetic for seasonal ARIMA.
//!
//! A polynomial in the backshift operator `B` is stored as its coefficient
//! vector with the constant term first: `[1, c₁, c₂, …]` means
//! `1 + c₁B + c₂B² + …`.
use nalgebra::DMatrix;

/// Product of two lag polynomials.
pub fn multiply(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &ai) in a.iter().enumerate() {
        for (j, &bj) in b.iter().enumerate() {
            out[i + j] += ai * bj;
        }
    }
    out
}

/// `1 − φ₁Bˢ − φ₂B²ˢ − …` for AR-type coefficients at lag spacing `s`.
pub fn ar_polynomial(phi: &[f64], s: usize) -> Vec<f64> {
    let mut poly = vec![0.0; phi.len() * s + 1];
    poly[0] = 1.0;
    for (i, &c) in phi.iter().enumerate() {
        poly[(i + 1) * s] = -c;
    }
    poly
}

/// `1 + θ₁Bˢ + θ₂B²ˢ + …` for MA-type coefficients at lag spacing `s`.
pub fn ma_polynomial(theta: &[f64], s: usize) -> Vec<f64> {
    let mut poly = vec![0.0; theta.len() * s + 1];
    poly[0] = 1.0;
    for (i, &c) in theta.iter().enumerate() {
        poly[(i + 1) * s] = c;
    }
    poly
}

/// `(1 − B)ᵈ (1 − Bˢ)ᴰ`.
pub fn difference_polynomial(d: usize, seasonal_d: usize, s: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = multiply(&poly, &[1.0, -1.0]);
    }
    for _ in 0..seasonal_d {
        poly = multiply(&poly, &ar_polynomial(&[1.0], s));
    }
    poly
}

/// Apply `delta(B)` to `x`. The first `delta.len() − 1` observations are
/// consumed, so the output is that much shorter.
pub fn apply_difference(x: &[f64], delta: &[f64]) -> Vec<f64> {
    let k = delta.len().saturating_sub(1);
    if x.len() <= k {
        return Vec::new();
    }
    (k..x.len()).map(|t| delta.iter().enumerate().map(|(j, &c)| c * x[t - j]).sum()).collect()
}

/// Invert [`apply_difference`] forward in time: given the last
/// `delta.len() − 1` levels in `history` and the differenced values `w`,
/// return the implied levels for each entry of `w`.
pub fn integrate(history: &[f64], w: &[f64], delta: &[f64]) -> Vec<f64> {
    let mut levels: Vec<f64> = history.to_vec();
    let base = levels.len();
    for &wt in w {
        let t = levels.len();
        let carried: f64 = delta.iter().enumerate().skip(1).map(|(j, &c)| c * levels[t - j]).sum();
        levels.push(wt - carried);
    }
    levels.split_off(base)
}

/// First `n` coefficients of `ψ(B) = ma(B) / ar(B)`.
pub fn psi_weights(ar: &[f64], ma: &[f64], n: usize) -> Vec<f64> {
    let mut psi = vec![0.0; n];
    for j in 0..n {
        let mut v = ma.get(j).copied().unwrap_or(0.0);
        for k in 1..=j.min(ar.len().saturating_sub(1)) {
            v -= ar[k] * psi[j - k];
        }
        psi[j] = v;
    }
    psi
}

/// Largest modulus among the inverse roots of `poly` (constant term first).
///
/// The inverse roots are the eigenvalues of the companion matrix of
/// `zⁿ + c₁zⁿ⁻¹ + … + cₙ`. A polynomial is stationary (or invertible, for
/// MA parts) when this value is below one. Degree zero yields `0.0`.
pub fn max_inverse_root_modulus(poly: &[f64]) -> f64 {
    let degree = poly.iter().rposition(|c| c.abs() > 1e-14).unwrap_or(0);
    if degree == 0 {
        return 0.0;
    }
    let lead = poly[0];
    let companion = DMatrix::from_fn(degree, degree, |i, j| {
        if i == 0 {
            -poly[j + 1] / lead
        } else if i == j + 1 {
            1.0
        } else {
            0.0
        }
    });
    companion.complex_eigenvalues().iter().map(|z| z.norm()).fold(0.0, f64::max)
}
