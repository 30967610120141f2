//! Cascade parameters, search bounds and the θ ↔ parameter mapping.
//!
//! Purpose
//! -------
//! Describe the value objects produced by a causal fit and the box they are
//! searched in. The hospitalization rate is profiled out in closed form, so
//! the optimizer only sees the four kernel shape parameters.
//!
//! Conventions
//! -----------
//! - Optimizer space: `θ = (θ_delay_mean, θ_delay_spread, θ_stay_mean,
//!   θ_stay_spread)`, each mapped into its box by a logistic transform.
//! - [`CascadeParameters`] are immutable once produced; a refit builds a new
//!   value.
use serde::{Deserialize, Serialize};

use crate::{
    models::{
        causal::kernels::{DistributionFamily, KernelSpec},
        errors::{ModelError, ModelResult},
    },
    optimization::{
        loglik_optimizer::Theta,
        numerical_stability::{from_bounded, to_bounded},
    },
};

/// Number of free coordinates in θ.
pub const THETA_DIM: usize = 4;

/// Fitted cascade: `admissions = rate · (cases ⊛ delay)`,
/// `releases = admissions ⊛ stay` (shifted one day).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CascadeParameters {
    pub hospitalization_rate: f64,
    pub delay: KernelSpec,
    pub stay: KernelSpec,
}

impl CascadeParameters {
    /// Documented defaults used as the low-signal prior.
    pub fn prior(delay_family: DistributionFamily, stay_family: DistributionFamily) -> Self {
        Self {
            hospitalization_rate: 0.05,
            delay: KernelSpec { family: delay_family, mean: 7.0, spread: 3.0 },
            stay: KernelSpec { family: stay_family, mean: 10.0, spread: 6.0 },
        }
    }
}

/// Closed interval `[lower, upper]` for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub lower: f64,
    pub upper: f64,
}

impl Bound {
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    fn validate(&self, name: &str) -> ModelResult<()> {
        if !(self.lower.is_finite() && self.upper.is_finite() && self.lower < self.upper) {
            return Err(ModelError::configuration(format!(
                "bound '{name}' must be finite with lower < upper, got [{}, {}]",
                self.lower, self.upper
            )));
        }
        Ok(())
    }
}

/// Search box for the causal fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterBounds {
    pub hospitalization_rate: Bound,
    pub delay_mean: Bound,
    pub delay_spread: Bound,
    pub stay_mean: Bound,
    pub stay_spread: Bound,
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self {
            hospitalization_rate: Bound::new(0.0, 1.0),
            delay_mean: Bound::new(0.5, 14.0),
            delay_spread: Bound::new(0.5, 10.0),
            stay_mean: Bound::new(1.0, 30.0),
            stay_spread: Bound::new(0.5, 20.0),
        }
    }
}

impl ParameterBounds {
    pub fn validate(&self) -> ModelResult<()> {
        self.hospitalization_rate.validate("hospitalization_rate")?;
        self.delay_mean.validate("delay_mean")?;
        self.delay_spread.validate("delay_spread")?;
        self.stay_mean.validate("stay_mean")?;
        self.stay_spread.validate("stay_spread")?;
        if self.delay_mean.lower <= 0.0 || self.delay_spread.lower <= 0.0 {
            return Err(ModelError::configuration("delay bounds must be strictly positive"));
        }
        if self.stay_mean.lower <= 0.0 || self.stay_spread.lower <= 0.0 {
            return Err(ModelError::configuration("stay bounds must be strictly positive"));
        }
        Ok(())
    }

    fn kernel_bounds(&self) -> [Bound; THETA_DIM] {
        [self.delay_mean, self.delay_spread, self.stay_mean, self.stay_spread]
    }

    /// Map θ into delay and stay kernel specs.
    pub fn kernels_from_theta(
        &self, theta: &Theta, delay_family: DistributionFamily, stay_family: DistributionFamily,
    ) -> (KernelSpec, KernelSpec) {
        let b = self.kernel_bounds();
        let v: Vec<f64> =
            (0..THETA_DIM).map(|i| to_bounded(theta[i], b[i].lower, b[i].upper)).collect();
        (
            KernelSpec { family: delay_family, mean: v[0], spread: v[1] },
            KernelSpec { family: stay_family, mean: v[2], spread: v[3] },
        )
    }

    /// Inverse of [`kernels_from_theta`](Self::kernels_from_theta).
    pub fn theta_from_kernels(&self, delay: &KernelSpec, stay: &KernelSpec) -> Theta {
        let b = self.kernel_bounds();
        let v = [delay.mean, delay.spread, stay.mean, stay.spread];
        Theta::from_iter((0..THETA_DIM).map(|i| from_bounded(v[i], b[i].lower, b[i].upper)))
    }

    /// Evenly spaced interior grid in θ space, `points` per coordinate.
    ///
    /// Grid nodes sit at the box quantiles `(i + ½) / points`, so the edges
    /// of the box are never evaluated.
    pub fn theta_grid(&self, points: usize) -> Vec<Theta> {
        let points = points.max(1);
        let node = |i: usize| {
            let u: f64 = (i as f64 + 0.5) / points as f64;
            (u / (1.0 - u)).ln()
        };
        let total = points.pow(THETA_DIM as u32);
        (0..total)
            .map(|mut idx| {
                let mut theta = Theta::zeros(THETA_DIM);
                for d in 0..THETA_DIM {
                    theta[d] = node(idx % points);
                    idx /= points;
                }
                theta
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    // Purpose
    // -------
    // θ maps stay inside the bounds and invert each other.
    //
    // Given
    // -----
    // - Default bounds and kernels at delay (5, 2), stay (12, 4).
    //
    // Expect
    // ------
    // - kernels_from_theta(theta_from_kernels(k)) == k.
    fn theta_mapping_round_trips() {
        // Arrange
        let bounds = ParameterBounds::default();
        let delay = KernelSpec { family: DistributionFamily::Gamma, mean: 5.0, spread: 2.0 };
        let stay = KernelSpec { family: DistributionFamily::Gamma, mean: 12.0, spread: 4.0 };

        // Act
        let theta = bounds.theta_from_kernels(&delay, &stay);
        let (d, s) = bounds.kernels_from_theta(
            &theta,
            DistributionFamily::Gamma,
            DistributionFamily::Gamma,
        );

        // Assert
        assert_abs_diff_eq!(d.mean, 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(d.spread, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s.mean, 12.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s.spread, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn grid_has_points_to_the_fourth_and_stays_interior() {
        let bounds = ParameterBounds::default();
        let grid = bounds.theta_grid(3);
        assert_eq!(grid.len(), 81);
        for theta in &grid {
            let (d, s) = bounds.kernels_from_theta(
                theta,
                DistributionFamily::Gamma,
                DistributionFamily::Gamma,
            );
            assert!(d.mean > 0.5 && d.mean < 14.0);
            assert!(s.spread > 0.5 && s.spread < 20.0);
        }
    }

    #[test]
    fn validate_rejects_inverted_bounds() {
        let bounds = ParameterBounds { delay_mean: Bound::new(5.0, 1.0), ..Default::default() };
        assert!(bounds.validate().is_err());
    }
}
