//! Discretized delay kernels.
//!
//! A kernel is a probability mass function over whole-day lags `0..=max_lag`
//! obtained from a continuous (or discrete) distribution parameterized by
//! its mean and spread. The admission delay and the length of stay both use
//! this representation.
//!
//! Discretization rounds to the nearest day: `pmf[k] = F(k + ½) − F(k − ½)`
//! with the lower edge clipped at zero, then the mass is renormalized over
//! the truncated support.
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Discrete, Gamma, Normal, Poisson};

use crate::models::errors::{ModelError, ModelResult};

/// Minimum mass that must fall inside `0..=max_lag` before renormalizing.
const MIN_KERNEL_MASS: f64 = 1e-6;

/// Distribution family for a delay kernel.
///
/// - `Gamma`: shape `(mean/spread)²`, rate `mean/spread²`.
/// - `Poisson`: rate `mean`; `spread` is ignored.
/// - `TruncatedNormal`: normal with location `mean` and scale `spread`,
///   truncated to non-negative lags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionFamily {
    #[default]
    Gamma,
    Poisson,
    TruncatedNormal,
}

/// A family plus its two shape parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KernelSpec {
    pub family: DistributionFamily,
    pub mean: f64,
    pub spread: f64,
}

impl KernelSpec {
    /// Probability mass over lags `0..=max_lag`, summing to one.
    ///
    /// # Errors
    /// [`ModelError::Configuration`] if the parameters are not positive and
    /// finite, or if less than [`MIN_KERNEL_MASS`] falls inside the support.
    pub fn pmf(&self, max_lag: usize) -> ModelResult<Vec<f64>> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !(positive(self.mean) && positive(self.spread)) {
            return Err(ModelError::configuration(format!(
                "kernel parameters must be positive and finite, got mean {} spread {}",
                self.mean, self.spread
            )));
        }
        let mut mass = match self.family {
            DistributionFamily::Gamma => {
                let shape = (self.mean / self.spread).powi(2);
                let rate = self.mean / (self.spread * self.spread);
                let dist = Gamma::new(shape, rate)
                    .map_err(|e| ModelError::configuration(format!("gamma kernel: {e}")))?;
                rounded(max_lag, |x| dist.cdf(x))
            }
            DistributionFamily::TruncatedNormal => {
                let dist = Normal::new(self.mean, self.spread)
                    .map_err(|e| ModelError::configuration(format!("normal kernel: {e}")))?;
                rounded(max_lag, |x| dist.cdf(x))
            }
            DistributionFamily::Poisson => {
                let dist = Poisson::new(self.mean)
                    .map_err(|e| ModelError::configuration(format!("poisson kernel: {e}")))?;
                (0..=max_lag as u64).map(|k| dist.pmf(k)).collect()
            }
        };

        let total: f64 = mass.iter().sum();
        if !(total.is_finite() && total >= MIN_KERNEL_MASS) {
            return Err(ModelError::configuration(format!(
                "{:?} kernel with mean {} has no mass within {max_lag} days",
                self.family, self.mean
            )));
        }
        mass.iter_mut().for_each(|m| *m /= total);
        Ok(mass)
    }
}

fn rounded(max_lag: usize, cdf: impl Fn(f64) -> f64) -> Vec<f64> {
    (0..=max_lag)
        .map(|k| {
            let lo = (k as f64 - 0.5).max(0.0);
            (cdf(k as f64 + 0.5) - cdf(lo)).max(0.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    // Purpose
    // -------
    // Every family yields a normalized pmf whose mean tracks the requested
    // mean when the support is wide enough.
    //
    // Given
    // -----
    // - Mean 6, spread 2.5, support 0..=40.
    //
    // Expect
    // ------
    // - Mass sums to one and the discrete mean is within 0.1 day of 6.
    fn pmf_is_normalized_and_centered() {
        use DistributionFamily::{Gamma, Poisson, TruncatedNormal};
        for family in [Gamma, Poisson, TruncatedNormal] {
            // Arrange
            let spec = KernelSpec { family, mean: 6.0, spread: 2.5 };

            // Act
            let pmf = spec.pmf(40).expect("kernel should discretize");

            // Assert
            let total: f64 = pmf.iter().sum();
            let mean: f64 = pmf.iter().enumerate().map(|(k, p)| k as f64 * p).sum();
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(mean, 6.0, epsilon = 0.1);
            assert!(pmf.iter().all(|&p| p >= 0.0));
        }
    }

    #[test]
    fn pmf_rejects_mass_outside_support_and_bad_parameters() {
        let far =
            KernelSpec { family: DistributionFamily::TruncatedNormal, mean: 500.0, spread: 1.0 };
        assert!(far.pmf(10).is_err());
        let bad = KernelSpec { family: DistributionFamily::Gamma, mean: -1.0, spread: 1.0 };
        assert!(bad.pmf(10).is_err());
    }
}
