//! Forecast error metrics.
//!
//! Every metric is finite for finite, equal-length inputs, including
//! all-zero ground truth: percentage errors divide by a floored magnitude
//! and sMAPE scores `0` on days where both values are `0`. Empty inputs
//! score `0`.
use serde::{Deserialize, Serialize};

/// Smallest denominator used by percentage metrics, in beds.
pub const PERCENT_FLOOR: f64 = 1.0;

/// Smallest in-sample naive error used to scale MASE, in beds.
pub const MASE_SCALE_FLOOR: f64 = 1.0;

/// Metric used to rank window lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMetric {
    /// Mean absolute percentage error, denominator `max(|actual|, 1)`.
    #[default]
    Mape,
    /// Symmetric MAPE, bounded by 200.
    Smape,
    Mae,
    /// MAE scaled by the in-window one-day naive error.
    Mase,
}

impl ErrorMetric {
    pub const ALL: [ErrorMetric; 4] =
        [ErrorMetric::Mape, ErrorMetric::Smape, ErrorMetric::Mae, ErrorMetric::Mase];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorMetric::Mape => "mape",
            ErrorMetric::Smape => "smape",
            ErrorMetric::Mae => "mae",
            ErrorMetric::Mase => "mase",
        }
    }

    /// Pick this metric out of a full [`MetricSet`].
    pub fn select(&self, set: &MetricSet) -> f64 {
        match self {
            ErrorMetric::Mape => set.mape,
            ErrorMetric::Smape => set.smape,
            ErrorMetric::Mae => set.mae,
            ErrorMetric::Mase => set.mase,
        }
    }
}

impl std::fmt::Display for ErrorMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ErrorMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mape" => Ok(ErrorMetric::Mape),
            "smape" => Ok(ErrorMetric::Smape),
            "mae" => Ok(ErrorMetric::Mae),
            "mase" => Ok(ErrorMetric::Mase),
            other => Err(format!("unknown metric '{other}', expected mape, smape, mae or mase")),
        }
    }
}

/// All metrics for one forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    pub mape: f64,
    pub smape: f64,
    pub mae: f64,
    pub mase: f64,
}

impl MetricSet {
    /// Score `predicted` against `actual`; `history` is the in-window target
    /// series used to scale MASE.
    pub fn compute(actual: &[f64], predicted: &[f64], history: &[f64]) -> Self {
        Self {
            mape: mape(actual, predicted),
            smape: smape(actual, predicted),
            mae: mae(actual, predicted),
            mase: mase(actual, predicted, history),
        }
    }
}

fn mean_over(actual: &[f64], predicted: &[f64], term: impl Fn(f64, f64) -> f64) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    actual.iter().zip(predicted).map(|(&a, &p)| term(a, p)).sum::<f64>() / n as f64
}

pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    100.0 * mean_over(actual, predicted, |a, p| (a - p).abs() / a.abs().max(PERCENT_FLOOR))
}

pub fn smape(actual: &[f64], predicted: &[f64]) -> f64 {
    100.0
        * mean_over(actual, predicted, |a, p| {
            let denom = a.abs() + p.abs();
            if denom == 0.0 { 0.0 } else { 2.0 * (a - p).abs() / denom }
        })
}

pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    mean_over(actual, predicted, |a, p| (a - p).abs())
}

pub fn mase(actual: &[f64], predicted: &[f64], history: &[f64]) -> f64 {
    let naive = if history.len() < 2 {
        0.0
    } else {
        history.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f64>() / (history.len() - 1) as f64
    };
    mae(actual, predicted) / naive.max(MASE_SCALE_FLOOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    // Purpose
    // -------
    // No metric produces NaN or infinity on all-zero ground truth.
    //
    // Given
    // -----
    // - Zero actuals against zero and non-zero forecasts, flat history.
    //
    // Expect
    // ------
    // - Perfect zero forecast scores 0 everywhere; a forecast of 2 beds
    //   scores MAPE 200 (floored denominator) and sMAPE 200.
    fn metrics_are_finite_on_zero_truth() {
        // Arrange
        let actual = [0.0; 5];
        let history = [0.0; 10];

        // Act
        let perfect = MetricSet::compute(&actual, &[0.0; 5], &history);
        let off = MetricSet::compute(&actual, &[2.0; 5], &history);

        // Assert
        for m in ErrorMetric::ALL {
            assert!(m.select(&perfect).is_finite() && m.select(&off).is_finite());
            assert_eq!(m.select(&perfect), 0.0);
        }
        assert_abs_diff_eq!(off.mape, 200.0, epsilon = 1e-12);
        assert_abs_diff_eq!(off.smape, 200.0, epsilon = 1e-12);
        assert_abs_diff_eq!(off.mase, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn metrics_match_hand_computed_values() {
        let actual = [100.0, 200.0];
        let predicted = [110.0, 180.0];
        assert_abs_diff_eq!(mae(&actual, &predicted), 15.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mape(&actual, &predicted), 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mase(&actual, &predicted, &[0.0, 5.0, 0.0]), 3.0, epsilon = 1e-12);
        assert_eq!("SMAPE".parse::<ErrorMetric>(), Ok(ErrorMetric::Smape));
    }
}
