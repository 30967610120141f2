//! models — occupancy forecasting strategies behind one capability trait.
//!
//! Purpose
//! -------
//! Define the shared fit/forecast interface ([`OccupancyModel`]) and the
//! value types every strategy produces, so calibration and evaluation can
//! drive either strategy without knowing which one it is.
//!
//! Key behaviors
//! -------------
//! - [`causal`]: cascade model, cases → admissions → releases → occupancy,
//!   fitted by profiled least squares over delay and stay kernels.
//! - [`sarimax`]: regression of occupancy on smoothed cases with seasonal
//!   ARMA errors, fitted by conditional maximum likelihood with optional
//!   order search.
//! - [`ForecastResult`]: immutable forecast anchored at the reference date.
//! - [`Diagnostic`]: non-fatal conditions attached to successful results.
//!
//! Invariants & assumptions
//! ------------------------
//! - Fitted state is an immutable value produced fresh by every `fit` call;
//!   models hold only configuration and are shared read-only across threads.
//! - `forecast` consumes exactly `horizon` future case values; supplying
//!   fewer is a [`ModelError::Configuration`].
//! - Forecast occupancy is never negative.
//!
//! Conventions
//! -----------
//! - Dates in a [`ForecastResult`] start the day after the reference date.
//! - Model code does not log; the calibration layer reports outcomes.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    optimization::loglik_optimizer::OptimOutcome,
    series::{AlignedDataset, CalibrationWindow, DailySeries},
};

pub mod causal;
pub mod errors;
pub mod sarimax;

pub use self::errors::{ModelError, ModelResult};
pub use crate::series::BedType;

/// Which forecasting strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "causal")]
    Causal,
    #[serde(rename = "sarimax")]
    Statistical,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Causal, ModelKind::Statistical];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Causal => "causal",
            ModelKind::Statistical => "sarimax",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "causal" | "cascade" => Ok(ModelKind::Causal),
            "sarimax" | "statistical" | "arima" => Ok(ModelKind::Statistical),
            other => Err(format!("unknown model kind '{other}', expected 'causal' or 'sarimax'")),
        }
    }
}

/// Non-fatal condition raised while fitting or forecasting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Too few cases in the window to identify the admission rate; prior
    /// parameters were used.
    LowSignal { case_total: f64 },

    /// The occupancy recurrence went negative and was clamped to zero.
    NegativeOccupancyClamped { first_date: NaiveDate, days: usize },

    /// Window too short for the seasonal component; a non-seasonal order was
    /// fitted instead.
    SeasonalityDropped { window_days: usize, period: usize },

    /// The best fit came from a restart rather than the first start point.
    RestartUsed { start_index: usize },
}

/// Fit summary persisted next to every scored evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum CalibrationStats {
    Causal(causal::CausalFitStats),
    Sarimax(sarimax::SarimaxFitStats),
}

/// Point forecast (and optional interval) beyond a reference date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub kind: ModelKind,
    pub window: CalibrationWindow,
    /// Observed occupancy on the reference date; the forecast is continuous
    /// with it.
    pub reference_value: f64,
    /// One value per day from `reference + 1` to `reference + horizon`.
    pub series: DailySeries,
    pub lower: Option<Vec<f64>>,
    pub upper: Option<Vec<f64>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ForecastResult {
    pub fn horizon(&self) -> usize {
        self.series.len()
    }

    /// Occupancy `steps` days after the reference date; step 0 is the anchor.
    pub fn at_step(&self, steps: usize) -> Option<f64> {
        match steps {
            0 => Some(self.reference_value),
            s => self.series.values().get(s - 1).copied(),
        }
    }
}

/// Shared capability of both forecasting strategies.
///
/// Implementations hold configuration only. `fit` reads a window of the
/// dataset (and, for convolution and differencing, the history before it)
/// and returns a self-contained fitted value; `forecast` needs nothing else.
pub trait OccupancyModel {
    type Fitted: Clone + Send + Sync;

    fn kind(&self) -> ModelKind;

    /// Shortest window length this model accepts with its current settings.
    fn min_window_days(&self) -> usize;

    /// Calibrate on `window`, targeting the `bed` occupancy series.
    ///
    /// # Errors
    /// [`ModelError`] for too-short or out-of-range windows, invalid settings
    /// and divergent fits.
    fn fit(
        &self, dataset: &AlignedDataset, window: &CalibrationWindow, bed: BedType,
    ) -> ModelResult<Self::Fitted>;

    /// Forecast `horizon` days past the reference date from the first
    /// `horizon` entries of `future_cases`.
    ///
    /// # Errors
    /// [`ModelError::Configuration`] if `future_cases.len() < horizon`.
    fn forecast(
        &self, fitted: &Self::Fitted, future_cases: &[f64], horizon: usize,
    ) -> ModelResult<ForecastResult>;

    fn calibration_stats(&self, fitted: &Self::Fitted) -> CalibrationStats;
}

/// Shared guard for the future-case length contract.
pub(crate) fn check_future_cases(future_cases: &[f64], horizon: usize) -> ModelResult<()> {
    if future_cases.len() < horizon {
        return Err(ModelError::configuration(format!(
            "horizon of {horizon} days exceeds the {} supplied future case values",
            future_cases.len()
        )));
    }
    if let Some(bad) = future_cases[..horizon].iter().find(|v| !v.is_finite() || **v < 0.0) {
        return Err(ModelError::configuration(format!(
            "future case values must be finite and non-negative, got {bad}"
        )));
    }
    Ok(())
}

/// Window indices plus the minimum-length check common to both models.
pub(crate) fn window_bounds(
    dataset: &AlignedDataset, window: &CalibrationWindow, required: usize,
) -> ModelResult<(usize, usize)> {
    let (from, to) = dataset.window_indices(window)?;
    let available = to - from + 1;
    if available < required {
        return Err(ModelError::InsufficientData { available, required });
    }
    Ok((from, to))
}

/// [`ModelError::FitDivergence`] for an optimizer run `what` that ended
/// without meeting a tolerance, naming the budget when that stopped it.
pub(crate) fn unconverged(what: &str, outcome: &OptimOutcome) -> ModelError {
    if outcome.budget_exhausted {
        ModelError::divergence(format!(
            "{what} exhausted its iteration or time budget after {} iterations ({})",
            outcome.iterations, outcome.status
        ))
    } else {
        ModelError::divergence(format!("{what} stopped without converging: {}", outcome.status))
    }
}

/// Seeded uniform noise for synthetic fixtures (64-bit LCG, top 53 bits).
#[cfg(test)]
pub(crate) struct WhiteNoise(u64);

#[cfg(test)]
impl WhiteNoise {
    pub(crate) fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Next draw, uniform on `[-0.5, 0.5)`.
    pub(crate) fn next_centered(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64 - 0.5
    }
}
