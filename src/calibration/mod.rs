//! calibration — uniform fit entry point over both occupancy models.
//!
//! Purpose
//! -------
//! Wrap a configured [`CausalModel`] and [`SarimaxModel`] behind one
//! `calibrate(kind, dataset, window)` call whose result is a tagged value:
//! a usable [`FittedModel`] or a [`SkipReason`]. No model failure escapes
//! this boundary, so callers can treat every (window, kind) pair alike.
//!
//! Key behaviors
//! -------------
//! - [`CalibrationEngine::calibrate`] dispatches on [`ModelKind`] and maps
//!   every [`ModelError`] to a [`SkipReason`] carrying its category.
//! - [`CalibrationEngine::forecast`] forwards to the owning model; failures
//!   are returned as [`SkipReason`] too.
//! - Outcomes are logged with `tracing`: `debug!` for fits, `warn!` for
//!   skips.
//!
//! Invariants & assumptions
//! ------------------------
//! - The engine holds configuration only and is shared read-only across
//!   evaluation workers.
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    models::{
        BedType, CalibrationStats, Diagnostic, ForecastResult, ModelError, ModelKind,
        OccupancyModel,
        causal::{CausalModel, FittedCausal},
        sarimax::{FittedSarimax, SarimaxModel},
    },
    series::{AlignedDataset, CalibrationWindow},
};

/// Why a calibration or forecast produced no result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipReason {
    pub kind: ModelKind,
    /// Stable tag from [`ModelError::category`].
    pub category: String,
    pub message: String,
}

impl SkipReason {
    pub fn from_error(kind: ModelKind, err: &ModelError) -> Self {
        Self { kind, category: err.category().to_string(), message: err.to_string() }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} skipped ({}): {}", self.kind, self.category, self.message)
    }
}

/// Fitted state of either strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum FittedModel {
    Causal(FittedCausal),
    Statistical(FittedSarimax),
}

impl FittedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            FittedModel::Causal(_) => ModelKind::Causal,
            FittedModel::Statistical(_) => ModelKind::Statistical,
        }
    }

    pub fn window(&self) -> CalibrationWindow {
        match self {
            FittedModel::Causal(f) => f.window,
            FittedModel::Statistical(f) => f.window,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            FittedModel::Causal(f) => &f.diagnostics,
            FittedModel::Statistical(f) => &f.diagnostics,
        }
    }

    pub fn calibration_stats(&self) -> CalibrationStats {
        match self {
            FittedModel::Causal(f) => CalibrationStats::Causal(f.stats.clone()),
            FittedModel::Statistical(f) => CalibrationStats::Sarimax(f.stats.clone()),
        }
    }
}

/// Tagged calibration outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Calibration {
    Fitted(Box<FittedModel>),
    Failed(SkipReason),
}

impl Calibration {
    pub fn is_fitted(&self) -> bool {
        matches!(self, Calibration::Fitted(_))
    }

    pub fn into_result(self) -> Result<FittedModel, SkipReason> {
        match self {
            Calibration::Fitted(f) => Ok(*f),
            Calibration::Failed(reason) => Err(reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationEngine {
    causal: CausalModel,
    sarimax: SarimaxModel,
    bed: BedType,
}

impl CalibrationEngine {
    pub fn new(causal: CausalModel, sarimax: SarimaxModel, bed: BedType) -> Self {
        Self { causal, sarimax, bed }
    }

    pub fn bed(&self) -> BedType {
        self.bed
    }

    /// Shortest window the given model accepts.
    pub fn min_window_days(&self, kind: ModelKind) -> usize {
        match kind {
            ModelKind::Causal => self.causal.min_window_days(),
            ModelKind::Statistical => self.sarimax.min_window_days(),
        }
    }

    /// Fit `kind` on `window`. Never fails; errors come back as
    /// [`Calibration::Failed`].
    pub fn calibrate(
        &self, kind: ModelKind, dataset: &AlignedDataset, window: &CalibrationWindow,
    ) -> Calibration {
        let fitted = match kind {
            ModelKind::Causal => {
                self.causal.fit(dataset, window, self.bed).map(FittedModel::Causal)
            }
            ModelKind::Statistical => {
                self.sarimax.fit(dataset, window, self.bed).map(FittedModel::Statistical)
            }
        };
        match fitted {
            Ok(model) => {
                debug!(
                    model = %kind,
                    start = %window.start,
                    reference = %window.end,
                    diagnostics = model.diagnostics().len(),
                    "calibrated"
                );
                Calibration::Fitted(Box::new(model))
            }
            Err(err) => {
                warn!(
                    model = %kind,
                    start = %window.start,
                    reference = %window.end,
                    category = err.category(),
                    error = %err,
                    "calibration skipped"
                );
                Calibration::Failed(SkipReason::from_error(kind, &err))
            }
        }
    }

    /// Forecast `horizon` days from a fitted model and future case counts.
    ///
    /// # Errors
    /// A [`SkipReason`] with category `configuration` when `future_cases`
    /// is shorter than `horizon`.
    pub fn forecast(
        &self, fitted: &FittedModel, future_cases: &[f64], horizon: usize,
    ) -> Result<ForecastResult, SkipReason> {
        let result = match fitted {
            FittedModel::Causal(f) => self.causal.forecast(f, future_cases, horizon),
            FittedModel::Statistical(f) => self.sarimax.forecast(f, future_cases, horizon),
        };
        result.map_err(|err| {
            warn!(model = %fitted.kind(), error = %err, "forecast skipped");
            SkipReason::from_error(fitted.kind(), &err)
        })
    }
}

impl Default for CalibrationEngine {
    fn default() -> Self {
        Self::new(CausalModel::default(), SarimaxModel::default(), BedType::Normal)
    }
}
