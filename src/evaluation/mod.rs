//! evaluation — walk-forward benchmarking of occupancy models.
//!
//! Purpose
//! -------
//! Measure how well each model forecasts occupancy when recalibrated on a
//! sliding historical window, and find the window length that minimizes
//! the forecast error for each model kind.
//!
//! Key behaviors
//! -------------
//! - [`metrics`]: MAPE (default), sMAPE, MAE and MASE, all finite on zero
//!   ground truth.
//! - [`walk_forward`]: the sweep, its records and the window-length
//!   summaries.
//!
//! Testing notes
//! -------------
//! - Unit tests pin the reference-date rule and metric edge cases; the
//!   end-to-end sweep is exercised by the integration tests.

pub mod errors;
pub mod metrics;
pub mod walk_forward;

pub use self::errors::{EvalError, EvalResult};
pub use self::metrics::{ErrorMetric, MetricSet};
pub use self::walk_forward::{
    CaseSource, CompletedEvaluation, EvaluationConfig, EvaluationRecord, Outcome,
    ScoredEvaluation, WalkForwardEvaluator, WindowScore, WindowSearchSummary,
};
