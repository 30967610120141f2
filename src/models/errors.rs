//! Error taxonomy shared by both occupancy models.
//!
//! [`ModelError`] is the per-unit failure surface: every variant is fatal
//! for one fit or forecast call and never for a whole evaluation sweep.
//! Non-fatal conditions are not errors; they travel as
//! [`Diagnostic`](crate::models::Diagnostic) values on successful results.
use crate::{optimization::errors::OptError, series::errors::SeriesError};

/// Result alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Window or history too short for the requested model.
    InsufficientData { available: usize, required: usize },

    /// Window or horizon not covered by the dataset.
    OutOfRange { detail: String },

    /// Optimizer failed, hit its iteration or time budget, or produced a
    /// non-stationary / non-invertible fit.
    FitDivergence { reason: String },

    /// Malformed parameters, e.g. fewer future case values than the horizon.
    Configuration { reason: String },
}

impl ModelError {
    /// Stable snake_case tag used in persisted skip reasons.
    pub fn category(&self) -> &'static str {
        match self {
            ModelError::InsufficientData { .. } => "insufficient_data",
            ModelError::OutOfRange { .. } => "out_of_range",
            ModelError::FitDivergence { .. } => "fit_divergence",
            ModelError::Configuration { .. } => "configuration",
        }
    }

    pub(crate) fn divergence(reason: impl Into<String>) -> Self {
        ModelError::FitDivergence { reason: reason.into() }
    }

    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        ModelError::Configuration { reason: reason.into() }
    }
}

impl std::error::Error for ModelError {}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::InsufficientData { available, required } => {
                write!(f, "Insufficient data: {available} days available, {required} required")
            }
            ModelError::OutOfRange { detail } => write!(f, "Out of range: {detail}"),
            ModelError::FitDivergence { reason } => write!(f, "Fit diverged: {reason}"),
            ModelError::Configuration { reason } => write!(f, "Configuration error: {reason}"),
        }
    }
}

impl From<OptError> for ModelError {
    fn from(err: OptError) -> Self {
        ModelError::FitDivergence { reason: err.to_string() }
    }
}

impl From<SeriesError> for ModelError {
    fn from(err: SeriesError) -> Self {
        match err {
            SeriesError::InsufficientData { available, required } => {
                ModelError::InsufficientData { available, required }
            }
            SeriesError::OutOfRange { .. } | SeriesError::InvalidWindow { .. } => {
                ModelError::OutOfRange { detail: err.to_string() }
            }
            other => ModelError::Configuration { reason: other.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimizer_failures_become_divergence() {
        let err = ModelError::from(OptError::MissingThetaHat);
        assert_eq!(err.category(), "fit_divergence");
    }

    #[test]
    fn series_range_failures_keep_their_category() {
        let err = ModelError::from(SeriesError::InsufficientData { available: 5, required: 14 });
        assert_eq!(err, ModelError::InsufficientData { available: 5, required: 14 });
    }
}
