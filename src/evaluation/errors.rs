//! Run-level failures of a walk-forward evaluation.
//!
//! Per-unit failures never show up here; they become skipped
//! [`EvaluationRecord`](crate::evaluation::EvaluationRecord)s. An
//! [`EvalError`] aborts the whole run, before or after the sweep.
use crate::series::errors::SeriesError;

/// Result alias for evaluation runs.
pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Sweep parameters that cannot describe any evaluation.
    InvalidConfig { reason: String },

    /// Dataset-level problem detected before fitting.
    Dataset(SeriesError),

    /// Worker pool could not be created.
    ThreadPool { reason: String },

    /// The sweep finished without a single scored record.
    NothingScored { attempted: usize },
}

impl EvalError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        EvalError::InvalidConfig { reason: reason.into() }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvalError::Dataset(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::InvalidConfig { reason } => write!(f, "Invalid evaluation setup: {reason}"),
            EvalError::Dataset(e) => write!(f, "Dataset rejected: {e}"),
            EvalError::ThreadPool { reason } => write!(f, "Worker pool unavailable: {reason}"),
            EvalError::NothingScored { attempted } => {
                write!(f, "No evaluation was scored ({attempted} attempted)")
            }
        }
    }
}

impl From<SeriesError> for EvalError {
    fn from(err: SeriesError) -> Self {
        EvalError::Dataset(err)
    }
}
