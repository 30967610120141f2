//! Errors for daily series construction, alignment, slicing and loading.
//!
//! Every fallible operation in [`crate::series`] returns [`SeriesResult<T>`].
//! Dataset-level failures (no usable overlap) are meant to abort a run
//! before any fitting starts; slicing failures are per-call.
use chrono::NaiveDate;

/// Result alias for series operations.
pub type SeriesResult<T> = Result<T, SeriesError>;

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesError {
    // ---- Construction ----
    /// Series has no observed values after trimming leading gaps.
    EmptySeries { name: String },

    /// A value is NaN or ±inf.
    NonFiniteValue { name: String, date: NaiveDate, value: f64 },

    /// Observation dates are not strictly increasing.
    UnorderedDates { name: String, previous: NaiveDate, next: NaiveDate },

    // ---- Alignment / slicing ----
    /// Common date range is empty or shorter than the configured minimum.
    InsufficientData { available: usize, required: usize },

    /// Requested window is not contained in the dataset.
    OutOfRange {
        requested_start: NaiveDate,
        requested_end: NaiveDate,
        available_start: NaiveDate,
        available_end: NaiveDate,
    },

    /// Window bounds violate `start < end`.
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    /// Parallel series in a dataset do not share a length.
    LengthMismatch { name: String, expected: usize, found: usize },

    // ---- Loading ----
    /// Input file could not be read or parsed.
    Load { path: String, reason: String },
}

impl std::error::Error for SeriesError {}

impl std::fmt::Display for SeriesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesError::EmptySeries { name } => {
                write!(f, "Series '{name}' contains no observations")
            }
            SeriesError::NonFiniteValue { name, date, value } => {
                write!(f, "Series '{name}' has non-finite value {value} on {date}")
            }
            SeriesError::UnorderedDates { name, previous, next } => {
                write!(f, "Series '{name}' dates not strictly increasing: {previous} then {next}")
            }
            SeriesError::InsufficientData { available, required } => {
                write!(
                    f,
                    "Insufficient data: {available} overlapping days, at least {required} required"
                )
            }
            SeriesError::OutOfRange {
                requested_start,
                requested_end,
                available_start,
                available_end,
            } => {
                write!(
                    f,
                    "Window [{requested_start}, {requested_end}] outside dataset range \
                     [{available_start}, {available_end}]"
                )
            }
            SeriesError::InvalidWindow { start, end } => {
                write!(f, "Invalid calibration window [{start}, {end}]: start must precede end")
            }
            SeriesError::LengthMismatch { name, expected, found } => {
                write!(f, "Series '{name}' has length {found}, expected {expected}")
            }
            SeriesError::Load { path, reason } => {
                write!(f, "Failed to load '{path}': {reason}")
            }
        }
    }
}
