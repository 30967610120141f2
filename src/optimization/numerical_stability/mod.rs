//! numerical_stability — parameter transforms shared by the occupancy fits.
//!
//! Purpose
//! -------
//! Keep the mapping between unconstrained optimizer space and model space in
//! one place so both occupancy models share the same guards.
//!
//! Key behaviors
//! -------------
//! - A stable logistic transform for box-bounded parameters.
//! - A partial-autocorrelation map producing stationary AR coefficients;
//!   the statistical model also uses it, with a sign flip, for invertible MA
//!   polynomials.
//!
//! Conventions
//! -----------
//! - Pure functions on `f64`, no logging, no I/O.
//! - Inputs are assumed finite; upstream validation rejects non-finite `θ`.

pub mod transformations;

pub use self::transformations::{
    LOGIT_EPS, STATIONARITY_MARGIN, from_bounded, pacf_to_coefficients, safe_logistic,
    to_bounded,
};

pub mod prelude {
    pub use super::transformations::{
        STATIONARITY_MARGIN, from_bounded, pacf_to_coefficients, safe_logistic, to_bounded,
    };
}
