//! models::causal — cascade model from cases to occupancy.
//!
//! Purpose
//! -------
//! Chain daily cases through an admission-delay kernel and a
//! length-of-stay kernel into net occupancy, calibrate the kernels and the
//! hospitalization rate on a window, and roll the cascade forward.
//!
//! Key behaviors
//! -------------
//! - [`kernels`]: discretized delay distributions (gamma by default,
//!   Poisson and truncated normal available).
//! - [`params`]: parameter value objects, search bounds and the θ mapping.
//! - [`cascade`]: convolutions and the clamped occupancy recurrence.
//! - [`model`]: profiled fit, grid-seeded L-BFGS search and forecasting.
//!
//! Testing notes
//! -------------
//! - Unit tests recover a synthetic cascade, check continuity at the
//!   reference date, the low-signal fallback and negative-occupancy clamping.

pub mod cascade;
pub mod kernels;
pub mod model;
pub mod params;

pub use self::kernels::{DistributionFamily, KernelSpec};
pub use self::model::{
    CausalConfig, CausalFitStats, CausalModel, FittedCausal, SimulatedCascade, simulate,
};
pub use self::params::{Bound, CascadeParameters, ParameterBounds};
