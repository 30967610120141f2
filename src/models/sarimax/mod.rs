//! sarimax — regression on smoothed cases with seasonal ARIMA errors.
//!
//! Purpose
//! -------
//! Provide the statistical baseline for occupancy forecasting: a SARIMAX
//! model whose single exogenous regressor is a trailing mean of daily case
//! counts, with the order chosen by AIC over a configurable grid.
//!
//! Key behaviors
//! -------------
//! - [`order`]: orders, grids and selection modes.
//! - [`polynomial`]: lag-polynomial products, differencing and its inverse,
//!   ψ-weights and companion-matrix root checks.
//! - `likelihood`: concentrated conditional sum-of-squares objective with
//!   stationarity and invertibility enforced by reparameterization.
//! - [`model`]: [`SarimaxModel`], the [`OccupancyModel`](crate::models::OccupancyModel)
//!   implementation.
mod likelihood;
pub mod model;
pub mod order;
pub mod polynomial;

pub use self::model::{
    FittedSarimax, SarimaxCoefficients, SarimaxConfig, SarimaxFitStats, SarimaxModel,
};
pub use self::order::{OrderGrid, OrderSelection, SarimaxOrder};
