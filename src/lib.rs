//! occupancy_forecast — hospital and ICU occupancy forecasting from case counts.
//!
//! Purpose
//! -------
//! Forecast daily bed occupancy a few days ahead from reported cases with two
//! interchangeable strategies, and benchmark them by walk-forward evaluation
//! to find the calibration window length that forecasts best.
//!
//! Key behaviors
//! -------------
//! - [`series`]: gap-free daily series, dataset alignment and CSV loading.
//! - [`models`]: the [`models::OccupancyModel`] capability and its two
//!   strategies, a case → admission → release cascade and a SARIMAX
//!   regression on smoothed cases.
//! - [`calibration`]: fit a chosen strategy on a window and roll it forward,
//!   turning model failures into structured skip reasons.
//! - [`evaluation`]: walk-forward sweep over window lengths, reference dates
//!   and model kinds with per-kind window-length summaries.
//! - [`report`]: JSON and CSV result sets for offline analysis.
//! - [`optimization`]: argmin-backed L-BFGS maximization of log-likelihoods
//!   shared by both strategies.
//! - [`config`]: TOML experiment configuration.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are daily; every series in a dataset covers the same dates.
//! - Fitting never mutates a model; fitted state is a separate value, so one
//!   engine is shared read-only across evaluation workers.
//!
//! Conventions
//! -----------
//! - Library code reports failures through typed errors; only the
//!   `occupancy-bench` binary converts them into `anyhow` reports.

pub mod calibration;
pub mod config;
pub mod evaluation;
pub mod models;
pub mod optimization;
pub mod report;
pub mod series;
