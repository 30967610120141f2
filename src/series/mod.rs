//! series — daily input streams, alignment and windows.
//!
//! Purpose
//! -------
//! In-memory store for the case, occupancy and release series that drive
//! both occupancy models. Everything downstream works on an
//! [`AlignedDataset`]: four gap-free [`DailySeries`] sharing one date index.
//!
//! Key behaviors
//! -------------
//! - Gap filling at construction ([`GapFill`]).
//! - [`align`] / [`slice`] as pure transformations with typed failures.
//! - CSV loading for the data-acquisition hand-off ([`loader`]).
//!
//! Invariants & assumptions
//! ------------------------
//! - Datasets are immutable once loaded for a run and shared read-only
//!   across parallel evaluations.
//!
//! Testing notes
//! -------------
//! - Unit tests cover each gap policy, alignment of offset ranges, the
//!   short-overlap failure, slicing bounds and CSV parsing.

pub mod daily;
pub mod dataset;
pub mod errors;
pub mod loader;

pub use self::daily::{DailySeries, GapFill};
pub use self::dataset::{AlignedDataset, BedType, CalibrationWindow, align, slice};
pub use self::errors::{SeriesError, SeriesResult};
pub use self::loader::{load_case_forecast, load_dataset};
