//! Aligned multi-series dataset and calibration windows.
//!
//! Purpose
//! -------
//! Join the four daily input streams (cases, normal-ward occupancy, ICU
//! occupancy, releases) on their common date range and cut sub-ranges out of
//! the result for calibration.
//!
//! Key behaviors
//! -------------
//! - [`align`] truncates every input to the intersection of their ranges and
//!   fails with [`SeriesError::InsufficientData`] when the intersection is
//!   empty or shorter than the configured minimum.
//! - [`slice`] extracts `[window.start, window.end]` and fails with
//!   [`SeriesError::OutOfRange`] if the window is not fully covered.
//!
//! Invariants & assumptions
//! ------------------------
//! - All four series in an [`AlignedDataset`] share `start` and `len`.
//! - Both operations are pure; slicing with the dataset's own range returns
//!   an equal dataset.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::series::{
    daily::DailySeries,
    errors::{SeriesError, SeriesResult},
};

/// Which occupancy series a model is fitted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedType {
    #[default]
    Normal,
    Icu,
}

impl std::fmt::Display for BedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BedType::Normal => write!(f, "normal"),
            BedType::Icu => write!(f, "icu"),
        }
    }
}

impl std::str::FromStr for BedType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(BedType::Normal),
            "icu" => Ok(BedType::Icu),
            other => Err(format!("unknown bed type '{other}', expected 'normal' or 'icu'")),
        }
    }
}

/// Inclusive date range `[start, end]` used to fit a model. `end` is the
/// reference date forecasts are made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalibrationWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CalibrationWindow {
    /// # Errors
    /// [`SeriesError::InvalidWindow`] unless `start < end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> SeriesResult<Self> {
        if start >= end {
            return Err(SeriesError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Number of days covered, both ends included.
    pub fn len_days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.end
    }
}

/// Four daily series sharing one date index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedDataset {
    pub cases: DailySeries,
    pub normal: DailySeries,
    pub icu: DailySeries,
    pub releases: DailySeries,
}

impl AlignedDataset {
    pub fn start(&self) -> NaiveDate {
        self.cases.start()
    }

    pub fn end(&self) -> NaiveDate {
        self.cases.end()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn occupancy(&self, bed: BedType) -> &DailySeries {
        match bed {
            BedType::Normal => &self.normal,
            BedType::Icu => &self.icu,
        }
    }

    pub fn date_at(&self, index: usize) -> NaiveDate {
        self.cases.date_at(index)
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.cases.index_of(date)
    }

    /// Inclusive index range of `window` inside this dataset.
    ///
    /// # Errors
    /// [`SeriesError::OutOfRange`] if either end is not covered.
    pub fn window_indices(&self, window: &CalibrationWindow) -> SeriesResult<(usize, usize)> {
        match (self.index_of(window.start), self.index_of(window.end)) {
            (Some(from), Some(to)) => Ok((from, to)),
            _ => Err(SeriesError::OutOfRange {
                requested_start: window.start,
                requested_end: window.end,
                available_start: self.start(),
                available_end: self.end(),
            }),
        }
    }

    /// Window of `length` days ending at `reference`. Errors if it would
    /// start before the dataset.
    pub fn window_ending_at(
        &self, reference: NaiveDate, length: usize,
    ) -> SeriesResult<CalibrationWindow> {
        let start = reference - chrono::Days::new(length.saturating_sub(1) as u64);
        let window = CalibrationWindow::new(start, reference)?;
        self.window_indices(&window)?;
        Ok(window)
    }
}

/// Truncate four series to their common date range.
///
/// # Errors
/// [`SeriesError::InsufficientData`] if the overlap is empty or shorter than
/// `min_days`.
pub fn align(
    cases: &DailySeries, normal: &DailySeries, icu: &DailySeries, releases: &DailySeries,
    min_days: usize,
) -> SeriesResult<AlignedDataset> {
    let inputs = [cases, normal, icu, releases];
    let start = inputs.iter().map(|s| s.start()).max().unwrap_or(cases.start());
    let end = inputs.iter().map(|s| s.end()).min().unwrap_or(cases.end());

    let available =
        if end >= start { (end - start).num_days() as usize + 1 } else { 0 };
    if available == 0 || available < min_days {
        return Err(SeriesError::InsufficientData { available, required: min_days.max(1) });
    }

    let cut = |s: &DailySeries| -> SeriesResult<DailySeries> {
        match (s.index_of(start), s.index_of(end)) {
            (Some(from), Some(to)) => Ok(s.sub(from, to)),
            _ => Err(SeriesError::InsufficientData { available: 0, required: min_days.max(1) }),
        }
    };
    Ok(AlignedDataset {
        cases: cut(cases)?,
        normal: cut(normal)?,
        icu: cut(icu)?,
        releases: cut(releases)?,
    })
}

/// Extract `[window.start, window.end]` from `dataset`.
///
/// # Errors
/// [`SeriesError::OutOfRange`] if the window is not fully covered.
pub fn slice(dataset: &AlignedDataset, window: &CalibrationWindow) -> SeriesResult<AlignedDataset> {
    let (from, to) = dataset.window_indices(window)?;
    Ok(AlignedDataset {
        cases: dataset.cases.sub(from, to),
        normal: dataset.normal.sub(from, to),
        icu: dataset.icu.sub(from, to),
        releases: dataset.releases.sub(from, to),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 10, d).expect("valid date")
    }

    fn ramp(start: NaiveDate, len: usize) -> DailySeries {
        DailySeries::new(start, (0..len).map(|i| i as f64).collect()).expect("valid series")
    }

    #[test]
    // Purpose
    // -------
    // `align` keeps only the overlap and `slice` over the full aligned range
    // is the identity.
    //
    // Given
    // -----
    // - Four series starting on days 1, 3, 2, 1 and ending on 30, 28, 30, 29.
    //
    // Expect
    // ------
    // - Aligned range [3, 28] (26 days), values re-indexed consistently.
    // - slice(aligned, [3, 28]) == aligned.
    fn align_intersects_ranges_and_full_slice_is_identity() {
        // Arrange
        let cases = ramp(day(1), 30);
        let normal = ramp(day(3), 26);
        let icu = ramp(day(2), 29);
        let releases = ramp(day(1), 29);

        // Act
        let aligned = align(&cases, &normal, &icu, &releases, 14).expect("overlap is long enough");
        let window = CalibrationWindow::new(aligned.start(), aligned.end()).expect("valid window");
        let sliced = slice(&aligned, &window).expect("window inside dataset");

        // Assert
        assert_eq!(aligned.start(), day(3));
        assert_eq!(aligned.end(), day(28));
        assert_eq!(aligned.len(), 26);
        assert_eq!(aligned.cases.values()[0], 2.0);
        assert_eq!(aligned.icu.values()[0], 1.0);
        assert_eq!(sliced, aligned);
    }

    #[test]
    // Purpose
    // -------
    // Five overlapping days against a minimum of fourteen is a dataset-level
    // failure.
    //
    // Given
    // -----
    // - Series overlapping on exactly 5 days.
    //
    // Expect
    // ------
    // - `InsufficientData { available: 5, required: 14 }`.
    fn align_rejects_short_overlap() {
        // Arrange
        let a = ramp(day(1), 10);
        let b = ramp(day(6), 10);

        // Act
        let err = align(&a, &b, &a, &a, 14).expect_err("overlap too short");

        // Assert
        assert_eq!(err, SeriesError::InsufficientData { available: 5, required: 14 });
    }

    #[test]
    fn align_rejects_disjoint_ranges() {
        let a = ramp(day(1), 5);
        let b = ramp(day(10), 5);
        assert!(matches!(
            align(&a, &b, &a, &a, 1),
            Err(SeriesError::InsufficientData { available: 0, .. })
        ));
    }

    #[test]
    fn slice_rejects_window_outside_dataset() {
        let a = ramp(day(1), 10);
        let aligned = align(&a, &a, &a, &a, 1).expect("aligned");
        let window = CalibrationWindow::new(day(5), day(12)).expect("valid window");
        assert!(matches!(slice(&aligned, &window), Err(SeriesError::OutOfRange { .. })));
        assert!(CalibrationWindow::new(day(5), day(5)).is_err());
        assert_eq!(CalibrationWindow::new(day(1), day(7)).map(|w| w.len_days()), Ok(7));
    }
}
