//! Gap-free daily series.
//!
//! Purpose
//! -------
//! Represent one daily observation stream (cases, occupancy, releases, or a
//! forecast) as a start date plus a contiguous vector of values. Gaps in the
//! raw input are filled explicitly at construction so that every downstream
//! routine can index by day offset without date arithmetic.
//!
//! Key behaviors
//! -------------
//! - [`DailySeries::new`] validates finiteness of an already contiguous
//!   vector.
//! - [`DailySeries::from_observations`] accepts sparse `(date, value)` pairs,
//!   rejects unordered or duplicate dates, trims leading and trailing gaps,
//!   and fills interior gaps according to [`GapFill`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Consecutive values are exactly one day apart; `date_at(i) = start + i`.
//! - All values are finite. Negative values are allowed here (a release or
//!   differenced series may dip below zero); occupancy-specific guards live
//!   in the models.
//!
//! Conventions
//! -----------
//! - An empty series is representable (a zero-day forecast), in which case
//!   `end()` is the day before `start`.
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::series::errors::{SeriesError, SeriesResult};

/// Policy for filling missing days inside a series.
///
/// - `CarryForward`: repeat the last observed value.
/// - `Zero`: insert zeros (appropriate for count series where "no report"
///   means "no events").
/// - `Linear`: interpolate between the neighbouring observations.
///
/// Only interior gaps are filled; a series never extends past its last
/// observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapFill {
    #[default]
    CarryForward,
    Zero,
    Linear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    start: NaiveDate,
    values: Vec<f64>,
}

impl DailySeries {
    /// Wrap a contiguous vector of daily values starting at `start`.
    ///
    /// # Errors
    /// [`SeriesError::NonFiniteValue`] for the first NaN/±inf entry.
    pub fn new(start: NaiveDate, values: Vec<f64>) -> SeriesResult<Self> {
        for (i, &value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(SeriesError::NonFiniteValue {
                    name: "series".to_string(),
                    date: offset(start, i),
                    value,
                });
            }
        }
        Ok(Self { start, values })
    }

    /// Build a contiguous series from sparse observations.
    ///
    /// `None` values and days absent from `observations` are gaps. Leading
    /// and trailing gaps are dropped, so the series runs from the first to
    /// the last observed value.
    ///
    /// # Errors
    /// - [`SeriesError::UnorderedDates`] if dates are not strictly increasing.
    /// - [`SeriesError::NonFiniteValue`] for an observed NaN/±inf.
    /// - [`SeriesError::EmptySeries`] if nothing was observed.
    pub fn from_observations(
        name: &str, observations: &[(NaiveDate, Option<f64>)], fill: GapFill,
    ) -> SeriesResult<Self> {
        for pair in observations.windows(2) {
            if pair[1].0 <= pair[0].0 {
                return Err(SeriesError::UnorderedDates {
                    name: name.to_string(),
                    previous: pair[0].0,
                    next: pair[1].0,
                });
            }
        }

        let Some(first) = observations.iter().position(|(_, v)| v.is_some()) else {
            return Err(SeriesError::EmptySeries { name: name.to_string() });
        };
        let start = observations[first].0;
        let last = observations.iter().rposition(|(_, v)| v.is_some()).unwrap_or(first);
        let last_date = observations[last].0;
        let len = (last_date - start).num_days() as usize + 1;

        let mut raw: Vec<Option<f64>> = vec![None; len];
        for &(date, value) in &observations[first..=last] {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(SeriesError::NonFiniteValue {
                        name: name.to_string(),
                        date,
                        value: v,
                    });
                }
            }
            raw[(date - start).num_days() as usize] = value;
        }

        Ok(Self { start, values: fill_gaps(&raw, fill) })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last covered day. For an empty series this is the day before `start`.
    pub fn end(&self) -> NaiveDate {
        if self.values.is_empty() {
            self.start - Days::new(1)
        } else {
            offset(self.start, self.values.len() - 1)
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn date_at(&self, index: usize) -> NaiveDate {
        offset(self.start, index)
    }

    /// Offset of `date` from the start, if covered.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        let days = (date - self.start).num_days();
        (days >= 0 && (days as usize) < self.values.len()).then_some(days as usize)
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.index_of(date).map(|i| self.values[i])
    }

    /// `(date, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.values.iter().enumerate().map(|(i, &v)| (offset(self.start, i), v))
    }

    /// Sub-series over the inclusive index range `[from, to]`.
    ///
    /// Callers check bounds; see [`crate::series::dataset::slice`].
    pub(crate) fn sub(&self, from: usize, to: usize) -> Self {
        Self { start: offset(self.start, from), values: self.values[from..=to].to_vec() }
    }
}

pub(crate) fn offset(start: NaiveDate, days: usize) -> NaiveDate {
    start + Days::new(days as u64)
}

fn fill_gaps(raw: &[Option<f64>], fill: GapFill) -> Vec<f64> {
    let mut out = Vec::with_capacity(raw.len());
    let mut last = 0.0;
    let mut i = 0;
    while i < raw.len() {
        if let Some(v) = raw[i] {
            out.push(v);
            last = v;
            i += 1;
            continue;
        }
        let gap_end = (i..raw.len()).find(|&j| raw[j].is_some());
        let stop = gap_end.unwrap_or(raw.len());
        for j in i..stop {
            let v = match (fill, gap_end) {
                (GapFill::Zero, _) => 0.0,
                (GapFill::Linear, Some(k)) => {
                    let right = raw[k].unwrap_or(last);
                    let w = (j - i + 1) as f64 / (k - i + 1) as f64;
                    last + w * (right - last)
                }
                _ => last,
            };
            out.push(v);
        }
        i = stop;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, d).expect("valid date")
    }

    #[test]
    // Purpose
    // -------
    // Each gap policy fills an interior two-day gap as documented.
    //
    // Given
    // -----
    // - Observations on days 1, 2 and 5 (days 3-4 missing), 2.0 then 8.0.
    //
    // Expect
    // ------
    // - CarryForward: 2, 2. Zero: 0, 0. Linear: 4, 6.
    fn from_observations_fills_interior_gaps_per_policy() {
        // Arrange
        let obs = vec![(day(1), Some(1.0)), (day(2), Some(2.0)), (day(5), Some(8.0))];

        // Act
        let carry = DailySeries::from_observations("x", &obs, GapFill::CarryForward)
            .expect("valid series");
        let zero = DailySeries::from_observations("x", &obs, GapFill::Zero).expect("valid series");
        let linear =
            DailySeries::from_observations("x", &obs, GapFill::Linear).expect("valid series");

        // Assert
        assert_eq!(carry.values(), &[1.0, 2.0, 2.0, 2.0, 8.0]);
        assert_eq!(zero.values(), &[1.0, 2.0, 0.0, 0.0, 8.0]);
        assert_abs_diff_eq!(linear.values()[2], 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(linear.values()[3], 6.0, epsilon = 1e-12);
        assert_eq!(carry.end(), day(5));
    }

    #[test]
    // Purpose
    // -------
    // No value is invented before the first or after the last report.
    //
    // Given
    // -----
    // - Day 1 missing, days 2-3 observed, days 4-5 explicitly missing, under
    //   every gap policy.
    //
    // Expect
    // ------
    // - Series runs from day 2 to day 3 with the observed values only.
    fn from_observations_trims_leading_and_trailing_gaps() {
        // Arrange
        let obs = vec![
            (day(1), None),
            (day(2), Some(3.0)),
            (day(3), Some(5.0)),
            (day(4), None),
            (day(5), None),
        ];

        for fill in [GapFill::CarryForward, GapFill::Zero, GapFill::Linear] {
            // Act
            let s = DailySeries::from_observations("x", &obs, fill).expect("valid series");

            // Assert
            assert_eq!(s.start(), day(2));
            assert_eq!(s.end(), day(3), "{fill:?}");
            assert_eq!(s.values(), &[3.0, 5.0]);
        }
    }

    #[test]
    fn from_observations_rejects_duplicates_and_all_missing() {
        let dup = vec![(day(2), Some(1.0)), (day(2), Some(2.0))];
        assert!(matches!(
            DailySeries::from_observations("x", &dup, GapFill::Zero),
            Err(SeriesError::UnorderedDates { .. })
        ));
        let none = vec![(day(2), None)];
        assert!(matches!(
            DailySeries::from_observations("x", &none, GapFill::Zero),
            Err(SeriesError::EmptySeries { .. })
        ));
        assert!(DailySeries::new(day(1), vec![1.0, f64::NAN]).is_err());
    }

    #[test]
    fn index_lookup_matches_date_arithmetic() {
        let s = DailySeries::new(day(10), vec![1.0, 2.0, 3.0]).expect("valid series");
        assert_eq!(s.index_of(day(12)), Some(2));
        assert_eq!(s.index_of(day(9)), None);
        assert_eq!(s.get(day(11)), Some(2.0));
        let empty = DailySeries::new(day(10), vec![]).expect("valid series");
        assert_eq!(empty.end(), day(9));
    }
}
