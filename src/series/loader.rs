//! CSV ingestion for the daily inputs.
//!
//! The data acquisition stage writes one file with header
//! `date,cases,normal,icu,releases`; dates are ISO `YYYY-MM-DD`, blank cells
//! are gaps. Externally forecast case numbers arrive in a two-column
//! `date,cases` file.
use std::{fs::File, io::Read, path::Path};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::series::{
    daily::{DailySeries, GapFill},
    dataset::{AlignedDataset, align},
    errors::{SeriesError, SeriesResult},
};

#[derive(Debug, Deserialize)]
struct DatasetRow {
    date: NaiveDate,
    cases: Option<f64>,
    normal: Option<f64>,
    icu: Option<f64>,
    releases: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CaseRow {
    date: NaiveDate,
    cases: Option<f64>,
}

/// Load and align the four input series from a CSV file.
///
/// # Errors
/// - [`SeriesError::Load`] when the file cannot be opened or a row fails to
///   parse.
/// - Any construction or alignment error from the series layer.
pub fn load_dataset(path: &Path, fill: GapFill, min_days: usize) -> SeriesResult<AlignedDataset> {
    let file = File::open(path).map_err(|e| load_error(path, e))?;
    read_dataset(file, fill, min_days).map_err(|e| relabel(e, path))
}

/// [`load_dataset`] over any reader.
pub fn read_dataset<R: Read>(
    reader: R, fill: GapFill, min_days: usize,
) -> SeriesResult<AlignedDataset> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows: Vec<DatasetRow> = Vec::new();
    for record in rdr.deserialize() {
        rows.push(record.map_err(|e| SeriesError::Load {
            path: "<reader>".to_string(),
            reason: e.to_string(),
        })?);
    }

    let column = |pick: fn(&DatasetRow) -> Option<f64>| -> Vec<(NaiveDate, Option<f64>)> {
        rows.iter().map(|r| (r.date, pick(r))).collect()
    };
    let cases = DailySeries::from_observations("cases", &column(|r| r.cases), fill)?;
    let normal = DailySeries::from_observations("normal", &column(|r| r.normal), fill)?;
    let icu = DailySeries::from_observations("icu", &column(|r| r.icu), fill)?;
    let releases = DailySeries::from_observations("releases", &column(|r| r.releases), fill)?;
    align(&cases, &normal, &icu, &releases, min_days)
}

/// Load an external case forecast (`date,cases`).
pub fn load_case_forecast(path: &Path, fill: GapFill) -> SeriesResult<DailySeries> {
    let file = File::open(path).map_err(|e| load_error(path, e))?;
    read_case_forecast(file, fill).map_err(|e| relabel(e, path))
}

pub fn read_case_forecast<R: Read>(reader: R, fill: GapFill) -> SeriesResult<DailySeries> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut obs = Vec::new();
    for record in rdr.deserialize::<CaseRow>() {
        let row = record.map_err(|e| SeriesError::Load {
            path: "<reader>".to_string(),
            reason: e.to_string(),
        })?;
        obs.push((row.date, row.cases));
    }
    DailySeries::from_observations("predicted_cases", &obs, fill)
}

fn load_error(path: &Path, e: impl std::fmt::Display) -> SeriesError {
    SeriesError::Load { path: path.display().to_string(), reason: e.to_string() }
}

fn relabel(err: SeriesError, path: &Path) -> SeriesError {
    match err {
        SeriesError::Load { reason, .. } => load_error(path, reason),
        other => other,
    }
}
