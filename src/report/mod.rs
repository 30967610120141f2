//! report — persisted benchmark results.
//!
//! Purpose
//! -------
//! Turn a [`CompletedEvaluation`], or bare records plus the sweep settings,
//! into a [`StructuredResultSet`] that can be
//! re-analyzed offline without the crate: every record with all metrics,
//! series, diagnostics and calibration statistics, plus run metadata and
//! the per-kind window-length summaries.
//!
//! Key behaviors
//! -------------
//! - JSON is the lossless format; [`BenchmarkReporter::read_json`] restores
//!   exactly what [`BenchmarkReporter::write_json`] wrote.
//! - CSV is a flat one-row-per-record view for spreadsheets; series and
//!   diagnostics are embedded as JSON strings.
//!
//! Conventions
//! -----------
//! - The reporter never aggregates beyond the summaries already computed by
//!   the evaluator.
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    evaluation::{
        CompletedEvaluation, ErrorMetric, EvaluationConfig, EvaluationRecord, Outcome,
        WindowSearchSummary,
    },
    models::ModelKind,
    series::BedType,
};

/// Result alias for report I/O.
pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ReportError {
    Io { path: String, reason: String },
    Json { reason: String },
    Csv { reason: String },
}

impl std::error::Error for ReportError {}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Io { path, reason } => write!(f, "I/O error on '{path}': {reason}"),
            ReportError::Json { reason } => write!(f, "JSON error: {reason}"),
            ReportError::Csv { reason } => write!(f, "CSV error: {reason}"),
        }
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        ReportError::Json { reason: err.to_string() }
    }
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        ReportError::Csv { reason: err.to_string() }
    }
}

/// Run context stored with the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub crate_version: String,
    pub created_at: DateTime<Utc>,
    pub bed: BedType,
    pub horizon: usize,
    pub step: usize,
    pub metric: ErrorMetric,
    pub window_lengths: Vec<usize>,
    pub model_kinds: Vec<ModelKind>,
    pub reference_dates: Vec<NaiveDate>,
    pub scored: usize,
    pub skipped: usize,
}

/// Everything a benchmark run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredResultSet {
    pub metadata: ResultMetadata,
    pub records: Vec<EvaluationRecord>,
    pub summary: Vec<WindowSearchSummary>,
}

fn assemble(
    bed: BedType, config: &EvaluationConfig, reference_dates: Vec<NaiveDate>,
    records: Vec<EvaluationRecord>, summary: Vec<WindowSearchSummary>,
) -> StructuredResultSet {
    let scored = records.iter().filter(|r| r.is_scored()).count();
    StructuredResultSet {
        metadata: ResultMetadata {
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            bed,
            horizon: config.horizon,
            step: config.step,
            metric: config.metric,
            window_lengths: config.window_lengths.clone(),
            model_kinds: config.model_kinds.clone(),
            reference_dates,
            scored,
            skipped: records.len() - scored,
        },
        records,
        summary,
    }
}

/// Flat CSV row.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    window_length: usize,
    reference_date: NaiveDate,
    model_kind: ModelKind,
    horizon: usize,
    metric: ErrorMetric,
    status: &'static str,
    value: Option<f64>,
    mape: Option<f64>,
    smape: Option<f64>,
    mae: Option<f64>,
    mase: Option<f64>,
    skip_category: Option<&'a str>,
    skip_message: Option<&'a str>,
    actual: Option<String>,
    predicted: Option<String>,
    diagnostics: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BenchmarkReporter {
    pretty: bool,
}

impl BenchmarkReporter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Package a finished evaluation with its metadata.
    pub fn export(&self, evaluation: &CompletedEvaluation) -> StructuredResultSet {
        assemble(
            evaluation.bed,
            &evaluation.config,
            evaluation.reference_dates.clone(),
            evaluation.records().to_vec(),
            evaluation.summaries().to_vec(),
        )
    }

    /// Package records gathered outside a [`CompletedEvaluation`], e.g.
    /// merged from several runs. Summaries are recomputed for every kind in
    /// `config.model_kinds` and reference dates are taken from the records.
    pub fn export_records(
        &self, bed: BedType, config: &EvaluationConfig, records: Vec<EvaluationRecord>,
    ) -> StructuredResultSet {
        let summary = config
            .model_kinds
            .iter()
            .map(|&kind| WindowSearchSummary::from_records(kind, &config.window_lengths, &records))
            .collect();
        let mut reference_dates: Vec<NaiveDate> =
            records.iter().map(|r| r.reference_date).collect();
        reference_dates.sort_unstable();
        reference_dates.dedup();
        assemble(bed, config, reference_dates, records, summary)
    }

    /// # Errors
    /// [`ReportError::Json`] on serialization or write failure.
    pub fn write_json<W: Write>(&self, set: &StructuredResultSet, writer: W) -> ReportResult<()> {
        if self.pretty {
            serde_json::to_writer_pretty(writer, set)?;
        } else {
            serde_json::to_writer(writer, set)?;
        }
        Ok(())
    }

    /// # Errors
    /// [`ReportError::Json`] if the input is not a result set.
    pub fn read_json<R: Read>(reader: R) -> ReportResult<StructuredResultSet> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// # Errors
    /// [`ReportError::Csv`] on serialization or write failure.
    pub fn write_csv<W: Write>(&self, set: &StructuredResultSet, writer: W) -> ReportResult<()> {
        let mut out = csv::Writer::from_writer(writer);
        for record in &set.records {
            let diagnostics = serde_json::to_string(record.diagnostics())?;
            let base = CsvRow {
                window_length: record.window_length,
                reference_date: record.reference_date,
                model_kind: record.model_kind,
                horizon: record.horizon,
                metric: record.metric,
                status: "skipped",
                value: None,
                mape: None,
                smape: None,
                mae: None,
                mase: None,
                skip_category: None,
                skip_message: None,
                actual: None,
                predicted: None,
                diagnostics,
            };
            let row = match &record.outcome {
                Outcome::Scored(s) => CsvRow {
                    status: "scored",
                    value: Some(s.value),
                    mape: Some(s.metrics.mape),
                    smape: Some(s.metrics.smape),
                    mae: Some(s.metrics.mae),
                    mase: Some(s.metrics.mase),
                    actual: Some(serde_json::to_string(&s.actual)?),
                    predicted: Some(serde_json::to_string(&s.predicted)?),
                    ..base
                },
                Outcome::Skipped { reason, .. } => CsvRow {
                    skip_category: Some(&reason.category),
                    skip_message: Some(&reason.message),
                    ..base
                },
            };
            out.serialize(row)?;
        }
        out.flush().map_err(|e| ReportError::Csv { reason: e.to_string() })?;
        Ok(())
    }

    /// Write JSON to `path`, creating or truncating it.
    ///
    /// # Errors
    /// [`ReportError::Io`] if the file cannot be created, otherwise as
    /// [`write_json`](Self::write_json).
    pub fn save_json(&self, set: &StructuredResultSet, path: &Path) -> ReportResult<()> {
        let mut writer = BufWriter::new(create(path)?);
        self.write_json(set, &mut writer)?;
        writer.flush().map_err(|e| io_error(path, e))
    }

    /// # Errors
    /// [`ReportError::Io`] if the file cannot be opened, otherwise as
    /// [`read_json`](Self::read_json).
    pub fn load_json(path: &Path) -> ReportResult<StructuredResultSet> {
        let file = File::open(path).map_err(|e| io_error(path, e))?;
        Self::read_json(BufReader::new(file))
    }

    /// # Errors
    /// As [`save_json`](Self::save_json), for CSV.
    pub fn save_csv(&self, set: &StructuredResultSet, path: &Path) -> ReportResult<()> {
        self.write_csv(set, BufWriter::new(create(path)?))
    }
}

fn io_error(path: &Path, err: std::io::Error) -> ReportError {
    ReportError::Io { path: path.display().to_string(), reason: err.to_string() }
}

fn create(path: &Path) -> ReportResult<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    File::create(path).map_err(|e| io_error(path, e))
}
