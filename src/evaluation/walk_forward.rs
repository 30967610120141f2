//! Walk-forward evaluation and window-length search.
//!
//! Purpose
//! -------
//! Sweep (window length × reference date × model kind), calibrating on the
//! window ending at each reference date, forecasting `horizon` days and
//! scoring against observed occupancy.
//!
//! Key behaviors
//! -------------
//! - Lifecycle: a [`WalkForwardEvaluator`] is *configured*; [`run`] consumes
//!   it while *running* the sweep; the returned [`CompletedEvaluation`] is
//!   the *complete* state exposing records and per-kind summaries.
//! - A window of length `L > 0` ending at index `r` needs one observed day
//!   before it (`r ≥ L`) and `horizon` days of truth after it
//!   (`r + horizon ≤ n − 1`). Length `0` means all history up to `r`, with
//!   `r ≥ full_history_min_days`.
//! - Reference dates step by `step` from the first admissible index, or come
//!   from an explicit list; inadmissible explicit dates are dropped with a
//!   log line and produce no record.
//! - Units run on a dedicated `rayon` pool; records are sorted by
//!   (window length, reference date, model kind) afterwards.
//!
//! Invariants & assumptions
//! ------------------------
//! - Exactly one record per executed unit, scored or skipped; no unit
//!   failure aborts the sweep.
//! - Metric values are always finite.
//!
//! [`run`]: WalkForwardEvaluator::run
use chrono::{Days, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    calibration::{CalibrationEngine, SkipReason},
    evaluation::{
        errors::{EvalError, EvalResult},
        metrics::{ErrorMetric, MetricSet},
    },
    models::{CalibrationStats, Diagnostic, ModelError, ModelKind},
    series::{AlignedDataset, BedType, CalibrationWindow, DailySeries},
};

/// Where future case counts come from when forecasting.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CaseSource {
    /// Observed cases after the reference date (perfect-foresight
    /// benchmark).
    #[default]
    Observed,
    /// Case forecast produced elsewhere; days it does not cover make the
    /// unit a configuration skip.
    External(DailySeries),
}

/// Sweep parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationConfig {
    /// Candidate window lengths in days; `0` means full history.
    pub window_lengths: Vec<usize>,
    pub horizon: usize,
    /// Days between successive reference dates.
    pub step: usize,
    pub metric: ErrorMetric,
    pub model_kinds: Vec<ModelKind>,
    /// Explicit reference dates; overrides stepping when set.
    pub reference_dates: Option<Vec<NaiveDate>>,
    /// Inclusive bounds applied to stepped reference dates.
    pub first_reference: Option<NaiveDate>,
    pub last_reference: Option<NaiveDate>,
    /// Earliest reference index for full-history windows.
    pub full_history_min_days: usize,
    /// Worker threads; `0` lets rayon decide, `1` runs on the caller.
    pub workers: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            window_lengths: vec![14, 30, 60],
            horizon: 7,
            step: 1,
            metric: ErrorMetric::default(),
            model_kinds: ModelKind::ALL.to_vec(),
            reference_dates: None,
            first_reference: None,
            last_reference: None,
            full_history_min_days: 14,
            workers: 0,
        }
    }
}

/// Successful evaluation of one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEvaluation {
    /// Value of the configured metric.
    pub value: f64,
    pub metrics: MetricSet,
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
    /// `predicted − actual` per day.
    pub difference: Vec<f64>,
    pub lower: Option<Vec<f64>>,
    pub upper: Option<Vec<f64>>,
    pub diagnostics: Vec<Diagnostic>,
    pub calibration_stats: CalibrationStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Scored(Box<ScoredEvaluation>),
    Skipped { reason: SkipReason, diagnostics: Vec<Diagnostic> },
}

/// One (window length, reference date, model kind) unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub window_length: usize,
    pub reference_date: NaiveDate,
    pub model_kind: ModelKind,
    pub horizon: usize,
    pub metric: ErrorMetric,
    pub outcome: Outcome,
}

impl EvaluationRecord {
    pub fn is_scored(&self) -> bool {
        matches!(self.outcome, Outcome::Scored(_))
    }

    /// Configured metric value, if scored.
    pub fn value(&self) -> Option<f64> {
        match &self.outcome {
            Outcome::Scored(s) => Some(s.value),
            Outcome::Skipped { .. } => None,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match &self.outcome {
            Outcome::Scored(s) => &s.diagnostics,
            Outcome::Skipped { diagnostics, .. } => diagnostics,
        }
    }
}

/// Aggregate for one window length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowScore {
    pub window_length: usize,
    /// Mean of the configured metric over scored records.
    pub mean_error: Option<f64>,
    pub scored: usize,
    pub skipped: usize,
}

/// Window-length search result for one model kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSearchSummary {
    pub model_kind: ModelKind,
    pub windows: Vec<WindowScore>,
    pub best_window: Option<usize>,
    pub best_mean_error: Option<f64>,
}

impl WindowSearchSummary {
    /// Summarize `records` for `kind` over `window_lengths`. The best window
    /// has the lowest mean error; ties go to the shorter window, with the
    /// full-history window counting as the longest.
    pub fn from_records(
        kind: ModelKind, window_lengths: &[usize], records: &[EvaluationRecord],
    ) -> Self {
        let windows: Vec<WindowScore> = window_lengths
            .iter()
            .map(|&window_length| {
                let mine = records
                    .iter()
                    .filter(|r| r.model_kind == kind && r.window_length == window_length);
                let (mut sum, mut scored, mut skipped) = (0.0, 0, 0);
                for record in mine {
                    match record.value() {
                        Some(v) => {
                            sum += v;
                            scored += 1;
                        }
                        None => skipped += 1,
                    }
                }
                let mean_error = (scored > 0).then(|| sum / scored as f64);
                WindowScore { window_length, mean_error, scored, skipped }
            })
            .collect();
        let length_key = |l: usize| if l == 0 { usize::MAX } else { l };
        let best = windows
            .iter()
            .filter_map(|w| w.mean_error.map(|m| (w.window_length, m)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(length_key(a.0).cmp(&length_key(b.0))));
        Self {
            model_kind: kind,
            windows,
            best_window: best.map(|b| b.0),
            best_mean_error: best.map(|b| b.1),
        }
    }
}

/// Configured walk-forward sweep over one dataset.
#[derive(Debug, Clone)]
pub struct WalkForwardEvaluator {
    dataset: AlignedDataset,
    engine: CalibrationEngine,
    config: EvaluationConfig,
    cases: CaseSource,
}

/// Finished sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedEvaluation {
    pub config: EvaluationConfig,
    pub bed: BedType,
    pub reference_dates: Vec<NaiveDate>,
    records: Vec<EvaluationRecord>,
    summaries: Vec<WindowSearchSummary>,
}

impl CompletedEvaluation {
    pub fn records(&self) -> &[EvaluationRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<EvaluationRecord> {
        self.records
    }

    pub fn summaries(&self) -> &[WindowSearchSummary] {
        &self.summaries
    }

    pub fn summary_for(&self, kind: ModelKind) -> Option<&WindowSearchSummary> {
        self.summaries.iter().find(|s| s.model_kind == kind)
    }

    pub fn scored_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_scored()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.records.len() - self.scored_count()
    }

    /// # Errors
    /// [`EvalError::NothingScored`] if no record was scored.
    pub fn ensure_any_scored(&self) -> EvalResult<()> {
        if self.scored_count() == 0 {
            return Err(EvalError::NothingScored { attempted: self.records.len() });
        }
        Ok(())
    }
}

/// One unit of work.
#[derive(Debug, Clone, Copy)]
struct Unit {
    window_length: usize,
    reference: usize,
    kind: ModelKind,
}

impl WalkForwardEvaluator {
    /// # Errors
    /// [`EvalError::InvalidConfig`] for an empty window, kind or explicit
    /// date list, zero horizon or zero step.
    pub fn new(
        dataset: AlignedDataset, engine: CalibrationEngine, config: EvaluationConfig,
    ) -> EvalResult<Self> {
        if config.window_lengths.is_empty() {
            return Err(EvalError::config("no candidate window lengths"));
        }
        if config.model_kinds.is_empty() {
            return Err(EvalError::config("no model kinds selected"));
        }
        if config.horizon == 0 || config.step == 0 {
            return Err(EvalError::config("horizon and step must be at least one day"));
        }
        if config.reference_dates.as_ref().is_some_and(Vec::is_empty) {
            return Err(EvalError::config("explicit reference date list is empty"));
        }
        if let (Some(first), Some(last)) = (config.first_reference, config.last_reference) {
            if first > last {
                return Err(EvalError::config(format!(
                    "reference range is reversed: {first} > {last}"
                )));
            }
        }
        let mut config = config;
        config.window_lengths.sort_unstable();
        config.window_lengths.dedup();
        config.model_kinds.sort_unstable();
        config.model_kinds.dedup();
        Ok(Self { dataset, engine, config, cases: CaseSource::Observed })
    }

    /// Forecast from an external case series instead of observed cases.
    pub fn with_case_source(mut self, cases: CaseSource) -> Self {
        self.cases = cases;
        self
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    fn first_reference_index(&self, window_length: usize) -> usize {
        if window_length == 0 { self.config.full_history_min_days } else { window_length }
    }

    fn admissible(&self, window_length: usize, reference: usize) -> bool {
        reference >= self.first_reference_index(window_length)
            && reference + self.config.horizon < self.dataset.len()
    }

    fn in_range(&self, date: NaiveDate) -> bool {
        self.config.first_reference.is_none_or(|f| date >= f)
            && self.config.last_reference.is_none_or(|l| date <= l)
    }

    /// Reference indices for one window length.
    fn references(&self, window_length: usize) -> Vec<usize> {
        match &self.config.reference_dates {
            Some(dates) => dates
                .iter()
                .filter_map(|&date| {
                    let index = self.dataset.index_of(date);
                    match index {
                        Some(r) if self.admissible(window_length, r) => Some(r),
                        _ => {
                            debug!(
                                reference = %date,
                                window_length,
                                "reference date dropped, not enough history or truth"
                            );
                            None
                        }
                    }
                })
                .collect(),
            None => {
                let first = self.first_reference_index(window_length);
                let n = self.dataset.len();
                (first..n)
                    .step_by(self.config.step)
                    .filter(|&r| self.admissible(window_length, r))
                    .filter(|&r| self.in_range(self.dataset.date_at(r)))
                    .collect()
            }
        }
    }

    fn units(&self) -> Vec<Unit> {
        let mut units = Vec::new();
        for &window_length in &self.config.window_lengths {
            for reference in self.references(window_length) {
                for &kind in &self.config.model_kinds {
                    units.push(Unit { window_length, reference, kind });
                }
            }
        }
        units
    }

    /// Run the whole sweep.
    ///
    /// # Errors
    /// [`EvalError::ThreadPool`] if the worker pool cannot be built. Unit
    /// failures are recorded, never returned.
    pub fn run(self) -> EvalResult<CompletedEvaluation> {
        let units = self.units();
        info!(
            units = units.len(),
            windows = ?self.config.window_lengths,
            horizon = self.config.horizon,
            metric = %self.config.metric,
            "walk-forward sweep started"
        );
        let mut records: Vec<EvaluationRecord> = if self.config.workers == 1 {
            units.iter().map(|u| self.evaluate(u)).collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.workers)
                .build()
                .map_err(|e| EvalError::ThreadPool { reason: e.to_string() })?;
            pool.install(|| units.par_iter().map(|u| self.evaluate(u)).collect())
        };
        records.sort_by(|a, b| {
            (a.window_length, a.reference_date, a.model_kind).cmp(&(
                b.window_length,
                b.reference_date,
                b.model_kind,
            ))
        });

        let summaries: Vec<WindowSearchSummary> = self
            .config
            .model_kinds
            .iter()
            .map(|&kind| {
                WindowSearchSummary::from_records(kind, &self.config.window_lengths, &records)
            })
            .collect();
        let mut reference_dates: Vec<NaiveDate> =
            records.iter().map(|r| r.reference_date).collect();
        reference_dates.sort_unstable();
        reference_dates.dedup();

        let completed = CompletedEvaluation {
            bed: self.engine.bed(),
            config: self.config,
            reference_dates,
            records,
            summaries,
        };
        info!(
            scored = completed.scored_count(),
            skipped = completed.skipped_count(),
            "walk-forward sweep complete"
        );
        for summary in &completed.summaries {
            info!(
                model = %summary.model_kind,
                best_window = ?summary.best_window,
                best_mean_error = ?summary.best_mean_error,
                "window search result"
            );
        }
        Ok(completed)
    }

    /// Future case counts for `reference + 1 ..= reference + horizon`, cut
    /// at the first day the source does not cover.
    fn future_cases(&self, reference: usize) -> Vec<f64> {
        let h = self.config.horizon;
        match &self.cases {
            CaseSource::Observed => {
                let cases = self.dataset.cases.values();
                cases[reference + 1..(reference + 1 + h).min(cases.len())].to_vec()
            }
            CaseSource::External(series) => {
                let date = self.dataset.date_at(reference);
                (1..=h as u64).map_while(|d| series.get(date + Days::new(d))).collect()
            }
        }
    }

    fn evaluate(&self, unit: &Unit) -> EvaluationRecord {
        let Unit { window_length, reference, kind } = *unit;
        let horizon = self.config.horizon;
        let reference_date = self.dataset.date_at(reference);
        let record = |outcome| EvaluationRecord {
            window_length,
            reference_date,
            model_kind: kind,
            horizon,
            metric: self.config.metric,
            outcome,
        };
        let skip = |reason: SkipReason, diagnostics: Vec<Diagnostic>| {
            debug!(
                model = %kind,
                window_length,
                reference = %reference_date,
                %reason,
                "unit skipped"
            );
            record(Outcome::Skipped { reason, diagnostics })
        };

        let from = if window_length == 0 { 0 } else { reference + 1 - window_length };
        let window = match CalibrationWindow::new(self.dataset.date_at(from), reference_date) {
            Ok(w) => w,
            Err(e) => return skip(SkipReason::from_error(kind, &ModelError::from(e)), Vec::new()),
        };
        let fitted = match self.engine.calibrate(kind, &self.dataset, &window).into_result() {
            Ok(f) => f,
            Err(reason) => return skip(reason, Vec::new()),
        };
        let future = self.future_cases(reference);
        let forecast = match self.engine.forecast(&fitted, &future, horizon) {
            Ok(f) => f,
            Err(reason) => return skip(reason, fitted.diagnostics().to_vec()),
        };

        let target = self.dataset.occupancy(self.engine.bed()).values();
        let actual = target[reference + 1..=reference + horizon].to_vec();
        let predicted = forecast.series.values().to_vec();
        let metrics = MetricSet::compute(&actual, &predicted, &target[from..=reference]);
        let value = self.config.metric.select(&metrics);
        let difference = predicted.iter().zip(&actual).map(|(p, a)| p - a).collect();
        debug!(model = %kind, window_length, reference = %reference_date, value, "unit scored");
        record(Outcome::Scored(Box::new(ScoredEvaluation {
            value,
            metrics,
            actual,
            predicted,
            difference,
            lower: forecast.lower,
            upper: forecast.upper,
            diagnostics: forecast.diagnostics,
            calibration_stats: fitted.calibration_stats(),
        })))
    }
}
