//! Integration tests for the walk-forward benchmarking pipeline.
//!
//! Purpose
//! -------
//! - Validate the end-to-end path from a CSV dataset, through calibration of
//!   both model kinds on sliding windows, to scored records, window-length
//!   summaries and a persisted result set.
//! - Use data generated by the cascade itself, so the causal model is
//!   correctly specified and should beat the statistical baseline.
//!
//! Coverage
//! --------
//! - `series::loader`: CSV parsing, gap filling and alignment.
//! - `evaluation::walk_forward`: record counts per (window, kind), external
//!   case sources, all-zero data, optimizer budget stops skipped per unit.
//! - `report`: JSON persistence of a real sweep.
//!
//! Exclusions
//! ----------
//! - Parameter recovery and order selection details; those are covered by
//!   the unit tests of each model.
use chrono::{Days, NaiveDate};
use occupancy_forecast::{
    calibration::CalibrationEngine,
    evaluation::{
        CaseSource, CompletedEvaluation, ErrorMetric, EvaluationConfig, Outcome,
        WalkForwardEvaluator,
    },
    models::{
        ModelKind,
        causal::{
            CascadeParameters, CausalConfig, CausalModel, DistributionFamily, KernelSpec, simulate,
        },
        sarimax::{OrderSelection, SarimaxConfig, SarimaxModel, SarimaxOrder},
    },
    optimization::loglik_optimizer::{MLEOptions, Tolerances},
    report::BenchmarkReporter,
    series::{
        AlignedDataset, BedType, DailySeries, GapFill, SeriesError, align, loader::read_dataset,
    },
};

const DAYS: usize = 120;
const HORIZON: usize = 7;
const STEP: usize = 5;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 9, 1).expect("valid date")
}

fn truth() -> CascadeParameters {
    CascadeParameters {
        hospitalization_rate: 0.08,
        delay: KernelSpec { family: DistributionFamily::Gamma, mean: 5.0, spread: 2.0 },
        stay: KernelSpec { family: DistributionFamily::Gamma, mean: 8.0, spread: 3.0 },
    }
}

/// Deterministic noise in `[-0.5, 0.5)` without a visible period.
fn hash_noise(t: usize) -> f64 {
    ((t as f64 * 12.9898).sin() * 43758.5453).fract().abs() - 0.5
}

/// Purpose
/// -------
/// Render a cascade-generated epidemic wave as the CSV the loader expects,
/// with one blank occupancy cell to exercise gap filling.
///
/// Returns
/// -------
/// - CSV text with header `date,cases,normal,icu,releases` and `DAYS` rows.
fn cascade_csv() -> String {
    let cases: Vec<f64> = (0..DAYS)
        .map(|t| 300.0 + 200.0 * (2.0 * std::f64::consts::PI * t as f64 / 70.0).sin())
        .collect();
    let sim = simulate(&cases, &truth(), 14, 21, 0.0).expect("simulation");
    let mut text = String::from("date,cases,normal,icu,releases\n");
    for t in 0..DAYS {
        let date = start() + Days::new(t as u64);
        let normal = sim.occupancy[t] + 0.2 * hash_noise(t);
        let icu = 0.2 * sim.occupancy[t] + 0.1 * hash_noise(t + DAYS);
        if t == 40 {
            text.push_str(&format!("{date},{},,{icu},{}\n", cases[t], sim.releases[t]));
        } else {
            text.push_str(&format!("{date},{},{normal},{icu},{}\n", cases[t], sim.releases[t]));
        }
    }
    text
}

fn causal_config() -> CausalConfig {
    CausalConfig { grid_points: 3, max_delay_lag: 14, max_stay_lag: 21, ..CausalConfig::default() }
}

fn engine() -> CalibrationEngine {
    engine_with(causal_config())
}

fn engine_with(causal: CausalConfig) -> CalibrationEngine {
    let causal = CausalModel::new(causal).expect("valid causal config");
    let sarimax = SarimaxModel::new(SarimaxConfig {
        selection: OrderSelection::Fixed(SarimaxOrder::new(1, 1, 0)),
        ..SarimaxConfig::default()
    })
    .expect("valid sarimax config");
    CalibrationEngine::new(causal, sarimax, BedType::Normal)
}

fn sweep_config() -> EvaluationConfig {
    EvaluationConfig {
        window_lengths: vec![14, 30, 60],
        horizon: HORIZON,
        step: STEP,
        metric: ErrorMetric::Mape,
        workers: 2,
        ..EvaluationConfig::default()
    }
}

fn run(dataset: AlignedDataset, config: EvaluationConfig) -> CompletedEvaluation {
    WalkForwardEvaluator::new(dataset, engine(), config)
        .expect("valid sweep")
        .run()
        .expect("sweep runs")
}

#[test]
// Purpose
// -------
// A full sweep over cascade data produces one record per admissible
// (window, reference, kind) and the correctly specified causal model wins.
//
// Given
// -----
// - 120 days of a cascade-generated wave loaded from CSV, windows
//   {14, 30, 60}, horizon 7, step 5, both model kinds.
//
// Expect
// ------
// - ceil((n − L − h) / step) records per window length and kind.
// - Every scored value is finite and every summary names a best window.
// - The causal best mean MAPE is below the SARIMAX one.
fn cascade_sweep_scores_every_unit_and_causal_wins() {
    // Arrange
    let dataset =
        read_dataset(cascade_csv().as_bytes(), GapFill::Linear, 14).expect("dataset loads");
    assert_eq!(dataset.len(), DAYS);

    // Act
    let completed = run(dataset, sweep_config());

    // Assert
    for &l in &[14usize, 30, 60] {
        let expected = (DAYS - l - HORIZON).div_ceil(STEP);
        for kind in ModelKind::ALL {
            let count = completed
                .records()
                .iter()
                .filter(|r| r.window_length == l && r.model_kind == kind)
                .count();
            assert_eq!(count, expected, "window {l}, {kind}");
        }
    }
    assert!(completed.records().iter().filter_map(|r| r.value()).all(f64::is_finite));
    completed.ensure_any_scored().expect("some units scored");

    let causal = completed.summary_for(ModelKind::Causal).expect("causal summary");
    let sarimax = completed.summary_for(ModelKind::Statistical).expect("sarimax summary");
    let causal_best = causal.best_mean_error.expect("causal scored");
    let sarimax_best = sarimax.best_mean_error.expect("sarimax scored");
    assert!(causal_best < sarimax_best, "causal {causal_best} vs sarimax {sarimax_best}");
}

#[test]
// Purpose
// -------
// A real sweep survives JSON persistence unchanged.
//
// Given
// -----
// - A small single-window causal sweep, saved to a temp file.
//
// Expect
// ------
// - The loaded result set equals the exported one and its metadata
//   matches the sweep.
fn sweep_results_persist_to_json() {
    // Arrange
    let dataset =
        read_dataset(cascade_csv().as_bytes(), GapFill::Linear, 14).expect("dataset loads");
    let config = EvaluationConfig {
        window_lengths: vec![30],
        model_kinds: vec![ModelKind::Causal],
        step: 20,
        workers: 1,
        ..sweep_config()
    };
    let completed = run(dataset, config);
    let reporter = BenchmarkReporter::new(false);
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("results").join("results.json");

    // Act
    let set = reporter.export(&completed);
    reporter.save_json(&set, &path).expect("saved");
    let loaded = BenchmarkReporter::load_json(&path).expect("loaded");

    // Assert
    assert_eq!(loaded, set);
    assert_eq!(loaded.metadata.bed, BedType::Normal);
    assert_eq!(loaded.metadata.window_lengths, vec![30]);
    assert_eq!(loaded.records.len(), completed.records().len());
}

#[test]
fn too_short_overlap_is_rejected_before_fitting() {
    let s = |v: f64| DailySeries::new(start(), vec![v; 5]).expect("finite");
    let err = align(&s(10.0), &s(5.0), &s(1.0), &s(0.5), 14).expect_err("too short");
    assert_eq!(err, SeriesError::InsufficientData { available: 5, required: 14 });
}

#[test]
// Purpose
// -------
// An external case forecast that stops early only skips the units whose
// horizon it does not cover.
//
// Given
// -----
// - Cascade data and an external case series ending on day 80.
//
// Expect
// ------
// - Units with reference + horizon beyond day 80 are skipped with a
//   configuration reason; earlier units are unaffected by the source.
fn short_external_case_source_skips_uncovered_units() {
    // Arrange
    let dataset =
        read_dataset(cascade_csv().as_bytes(), GapFill::Linear, 14).expect("dataset loads");
    let covered = dataset.cases.values()[..=80].to_vec();
    let external = DailySeries::new(dataset.start(), covered).expect("finite");
    let config = EvaluationConfig {
        window_lengths: vec![30],
        model_kinds: vec![ModelKind::Statistical],
        step: 10,
        workers: 1,
        ..sweep_config()
    };

    // Act
    let completed = WalkForwardEvaluator::new(dataset, engine(), config)
        .expect("valid sweep")
        .with_case_source(CaseSource::External(external))
        .run()
        .expect("sweep runs");

    // Assert
    let last_covered = start() + Days::new(80);
    for record in completed.records() {
        let needs = record.reference_date + Days::new(HORIZON as u64);
        match &record.outcome {
            Outcome::Skipped { reason, .. } if needs > last_covered => {
                assert_eq!(reason.category, "configuration");
            }
            Outcome::Skipped { reason, .. } => {
                assert_ne!(reason.category, "configuration", "{}", reason.message);
            }
            Outcome::Scored(_) => assert!(needs <= last_covered),
        }
    }
    assert!(completed.records().iter().any(|r| !r.is_scored()));
}

#[test]
// Purpose
// -------
// A causal optimizer that cannot converge skips its units with a
// divergence reason while the rest of the sweep carries on.
//
// Given
// -----
// - Cascade data, causal refinements capped at one L-BFGS iteration, both
//   model kinds on a 30-day window.
//
// Expect
// ------
// - Every causal unit is skipped as `fit_divergence` naming the budget.
// - SARIMAX units are still scored and the causal summary has no best
//   window.
fn optimizer_budget_stop_is_skipped_per_unit() {
    // Arrange
    let dataset =
        read_dataset(cascade_csv().as_bytes(), GapFill::Linear, 14).expect("dataset loads");
    let tols = Tolerances::new(Some(1e-6), Some(1e-9), Some(1)).expect("valid tolerances");
    let capped = CausalConfig {
        optimizer: MLEOptions { tols, ..MLEOptions::default() },
        ..causal_config()
    };
    let config = EvaluationConfig { window_lengths: vec![30], step: 20, ..sweep_config() };

    // Act
    let completed = WalkForwardEvaluator::new(dataset, engine_with(capped), config)
        .expect("valid sweep")
        .run()
        .expect("sweep runs");

    // Assert
    let (causal, sarimax): (Vec<_>, Vec<_>) =
        completed.records().iter().partition(|r| r.model_kind == ModelKind::Causal);
    assert!(!causal.is_empty() && !sarimax.is_empty());
    for record in &causal {
        match &record.outcome {
            Outcome::Skipped { reason, .. } => {
                assert_eq!(reason.category, "fit_divergence");
                assert!(reason.message.contains("budget"), "{}", reason.message);
            }
            Outcome::Scored(_) => panic!("causal unit on {} scored", record.reference_date),
        }
    }
    assert!(sarimax.iter().any(|r| r.is_scored()));
    let summary = completed.summary_for(ModelKind::Causal).expect("causal summary");
    assert_eq!(summary.best_window, None);
    completed.ensure_any_scored().expect("sarimax units scored");
}

#[test]
// Purpose
// -------
// A quiet period with no cases and empty wards never yields NaN scores.
//
// Given
// -----
// - 60 days of zeros in every series, windows {14, 30}, MAPE.
//
// Expect
// ------
// - Every scored value is finite and the causal model scores on the
//   low-signal prior.
fn all_zero_data_scores_finitely() {
    // Arrange
    let zeros = DailySeries::new(start(), vec![0.0; 60]).expect("finite");
    let dataset = align(&zeros, &zeros, &zeros, &zeros, 14).expect("aligned");
    let config = EvaluationConfig { window_lengths: vec![14, 30], step: 7, ..sweep_config() };

    // Act
    let completed = run(dataset, config);

    // Assert
    assert!(completed.records().iter().filter_map(|r| r.value()).all(f64::is_finite));
    let causal = completed.summary_for(ModelKind::Causal).expect("causal summary");
    assert!(causal.windows.iter().all(|w| w.scored > 0));
}
