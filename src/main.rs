//! `occupancy-bench`: walk-forward benchmarking of occupancy forecasts.
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::{Days, NaiveDate};
use clap::{Args, Parser, Subcommand};
use occupancy_forecast::{
    calibration::CalibrationEngine,
    config::{self, ExperimentConfig},
    evaluation::{CaseSource, ErrorMetric, WalkForwardEvaluator, WindowSearchSummary},
    models::ModelKind,
    report::BenchmarkReporter,
    series::{
        AlignedDataset, BedType, CalibrationWindow, DailySeries, load_case_forecast, load_dataset,
    },
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "occupancy-bench",
    version,
    about = "Benchmark hospital occupancy forecasts across calibration window lengths"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sweep window lengths for one model kind and report the best one.
    SearchWindow {
        /// `causal` or `sarimax`.
        #[arg(long)]
        model: ModelKind,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Sweep window lengths for every configured model kind.
    Benchmark {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Calibrate once and print the forecast with its diagnostics.
    Forecast {
        #[arg(long)]
        model: ModelKind,
        /// Last day of the calibration window (YYYY-MM-DD).
        #[arg(long)]
        reference_date: NaiveDate,
        /// Window length in days; `0` uses all history.
        #[arg(long)]
        window: usize,
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Dataset CSV with header `date,cases,normal,icu,releases`.
    #[arg(long, env = "OCCUPANCY_DATA")]
    data: PathBuf,
    /// TOML experiment configuration.
    #[arg(long, env = "OCCUPANCY_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long)]
    horizon: Option<usize>,
    /// Comma-separated window lengths; `0` means full history.
    #[arg(long, value_delimiter = ',')]
    windows: Option<Vec<usize>>,
    #[arg(long)]
    step: Option<usize>,
    /// `mape`, `smape`, `mae` or `mase`.
    #[arg(long)]
    metric: Option<ErrorMetric>,
    /// `normal` or `icu`.
    #[arg(long)]
    bed_type: Option<BedType>,
    /// Worker threads; `0` lets rayon decide, `1` runs sequentially.
    #[arg(long)]
    workers: Option<usize>,
    /// Case forecast CSV (`date,cases`) used instead of observed cases.
    #[arg(long)]
    cases_forecast: Option<PathBuf>,
    /// Write the JSON result set here.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Write the flat per-record CSV here.
    #[arg(long)]
    csv: Option<PathBuf>,
    #[arg(long)]
    pretty: bool,
    /// `tracing` filter directive; overrides the config and `RUST_LOG`.
    #[arg(long)]
    log_level: Option<String>,
}

impl CommonArgs {
    fn apply(&self, config: &mut ExperimentConfig) {
        if let Some(h) = self.horizon {
            config.general.horizon = h;
        }
        if let Some(bed) = self.bed_type {
            config.general.bed_type = bed;
        }
        if let Some(windows) = &self.windows {
            config.evaluation.windows = windows.clone();
        }
        if let Some(step) = self.step {
            config.evaluation.step = step;
        }
        if let Some(metric) = self.metric {
            config.evaluation.metric = metric;
        }
        if let Some(workers) = self.workers {
            config.evaluation.workers = workers;
        }
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (common, model) = match &cli.command {
        Command::SearchWindow { model, common } => (common, Some(*model)),
        Command::Benchmark { common } => (common, None),
        Command::Forecast { model, common, .. } => (common, Some(*model)),
    };

    let mut config = match &common.config {
        Some(path) => config::load_from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ExperimentConfig::default(),
    };
    common.apply(&mut config);
    if let Some(kind) = model {
        config.evaluation.models = vec![kind];
    }
    init_tracing(common.log_level.as_deref().or(config.logging.level.as_deref()));

    let dataset =
        load_dataset(&common.data, config.general.gap_fill, config.general.min_overlap_days)
            .with_context(|| format!("loading dataset {}", common.data.display()))?;
    info!(
        start = %dataset.start(),
        end = %dataset.end(),
        days = dataset.len(),
        bed = %config.general.bed_type,
        "dataset loaded"
    );
    let external_cases = common
        .cases_forecast
        .as_deref()
        .map(|path| {
            load_case_forecast(path, config.general.gap_fill)
                .with_context(|| format!("loading case forecast {}", path.display()))
        })
        .transpose()?;
    let engine = config.engine().context("building models")?;

    match &cli.command {
        Command::Forecast { model, reference_date, window, .. } => {
            let request = ForecastRequest {
                kind: *model,
                reference: *reference_date,
                window_length: *window,
                horizon: config.general.horizon,
            };
            forecast(&dataset, &engine, &request, external_cases.as_ref(), common)
        }
        _ => sweep(dataset, engine, &config, external_cases, common),
    }
}

fn sweep(
    dataset: AlignedDataset, engine: CalibrationEngine, config: &ExperimentConfig,
    external_cases: Option<DailySeries>, common: &CommonArgs,
) -> anyhow::Result<()> {
    let mut evaluator = WalkForwardEvaluator::new(dataset, engine, config.evaluation_config())
        .context("invalid evaluation settings")?;
    if let Some(cases) = external_cases {
        evaluator = evaluator.with_case_source(CaseSource::External(cases));
    }
    let completed = evaluator.run().context("walk-forward evaluation failed")?;

    let metric = completed.config.metric;
    for summary in completed.summaries() {
        print_summary(summary, metric);
    }

    let reporter = BenchmarkReporter::new(common.pretty);
    let set = reporter.export(&completed);
    if let Some(path) = &common.output {
        reporter.save_json(&set, path).with_context(|| write_context(path))?;
        info!(path = %path.display(), "JSON results written");
    }
    if let Some(path) = &common.csv {
        reporter.save_csv(&set, path).with_context(|| write_context(path))?;
        info!(path = %path.display(), "CSV results written");
    }
    completed.ensure_any_scored()?;
    Ok(())
}

struct ForecastRequest {
    kind: ModelKind,
    reference: NaiveDate,
    window_length: usize,
    horizon: usize,
}

fn forecast(
    dataset: &AlignedDataset, engine: &CalibrationEngine, request: &ForecastRequest,
    external_cases: Option<&DailySeries>, common: &CommonArgs,
) -> anyhow::Result<()> {
    let reference = request.reference;
    let window = if request.window_length == 0 {
        CalibrationWindow::new(dataset.start(), reference)
    } else {
        dataset.window_ending_at(reference, request.window_length)
    }
    .context("invalid calibration window")?;

    let cases = external_cases.unwrap_or(&dataset.cases);
    let future: Vec<f64> = (1..=request.horizon as u64)
        .map_while(|d| cases.get(reference + Days::new(d)))
        .collect();

    let fitted = engine
        .calibrate(request.kind, dataset, &window)
        .into_result()
        .map_err(|reason| anyhow!("calibration failed: {reason}"))?;
    let result = engine
        .forecast(&fitted, &future, request.horizon)
        .map_err(|reason| anyhow!("forecast failed: {reason}"))?;

    let report = serde_json::json!({
        "forecast": result,
        "calibration": fitted.calibration_stats(),
    });
    let text = if common.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{text}");
    if let Some(path) = &common.output {
        std::fs::write(path, &text).with_context(|| write_context(path))?;
    }
    Ok(())
}

fn print_summary(summary: &WindowSearchSummary, metric: ErrorMetric) {
    let label = |w: usize| if w == 0 { "full".to_string() } else { w.to_string() };
    for score in &summary.windows {
        let mean = score.mean_error.map_or("n/a".to_string(), |e| format!("{e:.3}"));
        println!(
            "{:<8} window {:>5}: mean {metric} {mean:>10} (scored {}, skipped {})",
            summary.model_kind.as_str(),
            label(score.window_length),
            score.scored,
            score.skipped,
        );
    }
    match (summary.best_window, summary.best_mean_error) {
        (Some(w), Some(e)) => {
            let kind = summary.model_kind.as_str();
            println!("{kind:<8} best window: {} (mean {metric} {e:.3})", label(w));
        }
        _ => println!("{:<8} best window: none scored", summary.model_kind.as_str()),
    }
}

fn write_context(path: &Path) -> String {
    format!("writing {}", path.display())
}
