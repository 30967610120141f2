//! TOML experiment configuration.
//!
//! Every section and every key is optional; missing values take the
//! defaults documented on each field. Command-line flags override what is
//! loaded here.
//!
//! ```toml
//! [general]
//! bed_type = "icu"
//! horizon = 14
//!
//! [evaluation]
//! windows = [14, 30, 60, 0]
//! metric = "smape"
//!
//! [sarimax]
//! order = { p = 1, d = 1, q = 0, seasonal_p = 0, seasonal_d = 0, seasonal_q = 0, period = 0 }
//! ```
use std::{path::Path, time::Duration};

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    calibration::CalibrationEngine,
    evaluation::{ErrorMetric, EvaluationConfig},
    models::{
        ModelError, ModelKind,
        causal::{
            CascadeParameters, CausalConfig, CausalModel, DistributionFamily, KernelSpec,
            ParameterBounds,
        },
        sarimax::{OrderGrid, OrderSelection, SarimaxConfig, SarimaxModel, SarimaxOrder},
    },
    optimization::{
        errors::OptError,
        loglik_optimizer::{LineSearcher, MLEOptions, Tolerances},
    },
    series::{BedType, GapFill},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid optimizer settings: {0}")]
    Optimizer(#[from] OptError),
    #[error("invalid model settings: {0}")]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    pub general: GeneralSection,
    pub evaluation: EvaluationSection,
    pub causal_model: CausalSection,
    pub sarimax: SarimaxSection,
    pub optimizer: OptimizerSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralSection {
    /// Default `normal`.
    pub bed_type: BedType,
    /// Forecast horizon in days. Default 7.
    pub horizon: usize,
    /// Shortest acceptable common date range of the inputs. Default 14.
    pub min_overlap_days: usize,
    /// Default `carry_forward`.
    pub gap_fill: GapFill,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            bed_type: BedType::Normal,
            horizon: 7,
            min_overlap_days: 14,
            gap_fill: GapFill::CarryForward,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationSection {
    /// Candidate window lengths; `0` is full history. Default `[14, 30, 60]`.
    pub windows: Vec<usize>,
    pub step: usize,
    pub metric: ErrorMetric,
    /// Default both kinds.
    pub models: Vec<ModelKind>,
    pub workers: usize,
    pub reference_dates: Option<Vec<NaiveDate>>,
    pub first_reference: Option<NaiveDate>,
    pub last_reference: Option<NaiveDate>,
    pub full_history_min_days: usize,
}

impl Default for EvaluationSection {
    fn default() -> Self {
        let defaults = EvaluationConfig::default();
        Self {
            windows: defaults.window_lengths,
            step: defaults.step,
            metric: defaults.metric,
            models: defaults.model_kinds,
            workers: defaults.workers,
            reference_dates: None,
            first_reference: None,
            last_reference: None,
            full_history_min_days: defaults.full_history_min_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CausalSection {
    pub delay_family: DistributionFamily,
    pub stay_family: DistributionFamily,
    /// Prior used for low-signal windows.
    pub hospitalization_rate: f64,
    pub delay_mean: f64,
    pub delay_spread: f64,
    pub stay_mean: f64,
    pub stay_spread: f64,
    pub bounds: ParameterBounds,
    pub grid_points: usize,
    pub restarts: usize,
    pub low_signal_threshold: f64,
    pub max_delay_lag: usize,
    pub max_stay_lag: usize,
    pub min_window_days: usize,
}

impl Default for CausalSection {
    fn default() -> Self {
        let d = CausalConfig::default();
        Self {
            delay_family: d.delay_family,
            stay_family: d.stay_family,
            hospitalization_rate: d.prior.hospitalization_rate,
            delay_mean: d.prior.delay.mean,
            delay_spread: d.prior.delay.spread,
            stay_mean: d.prior.stay.mean,
            stay_spread: d.prior.stay.spread,
            bounds: d.bounds,
            grid_points: d.grid_points,
            restarts: d.restarts,
            low_signal_threshold: d.low_signal_threshold,
            max_delay_lag: d.max_delay_lag,
            max_stay_lag: d.max_stay_lag,
            min_window_days: d.min_window_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SarimaxSection {
    /// Fixed order; when absent the grid is searched.
    pub order: Option<SarimaxOrder>,
    pub grid: OrderGrid,
    pub exog_window: usize,
    pub seasonal_min_cycles: usize,
    pub intervals: bool,
    pub confidence_level: f64,
    pub min_window_days: usize,
}

impl Default for SarimaxSection {
    fn default() -> Self {
        let d = SarimaxConfig::default();
        Self {
            order: None,
            grid: OrderGrid::default(),
            exog_window: d.exog_window,
            seasonal_min_cycles: d.seasonal_min_cycles,
            intervals: d.confidence_level.is_some(),
            confidence_level: d.confidence_level.unwrap_or(0.95),
            min_window_days: d.min_window_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerSection {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
    /// `MoreThuente` or `HagerZhang`.
    pub line_search: String,
    pub lbfgs_mem: Option<usize>,
    /// Wall-clock budget per optimizer run, not per calibration; `0`
    /// disables it.
    pub time_budget_ms: u64,
}

impl Default for OptimizerSection {
    fn default() -> Self {
        let d = MLEOptions::default();
        Self {
            tol_grad: d.tols.tol_grad,
            tol_cost: d.tols.tol_cost,
            max_iter: d.tols.max_iter,
            line_search: "MoreThuente".to_string(),
            lbfgs_mem: d.lbfgs_mem,
            time_budget_ms: d.time_budget.map_or(0, |b| b.as_millis() as u64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// `tracing` filter directive, e.g. `info` or `occupancy_forecast=debug`.
    /// When absent, `RUST_LOG` applies, then `info`.
    pub level: Option<String>,
}

/// Read and parse a config file.
///
/// # Errors
/// [`ConfigError::Read`] or [`ConfigError::Parse`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ExperimentConfig, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
    Ok(toml::from_str(&contents)?)
}

impl ExperimentConfig {
    /// # Errors
    /// [`ConfigError::Optimizer`] for rejected tolerances, line search or
    /// memory settings.
    pub fn mle_options(&self) -> Result<MLEOptions, ConfigError> {
        let o = &self.optimizer;
        let tols = Tolerances::new(o.tol_grad, o.tol_cost, o.max_iter)?;
        let line_searcher: LineSearcher = o.line_search.parse()?;
        let budget = (o.time_budget_ms > 0).then(|| Duration::from_millis(o.time_budget_ms));
        Ok(MLEOptions::new(tols, line_searcher, o.lbfgs_mem, budget)?)
    }

    /// # Errors
    /// As [`mle_options`](Self::mle_options).
    pub fn causal_config(&self) -> Result<CausalConfig, ConfigError> {
        let c = &self.causal_model;
        let kernel = |family, mean, spread| KernelSpec { family, mean, spread };
        Ok(CausalConfig {
            delay_family: c.delay_family,
            stay_family: c.stay_family,
            prior: CascadeParameters {
                hospitalization_rate: c.hospitalization_rate,
                delay: kernel(c.delay_family, c.delay_mean, c.delay_spread),
                stay: kernel(c.stay_family, c.stay_mean, c.stay_spread),
            },
            bounds: c.bounds,
            grid_points: c.grid_points,
            restarts: c.restarts,
            low_signal_threshold: c.low_signal_threshold,
            max_delay_lag: c.max_delay_lag,
            max_stay_lag: c.max_stay_lag,
            min_window_days: c.min_window_days,
            optimizer: self.mle_options()?,
        })
    }

    /// # Errors
    /// As [`mle_options`](Self::mle_options).
    pub fn sarimax_config(&self) -> Result<SarimaxConfig, ConfigError> {
        let s = &self.sarimax;
        let selection = match s.order {
            Some(order) => OrderSelection::Fixed(order),
            None => OrderSelection::Grid(s.grid),
        };
        Ok(SarimaxConfig {
            selection,
            exog_window: s.exog_window,
            seasonal_min_cycles: s.seasonal_min_cycles,
            confidence_level: s.intervals.then_some(s.confidence_level),
            min_window_days: s.min_window_days,
            optimizer: self.mle_options()?,
        })
    }

    /// Build both models and wrap them in an engine for the configured bed.
    ///
    /// # Errors
    /// [`ConfigError::Model`] if either model rejects its settings.
    pub fn engine(&self) -> Result<CalibrationEngine, ConfigError> {
        let causal = CausalModel::new(self.causal_config()?)?;
        let sarimax = SarimaxModel::new(self.sarimax_config()?)?;
        Ok(CalibrationEngine::new(causal, sarimax, self.general.bed_type))
    }

    pub fn evaluation_config(&self) -> EvaluationConfig {
        let e = &self.evaluation;
        EvaluationConfig {
            window_lengths: e.windows.clone(),
            horizon: self.general.horizon,
            step: e.step,
            metric: e.metric,
            model_kinds: e.models.clone(),
            reference_dates: e.reference_dates.clone(),
            first_reference: e.first_reference,
            last_reference: e.last_reference,
            full_history_min_days: e.full_history_min_days,
            workers: e.workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    // Purpose
    // -------
    // An empty document yields the built-in defaults everywhere.
    //
    // Given
    // -----
    // - `""` as TOML input.
    //
    // Expect
    // ------
    // - Default evaluation sweep, default model settings, no log override.
    fn empty_file_uses_defaults() {
        // Arrange
        let text = "";

        // Act
        let config: ExperimentConfig = toml::from_str(text).expect("empty config parses");

        // Assert
        assert_eq!(config.evaluation_config(), EvaluationConfig::default());
        assert_eq!(config.causal_config().expect("valid"), CausalConfig::default());
        assert_eq!(config.sarimax_config().expect("valid"), SarimaxConfig::default());
        assert_eq!(config.logging.level, None);
    }

    #[test]
    // Purpose
    // -------
    // Every section is read from a file and flows into the built configs.
    //
    // Given
    // -----
    // - A file overriding bed type, windows, distribution family, a fixed
    //   SARIMAX order, disabled intervals and the line search.
    //
    // Expect
    // ------
    // - Each override is visible in the derived settings.
    fn file_overrides_reach_derived_configs() {
        // Arrange
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("bench.toml");
        fs::write(
            &path,
            r#"
[general]
bed_type = "icu"
horizon = 14

[evaluation]
windows = [21, 0]
metric = "mae"
models = ["causal"]
reference_dates = ["2021-01-15"]

[causal_model]
stay_family = "truncated_normal"
grid_points = 2

[sarimax]
order = { p = 1, d = 1, q = 0, seasonal_p = 0, seasonal_d = 0, seasonal_q = 0, period = 0 }
intervals = false

[optimizer]
line_search = "HagerZhang"
time_budget_ms = 0

[logging]
level = "debug"
"#,
        )
        .expect("write config");

        // Act
        let config = load_from_path(&path).expect("config loads");
        let eval = config.evaluation_config();
        let causal = config.causal_config().expect("valid");
        let sarimax = config.sarimax_config().expect("valid");

        // Assert
        assert_eq!(config.general.bed_type, BedType::Icu);
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(eval.horizon, 14);
        assert_eq!(eval.window_lengths, vec![21, 0]);
        assert_eq!(eval.metric, ErrorMetric::Mae);
        assert_eq!(eval.model_kinds, vec![ModelKind::Causal]);
        assert_eq!(eval.reference_dates.map(|d| d.len()), Some(1));
        assert_eq!(causal.stay_family, DistributionFamily::TruncatedNormal);
        assert_eq!(causal.prior.stay.family, DistributionFamily::TruncatedNormal);
        assert_eq!(causal.optimizer.line_searcher, LineSearcher::HagerZhang);
        assert_eq!(causal.optimizer.time_budget, None);
        assert_eq!(sarimax.selection, OrderSelection::Fixed(SarimaxOrder::new(1, 1, 0)));
        assert_eq!(sarimax.confidence_level, None);
        assert!(config.engine().is_ok());
    }

    #[test]
    fn unknown_keys_and_bad_values_are_rejected() {
        assert!(toml::from_str::<ExperimentConfig>("[general]\nhorizn = 3\n").is_err());
        let bad: ExperimentConfig =
            toml::from_str("[optimizer]\nline_search = \"Newton\"\n").expect("parses");
        assert!(matches!(bad.mle_options(), Err(ConfigError::Optimizer(_))));
        let zero: ExperimentConfig =
            toml::from_str("[causal_model]\nrestarts = 0\n").expect("parses");
        assert!(matches!(zero.engine(), Err(ConfigError::Model(_))));
    }
}
