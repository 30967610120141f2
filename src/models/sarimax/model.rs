//! SARIMAX occupancy model: order selection, fit and forecast.
//!
//! Purpose
//! -------
//! Regress daily occupancy on a trailing mean of case counts with seasonal
//! ARIMA errors, pick the order by AIC, and forecast with normal
//! prediction intervals.
//!
//! Key behaviors
//! -------------
//! - The regressor is the `exog_window`-day trailing mean of cases, using
//!   history before the window when it exists and fewer days otherwise.
//! - Target and regressor are differenced by `(1 − B)ᵈ(1 − Bˢ)ᴰ`, scaled to
//!   unit standard deviation, and fitted by concentrated CSS likelihood.
//! - Seasonal candidates are reduced to their non-seasonal part when the
//!   window covers fewer than `seasonal_min_cycles` periods, raising
//!   [`Diagnostic::SeasonalityDropped`].
//! - Each candidate starts from the OLS regression coefficients; if that
//!   start fails it is retried from zero, raising
//!   [`Diagnostic::RestartUsed`].
//!
//! Invariants & assumptions
//! ------------------------
//! - All candidates condition on the same number of leading observations,
//!   so their AIC values are comparable.
//! - AIC ties (within 1e-9) go to the smaller total order, then to the
//!   earlier candidate.
//! - Accepted fits have every inverse AR and MA root strictly inside the
//!   unit circle.
//! - Forecast points and lower bounds are never negative.
use chrono::Days;
use nalgebra::{DMatrix, DVector};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::{
    models::{
        BedType, CalibrationStats, Diagnostic, ForecastResult, ModelKind, OccupancyModel,
        check_future_cases,
        errors::{ModelError, ModelResult},
        sarimax::{
            likelihood::{Coefficients, CssData, CssLikelihood, css_residuals},
            order::{OrderSelection, SarimaxOrder},
            polynomial::{
                apply_difference, difference_polynomial, integrate, max_inverse_root_modulus,
                multiply, psi_weights,
            },
        },
        unconverged, window_bounds,
    },
    optimization::loglik_optimizer::{MLEOptions, OptimOutcome, maximize},
    series::{AlignedDataset, CalibrationWindow, DailySeries},
};

/// Inverse roots must stay this far inside the unit circle.
const ROOT_TOLERANCE: f64 = 1e-5;

/// Standard deviations below this leave the series unscaled.
const SCALE_EPS: f64 = 1e-8;

/// AIC differences below this count as ties.
const AIC_TIE: f64 = 1e-9;

/// Settings for [`SarimaxModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct SarimaxConfig {
    pub selection: OrderSelection,
    /// Days in the trailing case mean used as regressor.
    pub exog_window: usize,
    /// Seasonal terms need at least this many full periods in the window.
    pub seasonal_min_cycles: usize,
    /// Two-sided coverage of prediction intervals; `None` disables them.
    pub confidence_level: Option<f64>,
    pub min_window_days: usize,
    /// Settings for each of the up to two runs per candidate order.
    pub optimizer: MLEOptions,
}

impl Default for SarimaxConfig {
    fn default() -> Self {
        Self {
            selection: OrderSelection::default(),
            exog_window: 7,
            seasonal_min_cycles: 3,
            confidence_level: Some(0.95),
            min_window_days: 10,
            optimizer: MLEOptions::default(),
        }
    }
}

/// Fitted coefficients on the original occupancy and case scales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SarimaxCoefficients {
    pub constant: Option<f64>,
    pub exog: f64,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
}

/// Fit summary for the SARIMAX model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SarimaxFitStats {
    pub order: SarimaxOrder,
    pub coefficients: SarimaxCoefficients,
    /// Innovation variance in squared beds.
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub candidates_evaluated: usize,
    pub candidates_skipped: usize,
    pub iterations: usize,
}

/// Calibrated SARIMAX state, self-contained for forecasting.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedSarimax {
    pub order: SarimaxOrder,
    pub window: CalibrationWindow,
    pub bed: BedType,
    pub reference_value: f64,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: SarimaxFitStats,
    coefs: Coefficients,
    scale_y: f64,
    scale_x: f64,
    /// Standardized innovation variance.
    sigma2: f64,
    /// Last `k_d` occupancy levels, `k_d` the differencing degree.
    y_tail: Vec<f64>,
    /// Last `k_d` regressor levels.
    exog_tail: Vec<f64>,
    /// Last `exog_window − 1` case counts.
    case_tail: Vec<f64>,
    u_tail: Vec<f64>,
    e_tail: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct SarimaxModel {
    config: SarimaxConfig,
}

impl SarimaxModel {
    /// # Errors
    /// [`ModelError::Configuration`] for an empty candidate set, invalid
    /// orders, a zero-length regressor window or a confidence level outside
    /// `(0, 1)`.
    pub fn new(config: SarimaxConfig) -> ModelResult<Self> {
        let candidates = config.selection.candidates();
        if candidates.is_empty() {
            return Err(ModelError::configuration("SARIMAX order selection has no candidates"));
        }
        candidates.iter().try_for_each(SarimaxOrder::validate)?;
        if config.exog_window == 0 || config.seasonal_min_cycles == 0 {
            return Err(ModelError::configuration(
                "exog_window and seasonal_min_cycles must be positive",
            ));
        }
        if let Some(level) = config.confidence_level {
            if !(level > 0.0 && level < 1.0) {
                return Err(ModelError::configuration(format!(
                    "confidence level must lie in (0, 1), got {level}"
                )));
            }
        }
        if config.min_window_days < 3 {
            return Err(ModelError::configuration("SARIMAX min_window_days must be at least 3"));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &SarimaxConfig {
        &self.config
    }

    /// Candidate orders usable on a window of `window_days`, with the
    /// seasonality diagnostic when any had to be reduced.
    fn effective_candidates(&self, window_days: usize) -> (Vec<SarimaxOrder>, Option<Diagnostic>) {
        let mut dropped = None;
        let mut out: Vec<SarimaxOrder> = Vec::new();
        for order in self.config.selection.candidates() {
            let order = if order.is_seasonal()
                && window_days < self.config.seasonal_min_cycles * order.period
            {
                dropped = Some(Diagnostic::SeasonalityDropped {
                    window_days,
                    period: order.period,
                });
                order.without_seasonality()
            } else {
                order
            };
            if !out.contains(&order) {
                out.push(order);
            }
        }
        (out, dropped)
    }

    /// Trailing mean of cases for every window day.
    fn regressor(&self, cases: &[f64], from: usize, to: usize) -> Vec<f64> {
        let span = self.config.exog_window;
        (from..=to)
            .map(|t| {
                let lo = (t + 1).saturating_sub(span);
                let slice = &cases[lo..=t];
                slice.iter().sum::<f64>() / slice.len() as f64
            })
            .collect()
    }
}

impl Default for SarimaxModel {
    fn default() -> Self {
        Self { config: SarimaxConfig::default() }
    }
}

/// One fitted candidate.
struct CandidateFit {
    order: SarimaxOrder,
    coefs: Coefficients,
    scale_y: f64,
    scale_x: f64,
    sigma2: f64,
    log_likelihood: f64,
    aic: f64,
    u: Vec<f64>,
    e: Vec<f64>,
    restarted: bool,
    iterations: usize,
}

fn scale_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sd = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    if sd.is_finite() && sd >= SCALE_EPS { sd } else { 1.0 }
}

/// Least-squares regression start for `[c?, β]`; zeros if the solve fails.
fn regression_start(w: &[f64], x: &[f64], with_constant: bool) -> Vec<f64> {
    let k = usize::from(with_constant) + 1;
    let design = DMatrix::from_fn(w.len(), k, |i, j| {
        if with_constant && j == 0 { 1.0 } else { x[i] }
    });
    let target = DVector::from_column_slice(w);
    match design.svd(true, true).solve(&target, 1e-12) {
        Ok(beta) if beta.iter().all(|b| b.is_finite()) => beta.iter().copied().collect(),
        _ => vec![0.0; k],
    }
}

impl SarimaxModel {
    fn fit_candidate(
        &self, order: SarimaxOrder, y: &[f64], x: &[f64], start: usize,
    ) -> ModelResult<CandidateFit> {
        let delta = difference_polynomial(order.d, order.seasonal_d, order.effective_period());
        let k_d = delta.len() - 1;
        let n_coef = order.n_coefficients();
        let required = k_d + start + n_coef + 3;
        if y.len() < required {
            return Err(ModelError::InsufficientData { available: y.len(), required });
        }
        let w_raw = apply_difference(y, &delta);
        let x_raw = apply_difference(x, &delta);
        let scale_y = scale_of(&w_raw);
        let scale_x = scale_of(&x_raw);
        let data = CssData {
            w: w_raw.iter().map(|v| v / scale_y).collect(),
            x: x_raw.iter().map(|v| v / scale_x).collect(),
            order,
            start,
        };

        let mut theta0 = vec![0.0; n_coef];
        let regression = regression_start(&data.w, &data.x, order.has_constant());
        theta0[..regression.len()].copy_from_slice(&regression);
        let objective = CssLikelihood;
        let opts = &self.config.optimizer;
        let attempt = |theta: Vec<f64>| -> ModelResult<OptimOutcome> {
            let out = maximize(&objective, Array1::from(theta), &data, opts)?;
            if out.converged { Ok(out) } else { Err(unconverged(&format!("order {order}"), &out)) }
        };
        let (outcome, restarted) = match attempt(theta0) {
            Ok(out) => (out, false),
            Err(_) => (attempt(vec![0.0; n_coef])?, true),
        };

        let coefs = Coefficients::from_theta(&outcome.theta_hat, &order);
        check_roots(order, &coefs)?;
        let res = css_residuals(&coefs, &data);
        let log_likelihood = res.log_likelihood - res.n_eff as f64 * scale_y.ln();
        if !log_likelihood.is_finite() {
            return Err(ModelError::divergence(format!("order {order} has no finite likelihood")));
        }
        let aic = -2.0 * log_likelihood + 2.0 * (n_coef + 1) as f64;
        Ok(CandidateFit {
            order,
            coefs,
            scale_y,
            scale_x,
            sigma2: res.sigma2,
            log_likelihood,
            aic,
            u: res.u,
            e: res.e,
            restarted,
            iterations: outcome.iterations,
        })
    }
}

/// # Errors
/// [`ModelError::FitDivergence`] when an AR or MA inverse root lies within
/// `ROOT_TOLERANCE` of the unit circle or outside it.
fn check_roots(order: SarimaxOrder, coefs: &Coefficients) -> ModelResult<()> {
    let s = order.effective_period();
    for (label, poly) in [("AR", coefs.ar_poly(s)), ("MA", coefs.ma_poly(s))] {
        let modulus = max_inverse_root_modulus(&poly);
        if modulus >= 1.0 - ROOT_TOLERANCE {
            return Err(ModelError::divergence(format!(
                "order {order} has an {label} inverse root of modulus {modulus:.6}"
            )));
        }
    }
    Ok(())
}

/// Whether a candidate with `(aic, order)` displaces the current best.
/// Lower AIC wins; near-ties go to the smaller total order, then to the
/// incumbent.
fn displaces(candidate: (f64, SarimaxOrder), best: Option<(f64, SarimaxOrder)>) -> bool {
    let (aic, order) = candidate;
    match best {
        None => true,
        Some((best_aic, best_order)) if (aic - best_aic).abs() < AIC_TIE => {
            order.total_order() < best_order.total_order()
        }
        Some((best_aic, _)) => aic < best_aic,
    }
}

fn tail(values: &[f64], n: usize) -> Vec<f64> {
    values[values.len().saturating_sub(n)..].to_vec()
}

impl OccupancyModel for SarimaxModel {
    type Fitted = FittedSarimax;

    fn kind(&self) -> ModelKind {
        ModelKind::Statistical
    }

    fn min_window_days(&self) -> usize {
        self.config.min_window_days
    }

    fn fit(
        &self, dataset: &AlignedDataset, window: &CalibrationWindow, bed: BedType,
    ) -> ModelResult<FittedSarimax> {
        let cfg = &self.config;
        let (from, to) = window_bounds(dataset, window, cfg.min_window_days)?;
        let y = &dataset.occupancy(bed).values()[from..=to];
        let cases = dataset.cases.values();
        let x = self.regressor(cases, from, to);
        let (candidates, dropped) = self.effective_candidates(y.len());

        let start = candidates.iter().map(SarimaxOrder::ar_degree).max().unwrap_or(0);
        let mut best: Option<CandidateFit> = None;
        let mut failures: Vec<ModelError> = Vec::new();
        for order in &candidates {
            match self.fit_candidate(*order, y, &x, start) {
                Ok(fit) => {
                    if displaces((fit.aic, fit.order), best.as_ref().map(|b| (b.aic, b.order))) {
                        best = Some(fit);
                    }
                }
                Err(e) => failures.push(e),
            }
        }
        let Some(fit) = best else {
            let all_short =
                failures.iter().all(|e| matches!(e, ModelError::InsufficientData { .. }));
            return Err(match failures.into_iter().next() {
                Some(first) if all_short => first,
                Some(first) => ModelError::divergence(format!(
                    "no SARIMAX candidate could be fitted, first failure: {first}"
                )),
                None => ModelError::divergence("no SARIMAX candidate could be fitted"),
            });
        };

        let mut diagnostics: Vec<Diagnostic> = dropped.into_iter().collect();
        if fit.restarted {
            diagnostics.push(Diagnostic::RestartUsed { start_index: 1 });
        }
        let delta =
            difference_polynomial(fit.order.d, fit.order.seasonal_d, fit.order.effective_period());
        let k_d = delta.len() - 1;
        let s = fit.order.effective_period();
        let deg_a = fit.coefs.ar_poly(s).len() - 1;
        let deg_m = fit.coefs.ma_poly(s).len() - 1;
        let c = &fit.coefs;
        let coefficients = SarimaxCoefficients {
            constant: fit.order.has_constant().then_some(c.constant * fit.scale_y),
            exog: c.beta * fit.scale_y / fit.scale_x,
            ar: c.ar.clone(),
            ma: c.ma.clone(),
            seasonal_ar: c.seasonal_ar.clone(),
            seasonal_ma: c.seasonal_ma.clone(),
        };
        let stats = SarimaxFitStats {
            order: fit.order,
            coefficients,
            sigma2: fit.sigma2 * fit.scale_y * fit.scale_y,
            log_likelihood: fit.log_likelihood,
            aic: fit.aic,
            candidates_evaluated: candidates.len(),
            candidates_skipped: failures.len(),
            iterations: fit.iterations,
        };
        Ok(FittedSarimax {
            order: fit.order,
            window: *window,
            bed,
            reference_value: y[y.len() - 1],
            diagnostics,
            stats,
            scale_y: fit.scale_y,
            scale_x: fit.scale_x,
            sigma2: fit.sigma2,
            y_tail: tail(y, k_d),
            exog_tail: tail(&x, k_d),
            case_tail: tail(&cases[..=to], cfg.exog_window - 1),
            u_tail: tail(&fit.u, deg_a),
            e_tail: tail(&fit.e, deg_m),
            coefs: fit.coefs,
        })
    }

    fn forecast(
        &self, fitted: &FittedSarimax, future_cases: &[f64], horizon: usize,
    ) -> ModelResult<ForecastResult> {
        check_future_cases(future_cases, horizon)?;
        let order = fitted.order;
        let s = order.effective_period();
        let a = fitted.coefs.ar_poly(s);
        let m = fitted.coefs.ma_poly(s);
        let delta = difference_polynomial(order.d, order.seasonal_d, s);

        let span = self.config.exog_window;
        let mut case_path = fitted.case_tail.clone();
        let mut exog_levels = fitted.exog_tail.clone();
        for &c in &future_cases[..horizon] {
            case_path.push(c);
            let recent = &case_path[case_path.len().saturating_sub(span)..];
            exog_levels.push(recent.iter().sum::<f64>() / recent.len() as f64);
        }
        let x_future: Vec<f64> =
            apply_difference(&exog_levels, &delta).iter().map(|v| v / fitted.scale_x).collect();

        let base = fitted.u_tail.len();
        let mut u = fitted.u_tail.clone();
        let e_base = fitted.e_tail.len();
        let mut w = Vec::with_capacity(horizon);
        for (i, xs) in x_future.iter().enumerate() {
            let t = base + i;
            let ar: f64 = a.iter().enumerate().skip(1).map(|(k, ak)| ak * u[t - k]).sum();
            let ma: f64 = m
                .iter()
                .enumerate()
                .skip(1)
                .filter(|(k, _)| *k > i && *k - i <= e_base)
                .map(|(k, mk)| mk * fitted.e_tail[e_base + i - k])
                .sum();
            let ut = ma - ar;
            u.push(ut);
            let level = fitted.coefs.constant + fitted.coefs.beta * xs + ut;
            w.push(level * fitted.scale_y);
        }
        let raw = integrate(&fitted.y_tail, &w, &delta);

        let reference = fitted.window.end;
        let mut diagnostics = fitted.diagnostics.clone();
        let clamped: Vec<usize> =
            raw.iter().enumerate().filter(|(_, v)| **v < 0.0).map(|(i, _)| i).collect();
        if let Some(&first) = clamped.first() {
            diagnostics.push(Diagnostic::NegativeOccupancyClamped {
                first_date: reference + Days::new(first as u64 + 1),
                days: clamped.len(),
            });
        }
        let point: Vec<f64> = raw.iter().map(|v| v.max(0.0)).collect();

        let (lower, upper) = match self.config.confidence_level {
            Some(level) => {
                let normal = Normal::new(0.0, 1.0)
                    .map_err(|e| ModelError::configuration(format!("normal quantile: {e}")))?;
                let z = normal.inverse_cdf(0.5 + level / 2.0);
                let psi = psi_weights(&multiply(&a, &delta), &m, horizon);
                let var = fitted.sigma2 * fitted.scale_y * fitted.scale_y;
                let mut cumulative = 0.0;
                let mut lower = Vec::with_capacity(horizon);
                let mut upper = Vec::with_capacity(horizon);
                for (h, centre) in raw.iter().enumerate() {
                    cumulative += psi[h] * psi[h];
                    let half = z * (var * cumulative).sqrt();
                    lower.push((centre - half).max(0.0));
                    upper.push((centre + half).max(0.0));
                }
                (Some(lower), Some(upper))
            }
            None => (None, None),
        };

        Ok(ForecastResult {
            kind: ModelKind::Statistical,
            window: fitted.window,
            reference_value: fitted.reference_value,
            series: DailySeries::new(reference + Days::new(1), point)?,
            lower,
            upper,
            diagnostics,
        })
    }

    fn calibration_stats(&self, fitted: &FittedSarimax) -> CalibrationStats {
        CalibrationStats::Sarimax(fitted.stats.clone())
    }
}
