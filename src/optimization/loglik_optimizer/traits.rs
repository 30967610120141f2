//! Contracts between the occupancy models and the optimizer.
//!
//! A model implements [`LogLikelihood`] for its fit objective and tunes the
//! run with [`MLEOptions`]; `maximize` hands back an [`OptimOutcome`] on the
//! log-likelihood scale. Internally the solver minimizes `c(θ) = -ℓ(θ)`.
use std::{str::FromStr, time::Duration};

use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Cost, FnEvalMap, Grad, Theta,
        validation::{
            validate_theta_hat, validate_value, verify_time_budget, verify_tol_cost,
            verify_tol_grad,
        },
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;

/// Objective maximized by [`maximize`](super::maximize).
///
/// `check` runs once on the starting point and should reject data the
/// objective cannot be evaluated on. `grad` returns `∇ℓ(θ)`; leaving it
/// unimplemented switches the adapter to central finite differences.
pub trait LogLikelihood {
    type Data;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Line search inside L-BFGS; parsed case-insensitively from
/// `MoreThuente` or `HagerZhang`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineSearcher {
    #[default]
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Per-fit optimizer settings.
///
/// Defaults: `tol_grad` 1e-6, `tol_cost` 1e-9, 300 iterations, More-Thuente,
/// argmin's default L-BFGS memory and a 5 s wall-clock budget. The budget
/// bounds one `maximize` call, not a whole model fit: a causal fit makes up
/// to `restarts` calls and a SARIMAX fit up to two per candidate order. A
/// run cut short by the budget is reported as not converged.
#[derive(Debug, Clone, PartialEq)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    pub lbfgs_mem: Option<usize>,
    pub time_budget: Option<Duration>,
}

impl MLEOptions {
    /// # Errors
    /// - [`OptError::InvalidLBFGSMem`] if `lbfgs_mem == Some(0)`.
    /// - [`OptError::InvalidTimeBudget`] if `time_budget == Some(Duration::ZERO)`.
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, lbfgs_mem: Option<usize>,
        time_budget: Option<Duration>,
    ) -> OptResult<Self> {
        if lbfgs_mem == Some(0) {
            return Err(OptError::InvalidLBFGSMem {
                mem: 0,
                reason: "L-BFGS memory must be greater than zero.",
            });
        }
        verify_time_budget(time_budget)?;
        Ok(Self { tols, line_searcher, lbfgs_mem, time_budget })
    }
}

impl Default for MLEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances { tol_grad: Some(1e-6), tol_cost: Some(1e-9), max_iter: Some(300) },
            line_searcher: LineSearcher::MoreThuente,
            lbfgs_mem: None,
            time_budget: Some(Duration::from_secs(5)),
        }
    }
}

/// Stopping rules; the run ends on whichever triggers first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// At least one rule must be set; tolerances must be finite and
    /// positive, `max_iter` non-zero.
    ///
    /// # Errors
    /// [`OptError::NoTolerancesProvided`], [`OptError::InvalidTolGrad`],
    /// [`OptError::InvalidTolCost`] or [`OptError::InvalidMaxIter`].
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if max_iter == Some(0) {
            return Err(OptError::InvalidMaxIter {
                max_iter: 0,
                reason: "Maximum iterations must be greater than zero.",
            });
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

/// Result of one `maximize` call.
///
/// `value` is `ℓ(θ̂)`, not the cost. `converged` is set only when a
/// tolerance was met; `budget_exhausted` when the iteration cap or the time
/// budget stopped the run.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub budget_exhausted: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// # Errors
    /// Rejects a missing or non-finite `θ̂` and a non-finite value.
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus,
        iterations: u64, fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let (converged, budget_exhausted) = match &termination {
            TerminationStatus::Terminated(
                TerminationReason::SolverConverged | TerminationReason::TargetCostReached,
            ) => (true, false),
            TerminationStatus::Terminated(
                TerminationReason::MaxItersReached | TerminationReason::Timeout,
            ) => (false, true),
            _ => (false, false),
        };
        let status = match &termination {
            TerminationStatus::NotTerminated => "Not terminated".to_string(),
            other => format!("{other:?}"),
        };
        Ok(Self {
            theta_hat,
            value,
            converged,
            budget_exhausted,
            status,
            iterations: iterations as usize,
            fn_evals,
            grad_norm: grad.map(|g| g.l2_norm()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Check that hitting the iteration cap or the time budget is never
    // reported as convergence.
    //
    // Given
    // -----
    // - Termination statuses for converged, max-iter and timeout runs.
    //
    // Expect
    // ------
    // - Only the converged status yields `converged == true`.
    fn outcome_flags_budget_exhaustion_as_not_converged() {
        // Arrange
        let make = |status| {
            OptimOutcome::new(Some(array![0.0]), -1.0, status, 3, FnEvalMap::new(), None)
                .expect("outcome should validate")
        };

        // Act
        let ok = make(TerminationStatus::Terminated(TerminationReason::SolverConverged));
        let capped = make(TerminationStatus::Terminated(TerminationReason::MaxItersReached));
        let timed_out = make(TerminationStatus::Terminated(TerminationReason::Timeout));

        // Assert
        assert!(ok.converged && !ok.budget_exhausted);
        assert!(!capped.converged && capped.budget_exhausted);
        assert!(!timed_out.converged && timed_out.budget_exhausted);
    }

    #[test]
    fn line_searcher_parses_case_insensitively() {
        assert_eq!("hagerzhang".parse::<LineSearcher>(), Ok(LineSearcher::HagerZhang));
        assert_eq!("MORETHUENTE".parse::<LineSearcher>(), Ok(LineSearcher::MoreThuente));
        assert!("bfgs".parse::<LineSearcher>().is_err());
    }

    #[test]
    fn mle_options_reject_zero_memory_and_zero_budget() {
        let tols = Tolerances::new(Some(1e-6), None, Some(10)).expect("valid tolerances");
        assert!(MLEOptions::new(tols, LineSearcher::MoreThuente, Some(0), None).is_err());
        assert!(
            MLEOptions::new(tols, LineSearcher::MoreThuente, None, Some(Duration::ZERO)).is_err()
        );
        assert!(Tolerances::new(None, None, None).is_err());
    }
}
