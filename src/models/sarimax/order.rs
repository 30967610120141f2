//! SARIMAX orders and order-selection settings.
use serde::{Deserialize, Serialize};

use crate::models::errors::{ModelError, ModelResult};

/// `(p, d, q) × (P, D, Q, s)` with one exogenous regressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SarimaxOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub seasonal_p: usize,
    pub seasonal_d: usize,
    pub seasonal_q: usize,
    pub period: usize,
}

impl SarimaxOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q, seasonal_p: 0, seasonal_d: 0, seasonal_q: 0, period: 0 }
    }

    pub const fn seasonal(
        self, seasonal_p: usize, seasonal_d: usize, seasonal_q: usize, period: usize,
    ) -> Self {
        Self { seasonal_p, seasonal_d, seasonal_q, period, ..self }
    }

    pub fn is_seasonal(&self) -> bool {
        self.period > 1 && self.seasonal_p + self.seasonal_d + self.seasonal_q > 0
    }

    /// Same order with the seasonal part removed.
    pub fn without_seasonality(&self) -> Self {
        Self::new(self.p, self.d, self.q)
    }

    /// `p + d + q + P + D + Q`, the parsimony key for tie-breaking.
    pub fn total_order(&self) -> usize {
        self.p + self.d + self.q + self.seasonal_p + self.seasonal_d + self.seasonal_q
    }

    /// An intercept is only estimated on undifferenced data.
    pub fn has_constant(&self) -> bool {
        self.d + self.seasonal_d == 0
    }

    /// Seasonal period used in polynomials; `1` when non-seasonal.
    pub fn effective_period(&self) -> usize {
        if self.is_seasonal() { self.period } else { 1 }
    }

    /// Number of mean and ARMA coefficients (σ² excluded).
    pub fn n_coefficients(&self) -> usize {
        let seasonal = if self.is_seasonal() { self.seasonal_p + self.seasonal_q } else { 0 };
        usize::from(self.has_constant()) + 1 + self.p + self.q + seasonal
    }

    /// Observations lost to differencing.
    pub fn differencing_loss(&self) -> usize {
        self.d + if self.is_seasonal() { self.seasonal_d * self.period } else { 0 }
    }

    /// Observations lost to conditioning on the AR part.
    pub fn ar_degree(&self) -> usize {
        self.p + if self.is_seasonal() { self.seasonal_p * self.period } else { 0 }
    }

    /// Shortest window that leaves more effective residuals than parameters.
    pub fn min_observations(&self) -> usize {
        self.differencing_loss() + self.ar_degree() + self.n_coefficients() + 3
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.d > 2 || self.seasonal_d > 1 {
            return Err(ModelError::configuration(format!(
                "order {self} differences too often, allowed d <= 2 and D <= 1"
            )));
        }
        if self.seasonal_p + self.seasonal_d + self.seasonal_q > 0 && self.period < 2 {
            return Err(ModelError::configuration(format!(
                "order {self} has seasonal terms but period < 2"
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for SarimaxOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({},{},{})x({},{},{},{})",
            self.p, self.d, self.q, self.seasonal_p, self.seasonal_d, self.seasonal_q, self.period
        )
    }
}

/// Candidate grid searched by AIC. Differencing orders are fixed across the
/// grid so that all candidates are scored on the same differenced series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderGrid {
    pub max_p: usize,
    pub d: usize,
    pub max_q: usize,
    pub max_seasonal_p: usize,
    pub seasonal_d: usize,
    pub max_seasonal_q: usize,
    pub period: usize,
}

impl Default for OrderGrid {
    fn default() -> Self {
        Self {
            max_p: 2,
            d: 1,
            max_q: 1,
            max_seasonal_p: 1,
            seasonal_d: 0,
            max_seasonal_q: 1,
            period: 7,
        }
    }
}

impl OrderGrid {
    /// All orders in the grid, most parsimonious first.
    pub fn candidates(&self) -> Vec<SarimaxOrder> {
        let mut out = Vec::new();
        for p in 0..=self.max_p {
            for q in 0..=self.max_q {
                for sp in 0..=self.max_seasonal_p {
                    for sq in 0..=self.max_seasonal_q {
                        let order = SarimaxOrder::new(p, self.d, q);
                        out.push(order.seasonal(sp, self.seasonal_d, sq, self.period));
                    }
                }
            }
        }
        out.sort_by_key(|o| (o.total_order(), *o));
        out
    }
}

/// How the statistical model picks its order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSelection {
    Fixed(SarimaxOrder),
    Grid(OrderGrid),
}

impl Default for OrderSelection {
    fn default() -> Self {
        OrderSelection::Grid(OrderGrid::default())
    }
}

impl OrderSelection {
    pub fn candidates(&self) -> Vec<SarimaxOrder> {
        match self {
            OrderSelection::Fixed(order) => vec![*order],
            OrderSelection::Grid(grid) => grid.candidates(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // The default grid enumerates every combination once, most parsimonious
    // first.
    //
    // Given
    // -----
    // - Default grid: p 0..=2, d 1, q 0..=1, P 0..=1, D 0, Q 0..=1, s 7.
    //
    // Expect
    // ------
    // - 24 candidates, first (0,1,0)x(0,0,0,7), total order non-decreasing.
    fn default_grid_is_sorted_by_total_order() {
        // Arrange
        let grid = OrderGrid::default();

        // Act
        let candidates = grid.candidates();

        // Assert
        assert_eq!(candidates.len(), 24);
        assert_eq!(candidates[0], SarimaxOrder::new(0, 1, 0).seasonal(0, 0, 0, 7));
        assert!(candidates.windows(2).all(|w| w[0].total_order() <= w[1].total_order()));
    }

    #[test]
    fn parameter_counts_follow_seasonality_and_differencing() {
        let arma = SarimaxOrder::new(1, 0, 1);
        assert!(arma.has_constant());
        assert_eq!(arma.n_coefficients(), 4);
        let seasonal = SarimaxOrder::new(1, 1, 0).seasonal(1, 0, 1, 7);
        assert_eq!(seasonal.n_coefficients(), 4);
        assert_eq!(seasonal.ar_degree(), 8);
        assert_eq!(seasonal.without_seasonality().ar_degree(), 1);
        assert!(SarimaxOrder::new(0, 0, 0).seasonal(1, 0, 0, 1).validate().is_err());
    }
}
