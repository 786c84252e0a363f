//! Linear autoregression on the context window

use crate::error::{ForecastError, Result};
use crate::sequence::{check_context, window_width, FittedRegressor, Regressor};
use incidence_math::regression::least_squares;
use incidence_math::Window;

/// Ordinary least squares with an intercept and a ridge penalty
#[derive(Debug, Clone)]
pub struct LinearWindowRegressor {
    /// Name of the model
    name: String,
    /// Ridge penalty on the coefficients
    ridge: f64,
}

/// Trained linear window regressor
#[derive(Debug, Clone)]
pub struct FittedLinearWindow {
    /// Name of the model
    name: String,
    /// Constant term
    intercept: f64,
    /// One weight per context position, oldest first
    weights: Vec<f64>,
}

impl LinearWindowRegressor {
    /// Create a new linear regressor
    pub fn new(ridge: f64) -> Result<Self> {
        if !(ridge >= 0.0 && ridge.is_finite()) {
            return Err(ForecastError::InvalidParameter(
                "Ridge penalty must be non-negative".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Linear Window (ridge={})", ridge),
            ridge,
        })
    }
}

impl Default for LinearWindowRegressor {
    fn default() -> Self {
        Self {
            name: "Linear Window (ridge=0.0001)".to_string(),
            ridge: 1e-4,
        }
    }
}

impl Regressor for LinearWindowRegressor {
    type Fitted = FittedLinearWindow;

    fn fit(&self, windows: &[Window]) -> Result<Self::Fitted> {
        let width = window_width(windows)?;

        let rows: Vec<Vec<f64>> = windows
            .iter()
            .map(|w| std::iter::once(1.0).chain(w.context.iter().copied()).collect())
            .collect();
        let labels: Vec<f64> = windows.iter().map(|w| w.label).collect();

        let coefficients = least_squares(&rows, &labels, self.ridge)?;

        Ok(FittedLinearWindow {
            name: self.name.clone(),
            intercept: coefficients[0],
            weights: coefficients[1..=width].to_vec(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl FittedLinearWindow {
    /// Constant term
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Weights, oldest context position first
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl FittedRegressor for FittedLinearWindow {
    fn predict(&self, context: &[f64]) -> Result<f64> {
        check_context(self.weights.len(), context)?;
        Ok(self.intercept
            + self
                .weights
                .iter()
                .zip(context.iter())
                .map(|(w, x)| w * x)
                .sum::<f64>())
    }

    fn width(&self) -> usize {
        self.weights.len()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
