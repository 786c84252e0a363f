//! Recursive multi-step forecasting
//!
//! The model only ever predicts one step ahead. To reach step `K` each
//! prediction is appended to a rolling context of width `W` (dropping the
//! oldest value) and fed back as input for the next step, so errors compound
//! with the horizon.

use crate::error::{ForecastError, Result};
use crate::sequence::FittedRegressor;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Output of a recursive forecast, normalized units
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPath {
    /// One prediction per step, step 1 first
    pub values: Vec<f64>,
    /// Steps (1-based) whose prediction fell outside the advisory bounds
    pub extrapolated_steps: Vec<usize>,
}

impl ForecastPath {
    /// Number of forecast steps
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the forecast is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Drives a fitted regressor forward through its own predictions
#[derive(Debug)]
pub struct RecursiveForecaster<'a, R: FittedRegressor + ?Sized> {
    model: &'a R,
    bounds: Option<(f64, f64)>,
}

impl<'a, R: FittedRegressor + ?Sized> RecursiveForecaster<'a, R> {
    /// Create a forecaster without bounds
    pub fn new(model: &'a R) -> Self {
        Self {
            model,
            bounds: None,
        }
    }

    /// Flag predictions outside `[lower, upper]`
    ///
    /// Flagged values are still fed back unchanged.
    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.bounds = Some((lower, upper));
        self
    }

    /// Forecast `horizon` steps past `initial_context`
    ///
    /// The context must hold exactly the model's width of normalized values,
    /// oldest first. The caller's slice is not modified.
    pub fn forecast(&self, initial_context: &[f64], horizon: usize) -> Result<ForecastPath> {
        if initial_context.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "Initial context must not be empty".to_string(),
            ));
        }
        if initial_context.len() != self.model.width() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.model.width(),
                got: initial_context.len(),
            });
        }

        let mut context: VecDeque<f64> = initial_context.iter().copied().collect();
        let mut values = Vec::with_capacity(horizon);
        let mut extrapolated_steps = Vec::new();

        for step in 1..=horizon {
            let prediction = self.model.predict(context.make_contiguous())?;
            if !prediction.is_finite() {
                return Err(ForecastError::ModelError(format!(
                    "{} produced a non-finite prediction at step {}",
                    self.model.name(),
                    step
                )));
            }

            if let Some((lower, upper)) = self.bounds {
                if prediction < lower || prediction > upper {
                    warn!(
                        step,
                        prediction, lower, upper, "forecast extrapolates beyond the training range"
                    );
                    extrapolated_steps.push(step);
                }
            }

            values.push(prediction);
            context.pop_front();
            context.push_back(prediction);
        }

        debug!(
            model = self.model.name(),
            horizon,
            extrapolated = extrapolated_steps.len(),
            "recursive forecast complete"
        );

        Ok(ForecastPath {
            values,
            extrapolated_steps,
        })
    }
}

/// Forecast `horizon` steps by feeding each prediction back as input
pub fn forecast_recursive<R>(model: &R, initial_context: &[f64], horizon: usize) -> Result<Vec<f64>>
where
    R: FittedRegressor + ?Sized,
{
    RecursiveForecaster::new(model)
        .forecast(initial_context, horizon)
        .map(|path| path.values)
}
