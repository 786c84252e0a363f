//! Windowed sequence forecasting
//!
//! A regression function maps a window of `W` normalized values to the next
//! normalized value. [`Regressor`] fits one on training windows and
//! [`FittedRegressor`] predicts with it; any function approximator with this
//! signature can drive the recursive forecaster in [`forecaster`].

use crate::error::{ForecastError, Result};
use crate::metrics;
use incidence_math::{MinMaxScaler, Window};
use std::fmt::Debug;

pub mod forecaster;
pub mod linear;
pub mod pipeline;
pub mod recurrent;

pub use forecaster::{forecast_recursive, ForecastPath, RecursiveForecaster};
pub use linear::{FittedLinearWindow, LinearWindowRegressor};
pub use pipeline::{SequenceForecast, SequenceForecaster};
pub use recurrent::{RecurrentNetwork, RecurrentRegressor};

/// A trained function from a context window to the next normalized value
pub trait FittedRegressor: Debug {
    /// Predict the value following `context`
    fn predict(&self, context: &[f64]) -> Result<f64>;

    /// Context width the function was trained on
    fn width(&self) -> usize;

    /// Name of the function
    fn name(&self) -> &str;
}

/// A learning algorithm producing a [`FittedRegressor`]
pub trait Regressor: Debug {
    /// The type of trained function produced
    type Fitted: FittedRegressor;

    /// Fit on training windows
    fn fit(&self, windows: &[Window]) -> Result<Self::Fitted>;

    /// Name of the algorithm
    fn name(&self) -> &str;
}

/// Common context width of a set of windows
pub(crate) fn window_width(windows: &[Window]) -> Result<usize> {
    let width = windows
        .first()
        .map(Window::width)
        .ok_or(ForecastError::InsufficientData { needed: 1, got: 0 })?;

    if let Some(bad) = windows.iter().find(|w| w.width() != width) {
        return Err(ForecastError::DimensionMismatch {
            expected: width,
            got: bad.width(),
        });
    }
    if width == 0 {
        return Err(ForecastError::InvalidParameter(
            "Windows must have a non-empty context".to_string(),
        ));
    }
    Ok(width)
}

/// Reject a context whose length differs from the trained width
pub(crate) fn check_context(expected: usize, context: &[f64]) -> Result<()> {
    if context.len() != expected {
        return Err(ForecastError::DimensionMismatch {
            expected,
            got: context.len(),
        });
    }
    Ok(())
}

/// Baseline that predicts the mean of its context
#[derive(Debug, Clone, Default)]
pub struct ContextMean;

/// Trained [`ContextMean`]
#[derive(Debug, Clone)]
pub struct FittedContextMean {
    width: usize,
}

impl ContextMean {
    /// A fitted mean function for contexts of `width` values
    pub fn with_width(width: usize) -> FittedContextMean {
        FittedContextMean { width }
    }
}

impl Regressor for ContextMean {
    type Fitted = FittedContextMean;

    fn fit(&self, windows: &[Window]) -> Result<Self::Fitted> {
        Ok(FittedContextMean {
            width: window_width(windows)?,
        })
    }

    fn name(&self) -> &str {
        "Context Mean"
    }
}

impl FittedRegressor for FittedContextMean {
    fn predict(&self, context: &[f64]) -> Result<f64> {
        check_context(self.width, context)?;
        Ok(context.iter().sum::<f64>() / context.len() as f64)
    }

    fn width(&self) -> usize {
        self.width
    }

    fn name(&self) -> &str {
        "Context Mean"
    }
}

/// Predict every window's label and map the predictions back to original units
pub fn predict_windows<R>(model: &R, windows: &[Window], scaler: &MinMaxScaler) -> Result<Vec<f64>>
where
    R: FittedRegressor + ?Sized,
{
    windows
        .iter()
        .map(|w| model.predict(&w.context).map(|p| scaler.inverse(p)))
        .collect()
}

/// Mean squared error on held-out windows, in original units
///
/// Both predictions and labels are denormalized before comparison so the
/// error is comparable across models.
pub fn evaluate<R>(model: &R, test_windows: &[Window], scaler: &MinMaxScaler) -> Result<f64>
where
    R: FittedRegressor + ?Sized,
{
    if test_windows.is_empty() {
        return Err(ForecastError::ValidationError(
            "No held-out windows to evaluate on".to_string(),
        ));
    }

    let predicted = predict_windows(model, test_windows, scaler)?;
    let actual: Vec<f64> = test_windows.iter().map(|w| scaler.inverse(w.label)).collect();

    metrics::mean_squared_error(&actual, &predicted)
}
