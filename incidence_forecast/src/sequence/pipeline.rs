//! End-to-end windowed sequence forecaster
//!
//! Normalizes a series, cuts it into windows, fits a regressor on the
//! training prefix, scores it on the held-out suffix, then forecasts
//! recursively from the last observed window and maps the result back to
//! original units.

use crate::config::SequenceConfig;
use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result, Stage, StageContext};
use crate::sequence::{evaluate, predict_windows, Regressor, RecursiveForecaster};
use chrono::NaiveDate;
use incidence_math::{make_windows, split_windows, MinMaxScaler};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{info, warn};

/// Result of one sequence forecasting run
#[derive(Debug, Clone)]
pub struct SequenceForecast {
    /// Name of the fitted regressor
    pub model: String,
    /// Forecast values in original units, step 1 first
    pub values: Vec<f64>,
    /// The same forecast before denormalization
    pub normalized: Vec<f64>,
    /// Periods the forecast values belong to
    pub periods: Vec<NaiveDate>,
    /// Held-out mean squared error in original units
    pub test_mse: Option<f64>,
    /// Predictions for the held-out windows in original units
    pub test_predictions: Vec<f64>,
    /// Steps whose normalized prediction left the feature range
    pub extrapolated_steps: Vec<usize>,
    /// Lower and upper band per step, when requested and estimable
    pub bands: Option<Vec<(f64, f64)>>,
    /// Scaler fitted on the full series
    pub scaler: MinMaxScaler,
}

impl SequenceForecast {
    /// Held-out root mean squared error in original units
    pub fn test_rmse(&self) -> Option<f64> {
        self.test_mse.map(f64::sqrt)
    }

    /// Number of forecast steps
    pub fn horizon(&self) -> usize {
        self.values.len()
    }
}

/// Windowed sequence forecaster
#[derive(Debug, Clone, Default)]
pub struct SequenceForecaster {
    config: SequenceConfig,
}

impl SequenceForecaster {
    /// Create a forecaster from its configuration
    pub fn new(config: SequenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use
    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// Fit `regressor` on `series` and forecast `horizon` periods past its end
    pub fn run<G: Regressor>(&self, series: &TimeSeriesData, regressor: &G) -> Result<SequenceForecast> {
        let width = self.config.window_width;
        let horizon = self.config.horizon;

        let scaler = MinMaxScaler::fit_with_range(series.values(), self.config.feature_range)
            .stage(Stage::Normalization)?;
        let normalized = scaler.transform_all(series.values());

        let windows = make_windows(&normalized, width).stage(Stage::Windowing)?;
        let (train, test) =
            split_windows(&windows, self.config.train_ratio).stage(Stage::Windowing)?;
        info!(
            windows = windows.len(),
            train = train.len(),
            test = test.len(),
            width,
            "series windowed"
        );

        let fitted = regressor.fit(&train).stage(Stage::Fitting)?;

        let (test_mse, test_predictions) = if test.is_empty() {
            warn!("train ratio leaves no held-out windows, skipping evaluation");
            (None, Vec::new())
        } else {
            let mse = evaluate(&fitted, &test, &scaler).stage(Stage::Evaluation)?;
            let predictions = predict_windows(&fitted, &test, &scaler).stage(Stage::Evaluation)?;
            info!(model = regressor.name(), mse, rmse = mse.sqrt(), "held-out evaluation");
            (Some(mse), predictions)
        };

        let context = &normalized[normalized.len() - width..];
        let (lower, upper) = scaler.feature_range();
        let path = RecursiveForecaster::new(&fitted)
            .with_bounds(lower, upper)
            .forecast(context, horizon)
            .stage(Stage::Forecasting)?;

        let values = scaler.inverse_all(&path.values);
        let periods = series.future_periods(horizon).stage(Stage::Forecasting)?;
        let bands = self.bands(&values, test_mse)?;

        Ok(SequenceForecast {
            model: regressor.name().to_string(),
            values,
            normalized: path.values,
            periods,
            test_mse,
            test_predictions,
            extrapolated_steps: path.extrapolated_steps,
            bands,
            scaler,
        })
    }

    /// `value ± z * sigma * sqrt(h)` with sigma the held-out RMSE
    fn bands(&self, values: &[f64], test_mse: Option<f64>) -> Result<Option<Vec<(f64, f64)>>> {
        let Some(level) = self.config.uncertainty_level else {
            return Ok(None);
        };
        let Some(mse) = test_mse else {
            warn!("no held-out residuals, uncertainty bands unavailable");
            return Ok(None);
        };

        let normal = Normal::new(0.0, 1.0).map_err(|e| ForecastError::ModelError(e.to_string()))?;
        let z = normal.inverse_cdf(0.5 + level / 2.0);
        let sigma = mse.sqrt();

        Ok(Some(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    let margin = z * sigma * ((i + 1) as f64).sqrt();
                    (v - margin, v + margin)
                })
                .collect(),
        ))
    }
}
