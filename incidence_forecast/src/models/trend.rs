//! Additive piecewise-linear trend model with prediction intervals
//!
//! The trend is a line on time scaled to `[0, 1]` whose slope may change at
//! changepoints spread evenly over the first part of the history:
//!
//! ```text
//! y(t) = m + k t + sum_j delta_j * max(t - s_j, 0)
//! ```
//!
//! The slope changes `delta_j` carry a ridge penalty `sigma^2 / tau^2`, with
//! `sigma^2` the residual variance of a single line and `tau` the changepoint
//! prior scale, so the slope only bends where the data insist on it.

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use incidence_math::regression::{fit_linear_trend, penalized_least_squares};
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::debug;

/// Piecewise-linear trend on the period index
#[derive(Debug, Clone)]
pub struct LinearTrend {
    /// Name of the model
    name: String,
    /// Coverage of the prediction intervals
    interval_level: f64,
    /// Maximum number of changepoints
    n_changepoints: usize,
    /// Share of the history changepoints are placed in
    changepoint_range: f64,
    /// Prior scale of the slope changes
    changepoint_prior_scale: f64,
}

/// Trained piecewise-linear trend
#[derive(Debug, Clone)]
pub struct TrainedLinearTrend {
    /// Name of the model
    name: String,
    /// Coverage of the prediction intervals
    interval_level: f64,
    /// Number of training observations
    n: usize,
    /// Divisor mapping values to the scale the coefficients live on
    y_scale: f64,
    /// Changepoint locations in scaled time
    changepoints: Vec<f64>,
    /// `[m, k, delta_1, ..]` in scaled units
    coefficients: Vec<f64>,
    /// Residual standard error in original units
    sigma: f64,
}

impl LinearTrend {
    /// Create a new trend model with intervals at `interval_level` coverage
    pub fn new(interval_level: f64) -> Result<Self> {
        if interval_level <= 0.0 || interval_level >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "Interval level must be between 0 and 1".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Linear Trend (interval={:.0}%)", interval_level * 100.0),
            interval_level,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
        })
    }

    /// Set the maximum number of changepoints, zero gives a single line
    pub fn with_changepoints(mut self, n: usize) -> Self {
        self.n_changepoints = n;
        self
    }

    /// Set the share of the history changepoints are placed in
    pub fn with_changepoint_range(mut self, range: f64) -> Result<Self> {
        if !(range > 0.0 && range <= 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Changepoint range must be in (0, 1], got {}",
                range
            )));
        }
        self.changepoint_range = range;
        Ok(self)
    }

    /// Set the prior scale of the slope changes, larger bends more easily
    pub fn with_changepoint_prior_scale(mut self, scale: f64) -> Result<Self> {
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "Changepoint prior scale must be positive, got {}",
                scale
            )));
        }
        self.changepoint_prior_scale = scale;
        Ok(self)
    }

    /// Changepoint indices: evenly spaced over the first `changepoint_range`
    /// of the history, excluding the first period
    fn changepoint_indices(&self, n: usize) -> Vec<usize> {
        let history = (n as f64 * self.changepoint_range).floor() as usize;
        let count = self.n_changepoints.min(history.saturating_sub(1));
        if count == 0 {
            return Vec::new();
        }
        let last = (history - 1) as f64;
        (1..=count)
            .map(|j| (j as f64 * last / count as f64).round() as usize)
            .collect()
    }
}

/// Design row `[1, t, max(t - s_1, 0), ..]`
fn design_row(t: f64, changepoints: &[f64]) -> Vec<f64> {
    let mut row = Vec::with_capacity(2 + changepoints.len());
    row.push(1.0);
    row.push(t);
    row.extend(changepoints.iter().map(|&s| (t - s).max(0.0)));
    row
}

impl ForecastModel for LinearTrend {
    type Trained = TrainedLinearTrend;

    fn train(&self, data: &TimeSeriesData) -> Result<Self::Trained> {
        let n = data.len();
        if n < 3 {
            return Err(ForecastError::InsufficientData { needed: 3, got: n });
        }

        let span = (n - 1) as f64;
        let y_scale = data.values().iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };
        let scaled: Vec<f64> = data.values().iter().map(|v| v / y_scale).collect();

        let changepoints: Vec<f64> = self
            .changepoint_indices(n)
            .into_iter()
            .map(|i| i as f64 / span)
            .collect();

        // Noise level of a single line sets how much a slope change costs
        let line = fit_linear_trend(&scaled)?;
        let noise = line.residual_std_error().powi(2).max(f64::EPSILON);
        let penalty = noise / self.changepoint_prior_scale.powi(2);

        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| design_row(i as f64 / span, &changepoints))
            .collect();
        let mut penalties = vec![penalty; rows[0].len()];
        penalties[0] = 0.0;
        penalties[1] = 0.0;
        let coefficients = penalized_least_squares(&rows, &scaled, &penalties)?;

        let ss_residual: f64 = rows
            .iter()
            .zip(data.values())
            .map(|(row, &y)| {
                let fitted: f64 = row.iter().zip(&coefficients).map(|(a, b)| a * b).sum();
                (y - fitted * y_scale).powi(2)
            })
            .sum();
        let sigma = (ss_residual / (n - 2) as f64).sqrt();

        debug!(
            changepoints = changepoints.len(),
            penalty,
            sigma,
            "trend fitted"
        );

        Ok(TrainedLinearTrend {
            name: self.name.clone(),
            interval_level: self.interval_level,
            n,
            y_scale,
            changepoints,
            coefficients,
            sigma,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedLinearTrend {
    /// Trend value at period index `x`, zero being the first period
    fn value_at(&self, x: f64) -> f64 {
        let t = x / (self.n - 1) as f64;
        let row = design_row(t, &self.changepoints);
        let scaled: f64 = row.iter().zip(&self.coefficients).map(|(a, b)| a * b).sum();
        scaled * self.y_scale
    }

    /// Slope per period after the last changepoint, the slope forecasts follow
    pub fn slope(&self) -> f64 {
        let scaled: f64 = self.coefficients[1..].iter().sum();
        scaled * self.y_scale / (self.n - 1) as f64
    }

    /// Trend value at the first period
    pub fn intercept(&self) -> f64 {
        self.coefficients[0] * self.y_scale
    }

    /// Changepoint locations as fractional period indices
    pub fn changepoints(&self) -> Vec<f64> {
        let span = (self.n - 1) as f64;
        self.changepoints.iter().map(|s| s * span).collect()
    }

    /// Slope changes per period at each changepoint
    pub fn slope_changes(&self) -> Vec<f64> {
        let span = (self.n - 1) as f64;
        self.coefficients[2..]
            .iter()
            .map(|d| d * self.y_scale / span)
            .collect()
    }

    /// Two-sided Student-t quantile for the interval level
    fn critical_value(&self) -> Result<f64> {
        let freedom = (self.n - 2) as f64;
        let dist = StudentsT::new(0.0, 1.0, freedom)
            .map_err(|e| ForecastError::ModelError(format!("Student-t distribution: {}", e)))?;
        Ok(dist.inverse_cdf(0.5 + self.interval_level / 2.0))
    }
}

impl TrainedForecastModel for TrainedLinearTrend {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let n = self.n as f64;
        let x_mean = (n - 1.0) / 2.0;
        let sxx = n * (n * n - 1.0) / 12.0;
        let t = self.critical_value()?;

        let mut values = Vec::with_capacity(horizon);
        let mut intervals = Vec::with_capacity(horizon);

        for step in 1..=horizon {
            let x = (self.n - 1 + step) as f64;
            let point = self.value_at(x);

            // Prediction standard error grows with distance from the data centre
            let leverage = 1.0 / n + (x - x_mean).powi(2) / sxx;
            let margin = t * self.sigma * (1.0 + leverage).sqrt();

            values.push(point);
            intervals.push((point - margin, point + margin));
        }

        ForecastResult::new_with_intervals(values, horizon, intervals)
    }

    fn fitted(&self) -> Vec<f64> {
        (0..self.n).map(|i| self.value_at(i as f64)).collect()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
