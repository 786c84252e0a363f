//! ARIMA models for time series forecasting

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use incidence_math::regression::least_squares;
use incidence_math::stats;

/// Ridge penalty keeping the normal equations solvable on short series
const RIDGE: f64 = 1e-8;

/// ARIMA model (AutoRegressive Integrated Moving Average)
///
/// Coefficients are estimated with the Hannan-Rissanen procedure: a long
/// autoregression supplies residual estimates, then the differenced series
/// is regressed on its own lags and the lagged residuals.
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    /// AR order (p)
    p: usize,
    /// Differencing order (d)
    d: usize,
    /// MA order (q)
    q: usize,
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArimaModel {
    /// Name of the model
    name: String,
    /// Differencing order (d)
    d: usize,
    /// Constant term, only estimated when d == 0
    intercept: f64,
    /// Fitted AR coefficients
    ar_coefficients: Vec<f64>,
    /// Fitted MA coefficients
    ma_coefficients: Vec<f64>,
    /// Historical data on the original scale
    historical_data: Vec<f64>,
    /// Historical data after differencing
    differenced: Vec<f64>,
    /// One-step residuals on the differenced scale
    residuals: Vec<f64>,
}

impl ArimaModel {
    /// Create a new ARIMA model
    pub fn new(p: usize, d: usize, q: usize) -> Result<Self> {
        if d > 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "Differencing order {} is not supported (max 2)",
                d
            )));
        }

        Ok(Self {
            name: format!("ARIMA({},{},{})", p, d, q),
            p,
            d,
            q,
        })
    }

    /// Model orders as (p, d, q)
    pub fn order(&self) -> (usize, usize, usize) {
        (self.p, self.d, self.q)
    }

    /// Fit the model to raw values
    pub fn fit_values(&self, values: &[f64]) -> Result<TrainedArimaModel> {
        if values.len() <= self.d {
            return Err(ForecastError::InsufficientData {
                needed: self.d + 1,
                got: values.len(),
            });
        }

        let differenced = stats::difference(values, self.d);
        let with_intercept = self.d == 0;

        let (intercept, ar_coefficients, ma_coefficients) = if self.q == 0 {
            self.regress(&differenced, None, self.p, 0, self.p, with_intercept)?
        } else {
            // Stage 1: long autoregression for residual estimates
            let offset = usize::from(with_intercept);
            let long_order = self.long_order(differenced.len(), offset).ok_or(
                ForecastError::InsufficientData {
                    needed: self.min_differenced_len(offset) + self.d,
                    got: values.len(),
                },
            )?;
            let (c, long_ar, _) =
                self.regress(&differenced, None, long_order, 0, long_order, with_intercept)?;
            let first_stage = one_step_residuals(&differenced, c, &long_ar, &[]);

            // Stage 2: regression on lagged values and lagged residuals
            let start = self.p.max(long_order + self.q);
            self.regress(
                &differenced,
                Some(&first_stage),
                self.p,
                self.q,
                start,
                with_intercept,
            )?
        };

        let residuals =
            one_step_residuals(&differenced, intercept, &ar_coefficients, &ma_coefficients);

        Ok(TrainedArimaModel {
            name: self.name.clone(),
            d: self.d,
            intercept,
            ar_coefficients,
            ma_coefficients,
            historical_data: values.to_vec(),
            differenced,
            residuals,
        })
    }

    /// Order of the stage-one autoregression for a differenced series of `len`
    ///
    /// `p + q + 1`, shortened so both regression stages keep more rows than
    /// coefficients. `None` when not even a first-order autoregression fits.
    fn long_order(&self, len: usize, offset: usize) -> Option<usize> {
        let stage_one = len.saturating_sub(offset + 1) / 2;
        let stage_two = len.saturating_sub(offset + self.p + 2 * self.q + 1);
        let order = (self.p + self.q + 1).min(stage_one).min(stage_two);
        (order > 0).then_some(order)
    }

    /// Shortest differenced series both stages can be fitted on
    fn min_differenced_len(&self, offset: usize) -> usize {
        (offset + 3)
            .max(offset + self.p + 2 * self.q + 2)
            .max(offset + 2 * self.p + self.q + 1)
    }

    /// Least-squares regression of `z[t]` on `z[t-1..=t-p]` and `e[t-1..=t-q]`
    fn regress(
        &self,
        z: &[f64],
        residuals: Option<&[f64]>,
        p: usize,
        q: usize,
        start: usize,
        with_intercept: bool,
    ) -> Result<(f64, Vec<f64>, Vec<f64>)> {
        let offset = usize::from(with_intercept);
        let cols = offset + p + q;
        if cols == 0 {
            return Ok((0.0, Vec::new(), Vec::new()));
        }

        let rows_available = z.len().saturating_sub(start);
        if rows_available < cols + 1 {
            return Err(ForecastError::InsufficientData {
                needed: start + cols + 1 + self.d,
                got: z.len() + self.d,
            });
        }

        let mut rows = Vec::with_capacity(rows_available);
        let mut targets = Vec::with_capacity(rows_available);
        for t in start..z.len() {
            let mut row = Vec::with_capacity(cols);
            if with_intercept {
                row.push(1.0);
            }
            row.extend((1..=p).map(|i| z[t - i]));
            if let Some(e) = residuals {
                row.extend((1..=q).map(|j| e[t - j]));
            }
            rows.push(row);
            targets.push(z[t]);
        }

        let coefficients = least_squares(&rows, &targets, RIDGE)?;
        let intercept = if with_intercept { coefficients[0] } else { 0.0 };
        let ar = coefficients[offset..offset + p].to_vec();
        let ma = coefficients[offset + p..].to_vec();

        Ok((intercept, ar, ma))
    }
}

/// One-step-ahead residuals, zero during the warm-up of `ar.len()` values
fn one_step_residuals(z: &[f64], intercept: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut residuals = vec![0.0; z.len()];
    for t in ar.len()..z.len() {
        let prediction = predict_next(&z[..t], &residuals[..t], intercept, ar, ma);
        residuals[t] = z[t] - prediction;
    }
    residuals
}

/// ARMA prediction of the value after `history`
fn predict_next(history: &[f64], shocks: &[f64], intercept: f64, ar: &[f64], ma: &[f64]) -> f64 {
    let t = history.len();
    let mut prediction = intercept;
    for (i, phi) in ar.iter().enumerate() {
        if i < t {
            prediction += phi * history[t - 1 - i];
        }
    }
    for (j, theta) in ma.iter().enumerate() {
        if j < shocks.len() {
            prediction += theta * shocks[shocks.len() - 1 - j];
        }
    }
    prediction
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, data: &TimeSeriesData) -> Result<TrainedArimaModel> {
        self.fit_values(data.values())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedArimaModel {
    /// Fitted AR coefficients
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    /// Fitted MA coefficients
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    /// Constant term of the differenced process
    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let mut history = self.differenced.clone();
        let mut shocks = self.residuals.clone();
        let mut forecasts = Vec::with_capacity(horizon);

        // Future shocks have expectation zero
        for _ in 0..horizon {
            let next = predict_next(
                &history,
                &shocks,
                self.intercept,
                &self.ar_coefficients,
                &self.ma_coefficients,
            );
            history.push(next);
            shocks.push(0.0);
            forecasts.push(next);
        }

        let values = stats::integrate(&self.historical_data, &forecasts, self.d)?;
        ForecastResult::new(values, horizon)
    }

    fn fitted(&self) -> Vec<f64> {
        // One-step errors are identical on the differenced and original scale
        self.historical_data
            .iter()
            .enumerate()
            .map(|(t, &y)| {
                if t < self.d {
                    y
                } else {
                    y - self.residuals[t - self.d]
                }
            })
            .collect()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
