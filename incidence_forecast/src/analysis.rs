//! Full incidence analysis
//!
//! Runs every model on one series and collects the results into an
//! [`AnalysisReport`]:
//!
//! 1. exploratory summary of the series
//! 2. linear trend on the full series, with prediction intervals
//! 3. ARIMA scored on the positional holdout, then refit on the full series
//! 4. windowed sequence forecaster with the recurrent network
//!
//! Everything runs synchronously on the calling thread.

use crate::config::AnalysisConfig;
use crate::data::{SeriesSummary, TimeSeriesData};
use crate::error::{ForecastError, Result, Stage, StageContext};
use crate::metrics::ModelPerformance;
use crate::models::arima::ArimaModel;
use crate::models::trend::LinearTrend;
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use crate::sequence::{RecurrentRegressor, SequenceForecast, SequenceForecaster};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// One forecast period across all models
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    pub period: NaiveDate,
    pub trend: f64,
    pub trend_lower: f64,
    pub trend_upper: f64,
    pub arima: f64,
    pub sequence: f64,
    pub sequence_lower: Option<f64>,
    pub sequence_upper: Option<f64>,
}

/// Everything an analysis run produces
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// When the run finished
    pub generated_at: DateTime<Utc>,
    /// Configuration the run used
    pub config: AnalysisConfig,
    /// Exploratory statistics of the input
    pub summary: SeriesSummary,
    /// Forecasts per future period
    pub forecasts: Vec<ForecastRow>,
    /// Held-out error per model
    pub performance: Vec<ModelPerformance>,
    /// Lowest and highest forecast for the final period across models
    pub final_period_range: (f64, f64),
    /// Sequence forecast steps that left the training range
    pub extrapolated_steps: Vec<usize>,
}

/// Multi-model analysis driver
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    config: AnalysisConfig,
}

impl Analysis {
    /// Create an analysis from a validated configuration
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run every model on `series`
    pub fn run(&self, series: &TimeSeriesData) -> Result<AnalysisReport> {
        let horizon = self.config.sequence.horizon;
        let summary = series.summary()?;
        info!(
            observations = summary.observations,
            first = %summary.first_period,
            last = %summary.last_period,
            "starting analysis"
        );

        let trend = self.run_trend(series, horizon)?;
        let (arima, arima_performance) = self.run_arima(series, horizon)?;
        let sequence = self.run_sequence(series)?;

        let mut performance = Vec::new();
        performance.extend(arima_performance);
        if let Some(mse) = sequence.test_mse {
            performance.push(ModelPerformance::from_mse(sequence.model.clone(), mse));
        }

        let forecasts = assemble_rows(&trend, &arima, &sequence)?;
        let final_period_range = forecasts
            .last()
            .map(|row| {
                let finals = [row.trend, row.arima, row.sequence];
                (
                    finals.iter().copied().fold(f64::INFINITY, f64::min),
                    finals.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                )
            })
            .unwrap_or((f64::NAN, f64::NAN));

        info!(
            periods = forecasts.len(),
            models = performance.len(),
            "analysis complete"
        );

        Ok(AnalysisReport {
            generated_at: Utc::now(),
            config: self.config.clone(),
            summary,
            forecasts,
            performance,
            final_period_range,
            extrapolated_steps: sequence.extrapolated_steps,
        })
    }

    fn run_trend(&self, series: &TimeSeriesData, horizon: usize) -> Result<ForecastResult> {
        let model = LinearTrend::new(self.config.trend_interval_level).stage(Stage::Fitting)?;
        let trained = model.train(series).stage(Stage::Fitting)?;
        info!(model = trained.name(), slope = trained.slope(), "trend fitted");
        let periods = series.future_periods(horizon).stage(Stage::Forecasting)?;
        trained
            .forecast(horizon)
            .and_then(|forecast| forecast.with_periods(periods))
            .stage(Stage::Forecasting)
    }

    fn run_arima(
        &self,
        series: &TimeSeriesData,
        horizon: usize,
    ) -> Result<(ForecastResult, Option<ModelPerformance>)> {
        let order = self.config.arima;
        let model = ArimaModel::new(order.p, order.d, order.q).stage(Stage::Fitting)?;

        let train_ratio = self.config.sequence.train_ratio;
        let performance = if train_ratio < 1.0 {
            let (train, test) = series.split_at_ratio(train_ratio).stage(Stage::Evaluation)?;
            let holdout = model
                .train(&train)
                .and_then(|trained| trained.forecast(test.len()))
                .stage(Stage::Evaluation)?;
            let mse = holdout.mean_squared_error(test.values()).stage(Stage::Evaluation)?;
            info!(model = model.name(), mse, rmse = mse.sqrt(), "held-out evaluation");
            Some(ModelPerformance::from_mse(model.name(), mse))
        } else {
            warn!("train ratio leaves no held-out periods, skipping ARIMA evaluation");
            None
        };

        let refit = model.train(series).stage(Stage::Fitting)?;
        let periods = series.future_periods(horizon).stage(Stage::Forecasting)?;
        let forecast = refit
            .forecast(horizon)
            .and_then(|forecast| forecast.with_periods(periods))
            .stage(Stage::Forecasting)?;
        Ok((forecast, performance))
    }

    fn run_sequence(&self, series: &TimeSeriesData) -> Result<SequenceForecast> {
        let regressor = RecurrentRegressor::new(self.config.network.clone()).stage(Stage::Fitting)?;
        SequenceForecaster::new(self.config.sequence.clone())?.run(series, &regressor)
    }
}

fn assemble_rows(
    trend: &ForecastResult,
    arima: &ForecastResult,
    sequence: &SequenceForecast,
) -> Result<Vec<ForecastRow>> {
    let intervals = trend.intervals().ok_or_else(|| {
        ForecastError::ModelError("Trend forecast has no intervals".to_string())
    })?;
    for (model, periods) in [("Trend", trend.periods()), ("ARIMA", arima.periods())] {
        if periods != Some(sequence.periods.as_slice()) {
            return Err(ForecastError::ValidationError(format!(
                "{} forecast periods do not match the sequence forecast",
                model
            )));
        }
    }

    Ok(sequence
        .periods
        .iter()
        .enumerate()
        .map(|(i, &period)| ForecastRow {
            period,
            trend: trend.values()[i],
            trend_lower: intervals[i].0,
            trend_upper: intervals[i].1,
            arima: arima.values()[i],
            sequence: sequence.values[i],
            sequence_lower: sequence.bands.as_ref().map(|b| b[i].0),
            sequence_upper: sequence.bands.as_ref().map(|b| b[i].1),
        })
        .collect())
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        writeln!(f, "TB Incidence Analysis")?;
        writeln!(
            f,
            "  Observations: {} ({} to {})",
            s.observations, s.first_period, s.last_period
        )?;
        writeln!(
            f,
            "  Incidence: {:.1} -> {:.1} ({:.1}% reduction)",
            s.first_value, s.last_value, s.reduction_pct
        )?;
        writeln!(f)?;
        writeln!(
            f,
            "  {:<12} {:>10} {:>10} {:>10}",
            "Period", "Trend", "ARIMA", "Sequence"
        )?;
        for row in &self.forecasts {
            writeln!(
                f,
                "  {:<12} {:>10.1} {:>10.1} {:>10.1}",
                row.period, row.trend, row.arima, row.sequence
            )?;
        }
        writeln!(f)?;
        for perf in &self.performance {
            writeln!(f, "  {}", perf)?;
        }
        write!(
            f,
            "  Final period range: {:.1} - {:.1}",
            self.final_period_range.0, self.final_period_range.1
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::ContextMean;

    fn annual(values: &[f64]) -> TimeSeriesData {
        let periods = (0..values.len())
            .map(|i| NaiveDate::from_ymd_opt(2000 + i as i32, 1, 1).unwrap())
            .collect();
        TimeSeriesData::new(periods, values.to_vec()).unwrap()
    }

    fn series() -> TimeSeriesData {
        annual(&[
            322.0, 315.0, 308.0, 301.0, 294.0, 287.0, 280.0, 276.0, 273.0, 270.0, 267.0, 264.0,
            258.0, 256.0, 252.0,
        ])
    }

    #[test]
    fn test_model_forecasts_carry_future_periods() {
        let analysis = Analysis::default();
        let series = series();
        let expected = series.future_periods(3).unwrap();

        let trend = analysis.run_trend(&series, 3).unwrap();
        let (arima, performance) = analysis.run_arima(&series, 3).unwrap();

        assert_eq!(trend.periods(), Some(expected.as_slice()));
        assert_eq!(arima.periods(), Some(expected.as_slice()));
        assert!(performance.is_some());
    }

    #[test]
    fn test_rows_require_matching_periods() {
        let analysis = Analysis::default();
        let series = series();
        let sequence = SequenceForecaster::default().run(&series, &ContextMean).unwrap();

        let trend = analysis.run_trend(&series, 5).unwrap();
        let (arima, _) = analysis.run_arima(&series, 5).unwrap();
        let rows = assemble_rows(&trend, &arima, &sequence).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].period, NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());

        let shifted = arima
            .clone()
            .with_periods(annual(&[1.0, 2.0]).future_periods(5).unwrap())
            .unwrap();
        assert!(matches!(
            assemble_rows(&trend, &shifted, &sequence),
            Err(ForecastError::ValidationError(_))
        ));
    }
}
