//! Analysis configuration
//!
//! Every section implements `Default` with the values of the reference run,
//! and missing JSON fields fall back to those defaults.

use crate::data::Frequency;
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Windowed sequence forecaster configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Lookback window width W
    pub window_width: usize,
    /// Forecast horizon K
    pub horizon: usize,
    /// Share of windows used for training
    pub train_ratio: f64,
    /// Target range of the normalization
    pub feature_range: (f64, f64),
    /// Coverage of the opt-in uncertainty bands; `None` keeps the bare recursion
    pub uncertainty_level: Option<f64>,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            window_width: 4,
            horizon: 5,
            train_ratio: 0.8,
            feature_range: (0.0, 1.0),
            uncertainty_level: None,
        }
    }
}

impl SequenceConfig {
    /// Check the configuration for values the forecaster cannot use
    pub fn validate(&self) -> Result<()> {
        if self.window_width == 0 {
            return Err(ForecastError::InvalidParameter(
                "Window width must be positive".to_string(),
            ));
        }
        if self.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Forecast horizon must be positive".to_string(),
            ));
        }
        if !(self.train_ratio > 0.0 && self.train_ratio <= 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Train ratio must be in (0, 1], got {}",
                self.train_ratio
            )));
        }
        let (lo, hi) = self.feature_range;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(ForecastError::InvalidParameter(format!(
                "Feature range ({}, {}) must have lower < upper",
                lo, hi
            )));
        }
        if let Some(level) = self.uncertainty_level {
            if level <= 0.0 || level >= 1.0 {
                return Err(ForecastError::InvalidParameter(
                    "Uncertainty level must be between 0 and 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Recurrent network training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecurrentConfig {
    /// Units in the LSTM layer
    pub hidden_units: usize,
    /// Passes over the training windows
    pub epochs: usize,
    /// Windows per gradient step
    pub batch_size: usize,
    /// Adam step size
    pub learning_rate: f64,
    /// Trailing share of training windows held out for validation loss
    pub validation_split: f64,
    /// Seed for weight initialisation and shuffling
    pub seed: u64,
}

impl Default for RecurrentConfig {
    fn default() -> Self {
        Self {
            hidden_units: 50,
            epochs: 100,
            batch_size: 8,
            learning_rate: 0.01,
            validation_split: 0.2,
            seed: 42,
        }
    }
}

impl RecurrentConfig {
    /// Check the configuration for values training cannot use
    pub fn validate(&self) -> Result<()> {
        if self.hidden_units == 0 || self.epochs == 0 || self.batch_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "Hidden units, epochs and batch size must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "Learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(ForecastError::InvalidParameter(format!(
                "Validation split must be in [0, 1), got {}",
                self.validation_split
            )));
        }
        Ok(())
    }
}

/// ARIMA orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self { p: 2, d: 1, q: 2 }
    }
}

/// Configuration of a full analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub sequence: SequenceConfig,
    pub network: RecurrentConfig,
    pub arima: ArimaOrder,
    /// Coverage of the trend model's prediction intervals
    pub trend_interval_level: f64,
    /// Spacing of the input series
    pub frequency: Frequency,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sequence: SequenceConfig::default(),
            network: RecurrentConfig::default(),
            arima: ArimaOrder::default(),
            trend_interval_level: 0.8,
            frequency: Frequency::Annual,
        }
    }
}

impl AnalysisConfig {
    /// Read a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.sequence.validate()?;
        self.network.validate()?;
        if self.trend_interval_level <= 0.0 || self.trend_interval_level >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "Trend interval level must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }
}
