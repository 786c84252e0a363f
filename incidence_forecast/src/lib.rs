//! # Incidence Forecast
//!
//! A Rust library for forecasting annual disease incidence rates.
//!
//! ## Features
//!
//! - Loading and validating equally spaced incidence series (CSV via polars)
//! - Windowed sequence forecasting with recursive multi-step prediction
//! - Linear trend with prediction intervals and ARIMA(p, d, q) models
//! - Held-out evaluation in original units
//! - CSV, JSON and Markdown report artifacts
//! - Incremental data file updates with backups
//!
//! ## Sequence forecasting
//!
//! The core model normalizes the series to `[0, 1]`, learns a function from
//! `W` consecutive values to the next one, and reaches `K` steps ahead by
//! feeding each prediction back as input:
//!
//! ```rust,no_run
//! use incidence_forecast::config::{RecurrentConfig, SequenceConfig};
//! use incidence_forecast::data::DataLoader;
//! use incidence_forecast::sequence::{RecurrentRegressor, SequenceForecaster};
//!
//! # fn main() -> incidence_forecast::error::Result<()> {
//! let series = DataLoader::from_csv("data/tb_incidence_india_2000_2024.csv")?;
//!
//! let forecaster = SequenceForecaster::new(SequenceConfig::default())?;
//! let network = RecurrentRegressor::new(RecurrentConfig::default())?;
//! let forecast = forecaster.run(&series, &network)?;
//!
//! for (period, value) in forecast.periods.iter().zip(&forecast.values) {
//!     println!("{}: {:.1}", period, value);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Full analysis
//!
//! ```rust,no_run
//! use incidence_forecast::analysis::Analysis;
//! use incidence_forecast::config::AnalysisConfig;
//! use incidence_forecast::data::DataLoader;
//! use incidence_forecast::export::write_artifacts;
//!
//! # fn main() -> incidence_forecast::error::Result<()> {
//! let series = DataLoader::from_csv("data/tb_incidence_india_2000_2024.csv")?;
//! let report = Analysis::new(AnalysisConfig::default())?.run(&series)?;
//! write_artifacts("output", &report)?;
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod metrics;
pub mod models;
pub mod sequence;
pub mod updater;

// Re-export commonly used types
pub use crate::analysis::{Analysis, AnalysisReport};
pub use crate::config::AnalysisConfig;
pub use crate::data::{DataLoader, TimeSeriesData};
pub use crate::error::ForecastError;
pub use crate::models::{ForecastModel, ForecastResult};
pub use crate::sequence::{forecast_recursive, SequenceForecaster};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
