//! # TB Incidence Workspace
//!
//! Facade over the workspace crates:
//!
//! - [`math`]: normalization, sliding windows and least squares
//! - [`forecast`]: series handling, models, analysis and artifacts
//!
//! ## Example
//!
//! ```
//! use tb_incidence_workspace::forecast::sequence::{forecast_recursive, ContextMean};
//! use tb_incidence_workspace::math::MinMaxScaler;
//!
//! let history = [322.0, 315.0, 308.0, 301.0, 294.0];
//! let scaler = MinMaxScaler::fit(&history).unwrap();
//! let context = scaler.transform_all(&history[1..]);
//!
//! let model = ContextMean::with_width(context.len());
//! let forecast = forecast_recursive(&model, &context, 3).unwrap();
//!
//! assert_eq!(forecast.len(), 3);
//! let first = scaler.inverse(forecast[0]);
//! assert!((first - 304.5).abs() < 1e-9);
//! ```

pub use incidence_forecast as forecast;
pub use incidence_math as math;
