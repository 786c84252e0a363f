//! # Incidence Math
//!
//! Numeric building blocks for forecasting annual incidence-rate series.
//! This crate provides the reversible min-max normalization, the sliding
//! window transform that turns a series into supervised training pairs, a
//! small least-squares solver and a handful of descriptive statistics.

use thiserror::Error;

pub mod regression;
pub mod scaling;
pub mod stats;
pub mod windows;

pub use scaling::MinMaxScaler;
pub use windows::{make_windows, split_windows, Window};

/// Errors that can occur in the numeric routines
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data: need at least {needed} values, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Degenerate range: every value equals {value}, normalization is undefined")]
    DegenerateRange { value: f64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for the numeric routines
pub type Result<T> = std::result::Result<T, MathError>;
