//! Error types for the incidence_forecast crate

use incidence_math::MathError;
use std::fmt;
use thiserror::Error;

/// Stage of the forecasting pipeline an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalization,
    Windowing,
    Fitting,
    Evaluation,
    Forecasting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Normalization => "normalization",
            Stage::Windowing => "windowing",
            Stage::Fitting => "fitting",
            Stage::Evaluation => "evaluation",
            Stage::Forecasting => "recursive forecasting",
        };
        f.write_str(name)
    }
}

/// Custom error types for the incidence_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The series has zero variance so normalization is undefined
    #[error("Degenerate range: every value equals {value}")]
    DegenerateRange { value: f64 },

    /// Not enough observations to build even one training pair
    #[error("Insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Input length does not match what a model expects
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error related to parameter validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error raised while fitting or evaluating a model
    #[error("Model error: {0}")]
    ModelError(String),

    /// Error tagged with the pipeline stage that failed
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<ForecastError>,
    },

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from CSV reading or writing
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from JSON serialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl ForecastError {
    /// Tag this error with the stage it happened in
    ///
    /// Errors that already carry a stage keep their original tag.
    pub fn at(self, stage: Stage) -> Self {
        match self {
            tagged @ ForecastError::Stage { .. } => tagged,
            other => ForecastError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage the error was tagged with, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ForecastError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying error with any stage tag removed
    pub fn root(&self) -> &ForecastError {
        match self {
            ForecastError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Extension for attaching a [`Stage`] to a fallible result
pub trait StageContext<T> {
    fn stage(self, stage: Stage) -> Result<T>;
}

impl<T, E: Into<ForecastError>> StageContext<T> for std::result::Result<T, E> {
    fn stage(self, stage: Stage) -> Result<T> {
        self.map_err(|e| e.into().at(stage))
    }
}

impl From<MathError> for ForecastError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::DegenerateRange { value } => ForecastError::DegenerateRange { value },
            MathError::InsufficientData { needed, got } => {
                ForecastError::InsufficientData { needed, got }
            }
            MathError::InvalidInput(msg) => ForecastError::InvalidParameter(msg),
            MathError::CalculationError(msg) => ForecastError::ModelError(msg),
        }
    }
}

impl From<polars::prelude::PolarsError> for ForecastError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}
