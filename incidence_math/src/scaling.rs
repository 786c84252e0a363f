//! Reversible min-max normalization
//!
//! A [`MinMaxScaler`] captures the minimum and maximum of a series once and
//! maps values into a target range (default `[0, 1]`). The same parameters
//! invert the mapping, so values survive a transform/inverse round trip up to
//! floating-point error.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Default target range of the normalization
pub const DEFAULT_FEATURE_RANGE: (f64, f64) = (0.0, 1.0);

/// Min-max scaler fitted on a full series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
    feature_range: (f64, f64),
}

impl MinMaxScaler {
    /// Fit a scaler mapping the series onto `[0, 1]`
    pub fn fit(series: &[f64]) -> Result<Self> {
        Self::fit_with_range(series, DEFAULT_FEATURE_RANGE)
    }

    /// Fit a scaler mapping the series onto `feature_range`
    ///
    /// Fails with [`MathError::DegenerateRange`] when every value is equal,
    /// because the scaling factor would be a division by zero.
    pub fn fit_with_range(series: &[f64], feature_range: (f64, f64)) -> Result<Self> {
        if series.is_empty() {
            return Err(MathError::InsufficientData { needed: 1, got: 0 });
        }

        let (lo, hi) = feature_range;
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(MathError::InvalidInput(format!(
                "Feature range ({}, {}) must be finite with lower < upper",
                lo, hi
            )));
        }

        if let Some(bad) = series.iter().find(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(format!(
                "Cannot normalize non-finite value {}",
                bad
            )));
        }

        let min = series.iter().copied().fold(f64::INFINITY, f64::min);
        let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if max == min {
            return Err(MathError::DegenerateRange { value: min });
        }

        Ok(Self {
            min,
            max,
            feature_range,
        })
    }

    /// Map a raw value into the feature range
    pub fn transform(&self, value: f64) -> f64 {
        let (lo, hi) = self.feature_range;
        lo + (value - self.min) / (self.max - self.min) * (hi - lo)
    }

    /// Map a normalized value back into original units
    pub fn inverse(&self, normalized: f64) -> f64 {
        let (lo, hi) = self.feature_range;
        self.min + (normalized - lo) / (hi - lo) * (self.max - self.min)
    }

    /// Transform every value of a slice
    pub fn transform_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.transform(v)).collect()
    }

    /// Inverse-transform every value of a slice
    pub fn inverse_all(&self, normalized: &[f64]) -> Vec<f64> {
        normalized.iter().map(|&v| self.inverse(v)).collect()
    }

    /// Minimum of the fitted series
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Maximum of the fitted series
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Target range of the normalized values
    pub fn feature_range(&self) -> (f64, f64) {
        self.feature_range
    }
}
