//! Sliding windows over a normalized series
//!
//! Each [`Window`] pairs `width` consecutive values (the context) with the
//! value that immediately follows them (the label).

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// A supervised training pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// Consecutive values, oldest first
    pub context: Vec<f64>,
    /// Value immediately following the context
    pub label: f64,
}

impl Window {
    /// Width of the context
    pub fn width(&self) -> usize {
        self.context.len()
    }
}

/// Build every window of `width` values over `series`
///
/// A series of length `n` yields exactly `n - width` windows, earliest first.
/// Window `i` has context `series[i..i + width]` and label `series[i + width]`.
pub fn make_windows(series: &[f64], width: usize) -> Result<Vec<Window>> {
    if width == 0 {
        return Err(MathError::InvalidInput(
            "Window width must be positive".to_string(),
        ));
    }

    if series.len() <= width {
        return Err(MathError::InsufficientData {
            needed: width + 1,
            got: series.len(),
        });
    }

    Ok(series
        .windows(width + 1)
        .map(|w| Window {
            context: w[..width].to_vec(),
            label: w[width],
        })
        .collect())
}

/// Split windows by position into a training prefix and a test suffix
///
/// The training part holds the first `floor(len * train_ratio)` windows so
/// every training window precedes every test window in time.
pub fn split_windows(windows: &[Window], train_ratio: f64) -> Result<(Vec<Window>, Vec<Window>)> {
    if !(train_ratio > 0.0 && train_ratio <= 1.0) {
        return Err(MathError::InvalidInput(format!(
            "Train ratio must be in (0, 1], got {}",
            train_ratio
        )));
    }

    let train_size = (windows.len() as f64 * train_ratio).floor() as usize;
    let (train, test) = windows.split_at(train_size);

    Ok((train.to_vec(), test.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_count_and_contents() {
        let series = [322.0, 315.0, 308.0, 301.0, 294.0, 287.0, 280.0, 276.0];
        let windows = make_windows(&series, 4).unwrap();

        assert_eq!(windows.len(), 4);
        for (i, window) in windows.iter().enumerate() {
            assert_eq!(window.width(), 4);
            assert_eq!(window.context, series[i..i + 4].to_vec());
            assert_eq!(window.label, series[i + 4]);
        }
    }

    #[test]
    fn test_consecutive_contexts_shift_by_one() {
        let series: Vec<f64> = (0..25).map(|i| i as f64).collect();
        let windows = make_windows(&series, 4).unwrap();

        assert_eq!(windows.len(), 21);
        for pair in windows.windows(2) {
            assert_eq!(pair[0].context[1..], pair[1].context[..3]);
            assert_eq!(pair[0].label, pair[1].context[3]);
        }
    }

    #[test]
    fn test_insufficient_data() {
        assert_eq!(
            make_windows(&[1.0, 2.0, 3.0, 4.0], 4).unwrap_err(),
            MathError::InsufficientData { needed: 5, got: 4 }
        );
        assert!(make_windows(&[], 4).is_err());
        assert_eq!(make_windows(&[1.0, 2.0, 3.0, 4.0, 5.0], 4).unwrap().len(), 1);
    }

    #[test]
    fn test_zero_width() {
        assert!(matches!(
            make_windows(&[1.0, 2.0], 0),
            Err(MathError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_split_preserves_order() {
        let series: Vec<f64> = (0..25).map(|i| i as f64).collect();
        let windows = make_windows(&series, 4).unwrap();
        let (train, test) = split_windows(&windows, 0.8).unwrap();

        // floor(21 * 0.8) = 16
        assert_eq!(train.len(), 16);
        assert_eq!(test.len(), 5);
        assert!(train.last().unwrap().label < test.first().unwrap().label);

        let (all, none) = split_windows(&windows, 1.0).unwrap();
        assert_eq!(all.len(), 21);
        assert!(none.is_empty());

        assert!(split_windows(&windows, 0.0).is_err());
        assert!(split_windows(&windows, 1.5).is_err());
    }
}
