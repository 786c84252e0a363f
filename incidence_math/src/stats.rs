//! Descriptive statistics and differencing helpers

use crate::{MathError, Result};

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData { needed: 1, got: 0 });
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator)
pub fn std_dev(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Err(MathError::InsufficientData {
            needed: 2,
            got: values.len(),
        });
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Ok(variance.sqrt())
}

/// Apply first differences `order` times
pub fn difference(values: &[f64], order: usize) -> Vec<f64> {
    let mut current = values.to_vec();
    for _ in 0..order {
        current = current.windows(2).map(|w| w[1] - w[0]).collect();
    }
    current
}

/// Undo [`difference`] for values forecast past the end of `history`
///
/// `history` is the undifferenced series the forecasts continue from and
/// `forecasts` are on the `order`-times differenced scale.
pub fn integrate(history: &[f64], forecasts: &[f64], order: usize) -> Result<Vec<f64>> {
    if order == 0 {
        return Ok(forecasts.to_vec());
    }
    if history.len() < order {
        return Err(MathError::InsufficientData {
            needed: order,
            got: history.len(),
        });
    }

    // The last value of each differencing level anchors the cumulative sum
    let mut anchors = Vec::with_capacity(order);
    let mut level = history.to_vec();
    for _ in 0..order {
        anchors.push(*level.last().unwrap_or(&0.0));
        level = difference(&level, 1);
    }

    let mut current = forecasts.to_vec();
    for anchor in anchors.into_iter().rev() {
        let mut acc = anchor;
        for value in current.iter_mut() {
            acc += *value;
            *value = acc;
        }
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mean_and_std() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(mean(&values).unwrap(), 30.0);
        assert_abs_diff_eq!(std_dev(&values).unwrap(), 15.811388300841896, epsilon = 1e-12);
        assert!(mean(&[]).is_err());
        assert!(std_dev(&[1.0]).is_err());
    }

    #[test]
    fn test_difference() {
        let values = [1.0, 4.0, 9.0, 16.0, 25.0];
        assert_eq!(difference(&values, 1), vec![3.0, 5.0, 7.0, 9.0]);
        assert_eq!(difference(&values, 2), vec![2.0, 2.0, 2.0]);
        assert_eq!(difference(&values, 0), values.to_vec());
    }

    #[test]
    fn test_integrate_inverts_difference() {
        let values = [1.0, 4.0, 9.0, 16.0, 25.0, 36.0, 49.0];
        let (history, future) = values.split_at(5);

        let first = difference(&values, 1);
        let restored = integrate(history, &first[4..], 1).unwrap();
        assert_eq!(restored, future.to_vec());

        let second = difference(&values, 2);
        let restored = integrate(history, &second[3..], 2).unwrap();
        for (r, f) in restored.iter().zip(future.iter()) {
            assert_abs_diff_eq!(*r, *f, epsilon = 1e-12);
        }
    }
}
