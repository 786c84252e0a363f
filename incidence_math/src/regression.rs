//! Least-squares fitting
//!
//! Contains:
//! - Simple linear regression of values on their position (trend fitting)
//! - Multiple linear regression through the normal equations, with an
//!   optional ridge penalty, solved by Gaussian elimination

use crate::{MathError, Result};

/// Result of a simple linear regression `y = intercept + slope * x`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    /// Slope of the fitted line
    pub slope: f64,
    /// Intercept of the fitted line
    pub intercept: f64,
    /// Number of observations used in the fit
    pub n: usize,
    /// Mean of the regressor
    pub x_mean: f64,
    /// Sum of squared deviations of the regressor
    pub sxx: f64,
    /// Residual sum of squares
    pub ss_residual: f64,
    /// Total sum of squares
    pub ss_total: f64,
}

impl LinearFit {
    /// Predicted value at `x`
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// Residual standard error with `n - 2` degrees of freedom
    pub fn residual_std_error(&self) -> f64 {
        if self.n <= 2 {
            return 0.0;
        }
        (self.ss_residual / (self.n - 2) as f64).sqrt()
    }

    /// Coefficient of determination
    pub fn r_squared(&self) -> Result<f64> {
        if self.ss_total.abs() < 1e-10 {
            return Err(MathError::CalculationError(
                "Cannot calculate R-squared: total sum of squares is too small".to_string(),
            ));
        }
        Ok(1.0 - self.ss_residual / self.ss_total)
    }
}

/// Fit `values[i] = intercept + slope * i` by ordinary least squares
pub fn fit_linear_trend(values: &[f64]) -> Result<LinearFit> {
    let x: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    fit_line(&x, values)
}

/// Fit `y = intercept + slope * x` by ordinary least squares
pub fn fit_line(x: &[f64], y: &[f64]) -> Result<LinearFit> {
    if x.len() != y.len() {
        return Err(MathError::InvalidInput(format!(
            "Regressor length ({}) doesn't match target length ({})",
            x.len(),
            y.len()
        )));
    }
    if y.len() < 2 {
        return Err(MathError::InsufficientData {
            needed: 2,
            got: y.len(),
        });
    }

    let n = y.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        sxy += (xi - x_mean) * (yi - y_mean);
        sxx += (xi - x_mean) * (xi - x_mean);
    }

    if sxx.abs() < 1e-10 {
        return Err(MathError::CalculationError(
            "Cannot calculate slope: x values are too similar".to_string(),
        ));
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;

    let ss_residual = x
        .iter()
        .zip(y.iter())
        .map(|(&xi, &yi)| (yi - (intercept + slope * xi)).powi(2))
        .sum();
    let ss_total = y.iter().map(|&yi| (yi - y_mean).powi(2)).sum();

    Ok(LinearFit {
        slope,
        intercept,
        n: y.len(),
        x_mean,
        sxx,
        ss_residual,
        ss_total,
    })
}

/// Solve `min ||X b - y||^2 + ridge * ||b||^2` for `b`
///
/// `rows` is the design matrix, one row per observation. All rows must have
/// the same number of columns.
pub fn least_squares(rows: &[Vec<f64>], targets: &[f64], ridge: f64) -> Result<Vec<f64>> {
    let cols = rows.first().map_or(0, Vec::len);
    penalized_least_squares(rows, targets, &vec![ridge; cols])
}

/// Solve `min ||X b - y||^2 + sum_j penalties[j] * b_j^2` for `b`
///
/// Like [`least_squares`] with a separate ridge penalty per coefficient, so
/// some coefficients can be left unpenalized.
pub fn penalized_least_squares(
    rows: &[Vec<f64>],
    targets: &[f64],
    penalties: &[f64],
) -> Result<Vec<f64>> {
    if rows.len() != targets.len() {
        return Err(MathError::InvalidInput(format!(
            "Design matrix has {} rows but {} targets were given",
            rows.len(),
            targets.len()
        )));
    }
    let cols = match rows.first() {
        Some(row) if !row.is_empty() => row.len(),
        _ => {
            return Err(MathError::InsufficientData {
                needed: 1,
                got: 0,
            })
        }
    };
    if rows.iter().any(|r| r.len() != cols) {
        return Err(MathError::InvalidInput(
            "Design matrix rows must all have the same length".to_string(),
        ));
    }
    if penalties.len() != cols {
        return Err(MathError::InvalidInput(format!(
            "Expected {} penalties, got {}",
            cols,
            penalties.len()
        )));
    }
    if penalties.iter().any(|&p| !(p >= 0.0)) {
        return Err(MathError::InvalidInput(
            "Ridge penalty must be non-negative".to_string(),
        ));
    }

    // Normal equations: (X'X + ridge I) b = X'y
    let mut xtx = vec![vec![0.0; cols]; cols];
    let mut xty = vec![0.0; cols];
    for (row, &target) in rows.iter().zip(targets.iter()) {
        for i in 0..cols {
            xty[i] += row[i] * target;
            for j in 0..cols {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for (i, diag) in xtx.iter_mut().enumerate() {
        diag[i] += penalties[i];
    }

    solve_linear_system(xtx, xty)
}

/// Solve the square system `a x = b` by Gaussian elimination with partial pivoting
pub fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(
            "Coefficient matrix must be square and match the right-hand side".to_string(),
        ));
    }

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);

        if a[pivot][col].abs() < 1e-12 {
            return Err(MathError::CalculationError(
                "Singular matrix: the regressors are linearly dependent".to_string(),
            ));
        }

        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * solution[k]).sum();
        solution[row] = (b[row] - tail) / a[row][row];
    }

    Ok(solution)
}
