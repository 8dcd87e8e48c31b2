//! Least-squares polynomial fitting
//!
//! Small dense solver for the normal equations of a power-basis
//! polynomial fit. Calibration fits are degree 2..4 over a normalized
//! domain, so the systems are tiny and conditioning is benign.

use crate::error::{EddyError, Result};

/// Fit polynomial coefficients `c[0] + c[1]*x + ... + c[d]*x^d`
/// minimizing squared residuals over the given points.
///
/// Callers should map `xs` into a normalized range (the calibration map
/// uses [-1, 1]) before fitting; raw sensor frequencies span megahertz
/// and would wreck the conditioning of the Vandermonde system.
pub fn polyfit(xs: &[f64], ys: &[f64], degree: usize) -> Result<Vec<f64>> {
    if xs.len() != ys.len() {
        return Err(EddyError::Fit(format!(
            "mismatched point counts: {} x values, {} y values",
            xs.len(),
            ys.len()
        )));
    }
    let n = degree + 1;
    if xs.len() < n {
        return Err(EddyError::Fit(format!(
            "need at least {} points for a degree-{} fit, have {}",
            n,
            degree,
            xs.len()
        )));
    }

    // Normal equations: A[i][j] = sum x^(i+j), b[i] = sum y * x^i
    let mut power_sums = vec![0.0; 2 * degree + 1];
    let mut b = vec![0.0; n];
    for (&x, &y) in xs.iter().zip(ys) {
        let mut xp = 1.0;
        for (i, sum) in power_sums.iter_mut().enumerate() {
            *sum += xp;
            if i < n {
                b[i] += y * xp;
            }
            xp *= x;
        }
    }
    let mut a = vec![vec![0.0; n]; n];
    for (i, row) in a.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = power_sums[i + j];
        }
    }

    solve(&mut a, &mut b)
}

/// Evaluate `c[0] + c[1]*x + ... + c[d]*x^d` by Horner's rule.
pub fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Gaussian elimination with partial pivoting. A vanishing pivot means
/// the fit is degenerate (duplicate or collinear points).
fn solve(a: &mut [Vec<f64>], b: &mut [f64]) -> Result<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);
        if a[pivot_row][col].abs() < f64::EPSILON {
            return Err(EddyError::Fit(
                "singular system: calibration points are degenerate".to_string(),
            ));
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in (row + 1)..n {
            acc -= a[row][k] * x[k];
        }
        x[row] = acc / a[row][row];
    }
    Ok(x)
}
