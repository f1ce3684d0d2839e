//! Least squares solver.
//!
//! Solves small, tall problems of the form
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! used directly for the linear standard curve and, with a damping block
//! appended, for every Levenberg–Marquardt step.
//!
//! We solve through SVD rather than QR: nalgebra's `QR::solve` is meant for
//! square systems and panics on tall matrices.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fit `y = intercept + slope * x` and return `(intercept, slope)`.
///
/// Returns `None` for fewer than two points or when `x` has no spread.
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let var_x: f64 = x[..n].iter().map(|v| (v - mean_x).powi(2)).sum();
    if !(var_x.is_finite() && var_x > 1e-24) {
        return None;
    }

    let mut design = DMatrix::<f64>::zeros(n, 2);
    let mut obs = DVector::<f64>::zeros(n);
    for i in 0..n {
        design[(i, 0)] = 1.0;
        design[(i, 1)] = x[i];
        obs[i] = y[i];
    }
    let beta = solve_least_squares(&design, &obs)?;
    Some((beta[0], beta[1]))
}
