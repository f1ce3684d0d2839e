//! Levenberg–Marquardt nonlinear least squares.
//!
//! Minimizes `Σ (y_i - f(x_i; p))^2` for a model supplied as two closures:
//! the value `f(x; p)` and its gradient with respect to `p`.
//!
//! Each step solves the damped system
//!
//! ```text
//! [ J          ]       [ r ]
//! [ sqrt(λ) D  ] δ  =  [ 0 ]
//! ```
//!
//! in the least squares sense with the SVD solver, where `D` is the
//! square root of `diag(JᵀJ)` (Marquardt scaling). Steps that do not lower
//! the SSE are rejected and the damping is raised.

use nalgebra::{DMatrix, DVector};

use crate::math::solve_least_squares;

/// Solver knobs.
#[derive(Debug, Clone, Copy)]
pub struct LmOptions {
    pub max_iters: usize,
    /// Relative SSE improvement below which the fit counts as converged.
    pub tolerance: f64,
    pub initial_lambda: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iters: 500,
            tolerance: 1e-14,
            initial_lambda: 1e-3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LmSolution {
    pub params: Vec<f64>,
    pub sse: f64,
    pub iterations: usize,
    pub converged: bool,
}

const LAMBDA_MAX: f64 = 1e16;
const LAMBDA_MIN: f64 = 1e-15;

/// Run Levenberg–Marquardt from `init`.
///
/// Returns `None` if the starting point already evaluates to a non-finite SSE
/// or no step can be solved at all.
pub fn levenberg_marquardt<F, G>(
    x: &[f64],
    y: &[f64],
    init: &[f64],
    value: F,
    gradient: G,
    opts: &LmOptions,
) -> Option<LmSolution>
where
    F: Fn(f64, &[f64]) -> f64,
    G: Fn(f64, &[f64], &mut [f64]),
{
    let n = x.len().min(y.len());
    let k = init.len();
    if n == 0 || k == 0 {
        return None;
    }

    let sse_of = |p: &[f64]| -> f64 {
        let mut s = 0.0;
        for i in 0..n {
            let r = y[i] - value(x[i], p);
            s += r * r;
        }
        s
    };

    let mut params = init.to_vec();
    let mut sse = sse_of(&params);
    if !sse.is_finite() {
        return None;
    }

    let mut lambda = opts.initial_lambda;
    let mut grad = vec![0.0; k];
    let mut converged = false;
    let mut iterations = 0;

    while iterations < opts.max_iters {
        iterations += 1;
        if sse <= f64::MIN_POSITIVE {
            converged = true;
            break;
        }

        // Jacobian of the model (not of the residual) and current residuals.
        let mut jac = DMatrix::<f64>::zeros(n, k);
        let mut resid = DVector::<f64>::zeros(n);
        for i in 0..n {
            gradient(x[i], &params, &mut grad);
            for j in 0..k {
                jac[(i, j)] = grad[j];
            }
            resid[i] = y[i] - value(x[i], &params);
        }
        if jac.iter().any(|v| !v.is_finite()) {
            break;
        }

        let scale: Vec<f64> = (0..k)
            .map(|j| jac.column(j).norm_squared().max(1e-12).sqrt())
            .collect();

        let mut augmented = DMatrix::<f64>::zeros(n + k, k);
        augmented.view_mut((0, 0), (n, k)).copy_from(&jac);
        let mut rhs = DVector::<f64>::zeros(n + k);
        rhs.rows_mut(0, n).copy_from(&resid);
        let damping = lambda.sqrt();
        for j in 0..k {
            augmented[(n + j, j)] = damping * scale[j];
        }

        let Some(delta) = solve_least_squares(&augmented, &rhs) else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                break;
            }
            continue;
        };

        let candidate: Vec<f64> = params.iter().zip(delta.iter()).map(|(p, d)| p + d).collect();
        let candidate_sse = sse_of(&candidate);

        if candidate_sse.is_finite() && candidate_sse < sse {
            let improvement = (sse - candidate_sse) / sse.max(f64::MIN_POSITIVE);
            params = candidate;
            sse = candidate_sse;
            lambda = (lambda / 10.0).max(LAMBDA_MIN);
            if improvement < opts.tolerance {
                converged = true;
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                // No downhill step exists at any damping: a local minimum.
                converged = true;
                break;
            }
        }
    }

    log::debug!("levenberg-marquardt: {iterations} iterations, sse={sse:.3e}, converged={converged}");

    Some(LmSolution {
        params,
        sse,
        iterations,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp_value(x: f64, p: &[f64]) -> f64 {
        p[0] * (p[1] * x).exp()
    }

    fn exp_grad(x: f64, p: &[f64], out: &mut [f64]) {
        let e = (p[1] * x).exp();
        out[0] = e;
        out[1] = p[0] * x * e;
    }

    #[test]
    fn recovers_exponential_parameters() {
        let x: Vec<f64> = (0..10).map(|i| i as f64 * 0.2).collect();
        let y: Vec<f64> = x.iter().map(|&v| exp_value(v, &[2.0, 0.7])).collect();

        let sol = levenberg_marquardt(&x, &y, &[1.0, 0.1], exp_value, exp_grad, &LmOptions::default())
            .unwrap();
        assert!(sol.converged);
        assert!((sol.params[0] - 2.0).abs() < 1e-6, "{:?}", sol.params);
        assert!((sol.params[1] - 0.7).abs() < 1e-6, "{:?}", sol.params);
        assert!(sol.sse < 1e-10);
    }

    #[test]
    fn non_finite_start_is_rejected() {
        let x = [1.0, 2.0];
        let y = [1.0, 2.0];
        let value = |_: f64, p: &[f64]| p[0].ln();
        let grad = |_: f64, p: &[f64], out: &mut [f64]| out[0] = 1.0 / p[0];
        assert!(levenberg_marquardt(&x, &y, &[-1.0], value, grad, &LmOptions::default()).is_none());
    }
}
