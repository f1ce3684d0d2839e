//! Low-level fitting routines for a single model kind.
//!
//! Given the retained standards as parallel arrays
//! - concentrations `c_i`
//! - blank-corrected absorbances `a_i`
//!
//! we fit:
//! - Linear: ordinary least squares of `c` on `a`
//! - Power / Logistic: Levenberg–Marquardt of `a` on `c`, started from a
//!   deterministic initial guess
//!
//! Both paths are deterministic, so refitting identical data yields
//! identical parameters.

use crate::domain::ModelKind;
use crate::error::{PlateError, Result};
use crate::math::{LmOptions, fit_line, levenberg_marquardt, sse};
use crate::models::{FitModel, fill_gradient, predict};

/// Options that affect how nonlinear models are calibrated.
#[derive(Debug, Clone, Default)]
pub struct FitOptions {
    pub lm: LmOptions,
}

/// Best fit for a single model kind.
#[derive(Debug, Clone)]
pub struct ModelFit {
    pub model: FitModel,
    /// SSE on the model's own dependent axis.
    pub sse: f64,
    /// Solver iterations (0 for the closed-form linear fit).
    pub iterations: usize,
}

/// Fit `kind` to the retained standards.
pub fn fit_model(
    kind: ModelKind,
    concentrations: &[f64],
    absorbances: &[f64],
    opts: &FitOptions,
) -> Result<ModelFit> {
    if concentrations.len() != absorbances.len() {
        return Err(PlateError::FitDomain(format!(
            "{} concentrations but {} absorbances",
            concentrations.len(),
            absorbances.len()
        )));
    }

    match kind {
        ModelKind::Linear => fit_linear(concentrations, absorbances),
        ModelKind::Power => {
            let init = power_guess(concentrations, absorbances)?;
            fit_nonlinear(kind, concentrations, absorbances, &init, opts)
        }
        ModelKind::Logistic => {
            let init = logistic_guess(concentrations, absorbances)?;
            fit_nonlinear(kind, concentrations, absorbances, &init, opts)
        }
    }
}

fn fit_linear(concentrations: &[f64], absorbances: &[f64]) -> Result<ModelFit> {
    let (intercept, slope) = fit_line(absorbances, concentrations).ok_or_else(|| {
        PlateError::FitDomain("standard absorbances have no spread; linear fit is degenerate".into())
    })?;
    let model = FitModel::linear(intercept, slope);

    let fitted: Vec<f64> = absorbances.iter().map(|&a| model.forward(a)).collect();
    let residual = sse(concentrations, &fitted);

    Ok(ModelFit {
        model,
        sse: residual,
        iterations: 0,
    })
}

fn fit_nonlinear(
    kind: ModelKind,
    concentrations: &[f64],
    absorbances: &[f64],
    init: &[f64],
    opts: &FitOptions,
) -> Result<ModelFit> {
    let solution = levenberg_marquardt(
        concentrations,
        absorbances,
        init,
        |x, p| predict(kind, x, p),
        |x, p, out| fill_gradient(kind, x, p, out),
        &opts.lm,
    )
    .ok_or_else(|| {
        PlateError::FitDomain(format!(
            "{kind} fit could not start from the initial guess {init:?}"
        ))
    })?;

    if !solution.converged {
        log::warn!(
            "{kind} fit did not converge after {} iterations (sse={:.3e})",
            solution.iterations,
            solution.sse
        );
    }
    if solution.params.iter().any(|v| !v.is_finite()) {
        return Err(PlateError::FitDomain(format!(
            "{kind} fit produced non-finite parameters"
        )));
    }

    Ok(ModelFit {
        model: FitModel::new(kind, solution.params)?,
        sse: solution.sse,
        iterations: solution.iterations,
    })
}

/// Power starting point: straight line through the standards, exponent 1.
fn power_guess(concentrations: &[f64], absorbances: &[f64]) -> Result<Vec<f64>> {
    let (intercept, slope) = fit_line(concentrations, absorbances)
        .ok_or_else(|| PlateError::FitDomain("standard concentrations have no spread".into()))?;
    Ok(vec![intercept, slope, 1.0])
}

/// Logistic starting point: asymptotes just outside the observed response
/// range, midpoint at the geometric mean of the positive concentrations, `b = 1`.
fn logistic_guess(concentrations: &[f64], absorbances: &[f64]) -> Result<Vec<f64>> {
    let lowest = first_by_concentration(concentrations, absorbances, false);
    let highest = first_by_concentration(concentrations, absorbances, true);
    let (Some(low_abs), Some(high_abs)) = (lowest, highest) else {
        return Err(PlateError::FitDomain("no standards to fit".into()));
    };
    let pad = 0.05 * (high_abs - low_abs).abs().max(1e-6);
    let (a, d) = if high_abs >= low_abs {
        (low_abs - pad, high_abs + pad)
    } else {
        (low_abs + pad, high_abs - pad)
    };

    let logs: Vec<f64> = concentrations
        .iter()
        .filter(|&&c| c > 0.0)
        .map(|c| c.ln())
        .collect();
    if logs.is_empty() {
        return Err(PlateError::FitDomain(
            "logistic fit needs at least one positive concentration".into(),
        ));
    }
    let c = (logs.iter().sum::<f64>() / logs.len() as f64).exp();

    Ok(vec![a, 1.0, c, d])
}

/// Absorbance of the lowest (or highest) concentration standard.
fn first_by_concentration(concentrations: &[f64], absorbances: &[f64], highest: bool) -> Option<f64> {
    let pairs = concentrations.iter().zip(absorbances);
    let picked = if highest {
        pairs.max_by(|a, b| a.0.total_cmp(b.0))
    } else {
        pairs.min_by(|a, b| a.0.total_cmp(b.0))
    };
    picked.map(|(_, &a)| a)
}
