//! Standard-curve calibration for one plate.
//!
//! Steps:
//! 1. blank level = mean of the blank wells (0.0 without blanks)
//! 2. one point per standard concentration: mean replicate absorbance minus
//!    the blank level, ascending by concentration
//! 3. drop the lowest `omit_lower` and highest `omit_upper` points from the
//!    fit (they stay in the result for display)
//! 4. fit the requested model and score it

use crate::domain::{CalibrationResult, FitQuality, ModelKind, StandardPoint};
use crate::error::{PlateError, Result};
use crate::fit::{FitOptions, fit_model};
use crate::math::{mean, r_squared, std_dev};
use crate::plate::{BlankSet, StandardSet};

/// Mean blank absorbance, 0.0 for an empty set.
pub fn blank_level(blanks: &BlankSet) -> f64 {
    blanks.level()
}

/// Fit a calibration curve with default solver options.
pub fn fit_standards(
    standards: &StandardSet,
    blanks: &BlankSet,
    omit_lower: usize,
    omit_upper: usize,
    model: ModelKind,
) -> Result<CalibrationResult> {
    fit_standards_with(standards, blanks, omit_lower, omit_upper, model, &FitOptions::default())
}

pub fn fit_standards_with(
    standards: &StandardSet,
    blanks: &BlankSet,
    omit_lower: usize,
    omit_upper: usize,
    model: ModelKind,
    opts: &FitOptions,
) -> Result<CalibrationResult> {
    let blank = blank_level(blanks);
    let mut points = standard_points(standards, blank);

    let total = points.len();
    let available = total.saturating_sub(omit_lower.saturating_add(omit_upper));
    if available < model.min_points() {
        return Err(PlateError::InsufficientData {
            model,
            available,
            required: model.min_points(),
        });
    }
    for (idx, point) in points.iter_mut().enumerate() {
        point.used = idx >= omit_lower && idx < total - omit_upper;
    }

    let (conc, abs): (Vec<f64>, Vec<f64>) = points
        .iter()
        .filter(|p| p.used)
        .map(|p| (p.concentration, p.absorbance))
        .unzip();

    let fit = fit_model(model, &conc, &abs, opts)?;

    // Score on the model's dependent axis.
    let (observed, fitted): (Vec<f64>, Vec<f64>) = match model {
        ModelKind::Linear => (
            conc.clone(),
            abs.iter().map(|&a| fit.model.forward(a)).collect(),
        ),
        ModelKind::Power | ModelKind::Logistic => (
            abs.clone(),
            conc.iter().map(|&c| fit.model.forward(c)).collect(),
        ),
    };
    let quality = FitQuality {
        r_squared: r_squared(&observed, &fitted),
        sse: fit.sse,
        n: conc.len(),
    };

    log::info!(
        "{} fit on {}/{} standards: params={:?} R²={:.5} blank={:.4}",
        model,
        quality.n,
        total,
        fit.model.params,
        quality.r_squared,
        blank
    );

    Ok(CalibrationResult {
        model: fit.model,
        quality,
        blank_level: blank,
        omit_lower,
        omit_upper,
        points,
    })
}

/// Blank-corrected standard points, ascending by concentration.
///
/// The sort is stable, so equal concentrations keep insertion order (they
/// cannot occur from `StandardSet`, which merges them).
fn standard_points(standards: &StandardSet, blank: f64) -> Vec<StandardPoint> {
    let mut points: Vec<StandardPoint> = standards
        .levels()
        .iter()
        .filter_map(|level| {
            let m = mean(&level.replicates)?;
            Some(StandardPoint {
                concentration: level.concentration,
                absorbance: m - blank,
                absorbance_sd: std_dev(&level.replicates),
                replicates: level.replicates.len(),
                used: false,
            })
        })
        .collect();
    points.sort_by(|a, b| a.concentration.total_cmp(&b.concentration));
    points
}
