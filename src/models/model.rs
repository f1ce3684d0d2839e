//! Calibration curve models: Linear, Power and 4-parameter logistic.
//!
//! The fitter relies on two primitive operations:
//! - predict `f(x)` given parameters (for residuals, R² and plots)
//! - fill the gradient row `∂f/∂p` (for Levenberg–Marquardt)
//!
//! `FitModel` adds the inverse transform and the orientation-aware
//! `concentration_at` used to back-calculate samples.

use serde::{Deserialize, Serialize};

use crate::domain::{CurveAxis, ModelKind};
use crate::error::{PlateError, Result};

/// Magnitude below which a slope, multiplier or exponent counts as zero.
const NEAR_ZERO: f64 = 1e-12;

/// Evaluate `f(x)` for the given model kind.
///
/// # Panics
/// Panics if `params` is shorter than `model.param_count()`.
pub fn predict(model: ModelKind, x: f64, params: &[f64]) -> f64 {
    match model {
        ModelKind::Linear => params[0] + params[1] * x,
        ModelKind::Power => params[0] + params[1] * x.powf(params[2]),
        ModelKind::Logistic => {
            let (a, b, c, d) = (params[0], params[1], params[2], params[3]);
            d + (a - d) / (1.0 + (x / c).powf(b))
        }
    }
}

/// Fill `∂f/∂p` at `x`.
///
/// # Panics
/// Panics if `out` or `params` is shorter than `model.param_count()`.
pub fn fill_gradient(model: ModelKind, x: f64, params: &[f64], out: &mut [f64]) {
    match model {
        ModelKind::Linear => {
            out[0] = 1.0;
            out[1] = x;
        }
        ModelKind::Power => {
            let (m, p) = (params[1], params[2]);
            let xp = x.powf(p);
            out[0] = 1.0;
            out[1] = xp;
            out[2] = if x > 0.0 { m * xp * x.ln() } else { 0.0 };
        }
        ModelKind::Logistic => {
            let (a, b, c, d) = (params[0], params[1], params[2], params[3]);
            let ratio = x / c;
            let u = ratio.powf(b);
            let denom = 1.0 + u;
            out[0] = 1.0 / denom;
            out[3] = u / denom;
            if x > 0.0 && u.is_finite() {
                let df_du = -(a - d) / (denom * denom);
                out[1] = df_du * u * ratio.ln();
                out[2] = df_du * (-b * u / c);
            } else {
                out[1] = 0.0;
                out[2] = 0.0;
            }
        }
    }
}

/// A fitted calibration curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitModel {
    pub kind: ModelKind,
    pub params: Vec<f64>,
}

impl FitModel {
    pub fn new(kind: ModelKind, params: Vec<f64>) -> Result<Self> {
        if params.len() != kind.param_count() {
            return Err(PlateError::FitDomain(format!(
                "{kind} model needs {} parameters, got {}",
                kind.param_count(),
                params.len()
            )));
        }
        Ok(Self { kind, params })
    }

    pub fn linear(intercept: f64, slope: f64) -> Self {
        Self {
            kind: ModelKind::Linear,
            params: vec![intercept, slope],
        }
    }

    pub fn forward(&self, x: f64) -> f64 {
        predict(self.kind, x, &self.params)
    }

    /// Solve `forward(x) = y` for `x`.
    ///
    /// Fails instead of returning NaN/Inf when the curve cannot be inverted
    /// at `y` (flat curve, or `y` outside the logistic asymptotes).
    pub fn inverse(&self, y: f64) -> Result<f64> {
        let x = match self.kind {
            ModelKind::Linear => {
                let (intercept, slope) = (self.params[0], self.params[1]);
                if slope.abs() < NEAR_ZERO {
                    return Err(PlateError::FitDomain(format!(
                        "linear slope {slope:e} is too close to zero to invert"
                    )));
                }
                (y - intercept) / slope
            }
            ModelKind::Power => {
                let (intercept, multiplier, power) = (self.params[0], self.params[1], self.params[2]);
                if multiplier.abs() < NEAR_ZERO || power.abs() < NEAR_ZERO {
                    return Err(PlateError::FitDomain(format!(
                        "power curve (multiplier={multiplier:e}, power={power:e}) cannot be inverted"
                    )));
                }
                let base = (y - intercept) / multiplier;
                if base < 0.0 {
                    return Err(PlateError::FitDomain(format!(
                        "absorbance {y:.4} lies below the power curve intercept {intercept:.4}"
                    )));
                }
                base.powf(1.0 / power)
            }
            ModelKind::Logistic => {
                let (a, b, c, d) = (self.params[0], self.params[1], self.params[2], self.params[3]);
                if b.abs() < NEAR_ZERO {
                    return Err(PlateError::FitDomain("logistic slope b is zero".to_string()));
                }
                let ratio = (a - y) / (y - d);
                if !(ratio.is_finite() && ratio > 0.0) {
                    let (lo, hi) = if a < d { (a, d) } else { (d, a) };
                    return Err(PlateError::FitDomain(format!(
                        "absorbance {y:.4} is outside the logistic range ({lo:.4}, {hi:.4})"
                    )));
                }
                c * ratio.powf(1.0 / b)
            }
        };

        if x.is_finite() {
            Ok(x)
        } else {
            Err(PlateError::FitDomain(format!(
                "{} inverse is not finite at {y}",
                self.kind
            )))
        }
    }

    /// Concentration for a blank-corrected absorbance.
    pub fn concentration_at(&self, absorbance: f64) -> Result<f64> {
        match self.kind.axis() {
            CurveAxis::ConcentrationFromAbsorbance => {
                let c = self.forward(absorbance);
                if c.is_finite() {
                    Ok(c)
                } else {
                    Err(PlateError::FitDomain(format!(
                        "non-finite concentration at absorbance {absorbance}"
                    )))
                }
            }
            CurveAxis::AbsorbanceFromConcentration => self.inverse(absorbance),
        }
    }

    /// Blank-corrected absorbance expected at a concentration.
    pub fn absorbance_at(&self, concentration: f64) -> Result<f64> {
        match self.kind.axis() {
            CurveAxis::ConcentrationFromAbsorbance => self.inverse(concentration),
            CurveAxis::AbsorbanceFromConcentration => {
                let y = self.forward(concentration);
                if y.is_finite() {
                    Ok(y)
                } else {
                    Err(PlateError::FitDomain(format!(
                        "non-finite absorbance at concentration {concentration}"
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_round_trip() {
        let m = FitModel::linear(2.0, 3.0);
        for &x in &[-4.0, 0.0, 0.25, 1.0, 17.5] {
            let back = m.inverse(3.0 * x + 2.0).unwrap();
            assert!((back - x).abs() < 1e-9, "x={x} back={back}");
        }
    }

    #[test]
    fn linear_flat_slope_is_domain_error() {
        let m = FitModel::linear(1.0, 0.0);
        assert!(matches!(m.inverse(1.0), Err(PlateError::FitDomain(_))));
    }

    #[test]
    fn power_inverse_undoes_forward() {
        let m = FitModel::new(ModelKind::Power, vec![0.05, 0.2, 0.8]).unwrap();
        for &x in &[0.5, 1.0, 3.0, 10.0] {
            let back = m.inverse(m.forward(x)).unwrap();
            assert!((back - x).abs() < 1e-9);
        }
        assert!(m.inverse(0.01).is_err());
    }

    #[test]
    fn logistic_inverse_respects_asymptotes() {
        let m = FitModel::new(ModelKind::Logistic, vec![0.05, 1.5, 10.0, 2.0]).unwrap();
        for &x in &[1.0, 5.0, 10.0, 40.0] {
            let back = m.inverse(m.forward(x)).unwrap();
            assert!((back - x).abs() / x < 1e-9);
        }
        assert!(m.inverse(2.5).is_err());
        assert!(m.inverse(0.01).is_err());
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let cases = [
            (ModelKind::Power, vec![0.1, 0.3, 1.2]),
            (ModelKind::Logistic, vec![0.05, 1.5, 10.0, 2.0]),
        ];
        for (kind, params) in cases {
            let mut grad = vec![0.0; params.len()];
            fill_gradient(kind, 4.0, &params, &mut grad);
            for j in 0..params.len() {
                let h = 1e-6 * params[j].abs().max(1.0);
                let mut up = params.clone();
                let mut down = params.clone();
                up[j] += h;
                down[j] -= h;
                let fd = (predict(kind, 4.0, &up) - predict(kind, 4.0, &down)) / (2.0 * h);
                assert!((fd - grad[j]).abs() < 1e-6, "{kind} param {j}: fd={fd} grad={}", grad[j]);
            }
        }
    }

    #[test]
    fn concentration_orientation() {
        // Linear predicts concentration directly from absorbance.
        let lin = FitModel::linear(0.0, 10.0);
        assert!((lin.concentration_at(0.2).unwrap() - 2.0).abs() < 1e-12);

        let pow = FitModel::new(ModelKind::Power, vec![0.0, 0.1, 1.0]).unwrap();
        assert!((pow.concentration_at(0.2).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn wrong_parameter_count_is_rejected() {
        assert!(FitModel::new(ModelKind::Logistic, vec![1.0, 2.0]).is_err());
    }
}
