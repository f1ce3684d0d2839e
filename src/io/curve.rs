//! Read/write calibration JSON files.
//!
//! Calibration JSON is the "portable" representation of a fitted plate:
//! - model kind + parameters
//! - blank level, omission counts and every standard point
//! - a precomputed curve grid for quick plotting
//!
//! `platecal plot --curve FILE` renders one of these without the plate data.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{CalibrationResult, FitQuality, StandardPoint};
use crate::error::{PlateError, Result};
use crate::models::FitModel;

const GRID_POINTS: usize = 101;

/// Sampled standard curve: blank-corrected absorbance against concentration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub concentration: Vec<f64>,
    pub absorbance: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationFile {
    pub tool: String,
    pub plate: String,
    pub units: String,
    pub model: FitModel,
    pub fit_quality: FitQuality,
    pub blank_level: f64,
    pub omit_lower: usize,
    pub omit_upper: usize,
    pub points: Vec<StandardPoint>,
    pub grid: CurveGrid,
}

impl CalibrationFile {
    pub fn new(plate: &str, units: &str, calibration: &CalibrationResult) -> Self {
        Self {
            tool: format!("platecal {}", env!("CARGO_PKG_VERSION")),
            plate: plate.to_string(),
            units: units.to_string(),
            model: calibration.model.clone(),
            fit_quality: calibration.quality.clone(),
            blank_level: calibration.blank_level,
            omit_lower: calibration.omit_lower,
            omit_upper: calibration.omit_upper,
            points: calibration.points.clone(),
            grid: build_grid(&calibration.model, &calibration.points, GRID_POINTS),
        }
    }
}

/// Write a calibration JSON file.
pub fn write_curve_json(path: &Path, curve: &CalibrationFile) -> Result<()> {
    let file = File::create(path).map_err(|e| PlateError::io(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), curve)?;
    Ok(())
}

/// Read a calibration JSON file.
pub fn read_curve_json(path: &Path) -> Result<CalibrationFile> {
    let file = File::open(path).map_err(|e| PlateError::io(path, e))?;
    let curve: CalibrationFile = serde_json::from_reader(std::io::BufReader::new(file))?;
    FitModel::new(curve.model.kind, curve.model.params.clone())?;
    Ok(curve)
}

/// Sample the curve across the standards' concentration range.
///
/// Concentrations where the curve cannot be evaluated are left out.
pub fn build_grid(model: &FitModel, points: &[StandardPoint], n: usize) -> CurveGrid {
    let n = n.max(2);
    let lo = points.iter().map(|p| p.concentration).fold(f64::INFINITY, f64::min);
    let hi = points
        .iter()
        .map(|p| p.concentration)
        .fold(f64::NEG_INFINITY, f64::max);
    let (c0, c1) = if lo.is_finite() && hi.is_finite() && hi > lo {
        (lo, hi)
    } else if lo.is_finite() {
        ((lo - 0.5).max(0.0), lo + 0.5)
    } else {
        (0.0, 1.0)
    };

    let mut concentration = Vec::with_capacity(n);
    let mut absorbance = Vec::with_capacity(n);
    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        let c = c0 + u * (c1 - c0);
        if let Ok(a) = model.absorbance_at(c) {
            concentration.push(c);
            absorbance.push(a);
        }
    }

    CurveGrid {
        concentration,
        absorbance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(concentration: f64, absorbance: f64) -> StandardPoint {
        StandardPoint {
            concentration,
            absorbance,
            absorbance_sd: 0.0,
            replicates: 1,
            used: true,
        }
    }

    #[test]
    fn grid_spans_standards() {
        let model = FitModel::linear(0.0, 10.0);
        let grid = build_grid(&model, &[point(1.0, 0.1), point(8.0, 0.8)], 8);
        assert_eq!(grid.concentration.len(), 8);
        assert_eq!(grid.concentration[0], 1.0);
        assert_eq!(grid.concentration[7], 8.0);
        assert!((grid.absorbance[7] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn file_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p1.curve.json");
        let calibration = CalibrationResult {
            model: FitModel::linear(0.0, 10.0),
            quality: FitQuality {
                r_squared: 1.0,
                sse: 0.0,
                n: 2,
            },
            blank_level: 0.05,
            omit_lower: 0,
            omit_upper: 0,
            points: vec![point(1.0, 0.1), point(2.0, 0.2)],
        };
        write_curve_json(&path, &CalibrationFile::new("p1", "ng/ml", &calibration)).unwrap();

        let back = read_curve_json(&path).unwrap();
        assert_eq!(back.plate, "p1");
        assert_eq!(back.model, calibration.model);
        assert_eq!(back.points.len(), 2);
    }

    #[test]
    fn bad_parameter_count_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let json = r#"{"tool":"x","plate":"p","units":"u",
            "model":{"kind":"logistic","params":[1.0]},
            "fit_quality":{"r_squared":1.0,"sse":0.0,"n":1},
            "blank_level":0.0,"omit_lower":0,"omit_upper":0,"points":[],
            "grid":{"concentration":[],"absorbance":[]}}"#;
        std::fs::write(&path, json).unwrap();
        assert!(read_curve_json(&path).is_err());
    }
}
