//! Single-plate pipeline shared by every front-end.
//!
//! export grid + layout grid
//!   -> well sets -> calibration -> concentrations -> QC
//!
//! `process_plate` is pure; `run_plate` reads the two files and attaches the
//! offending file to any error.

use std::path::Path;

use crate::calc::{ConcentrationResult, compute_concentrations, to_rows};
use crate::domain::{AbsorbanceGrid, CalibrationResult, ConcentrationRow, LayoutGrid, Settings};
use crate::error::{AppError, PlateError, Result};
use crate::fit::fit_standards;
use crate::io::{PlatePaths, read_export, read_layout};
use crate::plate::assemble;
use crate::report::{QcReport, data_check};

/// Back-calculated sample data of one plate.
#[derive(Debug, Clone)]
pub struct PlateData {
    pub concentrations: ConcentrationResult,
    /// Flattened, key-sorted rows for export.
    pub rows: Vec<ConcentrationRow>,
    pub qc: QcReport,
}

/// All computed outputs for one plate.
#[derive(Debug, Clone)]
pub struct PlateOutcome {
    pub calibration: CalibrationResult,
    /// `None` when only the curve was requested.
    pub data: Option<PlateData>,
}

/// A processed plate together with the inputs that produced it.
#[derive(Debug, Clone)]
pub struct PlateRun {
    pub plate: PlatePaths,
    pub settings: Settings,
    pub outcome: PlateOutcome,
}

/// Run the pipeline on parsed grids.
pub fn process_plate(
    grid: &AbsorbanceGrid,
    layout: &LayoutGrid,
    settings: &Settings,
    compute_data: bool,
) -> Result<PlateOutcome> {
    let sets = assemble(grid, layout)?;
    let calibration = fit_standards(
        &sets.standards,
        &sets.blanks,
        settings.omit_lower,
        settings.omit_upper,
        settings.model,
    )?;

    if !compute_data {
        return Ok(PlateOutcome {
            calibration,
            data: None,
        });
    }

    let concentrations =
        compute_concentrations(&sets.samples, calibration.blank_level, &calibration.model)?;
    let rows = to_rows(&concentrations);
    let qc = data_check(
        &concentrations,
        &calibration,
        settings.check_lower,
        settings.check_upper,
    );

    Ok(PlateOutcome {
        calibration,
        data: Some(PlateData {
            concentrations,
            rows,
            qc,
        }),
    })
}

/// Read one plate's files and run the pipeline.
pub fn run_plate(
    plate: &PlatePaths,
    settings: &Settings,
    compute_data: bool,
) -> std::result::Result<PlateRun, AppError> {
    let grid = read_export(&plate.export, settings.delimiter).map_err(|e| attach(&plate.export, e))?;
    let layout = read_layout(&plate.layout, settings.delimiter).map_err(|e| attach(&plate.layout, e))?;
    let outcome =
        process_plate(&grid, &layout, settings, compute_data).map_err(|e| attach(&plate.stem, e))?;

    Ok(PlateRun {
        plate: plate.clone(),
        settings: settings.clone(),
        outcome,
    })
}

/// IO errors already name their file; everything else gets the path prefixed.
fn attach(path: &Path, err: PlateError) -> AppError {
    match err {
        PlateError::Io { .. } => AppError::from(err),
        other => AppError::from_plate(path, other),
    }
}
