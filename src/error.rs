//! Error types.
//!
//! - `PlateError`: failures of the per-plate core (parsing, layout, fitting).
//! - `AppError`: what the binary reports, carrying a process exit code.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::ModelKind;

/// Failure of a single-plate pipeline.
///
/// Every variant is fatal for the plate being processed; callers decide
/// whether to skip the plate or abort the batch.
#[derive(Debug, Error)]
pub enum PlateError {
    /// Non-numeric data in a qualifying row of the instrument export.
    #[error("Non-numeric absorbance '{value}' at line {line}, field {field} (export corrupted?)")]
    Parse {
        line: usize,
        field: usize,
        value: String,
    },

    /// Malformed well label in the layout file.
    #[error("Malformed label '{label}' at row {row}, column {column}: {reason}")]
    SpecFormat {
        row: usize,
        column: usize,
        label: String,
        reason: String,
    },

    /// Export grid and layout grid disagree in size.
    #[error(
        "Export/layout shape mismatch: export has {export_rows} rows, layout has {layout_rows}{}",
        row_detail(.row, .export_cols, .layout_cols)
    )]
    ShapeMismatch {
        export_rows: usize,
        layout_rows: usize,
        /// First row (1-based) whose width differs, when the row counts agree.
        row: Option<usize>,
        export_cols: usize,
        layout_cols: usize,
    },

    /// Too few standard points remain after the omission policy.
    #[error(
        "Insufficient standards for {model} fit: {available} point(s) remain, {required} required"
    )]
    InsufficientData {
        model: ModelKind,
        available: usize,
        required: usize,
    },

    /// Degenerate fit or a value outside the invertible range of the curve.
    #[error("Fit domain error: {0}")]
    FitDomain(String),

    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

fn row_detail(row: &Option<usize>, export_cols: &usize, layout_cols: &usize) -> String {
    match row {
        Some(r) => format!(" (row {r}: export has {export_cols} wells, layout has {layout_cols})"),
        None => String::new(),
    }
}

impl PlateError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        PlateError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Exit code used when this error ends the process.
    pub fn exit_code(&self) -> u8 {
        match self {
            PlateError::InsufficientData { .. } => 3,
            PlateError::FitDomain(_) => 4,
            _ => 2,
        }
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, PlateError>;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Attach the identity of the plate (or file) that failed.
    pub fn from_plate(path: &Path, err: PlateError) -> Self {
        Self::new(err.exit_code(), format!("{}: {err}", path.display()))
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PlateError> for AppError {
    fn from(err: PlateError) -> Self {
        Self::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_mismatch_message_names_row() {
        let err = PlateError::ShapeMismatch {
            export_rows: 8,
            layout_rows: 8,
            row: Some(3),
            export_cols: 11,
            layout_cols: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("row 3"), "{msg}");
        assert!(msg.contains("11 wells"), "{msg}");
    }

    #[test]
    fn exit_codes_follow_category() {
        let insufficient = PlateError::InsufficientData {
            model: ModelKind::Linear,
            available: 2,
            required: 3,
        };
        assert_eq!(insufficient.exit_code(), 3);
        assert_eq!(PlateError::FitDomain("x".into()).exit_code(), 4);

        let app = AppError::from_plate(Path::new("plate1"), PlateError::FitDomain("flat".into()));
        assert_eq!(app.exit_code(), 4);
        assert!(app.to_string().starts_with("plate1: "));
    }
}
