//! Calibration curve models.
//!
//! Models are small, pure functions plus the `FitModel` value that owns a
//! fitted parameter vector, so the fitting code can stay generic.

pub mod model;

pub use model::*;
