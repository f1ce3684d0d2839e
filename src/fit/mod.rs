//! Calibration engine.
//!
//! Responsibilities:
//!
//! - turn standard and blank wells into blank-corrected curve points
//! - apply the omission policy
//! - fit Linear / Power / Logistic models and score them

pub mod calibration;
pub mod fitter;

pub use calibration::*;
pub use fitter::*;
