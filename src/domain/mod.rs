//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - well roles and labels (`WellRole`, `SampleLabel`, `SecondaryKey`)
//! - parsed grids (`AbsorbanceGrid`, `LayoutGrid`) and well records
//! - fit outputs (`CalibrationResult`, `StandardPoint`, `SampleConcentration`)
//! - processing settings (`Settings`)

pub mod settings;
pub mod types;

pub use settings::*;
pub use types::*;
