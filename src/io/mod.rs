//! Input/output helpers.
//!
//! - instrument export ingest (`ingest`)
//! - plate layout parsing (`layout`)
//! - per-plate result exports (`export`)
//! - calibration JSON read/write (`curve`)
//! - settings file and plate pairing (`settings`)

pub mod curve;
pub mod export;
pub mod ingest;
pub mod layout;
pub mod settings;

pub use curve::*;
pub use export::*;
pub use ingest::*;
pub use layout::*;
pub use settings::*;
