//! `plate-curves` library crate.
//!
//! The binary (`platecal`) is a thin wrapper around this library so that:
//!
//! - the per-plate pipeline is testable without spawning processes
//! - parsers, calibration and exports are reusable on their own
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod calc;
pub mod cli;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plate;
pub mod plot;
pub mod report;
