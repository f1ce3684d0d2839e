//! Sample back-calculation against a fitted standard curve.

pub mod concentration;

pub use concentration::*;
