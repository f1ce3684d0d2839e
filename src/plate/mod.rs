//! Plate assembly: well records and the blank / standard / sample sets.

pub mod assemble;
pub mod sets;

pub use assemble::*;
pub use sets::*;
