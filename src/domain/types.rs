//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - produced once by the parsers and consumed read-only downstream
//! - exported to JSON/TSV by the output collaborators
//! - reloaded later (curve JSON, `.dict` files)

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::models::FitModel;

/// Calibration curve family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// `concentration = intercept + slope * absorbance`
    Linear,
    /// `absorbance = intercept + multiplier * concentration^power`
    Power,
    /// Four-parameter logistic:
    /// `absorbance = d + (a - d) / (1 + (concentration / c)^b)`
    Logistic,
}

/// Which quantity a model's `forward` function produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveAxis {
    /// `forward(absorbance) -> concentration`
    ConcentrationFromAbsorbance,
    /// `forward(concentration) -> absorbance`
    AbsorbanceFromConcentration,
}

impl ModelKind {
    /// Human-readable label for terminal output and logs.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Linear => "Linear",
            ModelKind::Power => "Power",
            ModelKind::Logistic => "4PL",
        }
    }

    /// Number of fitted parameters.
    pub fn param_count(self) -> usize {
        match self {
            ModelKind::Linear => 2,
            ModelKind::Power => 3,
            ModelKind::Logistic => 4,
        }
    }

    /// Parameter names in the order of `FitModel::params`.
    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Linear => &["intercept", "slope"],
            ModelKind::Power => &["intercept", "multiplier", "power"],
            ModelKind::Logistic => &["a", "b", "c", "d"],
        }
    }

    /// Smallest number of standard points that can be fit.
    pub fn min_points(self) -> usize {
        self.param_count() + 1
    }

    pub fn axis(self) -> CurveAxis {
        match self {
            ModelKind::Linear => CurveAxis::ConcentrationFromAbsorbance,
            ModelKind::Power | ModelKind::Logistic => CurveAxis::AbsorbanceFromConcentration,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Secondary key of a sample bucket: a timepoint, a subname, or neither.
///
/// Serialized untagged: a number, a string, or `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecondaryKey {
    Timepoint(f64),
    Subname(String),
    /// No `d`/`n` qualifier; labelled with the sample name.
    Unkeyed,
}

impl SecondaryKey {
    /// Label used in tables and QC listings.
    pub fn label(&self, sample: &str) -> String {
        match self {
            SecondaryKey::Timepoint(t) => format!("{t}"),
            SecondaryKey::Subname(s) => s.clone(),
            SecondaryKey::Unkeyed => sample.to_string(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SecondaryKey::Unkeyed => 0,
            SecondaryKey::Timepoint(_) => 1,
            SecondaryKey::Subname(_) => 2,
        }
    }
}

fn canonical_bits(v: f64) -> u64 {
    // -0.0 and 0.0 are the same timepoint.
    if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
}

impl PartialEq for SecondaryKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SecondaryKey::Timepoint(a), SecondaryKey::Timepoint(b)) => {
                canonical_bits(*a) == canonical_bits(*b)
            }
            (SecondaryKey::Subname(a), SecondaryKey::Subname(b)) => a == b,
            (SecondaryKey::Unkeyed, SecondaryKey::Unkeyed) => true,
            _ => false,
        }
    }
}

impl Eq for SecondaryKey {}

impl Hash for SecondaryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            SecondaryKey::Timepoint(t) => canonical_bits(*t).hash(state),
            SecondaryKey::Subname(s) => s.hash(state),
            SecondaryKey::Unkeyed => {}
        }
    }
}

impl PartialOrd for SecondaryKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SecondaryKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SecondaryKey::Timepoint(a), SecondaryKey::Timepoint(b)) => {
                f64::from_bits(canonical_bits(*a)).total_cmp(&f64::from_bits(canonical_bits(*b)))
            }
            (SecondaryKey::Subname(a), SecondaryKey::Subname(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Attributes decoded from a sample label such as `Ab1-d5.0_x2.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleLabel {
    pub name: String,
    pub key: SecondaryKey,
    /// Pre-dilution factor (1.0 when the label carries no `x` qualifier).
    pub dilution: f64,
}

/// Role of a single well, resolved once from its label.
#[derive(Debug, Clone, PartialEq)]
pub enum WellRole {
    Blank,
    Standard { concentration: f64 },
    Sample(SampleLabel),
    /// Empty or `jnk` label; excluded from every downstream set.
    Ignored,
}

/// One cell of the layout grid: the raw label and its resolved role.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutCell {
    pub label: String,
    pub role: WellRole,
}

/// Parsed layout (`.spec`) file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutGrid {
    pub rows: Vec<Vec<LayoutCell>>,
}

impl LayoutGrid {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of wells with a non-ignored role.
    pub fn occupied_count(&self) -> usize {
        self.rows
            .iter()
            .flatten()
            .filter(|c| c.role != WellRole::Ignored)
            .count()
    }
}

/// Parsed absorbance grid from an instrument export.
///
/// Rows may be ragged where the instrument left wells empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbsorbanceGrid {
    pub rows: Vec<Vec<f64>>,
}

impl AbsorbanceGrid {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn well_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// `true` when every row has the same number of wells.
    pub fn is_rectangular(&self) -> bool {
        match self.rows.first() {
            Some(first) => self.rows.iter().all(|r| r.len() == first.len()),
            None => true,
        }
    }
}

/// A measured well with its resolved role (0-based position).
#[derive(Debug, Clone, PartialEq)]
pub struct WellRecord {
    pub row: usize,
    pub col: usize,
    pub absorbance: f64,
    pub role: WellRole,
}

/// One concentration level of the standard curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardPoint {
    pub concentration: f64,
    /// Mean replicate absorbance minus the blank level.
    pub absorbance: f64,
    /// Population standard deviation of the raw replicates.
    pub absorbance_sd: f64,
    pub replicates: usize,
    /// `false` when excluded by the omission policy (still reported).
    pub used: bool,
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    pub r_squared: f64,
    pub sse: f64,
    pub n: usize,
}

/// Output of the calibration engine for one plate.
#[derive(Debug, Clone)]
pub struct CalibrationResult {
    pub model: FitModel,
    pub quality: FitQuality,
    pub blank_level: f64,
    pub omit_lower: usize,
    pub omit_upper: usize,
    /// All standards, ascending by concentration.
    pub points: Vec<StandardPoint>,
}

impl CalibrationResult {
    /// Standards that took part in the fit.
    pub fn fitted_points(&self) -> impl Iterator<Item = &StandardPoint> {
        self.points.iter().filter(|p| p.used)
    }

    /// Blank-corrected absorbance of the lowest-concentration retained standard.
    pub fn lowest_retained_absorbance(&self) -> Option<f64> {
        self.fitted_points().next().map(|p| p.absorbance)
    }

    /// Blank-corrected absorbance of the highest-concentration retained standard.
    pub fn highest_retained_absorbance(&self) -> Option<f64> {
        self.fitted_points().last().map(|p| p.absorbance)
    }
}

/// Back-calculated concentration for one (sample, key) bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleConcentration {
    /// Mean replicate absorbance minus the blank level.
    pub corrected_absorbance: f64,
    pub absorbance_sd: f64,
    /// Mean of the bucket's dilution factors.
    pub dilution: f64,
    /// `true` when the bucket's wells disagree on dilution.
    pub divergent_dilution: bool,
    pub replicates: usize,
    /// Dilution-scaled concentration.
    pub concentration: f64,
}

/// Flat export row (one per sample bucket).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationRow {
    pub sample: String,
    pub key: SecondaryKey,
    pub corrected_absorbance: f64,
    pub absorbance_sd: f64,
    pub concentration: f64,
    pub dilution: f64,
    pub replicates: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn timepoint_keys_compare_by_value() {
        let mut set = HashSet::new();
        set.insert(SecondaryKey::Timepoint(5.0));
        set.insert(SecondaryKey::Timepoint(5.0));
        set.insert(SecondaryKey::Timepoint(0.0));
        set.insert(SecondaryKey::Timepoint(-0.0));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn unkeyed_does_not_merge_with_subname() {
        assert_ne!(SecondaryKey::Unkeyed, SecondaryKey::Subname("Ab1".into()));
        assert_eq!(SecondaryKey::Unkeyed.label("Ab1"), "Ab1");
    }

    #[test]
    fn keys_sort_numerically() {
        let mut keys = vec![
            SecondaryKey::Timepoint(10.0),
            SecondaryKey::Timepoint(2.0),
            SecondaryKey::Subname("b".into()),
            SecondaryKey::Unkeyed,
        ];
        keys.sort();
        assert_eq!(keys[0], SecondaryKey::Unkeyed);
        assert_eq!(keys[1], SecondaryKey::Timepoint(2.0));
        assert_eq!(keys[2], SecondaryKey::Timepoint(10.0));
    }

    #[test]
    fn key_json_is_untagged() {
        let json = serde_json::to_string(&vec![
            SecondaryKey::Timepoint(1.5),
            SecondaryKey::Subname("wash".into()),
            SecondaryKey::Unkeyed,
        ])
        .unwrap();
        assert_eq!(json, r#"[1.5,"wash",null]"#);
        let back: Vec<SecondaryKey> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[1], SecondaryKey::Subname("wash".into()));
        assert_eq!(back[2], SecondaryKey::Unkeyed);
    }

    #[test]
    fn logistic_needs_five_points() {
        assert_eq!(ModelKind::Logistic.min_points(), 5);
        assert_eq!(ModelKind::Linear.min_points(), 3);
    }
}
