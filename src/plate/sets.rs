//! Per-role well collections produced by the assembler.

use indexmap::IndexMap;

use crate::domain::SecondaryKey;
use crate::math::mean;

/// Absorbances of the blank wells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlankSet {
    pub replicates: Vec<f64>,
}

impl BlankSet {
    /// Mean blank absorbance, 0.0 when the plate has no blanks.
    pub fn level(&self) -> f64 {
        mean(&self.replicates).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.replicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicates.is_empty()
    }
}

/// Replicate absorbances of one standard concentration.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardLevel {
    pub concentration: f64,
    pub replicates: Vec<f64>,
}

/// Standards keyed by concentration (compared by value, first-seen order).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandardSet {
    levels: Vec<StandardLevel>,
}

impl StandardSet {
    pub fn insert(&mut self, concentration: f64, absorbance: f64) {
        match self.levels.iter_mut().find(|l| l.concentration == concentration) {
            Some(level) => level.replicates.push(absorbance),
            None => self.levels.push(StandardLevel {
                concentration,
                replicates: vec![absorbance],
            }),
        }
    }

    pub fn levels(&self) -> &[StandardLevel] {
        &self.levels
    }

    pub fn get(&self, concentration: f64) -> Option<&[f64]> {
        self.levels
            .iter()
            .find(|l| l.concentration == concentration)
            .map(|l| l.replicates.as_slice())
    }

    /// Number of distinct concentrations.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Total number of standard wells.
    pub fn well_count(&self) -> usize {
        self.levels.iter().map(|l| l.replicates.len()).sum()
    }
}

impl FromIterator<(f64, Vec<f64>)> for StandardSet {
    fn from_iter<I: IntoIterator<Item = (f64, Vec<f64>)>>(iter: I) -> Self {
        let mut set = StandardSet::default();
        for (concentration, replicates) in iter {
            for abs in replicates {
                set.insert(concentration, abs);
            }
        }
        set
    }
}

/// One sample well: its absorbance and the dilution from its label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Replicate {
    pub absorbance: f64,
    pub dilution: f64,
}

/// Samples: name → secondary key → replicate wells, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    pub groups: IndexMap<String, IndexMap<SecondaryKey, Vec<Replicate>>>,
}

impl SampleSet {
    pub fn insert(&mut self, name: &str, key: SecondaryKey, replicate: Replicate) {
        self.groups
            .entry(name.to_string())
            .or_default()
            .entry(key)
            .or_default()
            .push(replicate);
    }

    pub fn get(&self, name: &str, key: &SecondaryKey) -> Option<&[Replicate]> {
        self.groups.get(name)?.get(key).map(Vec::as_slice)
    }

    /// Number of sample wells.
    pub fn well_count(&self) -> usize {
        self.groups
            .values()
            .flat_map(|keys| keys.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
