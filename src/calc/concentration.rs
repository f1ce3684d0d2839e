//! Concentration calculator.
//!
//! For every (sample, key) bucket:
//!
//! ```text
//! corrected     = mean(absorbances) - blank_level
//! concentration = curve.concentration_at(corrected) * mean(dilutions)
//! ```
//!
//! Buckets are never merged across keys; the nesting and first-seen order of
//! the `SampleSet` carry through unchanged.

use indexmap::IndexMap;

use crate::domain::{ConcentrationRow, SampleConcentration, SecondaryKey};
use crate::error::{PlateError, Result};
use crate::math::{mean, std_dev};
use crate::models::FitModel;
use crate::plate::{Replicate, SampleSet};

/// sample name → secondary key → result
pub type ConcentrationResult = IndexMap<String, IndexMap<SecondaryKey, SampleConcentration>>;

/// Relative spread above which a bucket's dilution factors count as divergent.
const DILUTION_TOLERANCE: f64 = 1e-9;

/// Back-calculate every sample bucket.
///
/// Fails on the first bucket whose corrected absorbance cannot be mapped
/// through the curve; the error names the bucket.
pub fn compute_concentrations(
    samples: &SampleSet,
    blank_level: f64,
    curve: &FitModel,
) -> Result<ConcentrationResult> {
    let mut out = ConcentrationResult::new();

    for (name, keys) in &samples.groups {
        let mut per_key = IndexMap::with_capacity(keys.len());
        for (key, replicates) in keys {
            let value = bucket_concentration(replicates, blank_level, curve).map_err(|e| match e {
                PlateError::FitDomain(msg) => {
                    PlateError::FitDomain(format!("sample {name} [{}]: {msg}", key.label(name)))
                }
                other => other,
            })?;
            if value.divergent_dilution {
                log::warn!(
                    "sample {name} [{}]: replicates disagree on dilution; using mean {}",
                    key.label(name),
                    value.dilution
                );
            }
            per_key.insert(key.clone(), value);
        }
        out.insert(name.clone(), per_key);
    }

    Ok(out)
}

fn bucket_concentration(
    replicates: &[Replicate],
    blank_level: f64,
    curve: &FitModel,
) -> Result<SampleConcentration> {
    let absorbances: Vec<f64> = replicates.iter().map(|r| r.absorbance).collect();
    let dilutions: Vec<f64> = replicates.iter().map(|r| r.dilution).collect();

    let (Some(mean_abs), Some(dilution)) = (mean(&absorbances), mean(&dilutions)) else {
        return Err(PlateError::FitDomain("bucket has no replicates".into()));
    };
    let corrected = mean_abs - blank_level;

    let divergent_dilution = dilutions
        .iter()
        .any(|d| (d - dilution).abs() > DILUTION_TOLERANCE * dilution.abs().max(1.0));

    let concentration = curve.concentration_at(corrected)? * dilution;

    Ok(SampleConcentration {
        corrected_absorbance: corrected,
        absorbance_sd: std_dev(&absorbances),
        dilution,
        divergent_dilution,
        replicates: replicates.len(),
        concentration,
    })
}

/// Flatten a result into export rows, samples in first-seen order and keys
/// sorted within each sample.
pub fn to_rows(result: &ConcentrationResult) -> Vec<ConcentrationRow> {
    let mut rows = Vec::new();
    for (sample, keys) in result {
        let mut sorted: Vec<_> = keys.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in sorted {
            rows.push(ConcentrationRow {
                sample: sample.clone(),
                key: key.clone(),
                corrected_absorbance: value.corrected_absorbance,
                absorbance_sd: value.absorbance_sd,
                concentration: value.concentration,
                dilution: value.dilution,
                replicates: value.replicates,
            });
        }
    }
    rows
}
