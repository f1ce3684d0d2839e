//! Reporting utilities: QC data check and formatted output.

pub mod format;

pub use format::*;

use crate::calc::ConcentrationResult;
use crate::domain::CalibrationResult;

/// Which side of the retained standard range a sample fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QcFlag {
    /// At or below `check_lower` × lowest retained standard absorbance.
    Low,
    /// At or above `check_upper` × highest retained standard absorbance.
    High,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QcEntry {
    pub sample: String,
    pub key: String,
    pub corrected_absorbance: f64,
    pub flag: QcFlag,
}

/// Samples whose corrected absorbance lies outside the trusted curve range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QcReport {
    pub lower_limit: Option<f64>,
    pub upper_limit: Option<f64>,
    pub entries: Vec<QcEntry>,
}

impl QcReport {
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, flag: QcFlag) -> usize {
        self.entries.iter().filter(|e| e.flag == flag).count()
    }
}

/// Compare every sample bucket against the retained standard range.
pub fn data_check(
    result: &ConcentrationResult,
    calibration: &CalibrationResult,
    check_lower: f64,
    check_upper: f64,
) -> QcReport {
    let lower_limit = calibration
        .lowest_retained_absorbance()
        .map(|a| check_lower * a);
    let upper_limit = calibration
        .highest_retained_absorbance()
        .map(|a| check_upper * a);

    let mut entries = Vec::new();
    for (sample, keys) in result {
        for (key, value) in keys {
            let abs = value.corrected_absorbance;
            let flag = if lower_limit.is_some_and(|lim| abs <= lim) {
                Some(QcFlag::Low)
            } else if upper_limit.is_some_and(|lim| abs >= lim) {
                Some(QcFlag::High)
            } else {
                None
            };
            if let Some(flag) = flag {
                entries.push(QcEntry {
                    sample: sample.clone(),
                    key: key.label(sample),
                    corrected_absorbance: abs,
                    flag,
                });
            }
        }
    }

    if !entries.is_empty() {
        log::warn!("QC: {} sample bucket(s) outside the standard range", entries.len());
    }

    QcReport {
        lower_limit,
        upper_limit,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitQuality, SampleConcentration, SecondaryKey, StandardPoint};
    use crate::models::FitModel;
    use indexmap::IndexMap;

    fn point(concentration: f64, absorbance: f64, used: bool) -> StandardPoint {
        StandardPoint {
            concentration,
            absorbance,
            absorbance_sd: 0.0,
            replicates: 1,
            used,
        }
    }

    fn calibration() -> CalibrationResult {
        CalibrationResult {
            model: FitModel::linear(0.0, 10.0),
            quality: FitQuality {
                r_squared: 1.0,
                sse: 0.0,
                n: 3,
            },
            blank_level: 0.0,
            omit_lower: 0,
            omit_upper: 1,
            points: vec![
                point(1.0, 0.1, true),
                point(2.0, 0.2, true),
                point(4.0, 0.4, true),
                point(8.0, 0.8, false),
            ],
        }
    }

    fn sample(abs: f64) -> SampleConcentration {
        SampleConcentration {
            corrected_absorbance: abs,
            absorbance_sd: 0.0,
            dilution: 1.0,
            divergent_dilution: false,
            replicates: 1,
            concentration: abs * 10.0,
        }
    }

    #[test]
    fn flags_low_and_high_buckets() {
        let mut keys = IndexMap::new();
        keys.insert(SecondaryKey::Timepoint(0.0), sample(0.05));
        keys.insert(SecondaryKey::Timepoint(1.0), sample(0.25));
        keys.insert(SecondaryKey::Timepoint(2.0), sample(0.6));
        let mut result = ConcentrationResult::new();
        result.insert("Ab1".to_string(), keys);

        let report = data_check(&result, &calibration(), 0.8, 1.2);
        assert!((report.lower_limit.unwrap() - 0.08).abs() < 1e-12);
        // Omitted 8.0 standard does not widen the range.
        assert!((report.upper_limit.unwrap() - 0.48).abs() < 1e-12);
        assert_eq!(report.count(QcFlag::Low), 1);
        assert_eq!(report.count(QcFlag::High), 1);
        assert_eq!(report.entries[0].key, "0");
    }
}
