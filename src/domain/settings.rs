//! Processing settings.
//!
//! One `Settings` value is resolved per plate (file + CLI overrides) and passed
//! explicitly into the parsers and the calibration engine.

use serde::{Deserialize, Serialize};

use crate::domain::ModelKind;

/// Settings as stored in `settings.json`.
///
/// Missing keys take their defaults, so a file may carry only the options a
/// user wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Field separator for both the export and the layout file.
    pub delimiter: char,
    /// Number of lowest-concentration standards excluded from the fit.
    pub omit_lower: usize,
    /// Number of highest-concentration standards excluded from the fit.
    pub omit_upper: usize,
    pub model: ModelKind,
    /// Passed through to reports; not used by the core.
    pub elution_volume: f64,
    /// Concentration unit label for reports.
    pub std_units: String,
    /// QC: flag samples at or below `check_lower` × lowest retained standard.
    pub check_lower: f64,
    /// QC: flag samples at or above `check_upper` × highest retained standard.
    pub check_upper: f64,
    /// Plate stems to process when none are given on the command line.
    pub file_list: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            delimiter: '\t',
            omit_lower: 0,
            omit_upper: 1,
            model: ModelKind::Linear,
            elution_volume: 0.5,
            std_units: "\u{3bc}g/ml".to_string(),
            check_lower: 0.8,
            check_upper: 1.2,
            file_list: Vec::new(),
        }
    }
}

/// Command-line overrides; `None` keeps the file value.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub delimiter: Option<char>,
    pub omit_lower: Option<usize>,
    pub omit_upper: Option<usize>,
    pub model: Option<ModelKind>,
    pub check_lower: Option<f64>,
    pub check_upper: Option<f64>,
}

impl Settings {
    pub fn with_overrides(mut self, o: &SettingsOverrides) -> Self {
        if let Some(d) = o.delimiter {
            self.delimiter = d;
        }
        if let Some(v) = o.omit_lower {
            self.omit_lower = v;
        }
        if let Some(v) = o.omit_upper {
            self.omit_upper = v;
        }
        if let Some(m) = o.model {
            self.model = m;
        }
        if let Some(v) = o.check_lower {
            self.check_lower = v;
        }
        if let Some(v) = o.check_upper {
            self.check_upper = v;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let s: Settings = serde_json::from_str(r#"{"omit_upper": 0, "model": "logistic"}"#).unwrap();
        assert_eq!(s.omit_upper, 0);
        assert_eq!(s.model, ModelKind::Logistic);
        assert_eq!(s.delimiter, '\t');
        assert_eq!(s.omit_lower, 0);
        assert!((s.check_lower - 0.8).abs() < 1e-12);
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let o = SettingsOverrides {
            omit_lower: Some(2),
            ..Default::default()
        };
        let s = Settings::default().with_overrides(&o);
        assert_eq!(s.omit_lower, 2);
        assert_eq!(s.omit_upper, 1);
    }
}
