//! Formatted terminal and file output.
//!
//! We keep formatting code in one place so:
//! - the fitting and calculation code stays clean and testable
//! - output changes are localized

use chrono::NaiveDateTime;

use crate::domain::{CalibrationResult, ConcentrationRow, Settings};
use crate::report::{QcFlag, QcReport};

/// Short fit summary printed after each plate.
pub fn format_plate_summary(stem: &str, calibration: &CalibrationResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {stem} ===\n"));
    out.push_str(&format!(
        "Model: {} | params={} | R²={:.5}\n",
        calibration.model.kind,
        fmt_params(calibration),
        calibration.quality.r_squared
    ));
    out.push_str(&format!(
        "Standards: {} used of {} (omit lower={}, upper={}) | blank={:.4}\n",
        calibration.quality.n,
        calibration.points.len(),
        calibration.omit_lower,
        calibration.omit_upper,
        calibration.blank_level
    ));
    out
}

/// Contents of the `.fit` file: the curve and every standard point.
pub fn format_fit_report(calibration: &CalibrationResult, units: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("model\t{}\n", calibration.model.kind));
    for (name, value) in calibration
        .model
        .kind
        .param_names()
        .iter()
        .zip(&calibration.model.params)
    {
        out.push_str(&format!("{name}\t{value}\n"));
    }
    out.push_str(&format!("r_squared\t{}\n", calibration.quality.r_squared));
    out.push_str(&format!("blank\t{}\n", calibration.blank_level));
    out.push('\n');
    out.push_str(&format!("conc ({units})\tabs\tabs_sd\tn\tused\n"));
    for p in &calibration.points {
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\n",
            p.concentration,
            p.absorbance,
            p.absorbance_sd,
            p.replicates,
            if p.used { "yes" } else { "no" }
        ));
    }
    out
}

/// QC listing; empty string when nothing was flagged.
pub fn format_qc(report: &QcReport) -> String {
    if report.is_clean() {
        return String::new();
    }
    let mut out = String::new();
    out.push_str("Data check:\n");
    if let Some(lim) = report.lower_limit {
        out.push_str(&format!("  low limit  {lim:.4}\n"));
    }
    if let Some(lim) = report.upper_limit {
        out.push_str(&format!("  high limit {lim:.4}\n"));
    }
    for e in &report.entries {
        let side = match e.flag {
            QcFlag::Low => "below",
            QcFlag::High => "above",
        };
        out.push_str(&format!(
            "  {} [{}] abs={:.4} {side} standard range\n",
            truncate(&e.sample, 24),
            e.key,
            e.corrected_absorbance
        ));
    }
    out
}

/// Contents of the `.log` file.
pub fn format_log(
    stem: &str,
    calibration: &CalibrationResult,
    settings: &Settings,
    qc: Option<&QcReport>,
    timestamp: NaiveDateTime,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "platecal {} | {}\n",
        env!("CARGO_PKG_VERSION"),
        timestamp.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("plate: {stem}\n"));
    out.push_str(&format!("units: {}\n", settings.std_units));
    out.push_str(&format!("elution volume: {}\n", settings.elution_volume));
    out.push_str(&format_plate_summary(stem, calibration));
    if let Some(qc) = qc {
        out.push_str(&format_qc(qc));
    }
    out
}

/// Terminal table of concentration rows.
pub fn format_rows(rows: &[ConcentrationRow], units: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<24} {:<10} {:>9} {:>9} {:>6} {:>12}",
        "sample",
        "key",
        "abs",
        "abs_sd",
        "dil",
        format!("conc {units}")
    ));
    out.push('\n');
    out.push_str(&format!(
        "{:-<24} {:-<10} {:->9} {:->9} {:->6} {:->12}",
        "", "", "", "", "", ""
    ));
    out.push('\n');
    for r in rows {
        out.push_str(
            format!(
                "{:<24} {:<10} {:>9.4} {:>9.4} {:>6} {:>12.4}",
                truncate(&r.sample, 24),
                truncate(&r.key.label(&r.sample), 10),
                r.corrected_absorbance,
                r.absorbance_sd,
                r.dilution,
                r.concentration
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn fmt_params(calibration: &CalibrationResult) -> String {
    let parts: Vec<String> = calibration
        .model
        .kind
        .param_names()
        .iter()
        .zip(&calibration.model.params)
        .map(|(n, v)| format!("{n}={v:.6}"))
        .collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
