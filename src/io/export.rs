//! Export per-plate results.
//!
//! - `.fit`: curve parameters and standard points (text)
//! - `.out`: column table, five columns per sample, for spreadsheets
//! - `.dict`: JSON rows, reloadable for `combine`
//! - `.log`: run log (text)

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::{CalibrationResult, ConcentrationRow};
use crate::error::{PlateError, Result};
use crate::report::format_fit_report;

/// Column prefixes of the `.out` table, one group per sample.
pub const TABLE_COLUMNS: [&str; 5] = ["t_", "abs_", "abs_sd_", "conc_", "dil_"];

/// Contents of a `.dict` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlateDict {
    /// Plate stems the rows came from.
    pub sources: Vec<String>,
    pub units: String,
    pub rows: Vec<ConcentrationRow>,
}

/// Write text to `path`, attaching the path to any IO error.
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).map_err(|e| PlateError::io(path, e))
}

/// Write the `.fit` file.
pub fn write_fit_file(path: &Path, calibration: &CalibrationResult, units: &str) -> Result<()> {
    write_text(path, &format_fit_report(calibration, units))
}

/// Write the `.out` table.
///
/// Each sample gets the columns `t_<s>`, `abs_<s>`, `abs_sd_<s>`,
/// `conc_<s>`, `dil_<s>`; its rows are sorted by secondary key and shorter
/// samples are padded with empty cells.
pub fn write_table(path: &Path, rows: &[ConcentrationRow]) -> Result<()> {
    let file = File::create(path).map_err(|e| PlateError::io(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(BufWriter::new(file));

    for record in table_records(rows) {
        writer.write_record(&record)?;
    }
    writer.flush().map_err(|e| PlateError::io(path, e))?;
    Ok(())
}

/// Header plus body of the `.out` table.
pub fn table_records(rows: &[ConcentrationRow]) -> Vec<Vec<String>> {
    let mut by_sample: IndexMap<&str, Vec<&ConcentrationRow>> = IndexMap::new();
    for row in rows {
        by_sample.entry(row.sample.as_str()).or_default().push(row);
    }
    for group in by_sample.values_mut() {
        group.sort_by(|a, b| a.key.cmp(&b.key));
    }

    let mut header = Vec::with_capacity(by_sample.len() * TABLE_COLUMNS.len());
    for sample in by_sample.keys() {
        header.extend(TABLE_COLUMNS.iter().map(|prefix| format!("{prefix}{sample}")));
    }

    let depth = by_sample.values().map(Vec::len).max().unwrap_or(0);
    let mut records = Vec::with_capacity(depth + 1);
    records.push(header);

    for i in 0..depth {
        let mut record = Vec::with_capacity(by_sample.len() * TABLE_COLUMNS.len());
        for (sample, group) in &by_sample {
            match group.get(i) {
                Some(r) => record.extend([
                    r.key.label(sample),
                    r.corrected_absorbance.to_string(),
                    r.absorbance_sd.to_string(),
                    r.concentration.to_string(),
                    r.dilution.to_string(),
                ]),
                None => record.extend(std::iter::repeat_n(String::new(), TABLE_COLUMNS.len())),
            }
        }
        records.push(record);
    }

    records
}

/// Write a `.dict` JSON file.
pub fn write_dict(path: &Path, dict: &PlateDict) -> Result<()> {
    let file = File::create(path).map_err(|e| PlateError::io(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), dict)?;
    Ok(())
}

/// Read a `.dict` JSON file.
pub fn read_dict(path: &Path) -> Result<PlateDict> {
    let file = File::open(path).map_err(|e| PlateError::io(path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Concatenate dicts in order. Units come from the first dict; a mismatch is
/// logged, not rejected.
pub fn combine_dicts<'a>(dicts: impl IntoIterator<Item = &'a PlateDict>) -> PlateDict {
    let mut out = PlateDict::default();
    for dict in dicts {
        if out.sources.is_empty() && out.rows.is_empty() {
            out.units = dict.units.clone();
        } else if dict.units != out.units {
            log::warn!(
                "combining rows in '{}' with rows in '{}' ({:?})",
                dict.units,
                out.units,
                dict.sources
            );
        }
        out.sources.extend(dict.sources.iter().cloned());
        out.rows.extend(dict.rows.iter().cloned());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SecondaryKey;

    fn row(sample: &str, key: SecondaryKey, conc: f64) -> ConcentrationRow {
        ConcentrationRow {
            sample: sample.into(),
            key,
            corrected_absorbance: conc / 10.0,
            absorbance_sd: 0.0,
            concentration: conc,
            dilution: 1.0,
            replicates: 2,
        }
    }

    #[test]
    fn table_groups_samples_and_pads() {
        let rows = vec![
            row("Ab1", SecondaryKey::Timepoint(5.0), 5.0),
            row("Ab2", SecondaryKey::Timepoint(1.0), 1.0),
            row("Ab1", SecondaryKey::Timepoint(1.0), 1.0),
        ];
        let records = table_records(&rows);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0][0], "t_Ab1");
        assert_eq!(records[0][5], "t_Ab2");
        assert_eq!(records[0].len(), 10);
        // Ab1 sorted by timepoint.
        assert_eq!(records[1][0], "1");
        assert_eq!(records[2][0], "5");
        assert_eq!(records[2][3], "5");
        // Ab2 has one row; padded below.
        assert!(records[2][5..].iter().all(String::is_empty));
    }

    #[test]
    fn table_file_is_tab_separated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.out");
        write_table(&path, &[row("S", SecondaryKey::Subname("wash".into()), 2.0)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("t_S\tabs_S\tabs_sd_S\tconc_S\tdil_S"));
        assert_eq!(lines.next(), Some("wash\t0.2\t0\t2\t1"));
    }

    #[test]
    fn dicts_combine_in_order() {
        let a = PlateDict {
            sources: vec!["p1".into()],
            units: "ng/ml".into(),
            rows: vec![row("A", SecondaryKey::Unkeyed, 1.0)],
        };
        let b = PlateDict {
            sources: vec!["p2".into()],
            units: "ng/ml".into(),
            rows: vec![row("B", SecondaryKey::Unkeyed, 2.0)],
        };
        let combined = combine_dicts([&a, &b]);
        assert_eq!(combined.sources, vec!["p1", "p2"]);
        assert_eq!(combined.rows[1].sample, "B");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all.dict");
        write_dict(&path, &combined).unwrap();
        assert_eq!(read_dict(&path).unwrap(), combined);
    }
}
