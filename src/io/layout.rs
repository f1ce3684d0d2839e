//! Plate layout (`.spec`) parsing and the well-label grammar.
//!
//! A layout file mirrors the plate: one line per row, one label per well,
//! separated by the configured delimiter. Each label is classified once here
//! into a `WellRole`:
//!
//! | label                  | role                                   |
//! |------------------------|----------------------------------------|
//! | empty, `jnk…`          | `Ignored`                              |
//! | `blk…`                 | `Blank`                                |
//! | `std-<concentration>`  | `Standard`                             |
//! | `<name>-<qualifiers>`  | `Sample`                               |
//!
//! Sample qualifiers are `_`-separated `<letter><value>` items:
//! `d<float>` timepoint, `x<float>` dilution, `n<text>` subname. Other
//! letters are accepted and ignored. The grammar is case-sensitive.

use std::path::Path;

use crate::domain::{LayoutCell, LayoutGrid, SampleLabel, SecondaryKey, WellRole};
use crate::error::{PlateError, Result};

/// Read and parse a layout file.
pub fn read_layout(path: &Path, delimiter: char) -> Result<LayoutGrid> {
    let bytes = std::fs::read(path).map_err(|e| PlateError::io(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    parse_layout(&text, delimiter)
}

/// Parse layout text into a grid of classified labels.
///
/// Only line terminators are stripped from a line; every field is trimmed on
/// its own, so an empty cell is kept as an `Ignored` well whatever the
/// delimiter. Lines whose fields are all empty are skipped. Row and column
/// numbers in errors are 1-based and count only non-blank lines.
pub fn parse_layout(text: &str, delimiter: char) -> Result<LayoutGrid> {
    let mut rows = Vec::new();

    for line in text.lines() {
        let fields: Vec<&str> = line
            .trim_end_matches(['\r', '\n'])
            .split(delimiter)
            .map(str::trim)
            .collect();
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }
        let row_no = rows.len() + 1;

        let mut row = Vec::with_capacity(fields.len());
        for (col_idx, label) in fields.into_iter().enumerate() {
            let role = classify_label(label).map_err(|reason| PlateError::SpecFormat {
                row: row_no,
                column: col_idx + 1,
                label: label.to_string(),
                reason,
            })?;
            row.push(LayoutCell {
                label: label.to_string(),
                role,
            });
        }
        rows.push(row);
    }

    let grid = LayoutGrid { rows };
    log::debug!(
        "layout: {} rows, {} occupied wells",
        grid.row_count(),
        grid.occupied_count()
    );
    Ok(grid)
}

/// Classify a single (already trimmed) label.
///
/// Errors carry a human-readable reason; the caller adds the location.
pub fn classify_label(label: &str) -> std::result::Result<WellRole, String> {
    if label.is_empty() || label.starts_with("jnk") {
        return Ok(WellRole::Ignored);
    }
    if label.starts_with("blk") {
        return Ok(WellRole::Blank);
    }
    if label.starts_with("std") {
        // `std-<concentration>`: everything after the fourth character.
        let suffix = label.get(4..).unwrap_or("").trim();
        let concentration = parse_number(suffix)
            .ok_or_else(|| format!("standard concentration '{suffix}' is not a number"))?;
        return Ok(WellRole::Standard { concentration });
    }
    parse_sample_label(label).map(WellRole::Sample)
}

fn parse_sample_label(label: &str) -> std::result::Result<SampleLabel, String> {
    let (name, qualifiers) = match label.split_once('-') {
        Some((name, rest)) => (name.trim(), Some(rest)),
        None => (label, None),
    };
    if name.is_empty() {
        return Err("sample name is empty".to_string());
    }

    let mut timepoint = None;
    let mut subname = None;
    let mut dilution = 1.0;

    if let Some(qualifiers) = qualifiers {
        if qualifiers.contains('-') {
            return Err("more than one '-' separator".to_string());
        }
        for item in qualifiers.split('_') {
            let item = item.trim();
            let mut chars = item.chars();
            let Some(letter) = chars.next() else {
                continue;
            };
            let value = chars.as_str().trim();
            match letter {
                'd' => {
                    let t = parse_number(value)
                        .ok_or_else(|| format!("timepoint '{value}' is not a number"))?;
                    timepoint = Some(t);
                }
                'x' => {
                    let x = parse_number(value)
                        .ok_or_else(|| format!("dilution '{value}' is not a number"))?;
                    if x <= 0.0 {
                        return Err(format!("dilution '{value}' must be positive"));
                    }
                    dilution = x;
                }
                'n' => {
                    if value.is_empty() {
                        return Err("subname qualifier 'n' is empty".to_string());
                    }
                    subname = Some(value.to_string());
                }
                other => {
                    log::debug!("label '{label}': ignoring qualifier '{other}{value}'");
                }
            }
        }
    }

    let key = match (timepoint, subname) {
        (Some(_), Some(_)) => {
            return Err("timepoint (d) and subname (n) are mutually exclusive".to_string());
        }
        (Some(t), None) => SecondaryKey::Timepoint(t),
        (None, Some(s)) => SecondaryKey::Subname(s),
        (None, None) => SecondaryKey::Unkeyed,
    };

    Ok(SampleLabel {
        name: name.to_string(),
        key,
        dilution,
    })
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}
