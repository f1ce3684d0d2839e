//! Instrument export ingest.
//!
//! This module turns a plate reader's text export into a clean
//! `AbsorbanceGrid`. The export is mostly metadata; data rows are recognised
//! by their first two characters:
//!
//! - a separator followed by a digit `1`–`9` (first row of a plate: the
//!   temperature column is filled in), or
//! - two separators (remaining rows: empty temperature column).
//!
//! Design goals:
//! - **Strict values**: a non-empty, non-numeric field is an error, never coerced
//! - **Lossy text**: the instrument writes a non-UTF-8 degree sign in its header,
//!   so bytes are decoded with replacement
//! - **No shape policy**: concatenated plates are returned as one tall grid;
//!   reconciling the shape with the layout is the assembler's job

use std::path::Path;

use crate::domain::AbsorbanceGrid;
use crate::error::{PlateError, Result};

/// Leading fields on every data row (row marker, temperature).
const LEADING_FIELDS: usize = 2;

/// Trailing empty fields the instrument leaves at the end of each row.
const MAX_TRAILING_EMPTY: usize = 2;

/// Read and parse an export file.
pub fn read_export(path: &Path, delimiter: char) -> Result<AbsorbanceGrid> {
    let bytes = std::fs::read(path).map_err(|e| PlateError::io(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    parse_export(&text, delimiter)
}

/// Parse export text into an absorbance grid.
///
/// Empty fields are dropped rather than parsed, so a row with unused wells
/// comes back shorter than the plate width. Rows with no populated wells at
/// all are dropped.
pub fn parse_export(text: &str, delimiter: char) -> Result<AbsorbanceGrid> {
    let mut rows = Vec::new();
    let mut skipped_empty = 0usize;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim_end_matches(['\r', '\n']);
        if !is_data_row(line, delimiter) || line.trim().is_empty() {
            continue;
        }

        let mut fields: Vec<&str> = line.split(delimiter).collect();
        let mut trimmed = 0;
        while trimmed < MAX_TRAILING_EMPTY && fields.last().is_some_and(|f| f.trim().is_empty()) {
            fields.pop();
            trimmed += 1;
        }

        let mut row = Vec::with_capacity(fields.len().saturating_sub(LEADING_FIELDS));
        for (pos, field) in fields.iter().enumerate().skip(LEADING_FIELDS) {
            let field = field.trim();
            if field.is_empty() {
                continue;
            }
            row.push(parse_absorbance(field, line_no, pos + 1)?);
        }

        if row.is_empty() {
            skipped_empty += 1;
            continue;
        }
        rows.push(row);
    }

    log::debug!(
        "export: {} data rows, {} wells ({} empty rows dropped)",
        rows.len(),
        rows.iter().map(Vec::len).sum::<usize>(),
        skipped_empty
    );

    Ok(AbsorbanceGrid { rows })
}

/// `true` for lines starting with `<sep><sep>` or `<sep><1-9>`.
pub fn is_data_row(line: &str, delimiter: char) -> bool {
    let mut chars = line.chars();
    if chars.next() != Some(delimiter) {
        return false;
    }
    match chars.next() {
        Some(c) if c == delimiter => true,
        Some(c) => matches!(c, '1'..='9'),
        None => false,
    }
}

fn parse_absorbance(field: &str, line: usize, pos: usize) -> Result<f64> {
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(PlateError::Parse {
            line,
            field: pos,
            value: field.to_string(),
        }),
    }
}
