//! Settings file and plate file discovery.
//!
//! A plate is identified by its stem: `<stem>.txt` is the instrument export
//! and `<stem>.spec` the layout. Inputs may be given as the stem or as either
//! file.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

use crate::domain::{Settings, SettingsOverrides};
use crate::error::{PlateError, Result};

pub const SETTINGS_FILE: &str = "settings.json";
pub const EXPORT_EXT: &str = "txt";
pub const LAYOUT_EXT: &str = "spec";

/// The two input files of one plate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatePaths {
    pub stem: PathBuf,
    pub export: PathBuf,
    pub layout: PathBuf,
}

impl PlatePaths {
    /// File name of the stem, for messages and output headers.
    pub fn name(&self) -> String {
        self.stem
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.stem.display().to_string())
    }

    /// Output path `<stem>.<ext>`.
    pub fn output(&self, ext: &str) -> PathBuf {
        with_suffix(&self.stem, ext)
    }
}

/// `<stem>.<ext>` without replacing dots already in the stem.
pub fn with_suffix(stem: &Path, ext: &str) -> PathBuf {
    let mut os = stem.as_os_str().to_os_string();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}

/// Load settings, falling back to defaults when the file does not exist.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::warn!("no settings file at '{}'; using defaults", path.display());
            return Ok(Settings::default());
        }
        Err(e) => return Err(PlateError::io(path, e)),
    };
    let settings: Settings = serde_json::from_str(&text)
        .map_err(|e| PlateError::Settings(format!("'{}': {e}", path.display())))?;
    validate(&settings)?;
    log::debug!("loaded settings from '{}'", path.display());
    Ok(settings)
}

/// Load settings from `path` and apply command-line overrides.
///
/// The merged values are validated, so a bad override fails the same way a
/// bad file value does.
pub fn resolve_settings(path: &Path, overrides: &SettingsOverrides) -> Result<Settings> {
    let settings = load_settings(path)?.with_overrides(overrides);
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<()> {
    if !(settings.check_lower.is_finite() && settings.check_upper.is_finite()) {
        return Err(PlateError::Settings("QC thresholds must be finite".into()));
    }
    if settings.delimiter == '\n' || settings.delimiter == '\r' {
        return Err(PlateError::Settings("delimiter cannot be a line break".into()));
    }
    Ok(())
}

/// Write default settings to `path`. Never overwrites an existing file.
pub fn generate_settings(path: &Path) -> Result<()> {
    let file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(PlateError::Settings(format!(
                "'{}' already exists; refusing to overwrite",
                path.display()
            )));
        }
        Err(e) => return Err(PlateError::io(path, e)),
    };
    serde_json::to_writer_pretty(BufWriter::new(file), &Settings::default())?;
    Ok(())
}

/// Strip a `.txt` / `.spec` extension, if present.
pub fn plate_stem(input: &Path) -> PathBuf {
    match input.extension().and_then(|e| e.to_str()) {
        Some(EXPORT_EXT) | Some(LAYOUT_EXT) => input.with_extension(""),
        _ => input.to_path_buf(),
    }
}

/// Resolve the export/layout pair for a stem; both files must exist.
pub fn pair_files(stem: &Path) -> Result<PlatePaths> {
    let stem = plate_stem(stem);
    let export = with_suffix(&stem, EXPORT_EXT);
    let layout = with_suffix(&stem, LAYOUT_EXT);
    for path in [&export, &layout] {
        if !path.is_file() {
            return Err(PlateError::io(
                path,
                std::io::Error::new(ErrorKind::NotFound, "plate file not found"),
            ));
        }
    }
    Ok(PlatePaths {
        stem,
        export,
        layout,
    })
}

/// Stems of every `.spec` file in `dir` with a matching `.txt`, sorted.
pub fn discover_plates(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| PlateError::io(dir, e))?;
    let mut stems = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PlateError::io(dir, e))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(LAYOUT_EXT) {
            continue;
        }
        if path.with_extension(EXPORT_EXT).is_file() {
            stems.push(path.with_extension(""));
        } else {
            log::debug!("'{}' has no export file; skipped", path.display());
        }
    }
    stems.sort();
    Ok(stems)
}

/// Read a file list: one stem per line, blank lines and `#` comments skipped.
/// Relative entries resolve against the list's directory.
pub fn read_file_list(path: &Path) -> Result<Vec<PathBuf>> {
    let text = std::fs::read_to_string(path).map_err(|e| PlateError::io(path, e))?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| base.join(l))
        .collect())
}

/// Where the list of plates comes from, highest priority first.
#[derive(Debug, Clone)]
pub struct PlateSource<'a> {
    pub inputs: &'a [PathBuf],
    pub file_list: Option<&'a Path>,
    pub settings_list: &'a [String],
    pub dir: &'a Path,
}

/// Resolve plates from the first non-empty source, de-duplicated by stem.
pub fn resolve_plates(source: &PlateSource<'_>) -> Result<Vec<PlatePaths>> {
    let candidates: Vec<PathBuf> = if !source.inputs.is_empty() {
        source.inputs.to_vec()
    } else if let Some(list) = source.file_list {
        read_file_list(list)?
    } else if !source.settings_list.is_empty() {
        source.settings_list.iter().map(|s| source.dir.join(s)).collect()
    } else {
        discover_plates(source.dir)?
    };

    let mut seen = HashSet::new();
    let mut plates = Vec::new();
    for candidate in candidates {
        let stem = plate_stem(&candidate);
        if seen.insert(stem.clone()) {
            plates.push(pair_files(&stem)?);
        }
    }
    Ok(plates)
}
