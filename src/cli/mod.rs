//! Command-line parsing for the plate calibration tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the parsing/fitting code.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::domain::{ModelKind, SettingsOverrides};
use crate::io::SETTINGS_FILE;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "platecal", version, about = "Absorbance plate standard-curve calibration")]
pub struct Cli {
    /// Increase log output (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit each plate's standard curve and back-calculate its samples.
    ///
    /// This is the default: `platecal a b` runs `platecal process a b`.
    Process(ProcessArgs),
    /// Write a settings file with default values (never overwrites).
    GenerateSettings(GenerateArgs),
    /// Merge existing `.dict` files into one table.
    Combine(CombineArgs),
    /// Plot a calibration JSON written by `process --curve-json`.
    Plot(PlotArgs),
}

/// Options for processing plates.
#[derive(Debug, Parser, Clone)]
pub struct ProcessArgs {
    /// Plates to process, as `<stem>`, `<stem>.txt` or `<stem>.spec`.
    ///
    /// Without inputs: `--file-list`, then the settings `file_list`, then every
    /// `.spec`/`.txt` pair in the current directory.
    pub inputs: Vec<PathBuf>,

    /// Settings file.
    #[arg(long, default_value = SETTINGS_FILE)]
    pub settings: PathBuf,

    /// Load `settings.json` from each plate's own directory instead.
    #[arg(long)]
    pub local_settings: bool,

    /// File with one plate stem per line.
    #[arg(long, value_name = "FILE")]
    pub file_list: Option<PathBuf>,

    /// Calibration model (overrides settings).
    #[arg(long, value_enum)]
    pub model: Option<ModelKind>,

    /// Lowest standards to exclude from the fit (overrides settings).
    #[arg(long)]
    pub omit_lower: Option<usize>,

    /// Highest standards to exclude from the fit (overrides settings).
    #[arg(long)]
    pub omit_upper: Option<usize>,

    /// QC low threshold factor (overrides settings).
    #[arg(long)]
    pub check_lower: Option<f64>,

    /// QC high threshold factor (overrides settings).
    #[arg(long)]
    pub check_upper: Option<f64>,

    /// Field separator (overrides settings).
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Do not write `.fit` files.
    #[arg(long)]
    pub no_fit: bool,

    /// Do not write `.log` files.
    #[arg(long)]
    pub no_logs: bool,

    /// Stop after the curve fit; samples are not back-calculated.
    #[arg(long)]
    pub no_data: bool,

    /// Do not write per-plate `.out` / `.dict` files.
    #[arg(long)]
    pub omit_local: bool,

    /// Merge all processed plates into one table.
    #[arg(long)]
    pub combine: bool,

    /// Stem of the combined output.
    #[arg(long, default_value = "all_data", value_name = "STEM")]
    pub combined: PathBuf,

    /// Also write the combined `.dict` file.
    #[arg(long)]
    pub dict: bool,

    /// Write `<stem>.curve.json` for each plate.
    #[arg(long)]
    pub curve_json: bool,

    /// Print an ASCII plot of each standard curve.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

impl ProcessArgs {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            delimiter: self.delimiter,
            omit_lower: self.omit_lower,
            omit_upper: self.omit_upper,
            model: self.model,
            check_lower: self.check_lower,
            check_upper: self.check_upper,
        }
    }
}

/// Options for writing a default settings file.
#[derive(Debug, Parser)]
pub struct GenerateArgs {
    #[arg(long, default_value = SETTINGS_FILE)]
    pub path: PathBuf,
}

/// Options for merging `.dict` files.
#[derive(Debug, Parser)]
pub struct CombineArgs {
    /// `.dict` files to merge, in order.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output stem; writes `<stem>.out`.
    #[arg(long, default_value = "all_data", value_name = "STEM")]
    pub output: PathBuf,

    /// Also write `<stem>.dict`.
    #[arg(long)]
    pub dict: bool,
}

/// Options for plotting a saved calibration.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Calibration JSON file produced by `platecal process --curve-json`.
    #[arg(long, value_name = "JSON")]
    pub curve: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}
