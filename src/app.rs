//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - resolves plates and their settings
//! - runs the per-plate pipeline (in parallel)
//! - prints summaries/plots and writes outputs (sequentially, in input order)

use std::path::Path;

use clap::Parser;
use rayon::prelude::*;

use crate::cli::{Command, CombineArgs, GenerateArgs, PlotArgs, ProcessArgs};
use crate::domain::Settings;
use crate::error::AppError;
use crate::io::{
    CalibrationFile, PlateDict, PlatePaths, PlateSource, SETTINGS_FILE, combine_dicts, generate_settings,
    resolve_settings, read_curve_json, read_dict, resolve_plates, with_suffix, write_curve_json, write_dict,
    write_fit_file, write_table, write_text,
};
use crate::report::{format_log, format_plate_summary, format_qc, format_rows};

pub mod pipeline;

use pipeline::PlateRun;

/// Entry point for the `platecal` binary.
pub fn run() -> Result<(), AppError> {
    // `platecal a b` and `platecal --plot` behave like `platecal process ...`.
    //
    // Clap requires a subcommand name, so we rewrite argv before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_logging(cli.verbose);

    match cli.command {
        Command::Process(args) => handle_process(args, cli.verbose),
        Command::GenerateSettings(args) => handle_generate(args),
        Command::Combine(args) => handle_combine(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    // A logger may already be installed (tests, embedding); keep it.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

fn handle_process(args: ProcessArgs, verbose: u8) -> Result<(), AppError> {
    let overrides = args.overrides();
    let base = resolve_settings(&args.settings, &overrides)?;

    let cwd = Path::new(".");
    let plates = resolve_plates(&PlateSource {
        inputs: &args.inputs,
        file_list: args.file_list.as_deref(),
        settings_list: &base.file_list,
        dir: cwd,
    })?;
    if plates.is_empty() {
        return Err(AppError::new(2, "No plates found (need matching .txt and .spec files)."));
    }

    let mut jobs: Vec<(PlatePaths, Settings)> = Vec::with_capacity(plates.len());
    for plate in plates {
        let settings = if args.local_settings {
            let dir = plate.stem.parent().unwrap_or(cwd);
            resolve_settings(&dir.join(SETTINGS_FILE), &overrides)?
        } else {
            base.clone()
        };
        jobs.push((plate, settings));
    }

    log::info!("processing {} plate(s)", jobs.len());
    let compute_data = !args.no_data;
    let results: Vec<Result<PlateRun, AppError>> = jobs
        .par_iter()
        .map(|(plate, settings)| pipeline::run_plate(plate, settings, compute_data))
        .collect();

    finish_batch(results, &args, verbose)
}

/// Print, write and combine processed plates in input order.
///
/// A plate that failed to process or to write its outputs is logged and
/// counted; the rest of the batch still runs. A plate whose own files could
/// not be written still contributes its rows to the combined table.
fn finish_batch(
    results: Vec<Result<PlateRun, AppError>>,
    args: &ProcessArgs,
    verbose: u8,
) -> Result<(), AppError> {
    let total = results.len();
    let mut first_failure: Option<AppError> = None;
    let mut failures = 0usize;
    let mut dicts = Vec::new();

    for result in results {
        let run = match result {
            Ok(run) => run,
            Err(err) => {
                log::error!("{err}; plate skipped");
                failures += 1;
                first_failure.get_or_insert(err);
                continue;
            }
        };

        print_plate(&run, args, verbose);
        if let Err(err) = write_outputs(&run, args) {
            let err = AppError::new(err.exit_code(), format!("{}: {err}", run.plate.name()));
            log::error!("{err}; outputs incomplete");
            failures += 1;
            first_failure.get_or_insert(err);
        }

        if let Some(data) = &run.outcome.data {
            dicts.push(PlateDict {
                sources: vec![run.plate.name()],
                units: run.settings.std_units.clone(),
                rows: data.rows.clone(),
            });
        }
    }

    if args.combine && !dicts.is_empty() {
        let combined = combine_dicts(&dicts);
        write_table(&with_suffix(&args.combined, "out"), &combined.rows)?;
        if args.dict {
            write_dict(&with_suffix(&args.combined, "dict"), &combined)?;
        }
        log::info!("combined {} plate(s) into '{}'", dicts.len(), args.combined.display());
    }

    match first_failure {
        None => Ok(()),
        Some(err) if total == 1 => Err(err),
        Some(err) => Err(AppError::new(
            err.exit_code(),
            format!("{failures} of {total} plate(s) failed; first error: {err}"),
        )),
    }
}

fn print_plate(run: &PlateRun, args: &ProcessArgs, verbose: u8) {
    let name = run.plate.name();
    let calibration = &run.outcome.calibration;
    println!("{}", format_plate_summary(&name, calibration));

    if args.plot {
        let plot = crate::plot::render_calibration_plot(
            calibration,
            &run.settings.std_units,
            args.width,
            args.height,
        );
        println!("{plot}");
    }

    if let Some(data) = &run.outcome.data {
        if verbose > 0 {
            println!("{}", format_rows(&data.rows, &run.settings.std_units));
            let qc = format_qc(&data.qc);
            if !qc.is_empty() {
                println!("{qc}");
            }
        }
    }
}

fn write_outputs(run: &PlateRun, args: &ProcessArgs) -> Result<(), AppError> {
    let plate = &run.plate;
    let settings = &run.settings;
    let calibration = &run.outcome.calibration;
    let units = settings.std_units.as_str();

    if !args.no_fit {
        write_fit_file(&plate.output("fit"), calibration, units)?;
    }

    if let Some(data) = &run.outcome.data {
        if !args.omit_local {
            write_table(&plate.output("out"), &data.rows)?;
            let dict = PlateDict {
                sources: vec![plate.name()],
                units: units.to_string(),
                rows: data.rows.clone(),
            };
            write_dict(&plate.output("dict"), &dict)?;
        }
    }

    if !args.no_logs {
        let qc = run.outcome.data.as_ref().map(|d| &d.qc);
        let text = format_log(
            &plate.name(),
            calibration,
            settings,
            qc,
            chrono::Local::now().naive_local(),
        );
        write_text(&plate.output("log"), &text)?;
    }

    if args.curve_json {
        let curve = CalibrationFile::new(&plate.name(), units, calibration);
        write_curve_json(&plate.output("curve.json"), &curve)?;
    }

    Ok(())
}

fn handle_generate(args: GenerateArgs) -> Result<(), AppError> {
    generate_settings(&args.path)?;
    println!("Wrote default settings to {}", args.path.display());
    Ok(())
}

fn handle_combine(args: CombineArgs) -> Result<(), AppError> {
    let mut dicts = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        dicts.push(read_dict(path).map_err(|e| AppError::from_plate(path, e))?);
    }
    let combined = combine_dicts(&dicts);

    let out = with_suffix(&args.output, "out");
    write_table(&out, &combined.rows)?;
    if args.dict {
        write_dict(&with_suffix(&args.output, "dict"), &combined)?;
    }
    println!(
        "Combined {} row(s) from {} file(s) into {}",
        combined.rows.len(),
        dicts.len(),
        out.display()
    );
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let curve = read_curve_json(&args.curve).map_err(|e| AppError::from_plate(&args.curve, e))?;
    let plot = crate::plot::render_curve_file_plot(&curve, args.width, args.height);
    println!("{plot}");
    Ok(())
}

/// Rewrite argv so `platecal` defaults to `platecal process`.
///
/// Rules:
/// - `platecal`                         -> `platecal process`
/// - `platecal p1 p2` / `platecal -v`   -> `platecal process p1 p2` / `platecal process -v`
/// - `platecal --help/--version/-h`     -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("process".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "process" | "generate-settings" | "combine" | "plot"
    );
    if is_subcommand {
        return argv;
    }

    argv.insert(1, "process".to_string());
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_inputs_default_to_process() {
        assert_eq!(
            rewrite_args(args(&["platecal", "p1", "p2"])),
            args(&["platecal", "process", "p1", "p2"])
        );
        assert_eq!(rewrite_args(args(&["platecal"])), args(&["platecal", "process"]));
        assert_eq!(
            rewrite_args(args(&["platecal", "-v", "--plot"])),
            args(&["platecal", "process", "-v", "--plot"])
        );
    }

    const EXPORT: &str = "\t22.0\t0.05\t0.15\t0.25\t\t\n\t\t0.05\t0.45\t0.30\t\t\n\t\t0.05\t0.85\t1.65\t\t\n";
    const LAYOUT: &str = "blk\tstd-1\tstd-2\nblk\tstd-4\tAb1-d1\nblk\tstd-8\tstd-16\n";

    fn plate_run(dir: &Path, stem: &str) -> PlateRun {
        std::fs::write(dir.join(format!("{stem}.txt")), EXPORT).unwrap();
        std::fs::write(dir.join(format!("{stem}.spec")), LAYOUT).unwrap();
        let plate = crate::io::pair_files(&dir.join(stem)).unwrap();
        let settings = Settings {
            omit_upper: 0,
            ..Settings::default()
        };
        pipeline::run_plate(&plate, &settings, true).unwrap()
    }

    #[test]
    fn write_failure_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let good = plate_run(dir.path(), "good");
        let mut broken = plate_run(dir.path(), "broken");
        // Outputs for this plate land in a directory that does not exist.
        broken.plate.stem = dir.path().join("missing").join("broken");

        let combined = dir.path().join("all");
        let args = ProcessArgs::parse_from([
            "process".to_string(),
            "--no-logs".to_string(),
            "--combine".to_string(),
            "--combined".to_string(),
            combined.display().to_string(),
        ]);

        let err = finish_batch(vec![Ok(broken), Ok(good)], &args, 0).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().starts_with("1 of 2 plate(s) failed"), "{err}");
        assert!(err.to_string().contains("broken"), "{err}");

        // The plate after the failure and the combined table were still written.
        assert!(dir.path().join("good.fit").is_file());
        assert!(dir.path().join("good.out").is_file());
        let table = std::fs::read_to_string(dir.path().join("all.out")).unwrap();
        assert_eq!(table.lines().count(), 1 + 2);
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        for argv in [
            args(&["platecal", "--help"]),
            args(&["platecal", "combine", "a.dict"]),
            args(&["platecal", "generate-settings"]),
        ] {
            assert_eq!(rewrite_args(argv.clone()), argv);
        }
    }
}
