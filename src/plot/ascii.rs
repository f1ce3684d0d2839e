//! ASCII plotting of the standard curve for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - standards used in the fit: `o`
//! - omitted standards: `x`
//! - fitted curve: `-` line
//!
//! x is concentration, y is blank-corrected absorbance.

use crate::domain::{CalibrationResult, StandardPoint};
use crate::io::CalibrationFile;
use crate::models::FitModel;

/// Render a plot for an in-memory calibration.
pub fn render_calibration_plot(
    calibration: &CalibrationResult,
    units: &str,
    width: usize,
    height: usize,
) -> String {
    let (c_min, c_max) = concentration_range(&calibration.points).unwrap_or((0.0, 1.0));
    let curve = sample_curve(&calibration.model, c_min, c_max, width.max(2));
    render_plot(&calibration.points, &curve, c_min, c_max, units, width, height)
}

/// Render a plot from a saved calibration JSON file.
pub fn render_curve_file_plot(curve: &CalibrationFile, width: usize, height: usize) -> String {
    let curve_points: Vec<(f64, f64)> = curve
        .grid
        .concentration
        .iter()
        .zip(&curve.grid.absorbance)
        .map(|(&c, &a)| (c, a))
        .collect();
    let (c_min, c_max) = concentration_range(&curve.points)
        .or_else(|| span(curve_points.iter().map(|p| p.0)))
        .unwrap_or((0.0, 1.0));

    render_plot(&curve.points, &curve_points, c_min, c_max, &curve.units, width, height)
}

fn render_plot(
    points: &[StandardPoint],
    curve: &[(f64, f64)],
    c_min: f64,
    c_max: f64,
    units: &str,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let observed = points.iter().map(|p| p.absorbance);
    let (y_min, y_max) = span(observed.chain(curve.iter().map(|p| p.1))).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so points overlay it.
    draw_curve(&mut grid, curve, c_min, c_max, y_min, y_max);

    for p in points {
        let x = map_x(p.concentration, c_min, c_max, width);
        let y = map_y(p.absorbance, y_min, y_max, height);
        grid[y][x] = if p.used { 'o' } else { 'x' };
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: conc=[{c_min:.3}, {c_max:.3}] {units} | abs=[{y_min:.3}, {y_max:.3}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn concentration_range(points: &[StandardPoint]) -> Option<(f64, f64)> {
    span(points.iter().map(|p| p.concentration))
}

/// `(min, max)` of the finite values, when they span a non-empty interval.
fn span(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo.is_finite() && hi.is_finite() && hi > lo {
        Some((lo, hi))
    } else {
        None
    }
}

fn sample_curve(model: &FitModel, c_min: f64, c_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .filter_map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let c = c_min + u * (c_max - c_min);
            model.absorbance_at(c).ok().map(|a| (c, a))
        })
        .collect()
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(c: f64, c_min: f64, c_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((c - c_min) / (c_max - c_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], c_min: f64, c_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(c, y) in curve {
        let x = map_x(c, c_min, c_max, width);
        let yy = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, yy, '-'),
            None => grid[yy][x] = '-',
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
