//! Descriptive statistics over replicate absorbances.

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by `n`); 0 for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    let Some(m) = mean(values) else {
        return 0.0;
    };
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Coefficient of determination `1 - SSE/SST` for observed vs fitted values.
///
/// Returns 1.0 when the observations have no spread and the fit is exact,
/// 0.0 when they have no spread and the fit is not.
pub fn r_squared(observed: &[f64], fitted: &[f64]) -> f64 {
    let Some(m) = mean(observed) else {
        return 0.0;
    };
    let sse: f64 = observed.iter().zip(fitted).map(|(o, f)| (o - f).powi(2)).sum();
    let sst: f64 = observed.iter().map(|o| (o - m).powi(2)).sum();
    if sst <= 0.0 {
        return if sse <= 1e-24 { 1.0 } else { 0.0 };
    }
    1.0 - sse / sst
}

/// Sum of squared differences.
pub fn sse(observed: &[f64], fitted: &[f64]) -> f64 {
    observed.iter().zip(fitted).map(|(o, f)| (o - f).powi(2)).sum()
}
