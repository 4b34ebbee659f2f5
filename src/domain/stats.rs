//! Small numeric helpers shared by the indicators and the performance metrics.

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 divisor); `None` with fewer than two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// `curr / prev - 1`, undefined when `prev` is zero or either input is not finite.
pub fn pct_change(prev: f64, curr: f64) -> Option<f64> {
    if prev == 0.0 || !prev.is_finite() || !curr.is_finite() {
        return None;
    }
    Some(curr / prev - 1.0)
}

/// Period-over-period percentage changes of a series, one shorter than the input.
/// Undefined steps are skipped.
pub fn pct_changes(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter_map(|w| pct_change(w[0], w[1]))
        .collect()
}
