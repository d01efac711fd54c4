//! Summary statistics. Empty inputs yield `None` ("n/a" in the report),
//! never zero.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Nearest-rank 95th percentile: the sorted value at
/// `floor(0.95 * (n - 1))`. No interpolation, so `[10, 20, 30]` gives 20.
pub fn p95(values: &[f64]) -> Option<f64> {
    percentile_nearest_rank(values, 0.95)
}

pub fn percentile_nearest_rank(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let idx = (q * (sorted.len() - 1) as f64).floor() as usize;
    sorted.get(idx.min(sorted.len() - 1)).copied()
}

/// Percentage of successful runs.
pub fn success_rate(succeeded: usize, total: usize) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(succeeded as f64 / total as f64 * 100.0)
}

pub fn fmt_num(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.2}"),
        None => "n/a".to_string(),
    }
}
