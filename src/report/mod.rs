pub mod json;
pub mod text;

use serde::Serialize;

use crate::pipeline::stage6_profile::ProfileOutcome;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub tool_name: String,
    pub tool_version: String,

    pub n_batches: usize,
    pub n_records: usize,
    pub n_entities: usize,
    pub n_rated: usize,
    pub n_rejected: usize,
    pub n_with_metadata: usize,

    pub rate_unit: f64,
    pub exposure_threshold: f64,
    pub min_pool_size: usize,
    pub tie_method: String,
    pub pool_scope: String,
    pub zero_exposure: String,
    pub exclude_if_positive: Vec<String>,
    pub stats: Vec<String>,
    pub rolling_window: Option<usize>,
    pub rolling_min_periods: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub request: String,
    pub entity: String,
    pub kind: &'static str,
    pub message: String,
}

pub fn failures(outcomes: &[ProfileOutcome]) -> Vec<FailureRecord> {
    outcomes
        .iter()
        .filter_map(|o| {
            let err = o.result.as_ref().err()?;
            Some(FailureRecord {
                request: o.request.clone(),
                entity: err.entity().to_string(),
                kind: err.kind(),
                message: err.to_string(),
            })
        })
        .collect()
}

pub fn format_f64_2(v: f64) -> String {
    format!("{:.2}", v)
}

/// Percentile bands used when annotating profiles: >=75 strong, 50-74
/// average, below 50 weak.
pub fn percentile_band(p: f64) -> &'static str {
    if p >= 75.0 {
        "strong"
    } else if p >= 50.0 {
        "average"
    } else {
        "weak"
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}
