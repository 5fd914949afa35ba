use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Higher,
    Lower,
}

/// A ranked profile axis derived from one statistic's rate.
///
/// `Lower` axes are ranked on `1 / (rate + inverse_offset)` so that a low rate
/// (e.g. bookings per 90) lands at a high percentile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDef {
    pub id: String,
    pub label: String,
    pub stat: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default = "default_inverse_offset")]
    pub inverse_offset: f64,
}

pub const DEFAULT_INVERSE_OFFSET: f64 = 0.1;

fn default_inverse_offset() -> f64 {
    DEFAULT_INVERSE_OFFSET
}

impl MetricDef {
    pub fn per_unit(id: &str, label: &str, stat: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            stat: stat.to_string(),
            direction: Direction::Higher,
            inverse_offset: DEFAULT_INVERSE_OFFSET,
        }
    }

    pub fn inverse(id: &str, label: &str, stat: &str, offset: f64) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            stat: stat.to_string(),
            direction: Direction::Lower,
            inverse_offset: offset,
        }
    }

    pub fn value_from_rate(&self, rate: f64) -> f64 {
        match self.direction {
            Direction::Higher => rate,
            Direction::Lower => 1.0 / (rate + self.inverse_offset),
        }
    }
}

pub fn default_metric_set() -> Vec<MetricDef> {
    vec![
        MetricDef::per_unit("xgi_p90", "xG Involvements / 90", "expected_goal_involvements"),
        MetricDef::per_unit("creativity_p90", "Creativity / 90", "creativity"),
        MetricDef::per_unit("tackles_p90", "Tackles / 90", "tackles"),
        MetricDef::per_unit("recoveries_p90", "Recoveries / 90", "recoveries"),
        MetricDef::per_unit(
            "def_contrib_p90",
            "Defensive Contribution / 90",
            "defensive_contribution",
        ),
        MetricDef::per_unit("influence_p90", "Influence / 90", "influence"),
    ]
}

/// Unique statistics referenced by `metrics`, in first-use order.
pub fn referenced_stats(metrics: &[MetricDef]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(metrics.len());
    for m in metrics {
        if !out.contains(&m.stat) {
            out.push(m.stat.clone());
        }
    }
    out
}
