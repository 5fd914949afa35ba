use serde::{Deserialize, Serialize};

/// Declared column layout of every record batch in a run.
///
/// An empty `stats` list means the statistic set is inferred from the first
/// batch and every later batch must carry exactly the same set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatSchema {
    pub entity_column: String,
    pub period_column: String,
    pub exposure_column: String,
    pub name_column: Option<String>,
    pub stats: Vec<String>,
}

impl Default for StatSchema {
    fn default() -> Self {
        Self {
            entity_column: "id".to_string(),
            period_column: "gw".to_string(),
            exposure_column: "minutes".to_string(),
            name_column: Some("web_name".to_string()),
            stats: default_stats(),
        }
    }
}

pub fn default_stats() -> Vec<String> {
    [
        "expected_goal_involvements",
        "creativity",
        "tackles",
        "recoveries",
        "defensive_contribution",
        "influence",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl StatSchema {
    pub fn stat_index(&self, name: &str) -> Option<usize> {
        self.stats.iter().position(|s| s == name)
    }

    pub fn n_stats(&self) -> usize {
        self.stats.len()
    }

    pub fn is_inferred(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn is_key_column(&self, column: &str) -> bool {
        column == self.entity_column
            || column == self.period_column
            || column == self.exposure_column
            || self.name_column.as_deref() == Some(column)
    }
}
