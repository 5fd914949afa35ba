use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::metrics::{Direction, MetricDef, default_metric_set};
use crate::model::schema::StatSchema;

pub const DEFAULT_RATE_UNIT: f64 = 90.0;
pub const DEFAULT_EXPOSURE_THRESHOLD: f64 = 600.0;
pub const DEFAULT_ROLLING_WINDOW: usize = 5;
pub const DEFAULT_ROLLING_MIN_PERIODS: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TieMethod {
    /// 100 * count(v <= x) / N
    #[default]
    AtOrBelow,
    /// 100 * (count(v < x) + (count(v == x) + 1) / 2) / N
    AverageRank,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PoolScope {
    #[default]
    Category,
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ZeroExposurePolicy {
    /// Divide by max(exposure, 1); zero-exposure rates equal raw totals.
    #[default]
    Floor,
    /// Zero-exposure entities fail with `EmptyExposure`.
    Reject,
}

impl TieMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TieMethod::AtOrBelow => "at_or_below",
            TieMethod::AverageRank => "average_rank",
        }
    }
}

impl PoolScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolScope::Category => "category",
            PoolScope::All => "all",
        }
    }
}

impl ZeroExposurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZeroExposurePolicy::Floor => "floor",
            ZeroExposurePolicy::Reject => "reject",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataColumns {
    pub id_column: String,
    pub name_column: Option<String>,
    pub category_column: Option<String>,
    pub team_column: Option<String>,
}

impl Default for MetadataColumns {
    fn default() -> Self {
        Self {
            id_column: "player_id".to_string(),
            name_column: Some("web_name".to_string()),
            category_column: Some("position".to_string()),
            team_column: Some("team_code".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub rate_unit: f64,
    pub exposure_threshold: f64,
    pub rolling_window: usize,
    pub rolling_min_periods: usize,
    pub min_pool_size: usize,
    pub tie_method: TieMethod,
    pub pool_scope: PoolScope,
    pub zero_exposure: ZeroExposurePolicy,
    pub input_suffix: String,
    pub exclude_if_positive: Vec<String>,
    pub schema: StatSchema,
    pub metadata: MetadataColumns,
    pub metric_set: Vec<MetricDef>,
    pub category_metrics: BTreeMap<String, Vec<MetricDef>>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            rate_unit: DEFAULT_RATE_UNIT,
            exposure_threshold: DEFAULT_EXPOSURE_THRESHOLD,
            rolling_window: DEFAULT_ROLLING_WINDOW,
            rolling_min_periods: DEFAULT_ROLLING_MIN_PERIODS,
            min_pool_size: 1,
            tie_method: TieMethod::AtOrBelow,
            pool_scope: PoolScope::Category,
            zero_exposure: ZeroExposurePolicy::Floor,
            input_suffix: ".csv".to_string(),
            exclude_if_positive: Vec::new(),
            schema: StatSchema::default(),
            metadata: MetadataColumns::default(),
            metric_set: default_metric_set(),
            category_metrics: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {err}")]
    Read {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to parse config file {path}: {err}")]
    Parse {
        path: PathBuf,
        #[source]
        err: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ProfileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            err,
        })?;
        toml::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            err,
        })
    }

    /// Weekly football export with per-position axes: keepers are ranked on
    /// shot stopping, outfield roles on their own six axes.
    pub fn positional_v1() -> Self {
        let mut base = Self::default();
        base.schema.stats = [
            "expected_goals",
            "expected_assists",
            "expected_goal_involvements",
            "clearances_blocks_interceptions",
            "tackles",
            "recoveries",
            "defensive_contribution",
            "creativity",
            "threat",
            "influence",
            "saves",
            "goals_conceded",
            "yellow_cards",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let xg = MetricDef::per_unit("xg_p90", "xG / 90", "expected_goals");
        let xa = MetricDef::per_unit("xa_p90", "xA / 90", "expected_assists");
        let xgi = MetricDef::per_unit("xgi_p90", "xG+xA / 90", "expected_goal_involvements");
        let cbi = MetricDef::per_unit(
            "cbi_p90",
            "Clearances Blocks Interceptions / 90",
            "clearances_blocks_interceptions",
        );
        let tackles = MetricDef::per_unit("tackles_p90", "Tackles / 90", "tackles");
        let recoveries = MetricDef::per_unit("recoveries_p90", "Recoveries / 90", "recoveries");
        let def_contrib = MetricDef::per_unit(
            "def_contrib_p90",
            "Defensive Contribution / 90",
            "defensive_contribution",
        );
        let creativity = MetricDef::per_unit("creativity_p90", "Creativity / 90", "creativity");
        let threat = MetricDef::per_unit("threat_p90", "Threat / 90", "threat");
        let discipline = MetricDef::inverse("discipline", "Discipline", "yellow_cards", 0.1);

        base.category_metrics.insert(
            "Goalkeeper".to_string(),
            vec![
                MetricDef::per_unit("saves_p90", "Saves / 90", "saves"),
                MetricDef::inverse(
                    "goals_conceded_inv",
                    "Goals Conceded / 90 (inv)",
                    "goals_conceded",
                    0.1,
                ),
                def_contrib.clone(),
                discipline.clone(),
            ],
        );
        base.category_metrics.insert(
            "Defender".to_string(),
            vec![
                xgi.clone(),
                cbi,
                tackles,
                def_contrib.clone(),
                discipline.clone(),
                recoveries,
            ],
        );
        base.category_metrics.insert(
            "Midfielder".to_string(),
            vec![
                xg.clone(),
                xa.clone(),
                creativity.clone(),
                threat.clone(),
                def_contrib.clone(),
                discipline.clone(),
            ],
        );
        base.category_metrics.insert(
            "Forward".to_string(),
            vec![xg, xa, threat, creativity, def_contrib, discipline],
        );
        base.metric_set = vec![xgi];
        base
    }

    /// Commented starter file written by `init-config`.
    pub fn default_toml() -> Result<String, ConfigError> {
        let body = toml::to_string_pretty(&Self::positional_v1())?;
        let mut out = String::new();
        out.push_str("# peerprofile configuration\n");
        out.push_str("# rate_unit: per-X basis for rates (90 = per 90 minutes)\n");
        out.push_str("# exposure_threshold: minimum season exposure for pool eligibility (inclusive)\n");
        out.push_str("# tie_method: at_or_below | average_rank\n");
        out.push_str("# pool_scope: category | all\n");
        out.push_str("# zero_exposure: floor | reject\n");
        out.push_str("# exclude_if_positive: e.g. [\"saves\"] drops keepers from outfield pools\n\n");
        out.push_str(&body);
        Ok(out)
    }

    pub fn metrics_for(&self, category: Option<&str>) -> &[MetricDef] {
        category
            .and_then(|c| self.category_metrics.get(c))
            .map(|v| v.as_slice())
            .unwrap_or(&self.metric_set)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rate_unit.is_finite() && self.rate_unit > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "rate_unit must be positive, got {}",
                self.rate_unit
            )));
        }
        if !(self.exposure_threshold.is_finite() && self.exposure_threshold >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "exposure_threshold must be non-negative, got {}",
                self.exposure_threshold
            )));
        }
        if self.rolling_window == 0 {
            return Err(ConfigError::Invalid(
                "rolling_window must be at least 1".to_string(),
            ));
        }
        if self.rolling_min_periods == 0 || self.rolling_min_periods > self.rolling_window {
            return Err(ConfigError::Invalid(format!(
                "rolling_min_periods must be in 1..={}, got {}",
                self.rolling_window, self.rolling_min_periods
            )));
        }
        if self.min_pool_size == 0 {
            return Err(ConfigError::Invalid(
                "min_pool_size must be at least 1".to_string(),
            ));
        }
        if self.metric_set.is_empty() {
            return Err(ConfigError::Invalid("metric_set is empty".to_string()));
        }
        validate_metric_list("metric_set", &self.metric_set)?;
        for (category, metrics) in &self.category_metrics {
            if metrics.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "category_metrics.{category} is empty"
                )));
            }
            validate_metric_list(&format!("category_metrics.{category}"), metrics)?;
        }
        Ok(())
    }

    /// Every statistic named by metrics or exclusions must exist in `schema`.
    /// Run after the schema is final (declared or inferred from the first batch).
    pub fn validate_against_schema(&self, schema: &StatSchema) -> Result<(), ConfigError> {
        let all_metrics = self
            .metric_set
            .iter()
            .chain(self.category_metrics.values().flatten());
        for metric in all_metrics {
            if schema.stat_index(&metric.stat).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "metric {} references unknown statistic {}",
                    metric.id, metric.stat
                )));
            }
        }
        for stat in &self.exclude_if_positive {
            if schema.stat_index(stat).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "exclude_if_positive references unknown statistic {stat}"
                )));
            }
        }
        Ok(())
    }
}

fn validate_metric_list(context: &str, metrics: &[MetricDef]) -> Result<(), ConfigError> {
    let mut seen = std::collections::BTreeSet::new();
    for metric in metrics {
        if !seen.insert(metric.id.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "{context}: duplicate metric id {}",
                metric.id
            )));
        }
        if metric.direction == Direction::Lower
            && !(metric.inverse_offset.is_finite() && metric.inverse_offset > 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "{context}: metric {} needs a positive inverse_offset",
                metric.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/config.rs"]
mod tests;
