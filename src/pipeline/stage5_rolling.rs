use serde::Serialize;

use crate::model::config::ConfigError;
use crate::model::record::ObservationRecord;
use crate::model::schema::StatSchema;
use crate::pipeline::stage2_rates::per_unit_rate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingParams {
    window: usize,
    min_periods: usize,
}

impl RollingParams {
    pub fn new(window: usize, min_periods: usize) -> Result<Self, ConfigError> {
        if window == 0 || min_periods == 0 || min_periods > window {
            return Err(ConfigError::Invalid(format!(
                "rolling window {window} with min periods {min_periods} (need 1 <= min <= window)"
            )));
        }
        Ok(Self {
            window,
            min_periods,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn min_periods(&self) -> usize {
        self.min_periods
    }
}

/// Trailing means over a borrowed series. Position `i` is `None` while fewer
/// than `min_periods` values are available, otherwise the mean of the last
/// `min(window, i + 1)` values. Holds no state beyond its cursor, so calling
/// `rolling_means` again on the same slice replays the same sequence.
#[derive(Debug, Clone)]
pub struct RollingMeans<'a> {
    values: &'a [f64],
    params: RollingParams,
    pos: usize,
}

pub fn rolling_means(values: &[f64], params: RollingParams) -> RollingMeans<'_> {
    RollingMeans {
        values,
        params,
        pos: 0,
    }
}

impl Iterator for RollingMeans<'_> {
    type Item = Option<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.pos;
        if i >= self.values.len() {
            return None;
        }
        self.pos += 1;
        let available = i + 1;
        if available < self.params.min_periods {
            return Some(None);
        }
        let start = available.saturating_sub(self.params.window);
        let window = &self.values[start..available];
        Some(Some(window.iter().sum::<f64>() / window.len() as f64))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.values.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RollingMeans<'_> {}

/// Per-period rate of one statistic. Missing cells and zero-exposure periods
/// stay in the series (as 0 or the raw value over a floored divisor).
pub fn period_rate(stat: Option<f64>, exposure: f64, rate_unit: f64) -> f64 {
    per_unit_rate(stat.unwrap_or(0.0), exposure, rate_unit)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingSeries {
    pub stat: String,
    pub periods: Vec<u32>,
    pub values: Vec<f64>,
    pub rolling: Vec<Option<f64>>,
    pub season_mean: Option<f64>,
}

/// One series per statistic in `stats` from an entity's period-ordered
/// records. Statistics unknown to the schema are skipped.
pub fn build_series(
    records: &[&ObservationRecord],
    schema: &StatSchema,
    stats: &[String],
    rate_unit: f64,
    params: RollingParams,
) -> Vec<RollingSeries> {
    let periods: Vec<u32> = records.iter().map(|r| r.period).collect();
    stats
        .iter()
        .filter_map(|stat| {
            let idx = schema.stat_index(stat)?;
            let values: Vec<f64> = records
                .iter()
                .map(|r| period_rate(r.stats.get(idx).copied().flatten(), r.exposure, rate_unit))
                .collect();
            let rolling = rolling_means(&values, params).collect();
            let season_mean = if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            };
            Some(RollingSeries {
                stat: stat.clone(),
                periods: periods.clone(),
                values,
                rolling,
                season_mean,
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage5_rolling.rs"]
mod tests;
