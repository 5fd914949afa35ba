use serde::Serialize;

use crate::model::config::TieMethod;
use crate::model::errors::ProfileError;
use crate::model::metrics::MetricDef;
use crate::model::record::EntityId;
use crate::pipeline::stage2_rates::RatedEntity;
use crate::pipeline::stage3_pool::PeerPool;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricScore {
    pub id: String,
    pub label: String,
    pub stat: String,
    pub value: f64,
    pub percentile: f64,
}

pub fn metric_value(entity: &RatedEntity, metric: &MetricDef) -> Option<f64> {
    entity
        .rates
        .get(&metric.stat)
        .map(|rate| metric.value_from_rate(rate))
        .filter(|v| !v.is_nan())
}

/// Percentile of `value` within `pool_values` (which must include the target's
/// own value). `None` for an empty pool.
///
/// `AtOrBelow`: 100 * count(v <= value) / N. Tied values share the score and
/// the pool minimum scores at least 100 / N.
///
/// `AverageRank`: tied values take the mean of the ranks they span,
/// 100 * (count(v < value) + (count(v == value) + 1) / 2) / N.
pub fn percentile_of(value: f64, pool_values: &[f64], method: TieMethod) -> Option<f64> {
    if pool_values.is_empty() {
        return None;
    }
    let n = pool_values.len() as f64;
    let below = pool_values.iter().filter(|&&v| v < value).count() as f64;
    let equal = pool_values.iter().filter(|&&v| v == value).count() as f64;
    let rank = match method {
        TieMethod::AtOrBelow => below + equal,
        TieMethod::AverageRank => below + (equal + 1.0) / 2.0,
    };
    Some(100.0 * rank / n)
}

fn pool_values(pool: &PeerPool<'_>, metric: &MetricDef) -> Vec<f64> {
    pool.members
        .iter()
        .filter_map(|m| metric_value(m, metric))
        .collect()
}

/// Scores `target` on every metric against `pool`.
pub fn rank_entity(
    target: &EntityId,
    pool: &PeerPool<'_>,
    metrics: &[MetricDef],
    method: TieMethod,
    min_pool_size: usize,
) -> Result<Vec<MetricScore>, ProfileError> {
    let entity = target.to_string();
    let pool_label = pool.spec.to_string();
    if pool.is_empty() {
        return Err(ProfileError::EmptyPool {
            entity,
            pool: pool_label,
        });
    }
    let Some(member) = pool.member(target) else {
        return Err(ProfileError::NotInPool {
            entity,
            pool: pool_label,
        });
    };
    if pool.len() < min_pool_size {
        return Err(ProfileError::PoolTooSmall {
            entity,
            pool: pool_label,
            size: pool.len(),
            min: min_pool_size,
        });
    }

    let mut out = Vec::with_capacity(metrics.len());
    for metric in metrics {
        let value = metric_value(member, metric).ok_or_else(|| ProfileError::UnknownStatistic {
            entity: entity.clone(),
            stat: metric.stat.clone(),
        })?;
        let values = pool_values(pool, metric);
        let percentile = percentile_of(value, &values, method).ok_or_else(|| {
            ProfileError::EmptyPool {
                entity: entity.clone(),
                pool: pool_label.clone(),
            }
        })?;
        out.push(MetricScore {
            id: metric.id.clone(),
            label: metric.label.clone(),
            stat: metric.stat.clone(),
            value,
            percentile,
        });
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_percentile.rs"]
mod tests;
