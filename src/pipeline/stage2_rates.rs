use std::collections::BTreeMap;

use crate::model::config::ZeroExposurePolicy;
use crate::model::errors::ProfileError;
use crate::model::schema::StatSchema;
use crate::model::summary::EntitySummary;

/// Per-unit rates of one entity keyed by statistic name.
///
/// `degenerate` is set when the entity has zero total exposure: the divisor
/// was floored to 1, so every rate equals the raw season total. Such entities
/// are expected to fall below any exposure threshold; do not read their rates
/// as meaningful.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRates {
    pub values: BTreeMap<String, f64>,
    pub degenerate: bool,
}

impl StatRates {
    pub fn get(&self, stat: &str) -> Option<f64> {
        self.values.get(stat).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatedEntity {
    pub summary: EntitySummary,
    pub rates: StatRates,
}

#[derive(Debug)]
pub struct Stage2Output {
    pub rated: Vec<RatedEntity>,
    pub rejected: Vec<(EntitySummary, ProfileError)>,
}

pub fn per_unit_rate(total: f64, exposure: f64, rate_unit: f64) -> f64 {
    total / exposure.max(1.0) * rate_unit
}

pub fn normalize(
    summary: &EntitySummary,
    schema: &StatSchema,
    rate_unit: f64,
    policy: ZeroExposurePolicy,
) -> Result<StatRates, ProfileError> {
    let zero_exposure = summary.total_exposure <= 0.0;
    if zero_exposure && policy == ZeroExposurePolicy::Reject {
        return Err(ProfileError::EmptyExposure {
            entity: summary.entity.to_string(),
        });
    }

    let values = schema
        .stats
        .iter()
        .enumerate()
        .map(|(idx, stat)| {
            (
                stat.clone(),
                per_unit_rate(summary.total(idx), summary.total_exposure, rate_unit),
            )
        })
        .collect();

    Ok(StatRates {
        values,
        degenerate: zero_exposure,
    })
}

pub fn run_stage2(
    summaries: &[EntitySummary],
    schema: &StatSchema,
    rate_unit: f64,
    policy: ZeroExposurePolicy,
) -> Stage2Output {
    let mut rated = Vec::with_capacity(summaries.len());
    let mut rejected = Vec::new();
    let mut degenerate = 0usize;

    for summary in summaries {
        match normalize(summary, schema, rate_unit, policy) {
            Ok(rates) => {
                if rates.degenerate {
                    degenerate += 1;
                }
                rated.push(RatedEntity {
                    summary: summary.clone(),
                    rates,
                });
            }
            Err(err) => rejected.push((summary.clone(), err)),
        }
    }

    if degenerate > 0 {
        tracing::warn!(
            degenerate,
            "entities with zero exposure carry raw totals as rates"
        );
    }
    if !rejected.is_empty() {
        tracing::warn!(
            rejected = rejected.len(),
            "entities with zero exposure rejected"
        );
    }

    Stage2Output { rated, rejected }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_rates.rs"]
mod tests;
