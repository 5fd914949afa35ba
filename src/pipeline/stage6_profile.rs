use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::model::config::{PoolScope, ProfileConfig};
use crate::model::errors::ProfileError;
use crate::model::metrics::referenced_stats;
use crate::model::record::{Corpus, EntityId};
use crate::model::summary::EntitySummary;
use crate::pipeline::stage2_rates::RatedEntity;
use crate::pipeline::stage3_pool::{PoolSpec, select_pool};
use crate::pipeline::stage4_percentile::{MetricScore, rank_entity};
use crate::pipeline::stage5_rolling::{RollingParams, RollingSeries, build_series};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRequest {
    Id(EntityId),
    Name(String),
    Team(String),
}

impl fmt::Display for EntityRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRequest::Id(id) => write!(f, "id:{id}"),
            EntityRequest::Name(name) => write!(f, "name:{name}"),
            EntityRequest::Team(team) => write!(f, "team:{team}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolInfo {
    pub description: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityProfile {
    pub entity: EntityId,
    pub name: String,
    pub category: Option<String>,
    pub team: Option<String>,
    pub total_exposure: f64,
    pub appearances: u32,
    pub degenerate_rates: bool,
    pub pool: PoolInfo,
    pub metrics: Vec<MetricScore>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rolling: Vec<RollingSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileOutcome {
    pub request: String,
    pub result: Result<EntityProfile, ProfileError>,
}

#[derive(Debug, Clone)]
pub struct Stage6Inputs<'a> {
    pub corpus: &'a Corpus,
    pub population: &'a [RatedEntity],
    pub rejected: &'a [(EntitySummary, ProfileError)],
    pub config: &'a ProfileConfig,
    pub rolling: Option<RollingParams>,
}

/// What a request resolved to before profiling.
enum Target<'a> {
    Rated(&'a RatedEntity),
    Failed(ProfileError),
}

pub fn run_stage6(inputs: &Stage6Inputs<'_>, requests: &[EntityRequest]) -> Vec<ProfileOutcome> {
    let mut seen: BTreeSet<EntityId> = BTreeSet::new();
    let mut out = Vec::new();

    for request in requests {
        for target in resolve_request(inputs, request) {
            let (label, result) = match target {
                Target::Rated(entity) => {
                    if !seen.insert(entity.summary.entity.clone()) {
                        continue;
                    }
                    (
                        entity.summary.entity.to_string(),
                        build_profile(inputs, entity),
                    )
                }
                Target::Failed(err) => (request.to_string(), Err(err)),
            };
            match &result {
                Ok(profile) => tracing::info!(
                    entity = %profile.entity,
                    name = %profile.name,
                    pool = profile.pool.size,
                    "profile built"
                ),
                Err(err) => tracing::warn!(request = %label, "profile failed: {err}"),
            }
            out.push(ProfileOutcome {
                request: label,
                result,
            });
        }
    }

    out
}

fn resolve_request<'a>(inputs: &Stage6Inputs<'a>, request: &EntityRequest) -> Vec<Target<'a>> {
    match request {
        EntityRequest::Id(id) => vec![resolve_one(inputs, id.as_str(), |s| &s.entity == id)],
        EntityRequest::Name(name) => {
            let matches: Vec<&RatedEntity> = inputs
                .population
                .iter()
                .filter(|e| e.summary.name.eq_ignore_ascii_case(name))
                .collect();
            if matches.len() > 1 {
                let ids: Vec<&str> = matches.iter().map(|e| e.summary.entity.as_str()).collect();
                tracing::warn!(name = %name, ?ids, "display name is shared; profiling every match");
            }
            if matches.is_empty() {
                return vec![resolve_one(inputs, name, |s| s.name.eq_ignore_ascii_case(name))];
            }
            matches.into_iter().map(Target::Rated).collect()
        }
        EntityRequest::Team(team) => {
            let mut members: Vec<&RatedEntity> = inputs
                .population
                .iter()
                .filter(|e| e.summary.team.as_deref() == Some(team.as_str()))
                .filter(|e| e.summary.total_exposure >= inputs.config.exposure_threshold)
                .collect();
            if members.is_empty() {
                return vec![Target::Failed(ProfileError::MissingEntity {
                    entity: format!("team {team} (no entity meets the exposure threshold)"),
                })];
            }
            members.sort_by(|a, b| {
                b.summary
                    .total_exposure
                    .total_cmp(&a.summary.total_exposure)
                    .then_with(|| a.summary.entity.cmp(&b.summary.entity))
            });
            members.into_iter().map(Target::Rated).collect()
        }
    }
}

fn resolve_one<'a, F>(inputs: &Stage6Inputs<'a>, label: &str, matches: F) -> Target<'a>
where
    F: Fn(&EntitySummary) -> bool,
{
    if let Some(entity) = inputs.population.iter().find(|e| matches(&e.summary)) {
        return Target::Rated(entity);
    }
    if let Some((_, err)) = inputs.rejected.iter().find(|(s, _)| matches(s)) {
        return Target::Failed(err.clone());
    }
    Target::Failed(ProfileError::MissingEntity {
        entity: label.to_string(),
    })
}

pub fn pool_spec_for(
    entity: &RatedEntity,
    config: &ProfileConfig,
) -> Result<PoolSpec, ProfileError> {
    let category = match config.pool_scope {
        PoolScope::All => None,
        PoolScope::Category => match &entity.summary.category {
            Some(c) => Some(c.clone()),
            None => {
                return Err(ProfileError::NotInPool {
                    entity: entity.summary.entity.to_string(),
                    pool: "category-scoped pool; entity has no category".to_string(),
                });
            }
        },
    };
    Ok(PoolSpec {
        min_exposure: config.exposure_threshold,
        category,
        exclude_if_positive: config.exclude_if_positive.clone(),
    })
}

pub fn build_profile(
    inputs: &Stage6Inputs<'_>,
    entity: &RatedEntity,
) -> Result<EntityProfile, ProfileError> {
    let config = inputs.config;
    let summary = &entity.summary;
    let spec = pool_spec_for(entity, config)?;
    let pool = select_pool(inputs.population, &spec, &inputs.corpus.schema);
    let metrics = config.metrics_for(summary.category.as_deref());
    let scores = rank_entity(
        &summary.entity,
        &pool,
        metrics,
        config.tie_method,
        config.min_pool_size,
    )?;

    let rolling = match inputs.rolling {
        Some(params) => {
            let records = inputs.corpus.entity_records(&summary.entity);
            build_series(
                &records,
                &inputs.corpus.schema,
                &referenced_stats(metrics),
                config.rate_unit,
                params,
            )
        }
        None => Vec::new(),
    };

    Ok(EntityProfile {
        entity: summary.entity.clone(),
        name: summary.name.clone(),
        category: summary.category.clone(),
        team: summary.team.clone(),
        total_exposure: summary.total_exposure,
        appearances: summary.appearances,
        degenerate_rates: entity.rates.degenerate,
        pool: PoolInfo {
            description: spec.to_string(),
            size: pool.len(),
        },
        metrics: scores,
        rolling,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage6_profile.rs"]
mod tests;
