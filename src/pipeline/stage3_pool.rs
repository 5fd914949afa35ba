use std::collections::BTreeSet;
use std::fmt;

use crate::model::record::EntityId;
use crate::model::schema::StatSchema;
use crate::pipeline::stage2_rates::RatedEntity;

#[derive(Debug, Clone, PartialEq)]
pub struct PoolSpec {
    pub min_exposure: f64,
    /// `None` is an unscoped pool.
    pub category: Option<String>,
    /// Entities with a positive season total in any of these are excluded.
    pub exclude_if_positive: Vec<String>,
}

impl PoolSpec {
    pub fn admits(&self, entity: &RatedEntity, schema: &StatSchema) -> bool {
        let summary = &entity.summary;
        if summary.total_exposure < self.min_exposure {
            return false;
        }
        if let Some(category) = &self.category {
            if summary.category.as_ref() != Some(category) {
                return false;
            }
        }
        !self.exclude_if_positive.iter().any(|stat| {
            schema
                .stat_index(stat)
                .is_some_and(|idx| summary.total(idx) > 0.0)
        })
    }
}

impl fmt::Display for PoolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.category {
            Some(c) => write!(f, "category={c}")?,
            None => write!(f, "all")?,
        }
        write!(f, ", exposure>={}", self.min_exposure)?;
        if !self.exclude_if_positive.is_empty() {
            write!(f, ", excluding {}>0", self.exclude_if_positive.join("|"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PeerPool<'a> {
    pub spec: PoolSpec,
    pub members: Vec<&'a RatedEntity>,
}

impl<'a> PeerPool<'a> {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member(&self, entity: &EntityId) -> Option<&'a RatedEntity> {
        self.members
            .iter()
            .copied()
            .find(|m| &m.summary.entity == entity)
    }
}

/// Members keep population order; a repeated id is admitted once.
pub fn select_pool<'a>(
    population: &'a [RatedEntity],
    spec: &PoolSpec,
    schema: &StatSchema,
) -> PeerPool<'a> {
    let mut seen: BTreeSet<&EntityId> = BTreeSet::new();
    let members = population
        .iter()
        .filter(|e| spec.admits(e, schema))
        .filter(|e| seen.insert(&e.summary.entity))
        .collect();
    PeerPool {
        spec: spec.clone(),
        members,
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_pool.rs"]
mod tests;
