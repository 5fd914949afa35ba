use std::collections::BTreeMap;

use crate::input::meta::EntityMetaTable;
use crate::model::record::{Corpus, EntityId, ObservationRecord};
use crate::model::summary::EntitySummary;

#[derive(Debug, Default)]
struct Accumulator {
    name: Option<String>,
    total_exposure: f64,
    totals: Vec<f64>,
    period_exposure: BTreeMap<u32, f64>,
    records: u32,
}

pub fn run_stage1(corpus: &Corpus) -> Vec<EntitySummary> {
    let summaries = aggregate(corpus.records(), corpus.schema.n_stats());
    tracing::info!(
        entities = summaries.len(),
        records = corpus.n_records(),
        "aggregated records per entity"
    );
    summaries
}

/// One summary per distinct entity, sorted by entity id. Missing statistic
/// cells count as zero; the record's exposure still counts.
pub fn aggregate<'a, I>(records: I, n_stats: usize) -> Vec<EntitySummary>
where
    I: IntoIterator<Item = &'a ObservationRecord>,
{
    let mut buckets: BTreeMap<&'a EntityId, Accumulator> = BTreeMap::new();

    for record in records {
        let acc = buckets.entry(&record.entity).or_insert_with(|| Accumulator {
            totals: vec![0.0; n_stats],
            ..Accumulator::default()
        });

        if let Some(name) = record.name.as_deref() {
            match acc.name.as_deref() {
                None => acc.name = Some(name.to_string()),
                Some(first) if first != name => {
                    tracing::debug!(
                        entity = %record.entity,
                        first,
                        later = name,
                        "display name differs across periods; keeping first"
                    );
                }
                Some(_) => {}
            }
        }

        acc.total_exposure += record.exposure;
        *acc.period_exposure.entry(record.period).or_insert(0.0) += record.exposure;
        for (idx, total) in acc.totals.iter_mut().enumerate() {
            *total += record.stat_or_zero(idx);
        }
        acc.records += 1;
    }

    buckets
        .into_iter()
        .map(|(entity, acc)| {
            let appearances = acc.period_exposure.values().filter(|&&e| e > 0.0).count() as u32;
            EntitySummary {
                name: acc.name.unwrap_or_else(|| entity.to_string()),
                entity: entity.clone(),
                category: None,
                team: None,
                total_exposure: acc.total_exposure,
                totals: acc.totals,
                appearances,
                records: acc.records,
            }
        })
        .collect()
}

/// Joins category, team and display name from the metadata table. Entities
/// absent from the table keep their batch name and get no category.
pub fn attach_metadata(
    summaries: Vec<EntitySummary>,
    meta: &EntityMetaTable,
) -> Vec<EntitySummary> {
    let mut unmatched = 0usize;
    let out: Vec<EntitySummary> = summaries
        .into_iter()
        .map(|mut summary| {
            match meta.get(&summary.entity) {
                Some(row) => {
                    if let Some(name) = &row.name {
                        summary.name = name.clone();
                    }
                    summary.category = row.category.clone();
                    summary.team = row.team.clone();
                }
                None => unmatched += 1,
            }
            summary
        })
        .collect();
    if unmatched > 0 {
        tracing::warn!(
            unmatched,
            "entities without metadata have no category and are left out of category pools"
        );
    }
    out
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_aggregate.rs"]
mod tests;
