use std::fmt;

use serde::Serialize;

use crate::model::schema::StatSchema;

/// Stable entity key shared by every period's batch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One entity's statistics for one period. `stats` is parallel to
/// `StatSchema::stats`; `None` marks an empty cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    pub entity: EntityId,
    pub period: u32,
    pub exposure: f64,
    pub name: Option<String>,
    pub stats: Vec<Option<f64>>,
}

impl ObservationRecord {
    pub fn stat_or_zero(&self, idx: usize) -> f64 {
        self.stats.get(idx).copied().flatten().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct RecordBatch {
    pub origin: String,
    pub records: Vec<ObservationRecord>,
}

#[derive(Debug, Clone)]
pub struct Corpus {
    pub schema: StatSchema,
    pub batches: Vec<RecordBatch>,
}

impl Corpus {
    pub fn records(&self) -> impl Iterator<Item = &ObservationRecord> {
        self.batches.iter().flat_map(|b| b.records.iter())
    }

    pub fn n_records(&self) -> usize {
        self.batches.iter().map(|b| b.records.len()).sum()
    }

    /// Records of one entity ordered by period; equal periods keep load order.
    pub fn entity_records(&self, entity: &EntityId) -> Vec<&ObservationRecord> {
        let mut out: Vec<&ObservationRecord> =
            self.records().filter(|r| &r.entity == entity).collect();
        out.sort_by_key(|r| r.period);
        out
    }
}
