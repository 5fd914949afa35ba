use serde::Serialize;

use crate::model::record::EntityId;

/// Season-level totals for one entity. `totals` is parallel to the schema's
/// statistic list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySummary {
    pub entity: EntityId,
    pub name: String,
    pub category: Option<String>,
    pub team: Option<String>,
    pub total_exposure: f64,
    pub totals: Vec<f64>,
    pub appearances: u32,
    pub records: u32,
}

impl EntitySummary {
    pub fn total(&self, idx: usize) -> f64 {
        self.totals.get(idx).copied().unwrap_or(0.0)
    }
}
