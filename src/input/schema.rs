use csv::StringRecord;

use crate::input::InputError;
use crate::model::schema::StatSchema;

/// Header positions of the schema's columns inside one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub entity: usize,
    pub period: usize,
    pub exposure: usize,
    pub name: Option<usize>,
    pub stats: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaCheck {
    /// Declared columns must be present; extra columns are ignored.
    Superset,
    /// Statistic columns must match the schema exactly.
    Exact,
}

fn header_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

/// Statistic set of an inferred schema: every non-key column of the header.
pub fn infer_stats(headers: &StringRecord, schema: &StatSchema) -> Vec<String> {
    headers
        .iter()
        .map(|h| h.trim())
        .filter(|h| !h.is_empty() && !schema.is_key_column(h))
        .map(String::from)
        .collect()
}

pub fn resolve_layout(
    headers: &StringRecord,
    schema: &StatSchema,
    check: SchemaCheck,
    origin: &str,
) -> Result<ColumnLayout, InputError> {
    let mut missing = Vec::new();
    let mut key = |name: &str| {
        let idx = header_index(headers, name);
        if idx.is_none() {
            missing.push(name.to_string());
        }
        idx
    };
    let entity = key(&schema.entity_column);
    let period = key(&schema.period_column);
    let exposure = key(&schema.exposure_column);

    let mut stats = Vec::with_capacity(schema.n_stats());
    for stat in &schema.stats {
        match header_index(headers, stat) {
            Some(idx) => stats.push(idx),
            None => missing.push(stat.clone()),
        }
    }

    let extra: Vec<String> = match check {
        SchemaCheck::Superset => Vec::new(),
        SchemaCheck::Exact => infer_stats(headers, schema)
            .into_iter()
            .filter(|h| schema.stat_index(h).is_none())
            .collect(),
    };

    if !missing.is_empty() || !extra.is_empty() {
        let mut detail = Vec::new();
        if !missing.is_empty() {
            detail.push(format!("missing columns [{}]", missing.join(", ")));
        }
        if !extra.is_empty() {
            detail.push(format!("unexpected columns [{}]", extra.join(", ")));
        }
        return Err(InputError::InconsistentSchema {
            origin: origin.to_string(),
            detail: detail.join("; "),
        });
    }

    let name = schema
        .name_column
        .as_deref()
        .and_then(|n| header_index(headers, n));

    match (entity, period, exposure) {
        (Some(entity), Some(period), Some(exposure)) => Ok(ColumnLayout {
            entity,
            period,
            exposure,
            name,
            stats,
        }),
        _ => Err(InputError::InconsistentSchema {
            origin: origin.to_string(),
            detail: "missing key columns".to_string(),
        }),
    }
}
