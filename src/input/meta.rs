use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use crate::input::InputError;
use crate::input::reader::open_maybe_gz;
use crate::model::config::MetadataColumns;
use crate::model::record::EntityId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityMeta {
    pub name: Option<String>,
    pub category: Option<String>,
    pub team: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EntityMetaTable {
    rows: BTreeMap<EntityId, EntityMeta>,
}

impl EntityMetaTable {
    pub fn get(&self, entity: &EntityId) -> Option<&EntityMeta> {
        self.rows.get(entity)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn insert(&mut self, entity: EntityId, meta: EntityMeta) {
        self.rows.insert(entity, meta);
    }
}

pub fn load_entity_meta(
    path: &Path,
    columns: &MetadataColumns,
) -> Result<EntityMetaTable, InputError> {
    let reader = open_maybe_gz(path)?;
    parse_entity_meta(reader, &path.display().to_string(), columns)
}

pub fn parse_entity_meta<R: Read>(
    reader: R,
    origin: &str,
    columns: &MetadataColumns,
) -> Result<EntityMetaTable, InputError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let csv_err = |err| InputError::Csv {
        origin: origin.to_string(),
        err,
    };
    let headers = rdr.headers().map_err(csv_err)?.clone();
    let find = |name: &str| headers.iter().position(|h| h == name);

    let id_idx = find(&columns.id_column).ok_or_else(|| InputError::InconsistentSchema {
        origin: origin.to_string(),
        detail: format!("missing metadata id column {}", columns.id_column),
    })?;
    let optional = |name: &Option<String>| -> Option<usize> {
        let name = name.as_deref()?;
        let idx = find(name);
        if idx.is_none() {
            tracing::warn!(origin, column = name, "metadata column not found; leaving it empty");
        }
        idx
    };
    let name_idx = optional(&columns.name_column);
    let category_idx = optional(&columns.category_column);
    let team_idx = optional(&columns.team_column);

    let mut table = EntityMetaTable::default();
    for (row_idx, row) in rdr.records().enumerate() {
        let row = row.map_err(csv_err)?;
        let line = row_idx + 2;
        let id = row.get(id_idx).unwrap_or("");
        if id.is_empty() {
            tracing::warn!(origin, line, "metadata row has empty id; skipping");
            continue;
        }
        let entity = EntityId::new(id);
        if table.get(&entity).is_some() {
            tracing::warn!(origin, line, entity = id, "duplicate metadata id; keeping first");
            continue;
        }
        let value = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        table.insert(
            entity,
            EntityMeta {
                name: value(name_idx),
                category: value(category_idx),
                team: value(team_idx),
            },
        );
    }

    tracing::info!(origin, entities = table.len(), "loaded entity metadata");
    Ok(table)
}
