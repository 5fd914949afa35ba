use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::input::InputError;
use crate::input::reader::open_maybe_gz;
use crate::input::schema::{ColumnLayout, SchemaCheck, infer_stats, resolve_layout};
use crate::model::record::{EntityId, ObservationRecord, RecordBatch};
use crate::model::schema::StatSchema;

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(reader)
}

/// Header row of a batch file, used to infer the statistic set.
pub fn read_headers(path: &Path) -> Result<StringRecord, InputError> {
    let origin = path.display().to_string();
    let mut rdr = csv_reader(open_maybe_gz(path)?);
    rdr.headers()
        .cloned()
        .map_err(|err| InputError::Csv { origin, err })
}

pub fn infer_schema(path: &Path, schema: &StatSchema) -> Result<StatSchema, InputError> {
    let headers = read_headers(path)?;
    let mut out = schema.clone();
    out.stats = infer_stats(&headers, schema);
    if out.stats.is_empty() {
        return Err(InputError::InconsistentSchema {
            origin: path.display().to_string(),
            detail: "no statistic columns besides the key columns".to_string(),
        });
    }
    Ok(out)
}

pub fn read_batch(
    path: &Path,
    schema: &StatSchema,
    check: SchemaCheck,
) -> Result<RecordBatch, InputError> {
    let reader = open_maybe_gz(path)?;
    parse_batch(reader, &path.display().to_string(), schema, check)
}

pub fn parse_batch<R: Read>(
    reader: R,
    origin: &str,
    schema: &StatSchema,
    check: SchemaCheck,
) -> Result<RecordBatch, InputError> {
    let mut rdr = csv_reader(reader);
    let csv_err = |err| InputError::Csv {
        origin: origin.to_string(),
        err,
    };
    let headers = rdr.headers().map_err(csv_err)?.clone();
    let layout = resolve_layout(&headers, schema, check, origin)?;

    let mut records = Vec::new();
    for (row_idx, row) in rdr.records().enumerate() {
        let row = row.map_err(csv_err)?;
        // header is line 1
        let line = row_idx + 2;
        records.push(parse_row(&row, &layout, origin, line)?);
    }

    if records.is_empty() {
        return Err(InputError::InvalidInput(format!(
            "batch {origin} has no records"
        )));
    }

    Ok(RecordBatch {
        origin: origin.to_string(),
        records,
    })
}

fn parse_row(
    row: &StringRecord,
    layout: &ColumnLayout,
    origin: &str,
    line: usize,
) -> Result<ObservationRecord, InputError> {
    let cell = |idx: usize| row.get(idx).unwrap_or("");
    let parse_err = |msg: String| InputError::Parse {
        origin: origin.to_string(),
        line,
        msg,
    };

    let entity = cell(layout.entity);
    if entity.is_empty() {
        return Err(parse_err("empty entity identifier".to_string()));
    }

    let period = parse_period(cell(layout.period)).ok_or_else(|| {
        parse_err(format!("invalid period index {:?}", cell(layout.period)))
    })?;

    let exposure = match parse_number(cell(layout.exposure)) {
        Ok(v) => v.unwrap_or(0.0),
        Err(raw) => return Err(parse_err(format!("invalid exposure {raw:?}"))),
    };
    if exposure < 0.0 {
        return Err(InputError::InvalidInput(format!(
            "{origin} line {line}: negative exposure {exposure}"
        )));
    }

    let mut stats = Vec::with_capacity(layout.stats.len());
    for &idx in &layout.stats {
        match parse_number(cell(idx)) {
            Ok(Some(v)) if v < 0.0 => {
                return Err(InputError::InvalidInput(format!(
                    "{origin} line {line}: negative statistic value {v}"
                )));
            }
            Ok(v) => stats.push(v),
            Err(raw) => return Err(parse_err(format!("invalid statistic value {raw:?}"))),
        }
    }

    let name = layout
        .name
        .map(cell)
        .filter(|s| !s.is_empty())
        .map(String::from);

    Ok(ObservationRecord {
        entity: EntityId::new(entity),
        period,
        exposure,
        name,
        stats,
    })
}

/// Empty cells are missing values; anything else must parse as a finite number.
fn parse_number(raw: &str) -> Result<Option<f64>, &str> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(raw),
    }
}

fn parse_period(raw: &str) -> Option<u32> {
    if let Ok(v) = raw.parse::<u32>() {
        return Some(v);
    }
    let v = raw.parse::<f64>().ok()?;
    if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}
