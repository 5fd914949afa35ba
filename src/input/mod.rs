use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod batch;
pub mod meta;
pub mod reader;
pub mod schema;

use batch::{infer_schema, read_batch};
use reader::file_number;
use schema::SchemaCheck;

use crate::model::record::Corpus;
use crate::model::schema::StatSchema;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error in {origin}: {err}")]
    Csv {
        origin: String,
        #[source]
        err: csv::Error,
    },
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("parse error in {origin} line {line}: {msg}")]
    Parse {
        origin: String,
        line: usize,
        msg: String,
    },
    #[error("inconsistent schema in {origin}: {detail}")]
    InconsistentSchema { origin: String, detail: String },
}

/// Batch files in `input_dir` whose name ends with `suffix` (or `suffix.gz`),
/// ordered by the first number in the file name, then by name.
pub fn resolve_batch_sources(input_dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, InputError> {
    if !input_dir.is_dir() {
        return Err(InputError::MissingInput(format!(
            "input directory {} does not exist",
            input_dir.display()
        )));
    }
    let gz_suffix = format!("{suffix}.gz");
    let mut sources = Vec::new();
    for entry in std::fs::read_dir(input_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.ends_with(suffix) || name.ends_with(&gz_suffix) {
            sources.push(entry.path());
        }
    }
    sort_sources(&mut sources);
    if sources.is_empty() {
        return Err(InputError::MissingInput(format!(
            "no *{suffix} batches in {}",
            input_dir.display()
        )));
    }
    Ok(sources)
}

pub fn sort_sources(sources: &mut [PathBuf]) {
    sources.sort_by(|a, b| {
        let ka = file_number(a).unwrap_or(u64::MAX);
        let kb = file_number(b).unwrap_or(u64::MAX);
        ka.cmp(&kb).then_with(|| a.cmp(b))
    });
}

/// Drops sources that name a file already listed (compared after
/// canonicalization), keeping the first. A plain batch and its `.gz` twin are
/// the same period twice and fail with `InvalidInput`.
pub fn dedup_sources(sources: &[PathBuf]) -> Result<Vec<PathBuf>, InputError> {
    let mut seen: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
    let mut out = Vec::with_capacity(sources.len());
    for path in sources {
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.clone());
        let key = if canonical.extension().is_some_and(|ext| ext == "gz") {
            canonical.with_extension("")
        } else {
            canonical.clone()
        };
        match seen.get(&key) {
            Some(first) if *first == canonical => {
                tracing::warn!(source = %path.display(), "batch listed more than once; loading it once");
            }
            Some(first) => {
                return Err(InputError::InvalidInput(format!(
                    "{} and {} hold the same batch (plain and gzip copies)",
                    first.display(),
                    canonical.display()
                )));
            }
            None => {
                seen.insert(key, canonical);
                out.push(path.clone());
            }
        }
    }
    Ok(out)
}

/// Loads every batch against one schema. Any schema or parse failure aborts
/// the whole load.
pub fn load_corpus(sources: &[PathBuf], schema: &StatSchema) -> Result<Corpus, InputError> {
    let sources = dedup_sources(sources)?;
    let Some(first) = sources.first() else {
        return Err(InputError::MissingInput(
            "no record batches supplied".to_string(),
        ));
    };

    let (schema, check) = if schema.is_inferred() {
        let inferred = infer_schema(first, schema)?;
        tracing::info!(
            source = %first.display(),
            stats = ?inferred.stats,
            "inferred statistic columns from first batch"
        );
        (inferred, SchemaCheck::Exact)
    } else {
        (schema.clone(), SchemaCheck::Superset)
    };

    let mut batches = Vec::with_capacity(sources.len());
    for path in &sources {
        let batch = read_batch(path, &schema, check)?;
        tracing::debug!(origin = %batch.origin, records = batch.records.len(), "parsed record batch");
        batches.push(batch);
    }

    let corpus = Corpus { schema, batches };
    tracing::info!(
        batches = corpus.batches.len(),
        records = corpus.n_records(),
        "loaded record batches"
    );
    Ok(corpus)
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tests.rs"]
mod tests;
