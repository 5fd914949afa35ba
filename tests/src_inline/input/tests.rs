use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::Compression;
use flate2::write::GzEncoder;

use super::batch::parse_batch;
use super::meta::parse_entity_meta;
use super::schema::SchemaCheck;
use super::{InputError, dedup_sources, load_corpus, resolve_batch_sources};
use crate::model::config::MetadataColumns;
use crate::model::record::EntityId;
use crate::model::schema::StatSchema;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("peerprofile_input_test_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_file(path: &Path, contents: &str) {
    let mut f = BufWriter::new(File::create(path).unwrap());
    f.write_all(contents.as_bytes()).unwrap();
}

fn write_gz(path: &Path, contents: &str) {
    let mut enc = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    enc.write_all(contents.as_bytes()).unwrap();
    enc.finish().unwrap();
}

fn small_schema() -> StatSchema {
    StatSchema {
        entity_column: "id".to_string(),
        period_column: "gw".to_string(),
        exposure_column: "minutes".to_string(),
        name_column: Some("web_name".to_string()),
        stats: vec!["tackles".to_string(), "creativity".to_string()],
    }
}

#[test]
fn test_parse_batch_missing_cells_are_none() {
    let csv = "id,gw,minutes,web_name,tackles,creativity,extra\n\
               1,3,90,Garner,2,,x\n\
               2,3,,Keane,,10.5,y\n";
    let batch = parse_batch(csv.as_bytes(), "gw3", &small_schema(), SchemaCheck::Superset).unwrap();
    assert_eq!(batch.records.len(), 2);
    let a = &batch.records[0];
    assert_eq!(a.entity, EntityId::from("1"));
    assert_eq!(a.period, 3);
    assert_eq!(a.exposure, 90.0);
    assert_eq!(a.name.as_deref(), Some("Garner"));
    assert_eq!(a.stats, vec![Some(2.0), None]);
    let b = &batch.records[1];
    assert_eq!(b.exposure, 0.0);
    assert_eq!(b.stats, vec![None, Some(10.5)]);
    assert_eq!(b.stat_or_zero(0), 0.0);
}

#[test]
fn test_missing_declared_column_is_inconsistent_schema() {
    let csv = "id,gw,minutes,tackles\n1,1,90,2\n";
    let err = parse_batch(csv.as_bytes(), "gw1", &small_schema(), SchemaCheck::Superset)
        .unwrap_err();
    match err {
        InputError::InconsistentSchema { origin, detail } => {
            assert_eq!(origin, "gw1");
            assert!(detail.contains("creativity"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_exact_check_rejects_extra_stat_columns() {
    let csv = "id,gw,minutes,web_name,tackles,creativity,threat\n1,1,90,A,1,2,3\n";
    let err = parse_batch(csv.as_bytes(), "gw1", &small_schema(), SchemaCheck::Exact).unwrap_err();
    assert!(matches!(err, InputError::InconsistentSchema { .. }));
    assert!(err.to_string().contains("threat"));
}

#[test]
fn test_unparsable_value_reports_line() {
    let csv = "id,gw,minutes,web_name,tackles,creativity\n1,1,90,A,1,2\n2,1,90,B,lots,2\n";
    let err = parse_batch(csv.as_bytes(), "gw1", &small_schema(), SchemaCheck::Superset)
        .unwrap_err();
    match err {
        InputError::Parse { line, .. } => assert_eq!(line, 3),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_negative_exposure_rejected() {
    let csv = "id,gw,minutes,web_name,tackles,creativity\n1,1,-5,A,1,2\n";
    let err = parse_batch(csv.as_bytes(), "gw1", &small_schema(), SchemaCheck::Superset)
        .unwrap_err();
    assert!(matches!(err, InputError::InvalidInput(_)));
}

#[test]
fn test_empty_batch_rejected() {
    let csv = "id,gw,minutes,web_name,tackles,creativity\n";
    let err = parse_batch(csv.as_bytes(), "gw1", &small_schema(), SchemaCheck::Superset)
        .unwrap_err();
    assert!(matches!(err, InputError::InvalidInput(_)));
}

#[test]
fn test_resolve_sources_orders_by_period_number() {
    let dir = make_temp_dir();
    let header = "id,gw,minutes,web_name,tackles,creativity\n";
    write_file(&dir.join("GW10_stats.csv"), &format!("{header}1,10,90,A,1,1\n"));
    write_file(&dir.join("GW2_stats.csv"), &format!("{header}1,2,90,A,1,1\n"));
    write_gz(&dir.join("GW1_stats.csv.gz"), &format!("{header}1,1,90,A,1,1\n"));
    write_file(&dir.join("notes.txt"), "ignored");

    let sources = resolve_batch_sources(&dir, ".csv").unwrap();
    let names: Vec<String> = sources
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["GW1_stats.csv.gz", "GW2_stats.csv", "GW10_stats.csv"]);

    let corpus = load_corpus(&sources, &small_schema()).unwrap();
    assert_eq!(corpus.batches.len(), 3);
    assert_eq!(corpus.n_records(), 3);
    let periods: Vec<u32> = corpus.records().map(|r| r.period).collect();
    assert_eq!(periods, vec![1, 2, 10]);
}

#[test]
fn test_resolve_sources_empty_dir_is_missing_input() {
    let dir = make_temp_dir();
    let err = resolve_batch_sources(&dir, ".csv").unwrap_err();
    assert!(matches!(err, InputError::MissingInput(_)));
}

#[test]
fn test_batch_listed_twice_is_loaded_once() {
    let dir = make_temp_dir();
    let gw1 = dir.join("gw1.csv");
    write_file(&gw1, "id,gw,minutes,web_name,tackles,creativity\n7,1,90,A,1,0\n");

    // explicit --batch first, then the same file again via the directory scan
    let mut sources = vec![dir.join(".").join("gw1.csv")];
    sources.extend(resolve_batch_sources(&dir, ".csv").unwrap());
    assert_eq!(sources.len(), 2);
    assert_eq!(dedup_sources(&sources).unwrap().len(), 1);

    let corpus = load_corpus(&sources, &small_schema()).unwrap();
    assert_eq!(corpus.batches.len(), 1);
    let exposure: f64 = corpus.records().map(|r| r.exposure).sum();
    let tackles: f64 = corpus.records().map(|r| r.stat_or_zero(0)).sum();
    assert_eq!(exposure, 90.0);
    assert_eq!(tackles, 1.0);
}

#[test]
fn test_plain_and_gzip_copies_of_a_batch_rejected() {
    let dir = make_temp_dir();
    let body = "id,gw,minutes,web_name,tackles,creativity\n7,1,90,A,1,0\n";
    write_file(&dir.join("gw1.csv"), body);
    write_gz(&dir.join("gw1.csv.gz"), body);

    let sources = resolve_batch_sources(&dir, ".csv").unwrap();
    assert_eq!(sources.len(), 2);
    let err = load_corpus(&sources, &small_schema()).unwrap_err();
    assert!(matches!(err, InputError::InvalidInput(_)), "{err}");
}

#[test]
fn test_load_corpus_without_sources_fails() {
    let err = load_corpus(&[], &small_schema()).unwrap_err();
    assert!(matches!(err, InputError::MissingInput(_)));
}

#[test]
fn test_inferred_schema_requires_matching_batches() {
    let dir = make_temp_dir();
    let first = dir.join("GW1.csv");
    let second = dir.join("GW2.csv");
    write_file(&first, "id,gw,minutes,web_name,tackles,saves\n1,1,90,A,1,0\n");
    write_file(&second, "id,gw,minutes,web_name,tackles\n1,2,90,A,3\n");

    let mut schema = small_schema();
    schema.stats.clear();

    let corpus = load_corpus(&[first.clone()], &schema).unwrap();
    assert_eq!(corpus.schema.stats, vec!["tackles", "saves"]);

    let err = load_corpus(&[first, second], &schema).unwrap_err();
    match err {
        InputError::InconsistentSchema { origin, detail } => {
            assert!(origin.ends_with("GW2.csv"));
            assert!(detail.contains("saves"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_metadata_first_row_wins_and_blank_cells_are_absent() {
    let csv = "player_id,web_name,position,team_code\n\
               1,Garner,Midfielder,11\n\
               1,Duplicate,Forward,3\n\
               2,Pickford,,11\n\
               ,Nobody,Defender,1\n";
    let table = parse_entity_meta(csv.as_bytes(), "players", &MetadataColumns::default()).unwrap();
    assert_eq!(table.len(), 2);
    let garner = table.get(&EntityId::from("1")).unwrap();
    assert_eq!(garner.name.as_deref(), Some("Garner"));
    assert_eq!(garner.category.as_deref(), Some("Midfielder"));
    assert_eq!(garner.team.as_deref(), Some("11"));
    let pickford = table.get(&EntityId::from("2")).unwrap();
    assert_eq!(pickford.category, None);
}

#[test]
fn test_metadata_without_id_column_fails() {
    let csv = "id,web_name\n1,A\n";
    let err = parse_entity_meta(csv.as_bytes(), "players", &MetadataColumns::default())
        .unwrap_err();
    assert!(matches!(err, InputError::InconsistentSchema { .. }));
}
