use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::model::errors::ProfileError;
use crate::model::record::EntityId;
use crate::pipeline::stage4_percentile::MetricScore;
use crate::pipeline::stage5_rolling::RollingSeries;
use crate::pipeline::stage6_profile::{EntityProfile, PoolInfo};

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> std::path::PathBuf {
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "peerprofile_report_test_{}_{}",
        std::process::id(),
        id
    ));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn summary() -> RunSummary {
    RunSummary {
        tool_name: "peerprofile".to_string(),
        tool_version: "0.0.0".to_string(),
        n_batches: 2,
        n_records: 10,
        n_entities: 5,
        n_rated: 5,
        n_rejected: 0,
        n_with_metadata: 4,
        rate_unit: 90.0,
        exposure_threshold: 600.0,
        min_pool_size: 1,
        tie_method: "at_or_below".to_string(),
        pool_scope: "category".to_string(),
        zero_exposure: "floor".to_string(),
        exclude_if_positive: Vec::new(),
        stats: vec!["goals".to_string()],
        rolling_window: None,
        rolling_min_periods: None,
    }
}

fn profile(rolling: Vec<RollingSeries>) -> EntityProfile {
    EntityProfile {
        entity: EntityId::from("7"),
        name: "Saka\tB".to_string(),
        category: Some("Midfielder".to_string()),
        team: Some("ARS".to_string()),
        total_exposure: 1800.0,
        appearances: 20,
        degenerate_rates: false,
        pool: PoolInfo {
            description: "category=Midfielder, exposure>=600".to_string(),
            size: 40,
        },
        metrics: vec![MetricScore {
            id: "goals_p90".to_string(),
            label: "Goals / 90".to_string(),
            stat: "goals".to_string(),
            value: 0.5,
            percentile: 87.5,
        }],
        rolling,
    }
}

fn outcomes(rolling: Vec<RollingSeries>) -> Vec<ProfileOutcome> {
    vec![
        ProfileOutcome {
            request: "7".to_string(),
            result: Ok(profile(rolling)),
        },
        ProfileOutcome {
            request: "id:999".to_string(),
            result: Err(ProfileError::MissingEntity {
                entity: "999".to_string(),
            }),
        },
    ]
}

#[test]
fn test_write_reports_creates_outputs() {
    let dir = make_temp_dir();
    let outcomes = outcomes(Vec::new());
    write_reports(
        &Stage7Input {
            summary: summary(),
            outcomes: &outcomes,
        },
        &dir,
    )
    .unwrap();

    assert!(dir.join("profiles.json").exists());
    assert!(dir.join("report.txt").exists());
    assert!(!dir.join("rolling.tsv").exists());

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("profiles.json")).unwrap()).unwrap();
    assert_eq!(json["profiles"].as_array().unwrap().len(), 1);
    assert_eq!(json["profiles"][0]["metrics"][0]["percentile"], 87.5);
    assert!(json["profiles"][0].get("rolling").is_none());
    assert_eq!(json["failures"][0]["kind"], "missing_entity");
    assert_eq!(json["failures"][0]["request"], "id:999");
    assert_eq!(json["run"]["tie_method"], "at_or_below");

    let tsv = fs::read_to_string(dir.join("profiles.tsv")).unwrap();
    let lines: Vec<&str> = tsv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("entity\tname\t"));
    let cols: Vec<&str> = lines[1].split('\t').collect();
    assert_eq!(cols.len(), 11);
    assert_eq!(cols[1], "Saka B");
    assert_eq!(cols[10], "87.500000");

    let report = fs::read_to_string(dir.join("report.txt")).unwrap();
    assert!(report.contains("Saka\tB (7)"));
    assert!(report.contains("strong"));
    assert!(report.contains("[missing_entity] 999: not found"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_rolling_tsv_written_when_series_present() {
    let dir = make_temp_dir();
    let series = RollingSeries {
        stat: "goals".to_string(),
        periods: vec![1, 2],
        values: vec![1.0, 0.0],
        rolling: vec![None, Some(0.5)],
        season_mean: Some(0.5),
    };
    let outcomes = outcomes(vec![series]);
    write_reports(
        &Stage7Input {
            summary: summary(),
            outcomes: &outcomes,
        },
        &dir,
    )
    .unwrap();

    let tsv = fs::read_to_string(dir.join("rolling.tsv")).unwrap();
    let lines: Vec<&str> = tsv.lines().collect();
    assert_eq!(lines[0], "entity\tstat\tperiod\tvalue\trolling\tseason_mean");
    assert_eq!(lines[1], "7\tgoals\t1\t1.000000\t\t0.500000");
    assert_eq!(lines[2], "7\tgoals\t2\t0.000000\t0.500000\t0.500000");

    let report = fs::read_to_string(dir.join("report.txt")).unwrap();
    assert!(report.contains("Form goals: latest rolling 0.50 vs season mean 0.50"));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_sanitize_strips_field_separators() {
    assert_eq!(sanitize("a\tb\nc\rd"), "a b c d");
}
