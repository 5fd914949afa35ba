use super::*;

#[test]
fn test_defaults_validate() {
    let config = ProfileConfig::default();
    assert_eq!(config.rate_unit, 90.0);
    assert_eq!(config.rolling_window, 5);
    assert_eq!(config.rolling_min_periods, 2);
    assert_eq!(config.metric_set.len(), 6);
    config.validate().unwrap();
    config.validate_against_schema(&config.schema).unwrap();
}

#[test]
fn test_parse_partial_toml_keeps_defaults() {
    let content = r#"
exposure_threshold = 900
tie_method = "average_rank"
pool_scope = "all"

[schema]
stats = ["tackles", "yellow_cards"]

[[metric_set]]
id = "tackles_p90"
label = "Tackles / 90"
stat = "tackles"

[[metric_set]]
id = "discipline"
label = "Discipline"
stat = "yellow_cards"
direction = "lower"
"#;
    let config: ProfileConfig = toml::from_str(content).unwrap();
    assert_eq!(config.exposure_threshold, 900.0);
    assert_eq!(config.rate_unit, 90.0);
    assert_eq!(config.tie_method, TieMethod::AverageRank);
    assert_eq!(config.pool_scope, PoolScope::All);
    assert_eq!(config.schema.entity_column, "id");
    assert_eq!(config.metric_set.len(), 2);
    assert_eq!(config.metric_set[1].direction, Direction::Lower);
    assert_eq!(config.metric_set[1].inverse_offset, 0.1);
    config.validate().unwrap();
    config.validate_against_schema(&config.schema).unwrap();
}

#[test]
fn test_rolling_min_periods_above_window_rejected() {
    let config = ProfileConfig {
        rolling_window: 3,
        rolling_min_periods: 4,
        ..ProfileConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_duplicate_metric_id_rejected() {
    let mut config = ProfileConfig::default();
    let first = config.metric_set[0].clone();
    config.metric_set.push(first);
    assert!(config.validate().is_err());
}

#[test]
fn test_unknown_statistic_rejected_against_schema() {
    let mut config = ProfileConfig::default();
    config.exclude_if_positive = vec!["saves".to_string()];
    let err = config.validate_against_schema(&config.schema).unwrap_err();
    assert!(err.to_string().contains("saves"));
}

#[test]
fn test_metrics_for_category_falls_back_to_default_set() {
    let config = ProfileConfig::positional_v1();
    assert_eq!(config.metrics_for(Some("Midfielder")).len(), 6);
    assert_eq!(config.metrics_for(Some("Goalkeeper"))[0].id, "saves_p90");
    assert_eq!(config.metrics_for(Some("Coach")), config.metric_set.as_slice());
    assert_eq!(config.metrics_for(None), config.metric_set.as_slice());
}

#[test]
fn test_default_toml_round_trips() {
    let text = ProfileConfig::default_toml().unwrap();
    assert!(text.starts_with("# peerprofile configuration"));
    assert!(text.contains("[schema]"));
    let parsed: ProfileConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed, ProfileConfig::positional_v1());
    parsed.validate().unwrap();
    parsed.validate_against_schema(&parsed.schema).unwrap();
}
