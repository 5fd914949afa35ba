use super::*;
use crate::model::record::EntityId;

fn params(window: usize, min_periods: usize) -> RollingParams {
    RollingParams::new(window, min_periods).unwrap()
}

fn assert_series(got: &[Option<f64>], want: &[Option<f64>]) {
    assert_eq!(got.len(), want.len());
    for (g, w) in got.iter().zip(want) {
        match (g, w) {
            (Some(g), Some(w)) => assert!((g - w).abs() < 1e-9, "{got:?} vs {want:?}"),
            (None, None) => {}
            _ => panic!("{got:?} vs {want:?}"),
        }
    }
}

#[test]
fn test_trailing_window_with_min_periods() {
    let values = [2.0, 4.0, 6.0, 8.0, 10.0, 0.0, 0.0];
    let got: Vec<Option<f64>> = rolling_means(&values, params(5, 2)).collect();
    assert_series(
        &got,
        &[None, Some(3.0), Some(4.0), Some(5.0), Some(6.0), Some(5.6), Some(4.8)],
    );
}

#[test]
fn test_rolling_is_restartable_and_exact_size() {
    let values = [1.0, 2.0, 3.0];
    let iter = rolling_means(&values, params(2, 1));
    assert_eq!(iter.len(), 3);
    let first: Vec<_> = iter.collect();
    let second: Vec<_> = rolling_means(&values, params(2, 1)).collect();
    assert_eq!(first, second);
    assert_series(&first, &[Some(1.0), Some(1.5), Some(2.5)]);

    let mut partial = rolling_means(&values, params(2, 1));
    partial.next();
    assert_eq!(partial.len(), 2);
    assert_eq!(rolling_means(&[], params(2, 1)).count(), 0);
}

#[test]
fn test_min_periods_equal_window() {
    let values = [3.0, 3.0, 6.0];
    let got: Vec<_> = rolling_means(&values, params(3, 3)).collect();
    assert_series(&got, &[None, None, Some(4.0)]);
}

#[test]
fn test_invalid_params_rejected() {
    assert!(RollingParams::new(0, 0).is_err());
    assert!(RollingParams::new(3, 0).is_err());
    assert!(RollingParams::new(3, 4).is_err());
    let p = params(4, 4);
    assert_eq!((p.window(), p.min_periods()), (4, 4));
}

#[test]
fn test_period_rate_handles_gaps() {
    assert_eq!(period_rate(None, 90.0, 90.0), 0.0);
    assert_eq!(period_rate(Some(2.0), 0.0, 90.0), 180.0);
    assert!((period_rate(Some(1.0), 45.0, 90.0) - 2.0).abs() < 1e-12);
}

#[test]
fn test_build_series_from_records() {
    let schema = StatSchema {
        stats: vec!["goals".to_string(), "tackles".to_string()],
        ..StatSchema::default()
    };
    let rec = |period: u32, exposure: f64, goals: Option<f64>| ObservationRecord {
        entity: EntityId::from("a"),
        period,
        exposure,
        name: None,
        stats: vec![goals, Some(1.0)],
    };
    let records = [rec(1, 90.0, Some(1.0)), rec(2, 45.0, None), rec(3, 90.0, Some(2.0))];
    let refs: Vec<&ObservationRecord> = records.iter().collect();

    let series = build_series(
        &refs,
        &schema,
        &["goals".to_string(), "assists".to_string()],
        90.0,
        params(2, 1),
    );
    assert_eq!(series.len(), 1);
    let goals = &series[0];
    assert_eq!(goals.stat, "goals");
    assert_eq!(goals.periods, vec![1, 2, 3]);
    let values: Vec<Option<f64>> = goals.values.iter().copied().map(Some).collect();
    assert_series(&values, &[Some(1.0), Some(0.0), Some(2.0)]);
    assert_series(&goals.rolling, &[Some(1.0), Some(0.5), Some(1.0)]);
    assert_series(&[goals.season_mean], &[Some(1.0)]);

    assert!(build_series(&[], &schema, &["goals".to_string()], 90.0, params(2, 1))[0]
        .season_mean
        .is_none());
}
