use crate::pipeline::stage6_profile::{EntityProfile, ProfileOutcome};
use crate::report::{RunSummary, failures, format_f64_2, median, percentile_band};

pub fn render_report_text(summary: &RunSummary, outcomes: &[ProfileOutcome]) -> String {
    let mut out = String::new();

    out.push_str("Peer Percentile Profile Report\n");
    out.push_str("==============================\n\n");

    out.push_str("1. Corpus\n");
    out.push_str(&format!(
        "Batches: {}\nRecords: {}\nEntities: {} ({} with metadata)\n",
        summary.n_batches, summary.n_records, summary.n_entities, summary.n_with_metadata
    ));
    if summary.n_rejected > 0 {
        out.push_str(&format!(
            "Rejected for zero exposure: {}\n",
            summary.n_rejected
        ));
    }
    out.push_str(&format!("Statistics: {}\n\n", summary.stats.join(", ")));

    out.push_str("2. Ranking rules\n");
    out.push_str(&format!(
        "Rates per {} exposure units; pools require exposure >= {}\n",
        format_f64_2(summary.rate_unit),
        format_f64_2(summary.exposure_threshold)
    ));
    out.push_str(&format!(
        "Pool scope: {}; tie method: {}; zero exposure: {}; minimum pool size: {}\n",
        summary.pool_scope, summary.tie_method, summary.zero_exposure, summary.min_pool_size
    ));
    if !summary.exclude_if_positive.is_empty() {
        out.push_str(&format!(
            "Excluded from pools: any positive {}\n",
            summary.exclude_if_positive.join(", ")
        ));
    }
    if let (Some(w), Some(k)) = (summary.rolling_window, summary.rolling_min_periods) {
        out.push_str(&format!("Rolling window: {w} periods (min {k})\n"));
    }
    out.push('\n');

    out.push_str("3. Profiles\n");
    let profiles: Vec<&EntityProfile> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok())
        .collect();
    if profiles.is_empty() {
        out.push_str("No profiles were produced.\n");
    }
    for profile in profiles {
        render_profile(&mut out, profile);
    }
    out.push('\n');

    let failed = failures(outcomes);
    out.push_str("4. Failed requests\n");
    if failed.is_empty() {
        out.push_str("None\n");
    }
    for f in &failed {
        out.push_str(&format!("- [{}] {}\n", f.kind, f.message));
    }

    out
}

fn render_profile(out: &mut String, profile: &EntityProfile) {
    out.push_str(&format!(
        "\n{} ({}) | {} | team {} | {} exposure, {} appearances\n",
        profile.name,
        profile.entity,
        profile.category.as_deref().unwrap_or("no category"),
        profile.team.as_deref().unwrap_or("-"),
        format_f64_2(profile.total_exposure),
        profile.appearances
    ));
    out.push_str(&format!(
        "Peers: {} members [{}]\n",
        profile.pool.size, profile.pool.description
    ));
    if profile.degenerate_rates {
        out.push_str("Note: zero exposure; rates are raw totals.\n");
    }
    for m in &profile.metrics {
        out.push_str(&format!(
            "  {:<36} {:>10} {:>6}th  {}\n",
            m.label,
            format_f64_2(m.value),
            format!("{:.0}", m.percentile),
            percentile_band(m.percentile)
        ));
    }
    let pcts: Vec<f64> = profile.metrics.iter().map(|m| m.percentile).collect();
    if let Some(mid) = median(&pcts) {
        out.push_str(&format!("  Median percentile: {}\n", format_f64_2(mid)));
    }
    for series in &profile.rolling {
        let last = series.rolling.iter().rev().flatten().next();
        out.push_str(&format!(
            "  Form {}: latest rolling {} vs season mean {}\n",
            series.stat,
            last.map(|v| format_f64_2(*v)).unwrap_or_else(|| "-".to_string()),
            series
                .season_mean
                .map(format_f64_2)
                .unwrap_or_else(|| "-".to_string())
        ));
    }
}
