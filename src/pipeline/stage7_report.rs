use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::pipeline::stage6_profile::ProfileOutcome;
use crate::report::json::render_profiles_json;
use crate::report::text::render_report_text;
use crate::report::{RunSummary, format_f64_2};

#[derive(Debug, Clone)]
pub struct Stage7Input<'a> {
    pub summary: RunSummary,
    pub outcomes: &'a [ProfileOutcome],
}

pub fn write_reports(input: &Stage7Input<'_>, out_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(out_dir)?;

    let json = render_profiles_json(&input.summary, input.outcomes)
        .map_err(std::io::Error::other)?;
    write_text(&out_dir.join("profiles.json"), &json)?;

    write_profiles_tsv(input.outcomes, &out_dir.join("profiles.tsv"))?;

    let has_rolling = input
        .outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok())
        .any(|p| !p.rolling.is_empty());
    if has_rolling {
        write_rolling_tsv(input.outcomes, &out_dir.join("rolling.tsv"))?;
    }

    let report = render_report_text(&input.summary, input.outcomes);
    write_text(&out_dir.join("report.txt"), &report)?;

    tracing::info!(out_dir = %out_dir.display(), "reports written");
    Ok(())
}

fn write_profiles_tsv(outcomes: &[ProfileOutcome], path: &Path) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    let header = [
        "entity",
        "name",
        "category",
        "team",
        "total_exposure",
        "appearances",
        "pool_size",
        "metric",
        "label",
        "value",
        "percentile",
    ]
    .join("\t");
    writeln!(w, "{}", header)?;

    for profile in outcomes.iter().filter_map(|o| o.result.as_ref().ok()) {
        for m in &profile.metrics {
            let row = [
                profile.entity.to_string(),
                sanitize(&profile.name),
                profile.category.as_deref().map(sanitize).unwrap_or_default(),
                profile.team.as_deref().map(sanitize).unwrap_or_default(),
                format_f64_2(profile.total_exposure),
                profile.appearances.to_string(),
                profile.pool.size.to_string(),
                m.id.clone(),
                sanitize(&m.label),
                format!("{:.6}", m.value),
                format!("{:.6}", m.percentile),
            ];
            writeln!(w, "{}", row.join("\t"))?;
        }
    }
    w.flush()
}

fn write_rolling_tsv(outcomes: &[ProfileOutcome], path: &Path) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "entity\tstat\tperiod\tvalue\trolling\tseason_mean")?;

    for profile in outcomes.iter().filter_map(|o| o.result.as_ref().ok()) {
        for series in &profile.rolling {
            let season_mean = series
                .season_mean
                .map(|v| format!("{:.6}", v))
                .unwrap_or_default();
            for ((period, value), rolling) in series
                .periods
                .iter()
                .zip(&series.values)
                .zip(&series.rolling)
            {
                let rolling = rolling.map(|v| format!("{:.6}", v)).unwrap_or_default();
                writeln!(
                    w,
                    "{}\t{}\t{}\t{:.6}\t{}\t{}",
                    profile.entity, series.stat, period, value, rolling, season_mean
                )?;
            }
        }
    }
    w.flush()
}

fn sanitize(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}

fn write_text(path: &Path, content: &str) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(content.as_bytes())?;
    w.flush()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage7_report.rs"]
mod tests;
