mod input;
mod logging;
mod model;
mod pipeline;
mod report;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::input::meta::load_entity_meta;
use crate::input::{InputError, load_corpus, resolve_batch_sources};
use crate::model::config::{ConfigError, PoolScope, ProfileConfig, TieMethod, ZeroExposurePolicy};
use crate::model::metrics::MetricDef;
use crate::model::record::EntityId;
use crate::pipeline::stage1_aggregate::{attach_metadata, run_stage1};
use crate::pipeline::stage2_rates::{RatedEntity, run_stage2};
use crate::pipeline::stage5_rolling::RollingParams;
use crate::pipeline::stage6_profile::{EntityRequest, Stage6Inputs, run_stage6};
use crate::pipeline::stage7_report::{Stage7Input, write_reports};
use crate::report::RunSummary;

#[derive(Parser, Debug)]
#[command(name = "peerprofile", version)]
#[command(about = "Percentile-ranked athlete profiles from weekly per-period stat exports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate batches, rank entities against their peers and write reports
    Run(RunArgs),
    /// Write a starter configuration file with a per-position metric table
    InitConfig {
        #[arg(long, default_value = "peerprofile.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Directory scanned for batch files (see `input_suffix`)
    #[arg(long, value_name = "DIR", required_unless_present = "batches")]
    input: Option<PathBuf>,
    /// Explicit batch file; repeatable, loaded before directory batches
    #[arg(long = "batch", value_name = "FILE")]
    batches: Vec<PathBuf>,
    /// Output directory for profiles.json, profiles.tsv, rolling.tsv, report.txt
    #[arg(long, value_name = "DIR")]
    out: PathBuf,
    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Entity metadata CSV (id, name, category, team)
    #[arg(long, value_name = "FILE")]
    meta: Option<PathBuf>,

    /// Profile this entity id; repeatable
    #[arg(long = "entity", value_name = "ID")]
    entities: Vec<String>,
    /// Profile the entity with this display name; repeatable
    #[arg(long = "name", value_name = "NAME")]
    names: Vec<String>,
    /// Profile every qualifying entity of this team; repeatable
    #[arg(long = "team", value_name = "TEAM")]
    teams: Vec<String>,

    #[arg(long)]
    rate_unit: Option<f64>,
    #[arg(long)]
    exposure_threshold: Option<f64>,
    #[arg(long)]
    min_pool_size: Option<usize>,
    #[arg(long, value_enum)]
    tie_method: Option<TieMethod>,
    #[arg(long, value_enum)]
    pool_scope: Option<PoolScope>,
    #[arg(long, value_enum)]
    zero_exposure: Option<ZeroExposurePolicy>,
    /// Drop entities with a positive season total of this statistic from pools
    #[arg(long = "exclude-if-positive", value_name = "STAT")]
    exclude_if_positive: Vec<String>,
    /// Ordered metric ids or statistic names replacing the default metric set
    #[arg(long, value_delimiter = ',', value_name = "LIST")]
    metrics: Vec<String>,

    /// Emit per-period rolling series for each profiled metric
    #[arg(long)]
    rolling: bool,
    #[arg(long)]
    rolling_window: Option<usize>,
    #[arg(long)]
    rolling_min_periods: Option<usize>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("failed to write reports: {0}")]
    Report(#[from] std::io::Error),
    #[error("{0}")]
    Usage(String),
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => {
            logging::init_logging(args.verbose);
            run(&args)
        }
        Command::InitConfig { path, force } => init_config(&path, force),
    };
    if let Err(err) = result {
        tracing::error!("{err}");
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn init_config(path: &std::path::Path, force: bool) -> Result<(), RunError> {
    if path.exists() && !force {
        return Err(RunError::Usage(format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        )));
    }
    let text = ProfileConfig::default_toml()?;
    std::fs::write(path, text)?;
    println!("wrote {}", path.display());
    Ok(())
}

fn run(args: &RunArgs) -> Result<(), RunError> {
    tracing::info!("peerprofile v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => ProfileConfig::load(path)?,
        None => ProfileConfig::default(),
    };
    apply_overrides(&mut config, args);
    config.validate()?;
    if category_scope_without_metadata(&config, args) {
        tracing::warn!(
            "pool_scope is category but no --meta was given; entities have no category and \
             every request will fail with not_in_pool (pass --meta or --pool-scope all)"
        );
    }
    let rolling = if args.rolling {
        Some(RollingParams::new(
            config.rolling_window,
            config.rolling_min_periods,
        )?)
    } else {
        None
    };

    let mut sources = args.batches.clone();
    if let Some(dir) = &args.input {
        sources.extend(resolve_batch_sources(dir, &config.input_suffix)?);
    }
    let corpus = load_corpus(&sources, &config.schema)?;
    config.validate_against_schema(&corpus.schema)?;

    let summaries = run_stage1(&corpus);
    let (summaries, n_with_metadata) = match &args.meta {
        Some(path) => {
            let meta = load_entity_meta(path, &config.metadata)?;
            if meta.is_empty() {
                tracing::warn!(path = %path.display(), "metadata file has no usable rows");
            }
            let matched = summaries
                .iter()
                .filter(|s| meta.get(&s.entity).is_some())
                .count();
            (attach_metadata(summaries, &meta), matched)
        }
        None => (summaries, 0),
    };

    let stage2 = run_stage2(
        &summaries,
        &corpus.schema,
        config.rate_unit,
        config.zero_exposure,
    );

    let requests = build_requests(args, &stage2.rated, config.exposure_threshold);
    if requests.is_empty() {
        tracing::warn!("no entity meets the exposure threshold; nothing to profile");
    }

    let outcomes = run_stage6(
        &Stage6Inputs {
            corpus: &corpus,
            population: &stage2.rated,
            rejected: &stage2.rejected,
            config: &config,
            rolling,
        },
        &requests,
    );

    let summary = RunSummary {
        tool_name: "peerprofile".to_string(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        n_batches: corpus.batches.len(),
        n_records: corpus.n_records(),
        n_entities: summaries.len(),
        n_rated: stage2.rated.len(),
        n_rejected: stage2.rejected.len(),
        n_with_metadata,
        rate_unit: config.rate_unit,
        exposure_threshold: config.exposure_threshold,
        min_pool_size: config.min_pool_size,
        tie_method: config.tie_method.as_str().to_string(),
        pool_scope: config.pool_scope.as_str().to_string(),
        zero_exposure: config.zero_exposure.as_str().to_string(),
        exclude_if_positive: config.exclude_if_positive.clone(),
        stats: corpus.schema.stats.clone(),
        rolling_window: rolling.map(|p| p.window()),
        rolling_min_periods: rolling.map(|p| p.min_periods()),
    };

    write_reports(
        &Stage7Input {
            summary,
            outcomes: &outcomes,
        },
        &args.out,
    )?;

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    tracing::info!(
        profiles = outcomes.len() - failed,
        failed,
        "run complete"
    );
    Ok(())
}

/// Categories only come from the metadata join.
fn category_scope_without_metadata(config: &ProfileConfig, args: &RunArgs) -> bool {
    config.pool_scope == PoolScope::Category && args.meta.is_none()
}

/// CLI values win over the config file.
fn apply_overrides(config: &mut ProfileConfig, args: &RunArgs) {
    if let Some(v) = args.rate_unit {
        config.rate_unit = v;
    }
    if let Some(v) = args.exposure_threshold {
        config.exposure_threshold = v;
    }
    if let Some(v) = args.min_pool_size {
        config.min_pool_size = v;
    }
    if let Some(v) = args.tie_method {
        config.tie_method = v;
    }
    if let Some(v) = args.pool_scope {
        config.pool_scope = v;
    }
    if let Some(v) = args.zero_exposure {
        config.zero_exposure = v;
    }
    if let Some(v) = args.rolling_window {
        config.rolling_window = v;
    }
    if let Some(v) = args.rolling_min_periods {
        config.rolling_min_periods = v;
    }
    if !args.exclude_if_positive.is_empty() {
        config.exclude_if_positive = args.exclude_if_positive.clone();
    }
    if !args.metrics.is_empty() {
        let available: Vec<MetricDef> = config
            .metric_set
            .iter()
            .chain(config.category_metrics.values().flatten())
            .cloned()
            .collect();
        config.metric_set = select_metrics(&available, &args.metrics);
        if !config.category_metrics.is_empty() {
            tracing::info!("--metrics replaces the per-category metric tables for this run");
            config.category_metrics.clear();
        }
    }
}

/// Picks metrics by id or statistic name, first match wins; a bare statistic
/// name becomes a per-unit metric of that statistic.
fn select_metrics(available: &[MetricDef], wanted: &[String]) -> Vec<MetricDef> {
    wanted
        .iter()
        .map(|w| {
            available
                .iter()
                .find(|m| &m.id == w)
                .or_else(|| available.iter().find(|m| &m.stat == w))
                .cloned()
                .unwrap_or_else(|| MetricDef::per_unit(w, w, w))
        })
        .collect()
}

/// Explicit requests in CLI order (ids, names, teams); with none given, every
/// entity meeting the exposure threshold, by id.
fn build_requests(args: &RunArgs, rated: &[RatedEntity], threshold: f64) -> Vec<EntityRequest> {
    let mut requests: Vec<EntityRequest> = args
        .entities
        .iter()
        .map(|id| EntityRequest::Id(EntityId::new(id.as_str())))
        .collect();
    requests.extend(args.names.iter().cloned().map(EntityRequest::Name));
    requests.extend(args.teams.iter().cloned().map(EntityRequest::Team));
    if requests.is_empty() {
        requests = rated
            .iter()
            .filter(|e| e.summary.total_exposure >= threshold)
            .map(|e| EntityRequest::Id(e.summary.entity.clone()))
            .collect();
    }
    requests
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;
