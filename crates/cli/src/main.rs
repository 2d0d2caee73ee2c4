// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sentinel CLI entry point.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{CommandFactory, Parser};
use termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::{EnvFilter, fmt};

use sentinel::analyzer::Analyzer;
use sentinel::cache::ResultCache;
use sentinel::cli::{AnalyzeArgs, CacheArgs, Cli, Command};
use sentinel::config::{self, Config};
use sentinel::discovery;
use sentinel::error::ExitCode;
use sentinel::metrics::{PerfMetrics, RunSummary};
use sentinel::parser::TsParser;
use sentinel::registry;
use sentinel::report::{self, AnalysisReport};
use sentinel::walker::SourceWalker;

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env("SENTINEL_LOG").unwrap_or_else(|_| {
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let exit_code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("sentinel: {}", e);
            match e.downcast_ref::<sentinel::Error>() {
                Some(err) => ExitCode::from(err),
                None => ExitCode::InternalError,
            }
        }
    };

    std::process::exit(exit_code as i32);
}

fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match &cli.command {
        None => {
            // Show help for bare invocation
            Cli::command().print_help()?;
            println!();
            Ok(ExitCode::Success)
        }
        Some(Command::Analyze(args)) => run_analyze(&cli, args),
        Some(Command::Cache(args)) => run_cache(&cli, args),
    }
}

/// Load sentinel.toml (when present), fold CLI overrides, resolve paths.
fn resolve_analysis_config(
    cli: &Cli,
    args: &AnalyzeArgs,
    cwd: &std::path::Path,
) -> sentinel::error::Result<Config> {
    let config_path = discovery::resolve_config(cli.config.as_deref(), cwd)?;
    let mut config = match &config_path {
        Some(path) => config::load(path)?,
        None => Config::default(),
    };
    config.apply_args(args);
    config.resolve(cwd)?;
    Ok(config)
}

fn run_analyze(cli: &Cli, args: &AnalyzeArgs) -> anyhow::Result<ExitCode> {
    let mut metrics = PerfMetrics::new();
    let cwd = std::env::current_dir()?;

    let config = metrics.time("config", || resolve_analysis_config(cli, args, &cwd))?;
    init_logging(&config.log_level);
    tracing::debug!("analyzing {}", config.analysis.target_dir.display());

    // Construct the pipeline's collaborators
    struct Pipeline {
        registry: Arc<sentinel::registry::RuleRegistry>,
        parser: Arc<TsParser>,
        cache: Option<Arc<ResultCache>>,
    }
    let pipeline = metrics.time("init", || -> sentinel::error::Result<Pipeline> {
        let registry = Arc::new(registry::load_rules(config.analysis.rules_dir.as_deref())?);
        let parser = Arc::new(TsParser::from_config(&config.parser)?);
        let cache = if config.cache.enabled {
            let cache = Arc::new(ResultCache::load(&config.cache.dir));
            if config.cache.clear {
                cache.cleanup_stale();
            }
            Some(cache)
        } else {
            None
        };
        Ok(Pipeline {
            registry,
            parser,
            cache,
        })
    })?;

    let files = metrics.time("crawl", || -> sentinel::error::Result<Vec<PathBuf>> {
        let walker = SourceWalker::from_config(&config.analysis)?;
        walker.find_source_files(&config.analysis.target_dir)
    })?;
    tracing::info!("found {} source files", files.len());

    let analyzer = Analyzer::new(pipeline.registry, pipeline.parser, pipeline.cache);
    let analyze_started = Instant::now();
    let outcome = analyzer.analyze(&files);
    let analyze_total = analyze_started.elapsed();

    metrics.record("parse", outcome.timings.parse);
    metrics.record(
        "analyze",
        analyze_total
            .saturating_sub(outcome.timings.parse)
            .saturating_sub(outcome.timings.save_cache),
    );
    metrics.record("save-cache", outcome.timings.save_cache);

    let analysis_report = metrics.time("report", || -> sentinel::error::Result<AnalysisReport> {
        let analysis_report = AnalysisReport::build(&outcome.results, config.cache.enabled);
        analysis_report.write(&config.analysis.output_dir)?;
        Ok(analysis_report)
    })?;

    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    report::print_summary(&analysis_report, &mut stdout)?;

    if config.metrics.enabled {
        let summary = RunSummary {
            file_count: analysis_report.total_files_analyzed,
            cached_files: analysis_report.files_from_cache.unwrap_or(0),
            matches_found: analysis_report.total_matches_found,
        };
        if let Err(e) = metrics.write_csv(&cwd, &summary) {
            tracing::warn!("cannot write metrics: {e}");
        }
    }

    Ok(if analysis_report.total_matches_found > 0 {
        ExitCode::MatchesFound
    } else {
        ExitCode::Success
    })
}

fn run_cache(cli: &Cli, args: &CacheArgs) -> anyhow::Result<ExitCode> {
    let cwd = std::env::current_dir()?;

    let config_path = discovery::resolve_config(cli.config.as_deref(), &cwd)?;
    let mut config = match &config_path {
        Some(path) => config::load(path)?,
        None => Config::default(),
    };
    if let Some(dir) = &args.cache_dir {
        config.cache.dir = dir.clone();
    }
    let cache_dir = if config.cache.dir.is_absolute() {
        config.cache.dir.clone()
    } else {
        cwd.join(&config.cache.dir)
    };
    init_logging(&config.log_level);

    if args.clear {
        ResultCache::clear(&cache_dir)?;
        println!("cache cleared: {}", cache_dir.display());
    } else {
        let cache = ResultCache::load(&cache_dir);
        println!(
            "{} entries in {}",
            cache.entry_count(),
            cache.cache_dir().display()
        );
    }
    Ok(ExitCode::Success)
}
