// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! CLI argument parsing with clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Static analysis engine for TypeScript/TSX sources
#[derive(Parser)]
#[command(name = "sentinel")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Use specific config file
    #[arg(short = 'C', long = "config", global = true, env = "SENTINEL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Analyze a directory tree and write a violation report
    Analyze(AnalyzeArgs),
    /// Inspect or clear the on-disk result cache
    Cache(CacheArgs),
}

#[derive(clap::Args)]
pub struct AnalyzeArgs {
    /// Directory to analyze (default: current directory)
    #[arg(value_name = "PATH")]
    pub target: Option<PathBuf>,

    /// Directory containing rule definition files
    #[arg(long, value_name = "DIR")]
    pub rules_dir: Option<PathBuf>,

    /// Directory the report is written to
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Exclude paths whose segments contain this substring (repeatable)
    #[arg(long = "exclude-pattern", value_name = "SUBSTR")]
    pub exclude_patterns: Vec<String>,

    /// Exclude files whose name ends with this suffix (repeatable)
    #[arg(long = "exclude-suffix", value_name = "SUFFIX")]
    pub exclude_suffixes: Vec<String>,

    /// Follow symlinks that resolve inside the target directory
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Bypass the result cache (force fresh analysis)
    #[arg(long)]
    pub no_cache: bool,

    /// Cache directory (default: .sentinel-cache)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Drop cache entries for files that no longer exist before analyzing
    #[arg(long)]
    pub clear_cache: bool,

    /// Parser executable (overrides [parser] command in sentinel.toml)
    #[arg(long, value_name = "CMD")]
    pub parser_cmd: Option<PathBuf>,

    /// Log level when SENTINEL_LOG is unset (debug/info/warn/error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Skip writing performance metrics CSVs
    #[arg(long)]
    pub no_metrics: bool,
}

#[derive(clap::Args)]
pub struct CacheArgs {
    /// Delete the cache directory entirely
    #[arg(long)]
    pub clear: bool,

    /// Cache directory (default: .sentinel-cache)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
