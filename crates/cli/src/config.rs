// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration parsing and validation.
//!
//! Handles sentinel.toml parsing with version validation, then folds
//! command-line overrides on top. The resulting [`Config`] is the immutable
//! bundle of tunables the pipeline consumes.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cli::AnalyzeArgs;
use crate::error::{Error, Result};

/// Default cache directory name.
pub const DEFAULT_CACHE_DIR: &str = ".sentinel-cache";

/// Minimum config structure for version checking.
#[derive(Deserialize)]
struct VersionOnly {
    version: Option<i64>,
}

/// Full configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Config file version (must be 1).
    pub version: i64,

    /// Log level used when SENTINEL_LOG is unset (debug/info/warn/error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Analysis input selection.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Result cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// External parser subprocess settings.
    #[serde(default)]
    pub parser: ParserConfig,

    /// Performance metrics settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            log_level: default_log_level(),
            analysis: AnalysisConfig::default(),
            cache: CacheConfig::default(),
            parser: ParserConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// What to analyze and what to skip.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Root directory to crawl.
    #[serde(default = "default_target_dir")]
    pub target_dir: PathBuf,

    /// Directory of rule definition files (*.toml).
    #[serde(default)]
    pub rules_dir: Option<PathBuf>,

    /// Directory the report is written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Paths with a segment containing any of these substrings are skipped.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Files whose basename ends with any of these suffixes are skipped.
    #[serde(default)]
    pub exclude_suffixes: Vec<String>,

    /// Follow symlinks that resolve inside target_dir.
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_target_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_dir: default_target_dir(),
            rules_dir: None,
            output_dir: default_output_dir(),
            exclude_patterns: Vec::new(),
            exclude_suffixes: Vec::new(),
            follow_symlinks: false,
        }
    }
}

/// Result cache settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Whether the cache is consulted and updated.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache directory.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// Drop entries for files that no longer exist before analyzing.
    #[serde(default)]
    pub clear: bool,
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_cache_dir(),
            clear: false,
        }
    }
}

/// External parser subprocess settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParserConfig {
    /// Parser executable. Required for analysis.
    #[serde(default)]
    pub command: Option<PathBuf>,

    /// Arguments always passed to the parser.
    #[serde(default)]
    pub args: Vec<String>,

    /// Whether the parser understands the --batch flag.
    #[serde(default = "default_true")]
    pub batch: bool,

    /// Single-file request deadline in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Batch request deadline in seconds.
    #[serde(default = "default_batch_timeout_secs")]
    pub batch_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_batch_timeout_secs() -> u64 {
    30
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            batch: true,
            timeout_secs: default_timeout_secs(),
            batch_timeout_secs: default_batch_timeout_secs(),
        }
    }
}

/// Performance metrics settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Whether CSV metrics are appended after a run.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Load configuration from a sentinel.toml file.
pub fn load(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("cannot read config: {e}"),
        path: Some(path.to_path_buf()),
    })?;

    // Check version first for a friendlier error than deny_unknown_fields
    let version: VersionOnly = toml::from_str(&content).map_err(|e| Error::Config {
        message: format!("invalid TOML: {e}"),
        path: Some(path.to_path_buf()),
    })?;
    match version.version {
        Some(1) => {}
        Some(v) => {
            return Err(Error::Config {
                message: format!("unsupported config version {v} (expected 1)"),
                path: Some(path.to_path_buf()),
            });
        }
        None => {
            return Err(Error::Config {
                message: "missing required field: version".to_string(),
                path: Some(path.to_path_buf()),
            });
        }
    }

    toml::from_str(&content).map_err(|e| Error::Config {
        message: e.to_string(),
        path: Some(path.to_path_buf()),
    })
}

impl Config {
    /// Fold CLI overrides on top of the file-derived configuration.
    pub fn apply_args(&mut self, args: &AnalyzeArgs) {
        if let Some(target) = &args.target {
            self.analysis.target_dir = target.clone();
        }
        if let Some(rules_dir) = &args.rules_dir {
            self.analysis.rules_dir = Some(rules_dir.clone());
        }
        if let Some(output_dir) = &args.output_dir {
            self.analysis.output_dir = output_dir.clone();
        }
        self.analysis
            .exclude_patterns
            .extend(args.exclude_patterns.iter().cloned());
        self.analysis
            .exclude_suffixes
            .extend(args.exclude_suffixes.iter().cloned());
        if args.follow_symlinks {
            self.analysis.follow_symlinks = true;
        }
        if args.no_cache {
            self.cache.enabled = false;
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.cache.dir = cache_dir.clone();
        }
        if args.clear_cache {
            self.cache.clear = true;
        }
        if let Some(parser_cmd) = &args.parser_cmd {
            self.parser.command = Some(parser_cmd.clone());
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
        if args.no_metrics {
            self.metrics.enabled = false;
        }
    }

    /// Resolve relative paths against `cwd` and validate the target.
    ///
    /// The target directory must exist; everything else is created on
    /// demand later. Canonicalizing the target up front gives the cache a
    /// stable identity for every path derived from it.
    pub fn resolve(&mut self, cwd: &Path) -> Result<()> {
        let target = absolutize(&self.analysis.target_dir, cwd);
        self.analysis.target_dir = target.canonicalize().map_err(|_| Error::Config {
            message: format!("target directory does not exist: {}", target.display()),
            path: None,
        })?;
        if !self.analysis.target_dir.is_dir() {
            return Err(Error::Config {
                message: format!(
                    "target is not a directory: {}",
                    self.analysis.target_dir.display()
                ),
                path: None,
            });
        }

        self.analysis.output_dir = absolutize(&self.analysis.output_dir, cwd);
        self.cache.dir = absolutize(&self.cache.dir, cwd);
        if let Some(rules_dir) = &self.analysis.rules_dir {
            self.analysis.rules_dir = Some(absolutize(rules_dir, cwd));
        }
        Ok(())
    }
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
