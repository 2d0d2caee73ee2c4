// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Analysis orchestrator.
//!
//! Drives the per-file pipeline: fingerprint validation, cache probes,
//! batched parsing, rule dispatch, and cache updates. Error recovery is
//! local to each file; a file that cannot be read or parsed becomes an
//! error result and never aborts the run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::ast::Ast;
use crate::cache::{ChangeState, ResultCache};
use crate::parser::TsParser;
use crate::pool::{Task, WorkerPool, default_concurrency};
use crate::reader::{FileContent, FileReader};
use crate::registry::RuleRegistry;
use crate::rule::Match;

/// Outcome of analyzing one file.
#[derive(Debug)]
pub struct FileAnalysisResult {
    /// Absolute path of the analyzed file.
    pub file_path: PathBuf,

    /// Violations found (empty on error).
    pub matches: Vec<Match>,

    /// Why the file could not be analyzed, when it could not.
    pub error: Option<String>,

    /// Whether this result was served from the cache.
    pub from_cache: bool,
}

impl FileAnalysisResult {
    fn ok(file_path: PathBuf, matches: Vec<Match>, from_cache: bool) -> Self {
        Self {
            file_path,
            matches,
            error: None,
            from_cache,
        }
    }

    fn failed(file_path: PathBuf, error: String) -> Self {
        Self {
            file_path,
            matches: Vec::new(),
            error: Some(error),
            from_cache: false,
        }
    }
}

/// Wall-clock spans of the analyzer's internal stages.
#[derive(Debug, Default, Clone, Copy)]
pub struct StageTimings {
    /// Reading and parsing changed files.
    pub parse: Duration,
    /// Rule dispatch.
    pub rules: Duration,
    /// Persisting the cache.
    pub save_cache: Duration,
}

/// Results plus stage timings for the metrics sink.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub results: Vec<FileAnalysisResult>,
    pub timings: StageTimings,
}

/// How one input file proceeds through the pipeline.
enum Route {
    /// Rule-result cache hit: neither parse nor rule dispatch runs.
    Cached(FileAnalysisResult),
    /// AST cache hit: dispatch rules against the cached tree.
    RulesOnly(PathBuf, Ast),
    /// Cache miss: read and parse.
    Parse(PathBuf),
}

/// The pipeline orchestrator.
pub struct Analyzer {
    registry: Arc<RuleRegistry>,
    parser: Arc<TsParser>,
    cache: Option<Arc<ResultCache>>,
    concurrency: usize,
}

impl Analyzer {
    /// Create an analyzer; pass `cache: None` to run uncached.
    pub fn new(
        registry: Arc<RuleRegistry>,
        parser: Arc<TsParser>,
        cache: Option<Arc<ResultCache>>,
    ) -> Self {
        Self {
            registry,
            parser,
            cache,
            concurrency: default_concurrency(),
        }
    }

    /// Override the worker count (still clamped by the pool).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Analyze every file, returning exactly one result per input path.
    pub fn analyze(&self, files: &[PathBuf]) -> AnalysisOutcome {
        let mut timings = StageTimings::default();

        // Stage 1: cache partition. Unknown counts as changed.
        let routes: Vec<Route> = files
            .par_iter()
            .map(|path| self.route_file(path))
            .collect();

        let mut results = Vec::with_capacity(files.len());
        let mut rules_only = Vec::new();
        let mut to_parse = Vec::new();
        for route in routes {
            match route {
                Route::Cached(result) => results.push(result),
                Route::RulesOnly(path, ast) => rules_only.push((path, ast)),
                Route::Parse(path) => to_parse.push(path),
            }
        }
        tracing::debug!(
            "cache partition: {} fast-path, {} ast-hit, {} to parse",
            results.len(),
            rules_only.len(),
            to_parse.len()
        );

        // Stage 2: bounded concurrent reads, then parse.
        let parse_started = Instant::now();
        let read_targets: Vec<PathBuf> = to_parse
            .iter()
            .chain(rules_only.iter().map(|(path, _)| path))
            .cloned()
            .collect();
        let (mut contents, read_errors) = self.read_files(&read_targets);
        for (path, error) in read_errors {
            results.push(FileAnalysisResult::failed(path, error));
        }

        let pending: Vec<(PathBuf, String)> = to_parse
            .into_iter()
            .filter_map(|path| {
                let content = contents.get(&path)?.clone();
                Some((path, content))
            })
            .collect();
        let (asts, parse_errors) = self.parse_files(pending);
        timings.parse = parse_started.elapsed();

        for (path, error) in parse_errors {
            results.push(FileAnalysisResult::failed(path, error));
        }

        // Stage 3: store ASTs for freshly parsed files.
        if let Some(cache) = &self.cache {
            for (path, ast) in &asts {
                if let Some(content) = contents.get(path) {
                    cache.store_ast(path, content, ast.clone());
                }
            }
        }

        // Stage 4: rule dispatch, cached ASTs and fresh ones alike.
        let rules_started = Instant::now();
        let mut jobs: Vec<(PathBuf, String, Ast, bool)> = Vec::new();
        for (path, ast) in rules_only {
            if let Some(content) = contents.remove(&path) {
                jobs.push((path, content, ast, true));
            }
        }
        for (path, ast) in asts {
            if let Some(content) = contents.remove(&path) {
                jobs.push((path, content, ast, false));
            }
        }
        let dispatched = self.dispatch_jobs(jobs);
        timings.rules = rules_started.elapsed();

        // Stage 5: record rule results; a file whose rules all failed is
        // still an empty-matches success.
        for (path, matches, from_cache) in dispatched {
            if let Some(cache) = &self.cache {
                cache.store_rule_results(&path, matches.clone());
            }
            results.push(FileAnalysisResult::ok(path, matches, from_cache));
        }

        // Stage 6: persist before returning. Failures are logged, never fatal.
        if let Some(cache) = &self.cache {
            let save_started = Instant::now();
            if let Err(e) = cache.save() {
                tracing::warn!("cache save failed: {e}");
            }
            timings.save_cache = save_started.elapsed();
        }

        AnalysisOutcome { results, timings }
    }

    /// Decide one file's route through the pipeline.
    fn route_file(&self, path: &Path) -> Route {
        let Some(cache) = &self.cache else {
            return Route::Parse(path.to_path_buf());
        };
        match cache.is_changed(path) {
            ChangeState::Unchanged => {
                if let Some(matches) = cache.get_rule_results(path) {
                    // Fast path: the cached copy is authoritative for
                    // unchanged inputs.
                    Route::Cached(FileAnalysisResult::ok(path.to_path_buf(), matches, true))
                } else if let Some(ast) = cache.get_ast(path) {
                    Route::RulesOnly(path.to_path_buf(), ast)
                } else {
                    Route::Parse(path.to_path_buf())
                }
            }
            ChangeState::Changed | ChangeState::Unknown => Route::Parse(path.to_path_buf()),
        }
    }

    /// Read file contents through the worker pool.
    fn read_files(
        &self,
        paths: &[PathBuf],
    ) -> (HashMap<PathBuf, String>, Vec<(PathBuf, String)>) {
        let mut contents = HashMap::with_capacity(paths.len());
        let mut errors = Vec::new();
        if paths.is_empty() {
            return (contents, errors);
        }

        let pool: WorkerPool<FileContent> = WorkerPool::new(self.concurrency);
        let tasks: Vec<Task<FileContent>> = paths
            .iter()
            .enumerate()
            .map(|(idx, path)| {
                let path = path.clone();
                Task::new(idx as u64, move || {
                    FileReader::new().read(&path).map_err(|e| e.to_string())
                })
            })
            .collect();

        for outcome in pool.run_all(tasks) {
            let path = paths[outcome.id as usize].clone();
            match outcome.result {
                Ok(content) => {
                    contents.insert(path, content.text);
                }
                Err(error) => {
                    tracing::warn!("cannot read {}: {error}", path.display());
                    errors.push((path, error));
                }
            }
        }
        (contents, errors)
    }

    /// Parse pending files, batched when the parser supports it.
    fn parse_files(
        &self,
        pending: Vec<(PathBuf, String)>,
    ) -> (HashMap<PathBuf, Ast>, Vec<(PathBuf, String)>) {
        let mut asts = HashMap::with_capacity(pending.len());
        let mut errors = Vec::new();
        if pending.is_empty() {
            return (asts, errors);
        }

        if self.parser.supports_batch() && pending.len() > 1 {
            match self.parser.parse_batch(&pending) {
                Ok(replies) => {
                    for (path, reply) in replies {
                        match reply {
                            Ok(ast) => {
                                asts.insert(path, ast);
                            }
                            Err(e) => errors.push((path, e.to_string())),
                        }
                    }
                }
                Err(e) => {
                    // Request-level failure (timeout, spawn, protocol):
                    // every pending file is affected.
                    tracing::warn!("batch parse failed: {e}");
                    let message = e.to_string();
                    for (path, _) in pending {
                        errors.push((path, message.clone()));
                    }
                }
            }
        } else {
            for (path, source) in pending {
                match self.parser.parse(&path, &source) {
                    Ok(ast) => {
                        asts.insert(path, ast);
                    }
                    Err(e) => errors.push((path, e.to_string())),
                }
            }
        }
        (asts, errors)
    }

    /// Dispatch the full rule set against each job through the worker pool.
    fn dispatch_jobs(
        &self,
        jobs: Vec<(PathBuf, String, Ast, bool)>,
    ) -> Vec<(PathBuf, Vec<Match>, bool)> {
        if jobs.is_empty() {
            return Vec::new();
        }

        let mut meta = Vec::with_capacity(jobs.len());
        let pool: WorkerPool<Vec<Match>> = WorkerPool::new(self.concurrency);
        let tasks: Vec<Task<Vec<Match>>> = jobs
            .into_iter()
            .enumerate()
            .map(|(idx, (path, content, ast, from_cache))| {
                meta.push((path.clone(), from_cache));
                let registry = Arc::clone(&self.registry);
                Task::new(idx as u64, move || {
                    Ok(dispatch_rules(&registry, &path, &content, &ast))
                })
            })
            .collect();

        pool.run_all(tasks)
            .into_iter()
            .map(|outcome| {
                let (path, from_cache) = meta[outcome.id as usize].clone();
                let matches = match outcome.result {
                    Ok(matches) => matches,
                    Err(e) => {
                        tracing::error!("rule dispatch died for {}: {e}", path.display());
                        Vec::new()
                    }
                };
                (path, matches, from_cache)
            })
            .collect()
    }
}

/// Run every registered rule over one file, in registration order.
///
/// A failing rule is logged and skipped; the other rules still run.
fn dispatch_rules(registry: &RuleRegistry, path: &Path, content: &str, ast: &Ast) -> Vec<Match> {
    let mut matches = Vec::new();
    for rule in registry.all_rules() {
        match rule.check(path, content, ast) {
            Ok(found) => matches.extend(found),
            Err(e) => {
                tracing::warn!("rule {} failed on {}: {e}", rule.id(), path.display());
            }
        }
    }
    matches
}

#[cfg(test)]
#[path = "analyzer_tests.rs"]
mod tests;
