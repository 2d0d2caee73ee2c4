// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Report aggregation and output.
//!
//! Folds per-file results into the final report, writes it atomically as
//! JSON, and prints a console summary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use termcolor::{Color, ColorSpec, WriteColor};

use crate::analyzer::FileAnalysisResult;
use crate::error::{Error, Result};
use crate::rule::Match;

/// Report file name within the output directory.
pub const REPORT_FILE_NAME: &str = "analysis_results.json";

/// The final analysis report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Number of files that produced a result.
    pub total_files_analyzed: usize,

    /// Sum of matches across all files.
    pub total_matches_found: usize,

    /// Matches grouped by rule id, ordered by (file, line, column).
    pub matches_by_rule_id: BTreeMap<String, Vec<Match>>,

    /// Files that could not be read or parsed, sorted.
    pub files_with_errors: Vec<String>,

    /// Whether the cache was in use for this run.
    pub cache_enabled: bool,

    /// Number of results served from the cache (when enabled).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_from_cache: Option<usize>,

    /// Cache hit percentage, 0-100 (when enabled).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_hit_rate: Option<f64>,
}

impl AnalysisReport {
    /// Fold per-file results into the report.
    pub fn build(results: &[FileAnalysisResult], cache_enabled: bool) -> Self {
        let mut matches_by_rule_id: BTreeMap<String, Vec<Match>> = BTreeMap::new();
        let mut files_with_errors = Vec::new();
        let mut total_matches_found = 0;
        let mut files_from_cache = 0;

        for result in results {
            if result.from_cache {
                files_from_cache += 1;
            }
            if let Some(error) = &result.error {
                tracing::debug!("{}: {error}", result.file_path.display());
                files_with_errors.push(result.file_path.display().to_string());
                continue;
            }
            total_matches_found += result.matches.len();
            for m in &result.matches {
                matches_by_rule_id
                    .entry(m.rule_id.clone())
                    .or_default()
                    .push(m.clone());
            }
        }

        for matches in matches_by_rule_id.values_mut() {
            matches.sort_by(|a, b| {
                a.file_path
                    .cmp(&b.file_path)
                    .then(a.line.cmp(&b.line))
                    .then(a.column.cmp(&b.column))
            });
        }
        files_with_errors.sort();

        let total = results.len();
        let cache_hit_rate = if total == 0 {
            0.0
        } else {
            files_from_cache as f64 / total as f64 * 100.0
        };

        Self {
            total_files_analyzed: total,
            total_matches_found,
            matches_by_rule_id,
            files_with_errors,
            cache_enabled,
            files_from_cache: cache_enabled.then_some(files_from_cache),
            cache_hit_rate: cache_enabled.then_some(cache_hit_rate),
        }
    }

    /// Write the report to `<output_dir>/analysis_results.json`.
    ///
    /// Creates the directory on demand; the write is new-then-rename.
    /// Failure here is fatal to the run.
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(output_dir).map_err(|e| Error::Report {
            path: output_dir.to_path_buf(),
            message: format!("cannot create output directory: {e}"),
        })?;

        let path = output_dir.join(REPORT_FILE_NAME);
        let json = serde_json::to_vec_pretty(self).map_err(|e| Error::Report {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &json).map_err(|e| Error::Report {
            path: temp_path.clone(),
            message: e.to_string(),
        })?;
        std::fs::rename(&temp_path, &path).map_err(|e| Error::Report {
            path: path.clone(),
            message: e.to_string(),
        })?;

        tracing::info!("report written to {}", path.display());
        Ok(path)
    }
}

/// Print a human-readable summary to the console.
pub fn print_summary<W: WriteColor>(report: &AnalysisReport, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "Analyzed {} files", report.total_files_analyzed)?;
    if let (Some(from_cache), Some(rate)) = (report.files_from_cache, report.cache_hit_rate) {
        writeln!(
            out,
            "Cache: {from_cache}/{} hits ({rate:.1}%)",
            report.total_files_analyzed
        )?;
    }

    for (rule_id, matches) in &report.matches_by_rule_id {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
        write!(out, "{rule_id}")?;
        out.reset()?;
        writeln!(out, ": {} matches", matches.len())?;
        for m in matches {
            writeln!(out, "  {}:{}:{} {}", m.file_path, m.line, m.column, m.message)?;
        }
    }

    if !report.files_with_errors.is_empty() {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
        writeln!(out, "{} files with errors:", report.files_with_errors.len())?;
        out.reset()?;
        for file in &report.files_with_errors {
            writeln!(out, "  {file}")?;
        }
    }

    if report.total_matches_found == 0 {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        writeln!(out, "No matches found")?;
        out.reset()?;
    } else {
        writeln!(out, "{} total matches", report.total_matches_found)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
