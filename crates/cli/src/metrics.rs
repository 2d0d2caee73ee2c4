// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Performance metrics.
//!
//! Records wall-clock spans per named stage and appends two CSVs under
//! `<cwd>/metrics/` after each run: a one-row summary and one row per
//! stage. Headers are written only when a file is first created, so the
//! files accumulate one run per append. Metrics I/O failures are logged
//! and never affect the run's outcome.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;

/// Directory (relative to cwd) the CSV files live in.
pub const METRICS_DIR_NAME: &str = "metrics";

/// One row per run.
pub const SUMMARY_FILE_NAME: &str = "performance_summary.csv";

/// One row per stage per run.
pub const DETAILS_FILE_NAME: &str = "performance_details.csv";

const SUMMARY_HEADER: &str =
    "Timestamp,TotalDuration(ms),FileCount,CachedFiles,MatchesFound,MemoryUsed(MB)";
const DETAILS_HEADER: &str = "Timestamp,Stage,Duration(ms)";

/// Run counters for the summary row.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub file_count: usize,
    pub cached_files: usize,
    pub matches_found: usize,
}

/// Per-stage wall-clock recorder.
pub struct PerfMetrics {
    started: Instant,
    stages: Vec<(String, Duration)>,
}

impl Default for PerfMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PerfMetrics {
    /// Start the run clock.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            stages: Vec::new(),
        }
    }

    /// Record an externally measured stage span.
    pub fn record(&mut self, stage: &str, duration: Duration) {
        self.stages.push((stage.to_string(), duration));
    }

    /// Time a closure as one stage.
    pub fn time<T>(&mut self, stage: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(stage, start.elapsed());
        out
    }

    /// Stages recorded so far.
    pub fn stages(&self) -> &[(String, Duration)] {
        &self.stages
    }

    /// Append the summary and detail rows under `base_dir/metrics/`.
    pub fn write_csv(&self, base_dir: &Path, summary: &RunSummary) -> std::io::Result<()> {
        let dir = base_dir.join(METRICS_DIR_NAME);
        std::fs::create_dir_all(&dir)?;

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let total_ms = self.started.elapsed().as_millis();

        append_row(
            &dir.join(SUMMARY_FILE_NAME),
            SUMMARY_HEADER,
            &format!(
                "{timestamp},{total_ms},{},{},{},{:.1}",
                summary.file_count,
                summary.cached_files,
                summary.matches_found,
                memory_used_mb()
            ),
        )?;

        let details_path = dir.join(DETAILS_FILE_NAME);
        for (stage, duration) in &self.stages {
            append_row(
                &details_path,
                DETAILS_HEADER,
                &format!("{timestamp},{stage},{}", duration.as_millis()),
            )?;
        }
        append_row(
            &details_path,
            DETAILS_HEADER,
            &format!("{timestamp},total,{total_ms}"),
        )?;
        Ok(())
    }
}

/// Append one CSV row, creating the file with its header first.
fn append_row(path: &PathBuf, header: &str, row: &str) -> std::io::Result<()> {
    use std::io::Write;

    let fresh = !path.exists();
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    if fresh {
        writeln!(file, "{header}")?;
    }
    writeln!(file, "{row}")
}

/// Resident set size in MB, from /proc on Linux; 0 elsewhere.
#[cfg(target_os = "linux")]
fn memory_used_mb() -> f64 {
    let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
        return 0.0;
    };
    status
        .lines()
        .find_map(|line| {
            let rest = line.strip_prefix("VmRSS:")?;
            let kb: f64 = rest.trim().trim_end_matches("kB").trim().parse().ok()?;
            Some(kb / 1024.0)
        })
        .unwrap_or(0.0)
}

#[cfg(not(target_os = "linux"))]
fn memory_used_mb() -> f64 {
    0.0
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
