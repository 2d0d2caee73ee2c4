#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use tempfile::tempdir;

#[test]
fn time_records_a_stage() {
    let mut metrics = PerfMetrics::new();
    let value = metrics.time("crawl", || 42);
    assert_eq!(value, 42);
    assert_eq!(metrics.stages().len(), 1);
    assert_eq!(metrics.stages()[0].0, "crawl");
}

#[test]
fn write_csv_creates_files_with_headers() {
    let dir = tempdir().unwrap();
    let mut metrics = PerfMetrics::new();
    metrics.record("config", Duration::from_millis(5));
    metrics.record("crawl", Duration::from_millis(12));

    let summary = RunSummary {
        file_count: 3,
        cached_files: 1,
        matches_found: 2,
    };
    metrics.write_csv(dir.path(), &summary).unwrap();

    let summary_csv =
        std::fs::read_to_string(dir.path().join(METRICS_DIR_NAME).join(SUMMARY_FILE_NAME))
            .unwrap();
    let mut lines = summary_csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Timestamp,TotalDuration(ms),FileCount,CachedFiles,MatchesFound,MemoryUsed(MB)"
    );
    let row = lines.next().unwrap();
    assert!(row.contains(",3,1,2,"));

    let details_csv =
        std::fs::read_to_string(dir.path().join(METRICS_DIR_NAME).join(DETAILS_FILE_NAME))
            .unwrap();
    let mut lines = details_csv.lines();
    assert_eq!(lines.next().unwrap(), "Timestamp,Stage,Duration(ms)");
    let stages: Vec<&str> = lines
        .map(|l| l.split(',').nth(1).unwrap())
        .collect();
    assert_eq!(stages, vec!["config", "crawl", "total"]);
}

#[test]
fn write_csv_appends_without_repeating_headers() {
    let dir = tempdir().unwrap();
    let summary = RunSummary::default();

    for _ in 0..2 {
        let mut metrics = PerfMetrics::new();
        metrics.record("crawl", Duration::from_millis(1));
        metrics.write_csv(dir.path(), &summary).unwrap();
    }

    let summary_csv =
        std::fs::read_to_string(dir.path().join(METRICS_DIR_NAME).join(SUMMARY_FILE_NAME))
            .unwrap();
    let header_count = summary_csv
        .lines()
        .filter(|l| l.starts_with("Timestamp"))
        .count();
    assert_eq!(header_count, 1);
    assert_eq!(summary_csv.lines().count(), 3);
}
