//! End-to-end analysis runs against a stub parser.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::prelude::*;

/// One file, one violation: the full pipeline in miniature.
#[test]
fn single_file_with_one_match() {
    let project = Project::new();
    let a = project.write("src/a.ts", "debugger;\n");
    let parser = project.write_parser(&debugger_program(), &[(a.clone(), debugger_program())]);
    project.write_config(&parser, "");

    project.analyze_cmd().assert().code(1);

    let report = project.read_report();
    assert_eq!(report["totalFilesAnalyzed"], 1);
    assert_eq!(report["totalMatchesFound"], 1);
    assert_eq!(report["filesFromCache"], 0);
    assert_eq!(report["cacheEnabled"], true);
    assert_eq!(report["filesWithErrors"], serde_json::json!([]));

    let m = &report["matchesByRuleId"]["no-debugger"][0];
    assert_eq!(m["filePath"], a.display().to_string());
    assert_eq!(m["line"], 1);
    assert_eq!(m["column"], 0);
    assert_eq!(m["severity"], "error");
}

/// Two clean files: zero matches, zero errors, exit 0.
#[test]
fn clean_files_exit_zero() {
    let project = Project::new();
    let a = project.write("src/a.ts", "export const a = 1;\n");
    let b = project.write("src/b.ts", "export const b = 2;\n");
    let parser = project.write_parser(
        &empty_program(),
        &[(a, empty_program()), (b, empty_program())],
    );
    project.write_config(&parser, "");

    project
        .analyze_cmd()
        .assert()
        .success()
        .stdout(predicates::str::contains("No matches found"));

    let report = project.read_report();
    assert_eq!(report["totalFilesAnalyzed"], 2);
    assert_eq!(report["totalMatchesFound"], 0);
    assert_eq!(report["filesWithErrors"], serde_json::json!([]));
}

/// Excluded suffixes never reach any output field.
#[test]
fn excluded_suffix_is_invisible() {
    let project = Project::new();
    let a = project.write("src/a.ts", "export {};\n");
    project.write("src/x.test.ts", "debugger;\n");
    let parser = project.write_parser(&empty_program(), &[(a, empty_program())]);
    project.write_config(
        &parser,
        "\n[analysis]\nexclude_suffixes = [\".test.ts\"]\n",
    );

    project.analyze_cmd().assert().success();

    let report = project.read_report();
    assert_eq!(report["totalFilesAnalyzed"], 1);
    let json = report.to_string();
    assert!(!json.contains("x.test.ts"));
}

/// Exclude patterns prune whole subtrees.
#[test]
fn excluded_pattern_prunes_subtree() {
    let project = Project::new();
    let a = project.write("src/a.ts", "export {};\n");
    project.write("src/generated/g.ts", "debugger;\n");
    let parser = project.write_parser(&empty_program(), &[(a, empty_program())]);
    project.write_config(
        &parser,
        "\n[analysis]\nexclude_patterns = [\"generated\"]\n",
    );

    project.analyze_cmd().assert().success();
    assert_eq!(project.read_report()["totalFilesAnalyzed"], 1);
}

/// An empty tree still produces a valid report document.
#[test]
fn zero_input_files_writes_empty_report() {
    let project = Project::new();
    let parser = project.write_parser(&empty_program(), &[]);
    project.write_config(&parser, "");

    project.analyze_cmd().assert().success();

    let report = project.read_report();
    assert_eq!(report["totalFilesAnalyzed"], 0);
    assert_eq!(report["totalMatchesFound"], 0);
}

/// Performance metrics CSVs appear after a run.
#[test]
fn metrics_csvs_are_written() {
    let project = Project::new();
    let a = project.write("src/a.ts", "export {};\n");
    let parser = project.write_parser(&empty_program(), &[(a, empty_program())]);
    project.write_config(&parser, "");

    project.analyze_cmd().assert().success();

    let summary =
        std::fs::read_to_string(project.path("metrics/performance_summary.csv")).unwrap();
    assert!(summary.starts_with(
        "Timestamp,TotalDuration(ms),FileCount,CachedFiles,MatchesFound,MemoryUsed(MB)"
    ));
    let details =
        std::fs::read_to_string(project.path("metrics/performance_details.csv")).unwrap();
    assert!(details.contains(",crawl,"));
    assert!(details.contains(",parse,"));
    assert!(details.contains(",total,"));
}

/// --no-metrics suppresses the CSVs.
#[test]
fn no_metrics_flag_suppresses_csvs() {
    let project = Project::new();
    let a = project.write("src/a.ts", "export {};\n");
    let parser = project.write_parser(&empty_program(), &[(a, empty_program())]);
    project.write_config(&parser, "");

    project.analyze_cmd().arg("--no-metrics").assert().success();
    assert!(!project.path("metrics").exists());
}

/// A parser that dies marks its files as failures without aborting.
#[test]
fn parser_crash_lands_in_files_with_errors() {
    use std::os::unix::fs::PermissionsExt;

    let project = Project::new();
    let a = project.write("src/a.ts", "export {};\n");
    let parser = project.path("parser.sh");
    std::fs::write(&parser, "#!/bin/sh\ncat > /dev/null\nexit 1\n").unwrap();
    std::fs::set_permissions(&parser, std::fs::Permissions::from_mode(0o755)).unwrap();
    project.write_config(&parser, "");

    project.analyze_cmd().assert().success();

    let report = project.read_report();
    assert_eq!(report["totalFilesAnalyzed"], 1);
    assert_eq!(report["totalMatchesFound"], 0);
    assert_eq!(
        report["filesWithErrors"],
        serde_json::json!([a.display().to_string()])
    );
}
