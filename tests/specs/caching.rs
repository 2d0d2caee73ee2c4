//! Cache behavior across runs of the real binary.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::prelude::*;

/// Second run over an unchanged tree is served from the cache.
#[test]
fn second_run_hits_the_cache() {
    let project = Project::new();
    let a = project.write("src/a.ts", "debugger;\n");
    let parser = project.write_parser(&debugger_program(), &[(a, debugger_program())]);
    project.write_config(&parser, "");

    project.analyze_cmd().assert().code(1);
    let first = project.read_report();
    assert_eq!(first["filesFromCache"], 0);

    project.analyze_cmd().assert().code(1);
    let second = project.read_report();
    assert_eq!(second["filesFromCache"], 1);
    assert_eq!(second["cacheHitRate"], 100.0);
    // The violations themselves are identical across runs
    assert_eq!(first["matchesByRuleId"], second["matchesByRuleId"]);

    // Runs two and three are byte-identical: the report carries no
    // timestamps and the cache state no longer shifts
    let second_bytes = project.read_report_bytes();
    project.analyze_cmd().assert().code(1);
    assert_eq!(project.read_report_bytes(), second_bytes);
}

/// Modifying one file reparses only that file.
#[test]
fn modified_file_is_reparsed_others_come_from_cache() {
    let project = Project::new();
    let a = project.write("src/a.ts", "debugger;\n");
    let b = project.write("src/b.ts", "export const b = 1;\n");
    let parser = project.write_parser(
        &empty_program(),
        &[
            (a.clone(), debugger_program()),
            (b.clone(), empty_program()),
        ],
    );
    project.write_config(&parser, "");

    project.analyze_cmd().assert().code(1);
    assert_eq!(project.read_report()["totalMatchesFound"], 1);

    // Rewrite a.ts clean. Only one file changed, so the second run uses
    // single mode, whose stub reply is an empty program.
    std::thread::sleep(std::time::Duration::from_millis(20));
    project.write("src/a.ts", "export const a = 2;\n");

    project.analyze_cmd().assert().success();
    let report = project.read_report();
    assert_eq!(report["totalFilesAnalyzed"], 2);
    assert_eq!(report["filesFromCache"], 1);
    assert_eq!(report["totalMatchesFound"], 0);
}

/// use_cache=false still produces element-wise equal matches.
#[test]
fn no_cache_runs_match_cached_runs() {
    let project = Project::new();
    let a = project.write("src/a.ts", "debugger;\n");
    let parser = project.write_parser(&debugger_program(), &[(a, debugger_program())]);
    project.write_config(&parser, "");

    project.analyze_cmd().assert().code(1);
    let cached = project.read_report();

    project.analyze_cmd().arg("--no-cache").assert().code(1);
    let uncached = project.read_report();

    assert_eq!(cached["matchesByRuleId"], uncached["matchesByRuleId"]);
    assert_eq!(uncached["cacheEnabled"], false);
    assert!(uncached.get("filesFromCache").is_none());
    assert!(uncached.get("cacheHitRate").is_none());
}

/// The on-disk cache layout matches the documented contract.
#[test]
fn cache_directory_layout() {
    let project = Project::new();
    let a = project.write("src/a.ts", "export {};\n");
    let parser = project.write_parser(&empty_program(), &[(a.clone(), empty_program())]);
    project.write_config(&parser, "");

    project.analyze_cmd().assert().success();

    let index_path = project.path(".sentinel-cache/cache-index.json");
    let index: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&index_path).unwrap()).unwrap();
    assert_eq!(index["version"], "1.0");
    assert!(index["files"][a.display().to_string()].is_object());

    // One dir_<hex>.json blob for src/, plus one rules_<hex>.json sidecar
    let entries: Vec<String> = std::fs::read_dir(project.path(".sentinel-cache"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(entries.iter().any(|name| name.starts_with("dir_") && name.ends_with(".json")));
    assert!(entries.iter().any(|name| name.starts_with("rules_") && name.ends_with(".json")));
}

/// `sentinel cache` reports entries; `--clear` wipes the directory.
#[test]
fn cache_subcommand_reports_and_clears() {
    let project = Project::new();
    let a = project.write("src/a.ts", "export {};\n");
    let parser = project.write_parser(&empty_program(), &[(a, empty_program())]);
    project.write_config(&parser, "");

    project.analyze_cmd().assert().success();

    sentinel_cmd()
        .current_dir(project.root())
        .arg("cache")
        .assert()
        .success()
        .stdout(predicates::str::contains("1 entries"));

    sentinel_cmd()
        .current_dir(project.root())
        .args(["cache", "--clear"])
        .assert()
        .success();
    assert!(!project.path(".sentinel-cache").exists());
}

/// --clear-cache drops entries for deleted files before analyzing.
#[test]
fn clear_cache_flag_drops_stale_entries() {
    let project = Project::new();
    let a = project.write("src/a.ts", "export {};\n");
    let gone = project.write("src/gone.ts", "export {};\n");
    let parser = project.write_parser(
        &empty_program(),
        &[(a, empty_program()), (gone.clone(), empty_program())],
    );
    project.write_config(&parser, "");

    project.analyze_cmd().assert().success();
    assert_eq!(project.read_report()["totalFilesAnalyzed"], 2);

    std::fs::remove_file(&gone).unwrap();
    project.analyze_cmd().arg("--clear-cache").assert().success();

    let index: serde_json::Value = serde_json::from_slice(
        &std::fs::read(project.path(".sentinel-cache/cache-index.json")).unwrap(),
    )
    .unwrap();
    assert!(index["files"][gone.display().to_string()].is_null());
}
