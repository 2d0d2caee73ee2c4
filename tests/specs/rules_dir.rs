//! Rule loading from a rules directory.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::prelude::*;

/// A TOML-defined pattern rule produces matches end to end.
#[test]
fn pattern_rule_from_rules_dir() {
    let project = Project::new();
    let a = project.write("src/a.ts", "const x = 1; // TODO tidy\n");
    let parser = project.write_parser(&empty_program(), &[(a.clone(), empty_program())]);
    project.write(
        "rules/no-todo.toml",
        r#"
id = "no-todo"
name = "No TODO comments"
pattern = "TODO"
message = "Leftover TODO"
severity = "info"
"#,
    );
    project.write_config(&parser, "\n[analysis]\nrules_dir = \"rules\"\n");

    project.analyze_cmd().assert().code(1);

    let report = project.read_report();
    let m = &report["matchesByRuleId"]["no-todo"][0];
    assert_eq!(m["filePath"], a.display().to_string());
    assert_eq!(m["line"], 1);
    assert_eq!(m["message"], "Leftover TODO");
    assert_eq!(m["severity"], "info");
}

/// Disabling every built-in leaves a clean report but cache hits intact.
#[test]
fn zero_enabled_rules_still_reports_cache_hits() {
    let project = Project::new();
    let a = project.write("src/a.ts", "debugger;\n");
    let parser = project.write_parser(&debugger_program(), &[(a, debugger_program())]);
    for rule in ["no-console", "no-debugger", "no-explicit-any", "max-file-lines"] {
        project.write(
            &format!("rules/off-{rule}.toml"),
            &format!("id = \"{rule}\"\nenabled = false\n"),
        );
    }
    project.write_config(&parser, "\n[analysis]\nrules_dir = \"rules\"\n");

    project.analyze_cmd().assert().success();
    let first = project.read_report();
    assert_eq!(first["totalMatchesFound"], 0);
    assert_eq!(first["filesFromCache"], 0);

    project.analyze_cmd().assert().success();
    let second = project.read_report();
    assert_eq!(second["totalMatchesFound"], 0);
    assert_eq!(second["filesFromCache"], 1);
}

/// A malformed rule definition aborts the run before analysis.
#[test]
fn malformed_rule_definition_is_fatal() {
    let project = Project::new();
    project.write("src/a.ts", "export {};\n");
    let parser = project.write_parser(&empty_program(), &[]);
    project.write("rules/broken.toml", "pattern = \"no id field\"\n");
    project.write_config(&parser, "\n[analysis]\nrules_dir = \"rules\"\n");

    project
        .analyze_cmd()
        .assert()
        .code(2)
        .stderr(predicates::str::contains("rule"));
}
