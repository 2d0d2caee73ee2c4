//! Test helpers for behavioral specifications.
//!
//! Builds throwaway projects with a stub parser executable that speaks
//! the sentinel wire protocol, so specs can drive the real binary
//! end-to-end without a TypeScript toolchain.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub use assert_cmd::prelude::*;
pub use predicates;

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::{Value, json};

/// Returns a Command configured to run the sentinel binary
pub fn sentinel_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("sentinel"))
}

/// An ESTree-ish empty program.
pub fn empty_program() -> Value {
    json!({ "type": "Program", "body": [] })
}

/// A program whose only statement is `debugger;` at line 1, column 0.
pub fn debugger_program() -> Value {
    json!({
        "type": "Program",
        "body": [{
            "type": "DebuggerStatement",
            "loc": { "start": { "line": 1, "column": 0 }, "end": { "line": 1, "column": 9 } }
        }]
    })
}

/// A throwaway project directory driven through the real binary.
pub struct Project {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        Self { _dir: dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a project-relative file.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Create a file under the project root.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Write a stub parser that answers single requests with
    /// `single_ast` and batch requests with one entry per `batch` pair.
    #[cfg(unix)]
    pub fn write_parser(&self, single_ast: &Value, batch: &[(PathBuf, Value)]) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let single_reply = json!({ "success": true, "ast": single_ast });
        let mut results = serde_json::Map::new();
        for (path, ast) in batch {
            results.insert(
                path.display().to_string(),
                json!({ "success": true, "ast": ast }),
            );
        }
        let batch_reply = json!({ "success": true, "results": results });

        let script = format!(
            "#!/bin/sh\ncat > /dev/null\nif [ \"$1\" = \"--batch\" ]; then\ncat <<'REPLY'\n{batch_reply}\nREPLY\nelse\ncat <<'REPLY'\n{single_reply}\nREPLY\nfi\n"
        );
        let path = self.path("parser.sh");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Write sentinel.toml pointing at the given parser.
    pub fn write_config(&self, parser: &Path, extra: &str) {
        self.write(
            "sentinel.toml",
            &format!(
                "version = 1\n\n[parser]\ncommand = \"{}\"\n{extra}",
                parser.display()
            ),
        );
    }

    /// An `analyze` invocation rooted at this project.
    pub fn analyze_cmd(&self) -> Command {
        let mut cmd = sentinel_cmd();
        cmd.current_dir(&self.root).arg("analyze");
        cmd
    }

    /// Parse the report the last run wrote.
    pub fn read_report(&self) -> Value {
        let bytes = std::fs::read(self.path("analysis_results.json")).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Raw report bytes, for byte-identity assertions.
    pub fn read_report_bytes(&self) -> Vec<u8> {
        std::fs::read(self.path("analysis_results.json")).unwrap()
    }
}
