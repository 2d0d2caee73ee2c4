// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Flags `debugger` statements.

use std::path::Path;

use crate::ast::{Ast, node_start, node_type, visit_nodes};
use crate::rule::{Match, Rule, RuleError, Severity};

/// Reports every `debugger;` statement.
pub struct NoDebugger;

impl Rule for NoDebugger {
    fn id(&self) -> &str {
        "no-debugger"
    }

    fn name(&self) -> &str {
        "No debugger statements"
    }

    fn description(&self) -> &str {
        "Disallows debugger statements, which halt execution in the browser"
    }

    fn category(&self) -> &str {
        "correctness"
    }

    fn check(&self, file_path: &Path, _content: &str, ast: &Ast) -> Result<Vec<Match>, RuleError> {
        let path = file_path.display().to_string();
        let mut matches = Vec::new();
        visit_nodes(ast, &mut |node| {
            if node_type(node) == Some("DebuggerStatement") {
                let (line, column) = node_start(node).unwrap_or((1, 0));
                matches.push(Match::new(
                    self.id(),
                    path.as_str(),
                    "Unexpected debugger statement",
                    line,
                    column,
                    Severity::Error,
                ));
            }
        });
        Ok(matches)
    }
}
