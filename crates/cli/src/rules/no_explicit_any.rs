// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Flags explicit `any` type annotations.

use std::path::Path;

use crate::ast::{Ast, node_start, node_type, visit_nodes};
use crate::rule::{Match, Rule, RuleError, Severity};

/// Reports every explicit `any` annotation (`TSAnyKeyword` node).
pub struct NoExplicitAny;

impl Rule for NoExplicitAny {
    fn id(&self) -> &str {
        "no-explicit-any"
    }

    fn name(&self) -> &str {
        "No explicit any"
    }

    fn description(&self) -> &str {
        "Disallows the any type, which opts out of type checking"
    }

    fn category(&self) -> &str {
        "types"
    }

    fn check(&self, file_path: &Path, _content: &str, ast: &Ast) -> Result<Vec<Match>, RuleError> {
        let path = file_path.display().to_string();
        let mut matches = Vec::new();
        visit_nodes(ast, &mut |node| {
            if node_type(node) == Some("TSAnyKeyword") {
                let (line, column) = node_start(node).unwrap_or((1, 0));
                matches.push(Match::new(
                    self.id(),
                    path.as_str(),
                    "Unexpected explicit any",
                    line,
                    column,
                    Severity::Warning,
                ));
            }
        });
        Ok(matches)
    }
}
