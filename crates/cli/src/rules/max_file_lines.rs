// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Flags files that grow past a line budget.

use std::path::Path;

use crate::ast::Ast;
use crate::rule::{Match, Rule, RuleError, Severity};

/// Default maximum lines per file.
pub const DEFAULT_MAX_LINES: usize = 500;

/// Reports files longer than the configured budget.
pub struct MaxFileLines {
    max_lines: usize,
}

impl Default for MaxFileLines {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
        }
    }
}

impl MaxFileLines {
    /// Create the rule with a custom budget.
    pub fn with_limit(max_lines: usize) -> Self {
        Self { max_lines }
    }
}

impl Rule for MaxFileLines {
    fn id(&self) -> &str {
        "max-file-lines"
    }

    fn name(&self) -> &str {
        "Max file lines"
    }

    fn description(&self) -> &str {
        "Flags files that exceed the per-file line budget"
    }

    fn category(&self) -> &str {
        "maintainability"
    }

    fn check(&self, file_path: &Path, content: &str, _ast: &Ast) -> Result<Vec<Match>, RuleError> {
        let lines = content.lines().count();
        if lines <= self.max_lines {
            return Ok(Vec::new());
        }
        Ok(vec![Match::new(
            self.id(),
            file_path.display().to_string(),
            format!("File has {lines} lines (max {})", self.max_lines),
            (self.max_lines + 1) as u32,
            0,
            Severity::Info,
        )])
    }
}
