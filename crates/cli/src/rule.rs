// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Rule trait and violation types.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ast::Ast;

/// Severity of a rule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single rule violation against one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Id of the rule that produced this match.
    pub rule_id: String,

    /// Absolute path of the offending file.
    pub file_path: String,

    /// Human-readable description of the violation.
    pub message: String,

    /// 1-based line number.
    pub line: u32,

    /// 0-based column number.
    pub column: u32,

    /// Violation severity.
    pub severity: Severity,
}

impl Match {
    /// Create a match for the given rule and position.
    pub fn new(
        rule_id: impl Into<String>,
        file_path: impl Into<String>,
        message: impl Into<String>,
        line: u32,
        column: u32,
        severity: Severity,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            file_path: file_path.into(),
            message: message.into(),
            line: line.max(1),
            column,
            severity,
        }
    }
}

/// Error type for rule evaluation.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// The rule could not evaluate this file.
    #[error("{0}")]
    Failed(String),

    /// A rule definition file was malformed.
    #[error("invalid rule definition: {0}")]
    Definition(String),
}

/// A single analysis rule.
///
/// Object-safe to allow dynamic dispatch via `Arc<dyn Rule>`. A rule's
/// `check` must be a pure function of its inputs; any state it keeps is
/// private to one invocation.
pub trait Rule: Send + Sync {
    /// Unique identifier (e.g., "no-console").
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Description for help output and reports.
    fn description(&self) -> &str;

    /// Category grouping (e.g., "correctness", "style").
    fn category(&self) -> &str;

    /// Examine one file and return its violations.
    fn check(&self, file_path: &Path, content: &str, ast: &Ast) -> Result<Vec<Match>, RuleError>;
}

#[cfg(test)]
#[path = "rule_tests.rs"]
mod tests;
