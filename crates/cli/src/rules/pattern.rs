// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Config-defined regex rules.
//!
//! A pattern rule scans file content line-by-line and emits one match per
//! regex occurrence. Definitions come from `*.toml` files in the rules
//! directory (see `registry::RuleDefinition`).

use std::path::Path;

use regex::Regex;

use crate::ast::Ast;
use crate::registry::RuleDefinition;
use crate::rule::{Match, Rule, RuleError, Severity};

/// A rule defined by a regex in a rules-directory TOML file.
pub struct PatternRule {
    id: String,
    name: String,
    description: String,
    category: String,
    regex: Regex,
    message: String,
    severity: Severity,
}

impl PatternRule {
    /// Build a pattern rule from its definition file.
    pub fn from_definition(def: &RuleDefinition) -> Result<Self, RuleError> {
        let pattern = def
            .pattern
            .as_deref()
            .ok_or_else(|| RuleError::Definition(format!("rule {} has no pattern", def.id)))?;
        let regex = Regex::new(pattern)
            .map_err(|e| RuleError::Definition(format!("rule {}: {e}", def.id)))?;
        Ok(Self {
            id: def.id.clone(),
            name: def.name.clone().unwrap_or_else(|| def.id.clone()),
            description: def
                .description
                .clone()
                .unwrap_or_else(|| format!("Matches /{pattern}/")),
            category: def.category.clone(),
            message: def
                .message
                .clone()
                .unwrap_or_else(|| format!("Pattern /{pattern}/ matched")),
            regex,
            severity: def.severity,
        })
    }
}

impl Rule for PatternRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn check(&self, file_path: &Path, content: &str, _ast: &Ast) -> Result<Vec<Match>, RuleError> {
        let path = file_path.display().to_string();
        let mut matches = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            for found in self.regex.find_iter(line) {
                matches.push(Match::new(
                    self.id.as_str(),
                    path.as_str(),
                    self.message.as_str(),
                    (idx + 1) as u32,
                    found.start() as u32,
                    self.severity,
                ));
            }
        }
        Ok(matches)
    }
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
