// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Rule registry and loader.
//!
//! The registry maps rule ids to instances and preserves registration
//! order. The loader populates it before analysis begins: built-in rules
//! first, then pattern rules defined by `*.toml` files in the rules
//! directory. The registry is frozen (behind `Arc`) for the duration of
//! a run.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::rule::{Rule, Severity};
use crate::rules;
use crate::rules::pattern::PatternRule;

/// Ordered collection of active rules.
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Arc<dyn Rule>>,
    ids: HashMap<String, usize>,
}

impl RuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule. Fails on an empty or duplicate id.
    pub fn register(&mut self, rule: Arc<dyn Rule>) -> Result<()> {
        let id = rule.id().to_string();
        if id.is_empty() {
            return Err(Error::Rule("rule id must not be empty".to_string()));
        }
        if self.ids.contains_key(&id) {
            return Err(Error::Rule(format!("duplicate rule id: {id}")));
        }
        self.ids.insert(id, self.rules.len());
        self.rules.push(rule);
        Ok(())
    }

    /// All rules in registration order.
    pub fn all_rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    /// Look up a rule by id.
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Rule>> {
        self.ids.get(id).map(|&idx| &self.rules[idx])
    }

    /// Whether a rule with this id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the registry has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A rule definition file (`<rules_dir>/*.toml`).
///
/// With a `pattern`, defines a regex rule. Without one, toggles the
/// built-in rule of the same id via `enabled`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    /// Rule id; must be unique across built-ins and definitions.
    pub id: String,

    /// Human-readable name (defaults to the id).
    #[serde(default)]
    pub name: Option<String>,

    /// Description for reports.
    #[serde(default)]
    pub description: Option<String>,

    /// Category grouping.
    #[serde(default = "default_category")]
    pub category: String,

    /// Regex applied line-by-line to file content.
    #[serde(default)]
    pub pattern: Option<String>,

    /// Message emitted per occurrence (defaults to the pattern).
    #[serde(default)]
    pub message: Option<String>,

    /// Severity of emitted matches.
    #[serde(default = "default_severity")]
    pub severity: Severity,

    /// Set false to disable this rule.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_category() -> String {
    "custom".to_string()
}

fn default_severity() -> Severity {
    Severity::Warning
}

fn default_enabled() -> bool {
    true
}

/// Build the frozen registry for a run: built-ins plus `rules_dir` definitions.
pub fn load_rules(rules_dir: Option<&Path>) -> Result<RuleRegistry> {
    let definitions = match rules_dir {
        Some(dir) => read_definitions(dir)?,
        None => Vec::new(),
    };

    let disabled: Vec<&str> = definitions
        .iter()
        .filter(|def| !def.enabled)
        .map(|def| def.id.as_str())
        .collect();

    let mut registry = RuleRegistry::new();
    for rule in rules::builtin_rules() {
        if disabled.contains(&rule.id()) {
            tracing::debug!("built-in rule disabled by config: {}", rule.id());
            continue;
        }
        registry.register(rule)?;
    }

    for def in &definitions {
        if !def.enabled || def.pattern.is_none() {
            continue;
        }
        let rule = PatternRule::from_definition(def).map_err(|e| Error::Rule(e.to_string()))?;
        registry.register(Arc::new(rule))?;
    }

    tracing::info!("loaded {} rules", registry.len());
    Ok(registry)
}

/// Read every `*.toml` in the rules directory, sorted by file name so
/// registration order is stable.
fn read_definitions(dir: &Path) -> Result<Vec<RuleDefinition>> {
    if !dir.is_dir() {
        return Err(Error::Config {
            message: format!("rules directory does not exist: {}", dir.display()),
            path: None,
        });
    }

    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| Error::Io {
            path: dir.to_path_buf(),
            source: e,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    let mut definitions = Vec::with_capacity(paths.len());
    for path in paths {
        let content = std::fs::read_to_string(&path).map_err(|e| Error::Io {
            path: path.clone(),
            source: e,
        })?;
        let def: RuleDefinition = toml::from_str(&content).map_err(|e| Error::Rule(format!(
            "bad rule definition {}: {e}",
            path.display()
        )))?;
        definitions.push(def);
    }
    Ok(definitions)
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
