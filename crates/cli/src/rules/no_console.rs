// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Flags `console.*` invocations.

use std::path::Path;

use crate::ast::{Ast, AstNode, node_start, node_type, visit_nodes};
use crate::rule::{Match, Rule, RuleError, Severity};

/// Reports every call through the global `console` object.
pub struct NoConsole;

/// The called console method name, if this node is a console call.
fn console_method(node: &AstNode) -> Option<&str> {
    if node_type(node) != Some("CallExpression") {
        return None;
    }
    let callee = node.get("callee")?.as_object()?;
    if node_type(callee) != Some("MemberExpression") {
        return None;
    }
    let object = callee.get("object")?.as_object()?;
    if node_type(object) != Some("Identifier")
        || object.get("name").and_then(Ast::as_str) != Some("console")
    {
        return None;
    }
    callee
        .get("property")
        .and_then(Ast::as_object)
        .and_then(|prop| prop.get("name"))
        .and_then(Ast::as_str)
}

impl Rule for NoConsole {
    fn id(&self) -> &str {
        "no-console"
    }

    fn name(&self) -> &str {
        "No console calls"
    }

    fn description(&self) -> &str {
        "Disallows console.* invocations left over from debugging"
    }

    fn category(&self) -> &str {
        "maintainability"
    }

    fn check(&self, file_path: &Path, _content: &str, ast: &Ast) -> Result<Vec<Match>, RuleError> {
        let path = file_path.display().to_string();
        let mut matches = Vec::new();
        visit_nodes(ast, &mut |node| {
            if let Some(method) = console_method(node) {
                let (line, column) = node_start(node).unwrap_or((1, 0));
                matches.push(Match::new(
                    self.id(),
                    path.as_str(),
                    format!("Unexpected console.{method} call"),
                    line,
                    column,
                    Severity::Warning,
                ));
            }
        });
        Ok(matches)
    }
}
