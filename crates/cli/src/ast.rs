// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque AST values.
//!
//! The engine never branches on AST shape itself; it hands values to rules
//! and to the cache. ASTs are plain JSON trees (object/array/string/number/
//! bool/null) exactly as the parser subprocess emitted them; object key
//! order is preserved. Rules that understand a specific parser's node
//! layout use the visitor here to scan for nodes of interest.

use serde_json::Map;

/// A parsed syntax tree, as returned by the parser subprocess.
pub type Ast = serde_json::Value;

/// Node map type inside an AST object.
pub type AstNode = Map<String, Ast>;

/// Visit every object node in the tree, preorder.
pub fn visit_nodes<'a>(ast: &'a Ast, visit: &mut dyn FnMut(&'a AstNode)) {
    let mut stack = vec![ast];
    while let Some(value) = stack.pop() {
        match value {
            Ast::Object(map) => {
                visit(map);
                for child in map.values() {
                    stack.push(child);
                }
            }
            Ast::Array(items) => {
                for child in items {
                    stack.push(child);
                }
            }
            _ => {}
        }
    }
}

/// The `type` tag of an ESTree-shaped node, if present.
pub fn node_type(node: &AstNode) -> Option<&str> {
    node.get("type").and_then(Ast::as_str)
}

/// Start position of an ESTree-shaped node: (1-based line, 0-based column).
pub fn node_start(node: &AstNode) -> Option<(u32, u32)> {
    let start = node.get("loc")?.get("start")?;
    let line = start.get("line")?.as_u64()?;
    let column = start.get("column")?.as_u64()?;
    Some((line as u32, column as u32))
}

#[cfg(test)]
#[path = "ast_tests.rs"]
mod tests;
