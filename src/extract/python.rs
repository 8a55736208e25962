//! Python symbol extraction: functions, classes, and module/class-level
//! assignments.

use std::path::Path;

use tree_sitter::Node;

use crate::parse::ParseResult;
use crate::symbols::{SymbolInfo, SymbolKind};

use super::helpers::{
    doc_comment_before, node_location, node_text, parameters_of, signature_of,
};

pub(super) fn symbol_for_node(node: Node, pr: &ParseResult, path: &Path) -> Option<SymbolInfo> {
    match node.kind() {
        "function_definition" | "async_function_definition" => {
            let name = node.child_by_field_name("name")?;
            let kind = if inside_class(node) {
                SymbolKind::Method
            } else {
                SymbolKind::Function
            };
            let mut sym =
                SymbolInfo::new(node_text(name, pr), kind, node_location(path, name))
                    .with_parameters(parameters_of(node, pr, pr.lang));
            if let Some(sig) = signature_of(node, pr) {
                sym = sym.with_signature(sig);
            }
            if let Some(doc) = docstring(node, pr).or_else(|| doc_comment_before(node, pr)) {
                sym = sym.with_documentation(doc);
            }
            Some(sym)
        }
        "class_definition" => {
            let name = node.child_by_field_name("name")?;
            let mut sym = SymbolInfo::new(
                node_text(name, pr),
                SymbolKind::Class,
                node_location(path, name),
            );
            if let Some(doc) = docstring(node, pr).or_else(|| doc_comment_before(node, pr)) {
                sym = sym.with_documentation(doc);
            }
            Some(sym)
        }
        "assignment" => assignment_symbol(node, pr, path),
        _ => None,
    }
}

fn inside_class(node: Node) -> bool {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        match ancestor.kind() {
            "class_definition" => return true,
            "function_definition" | "async_function_definition" => return false,
            _ => {}
        }
        current = ancestor.parent();
    }
    false
}

/// Assignments directly at module top become constants/variables; at class
/// body top they become fields. Anything deeper is a plain local.
fn assignment_symbol(node: Node, pr: &ParseResult, path: &Path) -> Option<SymbolInfo> {
    let left = node.child_by_field_name("left")?;
    if left.kind() != "identifier" {
        return None;
    }
    let stmt = node.parent()?;
    if stmt.kind() != "expression_statement" {
        return None;
    }
    let scope = stmt.parent()?;
    let kind = match scope.kind() {
        "module" => {
            let text = node_text(left, pr);
            if text.chars().all(|c| !c.is_ascii_lowercase()) {
                SymbolKind::Constant
            } else {
                SymbolKind::Variable
            }
        }
        "block" if scope.parent().is_some_and(|p| p.kind() == "class_definition") => {
            SymbolKind::Field
        }
        _ => return None,
    };
    let mut sym = SymbolInfo::new(node_text(left, pr), kind, node_location(path, left));
    if let Some(ty) = node.child_by_field_name("type") {
        sym = sym.with_type(node_text(ty, pr));
    }
    Some(sym)
}

/// The leading string expression of a body, PEP-257 style.
fn docstring(node: Node, pr: &ParseResult) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.named_child(0)?;
    if expr.kind() != "string" {
        return None;
    }
    let raw = node_text(expr, pr);
    let stripped = raw
        .trim_start_matches(['r', 'b', 'f', 'u', 'R', 'B', 'F', 'U'])
        .trim_start_matches("\"\"\"")
        .trim_end_matches("\"\"\"")
        .trim_start_matches("'''")
        .trim_end_matches("'''")
        .trim_matches('"')
        .trim_matches('\'')
        .trim();
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}
