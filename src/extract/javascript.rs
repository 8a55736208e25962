//! JavaScript, TypeScript and TSX symbol extraction.
//!
//! Covers classes, methods, functions, arrow functions assigned to a
//! binding, and the TypeScript-only declaration forms (interfaces, enums,
//! property/method signatures, namespaces).

use std::path::Path;

use tree_sitter::Node;

use crate::parse::ParseResult;
use crate::symbols::{SymbolInfo, SymbolKind};

use super::helpers::{
    doc_comment_before, name_node, node_location, node_text, parameters_of, signature_of,
};

const FUNCTION_VALUE_KINDS: [&str; 4] = [
    "arrow_function",
    "function_expression",
    "function",
    "generator_function",
];

pub(super) fn symbol_for_node(node: Node, pr: &ParseResult, path: &Path) -> Option<SymbolInfo> {
    let kind = match node.kind() {
        "class_declaration" | "abstract_class_declaration" => SymbolKind::Class,
        "function_declaration" | "generator_function_declaration" => SymbolKind::Function,
        "method_definition" => SymbolKind::Method,
        "interface_declaration" => SymbolKind::Interface,
        "enum_declaration" => SymbolKind::Enum,
        "property_signature" => SymbolKind::Property,
        "method_signature" => SymbolKind::Method,
        "public_field_definition" | "field_definition" => SymbolKind::Field,
        "internal_module" => SymbolKind::Namespace,
        "variable_declarator" => classify_declarator(node)?,
        _ => return None,
    };

    let name = name_node(node, pr.lang)?;
    let mut sym = SymbolInfo::new(node_text(name, pr), kind, node_location(path, name));

    if matches!(kind, SymbolKind::Function | SymbolKind::Method) {
        let callable = if node.kind() == "variable_declarator" {
            node.child_by_field_name("value").unwrap_or(node)
        } else {
            node
        };
        sym = sym.with_parameters(parameters_of(callable, pr, pr.lang));
        if let Some(sig) = signature_of(node, pr) {
            sym = sym.with_signature(sig);
        }
    }

    // Doc comments attach to the statement, not the declarator.
    let doc_anchor = if node.kind() == "variable_declarator" {
        node.parent().unwrap_or(node)
    } else {
        node
    };
    if let Some(doc) = doc_comment_before(doc_anchor, pr) {
        sym = sym.with_documentation(doc);
    }
    Some(sym)
}

/// A declarator is a symbol when it binds a function value, or when it is a
/// top-level `const`.
fn classify_declarator(node: Node) -> Option<SymbolKind> {
    if let Some(value) = node.child_by_field_name("value") {
        if FUNCTION_VALUE_KINDS.contains(&value.kind()) {
            return Some(SymbolKind::Function);
        }
    }
    let parent = node.parent()?;
    if parent.kind() != "lexical_declaration" {
        return None;
    }
    let is_const = parent.child(0).is_some_and(|t| t.kind() == "const");
    let at_top = matches!(
        parent.parent().map(|p| p.kind()),
        Some("program") | Some("export_statement")
    );
    if is_const && at_top {
        Some(SymbolKind::Constant)
    } else {
        None
    }
}
