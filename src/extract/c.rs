//! C and C++ symbol extraction: functions, type specifiers with bodies,
//! file-scope declarations and (C++) namespaces.

use std::path::Path;

use tree_sitter::Node;

use crate::parse::ParseResult;
use crate::symbols::{SymbolInfo, SymbolKind};

use super::helpers::{
    doc_comment_before, first_identifier, node_location, node_text, parameters_of, signature_of,
};

pub(super) fn symbol_for_node(node: Node, pr: &ParseResult, path: &Path) -> Option<SymbolInfo> {
    match node.kind() {
        "function_definition" => function_symbol(node, pr, path),
        "struct_specifier" | "union_specifier" => {
            named_specifier(node, pr, path, SymbolKind::Struct)
        }
        "class_specifier" => named_specifier(node, pr, path, SymbolKind::Class),
        "enum_specifier" => named_specifier(node, pr, path, SymbolKind::Enum),
        "namespace_definition" => {
            let name = node.child_by_field_name("name")?;
            Some(SymbolInfo::new(
                node_text(name, pr),
                SymbolKind::Namespace,
                node_location(path, name),
            ))
        }
        "declaration" => file_scope_variable(node, pr, path),
        _ => None,
    }
}

fn function_symbol(node: Node, pr: &ParseResult, path: &Path) -> Option<SymbolInfo> {
    let declarator = node.child_by_field_name("declarator")?;
    let fn_decl = find_function_declarator(declarator)?;
    let name = fn_decl
        .child_by_field_name("declarator")
        .and_then(last_identifier)?;
    let kind = if inside_type_body(node) {
        SymbolKind::Method
    } else {
        SymbolKind::Function
    };
    let mut sym = SymbolInfo::new(node_text(name, pr), kind, node_location(path, name))
        .with_parameters(parameters_of(fn_decl, pr, pr.lang));
    if let Some(ty) = node.child_by_field_name("type") {
        sym = sym.with_type(node_text(ty, pr));
    }
    if let Some(sig) = signature_of(node, pr) {
        sym = sym.with_signature(sig);
    }
    if let Some(doc) = doc_comment_before(node, pr) {
        sym = sym.with_documentation(doc);
    }
    Some(sym)
}

fn named_specifier(
    node: Node,
    pr: &ParseResult,
    path: &Path,
    kind: SymbolKind,
) -> Option<SymbolInfo> {
    // Without a body this is a forward declaration or a type usage.
    node.child_by_field_name("body")?;
    let name = node.child_by_field_name("name")?;
    let mut sym = SymbolInfo::new(node_text(name, pr), kind, node_location(path, name));
    if let Some(doc) = doc_comment_before(node, pr) {
        sym = sym.with_documentation(doc);
    }
    Some(sym)
}

/// File-scope `declaration` nodes with a plain declarator become variables;
/// prototypes are skipped.
fn file_scope_variable(node: Node, pr: &ParseResult, path: &Path) -> Option<SymbolInfo> {
    if !node.parent().is_some_and(|p| p.kind() == "translation_unit") {
        return None;
    }
    let declarator = node.child_by_field_name("declarator")?;
    if find_function_declarator(declarator).is_some() {
        return None;
    }
    let name = first_identifier(declarator, pr.lang)?;
    let mut sym = SymbolInfo::new(
        node_text(name, pr),
        SymbolKind::Variable,
        node_location(path, name),
    );
    if let Some(ty) = node.child_by_field_name("type") {
        sym = sym.with_type(node_text(ty, pr));
    }
    Some(sym)
}

fn find_function_declarator(node: Node) -> Option<Node> {
    if node.kind() == "function_declarator" {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = find_function_declarator(child) {
            return Some(found);
        }
    }
    None
}

/// The last identifier wins so `A::b` names `b`, not `A`.
fn last_identifier(node: Node<'_>) -> Option<Node<'_>> {
    let mut result = None;
    collect_last(node, &mut result);
    result
}

fn collect_last<'t>(node: Node<'t>, out: &mut Option<Node<'t>>) {
    if matches!(
        node.kind(),
        "identifier" | "field_identifier" | "type_identifier" | "destructor_name"
    ) {
        *out = Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_last(child, out);
    }
}

fn inside_type_body(node: Node) -> bool {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        match ancestor.kind() {
            "class_specifier" | "struct_specifier" => return true,
            "function_definition" => return false,
            _ => {}
        }
        current = ancestor.parent();
    }
    false
}
