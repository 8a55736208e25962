//! Java symbol extraction.
//!
//! Recognizes class/interface/enum/record declarations, methods and
//! constructors, field declarators, and import/package declarations.

use std::path::Path;

use tree_sitter::Node;

use crate::parse::ParseResult;
use crate::symbols::{SymbolInfo, SymbolKind};

use super::helpers::{
    doc_comment_before, name_node, node_location, node_text, parameters_of, signature_of,
};

pub(super) fn symbol_for_node(node: Node, pr: &ParseResult, path: &Path) -> Option<SymbolInfo> {
    let kind = match node.kind() {
        "class_declaration" | "record_declaration" => SymbolKind::Class,
        "interface_declaration" => SymbolKind::Interface,
        "enum_declaration" => SymbolKind::Enum,
        "method_declaration" => SymbolKind::Method,
        "constructor_declaration" => SymbolKind::Constructor,
        "variable_declarator" => {
            // Only field declarators; locals are not declarations here.
            if node.parent().is_some_and(|p| p.kind() == "field_declaration") {
                SymbolKind::Field
            } else {
                return None;
            }
        }
        "import_declaration" => return import_symbol(node, pr, path),
        "package_declaration" => return package_symbol(node, pr, path),
        _ => return None,
    };

    let name = name_node(node, pr.lang)?;
    let mut sym = SymbolInfo::new(node_text(name, pr), kind, node_location(path, name));

    match kind {
        SymbolKind::Method | SymbolKind::Constructor => {
            sym = sym.with_parameters(parameters_of(node, pr, pr.lang));
            if let Some(sig) = signature_of(node, pr) {
                sym = sym.with_signature(sig);
            }
            if kind == SymbolKind::Method {
                if let Some(ret) = node.child_by_field_name("type") {
                    sym = sym.with_type(node_text(ret, pr));
                }
            }
            if let Some(doc) = doc_comment_before(node, pr) {
                sym = sym.with_documentation(doc);
            }
        }
        SymbolKind::Field => {
            let decl = node.parent().expect("checked above");
            if let Some(ty) = decl.child_by_field_name("type") {
                sym = sym.with_type(node_text(ty, pr));
            }
            if let Some(doc) = doc_comment_before(decl, pr) {
                sym = sym.with_documentation(doc);
            }
        }
        _ => {
            if let Some(doc) = doc_comment_before(node, pr) {
                sym = sym.with_documentation(doc);
            }
        }
    }
    Some(sym)
}

fn import_symbol(node: Node, pr: &ParseResult, path: &Path) -> Option<SymbolInfo> {
    let target = dotted_name(node)?;
    let mut name = node_text(target, pr).to_string();
    // `import a.b.*;` keeps the wildcard visible in the record.
    let text = node_text(node, pr);
    if text.contains(".*") && !name.ends_with(".*") {
        name.push_str(".*");
    }
    Some(SymbolInfo::new(
        name,
        SymbolKind::Import,
        node_location(path, target),
    ))
}

fn package_symbol(node: Node, pr: &ParseResult, path: &Path) -> Option<SymbolInfo> {
    let target = dotted_name(node)?;
    Some(SymbolInfo::new(
        node_text(target, pr),
        SymbolKind::Package,
        node_location(path, target),
    ))
}

fn dotted_name(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"));
    found
}
