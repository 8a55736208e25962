//! Kotlin symbol extraction: classes, objects, interfaces, functions and
//! properties.

use std::path::Path;

use tree_sitter::Node;

use crate::parse::ParseResult;
use crate::symbols::{SymbolInfo, SymbolKind};

use super::helpers::{
    doc_comment_before, name_node, node_location, node_text, parameters_of, signature_of,
};

pub(super) fn symbol_for_node(node: Node, pr: &ParseResult, path: &Path) -> Option<SymbolInfo> {
    let kind = match node.kind() {
        "class_declaration" => classify_class(node),
        "object_declaration" => SymbolKind::Object,
        "function_declaration" => SymbolKind::Function,
        "property_declaration" => SymbolKind::Property,
        "secondary_constructor" => SymbolKind::Constructor,
        _ => return None,
    };

    let name = name_node(node, pr.lang)?;
    let mut sym = SymbolInfo::new(node_text(name, pr), kind, node_location(path, name));

    if matches!(kind, SymbolKind::Function | SymbolKind::Constructor) {
        sym = sym.with_parameters(parameters_of(node, pr, pr.lang));
        if let Some(sig) = signature_of(node, pr) {
            sym = sym.with_signature(sig);
        }
    }
    if let Some(doc) = doc_comment_before(node, pr) {
        sym = sym.with_documentation(doc);
    }
    Some(sym)
}

/// `class_declaration` covers classes, interfaces and enum classes; the
/// distinguishing keyword appears as a leading token child.
fn classify_class(node: Node) -> SymbolKind {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "interface" => return SymbolKind::Interface,
            "enum" => return SymbolKind::Enum,
            _ => {}
        }
    }
    SymbolKind::Class
}
