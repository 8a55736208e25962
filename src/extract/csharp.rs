//! C# symbol extraction.

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
        "struct_declaration" => SymbolKind::Struct,
        "method_declaration" => SymbolKind::Method,
        "constructor_declaration" => SymbolKind::Constructor,
        "property_declaration" => SymbolKind::Property,
        "namespace_declaration" => SymbolKind::Namespace,
        "event_field_declaration" => SymbolKind::Event,
        "variable_declarator" => {
            let in_field = node
                .parent()
                .and_then(|p| p.parent())
                .is_some_and(|gp| gp.kind() == "field_declaration");
            if in_field {
                SymbolKind::Field
            } else {
                return None;
            }
        }
        _ => return None,
    };

    let name = name_node(node, pr.lang)?;
    let mut sym = SymbolInfo::new(node_text(name, pr), kind, node_location(path, name));

    if matches!(kind, SymbolKind::Method | SymbolKind::Constructor) {
        sym = sym.with_parameters(parameters_of(node, pr, pr.lang));
        if let Some(ret) = node.child_by_field_name("returns").or_else(|| node.child_by_field_name("type")) {
            sym = sym.with_type(node_text(ret, pr));
        }
        if let Some(sig) = signature_of(node, pr) {
            sym = sym.with_signature(sig);
        }
    }
    if let Some(doc) = doc_comment_before(node, pr) {
        sym = sym.with_documentation(doc);
    }
    Some(sym)
}
