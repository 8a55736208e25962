//! PHP symbol extraction.

use std::path::Path;

use tree_sitter::Node;

use crate::parse::ParseResult;
use crate::symbols::{SymbolInfo, SymbolKind};

use super::helpers::{
    doc_comment_before, name_node, node_location, node_text, parameters_of, signature_of,
};

pub(super) fn symbol_for_node(node: Node, pr: &ParseResult, path: &Path) -> Option<SymbolInfo> {
    let kind = match node.kind() {
        "class_declaration" => SymbolKind::Class,
        "interface_declaration" => SymbolKind::Interface,
        "enum_declaration" => SymbolKind::Enum,
        "trait_declaration" => SymbolKind::Trait,
        "function_definition" => SymbolKind::Function,
        "method_declaration" => SymbolKind::Method,
        "property_declaration" => SymbolKind::Property,
        "const_declaration" => SymbolKind::Constant,
        "namespace_definition" => SymbolKind::Namespace,
        _ => return None,
    };

    let name = name_node(node, pr.lang)?;
    let text = node_text(name, pr).trim_start_matches('$').to_string();
    if text.is_empty() {
        return None;
    }
    let mut sym = SymbolInfo::new(text, kind, node_location(path, name));

    if matches!(kind, SymbolKind::Function | SymbolKind::Method) {
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
