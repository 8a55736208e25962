//! Go symbol extraction: functions, methods (receiver becomes the parent
//! scope) and type declarations.

use std::path::Path;

use tree_sitter::Node;

use crate::parse::ParseResult;
use crate::symbols::{SymbolInfo, SymbolKind};

use super::helpers::{
    doc_comment_before, node_location, node_text, parameters_of, signature_of,
};

pub(super) fn symbol_for_node(node: Node, pr: &ParseResult, path: &Path) -> Option<SymbolInfo> {
    match node.kind() {
        "function_declaration" => {
            let name = node.child_by_field_name("name")?;
            let mut sym = SymbolInfo::new(
                node_text(name, pr),
                SymbolKind::Function,
                node_location(path, name),
            )
            .with_parameters(parameters_of(node, pr, pr.lang));
            if let Some(sig) = signature_of(node, pr) {
                sym = sym.with_signature(sig);
            }
            if let Some(doc) = doc_comment_before(node, pr) {
                sym = sym.with_documentation(doc);
            }
            Some(sym)
        }
        "method_declaration" => {
            let name = node.child_by_field_name("name")?;
            let mut sym = SymbolInfo::new(
                node_text(name, pr),
                SymbolKind::Method,
                node_location(path, name),
            )
            .with_parameters(parameters_of(node, pr, pr.lang));
            if let Some(receiver) = receiver_type(node, pr) {
                sym = sym.with_parent(receiver);
            }
            if let Some(sig) = signature_of(node, pr) {
                sym = sym.with_signature(sig);
            }
            if let Some(doc) = doc_comment_before(node, pr) {
                sym = sym.with_documentation(doc);
            }
            Some(sym)
        }
        "type_spec" => {
            let name = node.child_by_field_name("name")?;
            let kind = match node.child_by_field_name("type").map(|t| t.kind()) {
                Some("struct_type") => SymbolKind::Struct,
                Some("interface_type") => SymbolKind::Interface,
                _ => SymbolKind::Class,
            };
            let mut sym =
                SymbolInfo::new(node_text(name, pr), kind, node_location(path, name));
            let doc_anchor = node.parent().filter(|p| p.kind() == "type_declaration");
            if let Some(doc) = doc_comment_before(doc_anchor.unwrap_or(node), pr) {
                sym = sym.with_documentation(doc);
            }
            Some(sym)
        }
        _ => None,
    }
}

/// The receiver's base type name, pointer stripped: `(s *Server)` → `Server`.
fn receiver_type(node: Node, pr: &ParseResult) -> Option<String> {
    let receiver = node.child_by_field_name("receiver")?;
    let mut cursor = receiver.walk();
    let decl = receiver
        .children(&mut cursor)
        .find(|c| c.kind() == "parameter_declaration")?;
    let ty = decl.child_by_field_name("type")?;
    let text = node_text(ty, pr).trim_start_matches('*').trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
