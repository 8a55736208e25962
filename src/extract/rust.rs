//! Rust symbol extraction: functions, type items, traits, impl blocks and
//! constants.

use std::path::Path;

use tree_sitter::Node;

use crate::parse::ParseResult;
use crate::symbols::{SymbolInfo, SymbolKind};

use super::helpers::{
    doc_comment_before, node_location, node_text, parameters_of, signature_of,
};

pub(super) fn symbol_for_node(node: Node, pr: &ParseResult, path: &Path) -> Option<SymbolInfo> {
    let kind = match node.kind() {
        "function_item" => SymbolKind::Function,
        "struct_item" => SymbolKind::Struct,
        "enum_item" => SymbolKind::Enum,
        "trait_item" => SymbolKind::Trait,
        "impl_item" => return impl_symbol(node, pr, path),
        "const_item" | "static_item" => SymbolKind::Constant,
        _ => return None,
    };

    let name = node.child_by_field_name("name")?;
    let mut sym = SymbolInfo::new(node_text(name, pr), kind, node_location(path, name));

    if kind == SymbolKind::Function {
        sym = sym.with_parameters(parameters_of(node, pr, pr.lang));
        if let Some(ret) = node.child_by_field_name("return_type") {
            sym = sym.with_type(node_text(ret, pr));
        }
        if let Some(sig) = signature_of(node, pr) {
            sym = sym.with_signature(sig);
        }
    } else if kind == SymbolKind::Constant {
        if let Some(ty) = node.child_by_field_name("type") {
            sym = sym.with_type(node_text(ty, pr));
        }
    }
    if let Some(doc) = doc_comment_before(node, pr) {
        sym = sym.with_documentation(doc);
    }
    Some(sym)
}

/// An impl block is modeled as an object scope named after the implemented
/// type, so items inside it pick up the type as their parent.
fn impl_symbol(node: Node, pr: &ParseResult, path: &Path) -> Option<SymbolInfo> {
    let ty = node.child_by_field_name("type")?;
    let name = base_type_name(node_text(ty, pr));
    Some(SymbolInfo::new(
        name,
        SymbolKind::Object,
        node_location(path, ty),
    ))
}

fn base_type_name(raw: &str) -> String {
    let no_generics = match raw.find('<') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    no_generics
        .rsplit("::")
        .next()
        .unwrap_or(no_generics)
        .trim()
        .to_string()
}
