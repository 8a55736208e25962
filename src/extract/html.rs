//! HTML outline extraction: elements carrying an `id` attribute.

use std::path::Path;

use tree_sitter::Node;

use crate::parse::ParseResult;
use crate::symbols::{SymbolInfo, SymbolKind};

use super::helpers::{node_location, node_text};

pub(super) fn symbol_for_node(node: Node, pr: &ParseResult, path: &Path) -> Option<SymbolInfo> {
    if !matches!(node.kind(), "start_tag" | "self_closing_tag") {
        return None;
    }
    let mut tag_name = None;
    let mut id_value = None;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "tag_name" => tag_name = Some(node_text(child, pr).to_string()),
            "attribute" => {
                let mut attr_cursor = child.walk();
                let mut key = None;
                let mut value = None;
                for part in child.children(&mut attr_cursor) {
                    match part.kind() {
                        "attribute_name" => key = Some(node_text(part, pr)),
                        "quoted_attribute_value" => {
                            value = part
                                .named_child(0)
                                .map(|v| (node_text(v, pr).to_string(), v));
                        }
                        "attribute_value" => {
                            value = Some((node_text(part, pr).to_string(), part));
                        }
                        _ => {}
                    }
                }
                if key == Some("id") {
                    id_value = value;
                }
            }
            _ => {}
        }
    }
    let (id, value_node) = id_value?;
    let tag = tag_name.unwrap_or_else(|| "element".to_string());
    Some(
        SymbolInfo::new(id, SymbolKind::Object, node_location(path, value_node))
            .with_type(tag),
    )
}
