//! Helpers shared by the per-language extractors.

use std::path::Path;

use tree_sitter::Node;

use crate::lang::LanguageId;
use crate::parse::ParseResult;
use crate::symbols::{Location, ParameterInfo};

/// Node kinds that count as identifier occurrences per language.
pub fn identifier_kinds(lang: LanguageId) -> &'static [&'static str] {
    match lang {
        LanguageId::Java => &["identifier", "type_identifier"],
        LanguageId::Kotlin => &["simple_identifier", "type_identifier", "identifier"],
        LanguageId::JavaScript => &[
            "identifier",
            "property_identifier",
            "shorthand_property_identifier",
            "shorthand_property_identifier_pattern",
        ],
        LanguageId::TypeScript | LanguageId::Tsx => &[
            "identifier",
            "property_identifier",
            "type_identifier",
            "shorthand_property_identifier",
            "shorthand_property_identifier_pattern",
        ],
        LanguageId::Python => &["identifier"],
        LanguageId::Go => &[
            "identifier",
            "type_identifier",
            "field_identifier",
            "package_identifier",
        ],
        LanguageId::Rust => &["identifier", "type_identifier", "field_identifier"],
        LanguageId::C => &["identifier", "type_identifier", "field_identifier"],
        LanguageId::Cpp => &[
            "identifier",
            "type_identifier",
            "field_identifier",
            "namespace_identifier",
        ],
        LanguageId::CSharp => &["identifier"],
        LanguageId::Php => &["name", "variable_name"],
        LanguageId::Html => &["attribute_value"],
    }
}

/// Ancestor kinds that mark an identifier as part of an import/package
/// clause rather than a reference.
pub fn import_kinds(lang: LanguageId) -> &'static [&'static str] {
    match lang {
        LanguageId::Java => &["import_declaration", "package_declaration"],
        LanguageId::Kotlin => &["import_header", "package_header"],
        LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Tsx => {
            &["import_statement", "namespace_import"]
        }
        LanguageId::Python => &["import_statement", "import_from_statement"],
        LanguageId::Go => &["import_declaration", "import_spec"],
        LanguageId::Rust => &["use_declaration"],
        LanguageId::C | LanguageId::Cpp => &["preproc_include"],
        LanguageId::CSharp => &["using_directive"],
        LanguageId::Php => &["namespace_use_declaration"],
        LanguageId::Html => &[],
    }
}

/// Convert a node's span to a 1-based `Location`.
pub fn node_location(path: &Path, node: Node) -> Location {
    let start = node.start_position();
    let end = node.end_position();
    Location::new(
        path,
        start.row as u32 + 1,
        start.column as u32 + 1,
        end.row as u32 + 1,
        end.column as u32 + 1,
    )
}

/// The UTF-8 text a node spans.
pub fn node_text<'a>(node: Node, pr: &'a ParseResult) -> &'a str {
    node.utf8_text(pr.content.as_bytes()).unwrap_or("")
}

/// The `name` field of a node, falling back to the first child (recursing
/// one level into declarator-style wrappers) whose kind is identifier-like.
pub fn name_node<'t>(node: Node<'t>, lang: LanguageId) -> Option<Node<'t>> {
    if let Some(named) = node.child_by_field_name("name") {
        if identifier_kinds(lang).contains(&named.kind()) {
            return Some(named);
        }
        // e.g. PHP wraps `$x` in variable_name(name)
        if let Some(inner) = first_identifier(named, lang) {
            return Some(inner);
        }
        return Some(named);
    }
    first_identifier(node, lang)
}

/// Depth-first search for the first identifier-like descendant.
pub fn first_identifier<'t>(node: Node<'t>, lang: LanguageId) -> Option<Node<'t>> {
    let kinds = identifier_kinds(lang);
    if kinds.contains(&node.kind()) {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_identifier(child, lang) {
            return Some(found);
        }
    }
    None
}

const COMMENT_KINDS: [&str; 4] = ["comment", "block_comment", "line_comment", "doc_comment"];
const MAX_DOC_GAP: usize = 2;

/// Collect the documentation comment preceding a definition: the nearest
/// prior sibling comment(s) within a two-line gap, markers stripped.
pub fn doc_comment_before(node: Node, pr: &ParseResult) -> Option<String> {
    let mut pieces: Vec<String> = Vec::new();
    let mut boundary_row = node.start_position().row;
    let mut current = node.prev_sibling();
    while let Some(sibling) = current {
        if !COMMENT_KINDS.contains(&sibling.kind()) {
            break;
        }
        let end_row = sibling.end_position().row;
        if boundary_row.saturating_sub(end_row) > MAX_DOC_GAP {
            break;
        }
        pieces.push(strip_comment_markers(node_text(sibling, pr)));
        boundary_row = sibling.start_position().row;
        current = sibling.prev_sibling();
    }
    if pieces.is_empty() {
        return None;
    }
    pieces.reverse();
    let joined = pieces.join("\n").trim().to_string();
    if joined.is_empty() { None } else { Some(joined) }
}

/// Strip comment markers: `/** */`, `/* */`, `//`, `#`, leading `*`.
pub fn strip_comment_markers(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(stripped) = text.strip_prefix("/**") {
        text = stripped;
    } else if let Some(stripped) = text.strip_prefix("/*") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_suffix("*/") {
        text = stripped;
    }
    let lines: Vec<String> = text
        .lines()
        .map(|line| {
            let mut l = line.trim();
            l = l.strip_prefix("///").unwrap_or(l);
            l = l.strip_prefix("//!").unwrap_or(l);
            l = l.strip_prefix("//").unwrap_or(l);
            l = l.strip_prefix('#').unwrap_or(l);
            l = l.strip_prefix('*').unwrap_or(l);
            l.trim().to_string()
        })
        .collect();
    lines.join("\n").trim().to_string()
}

const PARAM_LIST_KINDS: [&str; 6] = [
    "formal_parameters",
    "parameters",
    "parameter_list",
    "function_value_parameters",
    "parameter_clause",
    "lambda_parameters",
];

const PARAM_KINDS: [&str; 13] = [
    "formal_parameter",
    "spread_parameter",
    "parameter",
    "typed_parameter",
    "default_parameter",
    "typed_default_parameter",
    "parameter_declaration",
    "variadic_parameter",
    "variadic_parameter_declaration",
    "required_parameter",
    "optional_parameter",
    "simple_parameter",
    "property_promotion_parameter",
];

const VARARG_KINDS: [&str; 5] = [
    "spread_parameter",
    "list_splat_pattern",
    "dictionary_splat_pattern",
    "variadic_parameter",
    "variadic_parameter_declaration",
];

/// Extract parameter records from a callable definition node.
pub fn parameters_of(node: Node, pr: &ParseResult, lang: LanguageId) -> Vec<ParameterInfo> {
    let list = node.child_by_field_name("parameters").or_else(|| {
        let mut cursor = node.walk();
        let found = node
            .children(&mut cursor)
            .find(|c| PARAM_LIST_KINDS.contains(&c.kind()));
        found
    });
    let Some(list) = list else {
        return Vec::new();
    };
    let mut params = Vec::new();
    let mut cursor = list.walk();
    for child in list.children(&mut cursor) {
        let kind = child.kind();
        let is_splat = VARARG_KINDS.contains(&kind);
        if !PARAM_KINDS.contains(&kind)
            && !is_splat
            && !identifier_kinds(lang).contains(&kind)
        {
            continue;
        }
        let name = match param_name_node(child, lang) {
            Some(n) => node_text(n, pr).to_string(),
            None => continue,
        };
        if name.is_empty() || name == "self" || name == "this" {
            continue;
        }
        let type_name = child
            .child_by_field_name("type")
            .map(|t| node_text(t, pr).to_string());
        let text = node_text(child, pr);
        let is_varargs = is_splat
            || text.contains("...")
            || text.starts_with('*')
            || type_name.as_deref().is_some_and(|t| t.ends_with("..."));
        params.push(ParameterInfo::new(name, type_name, is_varargs));
    }
    params
}

/// The binding identifier of a parameter. Unlike [`name_node`], this never
/// falls back to a type identifier, so `String... parts` names `parts`.
fn param_name_node<'t>(node: Node<'t>, lang: LanguageId) -> Option<Node<'t>> {
    if let Some(named) = node.child_by_field_name("name") {
        if !matches!(named.kind(), "type_identifier") {
            return Some(named);
        }
    }
    let binding_kinds: &[&str] = match lang {
        LanguageId::Kotlin => &["simple_identifier"],
        LanguageId::Php => &["variable_name"],
        _ => &["identifier", "field_identifier"],
    };
    find_first_of(node, binding_kinds)
}

fn find_first_of<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    if kinds.contains(&node.kind()) {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = find_first_of(child, kinds) {
            return Some(found);
        }
    }
    None
}

/// A compact one-line signature: the definition's header up to its body.
pub fn signature_of(node: Node, pr: &ParseResult) -> Option<String> {
    let end = node
        .child_by_field_name("body")
        .map(|b| b.start_byte())
        .unwrap_or_else(|| node.end_byte());
    let start = node.start_byte();
    if end <= start {
        return None;
    }
    let raw = pr.content.as_bytes().get(start..end)?;
    let text = std::str::from_utf8(raw).ok()?;
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim().trim_end_matches('{').trim().to_string();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markers_javadoc() {
        let doc = "/**\n * Adds two numbers.\n * @param x left\n */";
        let stripped = strip_comment_markers(doc);
        assert!(stripped.starts_with("Adds two numbers."));
        assert!(stripped.contains("@param x left"));
        assert!(!stripped.contains("/**"));
    }

    #[test]
    fn test_strip_markers_line_comments() {
        assert_eq!(strip_comment_markers("// a counter"), "a counter");
        assert_eq!(strip_comment_markers("# a counter"), "a counter");
    }
}
