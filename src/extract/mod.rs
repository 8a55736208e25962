//! Symbol extraction: language-dispatched traversal of parse trees.
//!
//! Each supported language contributes a visitor that recognizes its fixed
//! set of definition node types; the generic driver here walks the tree,
//! asks the visitor about every node, and enriches the produced records with
//! documentation, parameters and the enclosing scope.

mod c;
mod csharp;
mod go;
pub(crate) mod helpers;
mod html;
mod java;
mod javascript;
mod kotlin;
mod php;
mod python;
mod rust;

use std::path::Path;

use tree_sitter::{Node, Point};

use crate::lang::LanguageId;
use crate::parse::ParseResult;
use crate::symbols::{Location, SymbolInfo, SymbolKind};

use helpers::{identifier_kinds, import_kinds, node_location, node_text};

/// Produce the symbol record for a single node, if the node is a recognized
/// definition in its language.
fn symbol_for_node(node: Node, pr: &ParseResult, path: &Path) -> Option<SymbolInfo> {
    match pr.lang {
        LanguageId::Java => java::symbol_for_node(node, pr, path),
        LanguageId::Kotlin => kotlin::symbol_for_node(node, pr, path),
        LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Tsx => {
            javascript::symbol_for_node(node, pr, path)
        }
        LanguageId::Python => python::symbol_for_node(node, pr, path),
        LanguageId::Go => go::symbol_for_node(node, pr, path),
        LanguageId::Rust => rust::symbol_for_node(node, pr, path),
        LanguageId::C | LanguageId::Cpp => c::symbol_for_node(node, pr, path),
        LanguageId::CSharp => csharp::symbol_for_node(node, pr, path),
        LanguageId::Php => php::symbol_for_node(node, pr, path),
        LanguageId::Html => html::symbol_for_node(node, pr, path),
    }
}

/// Enumerate all definitions in a parsed file, in source order.
pub fn extract_definitions(pr: &ParseResult, path: &Path) -> Vec<SymbolInfo> {
    let mut out = Vec::new();
    visit(pr.tree.root_node(), pr, path, &mut out);
    out
}

fn visit(node: Node, pr: &ParseResult, path: &Path, out: &mut Vec<SymbolInfo>) {
    if let Some(mut sym) = symbol_for_node(node, pr, path) {
        if sym.parent_name.is_none() {
            if let Some(parent) = enclosing_parent_name(node, pr, path) {
                sym.parent_name = Some(parent);
            }
        }
        out.push(sym);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, pr, path, out);
    }
}

/// The name of the nearest enclosing container definition (class, object,
/// module and friends).
fn enclosing_parent_name(node: Node, pr: &ParseResult, path: &Path) -> Option<String> {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if let Some(sym) = symbol_for_node(ancestor, pr, path) {
            if is_container(sym.kind) {
                return Some(sym.name);
            }
        }
        current = ancestor.parent();
    }
    None
}

fn is_container(kind: SymbolKind) -> bool {
    matches!(
        kind,
        SymbolKind::Class
            | SymbolKind::Interface
            | SymbolKind::Enum
            | SymbolKind::Struct
            | SymbolKind::Trait
            | SymbolKind::Object
            | SymbolKind::Module
            | SymbolKind::Namespace
    )
}

/// Find every reference to `name`: identifier occurrences that are not the
/// defining occurrence and not part of an import clause. Sorted and
/// deduplicated.
pub fn find_references(pr: &ParseResult, path: &Path, name: &str) -> Vec<Location> {
    let mut out = Vec::new();
    collect_references(pr.tree.root_node(), pr, path, name, &mut out);
    out.sort();
    out.dedup();
    out
}

fn collect_references(
    node: Node,
    pr: &ParseResult,
    path: &Path,
    name: &str,
    out: &mut Vec<Location>,
) {
    if identifier_kinds(pr.lang).contains(&node.kind())
        && node_text(node, pr) == name
        && !is_defining_occurrence(node, pr, path)
        && !in_import(node, pr.lang)
    {
        out.push(node_location(path, node));
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_references(child, pr, path, name, out);
    }
}

/// Whether this identifier is the naming occurrence of a definition (the
/// `Foo` in `class Foo`, the `bar` in `void bar()`).
fn is_defining_occurrence(node: Node, pr: &ParseResult, path: &Path) -> bool {
    let here = node_location(path, node);
    let mut current = node.parent();
    // Declarator-style grammars put the definition a few levels up.
    for _ in 0..4 {
        let Some(ancestor) = current else { break };
        if let Some(sym) = symbol_for_node(ancestor, pr, path) {
            if sym.location == here {
                return true;
            }
        }
        current = ancestor.parent();
    }
    false
}

fn in_import(node: Node, lang: LanguageId) -> bool {
    let kinds = import_kinds(lang);
    if kinds.is_empty() {
        return false;
    }
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if kinds.contains(&ancestor.kind()) {
            return true;
        }
        current = ancestor.parent();
    }
    false
}

/// The symbol at an exact 1-based position: the full definition record when
/// the position names a definition, otherwise a bare reference record.
pub fn symbol_at_position(
    pr: &ParseResult,
    path: &Path,
    line: u32,
    column: u32,
) -> Option<SymbolInfo> {
    if line == 0 || column == 0 {
        return None;
    }
    let point = Point {
        row: line as usize - 1,
        column: column as usize - 1,
    };
    let node = pr
        .tree
        .root_node()
        .named_descendant_for_point_range(point, point)?;
    if !identifier_kinds(pr.lang).contains(&node.kind()) {
        return None;
    }
    let name = node_text(node, pr).to_string();
    let here = node_location(path, node);
    let defs = extract_definitions(pr, path);
    if let Some(def) = defs.into_iter().find(|d| d.location == here) {
        return Some(def);
    }
    Some(SymbolInfo::new(name, SymbolKind::Reference, here))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::ParseCache;

    fn parse(path: &str, source: &str) -> ParseResult {
        ParseCache::new()
            .parse_with_content(Path::new(path), source)
            .unwrap()
    }

    #[test]
    fn test_java_class_and_method() {
        let pr = parse(
            "/tmp/Foo.java",
            "package a;\npublic class Foo { public int bar(int x) { return x; } }\n",
        );
        let defs = extract_definitions(&pr, Path::new("/tmp/Foo.java"));
        let class = defs.iter().find(|d| d.name == "Foo").unwrap();
        assert_eq!(class.kind, SymbolKind::Class);
        assert_eq!(class.location.start_line, 2);

        let method = defs.iter().find(|d| d.name == "bar").unwrap();
        assert_eq!(method.kind, SymbolKind::Method);
        assert_eq!(method.parent_name.as_deref(), Some("Foo"));
        assert_eq!(method.location.start_line, 2);
        let params = method.parameters.as_deref().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "x");
        assert_eq!(params[0].type_name.as_deref(), Some("int"));
        assert!(!params[0].is_varargs);
    }

    #[test]
    fn test_java_varargs_and_docs() {
        let source = "public class A {\n    /** Joins parts. */\n    String join(String... parts) { return \"\"; }\n}\n";
        let pr = parse("/tmp/A.java", source);
        let defs = extract_definitions(&pr, Path::new("/tmp/A.java"));
        let join = defs.iter().find(|d| d.name == "join").unwrap();
        let params = join.parameters.as_deref().unwrap();
        assert!(params[0].is_varargs);
        assert_eq!(join.documentation.as_deref(), Some("Joins parts."));
    }

    #[test]
    fn test_python_function_parameters() {
        let pr = parse(
            "/tmp/g.py",
            "def greet(name, greeting=\"Hello\"):\n    return greeting + name\n",
        );
        let defs = extract_definitions(&pr, Path::new("/tmp/g.py"));
        let greet = defs.iter().find(|d| d.name == "greet").unwrap();
        assert_eq!(greet.kind, SymbolKind::Function);
        let params = greet.parameters.as_deref().unwrap();
        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "greeting"]);
    }

    #[test]
    fn test_references_exclude_definition() {
        let source = "public class Foo {\n    int x = 1;\n    int get() { return x + x; }\n}\n";
        let pr = parse("/tmp/Foo.java", source);
        let refs = find_references(&pr, Path::new("/tmp/Foo.java"), "x");
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|r| r.start_line == 3));
    }

    #[test]
    fn test_references_exclude_imports() {
        let source = "import java.util.List;\nclass B { List<?> xs; }\n";
        let pr = parse("/tmp/B.java", source);
        let refs = find_references(&pr, Path::new("/tmp/B.java"), "List");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].start_line, 2);
    }

    #[test]
    fn test_rust_definitions() {
        let source = "pub struct Point { x: i32 }\n\nimpl Point {\n    pub fn x(&self) -> i32 { self.x }\n}\n\nconst MAX: i32 = 10;\n";
        let pr = parse("/tmp/p.rs", source);
        let defs = extract_definitions(&pr, Path::new("/tmp/p.rs"));
        assert!(defs.iter().any(|d| d.name == "Point" && d.kind == SymbolKind::Struct));
        assert!(defs.iter().any(|d| d.name == "MAX" && d.kind == SymbolKind::Constant));
        let method = defs
            .iter()
            .find(|d| d.name == "x" && d.kind == SymbolKind::Function)
            .unwrap();
        assert_eq!(method.parent_name.as_deref(), Some("Point"));
    }

    #[test]
    fn test_go_method_receiver_parent() {
        let source = "package main\n\ntype Server struct {}\n\nfunc (s *Server) Start() error { return nil }\n";
        let pr = parse("/tmp/s.go", source);
        let defs = extract_definitions(&pr, Path::new("/tmp/s.go"));
        let start = defs.iter().find(|d| d.name == "Start").unwrap();
        assert_eq!(start.kind, SymbolKind::Method);
        assert_eq!(start.parent_name.as_deref(), Some("Server"));
        assert!(defs.iter().any(|d| d.name == "Server" && d.kind == SymbolKind::Struct));
    }

    #[test]
    fn test_symbol_at_position() {
        let source = "public class Foo { void bar() {} }\n";
        let pr = parse("/tmp/Foo.java", source);
        // Column of `Foo` (1-based: "public class Foo" -> col 14).
        let sym = symbol_at_position(&pr, Path::new("/tmp/Foo.java"), 1, 14).unwrap();
        assert_eq!(sym.name, "Foo");
        assert_eq!(sym.kind, SymbolKind::Class);
    }

    #[test]
    fn test_idempotent_extraction() {
        let source = "class C { int f; void m() {} }\n";
        let pr = parse("/tmp/C.java", source);
        let first = extract_definitions(&pr, Path::new("/tmp/C.java"));
        let second = extract_definitions(&pr, Path::new("/tmp/C.java"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_location_ordering_invariant() {
        let source = "class C { void m(int a, int b) {} }\n";
        let pr = parse("/tmp/C.java", source);
        for def in extract_definitions(&pr, Path::new("/tmp/C.java")) {
            assert!(def.location.start_line <= def.location.end_line);
            if def.location.start_line == def.location.end_line {
                assert!(def.location.start_column <= def.location.end_column);
            }
        }
    }
}
