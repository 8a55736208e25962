//! Syntax checking: collects ERROR and MISSING nodes from a parse tree.

use std::path::Path;

use serde::Serialize;
use tree_sitter::Node;

use crate::error::Result;
use crate::fsio;
use crate::lang;
use crate::parse::{self, MAX_FILE_BYTES};

/// Cap on reported errors per file.
pub const MAX_ERRORS: usize = 5;

const CONTEXT_CAP: usize = 80;

/// A single syntax problem, 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntaxError {
    pub line: u32,
    pub column: u32,
    pub message: String,
    pub context: String,
}

/// Check a file on disk. Unsupported languages yield an empty result.
pub fn check(path: &Path) -> Result<Vec<SyntaxError>> {
    let content = fsio::read_text(path, MAX_FILE_BYTES)?;
    check_content(path, &content)
}

/// Check in-memory content named by `path` (the name drives language
/// detection).
pub fn check_content(path: &Path, content: &str) -> Result<Vec<SyntaxError>> {
    let lang = match lang::detect_with_content(path, content.as_bytes()) {
        Some(l) => l,
        None => return Ok(Vec::new()),
    };
    let tree = parse::parse_source(content, lang)?;
    let lines: Vec<&str> = content.lines().collect();
    let mut errors = Vec::new();
    collect(tree.root_node(), &lines, &mut errors);
    Ok(errors)
}

fn collect(node: Node, lines: &[&str], out: &mut Vec<SyntaxError>) {
    if out.len() >= MAX_ERRORS {
        return;
    }
    if node.is_error() {
        let parent_kind = node.parent().map(|p| p.kind()).unwrap_or("source");
        out.push(make_error(
            node,
            format!("Syntax error in {parent_kind}"),
            lines,
        ));
        // One report per ERROR subtree.
        return;
    }
    if node.is_missing() {
        out.push(make_error(node, format!("Missing {}", node.kind()), lines));
        return;
    }
    if !node.has_error() {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect(child, lines, out);
        if out.len() >= MAX_ERRORS {
            return;
        }
    }
}

fn make_error(node: Node, message: String, lines: &[&str]) -> SyntaxError {
    let point = node.start_position();
    let context = lines
        .get(point.row)
        .map(|l| {
            let trimmed = l.trim();
            if trimmed.len() > CONTEXT_CAP {
                let mut end = CONTEXT_CAP;
                while !trimmed.is_char_boundary(end) {
                    end -= 1;
                }
                trimmed[..end].to_string()
            } else {
                trimmed.to_string()
            }
        })
        .unwrap_or_default();
    SyntaxError {
        line: point.row as u32 + 1,
        column: point.column as u32 + 1,
        message,
        context,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_file_has_no_errors() {
        let errors =
            check_content(Path::new("ok.java"), "class Foo { void m() { } }").unwrap();
        assert!(errors.is_empty());
    }

    #[test]
    fn test_broken_java_reports_line_one() {
        let errors =
            check_content(Path::new("x.java"), "class Foo { void m( { } }").unwrap();
        assert!(!errors.is_empty());
        assert_eq!(errors[0].line, 1);
    }

    #[test]
    fn test_error_cap() {
        let source = "def a(:\ndef b(:\ndef c(:\ndef d(:\ndef e(:\ndef f(:\ndef g(:\n";
        let errors = check_content(Path::new("bad.py"), source).unwrap();
        assert!(errors.len() <= MAX_ERRORS);
    }

    #[test]
    fn test_unsupported_language_is_empty() {
        let errors = check_content(Path::new("notes.txt"), "whatever {{{").unwrap();
        assert!(errors.is_empty());
    }

    #[test]
    fn test_context_is_trimmed_line() {
        let errors =
            check_content(Path::new("x.java"), "    class Foo { void m( { } }").unwrap();
        assert!(!errors.is_empty());
        assert!(errors[0].context.starts_with("class Foo"));
    }
}
