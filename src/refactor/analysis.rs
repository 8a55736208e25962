//! Selection analysis shared by the extract and inline operations:
//! declared/used/outer variable sets, literal type inference, static
//! context detection and insertion-point search.

use std::collections::HashMap;

use tree_sitter::Node;

use crate::extract::helpers::{name_node, node_text};
use crate::lang::LanguageId;
use crate::parse::ParseResult;

/// Keywords that must never be mistaken for variables.
pub fn keywords(lang: LanguageId) -> &'static [&'static str] {
    match lang {
        LanguageId::Java => &[
            "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class",
            "const", "continue", "default", "do", "double", "else", "enum", "extends", "final",
            "finally", "float", "for", "if", "implements", "import", "instanceof", "int",
            "interface", "long", "native", "new", "package", "private", "protected", "public",
            "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this",
            "throw", "throws", "transient", "try", "var", "void", "volatile", "while", "true",
            "false", "null",
        ],
        LanguageId::Kotlin => &[
            "as", "break", "class", "continue", "do", "else", "false", "for", "fun", "if", "in",
            "interface", "is", "null", "object", "package", "return", "super", "this", "throw",
            "true", "try", "typealias", "val", "var", "when", "while", "companion", "override",
        ],
        LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Tsx => &[
            "function", "let", "const", "var", "if", "else", "for", "while", "return", "this",
            "true", "false", "null", "undefined", "class", "interface", "type", "export",
            "import", "async", "await", "new", "typeof", "instanceof", "switch", "case", "break",
            "continue", "try", "catch", "finally", "throw", "yield", "of", "in", "delete",
        ],
        LanguageId::Python => &[
            "def", "class", "if", "else", "elif", "for", "while", "return", "self", "True",
            "False", "None", "import", "from", "as", "try", "except", "finally", "with",
            "lambda", "yield", "async", "await", "pass", "break", "continue", "global",
            "nonlocal", "raise", "assert", "del", "not", "and", "or", "is", "in", "print",
        ],
        LanguageId::Go => &[
            "func", "var", "const", "if", "else", "for", "range", "return", "true", "false",
            "nil", "type", "struct", "interface", "map", "chan", "go", "defer", "select",
            "switch", "case", "break", "continue", "package", "import", "make", "new", "len",
            "cap", "append",
        ],
        LanguageId::Rust => &[
            "fn", "let", "mut", "if", "else", "for", "while", "loop", "match", "return", "self",
            "Self", "true", "false", "pub", "use", "mod", "struct", "enum", "impl", "trait",
            "where", "async", "await", "move", "ref", "static", "const", "type", "dyn", "unsafe",
            "crate", "super", "in",
        ],
        LanguageId::C | LanguageId::Cpp => &[
            "auto", "break", "case", "char", "const", "continue", "default", "do", "double",
            "else", "enum", "extern", "float", "for", "goto", "if", "int", "long", "register",
            "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
            "union", "unsigned", "void", "volatile", "while", "class", "namespace", "new",
            "delete", "this", "true", "false", "nullptr", "template", "typename",
        ],
        LanguageId::CSharp => &[
            "abstract", "as", "base", "bool", "break", "case", "catch", "char", "class", "const",
            "continue", "decimal", "default", "do", "double", "else", "enum", "false", "finally",
            "float", "for", "foreach", "if", "int", "interface", "internal", "is", "long", "new",
            "null", "object", "out", "override", "private", "protected", "public", "readonly",
            "ref", "return", "sealed", "static", "string", "struct", "switch", "this", "throw",
            "true", "try", "typeof", "using", "var", "virtual", "void", "while", "namespace",
        ],
        LanguageId::Php => &[
            "abstract", "as", "break", "case", "catch", "class", "clone", "const", "continue",
            "declare", "default", "do", "echo", "else", "elseif", "extends", "final", "finally",
            "for", "foreach", "function", "global", "if", "implements", "instanceof",
            "interface", "namespace", "new", "null", "private", "protected", "public", "return",
            "static", "switch", "throw", "trait", "try", "use", "var", "while", "true", "false",
        ],
        LanguageId::Html => &[],
    }
}

/// Node kinds that delimit a function or method body.
pub fn function_kinds(lang: LanguageId) -> &'static [&'static str] {
    match lang {
        LanguageId::Java => &["method_declaration", "constructor_declaration"],
        LanguageId::Kotlin => &["function_declaration", "secondary_constructor"],
        LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Tsx => &[
            "function_declaration",
            "method_definition",
            "arrow_function",
            "function_expression",
            "generator_function_declaration",
        ],
        LanguageId::Python => &["function_definition"],
        LanguageId::Go => &["function_declaration", "method_declaration", "func_literal"],
        LanguageId::Rust => &["function_item", "closure_expression"],
        LanguageId::C | LanguageId::Cpp => &["function_definition"],
        LanguageId::CSharp => &["method_declaration", "constructor_declaration"],
        LanguageId::Php => &["function_definition", "method_declaration"],
        LanguageId::Html => &[],
    }
}

/// Node kinds that delimit a class-like body.
pub fn class_kinds(lang: LanguageId) -> &'static [&'static str] {
    match lang {
        LanguageId::Java => &[
            "class_declaration",
            "interface_declaration",
            "enum_declaration",
            "record_declaration",
        ],
        LanguageId::Kotlin => &["class_declaration", "object_declaration"],
        LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Tsx => {
            &["class_declaration", "abstract_class_declaration"]
        }
        LanguageId::Python => &["class_definition"],
        LanguageId::Go => &[],
        LanguageId::Rust => &["impl_item", "trait_item"],
        LanguageId::C => &["struct_specifier"],
        LanguageId::Cpp => &["class_specifier", "struct_specifier"],
        LanguageId::CSharp => &["class_declaration", "struct_declaration"],
        LanguageId::Php => &["class_declaration", "trait_declaration"],
        LanguageId::Html => &[],
    }
}

/// Node kinds that introduce a local binding.
fn local_declaration_kinds(lang: LanguageId) -> &'static [&'static str] {
    match lang {
        LanguageId::Java => &["local_variable_declaration"],
        LanguageId::Kotlin => &["property_declaration"],
        LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Tsx => {
            &["lexical_declaration", "variable_declaration"]
        }
        LanguageId::Python => &["assignment"],
        LanguageId::Go => &["short_var_declaration", "var_declaration"],
        LanguageId::Rust => &["let_declaration"],
        LanguageId::C | LanguageId::Cpp => &["declaration"],
        LanguageId::CSharp => &["local_declaration_statement"],
        LanguageId::Php => &["assignment_expression"],
        LanguageId::Html => &[],
    }
}

/// The innermost function node whose span covers a 1-based line.
pub fn enclosing_function<'t>(pr: &'t ParseResult, line: u32) -> Option<Node<'t>> {
    innermost_covering(pr, line, function_kinds(pr.lang))
}

/// The innermost class-like node whose span covers a 1-based line.
pub fn enclosing_class<'t>(pr: &'t ParseResult, line: u32) -> Option<Node<'t>> {
    innermost_covering(pr, line, class_kinds(pr.lang))
}

fn innermost_covering<'t>(
    pr: &'t ParseResult,
    line: u32,
    kinds: &[&str],
) -> Option<Node<'t>> {
    let row = line.saturating_sub(1) as usize;
    let mut best: Option<Node> = None;
    let mut stack = vec![pr.tree.root_node()];
    while let Some(node) = stack.pop() {
        if node.start_position().row > row || node.end_position().row < row {
            continue;
        }
        if kinds.contains(&node.kind()) {
            best = Some(match best {
                Some(prev) if prev.byte_range().len() <= node.byte_range().len() => prev,
                _ => node,
            });
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }
    best
}

/// Bindings declared inside `start..=end`, as `(name, declared type)`.
pub fn declared_in_range(pr: &ParseResult, start: u32, end: u32) -> Vec<(String, Option<String>)> {
    let mut out = Vec::new();
    let kinds = local_declaration_kinds(pr.lang);
    walk_range(pr, start, end, &mut |node| {
        if !kinds.contains(&node.kind()) {
            return;
        }
        collect_declared(node, pr, &mut out);
    });
    out
}

fn collect_declared(node: Node, pr: &ParseResult, out: &mut Vec<(String, Option<String>)>) {
    let declared_type = node
        .child_by_field_name("type")
        .map(|t| node_text(t, pr).to_string());
    match pr.lang {
        LanguageId::Python => {
            if let Some(left) = node.child_by_field_name("left") {
                if left.kind() == "identifier" {
                    out.push((node_text(left, pr).to_string(), declared_type));
                }
            }
        }
        LanguageId::Php => {
            if let Some(left) = node.child_by_field_name("left") {
                let text = node_text(left, pr).trim_start_matches('$').to_string();
                if !text.is_empty() {
                    out.push((text, None));
                }
            }
        }
        _ => {
            // Declarator-style: one or more named declarators under the
            // declaration statement.
            let mut cursor = node.walk();
            let mut found_declarator = false;
            for child in node.children(&mut cursor) {
                if matches!(
                    child.kind(),
                    "variable_declarator" | "init_declarator" | "variable_declaration"
                ) {
                    found_declarator = true;
                    if let Some(name) = name_node(child, pr.lang) {
                        out.push((node_text(name, pr).to_string(), declared_type.clone()));
                    }
                }
            }
            if !found_declarator {
                if let Some(name) = node
                    .child_by_field_name("name")
                    .or_else(|| node.child_by_field_name("left"))
                    .or_else(|| node.child_by_field_name("pattern"))
                {
                    out.push((node_text(name, pr).to_string(), declared_type));
                }
            }
        }
    }
}

/// Plain identifier uses inside `start..=end`, excluding keywords, callee
/// names and member accesses. Deduplicated, in first-use order.
pub fn used_in_range(pr: &ParseResult, start: u32, end: u32) -> Vec<String> {
    let narrow: &[&str] = match pr.lang {
        LanguageId::Kotlin => &["simple_identifier"],
        LanguageId::Php => &["variable_name"],
        _ => &["identifier"],
    };
    let kws = keywords(pr.lang);
    let mut seen = Vec::new();
    walk_range(pr, start, end, &mut |node| {
        if !narrow.contains(&node.kind()) {
            return;
        }
        if is_callee(node) || is_member_access(node) {
            return;
        }
        let text = node_text(node, pr).trim_start_matches('$').to_string();
        if text.is_empty() || kws.contains(&text.as_str()) {
            return;
        }
        if !seen.contains(&text) {
            seen.push(text);
        }
    });
    seen
}

fn is_callee(node: Node) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        "method_invocation" | "call_expression" | "call" | "function_call_expression" => parent
            .child_by_field_name("name")
            .or_else(|| parent.child_by_field_name("function"))
            .is_some_and(|n| n.id() == node.id()),
        _ => false,
    }
}

fn is_member_access(node: Node) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        "field_access" | "member_expression" | "attribute" | "member_access_expression"
        | "navigation_suffix" | "field_expression" => parent
            .child_by_field_name("field")
            .or_else(|| parent.child_by_field_name("property"))
            .or_else(|| parent.child_by_field_name("attribute"))
            .is_some_and(|n| n.id() == node.id()),
        _ => false,
    }
}

/// Variables visible at `before_line` inside the enclosing function:
/// parameters plus locals declared earlier.
pub fn outer_variables(pr: &ParseResult, before_line: u32) -> HashMap<String, Option<String>> {
    let mut out = HashMap::new();
    let Some(function) = enclosing_function(pr, before_line) else {
        return out;
    };
    for param in crate::extract::helpers::parameters_of(function, pr, pr.lang) {
        out.insert(param.name, param.type_name);
    }
    let fn_start = function.start_position().row as u32 + 1;
    if before_line > fn_start {
        for (name, ty) in declared_in_range(pr, fn_start, before_line - 1) {
            out.insert(name, ty);
        }
    }
    out
}

/// The expression of the first `return` statement in the range, if any.
pub fn return_expression_in_range(pr: &ParseResult, start: u32, end: u32) -> Option<String> {
    let mut found: Option<String> = None;
    walk_range(pr, start, end, &mut |node| {
        if found.is_some() {
            return;
        }
        if matches!(node.kind(), "return_statement" | "return") {
            let expr = node
                .named_child(0)
                .map(|e| node_text(e, pr).trim().to_string())
                .unwrap_or_default();
            found = Some(expr);
        }
    });
    found
}

/// Whether the function enclosing `line` is a static context.
pub fn is_static_context(pr: &ParseResult, line: u32) -> bool {
    let Some(function) = enclosing_function(pr, line) else {
        // Top-level code has no instance receiver.
        return true;
    };
    match pr.lang {
        LanguageId::Java | LanguageId::CSharp => {
            let mut cursor = function.walk();
            function.children(&mut cursor).any(|c| {
                c.kind() == "modifiers" && node_text(c, pr).contains("static")
            })
        }
        LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Tsx => {
            let mut cursor = function.walk();
            function.children(&mut cursor).any(|c| c.kind() == "static")
                || enclosing_class(pr, line).is_none()
        }
        LanguageId::Python => {
            if enclosing_class(pr, line).is_none() {
                return true;
            }
            // `self` missing from the parameter list means static-ish.
            !crate::extract::helpers::node_text(function, pr).contains("self")
        }
        _ => enclosing_class(pr, line).is_none(),
    }
}

/// Infer a type for an expression from known bindings and literal shape.
/// Falls back to the language's object type.
pub fn infer_expression_type(
    expr: &str,
    lang: LanguageId,
    known: &HashMap<String, Option<String>>,
) -> String {
    let expr = expr.trim().trim_end_matches(';').trim();
    if let Some(Some(ty)) = known.get(expr) {
        return ty.clone();
    }
    if expr == "true" || expr == "false" || expr == "True" || expr == "False" {
        return boolean_type(lang).to_string();
    }
    if expr.starts_with('"') || expr.starts_with('\'') {
        return string_type(lang).to_string();
    }
    let numeric = expr.trim_start_matches(['-', '+']);
    if !numeric.is_empty() && numeric.chars().all(|c| c.is_ascii_digit()) {
        return integer_type(lang).to_string();
    }
    if numeric.parse::<f64>().is_ok() && numeric.contains('.') {
        return float_type(lang).to_string();
    }
    if let Some(rest) = expr.strip_prefix("new ") {
        let ty: String = rest
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '.')
            .collect();
        if !ty.is_empty() {
            return ty.rsplit('.').next().unwrap_or(&ty).to_string();
        }
    }
    if let Some(ty) = arithmetic_type(expr, lang, known) {
        return ty;
    }
    object_type(lang).to_string()
}

/// Arithmetic over known numeric operands keeps their type; mixing integer
/// and floating operands widens to floating.
fn arithmetic_type(
    expr: &str,
    lang: LanguageId,
    known: &HashMap<String, Option<String>>,
) -> Option<String> {
    if !expr.chars().any(|c| "+-*/%".contains(c)) {
        return None;
    }
    let tokens: Vec<&str> = expr
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return None;
    }
    let mut result: Option<String> = None;
    for token in tokens {
        let ty = if token.chars().all(|c| c.is_ascii_digit()) {
            integer_type(lang).to_string()
        } else if token.contains('.') && token.parse::<f64>().is_ok() {
            float_type(lang).to_string()
        } else {
            known.get(token).cloned().flatten()?
        };
        result = Some(match result {
            None => ty,
            Some(prev) if prev == ty => prev,
            Some(prev)
                if (prev == integer_type(lang) && ty == float_type(lang))
                    || (prev == float_type(lang) && ty == integer_type(lang)) =>
            {
                float_type(lang).to_string()
            }
            _ => return None,
        });
    }
    result
}

pub fn integer_type(lang: LanguageId) -> &'static str {
    match lang {
        LanguageId::Java | LanguageId::C | LanguageId::Cpp | LanguageId::CSharp
        | LanguageId::Php | LanguageId::Go => "int",
        LanguageId::Kotlin => "Int",
        LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Tsx => "number",
        LanguageId::Python => "int",
        LanguageId::Rust => "i32",
        LanguageId::Html => "int",
    }
}

pub fn float_type(lang: LanguageId) -> &'static str {
    match lang {
        LanguageId::Java | LanguageId::C | LanguageId::Cpp | LanguageId::CSharp
        | LanguageId::Php => "double",
        LanguageId::Kotlin => "Double",
        LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Tsx => "number",
        LanguageId::Python => "float",
        LanguageId::Go => "float64",
        LanguageId::Rust => "f64",
        LanguageId::Html => "double",
    }
}

pub fn boolean_type(lang: LanguageId) -> &'static str {
    match lang {
        LanguageId::Java => "boolean",
        LanguageId::Kotlin => "Boolean",
        LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Tsx => "boolean",
        LanguageId::Python => "bool",
        LanguageId::Go | LanguageId::CSharp | LanguageId::C | LanguageId::Cpp
        | LanguageId::Php => "bool",
        LanguageId::Rust => "bool",
        LanguageId::Html => "bool",
    }
}

pub fn string_type(lang: LanguageId) -> &'static str {
    match lang {
        LanguageId::Java => "String",
        LanguageId::Kotlin => "String",
        LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Tsx => "string",
        LanguageId::Python => "str",
        LanguageId::Go => "string",
        LanguageId::Rust => "String",
        LanguageId::C | LanguageId::Cpp => "std::string",
        LanguageId::CSharp => "string",
        LanguageId::Php => "string",
        LanguageId::Html => "string",
    }
}

pub fn object_type(lang: LanguageId) -> &'static str {
    match lang {
        LanguageId::Java => "Object",
        LanguageId::Kotlin => "Any",
        LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Tsx => "any",
        LanguageId::Python => "object",
        LanguageId::Go => "interface{}",
        LanguageId::Rust => "_",
        LanguageId::C => "void*",
        LanguageId::Cpp => "auto",
        LanguageId::CSharp => "object",
        LanguageId::Php => "mixed",
        LanguageId::Html => "object",
    }
}

/// Leading whitespace of a 1-based line.
pub fn indentation_of(content: &str, line: u32) -> String {
    content
        .lines()
        .nth(line.saturating_sub(1) as usize)
        .map(|l| {
            let indent_len = l.len() - l.trim_start().len();
            l[..indent_len].to_string()
        })
        .unwrap_or_default()
}

fn walk_range(pr: &ParseResult, start: u32, end: u32, f: &mut dyn FnMut(Node)) {
    let start_row = start.saturating_sub(1) as usize;
    let end_row = end.saturating_sub(1) as usize;
    let mut stack = vec![pr.tree.root_node()];
    while let Some(node) = stack.pop() {
        if node.start_position().row > end_row || node.end_position().row < start_row {
            continue;
        }
        if node.start_position().row >= start_row && node.end_position().row <= end_row {
            f(node);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::ParseCache;
    use std::path::Path;

    fn parse(path: &str, source: &str) -> ParseResult {
        ParseCache::new()
            .parse_with_content(Path::new(path), source)
            .unwrap()
    }

    const JAVA: &str = "public class Calc {\n    public int sum(int a, int b) {\n        int total = a + b;\n        int doubled = total * 2;\n        return doubled;\n    }\n}\n";

    #[test]
    fn test_declared_in_range() {
        let pr = parse("/tmp/Calc.java", JAVA);
        let declared = declared_in_range(&pr, 3, 4);
        let names: Vec<&str> = declared.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["total", "doubled"]);
        assert_eq!(declared[0].1.as_deref(), Some("int"));
    }

    #[test]
    fn test_used_in_range_excludes_keywords() {
        let pr = parse("/tmp/Calc.java", JAVA);
        let used = used_in_range(&pr, 3, 3);
        assert!(used.contains(&"a".to_string()));
        assert!(used.contains(&"b".to_string()));
        assert!(used.contains(&"total".to_string()));
        assert!(!used.contains(&"int".to_string()));
    }

    #[test]
    fn test_outer_variables_sees_parameters() {
        let pr = parse("/tmp/Calc.java", JAVA);
        let outer = outer_variables(&pr, 4);
        assert!(outer.contains_key("a"));
        assert!(outer.contains_key("b"));
        assert!(outer.contains_key("total"));
        assert!(!outer.contains_key("doubled"));
    }

    #[test]
    fn test_return_detection() {
        let pr = parse("/tmp/Calc.java", JAVA);
        assert_eq!(
            return_expression_in_range(&pr, 3, 5).as_deref(),
            Some("doubled")
        );
        assert!(return_expression_in_range(&pr, 3, 4).is_none());
    }

    #[test]
    fn test_static_context() {
        let source = "public class A {\n    static int f() {\n        return 1;\n    }\n    int g() {\n        return 2;\n    }\n}\n";
        let pr = parse("/tmp/A.java", source);
        assert!(is_static_context(&pr, 3));
        assert!(!is_static_context(&pr, 6));
    }

    #[test]
    fn test_infer_types() {
        let known = HashMap::new();
        assert_eq!(infer_expression_type("42", LanguageId::Java, &known), "int");
        assert_eq!(
            infer_expression_type("3.25", LanguageId::Java, &known),
            "double"
        );
        assert_eq!(
            infer_expression_type("true", LanguageId::Java, &known),
            "boolean"
        );
        assert_eq!(
            infer_expression_type("\"hi\"", LanguageId::Java, &known),
            "String"
        );
        assert_eq!(
            infer_expression_type("new java.util.ArrayList()", LanguageId::Java, &known),
            "ArrayList"
        );
        assert_eq!(
            infer_expression_type("mystery()", LanguageId::Java, &known),
            "Object"
        );

        let mut known = HashMap::new();
        known.insert("count".to_string(), Some("long".to_string()));
        assert_eq!(
            infer_expression_type("count", LanguageId::Java, &known),
            "long"
        );
    }

    #[test]
    fn test_infer_arithmetic() {
        let mut known = HashMap::new();
        known.insert("w".to_string(), Some("int".to_string()));
        known.insert("h".to_string(), Some("int".to_string()));
        assert_eq!(
            infer_expression_type("w * h", LanguageId::Java, &known),
            "int"
        );
        assert_eq!(
            infer_expression_type("w + 0.5", LanguageId::Java, &known),
            "double"
        );
        // An unknown operand falls back to the object type.
        assert_eq!(
            infer_expression_type("w * mystery", LanguageId::Java, &known),
            "Object"
        );
    }

    #[test]
    fn test_indentation() {
        let content = "a\n    b\n\tc\n";
        assert_eq!(indentation_of(content, 1), "");
        assert_eq!(indentation_of(content, 2), "    ");
        assert_eq!(indentation_of(content, 3), "\t");
    }
}
