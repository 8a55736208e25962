//! Language registry: file extension and shebang detection, grammars, globs.
//!
//! The set of supported languages is closed, so the registry is a tagged enum
//! with exhaustive matches rather than an open plug-in interface. It is
//! process-wide, immutable and free to copy.

use tree_sitter::Language as TsLanguage;

/// A language supported by the navigation and refactoring core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageId {
    Java,
    Kotlin,
    JavaScript,
    TypeScript,
    Tsx,
    Python,
    Go,
    Rust,
    C,
    Cpp,
    CSharp,
    Php,
    Html,
}

/// All supported languages, in registry order.
pub const ALL_LANGUAGES: [LanguageId; 13] = [
    LanguageId::Java,
    LanguageId::Kotlin,
    LanguageId::JavaScript,
    LanguageId::TypeScript,
    LanguageId::Tsx,
    LanguageId::Python,
    LanguageId::Go,
    LanguageId::Rust,
    LanguageId::C,
    LanguageId::Cpp,
    LanguageId::CSharp,
    LanguageId::Php,
    LanguageId::Html,
];

impl LanguageId {
    /// The short lowercase tag for this language.
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageId::Java => "java",
            LanguageId::Kotlin => "kotlin",
            LanguageId::JavaScript => "javascript",
            LanguageId::TypeScript => "typescript",
            LanguageId::Tsx => "tsx",
            LanguageId::Python => "python",
            LanguageId::Go => "go",
            LanguageId::Rust => "rust",
            LanguageId::C => "c",
            LanguageId::Cpp => "cpp",
            LanguageId::CSharp => "csharp",
            LanguageId::Php => "php",
            LanguageId::Html => "html",
        }
    }

    /// Parse a language tag.
    pub fn parse(tag: &str) -> Option<LanguageId> {
        ALL_LANGUAGES
            .iter()
            .copied()
            .find(|l| l.as_str().eq_ignore_ascii_case(tag))
    }

    /// File extensions associated with this language (without dot).
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            LanguageId::Java => &["java"],
            LanguageId::Kotlin => &["kt", "kts"],
            LanguageId::JavaScript => &["js", "jsx", "mjs", "cjs"],
            LanguageId::TypeScript => &["ts", "mts", "cts"],
            LanguageId::Tsx => &["tsx"],
            LanguageId::Python => &["py", "pyi"],
            LanguageId::Go => &["go"],
            LanguageId::Rust => &["rs"],
            LanguageId::C => &["c", "h"],
            LanguageId::Cpp => &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
            LanguageId::CSharp => &["cs"],
            LanguageId::Php => &["php"],
            LanguageId::Html => &["html", "htm"],
        }
    }

    /// The primary extension, used when synthesizing file names.
    pub fn primary_extension(&self) -> &'static str {
        self.extensions()[0]
    }

    /// Glob pattern matching this language's files: `**/*.ext` for a single
    /// extension, `**/*.{e1,e2,…}` for groups.
    pub fn glob_pattern(&self) -> String {
        let exts = self.extensions();
        if exts.len() == 1 {
            format!("**/*.{}", exts[0])
        } else {
            format!("**/*.{{{}}}", exts.join(","))
        }
    }

    /// The tree-sitter grammar for this language.
    pub fn grammar(&self) -> TsLanguage {
        match self {
            LanguageId::Java => tree_sitter_java::LANGUAGE.into(),
            LanguageId::Kotlin => tree_sitter_kotlin_ng::LANGUAGE.into(),
            LanguageId::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            LanguageId::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            LanguageId::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            LanguageId::Python => tree_sitter_python::LANGUAGE.into(),
            LanguageId::Go => tree_sitter_go::LANGUAGE.into(),
            LanguageId::Rust => tree_sitter_rust::LANGUAGE.into(),
            LanguageId::C => tree_sitter_c::LANGUAGE.into(),
            LanguageId::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            LanguageId::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
            LanguageId::Php => tree_sitter_php::LANGUAGE_PHP.into(),
            LanguageId::Html => tree_sitter_html::LANGUAGE.into(),
        }
    }
}

impl std::fmt::Display for LanguageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect a language from a file path's extension.
pub fn detect(path: &std::path::Path) -> Option<LanguageId> {
    let ext = path.extension()?.to_str()?;
    ALL_LANGUAGES
        .iter()
        .copied()
        .find(|l| l.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Detect a language from a path, falling back to a shebang line from the
/// file's first bytes when the extension gives no answer.
pub fn detect_with_content(path: &std::path::Path, first_bytes: &[u8]) -> Option<LanguageId> {
    if let Some(lang) = detect(path) {
        return Some(lang);
    }
    let text = std::str::from_utf8(first_bytes).ok()?;
    let first_line = text.lines().next()?;
    if !first_line.starts_with("#!") {
        return None;
    }
    if first_line.contains("python") {
        Some(LanguageId::Python)
    } else if first_line.contains("node") || first_line.contains("deno") || first_line.contains("bun")
    {
        Some(LanguageId::JavaScript)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(detect(Path::new("src/Main.java")), Some(LanguageId::Java));
        assert_eq!(detect(Path::new("app/index.tsx")), Some(LanguageId::Tsx));
        assert_eq!(detect(Path::new("lib.rs")), Some(LanguageId::Rust));
        assert_eq!(detect(Path::new("a/b/c.kts")), Some(LanguageId::Kotlin));
        assert_eq!(detect(Path::new("Makefile")), None);
        assert_eq!(detect(Path::new("x.rb")), None);
    }

    #[test]
    fn test_detect_shebang() {
        assert_eq!(
            detect_with_content(Path::new("script"), b"#!/usr/bin/env python3\nprint(1)\n"),
            Some(LanguageId::Python)
        );
        assert_eq!(
            detect_with_content(Path::new("run"), b"#!/usr/bin/env node\n"),
            Some(LanguageId::JavaScript)
        );
        assert_eq!(
            detect_with_content(Path::new("run"), b"#!/bin/bash\n"),
            None
        );
        // Extension wins over shebang.
        assert_eq!(
            detect_with_content(Path::new("x.py"), b"#!/usr/bin/env node\n"),
            Some(LanguageId::Python)
        );
    }

    #[test]
    fn test_glob_patterns() {
        assert_eq!(LanguageId::Rust.glob_pattern(), "**/*.rs");
        assert_eq!(LanguageId::Kotlin.glob_pattern(), "**/*.{kt,kts}");
        assert_eq!(
            LanguageId::Cpp.glob_pattern(),
            "**/*.{cpp,cc,cxx,hpp,hh,hxx}"
        );
    }

    #[test]
    fn test_primary_extension() {
        assert_eq!(LanguageId::Java.primary_extension(), "java");
        assert_eq!(LanguageId::TypeScript.primary_extension(), "ts");
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(LanguageId::parse("java"), Some(LanguageId::Java));
        assert_eq!(LanguageId::parse("TSX"), Some(LanguageId::Tsx));
        assert_eq!(LanguageId::parse("cobol"), None);
    }

    #[test]
    fn test_grammars_load() {
        for lang in ALL_LANGUAGES {
            let mut parser = tree_sitter::Parser::new();
            parser
                .set_language(&lang.grammar())
                .unwrap_or_else(|e| panic!("grammar for {lang} failed: {e}"));
        }
    }
}
