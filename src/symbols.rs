//! Symbol records: locations, kinds, parameters and symbol descriptors.
//!
//! These are immutable value types; the `with_*` methods return updated
//! copies and never mutate shared state.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::fsio::normalize_path;

/// A source range, 1-based lines and columns, keyed by canonical path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub path: PathBuf,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Location {
    /// Create a location, normalizing the path to absolute canonical form.
    pub fn new(
        path: impl AsRef<Path>,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        Self {
            path: normalize_path(path.as_ref()),
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// A range on a single line.
    pub fn single_line(path: impl AsRef<Path>, line: u32, start_column: u32, end_column: u32) -> Self {
        Self::new(path, line, start_column, line, end_column)
    }

    /// A zero-width point.
    pub fn point(path: impl AsRef<Path>, line: u32, column: u32) -> Self {
        Self::new(path, line, column, line, column)
    }

    /// Sort key: `(path, start_line, start_column)`.
    pub fn sort_key(&self) -> (String, u32, u32) {
        (
            self.path.to_string_lossy().into_owned(),
            self.start_line,
            self.start_column,
        )
    }
}

/// The kind of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SymbolKind {
    Class,
    Interface,
    Enum,
    Struct,
    Trait,
    Object,
    Method,
    Function,
    Constructor,
    Field,
    Property,
    Variable,
    Parameter,
    Constant,
    Import,
    Package,
    Module,
    Namespace,
    TypeParameter,
    Annotation,
    Reference,
    Event,
    Unknown,
}

impl SymbolKind {
    /// Whether this kind introduces a name (the resolver filters on this).
    pub fn is_definition(&self) -> bool {
        matches!(
            self,
            SymbolKind::Class
                | SymbolKind::Interface
                | SymbolKind::Enum
                | SymbolKind::Struct
                | SymbolKind::Trait
                | SymbolKind::Object
                | SymbolKind::Method
                | SymbolKind::Function
                | SymbolKind::Constructor
                | SymbolKind::Field
                | SymbolKind::Property
                | SymbolKind::Variable
                | SymbolKind::Parameter
                | SymbolKind::Constant
        )
    }

    /// Wire name, e.g. `CLASS` or `TYPE_PARAMETER`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "CLASS",
            SymbolKind::Interface => "INTERFACE",
            SymbolKind::Enum => "ENUM",
            SymbolKind::Struct => "STRUCT",
            SymbolKind::Trait => "TRAIT",
            SymbolKind::Object => "OBJECT",
            SymbolKind::Method => "METHOD",
            SymbolKind::Function => "FUNCTION",
            SymbolKind::Constructor => "CONSTRUCTOR",
            SymbolKind::Field => "FIELD",
            SymbolKind::Property => "PROPERTY",
            SymbolKind::Variable => "VARIABLE",
            SymbolKind::Parameter => "PARAMETER",
            SymbolKind::Constant => "CONSTANT",
            SymbolKind::Import => "IMPORT",
            SymbolKind::Package => "PACKAGE",
            SymbolKind::Module => "MODULE",
            SymbolKind::Namespace => "NAMESPACE",
            SymbolKind::TypeParameter => "TYPE_PARAMETER",
            SymbolKind::Annotation => "ANNOTATION",
            SymbolKind::Reference => "REFERENCE",
            SymbolKind::Event => "EVENT",
            SymbolKind::Unknown => "UNKNOWN",
        }
    }

    /// Parse a wire name.
    pub fn parse(tag: &str) -> Option<SymbolKind> {
        [
            SymbolKind::Class,
            SymbolKind::Interface,
            SymbolKind::Enum,
            SymbolKind::Struct,
            SymbolKind::Trait,
            SymbolKind::Object,
            SymbolKind::Method,
            SymbolKind::Function,
            SymbolKind::Constructor,
            SymbolKind::Field,
            SymbolKind::Property,
            SymbolKind::Variable,
            SymbolKind::Parameter,
            SymbolKind::Constant,
            SymbolKind::Import,
            SymbolKind::Package,
            SymbolKind::Module,
            SymbolKind::Namespace,
            SymbolKind::TypeParameter,
            SymbolKind::Annotation,
            SymbolKind::Reference,
            SymbolKind::Event,
            SymbolKind::Unknown,
        ]
        .into_iter()
        .find(|k| k.as_str().eq_ignore_ascii_case(tag))
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A formal parameter of a method or function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub is_varargs: bool,
}

impl ParameterInfo {
    pub fn new(name: impl Into<String>, type_name: Option<String>, is_varargs: bool) -> Self {
        Self {
            name: name.into(),
            type_name,
            is_varargs,
        }
    }

    /// Type with generic arguments and package qualifiers stripped, for
    /// signature comparison. `java.util.List<String>` becomes `List`.
    pub fn normalized_type(&self) -> String {
        let raw = self.type_name.as_deref().unwrap_or("");
        normalize_type_text(raw)
    }
}

/// Strip generic arguments and package qualifiers from a type string.
pub fn normalize_type_text(raw: &str) -> String {
    let no_generics = match raw.find('<') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    let trimmed = no_generics.trim();
    // Keep a trailing array/vararg marker attached to the simple name.
    let (base, suffix) = if let Some(stripped) = trimmed.strip_suffix("...") {
        (stripped, "...")
    } else if let Some(stripped) = trimmed.strip_suffix("[]") {
        (stripped, "[]")
    } else {
        (trimmed, "")
    };
    let simple = base.rsplit('.').next().unwrap_or(base);
    format!("{}{}", simple.trim(), suffix)
}

/// A declared symbol or reference occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub name: String,
    pub kind: SymbolKind,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub signature: Option<String>,
    pub parameters: Option<Vec<ParameterInfo>>,
    pub documentation: Option<String>,
    pub location: Location,
    pub parent_name: Option<String>,
}

impl SymbolInfo {
    /// Create a symbol record with the mandatory fields.
    pub fn new(name: impl Into<String>, kind: SymbolKind, location: Location) -> Self {
        Self {
            name: name.into(),
            kind,
            type_name: None,
            signature: None,
            parameters: None,
            documentation: None,
            location,
            parent_name: None,
        }
    }

    /// Copy with documentation attached.
    pub fn with_documentation(mut self, doc: impl Into<String>) -> Self {
        self.documentation = Some(doc.into());
        self
    }

    /// Copy with a signature attached.
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Copy with a declared/return type attached.
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Copy with parameters attached.
    pub fn with_parameters(mut self, parameters: Vec<ParameterInfo>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Copy with the enclosing declaration's name attached.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_name = Some(parent.into());
        self
    }

    /// `Parent.name` when a parent exists, otherwise just the name.
    pub fn qualified_name(&self) -> String {
        match &self.parent_name {
            Some(parent) => format!("{parent}.{}", self.name),
            None => self.name.clone(),
        }
    }

    /// `(T1, T2, …)` with generics and package prefixes stripped; used to
    /// disambiguate overloads.
    pub fn normalized_parameter_signature(&self) -> String {
        let params = self.parameters.as_deref().unwrap_or(&[]);
        let types: Vec<String> = params.iter().map(|p| p.normalized_type()).collect();
        format!("({})", types.join(", "))
    }

    /// Compare a caller-supplied parameter pattern like `(String, int)`
    /// against this symbol's normalized signature, ignoring whitespace.
    pub fn matches_parameter_signature(&self, pattern: &str) -> bool {
        let normalize = |s: &str| {
            let inner = s.trim().trim_start_matches('(').trim_end_matches(')');
            inner
                .split(',')
                .map(|t| normalize_type_text(t.trim()))
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(",")
        };
        normalize(&self.normalized_parameter_signature()) == normalize(pattern)
    }
}
