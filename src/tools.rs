//! Tool registry: the names, descriptions, input schemas and executors
//! consumed by an external request dispatcher. No transport is prescribed;
//! responses are lists of content parts.

use std::path::PathBuf;

use serde_json::{Value, json};

use crate::diff;
use crate::error::{CodeNavError, ErrorCode, ErrorEnvelope, Result};
use crate::refactor::{
    ExtractMethod, ExtractVariable, Generate, GenerateKind, Inline, MoveSymbol, Rename, Wrap,
    WrapKind,
};
use crate::resolve::Scope;
use crate::session::Session;
use crate::symbols::SymbolKind;
use crate::syntax;

/// One action on the tool boundary.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// A single part of a tool response.
#[derive(Debug, Clone)]
pub enum ContentPart {
    Text(String),
    Structured(Value),
}

/// The response handed back to the dispatcher.
#[derive(Debug, Clone)]
pub struct ToolResponse {
    pub content: Vec<ContentPart>,
    pub is_error: bool,
}

impl ToolResponse {
    fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentPart::Text(text.into())],
            is_error: false,
        }
    }

    fn structured(value: Value) -> Self {
        Self {
            content: vec![ContentPart::Structured(value)],
            is_error: false,
        }
    }

    fn error(envelope: &ErrorEnvelope) -> Self {
        Self {
            content: vec![ContentPart::Text(envelope.to_string())],
            is_error: true,
        }
    }
}

fn schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Every tool the core exposes.
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "read_file",
            description: "Read a file or line range; returns the text and an access token",
            input_schema: schema(
                json!({
                    "path": {"type": "string"},
                    "startLine": {"type": "integer"},
                    "endLine": {"type": "integer"},
                }),
                &["path"],
            ),
        },
        ToolSpec {
            name: "write_range",
            description: "Replace a line range; requires an access token from read_file",
            input_schema: schema(
                json!({
                    "path": {"type": "string"},
                    "accessToken": {"type": "string"},
                    "startLine": {"type": "integer"},
                    "endLine": {"type": "integer"},
                    "newText": {"type": "string"},
                }),
                &["path", "accessToken", "startLine", "endLine", "newText"],
            ),
        },
        ToolSpec {
            name: "list_symbols",
            description: "List all symbols declared in a file",
            input_schema: schema(json!({"path": {"type": "string"}}), &["path"]),
        },
        ToolSpec {
            name: "find_definition",
            description: "Go to definition by position or name",
            input_schema: schema(
                json!({
                    "path": {"type": "string"},
                    "line": {"type": "integer"},
                    "column": {"type": "integer"},
                    "symbolName": {"type": "string"},
                }),
                &["path"],
            ),
        },
        ToolSpec {
            name: "find_references",
            description: "Find references by position or name across a scope",
            input_schema: schema(
                json!({
                    "path": {"type": "string"},
                    "line": {"type": "integer"},
                    "column": {"type": "integer"},
                    "symbolName": {"type": "string"},
                    "scope": {"type": "string", "enum": ["file", "directory", "project"]},
                    "includeDeclaration": {"type": "boolean"},
                }),
                &["path"],
            ),
        },
        ToolSpec {
            name: "hover",
            description: "Symbol details (signature, docs) at a position",
            input_schema: schema(
                json!({
                    "path": {"type": "string"},
                    "line": {"type": "integer"},
                    "column": {"type": "integer"},
                }),
                &["path", "line", "column"],
            ),
        },
        ToolSpec {
            name: "check_syntax",
            description: "Collect syntax errors in a file",
            input_schema: schema(json!({"path": {"type": "string"}}), &["path"]),
        },
        ToolSpec {
            name: "index_project",
            description: "Build the project symbol index",
            input_schema: schema(json!({}), &[]),
        },
        ToolSpec {
            name: "rename",
            description: "Rename a symbol across a scope, with optional hybrid text matching",
            input_schema: schema(
                json!({
                    "path": {"type": "string"},
                    "symbolName": {"type": "string"},
                    "newName": {"type": "string"},
                    "kind": {"type": "string"},
                    "line": {"type": "integer"},
                    "column": {"type": "integer"},
                    "scope": {"type": "string", "enum": ["file", "directory", "project"]},
                    "hybrid": {"type": "boolean"},
                    "applyTextMatches": {"type": "boolean"},
                    "preview": {"type": "boolean"},
                }),
                &["path", "newName"],
            ),
        },
        ToolSpec {
            name: "inline",
            description: "Inline a variable or parameterless method at its usages",
            input_schema: schema(
                json!({
                    "path": {"type": "string"},
                    "symbolName": {"type": "string"},
                    "scope": {"type": "string"},
                    "deleteDeclaration": {"type": "boolean"},
                    "preview": {"type": "boolean"},
                }),
                &["path", "symbolName"],
            ),
        },
        ToolSpec {
            name: "extract_method",
            description: "Extract a line selection into a new method",
            input_schema: schema(
                json!({
                    "path": {"type": "string"},
                    "methodName": {"type": "string"},
                    "startLine": {"type": "integer"},
                    "endLine": {"type": "integer"},
                    "pattern": {"type": "string"},
                    "accessModifier": {"type": "string"},
                    "returnType": {"type": "string"},
                    "preview": {"type": "boolean"},
                }),
                &["path", "methodName"],
            ),
        },
        ToolSpec {
            name: "extract_variable",
            description: "Extract an expression into a local variable",
            input_schema: schema(
                json!({
                    "path": {"type": "string"},
                    "variableName": {"type": "string"},
                    "line": {"type": "integer"},
                    "startColumn": {"type": "integer"},
                    "endColumn": {"type": "integer"},
                    "type": {"type": "string"},
                    "replaceAll": {"type": "boolean"},
                    "preview": {"type": "boolean"},
                }),
                &["path", "variableName", "line"],
            ),
        },
        ToolSpec {
            name: "move_symbol",
            description: "Move a method, class or constant to another file",
            input_schema: schema(
                json!({
                    "path": {"type": "string"},
                    "symbolName": {"type": "string"},
                    "kind": {"type": "string"},
                    "targetFile": {"type": "string"},
                    "targetClass": {"type": "string"},
                    "targetLine": {"type": "integer"},
                    "preview": {"type": "boolean"},
                }),
                &["path", "symbolName", "targetFile"],
            ),
        },
        ToolSpec {
            name: "wrap",
            description: "Surround a line range with a control construct",
            input_schema: schema(
                json!({
                    "path": {"type": "string"},
                    "startLine": {"type": "integer"},
                    "endLine": {"type": "integer"},
                    "wrapper": {"type": "string"},
                    "options": {"type": "object"},
                    "preview": {"type": "boolean"},
                }),
                &["path", "startLine", "endLine", "wrapper"],
            ),
        },
        ToolSpec {
            name: "generate",
            description: "Generate accessors, constructors or utility methods on a class",
            input_schema: schema(
                json!({
                    "path": {"type": "string"},
                    "className": {"type": "string"},
                    "what": {"type": "string"},
                    "field": {"type": "string"},
                    "fluentSetters": {"type": "boolean"},
                    "addValidation": {"type": "boolean"},
                    "preview": {"type": "boolean"},
                }),
                &["path", "className", "what"],
            ),
        },
        ToolSpec {
            name: "diff",
            description: "Unified diff between two text blobs",
            input_schema: schema(
                json!({
                    "name": {"type": "string"},
                    "original": {"type": "string"},
                    "modified": {"type": "string"},
                }),
                &["name", "original", "modified"],
            ),
        },
        ToolSpec {
            name: "undo",
            description: "Undo the most recent journaled change",
            input_schema: schema(json!({}), &[]),
        },
        ToolSpec {
            name: "journal",
            description: "List the session's change journal",
            input_schema: schema(json!({}), &[]),
        },
    ]
}

/// Execute a named tool. Recoverable failures come back as error envelopes
/// in the response, never as `Err`.
pub fn dispatch(session: &Session, name: &str, params: &Value) -> ToolResponse {
    match run(session, name, params) {
        Ok(response) => response,
        Err(e) => ToolResponse::error(&e.to_envelope()),
    }
}

fn run(session: &Session, name: &str, params: &Value) -> Result<ToolResponse> {
    match name {
        "read_file" => {
            let path = require_path(params, "path")?;
            let lines = match (opt_u32(params, "startLine")?, opt_u32(params, "endLine")?) {
                (Some(start), Some(end)) => Some((start, end)),
                (Some(start), None) => Some((start, start)),
                _ => None,
            };
            let read = session.read_file(&path, lines)?;
            let mut parts = Vec::new();
            if read.external_change {
                parts.push(ContentPart::Text("EXTERNAL CHANGE DETECTED".to_string()));
            }
            parts.push(ContentPart::Structured(serde_json::to_value(&read)?));
            Ok(ToolResponse {
                content: parts,
                is_error: false,
            })
        }
        "write_range" => {
            let path = require_path(params, "path")?;
            let token = require_str(params, "accessToken")?;
            let start = require_u32(params, "startLine")?;
            let end = require_u32(params, "endLine")?;
            let text = require_str(params, "newText")?;
            let write = session.write_range(&path, Some(&token), start, end, &text)?;
            Ok(ToolResponse::structured(serde_json::to_value(&write)?))
        }
        "list_symbols" => {
            let path = session.checked_path(&require_path(params, "path")?)?;
            let symbols = session.resolver().list_symbols(&path)?;
            Ok(ToolResponse::structured(serde_json::to_value(&symbols)?))
        }
        "find_definition" => {
            let path = session.checked_path(&require_path(params, "path")?)?;
            let resolver = session.resolver();
            let found = match opt_str(params, "symbolName") {
                Some(name) => resolver.find_definition_by_name(&path, &name)?,
                None => {
                    let line = require_u32(params, "line")?;
                    let column = require_u32(params, "column")?;
                    resolver.find_definition(&path, line, column)?
                }
            };
            match found {
                Some(def) => Ok(ToolResponse::structured(serde_json::to_value(&def)?)),
                None => Ok(ToolResponse::text("No definition found")),
            }
        }
        "find_references" => {
            let path = session.checked_path(&require_path(params, "path")?)?;
            let scope = parse_scope(params)?;
            let include = opt_bool(params, "includeDeclaration").unwrap_or(false);
            let resolver = session.resolver();
            let refs = match opt_str(params, "symbolName") {
                Some(name) => {
                    resolver.find_references_by_name(&path, &name, scope, include)?
                }
                None => {
                    let line = require_u32(params, "line")?;
                    let column = require_u32(params, "column")?;
                    resolver.find_references(&path, line, column, scope, include)?
                }
            };
            Ok(ToolResponse::structured(serde_json::to_value(&refs)?))
        }
        "hover" => {
            let path = session.checked_path(&require_path(params, "path")?)?;
            let line = require_u32(params, "line")?;
            let column = require_u32(params, "column")?;
            match session.resolver().hover(&path, line, column)? {
                Some(sym) => Ok(ToolResponse::structured(serde_json::to_value(&sym)?)),
                None => Ok(ToolResponse::text("No symbol at this position")),
            }
        }
        "check_syntax" => {
            let path = session.checked_path(&require_path(params, "path")?)?;
            let errors = syntax::check(&path)?;
            Ok(ToolResponse::structured(serde_json::to_value(&errors)?))
        }
        "index_project" => {
            let result = session.index_project();
            Ok(ToolResponse::structured(json!({
                "success": result.success,
                "filesIndexed": result.files_indexed,
                "symbolsIndexed": result.symbols_indexed,
                "durationMs": result.duration.as_millis() as u64,
                "message": result.message,
            })))
        }
        "rename" => {
            let path = require_path(params, "path")?;
            let mut op = Rename::new(session.checked_path(&path)?, require_str(params, "newName")?);
            if let Some(symbol) = opt_str(params, "symbolName") {
                op = op.symbol(symbol);
            }
            if let Some(kind) = opt_str(params, "kind") {
                let kind = SymbolKind::parse(&kind).ok_or_else(|| {
                    CodeNavError::envelope(
                        ErrorCode::ParamInvalid,
                        format!("Unknown symbol kind '{kind}'"),
                    )
                })?;
                op = op.of_kind(kind);
            }
            if let (Some(line), Some(column)) =
                (opt_u32(params, "line")?, opt_u32(params, "column")?)
            {
                op = op.at(line, column);
            }
            op = op.in_scope(parse_scope(params)?);
            if opt_bool(params, "hybrid").unwrap_or(false) {
                op = op.hybrid();
            }
            if opt_bool(params, "applyTextMatches").unwrap_or(false) {
                op = op.apply_text_matches();
            }
            run_operation(session, &op, params)
        }
        "inline" => {
            let path = session.checked_path(&require_path(params, "path")?)?;
            let mut op = Inline::new(path, require_str(params, "symbolName")?);
            op = op.in_scope(parse_scope(params)?);
            if !opt_bool(params, "deleteDeclaration").unwrap_or(true) {
                op = op.keep_declaration();
            }
            run_operation(session, &op, params)
        }
        "extract_method" => {
            let path = session.checked_path(&require_path(params, "path")?)?;
            let mut op = ExtractMethod::new(path, require_str(params, "methodName")?);
            if let (Some(start), Some(end)) =
                (opt_u32(params, "startLine")?, opt_u32(params, "endLine")?)
            {
                op = op.lines(start, end);
            }
            if let Some(pattern) = opt_str(params, "pattern") {
                op = op.matching(pattern);
            }
            if let Some(access) = opt_str(params, "accessModifier") {
                op = op.with_access(access);
            }
            if let Some(ret) = opt_str(params, "returnType") {
                op = op.with_return_type(ret);
            }
            run_operation(session, &op, params)
        }
        "extract_variable" => {
            let path = session.checked_path(&require_path(params, "path")?)?;
            let mut op = ExtractVariable::new(
                path,
                require_str(params, "variableName")?,
                require_u32(params, "line")?,
            );
            if let (Some(start), Some(end)) =
                (opt_u32(params, "startColumn")?, opt_u32(params, "endColumn")?)
            {
                op = op.columns(start, end);
            }
            if let Some(ty) = opt_str(params, "type") {
                op = op.with_type(ty);
            }
            if opt_bool(params, "replaceAll").unwrap_or(false) {
                op = op.replace_all();
            }
            run_operation(session, &op, params)
        }
        "move_symbol" => {
            let path = session.checked_path(&require_path(params, "path")?)?;
            let target = session.checked_path(&require_path(params, "targetFile")?)?;
            let mut op = MoveSymbol::new(path, require_str(params, "symbolName")?, target);
            if let Some(kind) = opt_str(params, "kind") {
                let kind = SymbolKind::parse(&kind).ok_or_else(|| {
                    CodeNavError::envelope(
                        ErrorCode::ParamInvalid,
                        format!("Unknown symbol kind '{kind}'"),
                    )
                })?;
                op = op.of_kind(kind);
            }
            if let Some(class) = opt_str(params, "targetClass") {
                op = op.into_class(class);
            }
            if let Some(line) = opt_u32(params, "targetLine")? {
                op = op.at_line(line);
            }
            run_operation(session, &op, params)
        }
        "wrap" => {
            let path = session.checked_path(&require_path(params, "path")?)?;
            let wrapper = require_str(params, "wrapper")?;
            let kind = WrapKind::parse(&wrapper).ok_or_else(|| {
                CodeNavError::envelope(
                    ErrorCode::ParamInvalid,
                    format!("Unknown wrapper '{wrapper}'"),
                )
            })?;
            let mut op = Wrap::new(
                path,
                kind,
                require_u32(params, "startLine")?,
                require_u32(params, "endLine")?,
            );
            if let Some(options) = params.get("options").and_then(Value::as_object) {
                for (key, value) in options {
                    if let Some(text) = value.as_str() {
                        op = op.option(key, text);
                    }
                }
            }
            run_operation(session, &op, params)
        }
        "generate" => {
            let path = session.checked_path(&require_path(params, "path")?)?;
            let what = require_str(params, "what")?;
            let kind = GenerateKind::parse(&what).ok_or_else(|| {
                CodeNavError::envelope(
                    ErrorCode::ParamInvalid,
                    format!("Unknown generation kind '{what}'"),
                )
            })?;
            let mut op = Generate::new(path, require_str(params, "className")?, kind);
            if let Some(field) = opt_str(params, "field") {
                op = op.for_field(field);
            }
            if opt_bool(params, "fluentSetters").unwrap_or(false) {
                op = op.fluent();
            }
            if opt_bool(params, "addValidation").unwrap_or(false) {
                op = op.validated();
            }
            run_operation(session, &op, params)
        }
        "diff" => {
            let name = require_str(params, "name")?;
            let original = require_str(params, "original")?;
            let modified = require_str(params, "modified")?;
            Ok(ToolResponse::text(diff::unified_diff(
                &name, &original, &modified,
            )))
        }
        "undo" => {
            let path = session.undo_last()?;
            Ok(ToolResponse::text(format!("Restored {}", path.display())))
        }
        "journal" => {
            let entries = session.journal();
            if entries.is_empty() {
                Ok(ToolResponse::text("Journal is empty"))
            } else {
                Ok(ToolResponse::text(entries.join("\n")))
            }
        }
        other => Err(CodeNavError::envelope(
            ErrorCode::ParamInvalid,
            format!("Unknown tool '{other}'"),
        )),
    }
}

fn run_operation(
    session: &Session,
    op: &dyn crate::refactor::RefactoringOperation,
    params: &Value,
) -> Result<ToolResponse> {
    let result = if opt_bool(params, "preview").unwrap_or(false) {
        session.preview(op)?
    } else {
        session.execute(op)?
    };
    Ok(ToolResponse::structured(serde_json::to_value(&result)?))
}

fn require_str(params: &Value, key: &str) -> Result<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            CodeNavError::Tool(
                ErrorEnvelope::new(
                    ErrorCode::ParamMissing,
                    format!("Missing required parameter '{key}'"),
                )
                .with_context("param", key.to_string()),
            )
        })
}

fn require_path(params: &Value, key: &str) -> Result<PathBuf> {
    Ok(PathBuf::from(require_str(params, key)?))
}

fn require_u32(params: &Value, key: &str) -> Result<u32> {
    opt_u32(params, key)?.ok_or_else(|| {
        CodeNavError::Tool(
            ErrorEnvelope::new(
                ErrorCode::ParamMissing,
                format!("Missing required parameter '{key}'"),
            )
            .with_context("param", key.to_string()),
        )
    })
}

fn opt_u32(params: &Value, key: &str) -> Result<Option<u32>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                CodeNavError::envelope(
                    ErrorCode::ParamInvalid,
                    format!("Parameter '{key}' must be a non-negative integer"),
                )
            }),
    }
}

fn opt_str(params: &Value, key: &str) -> Option<String> {
    params.get(key).and_then(Value::as_str).map(str::to_string)
}

fn opt_bool(params: &Value, key: &str) -> Option<bool> {
    params.get(key).and_then(Value::as_bool)
}

fn parse_scope(params: &Value) -> Result<Scope> {
    match opt_str(params, "scope") {
        None => Ok(Scope::default()),
        Some(tag) => Scope::parse(&tag).ok_or_else(|| {
            CodeNavError::envelope(
                ErrorCode::ParamInvalid,
                format!("Unknown scope '{tag}' (expected file, directory or project)"),
            )
        }),
    }
}

/// Convenience used by the CLI: render a response as plain text.
pub fn render_response(response: &ToolResponse) -> String {
    response
        .content
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => text.clone(),
            ContentPart::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_default()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn session() -> (tempfile::TempDir, Session) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
        let session = Session::new(dir.path());
        (dir, session)
    }

    #[test]
    fn test_specs_are_well_formed() {
        let specs = tool_specs();
        assert!(specs.len() >= 15);
        for spec in specs {
            assert!(!spec.name.is_empty());
            assert!(!spec.description.is_empty());
            assert_eq!(spec.input_schema["type"], "object");
        }
    }

    #[test]
    fn test_dispatch_list_symbols() {
        let (dir, session) = session();
        fs::write(
            dir.path().join("Foo.java"),
            "public class Foo { void bar() {} }\n",
        )
        .unwrap();
        let response = dispatch(&session, "list_symbols", &json!({"path": "Foo.java"}));
        assert!(!response.is_error);
        let rendered = render_response(&response);
        assert!(rendered.contains("Foo"));
        assert!(rendered.contains("bar"));
    }

    #[test]
    fn test_dispatch_missing_param_is_envelope() {
        let (_dir, session) = session();
        let response = dispatch(&session, "rename", &json!({"path": "Foo.java"}));
        assert!(response.is_error);
        let rendered = render_response(&response);
        assert!(rendered.starts_with("[ERROR: PARAM_MISSING]"));
        assert!(rendered.contains("Solution:"));
    }

    #[test]
    fn test_dispatch_unknown_tool() {
        let (_dir, session) = session();
        let response = dispatch(&session, "no_such_tool", &json!({}));
        assert!(response.is_error);
        assert!(render_response(&response).contains("PARAM_INVALID"));
    }

    #[test]
    fn test_dispatch_rename_end_to_end() {
        let (dir, session) = session();
        let file = dir.path().join("C.java");
        fs::write(
            &file,
            "public class C {\n    int x = 1;\n    int get() { return x; }\n}\n",
        )
        .unwrap();
        let response = dispatch(
            &session,
            "rename",
            &json!({
                "path": "C.java",
                "symbolName": "x",
                "newName": "value",
                "scope": "file",
            }),
        );
        assert!(!response.is_error, "{}", render_response(&response));
        assert!(fs::read_to_string(&file).unwrap().contains("int value = 1;"));

        let payload = match &response.content[0] {
            ContentPart::Structured(value) => value.clone(),
            ContentPart::Text(_) => panic!("expected structured payload"),
        };
        assert_eq!(payload["totalChanges"], 2);
        assert_eq!(payload["status"], "SUCCESS");
        assert!(payload["transactionId"].is_string());
        let change = &payload["changes"][0];
        assert!(change["accessToken"].is_string());
        assert!(change["unifiedDiff"].is_string());
        assert!(change["lineCount"].is_number());
        assert_eq!(change["details"][0]["line"], 2);
    }

    #[test]
    fn test_dispatch_read_write_cycle() {
        let (dir, session) = session();
        let file = dir.path().join("a.py");
        fs::write(&file, "x = 1\n").unwrap();

        let read = dispatch(&session, "read_file", &json!({"path": "a.py"}));
        assert!(!read.is_error);
        let payload = match &read.content[0] {
            ContentPart::Structured(value) => value.clone(),
            ContentPart::Text(_) => panic!("expected structured payload"),
        };
        // Wire records are camelCase.
        assert_eq!(payload["lineCount"], 1);
        assert_eq!(payload["externalChange"], false);
        assert!(payload.get("line_count").is_none());
        let token = payload["accessToken"].as_str().unwrap();

        let write = dispatch(
            &session,
            "write_range",
            &json!({
                "path": "a.py",
                "accessToken": token,
                "startLine": 1,
                "endLine": 1,
                "newText": "x = 2",
            }),
        );
        assert!(!write.is_error, "{}", render_response(&write));
        assert_eq!(fs::read_to_string(&file).unwrap(), "x = 2\n");
    }
}
