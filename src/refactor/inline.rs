//! Inline: replace usages of a variable or single-expression method with
//! its value.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tree_sitter::Node;

use crate::error::{CodeNavError, ErrorCode, ErrorEnvelope, Result};
use crate::fsio;
use crate::parse::{MAX_FILE_BYTES, ParseResult};
use crate::resolve::{Resolver, Scope};
use crate::symbols::{Location, SymbolInfo, SymbolKind};

use super::analysis;
use super::{ChangeDetail, Plan, PlannedEdit, RefactorContext, RefactoringOperation};

/// Inline a symbol's value or body at its usage sites.
#[derive(Debug, Clone)]
pub struct Inline {
    pub file: PathBuf,
    pub symbol_name: String,
    pub scope: Scope,
    pub delete_declaration: bool,
}

impl Inline {
    pub fn new(file: impl Into<PathBuf>, symbol_name: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            symbol_name: symbol_name.into(),
            scope: Scope::File,
            delete_declaration: true,
        }
    }

    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Keep the declaration in place after inlining.
    pub fn keep_declaration(mut self) -> Self {
        self.delete_declaration = false;
        self
    }
}

impl RefactoringOperation for Inline {
    fn name(&self) -> &'static str {
        "Inline"
    }

    fn validate_params(&self) -> Result<()> {
        if self.symbol_name.is_empty() {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(ErrorCode::ParamMissing, "symbolName must not be empty")
                    .with_context("param", "symbolName"),
            ));
        }
        Ok(())
    }

    fn plan(&self, ctx: &RefactorContext) -> Result<Plan> {
        let pr = ctx.cache.parse_file(&self.file, None)?;
        let resolver = Resolver::new(ctx.cache, ctx.index);
        let defs = resolver.list_symbols(&self.file)?;
        let target = defs
            .iter()
            .find(|d| d.name == self.symbol_name && d.kind.is_definition())
            .cloned()
            .ok_or_else(|| {
                CodeNavError::Tool(
                    ErrorEnvelope::new(
                        ErrorCode::SymbolNotFound,
                        format!("'{}' is not declared in this file", self.symbol_name),
                    )
                    .with_context("name", self.symbol_name.clone()),
                )
            })?;

        let (replacement, decl_span, callable) = match target.kind {
            SymbolKind::Variable | SymbolKind::Constant | SymbolKind::Field => {
                let (value, span) = variable_value(&pr, &target)?;
                (value, span, false)
            }
            SymbolKind::Method | SymbolKind::Function => {
                let (body, span) = method_body(&pr, &target)?;
                if target
                    .parameters
                    .as_deref()
                    .is_some_and(|params| !params.is_empty())
                {
                    return Err(CodeNavError::envelope(
                        ErrorCode::ChangeConflict,
                        format!(
                            "'{}' takes parameters; only parameterless callables can be inlined",
                            self.symbol_name
                        ),
                    ));
                }
                (body, span, true)
            }
            other => {
                return Err(CodeNavError::envelope(
                    ErrorCode::ParamInvalid,
                    format!("A {other} cannot be inlined"),
                ));
            }
        };

        let usages =
            resolver.find_references_by_name(&self.file, &self.symbol_name, self.scope, false)?;
        let usages: Vec<Location> = usages
            .into_iter()
            .filter(|u| !(u.path == target.location.path && within(u, &decl_span)))
            .collect();
        if usages.is_empty() && !self.delete_declaration {
            return Err(CodeNavError::envelope(
                ErrorCode::SymbolNotFound,
                format!("'{}' has no usages to inline", self.symbol_name),
            ));
        }

        let mut plan = Plan::new(format!("inline {}", self.symbol_name));
        let mut per_file: BTreeMap<PathBuf, Vec<Location>> = BTreeMap::new();
        for usage in usages {
            per_file.entry(usage.path.clone()).or_default().push(usage);
        }
        let decl_file = target.location.path.clone();
        per_file.entry(decl_file.clone()).or_default();

        for (path, mut sites) in per_file {
            let original = fsio::read_text(&path, MAX_FILE_BYTES)?;
            let mut lines: Vec<String> = original.lines().map(String::from).collect();
            sites.sort_by(|a, b| {
                (b.start_line, b.start_column).cmp(&(a.start_line, a.start_column))
            });
            let mut details = Vec::new();
            let mut skipped = 0usize;
            for site in &sites {
                let row = site.start_line as usize - 1;
                let col = site.start_column as usize - 1;
                let Some(line) = lines.get_mut(row) else {
                    skipped += 1;
                    continue;
                };
                let name_end = col + self.symbol_name.len();
                if line.get(col..name_end) != Some(self.symbol_name.as_str()) {
                    skipped += 1;
                    continue;
                }
                // A call usage swallows its empty argument list.
                let mut end = name_end;
                if callable {
                    let rest = &line[name_end..];
                    let compact: String = rest.chars().take_while(|c| *c != ')').collect();
                    if rest.trim_start().starts_with('(')
                        && compact.chars().all(|c| c == '(' || c.is_whitespace())
                    {
                        end = name_end + compact.len() + 1;
                    }
                }
                let before = line[col..end].to_string();
                line.replace_range(col..end, &replacement);
                details.push(ChangeDetail {
                    line: site.start_line,
                    column: site.start_column,
                    before,
                    after: replacement.clone(),
                });
            }
            details.reverse();

            if self.delete_declaration && path == decl_file {
                let start = decl_span.start_line as usize - 1;
                let end = (decl_span.end_line as usize).min(lines.len());
                if start < lines.len() {
                    lines.drain(start..end);
                }
            }

            let mut modified = lines.join("\n");
            if original.ends_with('\n') && !modified.is_empty() {
                modified.push('\n');
            }
            let mut edit = PlannedEdit::new(&path, original, modified).with_details(details);
            if skipped > 0 {
                edit = edit.with_warning(format!("{skipped} usage(s) skipped: text mismatch"));
            }
            plan.push(edit);
        }
        Ok(plan)
    }
}

fn within(usage: &Location, span: &Location) -> bool {
    usage.start_line >= span.start_line && usage.end_line <= span.end_line
}

/// The right-hand side of the symbol's defining assignment, plus the full
/// span of the declaration statement.
fn variable_value(pr: &ParseResult, target: &SymbolInfo) -> Result<(String, Location)> {
    let point = tree_sitter::Point {
        row: target.location.start_line as usize - 1,
        column: target.location.start_column as usize - 1,
    };
    let mut node = pr
        .tree
        .root_node()
        .named_descendant_for_point_range(point, point)
        .ok_or_else(|| no_value(&target.name))?;
    loop {
        if let Some(value) = node
            .child_by_field_name("value")
            .or_else(|| node.child_by_field_name("right"))
        {
            let statement = statement_of(node);
            let start = statement.start_position().row as u32 + 1;
            let end = statement.end_position().row as u32 + 1;
            let span = Location::new(&target.location.path, start, 1, end, 1);
            let text = value
                .utf8_text(pr.content.as_bytes())
                .unwrap_or("")
                .trim()
                .to_string();
            if text.is_empty() {
                return Err(no_value(&target.name));
            }
            return Ok((text, span));
        }
        node = node.parent().ok_or_else(|| no_value(&target.name))?;
    }
}

/// The single-expression body of a method, plus the method's span.
fn method_body(pr: &ParseResult, target: &SymbolInfo) -> Result<(String, Location)> {
    let function = analysis::enclosing_function(pr, target.location.start_line)
        .ok_or_else(|| no_value(&target.name))?;
    let body = function
        .child_by_field_name("body")
        .ok_or_else(|| no_value(&target.name))?;
    let statements: Vec<Node> = {
        let mut cursor = body.walk();
        body.named_children(&mut cursor)
            .filter(|c| !matches!(c.kind(), "comment" | "line_comment" | "block_comment"))
            .collect()
    };
    if statements.len() != 1 {
        return Err(CodeNavError::envelope(
            ErrorCode::ChangeConflict,
            format!(
                "'{}' has {} statements; only single-expression bodies can be inlined",
                target.name,
                statements.len()
            ),
        ));
    }
    let only = statements[0];
    let text = if matches!(only.kind(), "return_statement" | "return") {
        only.named_child(0)
            .map(|e| e.utf8_text(pr.content.as_bytes()).unwrap_or("").to_string())
            .unwrap_or_default()
    } else {
        only.utf8_text(pr.content.as_bytes())
            .unwrap_or("")
            .trim_end_matches(';')
            .to_string()
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(no_value(&target.name));
    }
    let start = function.start_position().row as u32 + 1;
    let end = function.end_position().row as u32 + 1;
    Ok((text, Location::new(&target.location.path, start, 1, end, 1)))
}

fn statement_of(node: Node) -> Node {
    let mut current = node;
    while let Some(parent) = current.parent() {
        let kind = parent.kind();
        if kind.ends_with("declaration")
            || kind.ends_with("statement")
            || kind == "let_declaration"
        {
            return parent;
        }
        if matches!(kind, "block" | "module" | "program" | "source_file") {
            return current;
        }
        current = parent;
    }
    current
}

fn no_value(name: &str) -> CodeNavError {
    CodeNavError::envelope(
        ErrorCode::ChangeConflict,
        format!("Could not extract a single-expression value for '{name}'"),
    )
}
