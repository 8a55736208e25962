//! Move a symbol (method, class or constant) to another file, updating
//! imports and qualified references where packages diverge.

use std::path::PathBuf;

use tree_sitter::Node;

use crate::error::{CodeNavError, ErrorCode, ErrorEnvelope, Result};
use crate::fsio;
use crate::lang::LanguageId;
use crate::parse::{MAX_FILE_BYTES, ParseResult};
use crate::resolve::{Resolver, Scope};
use crate::symbols::{SymbolInfo, SymbolKind};

use super::{ChangeDetail, Plan, PlannedEdit, RefactorContext, RefactoringOperation};

const MEMBER_INDENT: &str = "    ";

/// Move a symbol across files.
#[derive(Debug, Clone)]
pub struct MoveSymbol {
    pub file: PathBuf,
    pub symbol_name: String,
    pub kind: Option<SymbolKind>,
    pub target_file: PathBuf,
    pub target_class: Option<String>,
    pub target_line: Option<u32>,
}

impl MoveSymbol {
    pub fn new(
        file: impl Into<PathBuf>,
        symbol_name: impl Into<String>,
        target_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            file: file.into(),
            symbol_name: symbol_name.into(),
            kind: None,
            target_file: target_file.into(),
            target_class: None,
            target_line: None,
        }
    }

    pub fn of_kind(mut self, kind: SymbolKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Insert into this class's body instead of at file level.
    pub fn into_class(mut self, class: impl Into<String>) -> Self {
        self.target_class = Some(class.into());
        self
    }

    /// Insert before this 1-based line of the target file.
    pub fn at_line(mut self, line: u32) -> Self {
        self.target_line = Some(line);
        self
    }
}

impl RefactoringOperation for MoveSymbol {
    fn name(&self) -> &'static str {
        "Move Symbol"
    }

    fn validate_params(&self) -> Result<()> {
        if self.symbol_name.is_empty() {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(ErrorCode::ParamMissing, "symbolName must not be empty")
                    .with_context("param", "symbolName"),
            ));
        }
        if fsio::normalize_path(&self.file) == fsio::normalize_path(&self.target_file) {
            return Err(CodeNavError::envelope(
                ErrorCode::ParamConflict,
                "Source and target file are the same",
            ));
        }
        Ok(())
    }

    fn plan(&self, ctx: &RefactorContext) -> Result<Plan> {
        let pr = ctx.cache.parse_file(&self.file, None)?;
        let resolver = Resolver::new(ctx.cache, ctx.index);
        let defs = resolver.list_symbols(&self.file)?;

        let candidates: Vec<&SymbolInfo> = defs
            .iter()
            .filter(|d| {
                d.name == self.symbol_name
                    && d.kind.is_definition()
                    && self.kind.is_none_or(|k| k == d.kind)
            })
            .collect();
        let target = match candidates.as_slice() {
            [] => {
                return Err(CodeNavError::Tool(
                    ErrorEnvelope::new(
                        ErrorCode::SymbolNotFound,
                        format!("'{}' is not declared in this file", self.symbol_name),
                    )
                    .with_context("name", self.symbol_name.clone()),
                ));
            }
            [only] => (*only).clone(),
            many => {
                let mut envelope = ErrorEnvelope::new(
                    ErrorCode::SymbolAmbiguous,
                    format!("{} declarations of '{}'", many.len(), self.symbol_name),
                );
                for c in many {
                    envelope = envelope
                        .with_context(c.kind.as_str(), format!("line {}", c.location.start_line));
                }
                return Err(CodeNavError::Tool(envelope));
            }
        };

        let decl = declaration_node(&pr, &target).ok_or_else(|| {
            CodeNavError::envelope(
                ErrorCode::InternalError,
                format!("Could not locate the declaration of '{}'", self.symbol_name),
            )
        })?;
        let start_row = decl.start_position().row;
        let end_row = decl.end_position().row;

        let source_content = pr.content.clone();
        let source_lines: Vec<String> = source_content.lines().map(String::from).collect();
        let moved: Vec<String> = source_lines[start_row..=end_row].to_vec();

        // Delete from the source, keeping at most one blank line at the seam.
        let mut new_source = source_lines.clone();
        new_source.drain(start_row..=end_row);
        if start_row < new_source.len()
            && new_source[start_row].trim().is_empty()
            && (start_row == 0 || new_source[start_row - 1].trim().is_empty())
        {
            new_source.remove(start_row);
        }
        let mut source_modified = new_source.join("\n");
        if source_content.ends_with('\n') && !source_modified.is_empty() {
            source_modified.push('\n');
        }

        // Insert into the target.
        let target_path = fsio::normalize_path(&self.target_file);
        let target_content = if target_path.exists() {
            fsio::read_text(&target_path, MAX_FILE_BYTES)?
        } else {
            String::new()
        };
        let target_modified =
            self.insert_into_target(ctx, &target_content, &moved, &target_path)?;

        let mut plan = Plan::new(format!(
            "move {} -> {}",
            self.symbol_name,
            target_path.display()
        ));
        plan.push(
            PlannedEdit::new(&self.file, source_content, source_modified).with_details(vec![
                ChangeDetail {
                    line: start_row as u32 + 1,
                    column: 1,
                    before: moved.join("\n"),
                    after: String::new(),
                },
            ]),
        );
        plan.push(
            PlannedEdit::new(&target_path, target_content, target_modified).with_details(vec![
                ChangeDetail {
                    line: self.target_line.unwrap_or(1),
                    column: 1,
                    before: String::new(),
                    after: moved.join("\n"),
                },
            ]),
        );

        // Package moves rewrite imports and qualified references elsewhere.
        if pr.lang == LanguageId::Java && target.kind == SymbolKind::Class {
            self.update_java_references(ctx, &resolver, &mut plan)?;
        } else if target.kind == SymbolKind::Class {
            plan.suggest(format!(
                "imports referring to '{}' were not rewritten for {}",
                self.symbol_name, pr.lang
            ));
        }
        Ok(plan)
    }
}

impl MoveSymbol {
    fn insert_into_target(
        &self,
        ctx: &RefactorContext,
        target_content: &str,
        moved: &[String],
        target_path: &std::path::Path,
    ) -> Result<String> {
        let mut lines: Vec<String> = target_content.lines().map(String::from).collect();

        let block: Vec<String> = if let Some(class) = &self.target_class {
            // Into the class body, re-indented one level.
            let target_pr = ctx.cache.parse_with_content(target_path, target_content)?;
            let class_def = crate::extract::extract_definitions(&target_pr, target_path)
                .into_iter()
                .find(|d| d.name == *class && d.kind.is_definition())
                .ok_or_else(|| {
                    CodeNavError::envelope(
                        ErrorCode::SymbolNotFound,
                        format!("Target class '{class}' not found in target file"),
                    )
                })?;
            let decl = declaration_node(&target_pr, &class_def).ok_or_else(|| {
                CodeNavError::envelope(
                    ErrorCode::InternalError,
                    format!("Could not locate the body of '{class}'"),
                )
            })?;
            let close_row = decl.end_position().row;
            let reindented = reindent(moved, MEMBER_INDENT);
            let mut block = vec![String::new()];
            block.extend(reindented);
            for (offset, line) in block.iter().enumerate() {
                lines.insert(close_row + offset, line.clone());
            }
            return Ok(finish(lines, target_content));
        } else {
            moved.to_vec()
        };

        match self.target_line {
            Some(line) => {
                let row = (line.saturating_sub(1) as usize).min(lines.len());
                for (offset, text) in block.iter().enumerate() {
                    lines.insert(row + offset, text.clone());
                }
            }
            None => {
                if !lines.is_empty() && !lines.last().is_some_and(|l| l.trim().is_empty()) {
                    lines.push(String::new());
                }
                lines.extend(block);
            }
        }
        Ok(finish(lines, target_content))
    }

    /// Rewrite `import old.pkg.Name;` and `old.pkg.Name` qualifiers in every
    /// other referring Java file when the move crosses packages.
    fn update_java_references(
        &self,
        ctx: &RefactorContext,
        resolver: &Resolver,
        plan: &mut Plan,
    ) -> Result<()> {
        let source_pkg = package_of(ctx, &self.file);
        let target_pkg = package_of(ctx, &self.target_file);
        let (Some(old_pkg), Some(new_pkg)) = (source_pkg, target_pkg) else {
            return Ok(());
        };
        if old_pkg == new_pkg {
            return Ok(());
        }

        let old_import = format!("import {old_pkg}.{};", self.symbol_name);
        let new_import = format!("import {new_pkg}.{};", self.symbol_name);
        let old_qualified = format!("{old_pkg}.{}", self.symbol_name);
        let new_qualified = format!("{new_pkg}.{}", self.symbol_name);

        let references = resolver.find_references_by_name(
            &self.file,
            &self.symbol_name,
            Scope::Project,
            false,
        )?;
        let mut files: Vec<PathBuf> = references.into_iter().map(|r| r.path).collect();
        files.sort();
        files.dedup();
        let source = fsio::normalize_path(&self.file);
        let target = fsio::normalize_path(&self.target_file);

        for path in files {
            if path == source || path == target {
                continue;
            }
            let original = match fsio::read_text(&path, MAX_FILE_BYTES) {
                Ok(c) => c,
                Err(_) => continue,
            };
            let updated = original
                .replace(&old_import, &new_import)
                .replace(&old_qualified, &new_qualified);
            if updated != original {
                let occurrences = original.matches(&old_import).count()
                    + original.matches(&old_qualified).count();
                plan.push(
                    PlannedEdit::new(&path, original, updated).with_details(vec![ChangeDetail {
                        line: 1,
                        column: 1,
                        before: old_qualified.clone(),
                        after: new_qualified.clone(),
                    }]),
                );
                plan.suggest(format!(
                    "{}: {} qualified reference(s) updated",
                    path.display(),
                    occurrences
                ));
            }
        }
        Ok(())
    }
}

fn finish(lines: Vec<String>, original: &str) -> String {
    let mut out = lines.join("\n");
    if original.is_empty() || original.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn reindent(lines: &[String], indent: &str) -> Vec<String> {
    let base = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| {
            if l.trim().is_empty() {
                String::new()
            } else {
                format!("{indent}{}", &l[base.min(l.len())..])
            }
        })
        .collect()
}

fn package_of(ctx: &RefactorContext, file: &std::path::Path) -> Option<String> {
    let pr = ctx.cache.parse_file(file, None).ok()?;
    let path = fsio::normalize_path(file);
    crate::extract::extract_definitions(&pr, &path)
        .into_iter()
        .find(|d| d.kind == SymbolKind::Package)
        .map(|d| d.name)
}

/// The full declaration node whose name site is this symbol's location:
/// climb from the name until the parent is a container body.
fn declaration_node<'t>(pr: &'t ParseResult, symbol: &SymbolInfo) -> Option<Node<'t>> {
    const BODIES: [&str; 10] = [
        "class_body",
        "declaration_list",
        "enum_body",
        "interface_body",
        "block",
        "program",
        "module",
        "source_file",
        "translation_unit",
        "compilation_unit",
    ];
    let point = tree_sitter::Point {
        row: symbol.location.start_line as usize - 1,
        column: symbol.location.start_column as usize - 1,
    };
    let mut node = pr
        .tree
        .root_node()
        .named_descendant_for_point_range(point, point)?;
    while let Some(parent) = node.parent() {
        if BODIES.contains(&parent.kind()) {
            return Some(node);
        }
        node = parent;
    }
    Some(node)
}
