//! Refactoring engine: tree-sitter-driven code transformations with
//! preview, transactional apply and rollback.
//!
//! Each operation is a parameter struct implementing [`RefactoringOperation`].
//! Planning is side-effect free; `preview` renders the plan as diffs, and
//! `execute` applies it under a transaction, rolling back on any failure.

pub mod analysis;
mod extract_method;
mod extract_variable;
mod generate;
mod inline;
mod move_symbol;
mod rename;
mod wrap;

pub use extract_method::ExtractMethod;
pub use extract_variable::ExtractVariable;
pub use generate::{Generate, GenerateKind};
pub use inline::Inline;
pub use move_symbol::MoveSymbol;
pub use rename::Rename;
pub use wrap::{Wrap, WrapKind};

use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::changes::ChangeTracker;
use crate::diff::{DiffSummary, unified_diff};
use crate::error::Result;
use crate::fsio;
use crate::index::SymbolIndex;
use crate::parse::ParseCache;
use crate::tokens::AccessToken;
use crate::txn::TransactionManager;

/// Everything an operation needs to plan and apply itself.
pub struct RefactorContext<'a> {
    pub cache: &'a ParseCache,
    pub index: &'a SymbolIndex,
    pub tracker: &'a ChangeTracker,
    pub txns: &'a TransactionManager,
}

/// Outcome classification on the tool boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefactoringStatus {
    Preview,
    Success,
    Error,
}

/// One edited site inside a file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeDetail {
    pub line: u32,
    pub column: u32,
    pub before: String,
    pub after: String,
}

/// Per-file change report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    pub path: PathBuf,
    pub occurrences: usize,
    pub details: Vec<ChangeDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unified_diff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crc: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Result surfaced for preview and execute alike.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefactoringResult {
    pub status: RefactoringStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub changes: Vec<FileChange>,
    pub suggestions: Vec<String>,
    pub total_changes: usize,
    pub message: String,
}

/// One whole-file rewrite in a plan. `modified == original` files are
/// dropped before apply.
#[derive(Debug, Clone)]
pub struct PlannedEdit {
    pub path: PathBuf,
    pub original: String,
    pub modified: String,
    pub details: Vec<ChangeDetail>,
    pub warning: Option<String>,
}

impl PlannedEdit {
    pub fn new(path: impl Into<PathBuf>, original: String, modified: String) -> Self {
        Self {
            path: fsio::normalize_path(&path.into()),
            original,
            modified,
            details: Vec::new(),
            warning: None,
        }
    }

    pub fn with_details(mut self, details: Vec<ChangeDetail>) -> Self {
        self.details = details;
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }
}

/// A computed, not-yet-applied refactoring.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub instruction: String,
    pub edits: Vec<PlannedEdit>,
    pub suggestions: Vec<String>,
}

impl Plan {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            edits: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn push(&mut self, edit: PlannedEdit) {
        self.edits.push(edit);
    }

    pub fn suggest(&mut self, suggestion: impl Into<String>) {
        self.suggestions.push(suggestion.into());
    }

    fn effective_edits(&self) -> impl Iterator<Item = &PlannedEdit> {
        self.edits.iter().filter(|e| e.original != e.modified)
    }
}

/// The common contract for every refactoring operation.
pub trait RefactoringOperation {
    /// Operation name as exposed on the tool boundary.
    fn name(&self) -> &'static str;

    /// Total validation of the parameter struct; no side effects.
    fn validate_params(&self) -> Result<()>;

    /// Compute the full set of edits. Must not write files.
    fn plan(&self, ctx: &RefactorContext) -> Result<Plan>;
}

/// Render a plan as a preview result without touching disk.
pub fn preview(op: &dyn RefactoringOperation, ctx: &RefactorContext) -> Result<RefactoringResult> {
    op.validate_params()?;
    let plan = op.plan(ctx)?;
    let mut changes = Vec::new();
    let mut summary = DiffSummary::default();
    for edit in plan.effective_edits() {
        let name = edit.path.to_string_lossy();
        let diff = unified_diff(&name, &edit.original, &edit.modified);
        summary.merge(&DiffSummary::from_contents(&edit.original, &edit.modified));
        changes.push(FileChange {
            path: edit.path.clone(),
            occurrences: edit.details.len(),
            details: edit.details.clone(),
            access_token: None,
            unified_diff: Some(diff),
            crc: None,
            line_count: None,
            warning: edit.warning.clone(),
        });
    }
    let total_changes = changes.iter().map(|c| c.occurrences).sum();
    Ok(RefactoringResult {
        status: RefactoringStatus::Preview,
        transaction_id: None,
        changes,
        suggestions: plan.suggestions,
        total_changes,
        message: format!("{}: {}", op.name(), summary),
    })
}

/// Apply a plan transactionally: open a transaction over every touched
/// file, write atomically, refresh cache/index/snapshots, commit. Any
/// failure rolls every file back.
pub fn execute(op: &dyn RefactoringOperation, ctx: &RefactorContext) -> Result<RefactoringResult> {
    op.validate_params()?;
    let plan = op.plan(ctx)?;
    let edits: Vec<&PlannedEdit> = plan.effective_edits().collect();
    if edits.is_empty() {
        return Ok(RefactoringResult {
            status: RefactoringStatus::Success,
            transaction_id: None,
            changes: Vec::new(),
            suggestions: plan.suggestions,
            total_changes: 0,
            message: format!("{}: nothing to change", op.name()),
        });
    }

    let files: Vec<PathBuf> = edits.iter().map(|e| e.path.clone()).collect();
    let txn_id = ctx.txns.begin(&plan.instruction, &files)?;

    let mut written: Vec<&PlannedEdit> = Vec::new();
    for &edit in &edits {
        match fsio::write_atomic(&edit.path, &edit.modified) {
            Ok(()) => written.push(edit),
            Err(e) => {
                debug!("apply failed on {}, rolling back: {e}", edit.path.display());
                ctx.txns.rollback(&txn_id)?;
                for rolled in &files {
                    ctx.cache.invalidate(rolled);
                }
                return Err(e);
            }
        }
    }

    let mut changes = Vec::new();
    let mut summary = DiffSummary::default();
    for edit in &written {
        ctx.tracker
            .record_write(&edit.path, &edit.original, &edit.modified, &plan.instruction);
        ctx.cache.invalidate(&edit.path);
        if ctx.index.is_indexed() {
            let _ = ctx.index.invalidate_file(&edit.path);
        }
        let name = edit.path.to_string_lossy();
        let line_count = fsio::count_lines(&edit.modified);
        let token =
            AccessToken::issue(&edit.path, &edit.modified, 1, line_count.max(1)).encode();
        summary.merge(&DiffSummary::from_contents(&edit.original, &edit.modified));
        changes.push(FileChange {
            path: edit.path.clone(),
            occurrences: edit.details.len(),
            details: edit.details.clone(),
            access_token: Some(token),
            unified_diff: Some(unified_diff(&name, &edit.original, &edit.modified)),
            crc: Some(crc32c::crc32c(edit.modified.as_bytes())),
            line_count: Some(line_count),
            warning: edit.warning.clone(),
        });
    }

    ctx.txns.commit(&txn_id)?;
    let total_changes = changes.iter().map(|c| c.occurrences).sum();
    Ok(RefactoringResult {
        status: RefactoringStatus::Success,
        transaction_id: Some(txn_id),
        changes,
        suggestions: plan.suggestions,
        total_changes,
        message: format!("{}: {}", op.name(), summary),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CodeNavError, ErrorCode};
    use std::fs;

    struct Managers {
        cache: ParseCache,
        index: SymbolIndex,
        tracker: ChangeTracker,
        txns: TransactionManager,
    }

    impl Managers {
        fn new() -> Self {
            Self {
                cache: ParseCache::new(),
                index: SymbolIndex::new(),
                tracker: ChangeTracker::new(),
                txns: TransactionManager::new(),
            }
        }

        fn ctx(&self) -> RefactorContext<'_> {
            RefactorContext {
                cache: &self.cache,
                index: &self.index,
                tracker: &self.tracker,
                txns: &self.txns,
            }
        }
    }

    struct FixedOp {
        edits: Vec<PlannedEdit>,
        fail_validation: bool,
    }

    impl RefactoringOperation for FixedOp {
        fn name(&self) -> &'static str {
            "Fixed"
        }

        fn validate_params(&self) -> Result<()> {
            if self.fail_validation {
                return Err(CodeNavError::envelope(ErrorCode::ParamMissing, "missing"));
            }
            Ok(())
        }

        fn plan(&self, _ctx: &RefactorContext) -> Result<Plan> {
            let mut plan = Plan::new("fixed edit");
            for edit in &self.edits {
                plan.push(edit.clone());
            }
            Ok(plan)
        }
    }

    #[test]
    fn test_preview_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "old\n").unwrap();

        let managers = Managers::new();
        let op = FixedOp {
            edits: vec![PlannedEdit::new(&path, "old\n".into(), "new\n".into())],
            fail_validation: false,
        };
        let result = preview(&op, &managers.ctx()).unwrap();
        assert_eq!(result.status, RefactoringStatus::Preview);
        assert!(result.changes[0].unified_diff.as_deref().unwrap().contains("-old"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "old\n");
    }

    #[test]
    fn test_execute_writes_and_issues_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "old\n").unwrap();

        let managers = Managers::new();
        let op = FixedOp {
            edits: vec![PlannedEdit::new(&path, "old\n".into(), "new\n".into())],
            fail_validation: false,
        };
        let result = execute(&op, &managers.ctx()).unwrap();
        assert_eq!(result.status, RefactoringStatus::Success);
        assert!(result.transaction_id.is_some());
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");

        let change = &result.changes[0];
        assert_eq!(change.crc, Some(crc32c::crc32c(b"new\n")));
        let token = AccessToken::decode(change.access_token.as_deref().unwrap()).unwrap();
        assert_eq!(token.range_crc, crc32c::crc32c(b"new\n"));

        // Snapshot refreshed: a follow-up read sees no external change.
        assert_eq!(
            managers.tracker.observe_read(&path, "new\n"),
            crate::changes::ReadObservation::Unchanged
        );
    }

    #[test]
    fn test_validation_short_circuits() {
        let managers = Managers::new();
        let op = FixedOp {
            edits: Vec::new(),
            fail_validation: true,
        };
        let err = execute(&op, &managers.ctx()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParamMissing);
    }

    #[test]
    fn test_noop_edits_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "same\n").unwrap();

        let managers = Managers::new();
        let op = FixedOp {
            edits: vec![PlannedEdit::new(&path, "same\n".into(), "same\n".into())],
            fail_validation: false,
        };
        let result = execute(&op, &managers.ctx()).unwrap();
        assert_eq!(result.total_changes, 0);
        assert!(result.changes.is_empty());
    }
}
