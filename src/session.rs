//! Session context: one owner for the cache, index, change tracker and
//! transaction manager, scoped to a project root.
//!
//! Everything the tool boundary touches flows through here, so token
//! issuance, external-change detection and undo stay consistent across
//! operations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::changes::{ChangeTracker, ReadObservation};
use crate::error::{CodeNavError, ErrorCode, ErrorEnvelope, Result};
use crate::fsio;
use crate::index::{IndexingResult, SymbolIndex};
use crate::parse::{MAX_FILE_BYTES, ParseCache};
use crate::refactor::{RefactorContext, RefactoringOperation, RefactoringResult};
use crate::resolve::Resolver;
use crate::tokens::AccessToken;

/// Result of a gated read: the requested text plus the token that will
/// authorize an edit of the same range.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResult {
    pub path: PathBuf,
    pub start_line: u32,
    pub end_line: u32,
    pub text: String,
    pub access_token: String,
    pub line_count: u32,
    pub crc: u32,
    /// Set when the file changed outside this process since our last look.
    pub external_change: bool,
}

/// Result of a token-gated write.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    pub path: PathBuf,
    pub access_token: String,
    pub line_count: u32,
    pub crc: u32,
}

/// A session over one project tree.
pub struct Session {
    root: PathBuf,
    cache: ParseCache,
    index: Arc<SymbolIndex>,
    tracker: ChangeTracker,
    txns: crate::txn::TransactionManager,
}

impl Session {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: fsio::normalize_path(&root.into()),
            cache: ParseCache::new(),
            index: Arc::new(SymbolIndex::new()),
            tracker: ChangeTracker::new(),
            txns: crate::txn::TransactionManager::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache(&self) -> &ParseCache {
        &self.cache
    }

    pub fn index(&self) -> &SymbolIndex {
        &self.index
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.cache, &self.index)
    }

    pub fn refactor_ctx(&self) -> RefactorContext<'_> {
        RefactorContext {
            cache: &self.cache,
            index: &self.index,
            tracker: &self.tracker,
            txns: &self.txns,
        }
    }

    /// Resolve a path against the root and refuse escapes.
    pub fn checked_path(&self, path: &Path) -> Result<PathBuf> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let normalized = fsio::normalize_path(&joined);
        if !normalized.starts_with(&self.root) {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(
                    ErrorCode::ParamInvalid,
                    format!("{} escapes the project root", path.display()),
                )
                .with_context("path", path.display().to_string()),
            ));
        }
        Ok(normalized)
    }

    /// Read a line range (whole file when `lines` is `None`), issuing an
    /// access token and detecting external changes.
    pub fn read_file(&self, path: &Path, lines: Option<(u32, u32)>) -> Result<ReadResult> {
        let path = self.checked_path(path)?;
        let content = fsio::read_text(&path, MAX_FILE_BYTES)?;
        let observation = self.tracker.observe_read(&path, &content);
        let line_count = fsio::count_lines(&content);
        let (start, end) = match lines {
            Some((start, end)) => {
                if start == 0 || end < start {
                    return Err(CodeNavError::envelope(
                        ErrorCode::ParamOutOfRange,
                        format!("Invalid range {start}..{end}"),
                    ));
                }
                if start > line_count {
                    return Err(CodeNavError::Tool(
                        ErrorEnvelope::new(
                            ErrorCode::ParamLineExceeds,
                            format!("Range starts at line {start}, file has {line_count} lines"),
                        )
                        .with_context("lineCount", line_count.to_string()),
                    ));
                }
                (start, end.min(line_count))
            }
            None => (1, line_count.max(1)),
        };
        let text = fsio::line_range(&content, start, end).unwrap_or("").to_string();
        let token = AccessToken::issue(&path, &content, start, end);
        Ok(ReadResult {
            path,
            start_line: start,
            end_line: end,
            text,
            access_token: token.encode(),
            line_count,
            crc: crc32c::crc32c(content.as_bytes()),
            external_change: observation == ReadObservation::ExternalChange,
        })
    }

    /// Replace lines `start..=end` with `new_text`, gated by an access
    /// token covering the range. Writes are serialized per path through
    /// the transaction manager.
    pub fn write_range(
        &self,
        path: &Path,
        token: Option<&str>,
        start: u32,
        end: u32,
        new_text: &str,
    ) -> Result<WriteResult> {
        let path = self.checked_path(path)?;
        let raw = token.ok_or_else(|| {
            CodeNavError::envelope(
                ErrorCode::TokenRequired,
                "This edit requires an access token from a prior read",
            )
        })?;
        let token = AccessToken::decode(raw)?;
        let content = fsio::read_text(&path, MAX_FILE_BYTES)?;
        if self.tracker.observe_read(&path, &content) == ReadObservation::ExternalChange {
            return Err(CodeNavError::envelope(
                ErrorCode::TokenExternalChange,
                format!(
                    "{} was modified externally; re-read it before editing",
                    path.display()
                ),
            ));
        }
        token.validate(&path, &content, start, end)?;

        let line_count = fsio::count_lines(&content);
        if end > line_count {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(
                    ErrorCode::ParamLineExceeds,
                    format!("Edit ends at line {end}, file has {line_count} lines"),
                )
                .with_context("lineCount", line_count.to_string()),
            ));
        }

        let txn = self.txns.begin("range edit", std::slice::from_ref(&path))?;
        let mut lines: Vec<String> = content.lines().map(String::from).collect();
        let replacement: Vec<String> = new_text.lines().map(String::from).collect();
        lines.splice(start as usize - 1..end as usize, replacement);
        let mut modified = lines.join("\n");
        if content.ends_with('\n') && !modified.is_empty() {
            modified.push('\n');
        }
        if let Err(e) = fsio::write_atomic(&path, &modified) {
            self.txns.rollback(&txn)?;
            return Err(e);
        }
        self.txns.commit(&txn)?;

        self.tracker.record_write(&path, &content, &modified, "range edit");
        self.cache.invalidate(&path);
        if self.index.is_indexed() {
            self.index.invalidate_file(&path)?;
        }

        let new_count = fsio::count_lines(&modified);
        Ok(WriteResult {
            path: path.clone(),
            access_token: AccessToken::issue(&path, &modified, 1, new_count.max(1)).encode(),
            line_count: new_count,
            crc: crc32c::crc32c(modified.as_bytes()),
        })
    }

    /// Undo the most recent journaled change, external ones included.
    pub fn undo_last(&self) -> Result<PathBuf> {
        let entry = self.tracker.take_last()?;
        fsio::write_atomic(&entry.path, &entry.backup)?;
        self.tracker.refresh_snapshot(&entry.path, &entry.backup);
        self.cache.invalidate(&entry.path);
        if self.index.is_indexed() {
            self.index.invalidate_file(&entry.path)?;
        }
        Ok(entry.path)
    }

    /// The journal, oldest first, rendered one line per entry.
    pub fn journal(&self) -> Vec<String> {
        self.tracker.entries().iter().map(|e| e.describe()).collect()
    }

    /// Build the symbol index for this session's root, blocking.
    pub fn index_project(&self) -> IndexingResult {
        self.index.index_project(&self.root)
    }

    /// Build the symbol index on a background thread.
    pub fn index_project_async(&self) -> std::thread::JoinHandle<IndexingResult> {
        self.index.index_project_async(self.root.clone())
    }

    /// Preview a refactoring operation (no writes).
    pub fn preview(&self, op: &dyn RefactoringOperation) -> Result<RefactoringResult> {
        crate::refactor::preview(op, &self.refactor_ctx())
    }

    /// Execute a refactoring operation transactionally.
    pub fn execute(&self, op: &dyn RefactoringOperation) -> Result<RefactoringResult> {
        crate::refactor::execute(op, &self.refactor_ctx())
    }
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
    fn test_read_issues_matching_token() {
        let (dir, session) = session();
        let file = dir.path().join("a.rs");
        fs::write(&file, "fn a() {}\nfn b() {}\n").unwrap();

        let read = session.read_file(&file, Some((1, 1))).unwrap();
        assert_eq!(read.text, "fn a() {}\n");
        assert_eq!(read.line_count, 2);
        assert!(!read.external_change);

        let token = AccessToken::decode(&read.access_token).unwrap();
        assert_eq!(token.range_crc, crc32c::crc32c(b"fn a() {}\n"));
    }

    #[test]
    fn test_sandbox_rejects_escape() {
        let (_dir, session) = session();
        let err = session.read_file(Path::new("../outside.rs"), None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParamInvalid);
    }

    #[test]
    fn test_write_requires_token() {
        let (dir, session) = session();
        let file = dir.path().join("a.rs");
        fs::write(&file, "fn a() {}\n").unwrap();
        let err = session
            .write_range(&file, None, 1, 1, "fn z() {}")
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenRequired);
    }

    #[test]
    fn test_gated_write_roundtrip() {
        let (dir, session) = session();
        let file = dir.path().join("a.rs");
        fs::write(&file, "fn a() {}\nfn b() {}\n").unwrap();

        let read = session.read_file(&file, Some((1, 2))).unwrap();
        let write = session
            .write_range(&file, Some(&read.access_token), 1, 1, "fn renamed() {}")
            .unwrap();
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "fn renamed() {}\nfn b() {}\n"
        );
        assert_eq!(write.crc, crc32c::crc32c(b"fn renamed() {}\nfn b() {}\n"));

        // The stale token no longer validates.
        let err = session
            .write_range(&file, Some(&read.access_token), 1, 1, "fn again() {}")
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenExpired);
    }

    #[test]
    fn test_external_change_detected_and_undone() {
        let (dir, session) = session();
        let file = dir.path().join("a.rs");
        fs::write(&file, "fn original() {}\n").unwrap();
        session.read_file(&file, None).unwrap();

        // Out-of-band edit between two session operations.
        fs::write(&file, "fn clobbered() {}\n").unwrap();
        let read = session.read_file(&file, None).unwrap();
        assert!(read.external_change);
        assert!(session.journal().iter().any(|e| e.contains("[EXTERNAL]")));

        let restored = session.undo_last().unwrap();
        assert_eq!(restored, fsio::normalize_path(&file));
        assert_eq!(fs::read_to_string(&file).unwrap(), "fn original() {}\n");
    }

    #[test]
    fn test_undo_after_write() {
        let (dir, session) = session();
        let file = dir.path().join("a.py");
        fs::write(&file, "x = 1\n").unwrap();
        let read = session.read_file(&file, None).unwrap();
        session
            .write_range(&file, Some(&read.access_token), 1, 1, "x = 2")
            .unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "x = 2\n");
        session.undo_last().unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "x = 1\n");
    }

    #[test]
    fn test_cache_consistency_after_write() {
        let (dir, session) = session();
        let file = dir.path().join("a.py");
        fs::write(&file, "def f():\n    return 1\n").unwrap();
        session.resolver().list_symbols(&file).unwrap();
        assert!(session.cache().is_cached(&file));

        let read = session.read_file(&file, None).unwrap();
        session
            .write_range(&file, Some(&read.access_token), 2, 2, "    return 2")
            .unwrap();
        // Either evicted or refreshed to the new bytes.
        if let Some(crc) = session.cache().cached_crc(&file) {
            assert_eq!(crc, crc32c::crc32c(fs::read(&file).unwrap().as_slice()));
        }
    }

    #[test]
    fn test_index_lifecycle() {
        let (dir, session) = session();
        fs::write(dir.path().join("lib.rs"), "pub fn seed() {}\n").unwrap();
        let result = session.index_project();
        assert!(result.success);
        assert!(session.index().find_first_definition("seed").is_some());

        let handle = session.index_project_async();
        let second = handle.join().unwrap();
        assert!(second.success);
        assert_eq!(second.message, "Already indexed");
    }
}
