//! External-change tracking and the session undo journal.
//!
//! The tracker keeps one full-content snapshot per touched file. On every
//! read, a CRC mismatch against the snapshot means some other process wrote
//! the file between our operations; the previous content is journaled as an
//! `[EXTERNAL]` entry before the snapshot is refreshed, so external edits
//! participate in undo like our own.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::error::{CodeNavError, ErrorCode, Result};
use crate::fsio;

/// Bound on retained journal entries per session.
const JOURNAL_CAP: usize = 200;

/// Per-file content snapshot.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    pub content: String,
    pub crc: u32,
    pub encoding: String,
    pub line_count: u32,
    pub captured_at: SystemTime,
}

impl FileSnapshot {
    fn capture(content: &str) -> Self {
        Self {
            content: content.to_string(),
            crc: crc32c::crc32c(content.as_bytes()),
            encoding: "UTF-8".to_string(),
            line_count: fsio::count_lines(content),
            captured_at: SystemTime::now(),
        }
    }
}

/// Where a journaled change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    Tool,
    External,
}

/// One undoable change: the file's content before the change.
#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub seq: u64,
    pub origin: ChangeOrigin,
    pub path: PathBuf,
    pub backup: String,
    pub instruction: String,
    pub at: SystemTime,
}

impl JournalEntry {
    /// One-line rendering for journal listings.
    pub fn describe(&self) -> String {
        let tag = match self.origin {
            ChangeOrigin::Tool => "",
            ChangeOrigin::External => "[EXTERNAL] ",
        };
        format!("#{} {}{} ({})", self.seq, tag, self.instruction, self.path.display())
    }
}

/// Outcome of observing a read against the snapshot map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadObservation {
    FirstRead,
    Unchanged,
    ExternalChange,
}

/// Session-scoped snapshot map plus a bounded, totally ordered journal.
#[derive(Default)]
pub struct ChangeTracker {
    snapshots: Mutex<HashMap<PathBuf, FileSnapshot>>,
    journal: Mutex<VecDeque<JournalEntry>>,
    next_seq: Mutex<u64>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a successful read of `content` from `path`. Detects and
    /// journals external modifications.
    pub fn observe_read(&self, path: &Path, content: &str) -> ReadObservation {
        let path = fsio::normalize_path(path);
        let mut snapshots = self.snapshots.lock();
        match snapshots.get(&path) {
            None => {
                snapshots.insert(path, FileSnapshot::capture(content));
                ReadObservation::FirstRead
            }
            Some(snapshot) if snapshot.crc == crc32c::crc32c(content.as_bytes()) => {
                ReadObservation::Unchanged
            }
            Some(snapshot) => {
                let backup = snapshot.content.clone();
                snapshots.insert(path.clone(), FileSnapshot::capture(content));
                drop(snapshots);
                self.append(
                    ChangeOrigin::External,
                    path,
                    backup,
                    "external modification detected".to_string(),
                );
                ReadObservation::ExternalChange
            }
        }
    }

    /// Refresh the snapshot after a write performed by this process, and
    /// journal the pre-write content for undo.
    pub fn record_write(&self, path: &Path, previous: &str, new_content: &str, instruction: &str) {
        let path = fsio::normalize_path(path);
        self.snapshots
            .lock()
            .insert(path.clone(), FileSnapshot::capture(new_content));
        self.append(
            ChangeOrigin::Tool,
            path,
            previous.to_string(),
            instruction.to_string(),
        );
    }

    /// Refresh the snapshot without journaling (rollbacks and undo writes).
    pub fn refresh_snapshot(&self, path: &Path, content: &str) {
        let path = fsio::normalize_path(path);
        self.snapshots.lock().insert(path, FileSnapshot::capture(content));
    }

    /// The snapshot travels with a renamed file.
    pub fn on_rename(&self, from: &Path, to: &Path) {
        let from = fsio::normalize_path(from);
        let to = fsio::normalize_path(to);
        let mut snapshots = self.snapshots.lock();
        if let Some(snapshot) = snapshots.remove(&from) {
            snapshots.insert(to, snapshot);
        }
    }

    /// A deleted file's snapshot is discarded.
    pub fn on_delete(&self, path: &Path) {
        let path = fsio::normalize_path(path);
        self.snapshots.lock().remove(&path);
    }

    pub fn snapshot(&self, path: &Path) -> Option<FileSnapshot> {
        let path = fsio::normalize_path(path);
        self.snapshots.lock().get(&path).cloned()
    }

    fn append(&self, origin: ChangeOrigin, path: PathBuf, backup: String, instruction: String) {
        let mut seq = self.next_seq.lock();
        *seq += 1;
        let entry = JournalEntry {
            seq: *seq,
            origin,
            path,
            backup,
            instruction,
            at: SystemTime::now(),
        };
        let mut journal = self.journal.lock();
        journal.push_back(entry);
        while journal.len() > JOURNAL_CAP {
            journal.pop_front();
        }
    }

    /// Pop the most recent journal entry for undo.
    pub fn take_last(&self) -> Result<JournalEntry> {
        self.journal.lock().pop_back().ok_or_else(|| {
            CodeNavError::envelope(ErrorCode::NothingToUndo, "The undo journal is empty")
        })
    }

    /// The journal, oldest first.
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.journal.lock().iter().cloned().collect()
    }
}
