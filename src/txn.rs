//! Refactoring transactions: per-file locks, byte-image backups, and
//! all-or-nothing commit/rollback.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{CodeNavError, ErrorCode, Result};
use crate::fsio;

/// Global cap on files one transaction may touch.
pub const MAX_TRANSACTION_FILES: usize = 1_000;

/// A single refactoring invocation's unit of work.
#[derive(Debug)]
pub struct Transaction {
    pub id: String,
    pub instruction: String,
    /// Pre-edit byte images; `None` marks a file that did not exist yet.
    pub backups: HashMap<PathBuf, Option<Vec<u8>>>,
    pub created_at: SystemTime,
}

/// Serializes file access across transactions. Overlapping file sets do not
/// run concurrently.
#[derive(Default)]
pub struct TransactionManager {
    locked: Mutex<HashSet<PathBuf>>,
    active: Mutex<HashMap<String, Transaction>>,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transaction over `files`, capturing backups. Fails when the
    /// scope cap is exceeded or another transaction holds any of the files.
    pub fn begin(&self, instruction: &str, files: &[PathBuf]) -> Result<String> {
        if files.len() > MAX_TRANSACTION_FILES {
            return Err(CodeNavError::envelope(
                ErrorCode::RefactorScopeTooLarge,
                format!(
                    "Refactoring touches {} files, limit is {MAX_TRANSACTION_FILES}",
                    files.len()
                ),
            ));
        }
        let normalized: Vec<PathBuf> =
            files.iter().map(|f| fsio::normalize_path(f)).collect();
        {
            let mut locked = self.locked.lock();
            if let Some(busy) = normalized.iter().find(|f| locked.contains(*f)) {
                return Err(CodeNavError::envelope(
                    ErrorCode::FileLocked,
                    format!(
                        "{} is locked by another transaction",
                        busy.display()
                    ),
                ));
            }
            for file in &normalized {
                locked.insert(file.clone());
            }
        }

        let mut backups = HashMap::new();
        for file in &normalized {
            let image = match std::fs::read(file) {
                Ok(bytes) => Some(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => {
                    self.release(&normalized);
                    return Err(CodeNavError::Io(e));
                }
            };
            backups.insert(file.clone(), image);
        }

        let id = Uuid::new_v4().to_string();
        self.active.lock().insert(
            id.clone(),
            Transaction {
                id: id.clone(),
                instruction: instruction.to_string(),
                backups,
                created_at: SystemTime::now(),
            },
        );
        Ok(id)
    }

    /// Add a file to an open transaction, capturing its backup.
    pub fn extend(&self, txn_id: &str, file: &Path) -> Result<()> {
        let file = fsio::normalize_path(file);
        {
            let mut locked = self.locked.lock();
            if !locked.insert(file.clone()) {
                // Already held: fine if held by this transaction.
                let active = self.active.lock();
                let owned = active
                    .get(txn_id)
                    .is_some_and(|t| t.backups.contains_key(&file));
                if !owned {
                    return Err(CodeNavError::envelope(
                        ErrorCode::FileLocked,
                        format!("{} is locked by another transaction", file.display()),
                    ));
                }
                return Ok(());
            }
        }
        let image = match std::fs::read(&file) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(CodeNavError::Io(e)),
        };
        let mut active = self.active.lock();
        let txn = active.get_mut(txn_id).ok_or_else(|| {
            CodeNavError::envelope(ErrorCode::TaskNotFound, format!("No transaction {txn_id}"))
        })?;
        txn.backups.insert(file, image);
        Ok(())
    }

    /// Commit: discard backups, release locks.
    pub fn commit(&self, txn_id: &str) -> Result<()> {
        let txn = self.active.lock().remove(txn_id).ok_or_else(|| {
            CodeNavError::envelope(ErrorCode::TaskNotFound, format!("No transaction {txn_id}"))
        })?;
        let files: Vec<PathBuf> = txn.backups.keys().cloned().collect();
        self.release(&files);
        Ok(())
    }

    /// Roll back an open transaction, restoring every touched file to its
    /// backup image. Rolling back an already committed (unknown) id is a
    /// no-op.
    pub fn rollback(&self, txn_id: &str) -> Result<Vec<PathBuf>> {
        let Some(txn) = self.active.lock().remove(txn_id) else {
            return Ok(Vec::new());
        };
        let mut restored = Vec::new();
        for (path, image) in &txn.backups {
            match image {
                Some(bytes) => {
                    let text = String::from_utf8_lossy(bytes);
                    fsio::write_atomic(path, &text)?;
                }
                None => {
                    if path.exists() {
                        std::fs::remove_file(path)?;
                    }
                }
            }
            restored.push(path.clone());
        }
        let files: Vec<PathBuf> = txn.backups.keys().cloned().collect();
        self.release(&files);
        restored.sort();
        Ok(restored)
    }

    /// The backup image captured for a file, if the transaction is open.
    pub fn backup_of(&self, txn_id: &str, path: &Path) -> Option<Vec<u8>> {
        let path = fsio::normalize_path(path);
        self.active
            .lock()
            .get(txn_id)
            .and_then(|t| t.backups.get(&path).cloned())
            .flatten()
    }

    fn release(&self, files: &[PathBuf]) {
        let mut locked = self.locked.lock();
        for file in files {
            locked.remove(file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_commit_releases_locks() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "before").unwrap();

        let manager = TransactionManager::new();
        let id = manager.begin("edit a", &[file.clone()]).unwrap();
        manager.commit(&id).unwrap();

        // The file is free again.
        let id2 = manager.begin("edit a again", &[file]).unwrap();
        manager.commit(&id2).unwrap();
    }

    #[test]
    fn test_overlapping_transactions_fail() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "x").unwrap();

        let manager = TransactionManager::new();
        let _id = manager.begin("first", &[file.clone()]).unwrap();
        let err = manager.begin("second", &[file]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileLocked);
    }

    #[test]
    fn test_rollback_restores_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "original\n").unwrap();

        let manager = TransactionManager::new();
        let id = manager.begin("mutate", &[file.clone()]).unwrap();
        fs::write(&file, "clobbered\n").unwrap();
        let restored = manager.rollback(&id).unwrap();
        assert_eq!(restored, vec![fsio::normalize_path(&file)]);
        assert_eq!(fs::read_to_string(&file).unwrap(), "original\n");
    }

    #[test]
    fn test_rollback_removes_created_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("new.txt");

        let manager = TransactionManager::new();
        let id = manager.begin("create", &[file.clone()]).unwrap();
        fs::write(&file, "fresh\n").unwrap();
        manager.rollback(&id).unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn test_rollback_of_committed_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "kept\n").unwrap();

        let manager = TransactionManager::new();
        let id = manager.begin("edit", &[file.clone()]).unwrap();
        fs::write(&file, "edited\n").unwrap();
        manager.commit(&id).unwrap();

        let restored = manager.rollback(&id).unwrap();
        assert!(restored.is_empty());
        assert_eq!(fs::read_to_string(&file).unwrap(), "edited\n");
    }

    #[test]
    fn test_scope_cap() {
        let manager = TransactionManager::new();
        let files: Vec<PathBuf> = (0..=MAX_TRANSACTION_FILES)
            .map(|i| PathBuf::from(format!("/tmp/f{i}")))
            .collect();
        let err = manager.begin("huge", &files).unwrap_err();
        assert_eq!(err.code(), ErrorCode::RefactorScopeTooLarge);
    }

    #[test]
    fn test_extend_captures_backup() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "a\n").unwrap();
        fs::write(&b, "b\n").unwrap();

        let manager = TransactionManager::new();
        let id = manager.begin("multi", &[a]).unwrap();
        manager.extend(&id, &b).unwrap();
        fs::write(&b, "changed\n").unwrap();
        manager.rollback(&id).unwrap();
        assert_eq!(fs::read_to_string(&b).unwrap(), "b\n");
    }
}
