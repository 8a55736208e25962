//! Project-wide symbol index: an inverted map from symbol name to
//! declaration sites with per-file CRC validation.
//!
//! Queries never return stale rows: a record is visible only while the CRC
//! it was built from is still the index's current CRC for its file, so
//! out-of-date entries vanish without a compaction pass.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::extract;
use crate::fsio;
use crate::parse::{self, ParseResult};
use crate::project;
use crate::symbols::SymbolKind;

/// Files larger than this are not indexed.
pub const MAX_INDEX_FILE_BYTES: u64 = 2 * 1024 * 1024;
/// Hard cap on indexed files per build.
pub const MAX_INDEX_FILES: usize = 5_000;
/// Wall-clock budget for one build.
pub const INDEX_DEADLINE: Duration = Duration::from_secs(120);

/// One declaration site as stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub file: PathBuf,
    pub start_line: u32,
    pub end_line: u32,
    pub parent_name: Option<String>,
    pub file_crc: u32,
}

/// Outcome of an index build.
#[derive(Debug, Clone)]
pub struct IndexingResult {
    pub success: bool,
    pub files_indexed: usize,
    pub symbols_indexed: usize,
    pub duration: Duration,
    pub message: String,
}

/// Concurrent name → sites index with a file → names reverse map.
#[derive(Default)]
pub struct SymbolIndex {
    symbols_by_name: RwLock<HashMap<String, Vec<IndexedSymbol>>>,
    names_by_file: RwLock<HashMap<PathBuf, HashSet<String>>>,
    file_crcs: RwLock<HashMap<PathBuf, u32>>,
    indexing: AtomicBool,
    indexed: AtomicBool,
    indexed_files: AtomicUsize,
    total_files: AtomicUsize,
    indexed_root: Mutex<Option<PathBuf>>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index for `root`. Returns immediately when a build is in
    /// flight, and cheaply when the same root is already indexed.
    pub fn index_project(&self, root: &Path) -> IndexingResult {
        let root = fsio::normalize_path(root);
        if self.indexing.swap(true, Ordering::SeqCst) {
            return IndexingResult {
                success: false,
                files_indexed: 0,
                symbols_indexed: 0,
                duration: Duration::ZERO,
                message: "Indexing already in progress".to_string(),
            };
        }
        if self.indexed.load(Ordering::SeqCst)
            && self.indexed_root.lock().as_deref() == Some(&root)
        {
            self.indexing.store(false, Ordering::SeqCst);
            return IndexingResult {
                success: true,
                files_indexed: self.indexed_files.load(Ordering::SeqCst),
                symbols_indexed: self.symbol_count(),
                duration: Duration::ZERO,
                message: "Already indexed".to_string(),
            };
        }

        let started = Instant::now();
        self.clear_maps();
        self.indexed_files.store(0, Ordering::SeqCst);

        let files = project::collect_files(&root, None, MAX_INDEX_FILES, MAX_INDEX_FILE_BYTES)
            .unwrap_or_default();
        self.total_files.store(files.len(), Ordering::SeqCst);

        let deadline = started + INDEX_DEADLINE;
        let timed_out = AtomicBool::new(false);
        files.par_iter().for_each(|file| {
            // Deadline: in-flight work finishes, nothing new starts.
            if Instant::now() >= deadline {
                timed_out.store(true, Ordering::Relaxed);
                return;
            }
            self.index_file(file);
            self.indexed_files.fetch_add(1, Ordering::Relaxed);
        });

        *self.indexed_root.lock() = Some(root);
        self.indexed.store(true, Ordering::SeqCst);
        self.indexing.store(false, Ordering::SeqCst);

        let files_indexed = self.indexed_files.load(Ordering::SeqCst);
        let symbols_indexed = self.symbol_count();
        let partial = timed_out.load(Ordering::Relaxed);
        IndexingResult {
            success: true,
            files_indexed,
            symbols_indexed,
            duration: started.elapsed(),
            message: if partial {
                format!("Indexed {files_indexed} files (partial: deadline reached)")
            } else {
                format!("Indexed {files_indexed} files, {symbols_indexed} symbols")
            },
        }
    }

    /// Build asynchronously on a background thread.
    pub fn index_project_async(
        self: &Arc<Self>,
        root: PathBuf,
    ) -> std::thread::JoinHandle<IndexingResult> {
        let index = Arc::clone(self);
        std::thread::spawn(move || index.index_project(&root))
    }

    fn index_file(&self, file: &Path) {
        let content = match fsio::read_text(file, MAX_INDEX_FILE_BYTES) {
            Ok(c) => c,
            Err(e) => {
                debug!("index skipping {}: {e}", file.display());
                return;
            }
        };
        let crc = crc32c::crc32c(content.as_bytes());
        let file = fsio::normalize_path(file);
        let Some(lang) = crate::lang::detect_with_content(&file, content.as_bytes()) else {
            return;
        };
        let tree = match parse::parse_source(&content, lang) {
            Ok(tree) => tree,
            Err(e) => {
                // "No symbols for this file", but the CRC is recorded so a
                // retry will not reparse.
                debug!("index parse failure for {}: {e}", file.display());
                self.file_crcs.write().insert(file, crc);
                return;
            }
        };
        let parsed = ParseResult {
            tree,
            content,
            lang,
            crc32c: crc,
        };
        let defs = extract::extract_definitions(&parsed, &file);
        let mut names = HashSet::new();
        {
            let mut by_name = self.symbols_by_name.write();
            for def in defs {
                if !def.kind.is_definition() {
                    continue;
                }
                names.insert(def.name.clone());
                by_name.entry(def.name.clone()).or_default().push(IndexedSymbol {
                    name: def.name,
                    kind: def.kind,
                    file: file.clone(),
                    start_line: def.location.start_line,
                    end_line: def.location.end_line,
                    parent_name: def.parent_name,
                    file_crc: crc,
                });
            }
        }
        self.names_by_file.write().insert(file.clone(), names);
        self.file_crcs.write().insert(file, crc);
    }

    /// Drop a file's contributions, then re-index it if it still exists.
    pub fn invalidate_file(&self, path: &Path) -> Result<()> {
        let path = fsio::normalize_path(path);
        let names = self.names_by_file.write().remove(&path).unwrap_or_default();
        {
            let mut by_name = self.symbols_by_name.write();
            for name in &names {
                if let Some(rows) = by_name.get_mut(name) {
                    rows.retain(|s| s.file != path);
                    if rows.is_empty() {
                        by_name.remove(name);
                    }
                }
            }
        }
        self.file_crcs.write().remove(&path);
        if path.exists() {
            self.index_file(&path);
        }
        Ok(())
    }

    /// All currently valid definitions of `name`, sorted by site.
    pub fn find_definitions(&self, name: &str) -> Vec<IndexedSymbol> {
        let crcs = self.file_crcs.read();
        let mut rows: Vec<IndexedSymbol> = self
            .symbols_by_name
            .read()
            .get(name)
            .map(|rows| {
                rows.iter()
                    .filter(|s| crcs.get(&s.file) == Some(&s.file_crc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by(|a, b| (&a.file, a.start_line).cmp(&(&b.file, b.start_line)));
        rows
    }

    pub fn find_first_definition(&self, name: &str) -> Option<IndexedSymbol> {
        self.find_definitions(name).into_iter().next()
    }

    /// Distinct files holding a valid definition of `name`.
    pub fn find_files_containing_symbol(&self, name: &str) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .find_definitions(name)
            .into_iter()
            .map(|s| s.file)
            .collect();
        files.sort();
        files.dedup();
        files
    }

    pub fn clear(&self) {
        self.clear_maps();
        self.indexed.store(false, Ordering::SeqCst);
        self.indexed_files.store(0, Ordering::SeqCst);
        self.total_files.store(0, Ordering::SeqCst);
        *self.indexed_root.lock() = None;
    }

    fn clear_maps(&self) {
        self.symbols_by_name.write().clear();
        self.names_by_file.write().clear();
        self.file_crcs.write().clear();
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed.load(Ordering::SeqCst)
    }

    pub fn is_indexing(&self) -> bool {
        self.indexing.load(Ordering::SeqCst)
    }

    /// Build progress as `(indexed, total)`.
    pub fn progress(&self) -> (usize, usize) {
        (
            self.indexed_files.load(Ordering::SeqCst),
            self.total_files.load(Ordering::SeqCst),
        )
    }

    pub fn indexed_root(&self) -> Option<PathBuf> {
        self.indexed_root.lock().clone()
    }

    /// The current CRC recorded for a file, if any.
    pub fn file_crc(&self, path: &Path) -> Option<u32> {
        self.file_crcs.read().get(&fsio::normalize_path(path)).copied()
    }

    fn symbol_count(&self) -> usize {
        self.symbols_by_name.read().values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"t\"\n").unwrap();
        fs::write(
            dir.path().join("Foo.java"),
            "package a;\npublic class Foo { public int bar(int x) { return x; } }\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("util.py"),
            "def helper():\n    return 1\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_index_build_and_lookup() {
        let dir = project();
        let index = SymbolIndex::new();
        let result = index.index_project(dir.path());
        assert!(result.success);
        assert_eq!(result.files_indexed, 2);

        let foos = index.find_definitions("Foo");
        assert_eq!(foos.len(), 1);
        assert_eq!(foos[0].kind, SymbolKind::Class);
        assert!(foos[0].kind.is_definition());

        assert!(index.find_first_definition("helper").is_some());
        assert!(index.find_definitions("missing").is_empty());
    }

    #[test]
    fn test_reindex_same_root_is_cheap() {
        let dir = project();
        let index = SymbolIndex::new();
        index.index_project(dir.path());
        let again = index.index_project(dir.path());
        assert!(again.success);
        assert_eq!(again.message, "Already indexed");
    }

    #[test]
    fn test_stale_rows_are_invisible() {
        let dir = project();
        let index = SymbolIndex::new();
        index.index_project(dir.path());
        assert_eq!(index.find_definitions("Foo").len(), 1);

        // Rewriting the file without reindexing makes its rows invalid.
        let path = dir.path().join("Foo.java");
        fs::write(&path, "public class Renamed {}\n").unwrap();
        index.file_crcs.write().insert(
            fsio::normalize_path(&path),
            crc32c::crc32c(fs::read(&path).unwrap().as_slice()),
        );
        assert!(index.find_definitions("Foo").is_empty());
    }

    #[test]
    fn test_invalidate_file_refreshes() {
        let dir = project();
        let index = SymbolIndex::new();
        index.index_project(dir.path());

        let path = dir.path().join("Foo.java");
        fs::write(&path, "public class Renamed {}\n").unwrap();
        index.invalidate_file(&path).unwrap();

        assert!(index.find_definitions("Foo").is_empty());
        let renamed = index.find_definitions("Renamed");
        assert_eq!(renamed.len(), 1);
        assert_eq!(
            renamed[0].file_crc,
            index.file_crc(&path).unwrap()
        );
    }

    #[test]
    fn test_invalidate_deleted_file() {
        let dir = project();
        let index = SymbolIndex::new();
        index.index_project(dir.path());
        let path = dir.path().join("util.py");
        fs::remove_file(&path).unwrap();
        index.invalidate_file(&path).unwrap();
        assert!(index.find_definitions("helper").is_empty());
        assert!(index.find_files_containing_symbol("helper").is_empty());
    }

    #[test]
    fn test_clear() {
        let dir = project();
        let index = SymbolIndex::new();
        index.index_project(dir.path());
        index.clear();
        assert!(!index.is_indexed());
        assert!(index.find_definitions("Foo").is_empty());
    }
}
