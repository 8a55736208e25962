//! Parser pooling and the bounded parse cache.
//!
//! Tree-sitter parsers are not safe for concurrent use, so the pool keeps
//! one parser per `(thread, language)` pair in thread-local storage. Parsed
//! trees are cached per absolute path and validated by content CRC on every
//! hit; a tree is never returned for bytes other than the ones it was parsed
//! from.

use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use tree_sitter::{Parser, Tree};

use crate::error::{CodeNavError, Result};
use crate::fsio;
use crate::lang::{self, LanguageId};

/// Files larger than this are refused outright.
pub const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;
/// Files longer than this parse fine but are not cached.
pub const MAX_CACHEABLE_LINES: u32 = 10_000;
/// Byte budget for cached trees (estimated).
const MAX_CACHE_BYTES: usize = 50 * 1024 * 1024;
/// Entry budget for cached trees.
const MAX_CACHE_ENTRIES: usize = 100;
/// Estimated AST size multiplier over source byte length.
const AST_SIZE_FACTOR: usize = 3;

thread_local! {
    static PARSERS: RefCell<HashMap<LanguageId, Parser>> = RefCell::new(HashMap::new());
}

/// Parse source text with this thread's pooled parser for `lang`.
pub fn parse_source(content: &str, lang: LanguageId) -> Result<Tree> {
    PARSERS.with(|cell| {
        let mut pool = cell.borrow_mut();
        let parser = match pool.entry(lang) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                let mut parser = Parser::new();
                parser
                    .set_language(&lang.grammar())
                    .map_err(|e| CodeNavError::Parse {
                        path: PathBuf::from("<source>"),
                        message: format!("Failed to set language {lang}: {e}"),
                    })?;
                slot.insert(parser)
            }
        };
        parser.parse(content, None).ok_or_else(|| CodeNavError::Parse {
            path: PathBuf::from("<source>"),
            message: format!("Parser returned no tree for {lang}"),
        })
    })
}

/// A parsed tree bundled with the exact bytes it was parsed from.
///
/// Node byte offsets are only meaningful against `content`, so the two
/// travel together.
#[derive(Clone)]
pub struct ParseResult {
    pub tree: Tree,
    pub content: String,
    pub lang: LanguageId,
    pub crc32c: u32,
}

impl ParseResult {
    /// Decode the UTF-8 text a node spans.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(self.content.as_bytes()).unwrap_or("")
    }
}

struct CachedTree {
    tree: Tree,
    content: String,
    crc32c: u32,
    parsed_at: Instant,
    lang: LanguageId,
    estimated_size: usize,
}

/// Bounded cache of parsed trees keyed by absolute normalized path.
pub struct ParseCache {
    entries: Mutex<HashMap<PathBuf, CachedTree>>,
    bytes: AtomicUsize,
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ParseCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            bytes: AtomicUsize::new(0),
        }
    }

    /// Parse `path`, reusing the cached tree when the on-disk CRC still
    /// matches. `lang` overrides extension/shebang detection when given.
    pub fn parse_file(&self, path: &Path, lang: Option<LanguageId>) -> Result<ParseResult> {
        let path = fsio::normalize_path(path);
        let content = fsio::read_text(&path, MAX_FILE_BYTES)?;
        let lang = match lang.or_else(|| lang::detect_with_content(&path, content.as_bytes())) {
            Some(l) => l,
            None => {
                return Err(CodeNavError::UnsupportedLanguage(
                    path.display().to_string(),
                ));
            }
        };
        let crc = crc32c::crc32c(content.as_bytes());

        {
            let mut entries = self.entries.lock();
            match entries.get(&path) {
                Some(cached) if cached.crc32c == crc && cached.lang == lang => {
                    return Ok(ParseResult {
                        tree: cached.tree.clone(),
                        content,
                        lang,
                        crc32c: crc,
                    });
                }
                Some(_) => {
                    // Stale: the file changed out from under the entry.
                    if let Some(old) = entries.remove(&path) {
                        self.bytes.fetch_sub(old.estimated_size, Ordering::Relaxed);
                    }
                }
                None => {}
            }
        }

        let tree = parse_source(&content, lang)?;
        if fsio::count_lines(&content) <= MAX_CACHEABLE_LINES {
            self.insert(path, &tree, &content, crc, lang);
        }
        Ok(ParseResult {
            tree,
            content,
            lang,
            crc32c: crc,
        })
    }

    /// Parse in-memory content for `path` without touching the cache; used
    /// when reasoning about an edit that is not on disk.
    pub fn parse_with_content(&self, path: &Path, content: &str) -> Result<ParseResult> {
        let path = fsio::normalize_path(path);
        let lang = lang::detect_with_content(&path, content.as_bytes()).ok_or_else(|| {
            CodeNavError::UnsupportedLanguage(path.display().to_string())
        })?;
        let tree = parse_source(content, lang)?;
        Ok(ParseResult {
            tree,
            content: content.to_string(),
            lang,
            crc32c: crc32c::crc32c(content.as_bytes()),
        })
    }

    fn insert(&self, path: PathBuf, tree: &Tree, content: &str, crc: u32, lang: LanguageId) {
        let estimated_size = content.len() * AST_SIZE_FACTOR;
        let mut entries = self.entries.lock();
        if let Some(old) = entries.insert(
            path,
            CachedTree {
                tree: tree.clone(),
                content: content.to_string(),
                crc32c: crc,
                parsed_at: Instant::now(),
                lang,
                estimated_size,
            },
        ) {
            self.bytes.fetch_sub(old.estimated_size, Ordering::Relaxed);
        }
        self.bytes.fetch_add(estimated_size, Ordering::Relaxed);

        // Evict oldest entries until both budgets hold.
        while self.bytes.load(Ordering::Relaxed) > MAX_CACHE_BYTES
            || entries.len() > MAX_CACHE_ENTRIES
        {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.parsed_at)
                .map(|(p, _)| p.clone());
            match oldest {
                Some(key) => {
                    if let Some(evicted) = entries.remove(&key) {
                        self.bytes.fetch_sub(evicted.estimated_size, Ordering::Relaxed);
                    }
                }
                None => break,
            }
        }
    }

    /// Drop the entry for `path`, if any.
    pub fn invalidate(&self, path: &Path) {
        let path = fsio::normalize_path(path);
        let mut entries = self.entries.lock();
        if let Some(old) = entries.remove(&path) {
            self.bytes.fetch_sub(old.estimated_size, Ordering::Relaxed);
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.clear();
        self.bytes.store(0, Ordering::Relaxed);
    }

    pub fn is_cached(&self, path: &Path) -> bool {
        let path = fsio::normalize_path(path);
        self.entries.lock().contains_key(&path)
    }

    /// The CRC recorded for a cached path, if present.
    pub fn cached_crc(&self, path: &Path) -> Option<u32> {
        let path = fsio::normalize_path(path);
        self.entries.lock().get(&path).map(|e| e.crc32c)
    }

    pub fn bytes_in_cache(&self) -> usize {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn entries_in_cache(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_source_roundtrip() {
        let source = "fn main() { let x = 1; }";
        let tree = parse_source(source, LanguageId::Rust).unwrap();
        let root = tree.root_node();
        assert!(!root.has_error());
        // Sub-range re-serialization equals the original bytes.
        let f = root.child(0).unwrap();
        assert_eq!(
            &source.as_bytes()[f.start_byte()..f.end_byte()],
            f.utf8_text(source.as_bytes()).unwrap().as_bytes()
        );
    }

    #[test]
    fn test_cache_hit_and_invalidation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.rs");
        fs::write(&path, "fn one() {}\n").unwrap();

        let cache = ParseCache::new();
        let first = cache.parse_file(&path, None).unwrap();
        assert!(cache.is_cached(&path));
        assert_eq!(cache.entries_in_cache(), 1);
        assert_eq!(cache.cached_crc(&path), Some(first.crc32c));

        // Unchanged file hits the cache with a matching CRC.
        let second = cache.parse_file(&path, None).unwrap();
        assert_eq!(first.crc32c, second.crc32c);

        // A rewrite drops the stale entry and reparses.
        fs::write(&path, "fn two() {}\n").unwrap();
        let third = cache.parse_file(&path, None).unwrap();
        assert_ne!(first.crc32c, third.crc32c);
        assert_eq!(cache.cached_crc(&path), Some(third.crc32c));

        cache.invalidate(&path);
        assert!(!cache.is_cached(&path));
        assert_eq!(cache.bytes_in_cache(), 0);
    }

    #[test]
    fn test_parse_with_content_skips_cache() {
        let cache = ParseCache::new();
        let result = cache
            .parse_with_content(Path::new("/virtual/x.py"), "def f():\n    return 1\n")
            .unwrap();
        assert_eq!(result.lang, LanguageId::Python);
        assert_eq!(cache.entries_in_cache(), 0);
    }

    #[test]
    fn test_unsupported_language() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "hello\n").unwrap();
        let cache = ParseCache::new();
        assert!(matches!(
            cache.parse_file(&path, None),
            Err(CodeNavError::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn test_entry_budget_eviction() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParseCache::new();
        for i in 0..(MAX_CACHE_ENTRIES + 10) {
            let path = dir.path().join(format!("f{i}.rs"));
            fs::write(&path, format!("fn f{i}() {{}}\n")).unwrap();
            cache.parse_file(&path, None).unwrap();
        }
        assert!(cache.entries_in_cache() <= MAX_CACHE_ENTRIES);
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.go");
        fs::write(&path, "package main\n").unwrap();
        let cache = ParseCache::new();
        cache.parse_file(&path, None).unwrap();
        cache.clear();
        assert_eq!(cache.entries_in_cache(), 0);
        assert_eq!(cache.bytes_in_cache(), 0);
    }
}
