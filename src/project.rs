//! Project-root detection and bounded project walking.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::Result;
use crate::fsio;
use crate::lang::{self, LanguageId};

/// Directory names never descended into during project walks.
pub const SKIP_DIRS: [&str; 14] = [
    ".git",
    ".svn",
    ".hg",
    ".idea",
    ".vscode",
    "node_modules",
    "build",
    "target",
    "dist",
    "out",
    "__pycache__",
    ".gradle",
    "bin",
    "obj",
];

/// Marker files that identify a project root.
pub const PROJECT_MARKERS: [&str; 7] = [
    "build.gradle",
    "build.gradle.kts",
    "pom.xml",
    "package.json",
    "go.mod",
    "Cargo.toml",
    ".git",
];

/// Maximum directory depth for project walks.
pub const MAX_WALK_DEPTH: usize = 15;

/// Whether a directory name is excluded from walks. Hidden directories are
/// excluded wholesale.
pub fn should_skip_dir(name: &str) -> bool {
    SKIP_DIRS.contains(&name) || name.starts_with('.')
}

/// Walk upward from a source file until a directory containing a project
/// marker appears; falls back to the file's parent directory.
pub fn detect_project_root(file: &Path) -> PathBuf {
    let file = fsio::normalize_path(file);
    let start = if file.is_dir() {
        file.clone()
    } else {
        file.parent().map(Path::to_path_buf).unwrap_or(file.clone())
    };
    let mut current = Some(start.as_path());
    while let Some(dir) = current {
        if PROJECT_MARKERS.iter().any(|m| dir.join(m).exists()) {
            return dir.to_path_buf();
        }
        current = dir.parent();
    }
    start
}

fn glob_for(lang: Option<LanguageId>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    match lang {
        Some(l) => {
            builder.add(Glob::new(&l.glob_pattern())?);
        }
        None => {
            for l in lang::ALL_LANGUAGES {
                builder.add(Glob::new(&l.glob_pattern())?);
            }
        }
    }
    Ok(builder.build()?)
}

/// Collect regular files under `root` matching the language glob (or any
/// supported language when `lang` is `None`), depth- and count-bounded.
/// Results are sorted for determinism.
pub fn collect_files(
    root: &Path,
    lang: Option<LanguageId>,
    max_files: usize,
    max_file_bytes: u64,
) -> Result<Vec<PathBuf>> {
    let glob = glob_for(lang)?;
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .max_depth(MAX_WALK_DEPTH)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !should_skip_dir(e.file_name().to_string_lossy().as_ref())
        });
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if !glob.is_match(rel) {
            continue;
        }
        if let Ok(meta) = entry.metadata() {
            if meta.len() > max_file_bytes {
                continue;
            }
        }
        files.push(entry.path().to_path_buf());
        if files.len() >= max_files {
            break;
        }
    }
    files.sort();
    Ok(files)
}

/// Fast substring pre-filter: of `candidates`, the files whose text contains
/// `needle`. Unreadable files are skipped. Order is preserved.
pub fn filter_containing(candidates: Vec<PathBuf>, needle: &str) -> Vec<PathBuf> {
    let mut hits: Vec<(usize, PathBuf)> = candidates
        .into_par_iter()
        .enumerate()
        .filter_map(|(idx, path)| match std::fs::read_to_string(&path) {
            Ok(content) if content.contains(needle) => Some((idx, path)),
            Ok(_) => None,
            Err(e) => {
                debug!("pre-filter skipping {}: {e}", path.display());
                None
            }
        })
        .collect();
    hits.sort_by_key(|(idx, _)| *idx);
    hits.into_iter().map(|(_, p)| p).collect()
}

/// Regular files in `dir` (non-recursive) matching the language glob.
pub fn list_directory_files(dir: &Path, lang: LanguageId) -> Result<Vec<PathBuf>> {
    let glob = glob_for(Some(lang))?;
    let mut files = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("cannot list {}: {e}", dir.display());
            return Ok(files);
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = PathBuf::from(entry.file_name());
        if glob.is_match(&name) || lang::detect(&path) == Some(lang) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_detect_project_root_by_marker() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("proj");
        let nested = root.join("src").join("main").join("java");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.join("pom.xml"), "<project/>").unwrap();
        let file = nested.join("App.java");
        fs::write(&file, "class App {}").unwrap();

        assert_eq!(detect_project_root(&file), fsio::normalize_path(&root));
    }

    #[test]
    fn test_detect_project_root_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("loose.py");
        fs::write(&file, "x = 1").unwrap();
        assert_eq!(
            detect_project_root(&file),
            fsio::normalize_path(dir.path())
        );
    }

    #[test]
    fn test_skip_dirs() {
        assert!(should_skip_dir("node_modules"));
        assert!(should_skip_dir(".git"));
        assert!(should_skip_dir(".cache"));
        assert!(!should_skip_dir("src"));
    }

    #[test]
    fn test_collect_files_skips_excluded() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/dep")).unwrap();
        fs::write(dir.path().join("src/a.java"), "class A {}").unwrap();
        fs::write(dir.path().join("node_modules/dep/b.java"), "class B {}").unwrap();
        fs::write(dir.path().join("readme.md"), "# hi").unwrap();

        let files =
            collect_files(dir.path(), Some(LanguageId::Java), 100, u64::MAX).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("src/a.java"));
    }

    #[test]
    fn test_filter_containing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "needle here").unwrap();
        fs::write(&b, "nothing").unwrap();
        let hits = filter_containing(vec![a.clone(), b], "needle");
        assert_eq!(hits, vec![a]);
    }

    #[test]
    fn test_list_directory_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.kt"), "class X").unwrap();
        fs::write(dir.path().join("y.kts"), "val y = 1").unwrap();
        fs::write(dir.path().join("z.java"), "class Z {}").unwrap();
        let files = list_directory_files(dir.path(), LanguageId::Kotlin).unwrap();
        assert_eq!(files.len(), 2);
    }
}
