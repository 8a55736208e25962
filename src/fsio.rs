//! Checked reads and atomic writes on the filesystem boundary.
//!
//! All text I/O is UTF-8. Writes go through the write-temp, fsync, rename
//! sequence so a file is always observed either before or after an edit,
//! never mid-write.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{CodeNavError, ErrorCode, Result};

/// How many leading bytes are sniffed for NUL when deciding text vs binary.
const BINARY_SNIFF_BYTES: usize = 8192;

/// Normalize a path to absolute canonical form. Resolves symlinks when the
/// path exists; falls back to lexical normalization for paths that do not
/// exist yet (e.g. a move target).
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Check that `path` stays inside `root` after normalization.
pub fn is_within_root(root: &Path, path: &Path) -> bool {
    let root = normalize_path(root);
    let path = normalize_path(path);
    path.starts_with(&root)
}

/// Read a file as UTF-8 text, rejecting missing, binary and oversized files
/// with structured errors.
pub fn read_text(path: &Path, max_bytes: u64) -> Result<String> {
    let meta = fs::metadata(path).map_err(|_| {
        CodeNavError::Tool(
            crate::error::ErrorEnvelope::new(
                ErrorCode::FileNotFound,
                format!("File not found: {}", path.display()),
            )
            .with_context("path", path.display().to_string()),
        )
    })?;
    if !meta.is_file() {
        return Err(CodeNavError::envelope(
            ErrorCode::FileNotReadable,
            format!("Not a regular file: {}", path.display()),
        ));
    }
    if meta.len() > max_bytes {
        return Err(CodeNavError::Tool(
            crate::error::ErrorEnvelope::new(
                ErrorCode::FileTooLarge,
                format!(
                    "File is {} bytes, limit is {} bytes: {}",
                    meta.len(),
                    max_bytes,
                    path.display()
                ),
            )
            .with_context("limit", format!("{max_bytes} bytes")),
        ));
    }
    let bytes = fs::read(path)?;
    if looks_binary(&bytes) {
        return Err(CodeNavError::envelope(
            ErrorCode::FileIsBinary,
            format!("File appears to be binary: {}", path.display()),
        ));
    }
    String::from_utf8(bytes).map_err(|_| {
        CodeNavError::envelope(
            ErrorCode::FileEncodingError,
            format!("File is not valid UTF-8: {}", path.display()),
        )
    })
}

/// NUL byte in the leading window means binary.
pub fn looks_binary(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .take(BINARY_SNIFF_BYTES)
        .any(|&b| b == 0)
}

/// Write a file atomically: temp file in the same directory, fsync, rename
/// into place.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let tmp = tempfile::NamedTempFile::new_in(parent)?;
    std::io::Write::write_all(&mut tmp.as_file(), content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| CodeNavError::Io(e.error))?;
    Ok(())
}

/// The substring of `content` covering 1-based lines `start..=end`
/// (including the trailing newline of `end` when present). Returns `None`
/// when `start` exceeds the line count or the range is inverted.
pub fn line_range<'a>(content: &'a str, start: u32, end: u32) -> Option<&'a str> {
    if start == 0 || end < start {
        return None;
    }
    let mut line = 1u32;
    let mut range_start = if start == 1 { Some(0) } else { None };
    let mut range_end = None;
    for (idx, ch) in content.char_indices() {
        if ch == '\n' {
            line += 1;
            if line == start {
                range_start = Some(idx + 1);
            }
            if line == end + 1 {
                range_end = Some(idx + 1);
                break;
            }
        }
    }
    let s = range_start?;
    let e = range_end.unwrap_or(content.len());
    if s >= content.len() {
        return None;
    }
    Some(&content[s..e])
}

/// Number of lines in `content`, counting a trailing unterminated line.
pub fn count_lines(content: &str) -> u32 {
    if content.is_empty() {
        return 0;
    }
    let newlines = content.bytes().filter(|&b| b == b'\n').count() as u32;
    if content.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lexical() {
        let p = normalize_path(Path::new("/tmp/a/../b/./c.rs"));
        assert_eq!(p, PathBuf::from("/tmp/b/c.rs"));
    }

    #[test]
    fn test_within_root() {
        assert!(is_within_root(Path::new("/tmp"), Path::new("/tmp/x/y.rs")));
        assert!(!is_within_root(
            Path::new("/tmp/project"),
            Path::new("/tmp/project/../other/y.rs")
        ));
    }

    #[test]
    fn test_read_text_missing() {
        let err = read_text(Path::new("/no/such/file.java"), 1024).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileNotFound);
    }

    #[test]
    fn test_read_text_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "x".repeat(100)).unwrap();
        let err = read_text(&path, 10).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileTooLarge);
    }

    #[test]
    fn test_read_text_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        fs::write(&path, b"abc\0def").unwrap();
        let err = read_text(&path, 1024).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileIsBinary);
    }

    #[test]
    fn test_write_atomic_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_atomic(&path, "hello\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
        write_atomic(&path, "replaced\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "replaced\n");
    }

    #[test]
    fn test_line_range() {
        let text = "one\ntwo\nthree\nfour\n";
        assert_eq!(line_range(text, 1, 1), Some("one\n"));
        assert_eq!(line_range(text, 2, 3), Some("two\nthree\n"));
        assert_eq!(line_range(text, 4, 4), Some("four\n"));
        assert_eq!(line_range(text, 5, 5), None);
        assert_eq!(line_range(text, 3, 2), None);
        assert_eq!(line_range(text, 0, 1), None);

        let unterminated = "a\nb";
        assert_eq!(line_range(unterminated, 2, 2), Some("b"));
        assert_eq!(line_range(unterminated, 2, 9), Some("b"));
    }

    #[test]
    fn test_count_lines() {
        assert_eq!(count_lines(""), 0);
        assert_eq!(count_lines("a"), 1);
        assert_eq!(count_lines("a\n"), 1);
        assert_eq!(count_lines("a\nb"), 2);
        assert_eq!(count_lines("a\nb\n"), 2);
    }
}
