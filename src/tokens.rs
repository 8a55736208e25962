//! Range access tokens gating edits.
//!
//! Every successful read of a line range issues a token carrying the CRC of
//! that range's bytes. An edit is accepted only when it presents a token for
//! the same path whose range covers the edit and whose CRC still matches
//! the file, which pins the edit to the exact bytes the caller last saw.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{CodeNavError, ErrorCode, ErrorEnvelope, Result};
use crate::fsio;

const TOKEN_PREFIX: &str = "cnv1";

/// A range-scoped edit credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub path: PathBuf,
    pub start_line: u32,
    pub end_line: u32,
    pub range_crc: u32,
    pub issued_at_ms: u64,
}

impl AccessToken {
    /// Issue a token for `content`'s lines `start..=end`.
    pub fn issue(path: &Path, content: &str, start_line: u32, end_line: u32) -> Self {
        let range = fsio::line_range(content, start_line, end_line).unwrap_or("");
        Self {
            path: fsio::normalize_path(path),
            start_line,
            end_line,
            range_crc: crc32c::crc32c(range.as_bytes()),
            issued_at_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
        }
    }

    /// Serialize to the opaque wire form.
    pub fn encode(&self) -> String {
        format!(
            "{TOKEN_PREFIX}:{:08x}:{}:{}:{}:{}",
            self.range_crc,
            self.start_line,
            self.end_line,
            self.issued_at_ms,
            self.path.display()
        )
    }

    /// Parse the opaque wire form.
    pub fn decode(raw: &str) -> Result<Self> {
        let invalid = || {
            CodeNavError::envelope(
                ErrorCode::TokenInvalidFormat,
                "Access token is malformed".to_string(),
            )
        };
        let mut parts = raw.splitn(6, ':');
        if parts.next() != Some(TOKEN_PREFIX) {
            return Err(invalid());
        }
        let range_crc =
            u32::from_str_radix(parts.next().ok_or_else(invalid)?, 16).map_err(|_| invalid())?;
        let start_line: u32 = parts.next().ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
        let end_line: u32 = parts.next().ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
        let issued_at_ms: u64 =
            parts.next().ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
        let path = PathBuf::from(parts.next().ok_or_else(invalid)?);
        Ok(Self {
            path,
            start_line,
            end_line,
            range_crc,
            issued_at_ms,
        })
    }

    /// Validate this token against an edit of `current_content`'s lines
    /// `edit_start..=edit_end` in `path`.
    pub fn validate(
        &self,
        path: &Path,
        current_content: &str,
        edit_start: u32,
        edit_end: u32,
    ) -> Result<()> {
        let path = fsio::normalize_path(path);
        if self.path != path {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(
                    ErrorCode::TokenPathMismatch,
                    format!(
                        "Token was issued for {}, edit targets {}",
                        self.path.display(),
                        path.display()
                    ),
                )
                .with_context("path", path.display().to_string()),
            ));
        }
        if edit_start < self.start_line || edit_end > self.end_line {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(
                    ErrorCode::TokenRangeMismatch,
                    format!(
                        "Token covers lines {}-{}, edit targets {}-{}",
                        self.start_line, self.end_line, edit_start, edit_end
                    ),
                )
                .with_context("start", edit_start.to_string())
                .with_context("end", edit_end.to_string()),
            ));
        }
        let range =
            fsio::line_range(current_content, self.start_line, self.end_line).unwrap_or("");
        if crc32c::crc32c(range.as_bytes()) != self.range_crc {
            return Err(CodeNavError::envelope(
                ErrorCode::TokenExpired,
                format!(
                    "Lines {}-{} of {} changed since the token was issued",
                    self.start_line,
                    self.end_line,
                    path.display()
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = "alpha\nbeta\ngamma\ndelta\n";

    #[test]
    fn test_issue_matches_range_crc() {
        let token = AccessToken::issue(Path::new("/tmp/t.txt"), CONTENT, 2, 3);
        assert_eq!(token.range_crc, crc32c::crc32c(b"beta\ngamma\n"));
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let token = AccessToken::issue(Path::new("/tmp/t.txt"), CONTENT, 1, 4);
        let decoded = AccessToken::decode(&token.encode()).unwrap();
        assert_eq!(token, decoded);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = AccessToken::decode("not-a-token").unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenInvalidFormat);
    }

    #[test]
    fn test_validate_accepts_covered_edit() {
        let token = AccessToken::issue(Path::new("/tmp/t.txt"), CONTENT, 1, 4);
        assert!(token.validate(Path::new("/tmp/t.txt"), CONTENT, 2, 3).is_ok());
    }

    #[test]
    fn test_validate_path_mismatch() {
        let token = AccessToken::issue(Path::new("/tmp/t.txt"), CONTENT, 1, 4);
        let err = token
            .validate(Path::new("/tmp/other.txt"), CONTENT, 1, 1)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenPathMismatch);
    }

    #[test]
    fn test_validate_range_mismatch() {
        let token = AccessToken::issue(Path::new("/tmp/t.txt"), CONTENT, 2, 3);
        let err = token
            .validate(Path::new("/tmp/t.txt"), CONTENT, 1, 3)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenRangeMismatch);
    }

    #[test]
    fn test_validate_expired_after_change() {
        let token = AccessToken::issue(Path::new("/tmp/t.txt"), CONTENT, 2, 3);
        let changed = "alpha\nBETA\ngamma\ndelta\n";
        let err = token
            .validate(Path::new("/tmp/t.txt"), changed, 2, 3)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenExpired);
    }
}
