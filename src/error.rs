//! Error types for the navigation and refactoring core.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Closed taxonomy of recoverable error codes surfaced on the tool boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // File
    FileNotFound,
    FileNotReadable,
    FileIsBinary,
    FileTooLarge,
    FileLocked,
    FileEncodingError,
    // Directory
    DirectoryNotFound,
    DirectoryNotEmpty,
    // Token
    TokenRequired,
    TokenInvalidFormat,
    TokenExpired,
    TokenPathMismatch,
    TokenRangeMismatch,
    TokenExternalChange,
    // Parameter
    ParamMissing,
    ParamInvalid,
    ParamOutOfRange,
    ParamLineExceeds,
    ParamConflict,
    // Symbol
    SymbolNotFound,
    SymbolAmbiguous,
    PatternNotFound,
    // Change
    ChangeExternal,
    ChangeConflict,
    // Task
    TaskNotFound,
    CheckpointNotFound,
    NothingToUndo,
    NothingToRedo,
    // Refactoring
    RefactorScopeTooLarge,
    RefactorLanguageNotSupported,
    // System
    IoError,
    InternalError,
}

impl ErrorCode {
    /// The wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::FileNotReadable => "FILE_NOT_READABLE",
            ErrorCode::FileIsBinary => "FILE_IS_BINARY",
            ErrorCode::FileTooLarge => "FILE_TOO_LARGE",
            ErrorCode::FileLocked => "FILE_LOCKED",
            ErrorCode::FileEncodingError => "FILE_ENCODING_ERROR",
            ErrorCode::DirectoryNotFound => "DIRECTORY_NOT_FOUND",
            ErrorCode::DirectoryNotEmpty => "DIRECTORY_NOT_EMPTY",
            ErrorCode::TokenRequired => "TOKEN_REQUIRED",
            ErrorCode::TokenInvalidFormat => "TOKEN_INVALID_FORMAT",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::TokenPathMismatch => "TOKEN_PATH_MISMATCH",
            ErrorCode::TokenRangeMismatch => "TOKEN_RANGE_MISMATCH",
            ErrorCode::TokenExternalChange => "TOKEN_EXTERNAL_CHANGE",
            ErrorCode::ParamMissing => "PARAM_MISSING",
            ErrorCode::ParamInvalid => "PARAM_INVALID",
            ErrorCode::ParamOutOfRange => "PARAM_OUT_OF_RANGE",
            ErrorCode::ParamLineExceeds => "PARAM_LINE_EXCEEDS",
            ErrorCode::ParamConflict => "PARAM_CONFLICT",
            ErrorCode::SymbolNotFound => "SYMBOL_NOT_FOUND",
            ErrorCode::SymbolAmbiguous => "SYMBOL_AMBIGUOUS",
            ErrorCode::PatternNotFound => "PATTERN_NOT_FOUND",
            ErrorCode::ChangeExternal => "CHANGE_EXTERNAL",
            ErrorCode::ChangeConflict => "CHANGE_CONFLICT",
            ErrorCode::TaskNotFound => "TASK_NOT_FOUND",
            ErrorCode::CheckpointNotFound => "CHECKPOINT_NOT_FOUND",
            ErrorCode::NothingToUndo => "NOTHING_TO_UNDO",
            ErrorCode::NothingToRedo => "NOTHING_TO_REDO",
            ErrorCode::RefactorScopeTooLarge => "REFACTOR_SCOPE_TOO_LARGE",
            ErrorCode::RefactorLanguageNotSupported => "REFACTOR_LANGUAGE_NOT_SUPPORTED",
            ErrorCode::IoError => "IO_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Default actionable hint for the code. `%key%` placeholders are
    /// substituted from the envelope context when rendered.
    pub fn default_solution(&self) -> &'static str {
        match self {
            ErrorCode::FileNotFound => "Check that %path% exists and is spelled correctly",
            ErrorCode::FileTooLarge => "Files larger than %limit% cannot be parsed",
            ErrorCode::FileIsBinary => "Only text files can be processed",
            ErrorCode::TokenRequired => "Read the target range first to obtain an access token",
            ErrorCode::TokenExpired => {
                "Re-read the range; the file changed since the token was issued"
            }
            ErrorCode::TokenRangeMismatch => {
                "The token does not cover lines %start%-%end%; read that range first"
            }
            ErrorCode::TokenPathMismatch => "The token was issued for a different file",
            ErrorCode::ParamMissing => "Provide the required parameter %param%",
            ErrorCode::ParamLineExceeds => "The file has only %lineCount% lines",
            ErrorCode::SymbolNotFound => "Verify the symbol name %name%, or rebuild the index",
            ErrorCode::SymbolAmbiguous => "Disambiguate with a symbol kind or a cursor position",
            ErrorCode::NothingToUndo => "No journaled change exists for this session",
            ErrorCode::RefactorLanguageNotSupported => {
                "This refactoring is not available for %language% files"
            }
            _ => "See the message for details",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error envelope emitted for every recoverable failure.
///
/// Rendered as:
/// ```text
/// [ERROR: CODE]
/// Message: ...
/// Solution: ...
/// Context: k1=v1, k2=v2
/// ```
#[derive(Debug, Clone)]
pub struct ErrorEnvelope {
    pub code: ErrorCode,
    pub message: String,
    pub solution: String,
    pub context: Vec<(String, String)>,
}

impl ErrorEnvelope {
    /// Create an envelope with the code's default solution hint.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            solution: code.default_solution().to_string(),
            context: Vec::new(),
        }
    }

    /// Override the solution hint.
    pub fn with_solution(mut self, solution: impl Into<String>) -> Self {
        self.solution = solution.into();
        self
    }

    /// Attach a context key/value pair.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    /// Solution text with `%key%` placeholders substituted from context.
    pub fn rendered_solution(&self) -> String {
        let mut out = self.solution.clone();
        for (k, v) in &self.context {
            out = out.replace(&format!("%{k}%"), v);
        }
        out
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[ERROR: {}]", self.code)?;
        writeln!(f, "Message: {}", self.message)?;
        write!(f, "Solution: {}", self.rendered_solution())?;
        if !self.context.is_empty() {
            let ctx: Vec<String> = self
                .context
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            write!(f, "\nContext: {}", ctx.join(", "))?;
        }
        Ok(())
    }
}

/// The main error type for navigation and refactoring operations.
#[derive(Error, Debug)]
pub enum CodeNavError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] globset::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tree-sitter parse error for {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Tree-sitter query error: {0}")]
    Query(#[from] tree_sitter::QueryError),

    #[error("Language not supported: {0}")]
    UnsupportedLanguage(String),

    #[error("{0}")]
    Tool(ErrorEnvelope),
}

impl CodeNavError {
    /// Build a recoverable tool error from a bare code and message.
    pub fn envelope(code: ErrorCode, message: impl Into<String>) -> Self {
        CodeNavError::Tool(ErrorEnvelope::new(code, message))
    }

    /// The taxonomy code for this error, mapping infrastructure failures
    /// onto the closed set.
    pub fn code(&self) -> ErrorCode {
        match self {
            CodeNavError::Io(_) => ErrorCode::IoError,
            CodeNavError::Tool(env) => env.code,
            CodeNavError::UnsupportedLanguage(_) => ErrorCode::RefactorLanguageNotSupported,
            _ => ErrorCode::InternalError,
        }
    }

    /// Render as a structured envelope, synthesizing one for infrastructure
    /// errors.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        match self {
            CodeNavError::Tool(env) => env.clone(),
            other => ErrorEnvelope::new(other.code(), other.to_string()),
        }
    }
}

/// A specialized Result type for navigation and refactoring operations.
pub type Result<T> = std::result::Result<T, CodeNavError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_rendering() {
        let env = ErrorEnvelope::new(ErrorCode::FileNotFound, "No such file")
            .with_context("path", "/tmp/missing.java");
        let text = env.to_string();
        assert!(text.starts_with("[ERROR: FILE_NOT_FOUND]"));
        assert!(text.contains("Message: No such file"));
        assert!(text.contains("Solution: Check that /tmp/missing.java exists"));
        assert!(text.contains("Context: path=/tmp/missing.java"));
    }

    #[test]
    fn test_placeholder_substitution() {
        let env = ErrorEnvelope::new(ErrorCode::ParamMissing, "Missing parameter")
            .with_context("param", "symbolName");
        assert_eq!(
            env.rendered_solution(),
            "Provide the required parameter symbolName"
        );
    }

    #[test]
    fn test_error_code_mapping() {
        let err = CodeNavError::envelope(ErrorCode::SymbolNotFound, "no such symbol");
        assert_eq!(err.code(), ErrorCode::SymbolNotFound);

        let io = CodeNavError::Io(std::io::Error::other("boom"));
        assert_eq!(io.code(), ErrorCode::IoError);
    }
}
