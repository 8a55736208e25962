//! # codenav
//!
//! The semantic core of a multi-language code-intelligence server: given a
//! project tree of source files, it maintains a map of declared symbols,
//! answers navigation queries, checks syntax, and executes structural
//! refactorings, all driven by tree-sitter concrete syntax trees.
//!
//! This crate provides:
//! - A bounded, CRC-validated parse cache with per-thread parser pooling
//! - A project-wide symbol index built in parallel with per-file validity
//! - Language-dispatched symbol extraction over a closed language set
//! - Navigation queries (definition, references, hover, list symbols) with
//!   deadline-bounded project fan-out
//! - A transactional refactoring engine (rename, inline, extract method,
//!   extract variable, move, wrap, generate) with preview and rollback
//! - Range access tokens and external-change tracking feeding a session
//!   undo journal
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use codenav::prelude::*;
//! use std::path::Path;
//!
//! let session = Session::new("./my-project");
//!
//! // Navigation
//! let symbols = session.resolver().list_symbols(Path::new("src/Main.java"))?;
//! println!("{} symbols", symbols.len());
//!
//! // Refactoring with preview
//! let rename = Rename::new("src/Main.java", "newName")
//!     .symbol("oldName")
//!     .in_scope(Scope::Project);
//! let preview = session.preview(&rename)?;
//! println!("{}", preview.message);
//! session.execute(&rename)?;
//! # Ok::<(), codenav::error::CodeNavError>(())
//! ```
//!
//! ## Supported Languages
//!
//! Java, Kotlin, JavaScript, TypeScript (+TSX), Python, Go, Rust, C, C++,
//! C#, PHP and HTML (outline only).

pub mod changes;
pub mod diff;
pub mod error;
pub mod extract;
pub mod fsio;
pub mod index;
pub mod lang;
pub mod parse;
pub mod project;
pub mod refactor;
pub mod resolve;
pub mod session;
pub mod symbols;
pub mod syntax;
pub mod tokens;
pub mod tools;
pub mod txn;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::changes::{ChangeTracker, FileSnapshot, JournalEntry, ReadObservation};
    pub use crate::diff::{DiffSummary, unified_diff};
    pub use crate::error::{CodeNavError, ErrorCode, ErrorEnvelope, Result};
    pub use crate::index::{IndexedSymbol, IndexingResult, SymbolIndex};
    pub use crate::lang::LanguageId;
    pub use crate::parse::{ParseCache, ParseResult};
    pub use crate::refactor::{
        ExtractMethod, ExtractVariable, FileChange, Generate, GenerateKind, Inline, MoveSymbol,
        RefactorContext, RefactoringOperation, RefactoringResult, RefactoringStatus, Rename,
        Wrap, WrapKind,
    };
    pub use crate::resolve::{Resolver, Scope};
    pub use crate::session::{ReadResult, Session, WriteResult};
    pub use crate::symbols::{Location, ParameterInfo, SymbolInfo, SymbolKind};
    pub use crate::syntax::SyntaxError;
    pub use crate::tokens::AccessToken;
    pub use crate::tools::{ToolResponse, ToolSpec, dispatch, tool_specs};
    pub use crate::txn::{Transaction, TransactionManager};
}

pub use prelude::*;
