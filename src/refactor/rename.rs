//! Rename: semantic reference rewrite with a per-site integrity guard and
//! an optional hybrid textual pass.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{CodeNavError, ErrorCode, ErrorEnvelope, Result};
use crate::fsio;
use crate::parse::MAX_FILE_BYTES;
use crate::project;
use crate::resolve::{Resolver, Scope};
use crate::symbols::{Location, SymbolKind};

use super::{ChangeDetail, Plan, PlannedEdit, RefactorContext, RefactoringOperation};

/// Rename a symbol across a scope.
#[derive(Debug, Clone)]
pub struct Rename {
    pub file: PathBuf,
    pub new_name: String,
    pub symbol_name: Option<String>,
    pub kind: Option<SymbolKind>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub scope: Scope,
    pub hybrid: bool,
    pub apply_text_matches: bool,
}

impl Rename {
    pub fn new(file: impl Into<PathBuf>, new_name: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            new_name: new_name.into(),
            symbol_name: None,
            kind: None,
            line: None,
            column: None,
            scope: Scope::default(),
            hybrid: false,
            apply_text_matches: false,
        }
    }

    /// Locate the symbol by name.
    pub fn symbol(mut self, name: impl Into<String>) -> Self {
        self.symbol_name = Some(name.into());
        self
    }

    /// Disambiguate same-named symbols by kind.
    pub fn of_kind(mut self, kind: SymbolKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Locate the symbol by cursor position.
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Also run a word-boundary textual search and tag its extra hits.
    pub fn hybrid(mut self) -> Self {
        self.hybrid = true;
        self
    }

    /// Apply `TEXT_ONLY` hits as well (off by default).
    pub fn apply_text_matches(mut self) -> Self {
        self.apply_text_matches = true;
        self.hybrid = true;
        self
    }

    fn resolve_old_name(&self, ctx: &RefactorContext) -> Result<String> {
        if let (Some(line), Some(column)) = (self.line, self.column) {
            let resolver = Resolver::new(ctx.cache, ctx.index);
            let at = resolver.symbol_at(&self.file, line, column)?.ok_or_else(|| {
                CodeNavError::envelope(
                    ErrorCode::SymbolNotFound,
                    format!("No symbol at {}:{line}:{column}", self.file.display()),
                )
            })?;
            return Ok(at.name);
        }
        self.symbol_name.clone().ok_or_else(|| {
            CodeNavError::Tool(
                ErrorEnvelope::new(ErrorCode::ParamMissing, "A symbol name or a position is required")
                    .with_context("param", "symbolName"),
            )
        })
    }

    /// Refuse when the name is declared more than once in the file and
    /// nothing disambiguates the candidates.
    fn check_ambiguity(&self, ctx: &RefactorContext, old: &str) -> Result<()> {
        if self.kind.is_some() || self.line.is_some() {
            return Ok(());
        }
        let resolver = Resolver::new(ctx.cache, ctx.index);
        let candidates: Vec<_> = resolver
            .list_symbols(&self.file)?
            .into_iter()
            .filter(|s| s.name == old && s.kind.is_definition())
            .collect();
        if candidates.len() > 1 {
            let mut envelope = ErrorEnvelope::new(
                ErrorCode::SymbolAmbiguous,
                format!("{} declarations of '{old}' in this file", candidates.len()),
            );
            for c in &candidates {
                envelope = envelope.with_context(
                    c.kind.as_str(),
                    format!("line {}", c.location.start_line),
                );
            }
            return Err(CodeNavError::Tool(envelope));
        }
        Ok(())
    }

    /// Files searched by the textual pass for the configured scope.
    fn scope_files(&self, ctx: &RefactorContext, old: &str) -> Result<Vec<PathBuf>> {
        let file = fsio::normalize_path(&self.file);
        let lang = ctx.cache.parse_file(&file, None)?.lang;
        Ok(match self.scope {
            Scope::File => vec![file],
            Scope::Directory => {
                let dir = file.parent().unwrap_or(Path::new("."));
                let listed = project::list_directory_files(dir, lang)?;
                project::filter_containing(listed, old)
            }
            Scope::Project => {
                let root = project::detect_project_root(&file);
                let walked = project::collect_files(
                    &root,
                    Some(lang),
                    crate::resolve::MAX_REFERENCE_CANDIDATES,
                    MAX_FILE_BYTES,
                )?;
                project::filter_containing(walked, old)
            }
        })
    }
}

impl RefactoringOperation for Rename {
    fn name(&self) -> &'static str {
        "Rename"
    }

    fn validate_params(&self) -> Result<()> {
        if self.new_name.is_empty() {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(ErrorCode::ParamMissing, "newName must not be empty")
                    .with_context("param", "newName"),
            ));
        }
        if !is_identifier(&self.new_name) {
            return Err(CodeNavError::envelope(
                ErrorCode::ParamInvalid,
                format!("'{}' is not a valid identifier", self.new_name),
            ));
        }
        if self.symbol_name.is_none() && (self.line.is_none() || self.column.is_none()) {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(
                    ErrorCode::ParamMissing,
                    "Either symbolName or line+column is required",
                )
                .with_context("param", "symbolName"),
            ));
        }
        Ok(())
    }

    fn plan(&self, ctx: &RefactorContext) -> Result<Plan> {
        let old = self.resolve_old_name(ctx)?;
        if old == self.new_name {
            return Err(CodeNavError::envelope(
                ErrorCode::ParamConflict,
                format!("'{old}' is already the symbol's name"),
            ));
        }
        self.check_ambiguity(ctx, &old)?;

        let resolver = Resolver::new(ctx.cache, ctx.index);
        let mut sites =
            resolver.find_references_by_name(&self.file, &old, self.scope, true)?;
        if sites.is_empty() {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(
                    ErrorCode::SymbolNotFound,
                    format!("No occurrences of '{old}' in {} scope", self.scope.as_str()),
                )
                .with_context("name", old.clone()),
            ));
        }

        let mut plan = Plan::new(format!("rename {old} -> {}", self.new_name));

        if self.hybrid {
            let text_only = self.text_only_matches(ctx, &old, &sites)?;
            if !text_only.is_empty() {
                plan.suggest(format!(
                    "{} SEMANTIC, {} TEXT_ONLY matches; text matches are {}",
                    sites.len(),
                    text_only.len(),
                    if self.apply_text_matches {
                        "included"
                    } else {
                        "not applied (opt in to rewrite them)"
                    }
                ));
                if self.apply_text_matches {
                    sites.extend(text_only);
                    sites.sort();
                    sites.dedup();
                }
            }
        }

        let mut per_file: BTreeMap<PathBuf, Vec<Location>> = BTreeMap::new();
        for site in sites {
            per_file.entry(site.path.clone()).or_default().push(site);
        }

        for (path, mut file_sites) in per_file {
            let original = fsio::read_text(&path, MAX_FILE_BYTES)?;
            let mut lines: Vec<String> = original.lines().map(String::from).collect();
            // Bottom-up so earlier columns stay valid.
            file_sites.sort_by(|a, b| {
                (b.start_line, b.start_column).cmp(&(a.start_line, a.start_column))
            });
            let mut details = Vec::new();
            let mut skipped = 0usize;
            for site in &file_sites {
                let row = site.start_line as usize - 1;
                let col = site.start_column as usize - 1;
                let Some(line) = lines.get_mut(row) else {
                    skipped += 1;
                    continue;
                };
                let end = col + old.len();
                if line.get(col..end) != Some(old.as_str()) {
                    skipped += 1;
                    continue;
                }
                line.replace_range(col..end, &self.new_name);
                details.push(ChangeDetail {
                    line: site.start_line,
                    column: site.start_column,
                    before: old.clone(),
                    after: self.new_name.clone(),
                });
            }
            details.reverse();
            let mut modified = lines.join("\n");
            if original.ends_with('\n') {
                modified.push('\n');
            }
            let mut edit = PlannedEdit::new(&path, original, modified).with_details(details);
            if skipped > 0 {
                edit = edit.with_warning(format!(
                    "{skipped} site(s) skipped: on-disk text no longer matches '{old}'"
                ));
            }
            plan.push(edit);
        }
        Ok(plan)
    }
}

impl Rename {
    /// Word-boundary textual matches not already found semantically.
    fn text_only_matches(
        &self,
        ctx: &RefactorContext,
        old: &str,
        semantic: &[Location],
    ) -> Result<Vec<Location>> {
        let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(old)))?;
        let mut out = Vec::new();
        for path in self.scope_files(ctx, old)? {
            let content = match fsio::read_text(&path, MAX_FILE_BYTES) {
                Ok(c) => c,
                Err(_) => continue,
            };
            for (row, line) in content.lines().enumerate() {
                for hit in pattern.find_iter(line) {
                    let location = Location::single_line(
                        &path,
                        row as u32 + 1,
                        hit.start() as u32 + 1,
                        hit.end() as u32 + 1,
                    );
                    if !semantic.contains(&location) {
                        out.push(location);
                    }
                }
            }
        }
        out.sort();
        out.dedup();
        Ok(out)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::ChangeTracker;
    use crate::index::SymbolIndex;
    use crate::parse::ParseCache;
    use crate::refactor::{RefactoringStatus, execute, preview};
    use crate::txn::TransactionManager;
    use std::fs;

    struct Fixture {
        dir: tempfile::TempDir,
        cache: ParseCache,
        index: SymbolIndex,
        tracker: ChangeTracker,
        txns: TransactionManager,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                cache: ParseCache::new(),
                index: SymbolIndex::new(),
                tracker: ChangeTracker::new(),
                txns: TransactionManager::new(),
            }
        }

        fn ctx(&self) -> RefactorContext<'_> {
            RefactorContext {
                cache: &self.cache,
                index: &self.index,
                tracker: &self.tracker,
                txns: &self.txns,
            }
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, content).unwrap();
            path
        }
    }

    const JAVA: &str = "public class Counter {\n    int x = 0;\n    int bump() { x = x + 1; return x; }\n    String xx = \"x\";\n}\n";

    #[test]
    fn test_rename_word_boundary_only() {
        let fx = Fixture::new();
        let file = fx.write("Counter.java", JAVA);
        let op = Rename::new(&file, "y").symbol("x").in_scope(Scope::File);
        let result = execute(&op, &fx.ctx()).unwrap();
        assert_eq!(result.status, RefactoringStatus::Success);
        assert_eq!(result.total_changes, 4);

        let renamed = fs::read_to_string(&file).unwrap();
        assert!(renamed.contains("int y = 0;"));
        assert!(renamed.contains("y = y + 1; return y;"));
        // The identifier `xx` and the string literal stay untouched.
        assert!(renamed.contains("String xx = \"x\";"));
    }

    #[test]
    fn test_rename_roundtrip() {
        let fx = Fixture::new();
        let file = fx.write("Counter.java", JAVA);
        execute(
            &Rename::new(&file, "y").symbol("x").in_scope(Scope::File),
            &fx.ctx(),
        )
        .unwrap();
        execute(
            &Rename::new(&file, "x").symbol("y").in_scope(Scope::File),
            &fx.ctx(),
        )
        .unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), JAVA);
    }

    #[test]
    fn test_preview_does_not_write() {
        let fx = Fixture::new();
        let file = fx.write("Counter.java", JAVA);
        let op = Rename::new(&file, "y").symbol("x").in_scope(Scope::File);
        let result = preview(&op, &fx.ctx()).unwrap();
        assert_eq!(result.status, RefactoringStatus::Preview);
        assert_eq!(fs::read_to_string(&file).unwrap(), JAVA);
    }

    #[test]
    fn test_invalid_new_name() {
        let fx = Fixture::new();
        let file = fx.write("Counter.java", JAVA);
        let op = Rename::new(&file, "1bad").symbol("x");
        let err = preview(&op, &fx.ctx()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParamInvalid);
    }

    #[test]
    fn test_missing_locator() {
        let fx = Fixture::new();
        let file = fx.write("Counter.java", JAVA);
        let op = Rename::new(&file, "y");
        let err = preview(&op, &fx.ctx()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParamMissing);
    }

    #[test]
    fn test_ambiguous_overloads_refused() {
        let fx = Fixture::new();
        let file = fx.write(
            "Over.java",
            "public class Over {\n    void m(int a) {}\n    void m(String a) {}\n}\n",
        );
        let op = Rename::new(&file, "renamed").symbol("m").in_scope(Scope::File);
        let err = preview(&op, &fx.ctx()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SymbolAmbiguous);

        // A kind alone does not split the overloads, but a position does.
        let op = Rename::new(&file, "renamed")
            .symbol("m")
            .at(2, 10)
            .in_scope(Scope::File);
        assert!(preview(&op, &fx.ctx()).is_ok());
    }

    #[test]
    fn test_hybrid_counts_text_only() {
        let fx = Fixture::new();
        let file = fx.write(
            "Doc.java",
            "public class Doc {\n    // x marks the spot\n    int x = 1;\n    int get() { return x; }\n}\n",
        );
        let op = Rename::new(&file, "y")
            .symbol("x")
            .in_scope(Scope::File)
            .hybrid();
        let result = preview(&op, &fx.ctx()).unwrap();
        assert!(result.suggestions.iter().any(|s| s.contains("TEXT_ONLY")));
        // Without opting in, the comment keeps its `x`.
        let applied = execute(&op, &fx.ctx()).unwrap();
        assert!(applied.total_changes >= 2);
        let content = fs::read_to_string(&file).unwrap();
        assert!(content.contains("// x marks the spot"));
    }

    #[test]
    fn test_hybrid_applies_text_matches_when_opted_in() {
        let fx = Fixture::new();
        let file = fx.write(
            "Doc.java",
            "public class Doc {\n    // x marks the spot\n    int x = 1;\n}\n",
        );
        let op = Rename::new(&file, "y")
            .symbol("x")
            .in_scope(Scope::File)
            .apply_text_matches();
        execute(&op, &fx.ctx()).unwrap();
        let content = fs::read_to_string(&file).unwrap();
        assert!(content.contains("// y marks the spot"));
        assert!(content.contains("int y = 1;"));
    }

    #[test]
    fn test_same_name_conflict() {
        let fx = Fixture::new();
        let file = fx.write("Counter.java", JAVA);
        let op = Rename::new(&file, "x").symbol("x");
        let err = preview(&op, &fx.ctx()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParamConflict);
    }
}
