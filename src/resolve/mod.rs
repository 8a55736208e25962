//! Navigation queries: definition, references, hover and symbol listing.
//!
//! Definition lookup proceeds local file → imports (Java) → project, using
//! the symbol index as a hint when it has been built and falling back to a
//! deadline-bounded parallel project walk. Reference search never consults
//! the index (it holds definitions only).

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::extract;
use crate::fsio;
use crate::index::SymbolIndex;
use crate::lang::LanguageId;
use crate::parse::{MAX_FILE_BYTES, ParseCache, ParseResult};
use crate::project;
use crate::symbols::{Location, SymbolInfo, SymbolKind};

/// Wall-clock budget for project-wide fan-outs.
pub const SEARCH_DEADLINE: Duration = Duration::from_secs(30);
/// Candidate cap for definition searches.
pub const MAX_DEFINITION_CANDIDATES: usize = 500;
/// Candidate cap for reference searches.
pub const MAX_REFERENCE_CANDIDATES: usize = 1_000;

/// How far smart column search probes around the caller's column.
const SMART_COLUMN_RADIUS: i64 = 3;

/// Breadth of a reference or refactoring query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    File,
    Directory,
    #[default]
    Project,
}

impl Scope {
    pub fn parse(tag: &str) -> Option<Scope> {
        match tag {
            "file" => Some(Scope::File),
            "directory" => Some(Scope::Directory),
            "project" => Some(Scope::Project),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::File => "file",
            Scope::Directory => "directory",
            Scope::Project => "project",
        }
    }
}

/// The query engine. Borrows the session's cache and index.
pub struct Resolver<'a> {
    cache: &'a ParseCache,
    index: &'a SymbolIndex,
}

impl<'a> Resolver<'a> {
    pub fn new(cache: &'a ParseCache, index: &'a SymbolIndex) -> Self {
        Self { cache, index }
    }

    /// All symbols declared in a file, in source order. Import and package
    /// records are extraction artifacts, not declarations, and are filtered
    /// here.
    pub fn list_symbols(&self, file: &Path) -> Result<Vec<SymbolInfo>> {
        let pr = self.cache.parse_file(file, None)?;
        Ok(extract::extract_definitions(&pr, file)
            .into_iter()
            .filter(|s| s.kind.is_definition())
            .collect())
    }

    /// The symbol under the cursor, probing nearby columns when the exact
    /// position is not an identifier.
    pub fn symbol_at(&self, file: &Path, line: u32, column: u32) -> Result<Option<SymbolInfo>> {
        let pr = self.cache.parse_file(file, None)?;
        Ok(smart_symbol_at(&pr, file, line, column))
    }

    /// Definition lookup from a cursor position.
    pub fn find_definition(
        &self,
        file: &Path,
        line: u32,
        column: u32,
    ) -> Result<Option<SymbolInfo>> {
        let pr = self.cache.parse_file(file, None)?;
        let Some(at) = smart_symbol_at(&pr, file, line, column) else {
            return Ok(None);
        };
        if at.kind.is_definition() {
            return Ok(Some(at));
        }
        self.find_definition_by_name(file, &at.name)
    }

    /// Definition lookup by name: local file, then Java imports, then the
    /// project (index hint first, bounded walk otherwise).
    pub fn find_definition_by_name(&self, file: &Path, name: &str) -> Result<Option<SymbolInfo>> {
        let pr = self.cache.parse_file(file, None)?;
        let defs = extract::extract_definitions(&pr, file);
        if let Some(local) = defs
            .iter()
            .find(|d| d.name == name && d.kind.is_definition())
        {
            return Ok(Some(local.clone()));
        }

        if pr.lang == LanguageId::Java {
            if let Some(imported) = self.resolve_java_import(file, &defs, name)? {
                return Ok(Some(imported));
            }
        }

        if self.index.is_indexed() {
            if let Some(hit) = self.index.find_first_definition(name) {
                if let Some(sym) = self.load_indexed_symbol(&hit.file, name, hit.start_line) {
                    return Ok(Some(sym));
                }
            }
        }

        self.project_definition_search(file, pr.lang, name)
    }

    /// Reference search from a cursor position.
    pub fn find_references(
        &self,
        file: &Path,
        line: u32,
        column: u32,
        scope: Scope,
        include_declaration: bool,
    ) -> Result<Vec<Location>> {
        let pr = self.cache.parse_file(file, None)?;
        let Some(at) = smart_symbol_at(&pr, file, line, column) else {
            return Ok(Vec::new());
        };
        self.find_references_by_name(file, &at.name, scope, include_declaration)
    }

    /// Reference search by name across the requested scope.
    pub fn find_references_by_name(
        &self,
        file: &Path,
        name: &str,
        scope: Scope,
        include_declaration: bool,
    ) -> Result<Vec<Location>> {
        let pr = self.cache.parse_file(file, None)?;
        let lang = pr.lang;
        let file = fsio::normalize_path(file);

        let candidates: Vec<PathBuf> = match scope {
            Scope::File => vec![file.clone()],
            Scope::Directory => {
                let dir = file.parent().unwrap_or(Path::new("."));
                let listed = project::list_directory_files(dir, lang)?;
                project::filter_containing(listed, name)
            }
            Scope::Project => {
                let root = project::detect_project_root(&file);
                let walked = project::collect_files(
                    &root,
                    Some(lang),
                    MAX_REFERENCE_CANDIDATES,
                    MAX_FILE_BYTES,
                )?;
                project::filter_containing(walked, name)
            }
        };

        let deadline = Instant::now() + SEARCH_DEADLINE;
        let mut locations: Vec<Location> = candidates
            .par_iter()
            .map(|candidate| {
                if Instant::now() >= deadline {
                    return Vec::new();
                }
                match self.cache.parse_file(candidate, Some(lang)) {
                    Ok(pr) => {
                        let mut found = extract::find_references(&pr, candidate, name);
                        if include_declaration {
                            found.extend(
                                extract::extract_definitions(&pr, candidate)
                                    .into_iter()
                                    .filter(|d| d.name == name && d.kind.is_definition())
                                    .map(|d| d.location),
                            );
                        }
                        found
                    }
                    Err(e) => {
                        debug!("reference scan skipping {}: {e}", candidate.display());
                        Vec::new()
                    }
                }
            })
            .collect::<Vec<Vec<Location>>>()
            .into_iter()
            .flatten()
            .collect();

        locations.sort();
        locations.dedup();
        Ok(locations)
    }

    /// Hover: the definition record for the symbol under the cursor, or the
    /// bare reference record when no definition is reachable.
    pub fn hover(&self, file: &Path, line: u32, column: u32) -> Result<Option<SymbolInfo>> {
        let pr = self.cache.parse_file(file, None)?;
        let Some(at) = smart_symbol_at(&pr, file, line, column) else {
            return Ok(None);
        };
        if at.kind != SymbolKind::Reference {
            return Ok(Some(at));
        }
        match self.find_definition_by_name(file, &at.name)? {
            Some(def) => Ok(Some(def)),
            None => Ok(Some(at)),
        }
    }

    /// Resolve a Java import of `name` to a definition in the imported file.
    fn resolve_java_import(
        &self,
        file: &Path,
        defs: &[SymbolInfo],
        name: &str,
    ) -> Result<Option<SymbolInfo>> {
        let root = project::detect_project_root(file);
        for import in defs.iter().filter(|d| d.kind == SymbolKind::Import) {
            let dotted = import.name.trim_start_matches("static ").trim();
            let (package, last) = match dotted.rsplit_once('.') {
                Some(parts) => parts,
                None => continue,
            };
            let target_package = if last == "*" {
                package
            } else if last == name {
                package
            } else {
                continue;
            };
            let rel: PathBuf = target_package.split('.').collect();
            let file_name = format!("{name}.java");
            for base in [
                root.join("src/main/java"),
                root.join("src"),
                root.clone(),
            ] {
                let candidate = base.join(&rel).join(&file_name);
                if !candidate.is_file() {
                    continue;
                }
                let pr = match self.cache.parse_file(&candidate, Some(LanguageId::Java)) {
                    Ok(pr) => pr,
                    Err(e) => {
                        debug!("import resolution skipping {}: {e}", candidate.display());
                        continue;
                    }
                };
                if let Some(def) = extract::extract_definitions(&pr, &candidate)
                    .into_iter()
                    .find(|d| d.name == name && d.kind.is_definition())
                {
                    return Ok(Some(def));
                }
            }
        }
        Ok(None)
    }

    /// Bounded parallel walk for a definition when the index cannot answer.
    fn project_definition_search(
        &self,
        file: &Path,
        lang: LanguageId,
        name: &str,
    ) -> Result<Option<SymbolInfo>> {
        let root = project::detect_project_root(file);
        let walked = project::collect_files(
            &root,
            Some(lang),
            MAX_DEFINITION_CANDIDATES,
            MAX_FILE_BYTES,
        )?;
        let candidates = project::filter_containing(walked, name);

        let deadline = Instant::now() + SEARCH_DEADLINE;
        let mut hits: Vec<SymbolInfo> = candidates
            .par_iter()
            .filter_map(|candidate| {
                if Instant::now() >= deadline {
                    return None;
                }
                let pr = match self.cache.parse_file(candidate, Some(lang)) {
                    Ok(pr) => pr,
                    Err(e) => {
                        debug!("definition scan skipping {}: {e}", candidate.display());
                        return None;
                    }
                };
                extract::extract_definitions(&pr, candidate)
                    .into_iter()
                    .find(|d| d.name == name && d.kind.is_definition())
            })
            .collect();
        hits.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(hits.into_iter().next())
    }

    fn load_indexed_symbol(
        &self,
        file: &Path,
        name: &str,
        start_line: u32,
    ) -> Option<SymbolInfo> {
        let pr = self.cache.parse_file(file, None).ok()?;
        extract::extract_definitions(&pr, file)
            .into_iter()
            .find(|d| d.name == name && d.location.start_line == start_line)
    }
}

/// Probe `(line, column ± Δ)` for Δ up to three, preferring the right side,
/// and return the symbol at the first identifier found.
fn smart_symbol_at(
    pr: &ParseResult,
    path: &Path,
    line: u32,
    column: u32,
) -> Option<SymbolInfo> {
    let mut deltas = vec![0i64];
    for delta in 1..=SMART_COLUMN_RADIUS {
        deltas.push(delta);
        deltas.push(-delta);
    }
    for delta in deltas {
        let probed = column as i64 + delta;
        if probed < 1 {
            continue;
        }
        if let Some(sym) = extract::symbol_at_position(pr, path, line, probed as u32) {
            return Some(sym);
        }
    }
    None
}
