//! Extract variable: name an expression and replace its occurrences.

use std::path::PathBuf;

use regex::Regex;

use crate::error::{CodeNavError, ErrorCode, ErrorEnvelope, Result};
use crate::fsio;
use crate::lang::LanguageId;

use super::analysis;
use super::{ChangeDetail, Plan, PlannedEdit, RefactorContext, RefactoringOperation};

/// Extract an expression into a local variable.
#[derive(Debug, Clone)]
pub struct ExtractVariable {
    pub file: PathBuf,
    pub variable_name: String,
    pub line: u32,
    pub start_column: Option<u32>,
    pub end_column: Option<u32>,
    /// `None` or `"auto"` triggers inference.
    pub type_name: Option<String>,
    pub replace_all: bool,
}

impl ExtractVariable {
    pub fn new(file: impl Into<PathBuf>, variable_name: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            variable_name: variable_name.into(),
            line,
            start_column: None,
            end_column: None,
            type_name: None,
            replace_all: false,
        }
    }

    /// Narrow the expression to a column span on the line.
    pub fn columns(mut self, start: u32, end: u32) -> Self {
        self.start_column = Some(start);
        self.end_column = Some(end);
        self
    }

    pub fn with_type(mut self, ty: impl Into<String>) -> Self {
        self.type_name = Some(ty.into());
        self
    }

    /// Replace every occurrence within the enclosing function.
    pub fn replace_all(mut self) -> Self {
        self.replace_all = true;
        self
    }
}

impl RefactoringOperation for ExtractVariable {
    fn name(&self) -> &'static str {
        "Extract Variable"
    }

    fn validate_params(&self) -> Result<()> {
        if self.variable_name.is_empty() {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(ErrorCode::ParamMissing, "variableName must not be empty")
                    .with_context("param", "variableName"),
            ));
        }
        if self.line == 0 {
            return Err(CodeNavError::envelope(
                ErrorCode::ParamOutOfRange,
                "line must be 1-based",
            ));
        }
        if let (Some(start), Some(end)) = (self.start_column, self.end_column) {
            if start == 0 || end <= start {
                return Err(CodeNavError::envelope(
                    ErrorCode::ParamOutOfRange,
                    format!("Invalid column span {start}..{end}"),
                ));
            }
        }
        Ok(())
    }

    fn plan(&self, ctx: &RefactorContext) -> Result<Plan> {
        let pr = ctx.cache.parse_file(&self.file, None)?;
        if pr.lang == LanguageId::Html {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(
                    ErrorCode::RefactorLanguageNotSupported,
                    "Extract variable is not available for html",
                )
                .with_context("language", "html"),
            ));
        }
        let content = pr.content.clone();
        let line_count = fsio::count_lines(&content);
        if self.line > line_count {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(
                    ErrorCode::ParamLineExceeds,
                    format!("Line {} exceeds file length {line_count}", self.line),
                )
                .with_context("lineCount", line_count.to_string()),
            ));
        }

        let lines: Vec<String> = content.lines().map(String::from).collect();
        let source_line = &lines[self.line as usize - 1];
        let expression = match (self.start_column, self.end_column) {
            (Some(start), Some(end)) => source_line
                .get(start as usize - 1..end as usize - 1)
                .unwrap_or("")
                .trim()
                .to_string(),
            _ => source_line.trim().trim_end_matches(';').trim().to_string(),
        };
        if expression.is_empty() {
            return Err(CodeNavError::envelope(
                ErrorCode::ParamInvalid,
                "The selection contains no expression",
            ));
        }

        // Occurrence search: within the enclosing function when replacing
        // all, otherwise just the selected line.
        let (scan_start, scan_end) = if self.replace_all {
            match analysis::enclosing_function(&pr, self.line) {
                Some(function) => (
                    function.start_position().row as u32 + 1,
                    function.end_position().row as u32 + 1,
                ),
                None => (1, line_count),
            }
        } else {
            (self.line, self.line)
        };

        let pattern = bounded_pattern(&expression)?;
        let mut occurrences: Vec<(u32, u32)> = Vec::new();
        for row in scan_start..=scan_end {
            let line = &lines[row as usize - 1];
            for hit in pattern.find_iter(line) {
                occurrences.push((row, hit.start() as u32 + 1));
            }
        }
        if occurrences.is_empty() {
            return Err(CodeNavError::envelope(
                ErrorCode::PatternNotFound,
                format!("Expression '{expression}' not found in scope"),
            ));
        }
        if !self.replace_all {
            occurrences.truncate(1);
        }

        let inferred = match self.type_name.as_deref() {
            Some("auto") | None => {
                let known = analysis::outer_variables(&pr, self.line);
                analysis::infer_expression_type(&expression, pr.lang, &known)
            }
            Some(explicit) => explicit.to_string(),
        };
        let first_line = occurrences.iter().map(|(l, _)| *l).min().unwrap_or(self.line);
        let indent = analysis::indentation_of(&content, first_line);
        let declaration = render_declaration(
            pr.lang,
            &self.variable_name,
            &inferred,
            &expression,
            &indent,
        );

        // Bottom-up replacement keeps earlier offsets valid.
        let mut new_lines = lines.clone();
        let mut details = Vec::new();
        let mut ordered = occurrences.clone();
        ordered.sort_by(|a, b| b.cmp(a));
        for (row, col) in &ordered {
            let line = &mut new_lines[*row as usize - 1];
            let start = *col as usize - 1;
            let end = start + expression.len();
            line.replace_range(start..end, &self.variable_name);
            details.push(ChangeDetail {
                line: *row,
                column: *col,
                before: expression.clone(),
                after: self.variable_name.clone(),
            });
        }
        details.reverse();
        new_lines.insert(first_line as usize - 1, declaration);

        let mut modified = new_lines.join("\n");
        if content.ends_with('\n') {
            modified.push('\n');
        }
        let mut plan = Plan::new(format!("extract variable {}", self.variable_name));
        plan.push(PlannedEdit::new(&self.file, content, modified).with_details(details));
        Ok(plan)
    }
}

/// Word-boundary match, with the boundaries dropped when the expression
/// starts or ends in a non-word character.
fn bounded_pattern(expression: &str) -> Result<Regex> {
    let escaped = regex::escape(expression);
    let lead = expression
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_');
    let trail = expression
        .chars()
        .last()
        .is_some_and(|c| c.is_alphanumeric() || c == '_');
    let pattern = format!(
        "{}{}{}",
        if lead { r"\b" } else { "" },
        escaped,
        if trail { r"\b" } else { "" }
    );
    Ok(Regex::new(&pattern)?)
}

fn render_declaration(
    lang: LanguageId,
    name: &str,
    ty: &str,
    expression: &str,
    indent: &str,
) -> String {
    match lang {
        LanguageId::Java => format!("{indent}{ty} {name} = {expression};"),
        LanguageId::Kotlin => format!("{indent}val {name} = {expression}"),
        LanguageId::Python => format!("{indent}{name} = {expression}"),
        LanguageId::JavaScript => format!("{indent}const {name} = {expression};"),
        LanguageId::TypeScript | LanguageId::Tsx => {
            if ty.contains('<') || ty == "any" {
                format!("{indent}const {name} = {expression};")
            } else {
                format!("{indent}const {name}: {ty} = {expression};")
            }
        }
        LanguageId::Go => format!("{indent}{name} := {expression}"),
        LanguageId::Rust => format!("{indent}let {name} = {expression};"),
        LanguageId::C => format!("{indent}{ty} {name} = {expression};"),
        LanguageId::Cpp => format!("{indent}auto {name} = {expression};"),
        LanguageId::CSharp => format!("{indent}var {name} = {expression};"),
        LanguageId::Php => format!("{indent}${name} = {expression};"),
        LanguageId::Html => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::ChangeTracker;
    use crate::index::SymbolIndex;
    use crate::parse::ParseCache;
    use crate::refactor::execute;
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
    }

    #[test]
    fn test_extract_java_expression_span() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("E.java");
        fs::write(
            &file,
            "public class E {\n    int area(int w, int h) {\n        return w * h;\n    }\n}\n",
        )
        .unwrap();

        // Columns of `w * h` on line 3.
        let op = ExtractVariable::new(&file, "area", 3).columns(16, 21);
        execute(&op, &fx.ctx()).unwrap();
        let content = fs::read_to_string(&file).unwrap();
        assert!(content.contains("        int area = w * h;"));
        assert!(content.contains("        return area;"));
    }

    #[test]
    fn test_replace_all_within_function() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("R.java");
        fs::write(
            &file,
            "public class R {\n    int f(int x) {\n        int a = x + 1;\n        int b = x + 1;\n        return a + b;\n    }\n    int g(int x) { return x + 1; }\n}\n",
        )
        .unwrap();

        let op = ExtractVariable::new(&file, "next", 3)
            .columns(17, 22)
            .replace_all();
        let result = execute(&op, &fx.ctx()).unwrap();
        assert_eq!(result.total_changes, 2);
        let content = fs::read_to_string(&file).unwrap();
        assert!(content.contains("int next = x + 1;"));
        assert!(content.contains("int a = next;"));
        assert!(content.contains("int b = next;"));
        // The sibling function is outside the scope.
        assert!(content.contains("int g(int x) { return x + 1; }"));
    }

    #[test]
    fn test_typescript_attaches_type() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("t.ts");
        fs::write(
            &file,
            "function scale(n: number) {\n    return n * 2.5;\n}\n",
        )
        .unwrap();

        let op = ExtractVariable::new(&file, "factor", 2).columns(16, 19);
        execute(&op, &fx.ctx()).unwrap();
        let content = fs::read_to_string(&file).unwrap();
        assert!(content.contains("const factor: number = 2.5;"));
    }

    #[test]
    fn test_rust_let_binding() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("l.rs");
        fs::write(&file, "fn main() {\n    println!(\"{}\", 6 * 7);\n}\n").unwrap();

        let op = ExtractVariable::new(&file, "answer", 2).columns(20, 25);
        execute(&op, &fx.ctx()).unwrap();
        let content = fs::read_to_string(&file).unwrap();
        assert!(content.contains("    let answer = 6 * 7;"));
        assert!(content.contains("println!(\"{}\", answer);"));
    }

    #[test]
    fn test_line_exceeds() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("x.py");
        fs::write(&file, "x = 1\n").unwrap();
        let op = ExtractVariable::new(&file, "v", 9);
        let err = execute(&op, &fx.ctx()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParamLineExceeds);
    }
}
