//! Extract method: lift a line selection into a new method and replace it
//! with a call.

use std::path::PathBuf;

use regex::Regex;

use crate::error::{CodeNavError, ErrorCode, ErrorEnvelope, Result};
use crate::fsio;
use crate::lang::LanguageId;
use crate::parse::ParseResult;

use super::analysis;
use super::{ChangeDetail, Plan, PlannedEdit, RefactorContext, RefactoringOperation};

const BODY_INDENT: &str = "    ";

/// Extract a line range into a new method.
#[derive(Debug, Clone)]
pub struct ExtractMethod {
    pub file: PathBuf,
    pub method_name: String,
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
    /// Alternative selection: a regex matching the first line to extract.
    pub pattern: Option<String>,
    pub access_modifier: Option<String>,
    pub return_type: Option<String>,
}

impl ExtractMethod {
    pub fn new(file: impl Into<PathBuf>, method_name: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            method_name: method_name.into(),
            start_line: None,
            end_line: None,
            pattern: None,
            access_modifier: None,
            return_type: None,
        }
    }

    pub fn lines(mut self, start: u32, end: u32) -> Self {
        self.start_line = Some(start);
        self.end_line = Some(end);
        self
    }

    pub fn matching(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_access(mut self, modifier: impl Into<String>) -> Self {
        self.access_modifier = Some(modifier.into());
        self
    }

    pub fn with_return_type(mut self, ty: impl Into<String>) -> Self {
        self.return_type = Some(ty.into());
        self
    }

    fn selection(&self, content: &str) -> Result<(u32, u32)> {
        let line_count = fsio::count_lines(content);
        if let (Some(start), Some(end)) = (self.start_line, self.end_line) {
            if start == 0 || end < start {
                return Err(CodeNavError::envelope(
                    ErrorCode::ParamOutOfRange,
                    format!("Invalid selection {start}..{end}"),
                ));
            }
            if end > line_count {
                return Err(CodeNavError::Tool(
                    ErrorEnvelope::new(
                        ErrorCode::ParamLineExceeds,
                        format!("Selection ends at line {end}, file has {line_count} lines"),
                    )
                    .with_context("lineCount", line_count.to_string()),
                ));
            }
            return Ok((start, end));
        }
        if let Some(pattern) = &self.pattern {
            let regex = Regex::new(pattern)?;
            for (row, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    let line_no = row as u32 + 1;
                    let end = self.end_line.unwrap_or(line_no);
                    return Ok((line_no, end.max(line_no)));
                }
            }
            return Err(CodeNavError::envelope(
                ErrorCode::PatternNotFound,
                format!("No line matches /{pattern}/"),
            ));
        }
        Err(CodeNavError::Tool(
            ErrorEnvelope::new(
                ErrorCode::ParamMissing,
                "Either startLine+endLine or a pattern is required",
            )
            .with_context("param", "startLine"),
        ))
    }
}

impl RefactoringOperation for ExtractMethod {
    fn name(&self) -> &'static str {
        "Extract Method"
    }

    fn validate_params(&self) -> Result<()> {
        if self.method_name.is_empty() {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(ErrorCode::ParamMissing, "methodName must not be empty")
                    .with_context("param", "methodName"),
            ));
        }
        if self.start_line.is_none() && self.pattern.is_none() {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(
                    ErrorCode::ParamMissing,
                    "Either startLine+endLine or a pattern is required",
                )
                .with_context("param", "startLine"),
            ));
        }
        Ok(())
    }

    fn plan(&self, ctx: &RefactorContext) -> Result<Plan> {
        let pr = ctx.cache.parse_file(&self.file, None)?;
        if !matches!(
            pr.lang,
            LanguageId::Java
                | LanguageId::Kotlin
                | LanguageId::JavaScript
                | LanguageId::TypeScript
                | LanguageId::Tsx
                | LanguageId::Python
        ) {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(
                    ErrorCode::RefactorLanguageNotSupported,
                    format!("Extract method is not available for {}", pr.lang),
                )
                .with_context("language", pr.lang.to_string()),
            ));
        }
        let content = pr.content.clone();
        let (start, end) = self.selection(&content)?;

        // Variable analysis over the selection.
        let declared = analysis::declared_in_range(&pr, start, end);
        let declared_names: Vec<&str> = declared.iter().map(|(n, _)| n.as_str()).collect();
        let used = analysis::used_in_range(&pr, start, end);
        let outer = analysis::outer_variables(&pr, start);

        let mut params: Vec<(String, String)> = used
            .iter()
            .filter(|name| outer.contains_key(*name) && !declared_names.contains(&name.as_str()))
            .map(|name| {
                let ty = outer
                    .get(name)
                    .cloned()
                    .flatten()
                    .unwrap_or_else(|| analysis::object_type(pr.lang).to_string());
                (name.clone(), ty)
            })
            .collect();
        params.sort();
        params.dedup();

        let returned = analysis::return_expression_in_range(&pr, start, end);
        let return_type = match (&self.return_type, &returned) {
            (Some(explicit), _) => Some(explicit.clone()),
            (None, Some(expr)) => {
                let mut known = outer.clone();
                for (name, ty) in &declared {
                    known.insert(name.clone(), ty.clone());
                }
                Some(analysis::infer_expression_type(expr, pr.lang, &known))
            }
            (None, None) => None,
        };
        let is_static = analysis::is_static_context(&pr, start);
        let in_class = analysis::enclosing_class(&pr, start).is_some();

        let lines: Vec<&str> = content.lines().collect();
        let selection: Vec<String> =
            lines[start as usize - 1..end as usize].iter().map(|l| l.to_string()).collect();
        let base_indent = analysis::indentation_of(&content, start);

        let method_indent = method_indentation(&pr, start, in_class);
        let method_text = render_method(
            pr.lang,
            &self.method_name,
            &params,
            return_type.as_deref(),
            self.access_modifier.as_deref(),
            is_static,
            &selection,
            &base_indent,
            &method_indent,
        );
        let call_line = render_call(
            pr.lang,
            &self.method_name,
            &params,
            returned.is_some(),
            is_static,
            in_class,
            &base_indent,
        );

        // Rebuild: replace the selection with the call, then insert the new
        // method at its insertion point in the shifted coordinates.
        let mut new_lines: Vec<String> = Vec::with_capacity(lines.len());
        new_lines.extend(lines[..start as usize - 1].iter().map(|l| l.to_string()));
        new_lines.push(call_line.clone());
        new_lines.extend(lines[end as usize..].iter().map(|l| l.to_string()));

        let removed = (end - start) as usize; // selection shrank by this many lines
        let insertion_row = insertion_point(&pr, start, in_class)
            .map(|row| row.saturating_sub(removed))
            .unwrap_or(new_lines.len());
        let insertion_row = insertion_row.min(new_lines.len());
        for (offset, line) in method_text.iter().enumerate() {
            new_lines.insert(insertion_row + offset, line.clone());
        }

        let mut modified = new_lines.join("\n");
        if content.ends_with('\n') {
            modified.push('\n');
        }

        let mut plan = Plan::new(format!("extract method {}", self.method_name));
        let signature: Vec<String> = params.iter().map(|(n, t)| format!("{t} {n}")).collect();
        plan.suggest(format!(
            "{}({}) extracted from lines {start}-{end}",
            self.method_name,
            signature.join(", ")
        ));
        plan.push(
            PlannedEdit::new(&self.file, content, modified).with_details(vec![ChangeDetail {
                line: start,
                column: 1,
                before: selection.join("\n"),
                after: call_line,
            }]),
        );
        Ok(plan)
    }
}

/// Indentation for the generated method: the enclosing function's own
/// indentation, or none at top level.
fn method_indentation(pr: &ParseResult, line: u32, in_class: bool) -> String {
    if let Some(function) = analysis::enclosing_function(pr, line) {
        let fn_line = function.start_position().row as u32 + 1;
        return analysis::indentation_of(&pr.content, fn_line);
    }
    if in_class { BODY_INDENT.to_string() } else { String::new() }
}

/// 0-based row before which the method is inserted: the enclosing class's
/// closing brace, or `None` for end of file.
fn insertion_point(pr: &ParseResult, line: u32, in_class: bool) -> Option<usize> {
    if !in_class || pr.lang == LanguageId::Python {
        return None;
    }
    let class = analysis::enclosing_class(pr, line)?;
    Some(class.end_position().row)
}

#[allow(clippy::too_many_arguments)]
fn render_method(
    lang: LanguageId,
    name: &str,
    params: &[(String, String)],
    return_type: Option<&str>,
    access: Option<&str>,
    is_static: bool,
    selection: &[String],
    base_indent: &str,
    method_indent: &str,
) -> Vec<String> {
    let body_indent = format!("{method_indent}{BODY_INDENT}");
    let reindent = |line: &String| {
        let stripped = line.strip_prefix(base_indent).unwrap_or(line);
        if stripped.trim().is_empty() {
            String::new()
        } else {
            format!("{body_indent}{stripped}")
        }
    };
    let mut out = Vec::new();
    out.push(String::new());
    match lang {
        LanguageId::Java => {
            let access = access.unwrap_or("private");
            let statik = if is_static { "static " } else { "" };
            let ret = return_type.unwrap_or("void");
            let args: Vec<String> = params.iter().map(|(n, t)| format!("{t} {n}")).collect();
            out.push(format!(
                "{method_indent}{access} {statik}{ret} {name}({}) {{",
                args.join(", ")
            ));
            out.extend(selection.iter().map(reindent));
            out.push(format!("{method_indent}}}"));
        }
        LanguageId::Kotlin => {
            let args: Vec<String> = params.iter().map(|(n, t)| format!("{n}: {t}")).collect();
            let ret = return_type.map(|t| format!(": {t}")).unwrap_or_default();
            let access = access.map(|a| format!("{a} ")).unwrap_or_default();
            out.push(format!(
                "{method_indent}{access}fun {name}({}){ret} {{",
                args.join(", ")
            ));
            out.extend(selection.iter().map(reindent));
            out.push(format!("{method_indent}}}"));
        }
        LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Tsx => {
            let typed = lang != LanguageId::JavaScript;
            let args: Vec<String> = params
                .iter()
                .map(|(n, t)| if typed { format!("{n}: {t}") } else { n.clone() })
                .collect();
            let ret = if typed {
                return_type.map(|t| format!(": {t}")).unwrap_or_default()
            } else {
                String::new()
            };
            if method_indent.is_empty() {
                out.push(format!("function {name}({}){ret} {{", args.join(", ")));
            } else {
                let statik = if is_static { "static " } else { "" };
                out.push(format!(
                    "{method_indent}{statik}{name}({}){ret} {{",
                    args.join(", ")
                ));
            }
            out.extend(selection.iter().map(reindent));
            out.push(format!("{method_indent}}}"));
        }
        LanguageId::Python => {
            let mut args: Vec<String> = Vec::new();
            if !is_static {
                args.push("self".to_string());
            }
            args.extend(params.iter().map(|(n, _)| n.clone()));
            out.push(format!("{method_indent}def {name}({}):", args.join(", ")));
            out.extend(selection.iter().map(reindent));
        }
        _ => {}
    }
    out
}

fn render_call(
    lang: LanguageId,
    name: &str,
    params: &[(String, String)],
    has_return: bool,
    is_static: bool,
    in_class: bool,
    base_indent: &str,
) -> String {
    let args: Vec<&str> = params.iter().map(|(n, _)| n.as_str()).collect();
    let receiver = match lang {
        LanguageId::Python if in_class && !is_static => "self.",
        LanguageId::Java | LanguageId::Kotlin | LanguageId::JavaScript | LanguageId::TypeScript
        | LanguageId::Tsx
            if in_class && !is_static =>
        {
            "this."
        }
        _ => "",
    };
    let terminator = match lang {
        LanguageId::Java | LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Tsx => {
            ";"
        }
        _ => "",
    };
    let prefix = if has_return { "return " } else { "" };
    format!(
        "{base_indent}{prefix}{receiver}{name}({}){terminator}",
        args.join(", ")
    )
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

    const JAVA: &str = "public class Calc {\n    public int run(int a, int b) {\n        int total = a + b;\n        int doubled = total * 2;\n        return doubled;\n    }\n}\n";

    #[test]
    fn test_extract_java_method() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("Calc.java");
        fs::write(&file, JAVA).unwrap();

        let op = ExtractMethod::new(&file, "combine").lines(3, 5);
        let result = execute(&op, &fx.ctx()).unwrap();
        assert_eq!(result.total_changes, 1);

        let content = fs::read_to_string(&file).unwrap();
        // Parameters are the outer bindings used in the selection, sorted.
        assert!(content.contains("private int combine(int a, int b) {"));
        assert!(content.contains("        return this.combine(a, b);"));
        assert!(content.contains("        int doubled = total * 2;"));
        // The method landed inside the class body.
        let class_close = content.rfind('}').unwrap();
        let method_pos = content.find("private int combine").unwrap();
        assert!(method_pos < class_close);
    }

    #[test]
    fn test_extract_static_context() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("S.java");
        fs::write(
            &file,
            "public class S {\n    static int twice(int v) {\n        int r = v * 2;\n        return r;\n    }\n}\n",
        )
        .unwrap();

        let op = ExtractMethod::new(&file, "calc").lines(3, 4);
        execute(&op, &fx.ctx()).unwrap();
        let content = fs::read_to_string(&file).unwrap();
        assert!(content.contains("private static int calc(int v) {"));
        assert!(content.contains("        return calc(v);"));
    }

    #[test]
    fn test_extract_python_function() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("m.py");
        fs::write(
            &file,
            "def run(a, b):\n    total = a + b\n    return total\n",
        )
        .unwrap();

        let op = ExtractMethod::new(&file, "combine").lines(2, 3);
        execute(&op, &fx.ctx()).unwrap();
        let content = fs::read_to_string(&file).unwrap();
        assert!(content.contains("return combine(a, b)"));
        assert!(content.contains("def combine(a, b):"));
        assert!(content.contains("    total = a + b"));
    }

    #[test]
    fn test_extract_by_pattern() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("P.java");
        fs::write(
            &file,
            "public class P {\n    void go() {\n        System.out.println(\"marker\");\n    }\n}\n",
        )
        .unwrap();

        let op = ExtractMethod::new(&file, "log").matching("marker");
        let result = execute(&op, &fx.ctx()).unwrap();
        assert_eq!(result.total_changes, 1);
        let content = fs::read_to_string(&file).unwrap();
        assert!(content.contains("private void log() {"));
    }

    #[test]
    fn test_selection_exceeding_file() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("Q.java");
        fs::write(&file, "public class Q {}\n").unwrap();
        let op = ExtractMethod::new(&file, "m").lines(1, 99);
        let err = execute(&op, &fx.ctx()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParamLineExceeds);
    }

    #[test]
    fn test_unsupported_language() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("main.go");
        fs::write(&file, "package main\n\nfunc main() {\n}\n").unwrap();
        let op = ExtractMethod::new(&file, "m").lines(3, 4);
        let err = execute(&op, &fx.ctx()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::RefactorLanguageNotSupported);
    }
}
