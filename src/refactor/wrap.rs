//! Wrap: surround a line range with a control-flow construct.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{CodeNavError, ErrorCode, ErrorEnvelope, Result};
use crate::fsio;
use crate::lang::LanguageId;

use super::analysis;
use super::{ChangeDetail, Plan, PlannedEdit, RefactorContext, RefactoringOperation};

const INDENT_STEP: &str = "    ";

/// The closed set of wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapKind {
    TryCatch,
    TryFinally,
    TryWithResources,
    If,
    IfElse,
    For,
    Foreach,
    While,
    Synchronized,
    Custom,
}

impl WrapKind {
    pub fn parse(tag: &str) -> Option<WrapKind> {
        match tag {
            "try_catch" => Some(WrapKind::TryCatch),
            "try_finally" => Some(WrapKind::TryFinally),
            "try_with_resources" => Some(WrapKind::TryWithResources),
            "if" => Some(WrapKind::If),
            "if_else" => Some(WrapKind::IfElse),
            "for" => Some(WrapKind::For),
            "foreach" => Some(WrapKind::Foreach),
            "while" => Some(WrapKind::While),
            "synchronized" => Some(WrapKind::Synchronized),
            "custom" => Some(WrapKind::Custom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WrapKind::TryCatch => "try_catch",
            WrapKind::TryFinally => "try_finally",
            WrapKind::TryWithResources => "try_with_resources",
            WrapKind::If => "if",
            WrapKind::IfElse => "if_else",
            WrapKind::For => "for",
            WrapKind::Foreach => "foreach",
            WrapKind::While => "while",
            WrapKind::Synchronized => "synchronized",
            WrapKind::Custom => "custom",
        }
    }
}

/// Wrap a line range in a control construct.
#[derive(Debug, Clone)]
pub struct Wrap {
    pub file: PathBuf,
    pub start_line: u32,
    pub end_line: u32,
    pub kind: WrapKind,
    pub options: HashMap<String, String>,
}

impl Wrap {
    pub fn new(file: impl Into<PathBuf>, kind: WrapKind, start_line: u32, end_line: u32) -> Self {
        Self {
            file: file.into(),
            start_line,
            end_line,
            kind,
            options: HashMap::new(),
        }
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    fn opt(&self, key: &str, default: &str) -> String {
        self.options
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

impl RefactoringOperation for Wrap {
    fn name(&self) -> &'static str {
        "Wrap"
    }

    fn validate_params(&self) -> Result<()> {
        if self.start_line == 0 || self.end_line < self.start_line {
            return Err(CodeNavError::envelope(
                ErrorCode::ParamOutOfRange,
                format!("Invalid range {}..{}", self.start_line, self.end_line),
            ));
        }
        if self.kind == WrapKind::Custom && !self.opt("template", "").contains("${code}") {
            return Err(CodeNavError::envelope(
                ErrorCode::ParamInvalid,
                "A custom wrapper needs a template containing ${code}",
            ));
        }
        Ok(())
    }

    fn plan(&self, ctx: &RefactorContext) -> Result<Plan> {
        let pr = ctx.cache.parse_file(&self.file, None)?;
        let content = pr.content.clone();
        let line_count = fsio::count_lines(&content);
        if self.end_line > line_count {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(
                    ErrorCode::ParamLineExceeds,
                    format!(
                        "Range ends at line {}, file has {line_count} lines",
                        self.end_line
                    ),
                )
                .with_context("lineCount", line_count.to_string()),
            ));
        }

        let lines: Vec<String> = content.lines().map(String::from).collect();
        let base = analysis::indentation_of(&content, self.start_line);
        let selection = &lines[self.start_line as usize - 1..self.end_line as usize];

        let wrapped = if self.kind == WrapKind::Custom {
            self.render_custom(selection, &base)
        } else {
            let (header, footer) = self.render_frame(pr.lang, &base)?;
            let mut out = header;
            out.extend(reindent_inner(selection, &base));
            out.extend(footer);
            out
        };

        let mut new_lines = Vec::with_capacity(lines.len() + 4);
        new_lines.extend(lines[..self.start_line as usize - 1].iter().cloned());
        new_lines.extend(wrapped.clone());
        new_lines.extend(lines[self.end_line as usize..].iter().cloned());
        let mut modified = new_lines.join("\n");
        if content.ends_with('\n') {
            modified.push('\n');
        }

        let mut plan = Plan::new(format!("wrap {} lines in {}", selection.len(), self.kind.as_str()));
        plan.push(
            PlannedEdit::new(&self.file, content, modified).with_details(vec![ChangeDetail {
                line: self.start_line,
                column: 1,
                before: selection.join("\n"),
                after: wrapped.join("\n"),
            }]),
        );
        Ok(plan)
    }
}

impl Wrap {
    /// Header and footer lines for the wrapper, both at the base indent.
    fn render_frame(
        &self,
        lang: LanguageId,
        base: &str,
    ) -> Result<(Vec<String>, Vec<String>)> {
        use WrapKind::*;
        let unsupported = || {
            CodeNavError::Tool(
                ErrorEnvelope::new(
                    ErrorCode::RefactorLanguageNotSupported,
                    format!("{} wrapping is not available for {lang}", self.kind.as_str()),
                )
                .with_context("language", lang.to_string()),
            )
        };
        let python = lang == LanguageId::Python;
        if lang == LanguageId::Html {
            return Err(unsupported());
        }
        if matches!(self.kind, TryCatch | TryFinally)
            && matches!(lang, LanguageId::Go | LanguageId::Rust | LanguageId::C)
        {
            return Err(unsupported());
        }

        Ok(match (self.kind, python) {
            (TryCatch, false) => {
                let ty = self.opt("exceptionType", default_exception(lang));
                let var = self.opt("exceptionVar", "e");
                let catch_body = self.opt("catchBody", &default_catch_body(lang, &var));
                let catch_head = match lang {
                    LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Tsx => {
                        format!("{base}}} catch ({var}) {{")
                    }
                    LanguageId::Php => format!("{base}}} catch ({ty} ${var}) {{"),
                    _ => format!("{base}}} catch ({ty} {var}) {{"),
                };
                (
                    vec![format!("{base}try {{")],
                    vec![
                        catch_head,
                        format!("{base}{INDENT_STEP}{catch_body}"),
                        format!("{base}}}"),
                    ],
                )
            }
            (TryCatch, true) => {
                let ty = self.opt("exceptionType", "Exception");
                let var = self.opt("exceptionVar", "e");
                let catch_body = self.opt("catchBody", "pass");
                (
                    vec![format!("{base}try:")],
                    vec![
                        format!("{base}except {ty} as {var}:"),
                        format!("{base}{INDENT_STEP}{catch_body}"),
                    ],
                )
            }
            (TryFinally, false) => (
                vec![format!("{base}try {{")],
                vec![
                    format!("{base}}} finally {{"),
                    format!("{base}}}"),
                ],
            ),
            (TryFinally, true) => (
                vec![format!("{base}try:")],
                vec![format!("{base}finally:"), format!("{base}{INDENT_STEP}pass")],
            ),
            (TryWithResources, _) => {
                if lang != LanguageId::Java {
                    return Err(unsupported());
                }
                let resource = self.opt("resource", "resource");
                let init = self.opt("resourceInit", "null");
                (
                    vec![format!("{base}try (var {resource} = {init}) {{")],
                    vec![format!("{base}}}")],
                )
            }
            (If, _) | (IfElse, _) => {
                let condition = self.opt("condition", default_condition(lang));
                let header = vec![condition_line(lang, "if", &condition, base)];
                let mut footer = Vec::new();
                if self.kind == IfElse {
                    let else_body = self.opt("elseBody", if python { "pass" } else { "" });
                    if python {
                        footer.push(format!("{base}else:"));
                        footer.push(format!("{base}{INDENT_STEP}{else_body}"));
                    } else {
                        footer.push(format!("{base}}} else {{"));
                        if !else_body.is_empty() {
                            footer.push(format!("{base}{INDENT_STEP}{else_body}"));
                        }
                        footer.push(format!("{base}}}"));
                    }
                } else if python {
                    // Colon blocks need no footer.
                } else {
                    footer.push(format!("{base}}}"));
                }
                (header, footer)
            }
            (For, true) => {
                let var = self.opt("var", "i");
                let range = self.opt("range", "range(10)");
                (vec![format!("{base}for {var} in {range}:")], Vec::new())
            }
            (For, false) => {
                let header = match lang {
                    LanguageId::Rust => {
                        let var = self.opt("var", "i");
                        let range = self.opt("range", "0..10");
                        format!("{base}for {var} in {range} {{")
                    }
                    LanguageId::Go => {
                        let init = self.opt("init", "i := 0");
                        let condition = self.opt("condition", "i < 10");
                        let update = self.opt("update", "i++");
                        format!("{base}for {init}; {condition}; {update} {{")
                    }
                    _ => {
                        let init = self.opt("init", "int i = 0");
                        let condition = self.opt("condition", "i < 10");
                        let update = self.opt("update", "i++");
                        format!("{base}for ({init}; {condition}; {update}) {{")
                    }
                };
                (vec![header], vec![format!("{base}}}")])
            }
            (Foreach, true) => {
                let item = self.opt("item", "item");
                let collection = self.opt("collection", "items");
                (
                    vec![format!("{base}for {item} in {collection}:")],
                    Vec::new(),
                )
            }
            (Foreach, false) => {
                let item = self.opt("item", "item");
                let collection = self.opt("collection", "items");
                let header = match lang {
                    LanguageId::Java => {
                        let ty = self.opt("itemType", "var");
                        format!("{base}for ({ty} {item} : {collection}) {{")
                    }
                    LanguageId::Kotlin | LanguageId::Rust => {
                        format!("{base}for ({item} in {collection}) {{")
                    }
                    LanguageId::Go => format!("{base}for _, {item} := range {collection} {{"),
                    LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Tsx => {
                        format!("{base}for (const {item} of {collection}) {{")
                    }
                    LanguageId::CSharp => {
                        let ty = self.opt("itemType", "var");
                        format!("{base}foreach ({ty} {item} in {collection}) {{")
                    }
                    LanguageId::Php => format!("{base}foreach (${collection} as ${item}) {{"),
                    _ => return Err(unsupported()),
                };
                (vec![header], vec![format!("{base}}}")])
            }
            (While, _) => {
                let condition = self.opt("condition", default_condition(lang));
                let header = vec![condition_line(lang, "while", &condition, base)];
                let footer = if python {
                    Vec::new()
                } else {
                    vec![format!("{base}}}")]
                };
                (header, footer)
            }
            (Synchronized, _) => {
                if lang != LanguageId::Java {
                    return Err(unsupported());
                }
                let lock = self.opt("lock", "this");
                (
                    vec![format!("{base}synchronized ({lock}) {{")],
                    vec![format!("{base}}}")],
                )
            }
            (Custom, _) => unreachable!("custom handled separately"),
        })
    }

    /// Substitute the selection into the template at its `${code}` line.
    fn render_custom(&self, selection: &[String], base: &str) -> Vec<String> {
        let template = self.opt("template", "${code}");
        let mut out = Vec::new();
        for template_line in template.lines() {
            if let Some(placeholder_at) = template_line.find("${code}") {
                let extra = &template_line[..placeholder_at];
                for line in reindent_inner(selection, base) {
                    let stripped = line.strip_prefix(base).unwrap_or(&line);
                    out.push(format!("{base}{extra}{stripped}"));
                }
            } else {
                out.push(format!("{base}{template_line}"));
            }
        }
        out
    }
}

fn reindent_inner(selection: &[String], base: &str) -> Vec<String> {
    selection
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                let stripped = line.strip_prefix(base).unwrap_or(line);
                format!("{base}{INDENT_STEP}{stripped}")
            }
        })
        .collect()
}

fn default_exception(lang: LanguageId) -> &'static str {
    match lang {
        LanguageId::Java | LanguageId::Kotlin | LanguageId::CSharp | LanguageId::Php => {
            "Exception"
        }
        LanguageId::Cpp => "std::exception&",
        _ => "Exception",
    }
}

fn default_catch_body(lang: LanguageId, var: &str) -> String {
    match lang {
        LanguageId::Java => format!("{var}.printStackTrace();"),
        LanguageId::Kotlin => format!("{var}.printStackTrace()"),
        LanguageId::JavaScript | LanguageId::TypeScript | LanguageId::Tsx => {
            format!("console.error({var});")
        }
        LanguageId::CSharp => format!("Console.Error.WriteLine({var});"),
        _ => "// handle error".to_string(),
    }
}

fn default_condition(lang: LanguageId) -> &'static str {
    match lang {
        LanguageId::Python => "True",
        _ => "true",
    }
}

fn condition_line(lang: LanguageId, keyword: &str, condition: &str, base: &str) -> String {
    match lang {
        LanguageId::Python => format!("{base}{keyword} {condition}:"),
        LanguageId::Go | LanguageId::Rust => format!("{base}{keyword} {condition} {{"),
        _ => format!("{base}{keyword} ({condition}) {{"),
    }
}
