//! Generate: accessor, constructor and utility-method boilerplate for a
//! class, inserted between the field block and the first method.

use std::path::PathBuf;

use crate::error::{CodeNavError, ErrorCode, ErrorEnvelope, Result};
use crate::lang::LanguageId;
use crate::resolve::Resolver;
use crate::symbols::{SymbolInfo, SymbolKind};

use super::{ChangeDetail, Plan, PlannedEdit, RefactorContext, RefactoringOperation};

const MEMBER_INDENT: &str = "    ";

/// What to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateKind {
    Getter,
    Getters,
    Setter,
    Setters,
    Accessors,
    Constructor,
    NoArgsConstructor,
    Builder,
    EqualsHashcode,
    ToString,
}

impl GenerateKind {
    pub fn parse(tag: &str) -> Option<GenerateKind> {
        match tag {
            "getter" => Some(GenerateKind::Getter),
            "getters" => Some(GenerateKind::Getters),
            "setter" => Some(GenerateKind::Setter),
            "setters" => Some(GenerateKind::Setters),
            "accessors" => Some(GenerateKind::Accessors),
            "constructor" => Some(GenerateKind::Constructor),
            "no_args_constructor" => Some(GenerateKind::NoArgsConstructor),
            "builder" => Some(GenerateKind::Builder),
            "equals_hashcode" => Some(GenerateKind::EqualsHashcode),
            "toString" | "to_string" => Some(GenerateKind::ToString),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerateKind::Getter => "getter",
            GenerateKind::Getters => "getters",
            GenerateKind::Setter => "setter",
            GenerateKind::Setters => "setters",
            GenerateKind::Accessors => "accessors",
            GenerateKind::Constructor => "constructor",
            GenerateKind::NoArgsConstructor => "no_args_constructor",
            GenerateKind::Builder => "builder",
            GenerateKind::EqualsHashcode => "equals_hashcode",
            GenerateKind::ToString => "toString",
        }
    }
}

/// Generate boilerplate members on a class.
#[derive(Debug, Clone)]
pub struct Generate {
    pub file: PathBuf,
    pub class_name: String,
    pub kind: GenerateKind,
    /// Restrict single getter/setter generation to this field.
    pub field: Option<String>,
    pub fluent_setters: bool,
    pub add_validation: bool,
}

impl Generate {
    pub fn new(
        file: impl Into<PathBuf>,
        class_name: impl Into<String>,
        kind: GenerateKind,
    ) -> Self {
        Self {
            file: file.into(),
            class_name: class_name.into(),
            kind,
            field: None,
            fluent_setters: false,
            add_validation: false,
        }
    }

    pub fn for_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn fluent(mut self) -> Self {
        self.fluent_setters = true;
        self
    }

    pub fn validated(mut self) -> Self {
        self.add_validation = true;
        self
    }
}

struct FieldSpec {
    name: String,
    type_name: String,
}

impl RefactoringOperation for Generate {
    fn name(&self) -> &'static str {
        "Generate"
    }

    fn validate_params(&self) -> Result<()> {
        if self.class_name.is_empty() {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(ErrorCode::ParamMissing, "className must not be empty")
                    .with_context("param", "className"),
            ));
        }
        if matches!(self.kind, GenerateKind::Getter | GenerateKind::Setter)
            && self.field.is_none()
        {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(
                    ErrorCode::ParamMissing,
                    "A field name is required for single getter/setter generation",
                )
                .with_context("param", "field"),
            ));
        }
        Ok(())
    }

    fn plan(&self, ctx: &RefactorContext) -> Result<Plan> {
        let pr = ctx.cache.parse_file(&self.file, None)?;
        let lang = pr.lang;
        if !matches!(
            lang,
            LanguageId::Java
                | LanguageId::Kotlin
                | LanguageId::Python
                | LanguageId::JavaScript
                | LanguageId::TypeScript
                | LanguageId::Tsx
        ) {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(
                    ErrorCode::RefactorLanguageNotSupported,
                    format!("Generation is not available for {lang}"),
                )
                .with_context("language", lang.to_string()),
            ));
        }
        if matches!(self.kind, GenerateKind::Builder | GenerateKind::EqualsHashcode)
            && lang != LanguageId::Java
        {
            return Err(CodeNavError::Tool(
                ErrorEnvelope::new(
                    ErrorCode::RefactorLanguageNotSupported,
                    format!("{} generation is Java-only", self.kind.as_str()),
                )
                .with_context("language", lang.to_string()),
            ));
        }

        let resolver = Resolver::new(ctx.cache, ctx.index);
        let defs = resolver.list_symbols(&self.file)?;
        let class = defs
            .iter()
            .find(|d| {
                d.name == self.class_name
                    && matches!(d.kind, SymbolKind::Class | SymbolKind::Struct)
            })
            .ok_or_else(|| {
                CodeNavError::Tool(
                    ErrorEnvelope::new(
                        ErrorCode::SymbolNotFound,
                        format!("Class '{}' not found in this file", self.class_name),
                    )
                    .with_context("name", self.class_name.clone()),
                )
            })?;

        let members: Vec<&SymbolInfo> = defs
            .iter()
            .filter(|d| d.parent_name.as_deref() == Some(self.class_name.as_str()))
            .collect();
        let mut fields: Vec<FieldSpec> = members
            .iter()
            .filter(|d| matches!(d.kind, SymbolKind::Field | SymbolKind::Property))
            .map(|d| FieldSpec {
                name: d.name.clone(),
                type_name: d
                    .type_name
                    .clone()
                    .unwrap_or_else(|| super::analysis::object_type(lang).to_string()),
            })
            .collect();
        if let Some(only) = &self.field {
            fields.retain(|f| &f.name == only);
            if fields.is_empty() {
                return Err(CodeNavError::Tool(
                    ErrorEnvelope::new(
                        ErrorCode::SymbolNotFound,
                        format!("Field '{only}' not found on '{}'", self.class_name),
                    )
                    .with_context("name", only.clone()),
                ));
            }
        }

        let existing: Vec<String> = members
            .iter()
            .filter(|d| matches!(d.kind, SymbolKind::Method | SymbolKind::Constructor))
            .map(|d| d.name.clone())
            .collect();

        let generated = self.render(lang, &fields, &existing);
        if generated.is_empty() {
            let mut plan = Plan::new(format!("generate {}", self.kind.as_str()));
            plan.suggest("All requested members already exist".to_string());
            return Ok(plan);
        }

        // Insert after the last field when one exists and precedes the
        // methods, otherwise just before the class's closing brace.
        let content = pr.content.clone();
        let last_field_line = members
            .iter()
            .filter(|d| matches!(d.kind, SymbolKind::Field | SymbolKind::Property))
            .map(|d| d.location.end_line)
            .max();
        let first_method_line = members
            .iter()
            .filter(|d| matches!(d.kind, SymbolKind::Method | SymbolKind::Constructor))
            .map(|d| d.location.start_line)
            .min();
        let insertion_row = match (last_field_line, first_method_line) {
            (Some(field), None) => field as usize,
            (Some(field), Some(method)) if field < method => field as usize,
            _ => class_closing_row(&pr, class),
        };

        let mut lines: Vec<String> = content.lines().map(String::from).collect();
        let insertion_row = insertion_row.min(lines.len());
        for (offset, line) in generated.iter().enumerate() {
            lines.insert(insertion_row + offset, line.clone());
        }
        let mut modified = lines.join("\n");
        if content.ends_with('\n') {
            modified.push('\n');
        }

        let mut plan = Plan::new(format!(
            "generate {} on {}",
            self.kind.as_str(),
            self.class_name
        ));
        plan.push(
            PlannedEdit::new(&self.file, content, modified).with_details(vec![ChangeDetail {
                line: insertion_row as u32 + 1,
                column: 1,
                before: String::new(),
                after: generated.join("\n"),
            }]),
        );
        Ok(plan)
    }
}

/// 0-based row of the class's closing brace (Python: end of class block).
fn class_closing_row(pr: &crate::parse::ParseResult, class: &SymbolInfo) -> usize {
    if let Some(node) = super::analysis::enclosing_class(pr, class.location.start_line) {
        return node.end_position().row;
    }
    class.location.end_line as usize
}

impl Generate {
    fn render(&self, lang: LanguageId, fields: &[FieldSpec], existing: &[String]) -> Vec<String> {
        use GenerateKind::*;
        let mut out = Vec::new();
        let exists = |name: &str| existing.iter().any(|m| m == name);
        match self.kind {
            Getter | Getters => {
                for field in fields {
                    self.push_getter(lang, field, &exists, &mut out);
                }
            }
            Setter | Setters => {
                for field in fields {
                    self.push_setter(lang, field, &exists, &mut out);
                }
            }
            Accessors => {
                for field in fields {
                    self.push_getter(lang, field, &exists, &mut out);
                }
                for field in fields {
                    self.push_setter(lang, field, &exists, &mut out);
                }
            }
            Constructor => self.push_constructor(lang, fields, false, &exists, &mut out),
            NoArgsConstructor => self.push_constructor(lang, fields, true, &exists, &mut out),
            Builder => self.push_builder(fields, &mut out),
            EqualsHashcode => self.push_equals_hashcode(fields, &exists, &mut out),
            ToString => self.push_to_string(lang, fields, &exists, &mut out),
        }
        out
    }

    fn push_getter(
        &self,
        lang: LanguageId,
        field: &FieldSpec,
        exists: &dyn Fn(&str) -> bool,
        out: &mut Vec<String>,
    ) {
        let cap = capitalize(&field.name);
        match lang {
            LanguageId::Java => {
                let name = if field.type_name == "boolean" {
                    format!("is{cap}")
                } else {
                    format!("get{cap}")
                };
                if exists(&name) {
                    return;
                }
                out.push(String::new());
                out.push(format!(
                    "{MEMBER_INDENT}public {} {name}() {{",
                    field.type_name
                ));
                out.push(format!("{MEMBER_INDENT}{MEMBER_INDENT}return {};", field.name));
                out.push(format!("{MEMBER_INDENT}}}"));
            }
            LanguageId::Kotlin => {
                let name = format!("get{cap}");
                if exists(&name) {
                    return;
                }
                out.push(String::new());
                out.push(format!(
                    "{MEMBER_INDENT}fun {name}(): {} = {}",
                    field.type_name, field.name
                ));
            }
            LanguageId::Python => {
                if exists(&field.name) {
                    return;
                }
                out.push(String::new());
                out.push(format!("{MEMBER_INDENT}@property"));
                out.push(format!("{MEMBER_INDENT}def {}(self):", field.name));
                out.push(format!(
                    "{MEMBER_INDENT}{MEMBER_INDENT}return self._{}",
                    field.name
                ));
            }
            _ => {
                let name = format!("get{cap}");
                if exists(&name) {
                    return;
                }
                out.push(String::new());
                out.push(format!("{MEMBER_INDENT}get {}() {{", field.name));
                out.push(format!(
                    "{MEMBER_INDENT}{MEMBER_INDENT}return this.{};",
                    field.name
                ));
                out.push(format!("{MEMBER_INDENT}}}"));
            }
        }
    }

    fn push_setter(
        &self,
        lang: LanguageId,
        field: &FieldSpec,
        exists: &dyn Fn(&str) -> bool,
        out: &mut Vec<String>,
    ) {
        let cap = capitalize(&field.name);
        match lang {
            LanguageId::Java => {
                let name = format!("set{cap}");
                if exists(&name) {
                    return;
                }
                let ret = if self.fluent_setters {
                    self.class_name.as_str()
                } else {
                    "void"
                };
                out.push(String::new());
                out.push(format!(
                    "{MEMBER_INDENT}public {ret} {name}({} {}) {{",
                    field.type_name, field.name
                ));
                if self.add_validation && !is_java_primitive(&field.type_name) {
                    out.push(format!(
                        "{MEMBER_INDENT}{MEMBER_INDENT}if ({} == null) {{",
                        field.name
                    ));
                    out.push(format!(
                        "{MEMBER_INDENT}{MEMBER_INDENT}{MEMBER_INDENT}throw new IllegalArgumentException(\"{} must not be null\");",
                        field.name
                    ));
                    out.push(format!("{MEMBER_INDENT}{MEMBER_INDENT}}}"));
                }
                out.push(format!(
                    "{MEMBER_INDENT}{MEMBER_INDENT}this.{} = {};",
                    field.name, field.name
                ));
                if self.fluent_setters {
                    out.push(format!("{MEMBER_INDENT}{MEMBER_INDENT}return this;"));
                }
                out.push(format!("{MEMBER_INDENT}}}"));
            }
            LanguageId::Kotlin => {
                let name = format!("set{cap}");
                if exists(&name) {
                    return;
                }
                out.push(String::new());
                out.push(format!(
                    "{MEMBER_INDENT}fun {name}(value: {}) {{",
                    field.type_name
                ));
                out.push(format!(
                    "{MEMBER_INDENT}{MEMBER_INDENT}this.{} = value",
                    field.name
                ));
                out.push(format!("{MEMBER_INDENT}}}"));
            }
            LanguageId::Python => {
                out.push(String::new());
                out.push(format!("{MEMBER_INDENT}@{}.setter", field.name));
                out.push(format!(
                    "{MEMBER_INDENT}def {}(self, value):",
                    field.name
                ));
                out.push(format!(
                    "{MEMBER_INDENT}{MEMBER_INDENT}self._{} = value",
                    field.name
                ));
            }
            _ => {
                out.push(String::new());
                out.push(format!("{MEMBER_INDENT}set {}(value) {{", field.name));
                out.push(format!(
                    "{MEMBER_INDENT}{MEMBER_INDENT}this.{} = value;",
                    field.name
                ));
                out.push(format!("{MEMBER_INDENT}}}"));
            }
        }
    }

    fn push_constructor(
        &self,
        lang: LanguageId,
        fields: &[FieldSpec],
        no_args: bool,
        exists: &dyn Fn(&str) -> bool,
        out: &mut Vec<String>,
    ) {
        let fields: &[FieldSpec] = if no_args { &[] } else { fields };
        match lang {
            LanguageId::Java => {
                if exists(&self.class_name) && !no_args {
                    return;
                }
                let params: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{} {}", f.type_name, f.name))
                    .collect();
                out.push(String::new());
                out.push(format!(
                    "{MEMBER_INDENT}public {}({}) {{",
                    self.class_name,
                    params.join(", ")
                ));
                for field in fields {
                    out.push(format!(
                        "{MEMBER_INDENT}{MEMBER_INDENT}this.{} = {};",
                        field.name, field.name
                    ));
                }
                out.push(format!("{MEMBER_INDENT}}}"));
            }
            LanguageId::Kotlin => {
                let params: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}: {}", f.name, f.type_name))
                    .collect();
                out.push(String::new());
                out.push(format!(
                    "{MEMBER_INDENT}constructor({}) {{",
                    params.join(", ")
                ));
                for field in fields {
                    out.push(format!(
                        "{MEMBER_INDENT}{MEMBER_INDENT}this.{} = {}",
                        field.name, field.name
                    ));
                }
                out.push(format!("{MEMBER_INDENT}}}"));
            }
            LanguageId::Python => {
                if exists("__init__") {
                    return;
                }
                let mut params = vec!["self".to_string()];
                params.extend(fields.iter().map(|f| f.name.clone()));
                out.push(String::new());
                out.push(format!(
                    "{MEMBER_INDENT}def __init__({}):",
                    params.join(", ")
                ));
                if fields.is_empty() {
                    out.push(format!("{MEMBER_INDENT}{MEMBER_INDENT}pass"));
                }
                for field in fields {
                    out.push(format!(
                        "{MEMBER_INDENT}{MEMBER_INDENT}self.{} = {}",
                        field.name, field.name
                    ));
                }
            }
            _ => {
                if exists("constructor") {
                    return;
                }
                let params: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
                out.push(String::new());
                out.push(format!(
                    "{MEMBER_INDENT}constructor({}) {{",
                    params.join(", ")
                ));
                for field in fields {
                    out.push(format!(
                        "{MEMBER_INDENT}{MEMBER_INDENT}this.{} = {};",
                        field.name, field.name
                    ));
                }
                out.push(format!("{MEMBER_INDENT}}}"));
            }
        }
    }

    fn push_builder(&self, fields: &[FieldSpec], out: &mut Vec<String>) {
        out.push(String::new());
        out.push(format!(
            "{MEMBER_INDENT}public static Builder builder() {{"
        ));
        out.push(format!(
            "{MEMBER_INDENT}{MEMBER_INDENT}return new Builder();"
        ));
        out.push(format!("{MEMBER_INDENT}}}"));
        out.push(String::new());
        out.push(format!("{MEMBER_INDENT}public static class Builder {{"));
        for field in fields {
            out.push(format!(
                "{MEMBER_INDENT}{MEMBER_INDENT}private {} {};",
                field.type_name, field.name
            ));
        }
        for field in fields {
            out.push(String::new());
            out.push(format!(
                "{MEMBER_INDENT}{MEMBER_INDENT}public Builder {}({} {}) {{",
                field.name, field.type_name, field.name
            ));
            out.push(format!(
                "{MEMBER_INDENT}{MEMBER_INDENT}{MEMBER_INDENT}this.{} = {};",
                field.name, field.name
            ));
            out.push(format!(
                "{MEMBER_INDENT}{MEMBER_INDENT}{MEMBER_INDENT}return this;"
            ));
            out.push(format!("{MEMBER_INDENT}{MEMBER_INDENT}}}"));
        }
        out.push(String::new());
        out.push(format!(
            "{MEMBER_INDENT}{MEMBER_INDENT}public {} build() {{",
            self.class_name
        ));
        out.push(format!(
            "{MEMBER_INDENT}{MEMBER_INDENT}{MEMBER_INDENT}{} instance = new {}();",
            self.class_name, self.class_name
        ));
        for field in fields {
            out.push(format!(
                "{MEMBER_INDENT}{MEMBER_INDENT}{MEMBER_INDENT}instance.{} = this.{};",
                field.name, field.name
            ));
        }
        out.push(format!(
            "{MEMBER_INDENT}{MEMBER_INDENT}{MEMBER_INDENT}return instance;"
        ));
        out.push(format!("{MEMBER_INDENT}{MEMBER_INDENT}}}"));
        out.push(format!("{MEMBER_INDENT}}}"));
    }

    fn push_equals_hashcode(
        &self,
        fields: &[FieldSpec],
        exists: &dyn Fn(&str) -> bool,
        out: &mut Vec<String>,
    ) {
        if !exists("equals") {
            let comparisons: Vec<String> = fields
                .iter()
                .map(|f| {
                    if is_java_primitive(&f.type_name) {
                        format!("{} == other.{}", f.name, f.name)
                    } else {
                        format!("java.util.Objects.equals({}, other.{})", f.name, f.name)
                    }
                })
                .collect();
            let body = if comparisons.is_empty() {
                "true".to_string()
            } else {
                comparisons.join(" && ")
            };
            out.push(String::new());
            out.push(format!("{MEMBER_INDENT}@Override"));
            out.push(format!(
                "{MEMBER_INDENT}public boolean equals(Object obj) {{"
            ));
            out.push(format!(
                "{MEMBER_INDENT}{MEMBER_INDENT}if (this == obj) return true;"
            ));
            out.push(format!(
                "{MEMBER_INDENT}{MEMBER_INDENT}if (!(obj instanceof {})) return false;",
                self.class_name
            ));
            out.push(format!(
                "{MEMBER_INDENT}{MEMBER_INDENT}{} other = ({}) obj;",
                self.class_name, self.class_name
            ));
            out.push(format!("{MEMBER_INDENT}{MEMBER_INDENT}return {body};"));
            out.push(format!("{MEMBER_INDENT}}}"));
        }
        if !exists("hashCode") {
            let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
            out.push(String::new());
            out.push(format!("{MEMBER_INDENT}@Override"));
            out.push(format!("{MEMBER_INDENT}public int hashCode() {{"));
            out.push(format!(
                "{MEMBER_INDENT}{MEMBER_INDENT}return java.util.Objects.hash({});",
                names.join(", ")
            ));
            out.push(format!("{MEMBER_INDENT}}}"));
        }
    }

    fn push_to_string(
        &self,
        lang: LanguageId,
        fields: &[FieldSpec],
        exists: &dyn Fn(&str) -> bool,
        out: &mut Vec<String>,
    ) {
        match lang {
            LanguageId::Java => {
                if exists("toString") {
                    return;
                }
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| format!("\"{}=\" + {}", f.name, f.name))
                    .collect();
                let body = if parts.is_empty() {
                    format!("\"{}{{}}\"", self.class_name)
                } else {
                    format!(
                        "\"{}{{\" + {} + \"}}\"",
                        self.class_name,
                        parts.join(" + \", \" + ")
                    )
                };
                out.push(String::new());
                out.push(format!("{MEMBER_INDENT}@Override"));
                out.push(format!("{MEMBER_INDENT}public String toString() {{"));
                out.push(format!("{MEMBER_INDENT}{MEMBER_INDENT}return {body};"));
                out.push(format!("{MEMBER_INDENT}}}"));
            }
            LanguageId::Kotlin => {
                if exists("toString") {
                    return;
                }
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}=${}", f.name, f.name))
                    .collect();
                out.push(String::new());
                out.push(format!(
                    "{MEMBER_INDENT}override fun toString(): String = \"{}({})\"",
                    self.class_name,
                    parts.join(", ")
                ));
            }
            LanguageId::Python => {
                if exists("__str__") {
                    return;
                }
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}={{self.{}}}", f.name, f.name))
                    .collect();
                out.push(String::new());
                out.push(format!("{MEMBER_INDENT}def __str__(self):"));
                out.push(format!(
                    "{MEMBER_INDENT}{MEMBER_INDENT}return f\"{}({})\"",
                    self.class_name,
                    parts.join(", ")
                ));
            }
            _ => {
                if exists("toString") {
                    return;
                }
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}=${{this.{}}}", f.name, f.name))
                    .collect();
                out.push(String::new());
                out.push(format!("{MEMBER_INDENT}toString() {{"));
                out.push(format!(
                    "{MEMBER_INDENT}{MEMBER_INDENT}return `{}({})`;",
                    self.class_name,
                    parts.join(", ")
                ));
                out.push(format!("{MEMBER_INDENT}}}"));
            }
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn is_java_primitive(ty: &str) -> bool {
    matches!(
        ty,
        "int" | "long" | "short" | "byte" | "float" | "double" | "boolean" | "char"
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

    const JAVA: &str = "public class Person {\n    private String name;\n    private int age;\n\n    public String getName() { return name; }\n}\n";

    #[test]
    fn test_generate_getters_skips_existing() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("Person.java");
        fs::write(&file, JAVA).unwrap();

        let op = Generate::new(&file, "Person", GenerateKind::Getters);
        execute(&op, &fx.ctx()).unwrap();
        let content = fs::read_to_string(&file).unwrap();
        assert!(content.contains("public int getAge() {"));
        // The pre-existing getter was not duplicated.
        assert_eq!(content.matches("getName").count(), 1);
        // Insertion landed after the fields and before the first method.
        let age_getter = content.find("getAge").unwrap();
        let name_getter = content.find("getName").unwrap();
        assert!(age_getter < name_getter);
    }

    #[test]
    fn test_generate_fluent_validated_setter() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("Person.java");
        fs::write(&file, JAVA).unwrap();

        let op = Generate::new(&file, "Person", GenerateKind::Setter)
            .for_field("name")
            .fluent()
            .validated();
        execute(&op, &fx.ctx()).unwrap();
        let content = fs::read_to_string(&file).unwrap();
        assert!(content.contains("public Person setName(String name) {"));
        assert!(content.contains("throw new IllegalArgumentException"));
        assert!(content.contains("return this;"));
    }

    #[test]
    fn test_generate_constructor() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("Person.java");
        fs::write(&file, JAVA).unwrap();

        let op = Generate::new(&file, "Person", GenerateKind::Constructor);
        execute(&op, &fx.ctx()).unwrap();
        let content = fs::read_to_string(&file).unwrap();
        assert!(content.contains("public Person(String name, int age) {"));
        assert!(content.contains("this.name = name;"));
        assert!(content.contains("this.age = age;"));
    }

    #[test]
    fn test_generate_builder() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("Person.java");
        fs::write(&file, JAVA).unwrap();

        let op = Generate::new(&file, "Person", GenerateKind::Builder);
        execute(&op, &fx.ctx()).unwrap();
        let content = fs::read_to_string(&file).unwrap();
        assert!(content.contains("public static Builder builder() {"));
        assert!(content.contains("public static class Builder {"));
        assert!(content.contains("public Person build() {"));
    }

    #[test]
    fn test_generate_python_str() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("person.py");
        fs::write(
            &file,
            "class Person:\n    kind = \"human\"\n\n    def rename(self):\n        pass\n",
        )
        .unwrap();

        let op = Generate::new(&file, "Person", GenerateKind::ToString);
        execute(&op, &fx.ctx()).unwrap();
        let content = fs::read_to_string(&file).unwrap();
        assert!(content.contains("def __str__(self):"));
        assert!(content.contains("return f\"Person(kind={self.kind})\""));
    }

    #[test]
    fn test_builder_non_java_rejected() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("p.py");
        fs::write(&file, "class P:\n    pass\n").unwrap();
        let op = Generate::new(&file, "P", GenerateKind::Builder);
        let err = execute(&op, &fx.ctx()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::RefactorLanguageNotSupported);
    }

    #[test]
    fn test_missing_class() {
        let fx = Fixture::new();
        let file = fx.dir.path().join("X.java");
        fs::write(&file, "public class X {}\n").unwrap();
        let op = Generate::new(&file, "Nope", GenerateKind::Getters);
        let err = execute(&op, &fx.ctx()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SymbolNotFound);
    }
}
