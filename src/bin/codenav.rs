//! Command-line front end over the session and tool registry.

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};

use codenav::session::Session;
use codenav::tools;

#[derive(Parser)]
#[command(name = "codenav")]
#[command(about = "Tree-sitter code navigation and refactoring", long_about = None)]
struct Cli {
    /// Project root all paths are resolved against.
    #[arg(long, default_value = ".", global = true)]
    root: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the available tools and their schemas.
    Tools,
    /// List symbols declared in a file.
    Symbols { path: String },
    /// Find the definition of a symbol.
    Definition {
        path: String,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        line: Option<u32>,
        #[arg(long)]
        column: Option<u32>,
    },
    /// Find references to a symbol.
    References {
        path: String,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        line: Option<u32>,
        #[arg(long)]
        column: Option<u32>,
        #[arg(long, default_value = "project")]
        scope: String,
        #[arg(long)]
        include_declaration: bool,
    },
    /// Show symbol details at a position.
    Hover {
        path: String,
        line: u32,
        column: u32,
    },
    /// Check a file for syntax errors.
    Check { path: String },
    /// Build the project symbol index.
    Index,
    /// Rename a symbol.
    Rename {
        path: String,
        symbol: String,
        new_name: String,
        #[arg(long, default_value = "project")]
        scope: String,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        hybrid: bool,
        #[arg(long)]
        apply_text_matches: bool,
        #[arg(long)]
        preview: bool,
    },
    /// Inline a variable or parameterless method.
    Inline {
        path: String,
        symbol: String,
        #[arg(long, default_value = "file")]
        scope: String,
        #[arg(long)]
        keep_declaration: bool,
        #[arg(long)]
        preview: bool,
    },
    /// Extract a line range into a new method.
    ExtractMethod {
        path: String,
        method_name: String,
        #[arg(long)]
        start: u32,
        #[arg(long)]
        end: u32,
        #[arg(long)]
        access: Option<String>,
        #[arg(long)]
        return_type: Option<String>,
        #[arg(long)]
        preview: bool,
    },
    /// Extract an expression into a variable.
    ExtractVariable {
        path: String,
        variable_name: String,
        #[arg(long)]
        line: u32,
        #[arg(long)]
        start_column: Option<u32>,
        #[arg(long)]
        end_column: Option<u32>,
        #[arg(long)]
        r#type: Option<String>,
        #[arg(long)]
        replace_all: bool,
        #[arg(long)]
        preview: bool,
    },
    /// Move a symbol to another file.
    Move {
        path: String,
        symbol: String,
        target_file: String,
        #[arg(long)]
        target_class: Option<String>,
        #[arg(long)]
        target_line: Option<u32>,
        #[arg(long)]
        preview: bool,
    },
    /// Wrap a line range in a control construct.
    Wrap {
        path: String,
        wrapper: String,
        #[arg(long)]
        start: u32,
        #[arg(long)]
        end: u32,
        /// Wrapper options as key=value pairs.
        #[arg(long, value_name = "KEY=VALUE")]
        option: Vec<String>,
        #[arg(long)]
        preview: bool,
    },
    /// Generate boilerplate members on a class.
    Generate {
        path: String,
        class_name: String,
        what: String,
        #[arg(long)]
        field: Option<String>,
        #[arg(long)]
        fluent: bool,
        #[arg(long)]
        validate: bool,
        #[arg(long)]
        preview: bool,
    },
    /// Unified diff between two files.
    Diff { original: String, modified: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let session = Session::new(&cli.root);

    let (tool, params): (&str, Value) = match &cli.command {
        Command::Tools => {
            for spec in tools::tool_specs() {
                println!("{:<18} {}", spec.name, spec.description);
            }
            return Ok(());
        }
        Command::Symbols { path } => ("list_symbols", json!({ "path": path })),
        Command::Definition {
            path,
            symbol,
            line,
            column,
        } => (
            "find_definition",
            json!({
                "path": path,
                "symbolName": symbol,
                "line": line,
                "column": column,
            }),
        ),
        Command::References {
            path,
            symbol,
            line,
            column,
            scope,
            include_declaration,
        } => (
            "find_references",
            json!({
                "path": path,
                "symbolName": symbol,
                "line": line,
                "column": column,
                "scope": scope,
                "includeDeclaration": include_declaration,
            }),
        ),
        Command::Hover { path, line, column } => (
            "hover",
            json!({ "path": path, "line": line, "column": column }),
        ),
        Command::Check { path } => ("check_syntax", json!({ "path": path })),
        Command::Index => ("index_project", json!({})),
        Command::Rename {
            path,
            symbol,
            new_name,
            scope,
            kind,
            hybrid,
            apply_text_matches,
            preview,
        } => (
            "rename",
            json!({
                "path": path,
                "symbolName": symbol,
                "newName": new_name,
                "scope": scope,
                "kind": kind,
                "hybrid": hybrid,
                "applyTextMatches": apply_text_matches,
                "preview": preview,
            }),
        ),
        Command::Inline {
            path,
            symbol,
            scope,
            keep_declaration,
            preview,
        } => (
            "inline",
            json!({
                "path": path,
                "symbolName": symbol,
                "scope": scope,
                "deleteDeclaration": !keep_declaration,
                "preview": preview,
            }),
        ),
        Command::ExtractMethod {
            path,
            method_name,
            start,
            end,
            access,
            return_type,
            preview,
        } => (
            "extract_method",
            json!({
                "path": path,
                "methodName": method_name,
                "startLine": start,
                "endLine": end,
                "accessModifier": access,
                "returnType": return_type,
                "preview": preview,
            }),
        ),
        Command::ExtractVariable {
            path,
            variable_name,
            line,
            start_column,
            end_column,
            r#type,
            replace_all,
            preview,
        } => (
            "extract_variable",
            json!({
                "path": path,
                "variableName": variable_name,
                "line": line,
                "startColumn": start_column,
                "endColumn": end_column,
                "type": r#type,
                "replaceAll": replace_all,
                "preview": preview,
            }),
        ),
        Command::Move {
            path,
            symbol,
            target_file,
            target_class,
            target_line,
            preview,
        } => (
            "move_symbol",
            json!({
                "path": path,
                "symbolName": symbol,
                "targetFile": target_file,
                "targetClass": target_class,
                "targetLine": target_line,
                "preview": preview,
            }),
        ),
        Command::Wrap {
            path,
            wrapper,
            start,
            end,
            option,
            preview,
        } => {
            let mut options = serde_json::Map::new();
            for pair in option {
                if let Some((key, value)) = pair.split_once('=') {
                    options.insert(key.to_string(), Value::String(value.to_string()));
                }
            }
            (
                "wrap",
                json!({
                    "path": path,
                    "wrapper": wrapper,
                    "startLine": start,
                    "endLine": end,
                    "options": options,
                    "preview": preview,
                }),
            )
        }
        Command::Generate {
            path,
            class_name,
            what,
            field,
            fluent,
            validate,
            preview,
        } => (
            "generate",
            json!({
                "path": path,
                "className": class_name,
                "what": what,
                "field": field,
                "fluentSetters": fluent,
                "addValidation": validate,
                "preview": preview,
            }),
        ),
        Command::Diff { original, modified } => {
            let old = std::fs::read_to_string(original)?;
            let new = std::fs::read_to_string(modified)?;
            (
                "diff",
                json!({ "name": original, "original": old, "modified": new }),
            )
        }
    };

    let response = tools::dispatch(&session, tool, &params);
    println!("{}", tools::render_response(&response));
    if response.is_error {
        std::process::exit(1);
    }
    Ok(())
}
