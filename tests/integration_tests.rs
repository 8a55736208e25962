//! End-to-end tests over on-disk project fixtures.

use std::fs;
use std::path::Path;

use codenav::prelude::*;
use serde_json::json;

fn project_with(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("pom.xml"), "<project/>").unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    dir
}

#[test]
fn test_list_symbols_java_class_and_method() {
    let dir = project_with(&[(
        "Foo.java",
        "package a;\npublic class Foo { public int bar(int x) { return x; } }\n",
    )]);
    let session = Session::new(dir.path());

    let symbols = session
        .resolver()
        .list_symbols(&dir.path().join("Foo.java"))
        .unwrap();
    assert_eq!(symbols.len(), 2);

    let foo = symbols
        .iter()
        .find(|s| s.name == "Foo" && s.kind == SymbolKind::Class)
        .expect("class Foo");
    assert_eq!(foo.location.start_line, 2);

    let bar = symbols
        .iter()
        .find(|s| s.name == "bar" && s.kind == SymbolKind::Method)
        .expect("method bar");
    assert_eq!(bar.location.start_line, 2);
    assert_eq!(bar.parent_name.as_deref(), Some("Foo"));
    let params = bar.parameters.as_deref().unwrap();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].name, "x");
    assert_eq!(params[0].type_name.as_deref(), Some("int"));
    assert!(!params[0].is_varargs);
}

#[test]
fn test_project_references_find_single_use_site() {
    let dir = project_with(&[
        (
            "Foo.java",
            "package a;\npublic class Foo { public int bar(int x) { return x; } }\n",
        ),
        (
            "Bar.java",
            "package a;\npublic class Bar {\n    int v = new a.Foo().bar(3);\n}\n",
        ),
    ]);
    let session = Session::new(dir.path());

    let refs = session
        .resolver()
        .find_references_by_name(
            &dir.path().join("Foo.java"),
            "Foo",
            Scope::Project,
            false,
        )
        .unwrap();
    assert_eq!(refs.len(), 1);
    assert!(refs[0].path.ends_with("Bar.java"));
    assert_eq!(refs[0].start_line, 3);
}

#[test]
fn test_python_default_parameters() {
    let dir = project_with(&[(
        "greet.py",
        "def greet(name, greeting=\"Hello\"):\n    return greeting + name\n",
    )]);
    let session = Session::new(dir.path());

    let symbols = session
        .resolver()
        .list_symbols(&dir.path().join("greet.py"))
        .unwrap();
    let greet = symbols
        .iter()
        .find(|s| s.name == "greet" && s.kind == SymbolKind::Function)
        .expect("function greet");
    let names: Vec<&str> = greet
        .parameters
        .as_deref()
        .unwrap()
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names, vec!["name", "greeting"]);
}

#[test]
fn test_rename_counts_word_boundary_sites_only() {
    let dir = project_with(&[(
        "Counter.java",
        "public class Counter {\n    int x = 0;\n    int bump() { x = x + 1; return x; }\n    String xx = \"x\";\n}\n",
    )]);
    let session = Session::new(dir.path());

    let rename = Rename::new(dir.path().join("Counter.java"), "y")
        .symbol("x")
        .in_scope(Scope::File);
    let result = session.execute(&rename).unwrap();
    assert_eq!(result.status, RefactoringStatus::Success);
    assert_eq!(result.total_changes, 4);

    let content = fs::read_to_string(dir.path().join("Counter.java")).unwrap();
    assert!(content.contains("String xx = \"x\";"));
}

#[test]
fn test_rename_roundtrip_restores_bytes() {
    let original = "public class R {\n    int count = 0;\n    int next() { return count + 1; }\n}\n";
    let dir = project_with(&[("R.java", original)]);
    let session = Session::new(dir.path());
    let path = dir.path().join("R.java");

    session
        .execute(&Rename::new(&path, "total").symbol("count").in_scope(Scope::File))
        .unwrap();
    session
        .execute(&Rename::new(&path, "count").symbol("total").in_scope(Scope::File))
        .unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn test_check_content_reports_line_one() {
    let errors = codenav::syntax::check_content(
        Path::new("x.java"),
        "class Foo { void m( { } }",
    )
    .unwrap();
    assert!(!errors.is_empty());
    assert_eq!(errors[0].line, 1);
}

#[test]
fn test_unified_diff_hunk_format() {
    let diff = unified_diff("a.txt", "a\nb\nc\n", "a\nB\nc\n");
    assert!(diff.contains("@@ -1,3 +1,3 @@"));
    assert!(diff.contains(" a\n"));
    assert!(diff.contains("-b\n"));
    assert!(diff.contains("+B\n"));
    assert!(diff.contains(" c\n"));
    assert_eq!(unified_diff("a.txt", "same\n", "same\n"), "");
}

#[test]
fn test_index_then_cross_file_definition() {
    let dir = project_with(&[
        (
            "a/Service.java",
            "package a;\npublic class Service { void run() {} }\n",
        ),
        (
            "b/Client.java",
            "package b;\npublic class Client {\n    void use(Service s) { s.run(); }\n}\n",
        ),
    ]);
    let session = Session::new(dir.path());
    let result = session.index_project();
    assert!(result.success);
    assert_eq!(result.files_indexed, 2);

    let def = session
        .resolver()
        .find_definition_by_name(&dir.path().join("b/Client.java"), "Service")
        .unwrap()
        .expect("definition via index");
    assert!(def.location.path.ends_with("a/Service.java"));
    assert_eq!(def.kind, SymbolKind::Class);
}

#[test]
fn test_external_change_journaled_and_undoable() {
    let dir = project_with(&[("notes.py", "state = \"before\"\n")]);
    let session = Session::new(dir.path());
    let path = dir.path().join("notes.py");

    session.read_file(&path, None).unwrap();
    fs::write(&path, "state = \"tampered\"\n").unwrap();

    let read = session.read_file(&path, None).unwrap();
    assert!(read.external_change);
    assert!(session.journal().iter().any(|e| e.contains("[EXTERNAL]")));

    session.undo_last().unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "state = \"before\"\n"
    );
}

#[test]
fn test_token_gate_rejects_stale_edits() {
    let dir = project_with(&[("data.py", "a = 1\nb = 2\n")]);
    let session = Session::new(dir.path());
    let path = dir.path().join("data.py");

    let read = session.read_file(&path, Some((1, 2))).unwrap();
    // Another writer slips in between the read and our edit.
    fs::write(&path, "a = 99\nb = 2\n").unwrap();

    let err = session
        .write_range(&path, Some(&read.access_token), 1, 1, "a = 3")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TokenExternalChange);
}

#[test]
fn test_refactoring_result_carries_diff_and_token() {
    let dir = project_with(&[(
        "W.java",
        "public class W {\n    void go() {\n        work();\n    }\n}\n",
    )]);
    let session = Session::new(dir.path());

    let wrap = Wrap::new(
        dir.path().join("W.java"),
        WrapKind::TryCatch,
        3,
        3,
    );
    let result = session.execute(&wrap).unwrap();
    assert_eq!(result.changes.len(), 1);
    let change = &result.changes[0];
    let diff = change.unified_diff.as_deref().unwrap();
    assert!(diff.contains("+        try {"));

    // The returned token authorizes a follow-up edit of the whole file.
    let token = AccessToken::decode(change.access_token.as_deref().unwrap()).unwrap();
    let on_disk = fs::read_to_string(dir.path().join("W.java")).unwrap();
    assert!(token.validate(&dir.path().join("W.java"), &on_disk, 1, 1).is_ok());
}

#[test]
fn test_dispatch_extract_method_via_tools() {
    let dir = project_with(&[(
        "Calc.java",
        "public class Calc {\n    public int run(int a, int b) {\n        int total = a + b;\n        return total;\n    }\n}\n",
    )]);
    let session = Session::new(dir.path());

    let response = codenav::tools::dispatch(
        &session,
        "extract_method",
        &json!({
            "path": "Calc.java",
            "methodName": "combine",
            "startLine": 3,
            "endLine": 4,
        }),
    );
    assert!(
        !response.is_error,
        "{}",
        codenav::tools::render_response(&response)
    );
    let content = fs::read_to_string(dir.path().join("Calc.java")).unwrap();
    assert!(content.contains("private int combine(int a, int b) {"));
    assert!(content.contains("return this.combine(a, b);"));
}

#[test]
fn test_move_and_reference_update_end_to_end() {
    let dir = project_with(&[
        ("a/Widget.java", "package a;\npublic class Widget {\n}\n"),
        ("b/Widget.java", "package b;\n"),
        (
            "c/User.java",
            "package c;\nimport a.Widget;\npublic class User {\n    Widget w = new Widget();\n}\n",
        ),
    ]);
    let session = Session::new(dir.path());

    let mv = MoveSymbol::new(
        dir.path().join("a/Widget.java"),
        "Widget",
        dir.path().join("b/Widget.java"),
    )
    .of_kind(SymbolKind::Class);
    session.execute(&mv).unwrap();

    assert!(
        fs::read_to_string(dir.path().join("c/User.java"))
            .unwrap()
            .contains("import b.Widget;")
    );
    assert!(
        fs::read_to_string(dir.path().join("b/Widget.java"))
            .unwrap()
            .contains("public class Widget")
    );
}

#[test]
fn test_extraction_is_idempotent() {
    let dir = project_with(&[(
        "lib.rs",
        "pub struct Point { x: i32 }\n\npub fn origin() -> Point { Point { x: 0 } }\n",
    )]);
    let session = Session::new(dir.path());
    let path = dir.path().join("lib.rs");

    let first = session.resolver().list_symbols(&path).unwrap();
    let second = session.resolver().list_symbols(&path).unwrap();
    assert_eq!(first, second);
    for symbol in first {
        assert!(symbol.location.start_line <= symbol.location.end_line);
    }
}
