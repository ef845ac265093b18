//! Integration tests for the command-line interface
//!
//! Runs the built binary against the fixture sources for every subcommand.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn java_rewriter(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_java-rewriter"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Helper to create a workspace holding the fixtures and a script that
/// writes to `out/`
fn setup_test_workspace(extra: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    for entry in walkdir::WalkDir::new(fixtures()) {
        let entry = entry.unwrap();
        let target = dir.path().join(entry.path().strip_prefix(fixtures()).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
    let script = fs::read_to_string(dir.path().join("on_the_fly.toml"))
        .unwrap()
        .replace(
            "classpath = [\"classpath\"]",
            "classpath = [\"classpath\"]\noutput_dir = \"out\"",
        );
    fs::write(dir.path().join("script.toml"), format!("{script}{extra}")).unwrap();
    dir
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_help_lists_commands() {
    let output = java_rewriter(&["--help"]);

    assert!(output.status.success());
    let stdout = stdout(&output);
    for command in ["apply", "print", "query", "run", "search"] {
        assert!(stdout.contains(command), "missing {command} in:\n{stdout}");
    }
}

#[test]
fn test_print_to_stdout() {
    let input = fixtures().join("transformation");
    let output = java_rewriter(&["print", path_arg(&input)]);

    assert!(output.status.success(), "{output:?}");
    let stdout = stdout(&output);
    assert!(stdout.starts_with("package transformation;"));
    assert!(stdout.contains("return 3 + 2;"));
}

#[test]
fn test_print_to_directory() {
    let out = TempDir::new().unwrap();
    let input = fixtures().join("transformation");
    let classpath = fixtures().join("classpath");
    let output = java_rewriter(&[
        "print",
        path_arg(&input),
        "--output",
        path_arg(out.path()),
        "--classpath",
        path_arg(&classpath),
    ]);

    assert!(output.status.success(), "{output:?}");
    assert!(out.path().join("transformation/Foo1.java").exists());
    assert!(!out.path().join("transformation/IFoo.java").exists());

    let again = java_rewriter(&[
        "print",
        path_arg(&input),
        "--output",
        path_arg(out.path()),
    ]);
    assert!(stdout(&again).contains("unchanged"));
}

#[test]
fn test_query_json() {
    let input = fixtures().join("transformation/Foo1.java");
    let output = java_rewriter(&["query", path_arg(&input), "--kind", "method", "--json"]);

    assert!(output.status.success(), "{output:?}");
    let items: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["m", "b"]);
    assert_eq!(items[0]["kind"], "Method");
    assert_eq!(items[0]["text"], "public int m()");
}

#[test]
fn test_query_by_name_and_unknown_kind() {
    let input = fixtures().join("transformation/Foo1.java");
    let output = java_rewriter(&["query", path_arg(&input), "--kind", "Binary"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("3 + 2"));

    let named = java_rewriter(&["query", path_arg(&input), "--kind", "Method", "--name", "b"]);
    assert!(stdout(&named).contains("1 Method element(s)"));

    let bad = java_rewriter(&["query", path_arg(&input), "--kind", "Lambda"]);
    assert!(!bad.status.success());
    assert!(String::from_utf8_lossy(&bad.stderr).contains("unknown node kind 'Lambda'"));
}

#[test]
fn test_run_invokes_a_method() {
    let input = fixtures().join("transformation");
    let output = java_rewriter(&["run", path_arg(&input), "--class", "Foo1", "--method", "m"]);

    assert!(output.status.success(), "{output:?}");
    let listing = stdout(&output);
    assert!(listing.lines().any(|line| line.ends_with(" 5")), "{listing}");

    let printing = java_rewriter(&["run", path_arg(&input), "--class", "Foo1", "--method", "b"]);
    assert!(stdout(&printing).starts_with("b was called\n"));
}

#[test]
fn test_search_pattern() {
    let file = fixtures().join("transformation/Foo1.java");
    let output = java_rewriter(&[
        "search",
        path_arg(&file),
        "--pattern",
        "System.out.println($MSG)",
    ]);

    assert!(output.status.success(), "{output:?}");
    let stdout = stdout(&output);
    assert!(stdout.contains("Foo1.java:9: System.out.println(\"b was called\")"));
    assert!(stdout.contains(" = \"b was called\" [160..174]"), "{stdout}");
    assert!(stdout.contains("1 match(es)"));
}

#[test]
fn test_search_unique_and_quiet() {
    let file = fixtures().join("transformation/Foo1.java");
    let unique = java_rewriter(&[
        "search",
        path_arg(&file),
        "--pattern",
        "System.out.println($MSG)",
        "--unique",
    ]);
    assert!(unique.status.success(), "{unique:?}");
    assert!(stdout(&unique).contains("Foo1.java:9: "));

    let missing = java_rewriter(&[
        "search",
        path_arg(&file),
        "--pattern",
        "System.err.println($MSG)",
        "--unique",
    ]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("pattern matched 0 locations"));

    let found = java_rewriter(&["search", path_arg(&file), "--pattern", "System.out.println($MSG)", "--quiet"]);
    assert!(found.status.success());
    assert!(found.stdout.is_empty());

    let absent = java_rewriter(&["search", path_arg(&file), "--pattern", "System.err.println($MSG)", "-q"]);
    assert_eq!(absent.status.code(), Some(1));
    assert!(absent.stdout.is_empty());
}

#[test]
fn test_search_by_node_kind() {
    let file = fixtures().join("transformation/Foo1.java");
    let all = java_rewriter(&["search", path_arg(&file), "--kind", "method_declaration"]);
    assert!(all.status.success(), "{all:?}");
    assert!(stdout(&all).contains("2 match(es)"));

    let printing = java_rewriter(&[
        "search",
        path_arg(&file),
        "--kind",
        "method_declaration",
        "--field",
        "body",
        "--pattern",
        "System.out.println($MSG)",
    ]);
    assert!(printing.status.success(), "{printing:?}");
    let listing = stdout(&printing);
    assert!(listing.contains("Foo1.java:8: public void b()"), "{listing}");
    assert!(listing.contains("1 match(es)"));

    let unfiltered = java_rewriter(&["search", path_arg(&file), "--kind", "method_declaration", "--pattern", "$X"]);
    assert!(!unfiltered.status.success());
    assert!(String::from_utf8_lossy(&unfiltered.stderr).contains("needs --field"));
}

#[test]
fn test_apply_writes_output_and_checks_expectations() {
    let dir = setup_test_workspace("");
    let script = dir.path().join("script.toml");
    let output = java_rewriter(&["apply", "--config", path_arg(&script), "--diff"]);

    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        stdout(&output),
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = stdout(&output);
    assert!(stdout.contains("plus-to-minus"));
    assert!(stdout.contains("+        return 3 - 2;"), "{stdout}");

    let printed = fs::read_to_string(dir.path().join("out/transformation/Foo1.java")).unwrap();
    assert!(printed.contains("this is replacement code"));
}

#[test]
fn test_apply_dry_run_writes_nothing() {
    let dir = setup_test_workspace("");
    let script = dir.path().join("script.toml");
    let output = java_rewriter(&["apply", "--config", path_arg(&script), "--dry-run"]);

    assert!(output.status.success(), "{output:?}");
    assert!(stdout(&output).contains("DRY RUN"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_apply_fails_on_broken_expectation() {
    let dir = setup_test_workspace(
        r#"
[[expect]]
class = "Foo1"
method = "m"
returns = 5
"#,
    );
    let script = dir.path().join("script.toml");

    let output = java_rewriter(&["apply", "--config", path_arg(&script)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("expected 5, got 1"));

    let unchecked = java_rewriter(&["apply", "--config", path_arg(&script), "--no-verify"]);
    assert!(unchecked.status.success(), "{unchecked:?}");
}
