//! Integration tests for transformation scripts
//!
//! Loads the fixture script, applies it against the fixture sources and
//! checks results, idempotency, expectations and written output.

use java_rewriter::config::{
    apply_transforms, check_expectations, load_from_path, load_from_str, project_builder,
    ApplicationError, ConfigError, Operation, TransformResult,
};
use java_rewriter::oracle::InterpreterOracle;
use java_rewriter::WriteOutcome;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Helper to copy the fixture tree into a temp dir so output can be written
fn setup_test_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    copy_dir(&fixtures(), dir.path());
    dir
}

fn copy_dir(from: &Path, to: &Path) {
    for entry in walkdir::WalkDir::new(from) {
        let entry = entry.unwrap();
        let target = to.join(entry.path().strip_prefix(from).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

#[test]
fn test_load_fixture_script() {
    let script = load_from_path(fixtures().join("on_the_fly.toml")).unwrap();

    assert_eq!(script.meta.name, "on-the-fly");
    assert_eq!(script.meta.inputs, vec!["transformation"]);
    assert_eq!(script.meta.classpath, vec!["classpath"]);
    assert!(script.meta.validate_output);
    assert_eq!(script.transforms.len(), 4);
    assert_eq!(script.expect.len(), 2);

    match &script.transforms[3].operation {
        Operation::ReplaceBody { method, body } => {
            assert_eq!(method, "foo");
            assert!(body.contains("this is replacement code"));
        }
        other => panic!("unexpected operation {other:?}"),
    }
}

#[test]
fn test_apply_fixture_script() {
    let script = load_from_path(fixtures().join("on_the_fly.toml")).unwrap();
    let mut project = project_builder(&script, &fixtures()).build().unwrap();

    let results = apply_transforms(&script, &mut project);
    let outcomes: Vec<_> = results
        .iter()
        .map(|(id, result)| (id.as_str(), result.as_ref().unwrap().clone()))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            ("plus-to-minus", TransformResult::Applied { changes: 1 }),
            ("drop-b", TransformResult::Applied { changes: 1 }),
            ("add-members", TransformResult::Applied { changes: 3 }),
            ("replace-foo", TransformResult::Applied { changes: 1 }),
        ]
    );

    let checks = check_expectations(&script, &project, &InterpreterOracle);
    assert_eq!(checks.len(), 2);
    for check in &checks {
        assert!(check.passed(), "{}.{}: {:?}", check.class, check.method, check.failure);
    }
}

#[test]
fn test_rerun_is_idempotent() {
    let script = load_from_path(fixtures().join("on_the_fly.toml")).unwrap();
    let mut project = project_builder(&script, &fixtures()).build().unwrap();

    let _ = apply_transforms(&script, &mut project);
    let foo = project.get_type("Foo1").unwrap();
    let members = project.ast().members(foo).to_vec();
    let printed = project.printed_units();

    let second = apply_transforms(&script, &mut project);
    for (id, result) in &second {
        assert_eq!(result.as_ref().unwrap(), &TransformResult::AlreadyApplied, "{id}");
    }
    assert_eq!(project.ast().members(foo), members.as_slice());
    assert_eq!(
        project
            .ast()
            .members(foo)
            .iter()
            .filter(|member| project.ast().simple_name(**member) == Some("counter"))
            .count(),
        1
    );
    assert_eq!(project.printed_units()[0].text, printed[0].text);
    assert!(project.printed_units()[0].text.contains("return value1 + value2;"));

    let checks = check_expectations(&script, &project, &InterpreterOracle);
    assert!(checks.iter().all(|check| check.passed()), "{checks:?}");
}

#[test]
fn test_output_dir_is_relative_to_script() {
    let dir = setup_test_workspace();
    let script_path = dir.path().join("with_output.toml");
    let text = fs::read_to_string(dir.path().join("on_the_fly.toml"))
        .unwrap()
        .replace(
            "classpath = [\"classpath\"]",
            "classpath = [\"classpath\"]\noutput_dir = \"out\"",
        );
    fs::write(&script_path, text).unwrap();

    let script = load_from_path(&script_path).unwrap();
    assert_eq!(script.meta.output_dir.as_deref(), Some("out"));
    let mut project = project_builder(&script, dir.path()).build().unwrap();
    let _ = apply_transforms(&script, &mut project);

    let written = project.pretty_print().unwrap();
    assert_eq!(written.len(), 1);
    let path = dir.path().join("out/transformation/Foo1.java");
    assert!(matches!(&written[0], WriteOutcome::Written { path: p, .. } if *p == path));
    let printed = fs::read_to_string(path).unwrap();
    assert!(printed.contains("private int counter = 0;"));
    assert!(printed.contains("return 3 - 2;"));
}

#[test]
fn test_missing_class_is_reported_per_transform() {
    let script = load_from_str(
        r#"
[meta]
inputs = ["transformation"]

[[transforms]]
id = "wrong-class"
class = "Foo2"
operation = { type = "delete-method", name = "b" }

[[transforms]]
id = "right-class"
class = "Foo1"
operation = { type = "delete-method", name = "b" }
"#,
    )
    .unwrap();
    let mut project = project_builder(&script, &fixtures()).build().unwrap();
    let results = apply_transforms(&script, &mut project);

    assert!(matches!(
        results[0].1,
        Err(ApplicationError::Query(_))
    ));
    assert_eq!(
        results[1].1.as_ref().unwrap(),
        &TransformResult::Applied { changes: 1 }
    );
}

#[test]
fn test_invalid_scripts_are_rejected() {
    let err = load_from_str(
        r#"
[meta]
inputs = ["transformation"]

[[transforms]]
id = "swap"
operation = { type = "replace-operator", from = "PLUS", to = "PLUS" }

[[transforms]]
id = "swap"
class = "Foo1"
operation = { type = "add-members", code = "" }
"#,
    )
    .unwrap_err();

    assert!(matches!(err, ConfigError::Validation { .. }));
    let message = err.to_string();
    assert!(message.contains("swap"), "{message}");
}

#[test]
fn test_failed_expectation_is_described() {
    let script = load_from_str(
        r#"
[meta]
inputs = ["transformation"]

[[transforms]]
id = "noop"
class = "Foo1"
operation = { type = "delete-method", name = "missing" }

[[expect]]
class = "Foo1"
method = "m"
returns = 1
"#,
    )
    .unwrap();
    let mut project = project_builder(&script, &fixtures()).build().unwrap();
    let results = apply_transforms(&script, &mut project);
    assert_eq!(
        results[0].1.as_ref().unwrap(),
        &TransformResult::AlreadyApplied
    );

    let checks = check_expectations(&script, &project, &InterpreterOracle);
    assert_eq!(checks[0].failure.as_deref(), Some("expected 1, got 5"));
}
