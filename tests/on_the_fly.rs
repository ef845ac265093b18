//! End-to-end transformation of the Foo1 fixture
//!
//! Covers the whole pipeline:
//! 1. Load inputs plus a source classpath
//! 2. Check the initial behaviour through the oracle
//! 3. Swap operators, delete a method, merge new members, replace a body
//! 4. Check the transformed behaviour
//! 5. Pretty-print to disk and re-print idempotently

use java_rewriter::ast::{BinaryOperatorKind, NodeVariant};
use java_rewriter::merge::{add_code_to, replace_method_body};
use java_rewriter::oracle::{run_once, InterpreterOracle, Oracle, Value};
use java_rewriter::query::BinaryOperatorFilter;
use java_rewriter::syntax::parse_source;
use java_rewriter::{Ast, Project, WriteOutcome};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const ADDITIONS: &str = "\tprivate int counter = 0;\
\tfinal public String foo() {\n\
\t\tSystem.out.println(\"This is a test\");\n\
\t\tSystem.out.println(\"Line 2\");\n\
\t\treturn \"foo has been called\";\
\t}\
\n\
\tpublic int add(int value1, int value2) {\n\
\t\ttry {\n\
\t\t\treturn value1 + value2;\n\
\t\t} catch(RuntimeException ignored) {\n\
\t\t\tSystem.out.println(\"ignoring \"+ignored.getMessage());\n\
\t\t\tthrow ignored;\n\
\t\t} finally {\n\
\t\t\tcounter++;\n\
\t\t}\n\
}";

const REPLACEMENT: &str = "\t\tSystem.out.println(\"this is replacement code\");\n\
\t\treturn \"foo has been called\";";

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load(output: &TempDir) -> Project {
    Project::builder()
        .input(fixtures().join("transformation"))
        .source_classpath(fixtures().join("classpath"))
        .output_dir(output.path())
        .validate_output(true)
        .build()
        .unwrap()
}

#[test]
fn transforms_foo1_end_to_end() {
    let output = TempDir::new().unwrap();
    let mut project = load(&output);

    let foo = project.find_named(NodeVariant::Class, "Foo1").unwrap();
    let qualified = project.ast().qualified_name(foo).unwrap();
    assert_eq!(qualified, "transformation.Foo1");

    // initial behaviour
    let (initial, _) = run_once(
        &InterpreterOracle,
        &qualified,
        &project.standalone_source(foo),
        "m",
    )
    .unwrap();
    assert_eq!(initial, Value::Int(5));

    let ast = project.ast_mut();
    let swapped = ast.replace_operator_kind(foo, BinaryOperatorKind::Plus, BinaryOperatorKind::Minus);
    assert_eq!(swapped, 1);
    assert_eq!(ast.delete_methods_named(foo, "b").unwrap(), 1);
    assert_eq!(
        ast.elements(foo, BinaryOperatorFilter(BinaryOperatorKind::Plus))
            .count(),
        0
    );

    let added = add_code_to(ast, foo, ADDITIONS).unwrap();
    assert!(added.is_clean(), "{:?}", added.skipped);
    assert_eq!(added.added.len(), 3);
    for member in &added.added {
        assert!(!ast.position(*member).is_real());
    }

    let replaced = replace_method_body(ast, foo, "foo", REPLACEMENT).unwrap();
    assert_eq!(replaced.replaced.len(), 1);
    ast.check_integrity(foo).unwrap();

    // transformed behaviour
    let class = InterpreterOracle
        .compile(&qualified, &project.standalone_source(foo))
        .unwrap();
    let mut instance = class.instantiate().unwrap();
    assert_eq!(instance.invoke("m", &[]).unwrap(), Value::Int(1));
    assert_eq!(
        instance.invoke("foo", &[]).unwrap(),
        Value::from("foo has been called")
    );
    assert_eq!(instance.take_output(), "this is replacement code\n");
    assert_eq!(
        instance
            .invoke("add", &[Value::Int(2), Value::Int(3)])
            .unwrap(),
        Value::Int(5)
    );
    assert_eq!(instance.field("counter"), Some(Value::Int(1)));

    // printing
    let outcomes = project.pretty_print().unwrap();
    assert_eq!(outcomes.len(), 1, "classpath units are never printed");
    let written = output.path().join("transformation/Foo1.java");
    assert!(matches!(&outcomes[0], WriteOutcome::Written { path, .. } if *path == written));

    let text = fs::read_to_string(&written).unwrap();
    assert!(text.starts_with("package transformation;"));
    assert!(text.contains("return 3 - 2;"));
    assert!(text.contains("this is replacement code"));
    assert!(!text.contains("This is a test"));
    assert!(!text.contains("void b()"));
    assert!(!output.path().join("transformation/IFoo.java").exists());

    let again = project.pretty_print().unwrap();
    assert!(matches!(again[0], WriteOutcome::Unchanged { .. }));
}

#[test]
fn printed_output_reparses_to_the_same_tree() {
    let output = TempDir::new().unwrap();
    let mut project = load(&output);
    let foo = project.find_named(NodeVariant::Class, "Foo1").unwrap();
    add_code_to(project.ast_mut(), foo, ADDITIONS).unwrap();

    for printed in project.printed_units() {
        let mut reparsed = Ast::new();
        let unit = parse_source(&mut reparsed, &printed.unit, &printed.text).unwrap();
        let original = project
            .input_units()
            .find(|u| u.name == printed.unit)
            .unwrap()
            .root;
        assert!(
            project.ast().structurally_equal(original, &reparsed, unit),
            "{}",
            printed.text
        );

        let mut twice = Ast::new();
        let again = parse_source(&mut twice, &printed.unit, &printed.text).unwrap();
        assert_eq!(
            java_rewriter::print(&twice, again),
            java_rewriter::print(&reparsed, unit)
        );
    }
}

#[test]
fn classpath_types_are_indexed_but_not_transformed() {
    let output = TempDir::new().unwrap();
    let project = load(&output);

    assert!(project.find_type("transformation.IFoo").is_some());
    assert!(project.find_named(NodeVariant::Interface, "IFoo").is_none());
    assert_eq!(project.input_units().count(), 1);

    let err = project.get_type("Foo2").unwrap_err();
    assert!(err.to_string().contains("did you mean 'Foo1'"), "{err}");
}
