use java_rewriter::oracle::{run_once, InterpreterOracle};
use java_rewriter::syntax::{parse_expression, parse_source};
use java_rewriter::ast::NodeVariant;
use java_rewriter::{print, Ast};
use proptest::prelude::*;

const OPERATORS: &[&str] = &["+", "-", "*", "/", "%", "<<", ">>", "&", "|", "^"];

fn leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        (0i32..50).prop_map(|n| n.to_string()),
        proptest::sample::select(&["a", "b"][..]).prop_map(ToString::to_string),
    ]
}

/// Fully parenthesised integer expressions; the printer decides which
/// parentheses survive.
fn expression() -> impl Strategy<Value = String> {
    leaf().prop_recursive(4, 32, 2, |inner| {
        (inner.clone(), proptest::sample::select(OPERATORS), inner)
            .prop_map(|(left, op, right)| format!("({left} {op} {right})"))
    })
}

fn statement() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        expression().prop_map(|e| format!("int v = {e};")),
        expression().prop_map(|e| format!("a = {e};")),
        Just("System.out.println(\"tick\");".to_string()),
        Just("counter++;".to_string()),
    ];
    leaf.prop_recursive(3, 24, 3, |inner| {
        let block = proptest::collection::vec(inner, 0..3)
            .prop_map(|statements| statements.join(" "))
            .boxed();
        prop_oneof![
            (block.clone(), block.clone(), block.clone()).prop_map(|(body, handler, cleanup)| {
                format!(
                    "try {{ {body} }} catch (RuntimeException e) {{ {handler} }} finally {{ {cleanup} }}"
                )
            }),
            (block.clone(), block.clone())
                .prop_map(|(then, otherwise)| format!("if (a < b) {{ {then} }} else {{ {otherwise} }}")),
            block.prop_map(|body| format!("while (a > 0) {{ {body} }}")),
        ]
    })
}

fn modifiers() -> impl Strategy<Value = String> {
    (
        proptest::sample::select(&["", "public ", "private ", "protected "][..]),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(visibility, is_static, is_final)| {
            format!(
                "{visibility}{}{}",
                if is_static { "static " } else { "" },
                if is_final { "final " } else { "" }
            )
        })
}

#[derive(Debug, Clone)]
enum Member {
    Field {
        modifiers: String,
        ty: &'static str,
        initializer: Option<String>,
    },
    Method {
        modifiers: String,
        returns: &'static str,
        parameters: usize,
        body: Vec<String>,
    },
}

fn member() -> impl Strategy<Value = Member> {
    prop_oneof![
        (
            modifiers(),
            proptest::sample::select(&["int", "String", "long"][..]),
            proptest::option::of(expression()),
        )
            .prop_map(|(modifiers, ty, initializer)| Member::Field {
                modifiers,
                ty,
                initializer: initializer.filter(|_| ty != "String"),
            }),
        (
            modifiers(),
            proptest::sample::select(&["int", "void", "String"][..]),
            0usize..3,
            proptest::collection::vec(statement(), 0..4),
        )
            .prop_map(|(modifiers, returns, parameters, body)| Member::Method {
                modifiers,
                returns,
                parameters,
                body,
            }),
    ]
}

/// A small class whose members are numbered in declaration order.
fn class_source() -> impl Strategy<Value = String> {
    proptest::collection::vec(member(), 1..6).prop_map(|members| {
        let mut text = String::from("package gen;\n\npublic class G {\n");
        for (index, member) in members.iter().enumerate() {
            match member {
                Member::Field {
                    modifiers,
                    ty,
                    initializer,
                } => {
                    let init = initializer
                        .as_ref()
                        .map(|e| format!(" = {e}"))
                        .unwrap_or_default();
                    text.push_str(&format!("    {modifiers}{ty} f{index}{init};\n"));
                }
                Member::Method {
                    modifiers,
                    returns,
                    parameters,
                    body,
                } => {
                    let params: Vec<String> = (0..*parameters).map(|p| format!("int p{p}")).collect();
                    text.push_str(&format!(
                        "    {modifiers}{returns} m{index}({}) {{ {} }}\n",
                        params.join(", "),
                        body.join(" ")
                    ));
                }
            }
        }
        text.push_str("}\n");
        text
    })
}

fn member_names(ast: &Ast, unit: java_rewriter::NodeId) -> Vec<String> {
    let class = ast.find_named(unit, NodeVariant::Class, "G").unwrap();
    ast.members(class)
        .iter()
        .map(|member| ast.simple_name(*member).unwrap_or_default().to_string())
        .collect()
}

fn class_returning(expr: &str) -> String {
    format!("class E {{ int a = 7; int b = -3; int v() {{ return {expr}; }} }}")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn printed_expressions_reparse_to_the_same_tree(expr in expression()) {
        let mut ast = Ast::new();
        let parsed = parse_expression(&mut ast, &expr).unwrap();
        let printed = print(&ast, parsed);

        let mut again = Ast::new();
        let reparsed = parse_expression(&mut again, &printed).unwrap();
        prop_assert!(ast.structurally_equal(parsed, &again, reparsed), "{expr} printed as {printed}");
        prop_assert_eq!(print(&again, reparsed), printed);
    }

    #[test]
    fn printing_preserves_evaluation(expr in expression()) {
        let source = class_returning(&expr);
        let mut ast = Ast::new();
        let unit = parse_source(&mut ast, "E.java", &source).unwrap();
        let printed = print(&ast, unit);

        let before = run_once(&InterpreterOracle, "E", &source, "v");
        let after = run_once(&InterpreterOracle, "E", &printed, "v");
        prop_assert_eq!(before, after);
    }

    #[test]
    fn unit_printing_is_idempotent(expr in expression()) {
        let source = class_returning(&expr);
        let mut ast = Ast::new();
        let unit = parse_source(&mut ast, "E.java", &source).unwrap();
        let once = print(&ast, unit);

        let mut again = Ast::new();
        let reparsed = parse_source(&mut again, "E.java", &once).unwrap();
        prop_assert_eq!(print(&again, reparsed), once);
    }

    #[test]
    fn printed_classes_reparse_to_the_same_tree(source in class_source()) {
        let mut ast = Ast::new();
        let unit = parse_source(&mut ast, "G.java", &source).unwrap();
        let printed = print(&ast, unit);

        let mut again = Ast::new();
        let reparsed = parse_source(&mut again, "G.java", &printed).unwrap();
        prop_assert!(ast.structurally_equal(unit, &again, reparsed), "{source}\nprinted as\n{printed}");
        prop_assert_eq!(member_names(&ast, unit), member_names(&again, reparsed));
        prop_assert_eq!(print(&again, reparsed), printed);
    }
}
