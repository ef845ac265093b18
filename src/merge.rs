//! Splice member source text into an existing type.
//!
//! The snippet is placed inside a printed copy of the target type, the
//! result is parsed into a scratch arena, and the members whose positions
//! fall inside the snippet are imported into the primary arena as detached
//! synthetic copies. Members reproduced from the printed type are never
//! selected because their positions lie outside the snippet.

use crate::ast::{Ast, HasBody, MutationError, NodeId, NodeKind, NodeVariant};
use crate::printer::{print, print_method_header, print_unit_header};
use crate::query::{self, QueryError};
use crate::syntax::{parse_source, ParseError};
use std::ops::Range;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("fragment for '{class}' does not parse: {source}")]
    Parse {
        class: String,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Mutation(#[from] MutationError),
}

/// A copied member that was not grafted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedChange {
    pub variant: NodeVariant,
    pub name: Option<String>,
    pub reason: String,
}

/// Outcome of a best-effort merge.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Members appended to the target type.
    pub added: Vec<NodeId>,
    /// Methods whose bodies were swapped.
    pub replaced: Vec<NodeId>,
    /// Existing members the snippet already matched, left untouched.
    pub present: Vec<NodeId>,
    pub skipped: Vec<SkippedChange>,
}

impl MergeReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    fn skip(&mut self, ast: &Ast, node: NodeId, reason: impl Into<String>) {
        let change = SkippedChange {
            variant: ast.variant(node),
            name: ast.simple_name(node).map(str::to_string),
            reason: reason.into(),
        };
        tracing::warn!(
            variant = %change.variant,
            name = change.name.as_deref().unwrap_or(""),
            reason = %change.reason,
            "skipping change"
        );
        self.skipped.push(change);
    }
}

/// The temporary unit text and the byte range the snippet occupies in it.
fn wrap_snippet(ast: &Ast, class: NodeId, snippet: &str) -> (String, Range<usize>) {
    let mut text = ast
        .compilation_unit_of(class)
        .map(|unit| print_unit_header(ast, unit))
        .unwrap_or_default();
    let printed = print(ast, class);
    let open = printed.trim_end();
    text.push_str(open.strip_suffix('}').unwrap_or(open));
    let start = text.len();
    text.push_str(snippet);
    let end = text.len();
    text.push_str("\n}\n");
    (text, start..end)
}

/// Parse `snippet` in the context of `class` and return detached copies of
/// the fields, methods and constructors it declares, in source order.
pub fn extract_additions(
    ast: &mut Ast,
    class: NodeId,
    snippet: &str,
) -> Result<Vec<NodeId>, MergeError> {
    let variant = ast.variant(class);
    if !variant.is_type() {
        return Err(ast.unexpected(class, "Class or Interface").into());
    }
    let name = ast.simple_name(class).unwrap_or_default().to_string();
    let (text, range) = wrap_snippet(ast, class, snippet);

    let mut scratch = Ast::new();
    let unit = parse_source(&mut scratch, &format!("{name}.java"), &text).map_err(|source| {
        MergeError::Parse {
            class: name.clone(),
            source,
        }
    })?;
    let temporary = query::expect_first(&scratch, unit, variant, &name)?;

    let selected: Vec<NodeId> = scratch
        .members(temporary)
        .iter()
        .copied()
        .filter(|member| {
            matches!(
                scratch.variant(*member),
                NodeVariant::Field | NodeVariant::Method | NodeVariant::Constructor
            )
        })
        .filter(|member| {
            scratch
                .position(*member)
                .byte_range()
                .is_some_and(|span| range.contains(&span.start))
        })
        .collect();
    tracing::debug!(class = %name, selected = selected.len(), "extracted fragment members");

    Ok(selected
        .into_iter()
        .map(|member| ast.import(&scratch, member))
        .collect())
}

/// Field name, or method name with its parameter types.
fn signature(ast: &Ast, member: NodeId) -> Option<String> {
    match ast.kind(member) {
        NodeKind::Field { name, .. } => Some(name.clone()),
        NodeKind::Method {
            name, parameters, ..
        }
        | NodeKind::Constructor {
            name, parameters, ..
        } => {
            let types: Vec<String> = parameters
                .iter()
                .map(|parameter| match ast.kind(*parameter) {
                    NodeKind::Parameter { ty, .. } => print(ast, *ty),
                    _ => String::new(),
                })
                .collect();
            Some(format!("{name}({})", types.join(",")))
        }
        _ => None,
    }
}

fn graft(ast: &mut Ast, class: NodeId, snippet: &str, keep_existing: bool) -> Result<MergeReport, MergeError> {
    let mut report = MergeReport::default();
    for change in extract_additions(ast, class, snippet)? {
        if keep_existing {
            let view: &Ast = ast;
            let wanted = signature(view, change);
            let existing = view.members(class).iter().copied().find(|member| {
                view.variant(*member) == view.variant(change) && signature(view, *member) == wanted
            });
            if let Some(existing) = existing {
                report.present.push(existing);
                continue;
            }
        }
        match ast.variant(change) {
            NodeVariant::Field | NodeVariant::Method => match ast.add_member(class, change) {
                Ok(()) => report.added.push(change),
                Err(err) => report.skip(ast, change, err.to_string()),
            },
            other => report.skip(ast, change, format!("unknown change of type {other}")),
        }
    }
    Ok(report)
}

/// Append every field and method declared in `snippet` to `class`.
///
/// Anything else the snippet declares is reported as skipped.
pub fn add_code_to(ast: &mut Ast, class: NodeId, snippet: &str) -> Result<MergeReport, MergeError> {
    graft(ast, class, snippet, false)
}

/// Like [`add_code_to`], but members whose signature `class` already
/// declares are left alone and listed in [`MergeReport::present`].
pub fn add_missing_code_to(
    ast: &mut Ast,
    class: NodeId,
    snippet: &str,
) -> Result<MergeReport, MergeError> {
    graft(ast, class, snippet, true)
}

/// Replace the body of the first method of `class` named `method_name` with
/// the statements in `body`. A body that already matches is left in place
/// and the method is listed in [`MergeReport::present`].
///
/// The statements are parsed as the body of a method carrying the existing
/// method's signature, so parameters stay in scope.
pub fn replace_method_body(
    ast: &mut Ast,
    class: NodeId,
    method_name: &str,
    body: &str,
) -> Result<MergeReport, MergeError> {
    let method = ast
        .members(class)
        .iter()
        .copied()
        .find(|member| {
            matches!(
                ast.variant(*member),
                NodeVariant::Method | NodeVariant::Constructor
            ) && ast.simple_name(*member) == Some(method_name)
        })
        .ok_or_else(|| QueryError::ElementNotFound {
            variant: NodeVariant::Method,
            name: method_name.to_string(),
            suggestion: query::suggest(ast, class, NodeVariant::Method, method_name),
        })?;

    let text = format!("{} {{\n{body}\n}}", print_method_header(ast, method));
    let mut report = MergeReport::default();
    for change in extract_additions(ast, class, &text)? {
        if ast.variant(change) != ast.variant(method) {
            let variant = ast.variant(change);
            report.skip(ast, change, format!("unknown change of type {variant}"));
            continue;
        }
        let Some(new_body) = ast.kind(change).body() else {
            report.skip(ast, change, "replacement has no body");
            continue;
        };
        let view: &Ast = ast;
        if view
            .kind(method)
            .body()
            .is_some_and(|current| view.structurally_equal(current, view, new_body))
        {
            report.present.push(method);
            continue;
        }
        ast.detach(new_body)?;
        ast.replace_body(method, new_body)?;
        report.replaced.push(method);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{NodeKind, SourcePosition};
    use crate::syntax::parse_source;

    const FOO: &str = r#"package transformation;

public class Foo1 implements IFoo {
    public int m() {
        return 3 + 2;
    }

    void b() {
    }
}
"#;

    fn foo() -> (Ast, NodeId) {
        let mut ast = Ast::new();
        let unit = parse_source(&mut ast, "Foo1.java", FOO).unwrap();
        let class = ast.find_named(unit, NodeVariant::Class, "Foo1").unwrap();
        (ast, class)
    }

    fn all_synthetic(ast: &Ast, root: NodeId) -> bool {
        ast.elements(root, |_: &Ast, _: NodeId| true)
            .all(|node| *ast.position(node) == SourcePosition::Synthetic)
    }

    #[test]
    fn extracts_only_snippet_members() {
        let (mut ast, class) = foo();
        let copies = extract_additions(
            &mut ast,
            class,
            "\tprivate int counter = 0;\tpublic int two() { return 2; }",
        )
        .unwrap();
        let names: Vec<_> = copies.iter().map(|c| ast.simple_name(*c).unwrap()).collect();
        assert_eq!(names, vec!["counter", "two"]);
        for copy in &copies {
            assert!(ast.is_detached(*copy));
            assert!(all_synthetic(&ast, *copy));
        }
    }

    #[test]
    fn add_code_grows_the_class_and_keeps_existing_members() {
        let (mut ast, class) = foo();
        let before: Vec<NodeId> = ast.members(class).to_vec();
        let snapshot = ast.clone_subtree(before[0]);

        let report = add_code_to(
            &mut ast,
            class,
            "\tprivate int counter = 0;\n\tpublic int add(int a, int b) {\n\t\ttry {\n\t\t\treturn a + b;\n\t\t} finally {\n\t\t\tcounter++;\n\t\t}\n\t}",
        )
        .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.added.len(), 2);
        assert_eq!(ast.members(class).len(), before.len() + 2);
        assert_eq!(&ast.members(class)[..before.len()], before.as_slice());
        assert!(ast.structurally_equal(before[0], &ast, snapshot));
        ast.check_integrity(ast.compilation_unit_of(class).unwrap()).unwrap();
    }

    #[test]
    fn missing_code_skips_declared_signatures() {
        let (mut ast, class) = foo();
        let snippet = "int counter;\npublic int m() { return 9; }\nint m(int x) { return x; }";
        let first = add_missing_code_to(&mut ast, class, snippet).unwrap();
        assert_eq!(first.added.len(), 2);
        assert_eq!(first.present.len(), 1);
        assert_eq!(ast.members(class).len(), 4);

        let again = add_missing_code_to(&mut ast, class, snippet).unwrap();
        assert!(again.added.is_empty());
        assert_eq!(again.present.len(), 3);
        assert_eq!(ast.members(class).len(), 4);

        let duplicated = add_code_to(&mut ast, class, "int counter;").unwrap();
        assert_eq!(duplicated.added.len(), 1);
        assert_eq!(ast.members(class).len(), 5);
    }

    #[test]
    fn identical_body_is_left_in_place() {
        let (mut ast, class) = foo();
        let method = ast.find_named(class, NodeVariant::Method, "m").unwrap();
        let body = ast.kind(method).body().unwrap();

        let report = replace_method_body(&mut ast, class, "m", "return 3 + 2;").unwrap();
        assert!(report.replaced.is_empty());
        assert_eq!(report.present, vec![method]);
        assert_eq!(ast.kind(method).body(), Some(body));
        assert!(ast.position(body).is_real());
    }

    #[test]
    fn constructors_in_snippets_are_skipped() {
        let (mut ast, class) = foo();
        let report = add_code_to(&mut ast, class, "Foo1() { }\nint x;").unwrap();
        assert_eq!(report.added.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].variant, NodeVariant::Constructor);
    }

    #[test]
    fn replaces_a_method_body() {
        let (mut ast, class) = foo();
        let method = ast.find_named(class, NodeVariant::Method, "m").unwrap();
        let report = replace_method_body(&mut ast, class, "m", "\t\treturn 7;").unwrap();
        assert_eq!(report.replaced, vec![method]);
        assert_eq!(ast.members(class).len(), 2);

        let body = ast.kind(method).body().unwrap();
        assert_eq!(print(&ast, body), "{\n    return 7;\n}");
        assert!(all_synthetic(&ast, body));
        assert_eq!(ast.parent(body), Some(method));
    }

    #[test]
    fn missing_method_suggests_a_name() {
        let (mut ast, class) = foo();
        let err = replace_method_body(&mut ast, class, "mm", "return 1;").unwrap_err();
        assert!(matches!(
            err,
            MergeError::Query(QueryError::ElementNotFound { ref suggestion, .. })
                if suggestion.as_deref() == Some("m")
        ));
    }

    #[test]
    fn malformed_snippet_reports_the_class() {
        let (mut ast, class) = foo();
        let err = add_code_to(&mut ast, class, "int broken(").unwrap_err();
        match err {
            MergeError::Parse { class, source } => {
                assert_eq!(class, "Foo1");
                assert_eq!(source.file, "Foo1.java");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn merging_into_a_non_type_fails() {
        let (mut ast, class) = foo();
        let method = ast.members(class)[0];
        assert!(matches!(ast.kind(method), NodeKind::Method { .. }));
        assert!(matches!(
            extract_additions(&mut ast, method, "int x;"),
            Err(MergeError::Mutation(MutationError::UnexpectedVariant { .. }))
        ));
    }
}
