//! Transform applicator - runs script transforms against a loaded project
//!
//! This module provides high-level script application that:
//! - Resolves each transform's target type in the project index
//! - Applies it through the mutation API or the fragment merger, leaving
//!   alone whatever an earlier run already changed
//! - Reports a result per transform and keeps going after failures
//! - Runs the script's expectations through an oracle

use crate::ast::{BinaryOperatorKind, MutationError, NodeId};
use crate::config::schema::{Expectation, Operation, TransformDefinition, TransformScript};
use crate::merge::{self, MergeError, MergeReport, SkippedChange};
use crate::oracle::{Oracle, OracleError};
use crate::project::{Project, ProjectBuilder};
use crate::query::{BinaryOperatorFilter, QueryError};
use std::fmt;
use std::path::Path;

/// Result of applying a single transform
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "TransformResult should be checked for success/failure"]
pub enum TransformResult {
    /// Transform changed `changes` nodes
    Applied { changes: usize },
    /// Nothing left to change (the transform already ran)
    AlreadyApplied,
    /// Some copied members could not be grafted
    Partial {
        changes: usize,
        skipped: Vec<SkippedChange>,
    },
}

impl fmt::Display for TransformResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformResult::Applied { changes } => write!(f, "Applied ({changes} changes)"),
            TransformResult::AlreadyApplied => write!(f, "Already applied"),
            TransformResult::Partial { changes, skipped } => {
                write!(f, "Partially applied ({changes} changes, {} skipped)", skipped.len())
            }
        }
    }
}

/// Errors during transform application
#[derive(Debug)]
pub enum ApplicationError {
    /// Transform needs a class but names none
    MissingClass { transform_id: String },
    /// Operator name or symbol not recognised
    InvalidOperator(String),
    /// Target type or member not found
    Query(QueryError),
    /// Tree mutation rejected
    Mutation(MutationError),
    /// Fragment could not be merged
    Merge(MergeError),
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::MissingClass { transform_id } => {
                write!(f, "transform '{transform_id}' does not name a class")
            }
            ApplicationError::InvalidOperator(message) => write!(f, "{message}"),
            ApplicationError::Query(e) => write!(f, "lookup failed: {e}"),
            ApplicationError::Mutation(e) => write!(f, "mutation failed: {e}"),
            ApplicationError::Merge(e) => write!(f, "merge failed: {e}"),
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Query(e) => Some(e),
            ApplicationError::Mutation(e) => Some(e),
            ApplicationError::Merge(e) => Some(e),
            _ => None,
        }
    }
}

impl From<QueryError> for ApplicationError {
    fn from(e: QueryError) -> Self {
        ApplicationError::Query(e)
    }
}

impl From<MutationError> for ApplicationError {
    fn from(e: MutationError) -> Self {
        ApplicationError::Mutation(e)
    }
}

impl From<MergeError> for ApplicationError {
    fn from(e: MergeError) -> Self {
        ApplicationError::Merge(e)
    }
}

/// Project builder for a script's inputs, classpath and output directory.
/// Relative paths resolve against `base_dir`, normally the script's
/// directory.
pub fn project_builder(script: &TransformScript, base_dir: &Path) -> ProjectBuilder {
    let mut builder = ProjectBuilder::new().validate_output(script.meta.validate_output);
    for input in &script.meta.inputs {
        builder = builder.input(base_dir.join(input));
    }
    for classpath in &script.meta.classpath {
        builder = builder.source_classpath(base_dir.join(classpath));
    }
    if let Some(output_dir) = &script.meta.output_dir {
        builder = builder.output_dir(base_dir.join(output_dir));
    }
    builder
}

/// Apply every transform in order.
///
/// # Returns
///
/// A vector of results, one per transform in the script. A failed transform
/// does not stop the ones after it.
pub fn apply_transforms(
    script: &TransformScript,
    project: &mut Project,
) -> Vec<(String, Result<TransformResult, ApplicationError>)> {
    script
        .transforms
        .iter()
        .map(|transform| {
            let result = apply_transform(transform, project);
            match &result {
                Ok(outcome) => {
                    tracing::debug!(id = %transform.id, kind = transform.operation.kind(), %outcome, "transform done")
                }
                Err(err) => tracing::warn!(id = %transform.id, error = %err, "transform failed"),
            }
            (transform.id.clone(), result)
        })
        .collect()
}

pub fn apply_transform(
    transform: &TransformDefinition,
    project: &mut Project,
) -> Result<TransformResult, ApplicationError> {
    match &transform.operation {
        Operation::ReplaceOperator { from, to } => {
            let from: BinaryOperatorKind = from.parse().map_err(ApplicationError::InvalidOperator)?;
            let to: BinaryOperatorKind = to.parse().map_err(ApplicationError::InvalidOperator)?;
            let roots: Vec<NodeId> = match &transform.class {
                Some(class) => vec![project.get_type(class)?],
                None => project.input_units().map(|unit| unit.root).collect(),
            };
            // Only operators from the loaded sources; grafted code is kept as written.
            let ast = project.ast();
            let targets: Vec<NodeId> = roots
                .into_iter()
                .flat_map(move |root| ast.elements(root, BinaryOperatorFilter(from)))
                .filter(|node| ast.position(*node).is_real())
                .collect();
            for node in &targets {
                project.ast_mut().set_operator_kind(*node, to)?;
            }
            Ok(counted(targets.len()))
        }
        Operation::DeleteMethod { name } => {
            let class = target_class(transform, project)?;
            let deleted = project.ast_mut().delete_methods_named(class, name)?;
            Ok(counted(deleted))
        }
        Operation::AddMembers { code } => {
            let class = target_class(transform, project)?;
            let report = merge::add_missing_code_to(project.ast_mut(), class, code)?;
            Ok(from_report(report.added.len(), report))
        }
        Operation::ReplaceBody { method, body } => {
            let class = target_class(transform, project)?;
            let report = merge::replace_method_body(project.ast_mut(), class, method, body)?;
            Ok(from_report(report.replaced.len(), report))
        }
    }
}

fn target_class(
    transform: &TransformDefinition,
    project: &Project,
) -> Result<NodeId, ApplicationError> {
    let class = transform
        .class
        .as_deref()
        .ok_or_else(|| ApplicationError::MissingClass {
            transform_id: transform.id.clone(),
        })?;
    Ok(project.get_type(class)?)
}

fn counted(changes: usize) -> TransformResult {
    if changes == 0 {
        TransformResult::AlreadyApplied
    } else {
        TransformResult::Applied { changes }
    }
}

fn from_report(changes: usize, report: MergeReport) -> TransformResult {
    if report.is_clean() {
        counted(changes)
    } else {
        TransformResult::Partial {
            changes,
            skipped: report.skipped,
        }
    }
}

/// Result of running one expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectationOutcome {
    pub class: String,
    pub method: String,
    /// Why the expectation did not hold.
    pub failure: Option<String>,
}

impl ExpectationOutcome {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Print each expected class standalone, run it through `oracle` and compare
/// what it returns, throws and prints.
pub fn check_expectations(
    script: &TransformScript,
    project: &Project,
    oracle: &dyn Oracle,
) -> Vec<ExpectationOutcome> {
    script
        .expect
        .iter()
        .map(|expectation| ExpectationOutcome {
            class: expectation.class.clone(),
            method: expectation.method.clone(),
            failure: check_expectation(expectation, project, oracle).err(),
        })
        .collect()
}

fn check_expectation(
    expectation: &Expectation,
    project: &Project,
    oracle: &dyn Oracle,
) -> Result<(), String> {
    let ty = project
        .get_type(&expectation.class)
        .map_err(|e| e.to_string())?;
    let qualified = project
        .ast()
        .qualified_name(ty)
        .unwrap_or_else(|| expectation.class.clone());
    let source = project.standalone_source(ty);

    let class = oracle
        .compile(&qualified, &source)
        .map_err(|e| e.to_string())?;
    let mut instance = class.instantiate().map_err(|e| e.to_string())?;
    let result = instance.invoke(&expectation.method, &[]);
    let output = instance.take_output();

    match (result, &expectation.throws) {
        (Ok(value), Some(expected)) => {
            return Err(format!("expected {expected} to be thrown, but returned {value}"));
        }
        (Ok(value), None) => {
            if let Some(expected) = &expectation.returns {
                if !expected.matches(&value) {
                    return Err(format!("expected {expected}, got {value}"));
                }
            }
        }
        (Err(OracleError::Runtime { exception, .. }), Some(expected))
            if exception == *expected || exception.ends_with(&format!(".{expected}")) => {}
        (Err(err), _) => return Err(err.to_string()),
    }

    if let Some(expected) = &expectation.output {
        if output != *expected {
            return Err(format!("expected output {expected:?}, got {output:?}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeVariant;
    use crate::config::load_from_str;
    use crate::oracle::InterpreterOracle;
    use crate::printer::print;

    const FOO: &str = r#"package transformation;

public class Foo1 {
    public int m() {
        return 3 + 2;
    }

    public void b() {
    }
}
"#;

    const SCRIPT: &str = r#"
[meta]
name = "foo1"
inputs = ["Foo1.java"]

[[transforms]]
id = "minus"
operation = { type = "replace-operator", from = "PLUS", to = "MINUS" }

[[transforms]]
id = "drop-b"
class = "Foo1"
operation = { type = "delete-method", name = "b" }

[[transforms]]
id = "grow"
class = "transformation.Foo1"
operation = { type = "add-members", code = "int twice(int x) { return x * 2; }" }

[[expect]]
class = "Foo1"
method = "m"
returns = 1
"#;

    fn project() -> Project {
        Project::builder()
            .virtual_file("Foo1.java", FOO)
            .build()
            .unwrap()
    }

    #[test]
    fn applies_transforms_in_order() {
        let script = load_from_str(SCRIPT).unwrap();
        let mut project = project();
        let results = apply_transforms(&script, &mut project);

        let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["minus", "drop-b", "grow"]);
        assert_eq!(results[0].1.as_ref().unwrap(), &TransformResult::Applied { changes: 1 });
        assert_eq!(results[1].1.as_ref().unwrap(), &TransformResult::Applied { changes: 1 });
        assert_eq!(results[2].1.as_ref().unwrap(), &TransformResult::Applied { changes: 1 });

        assert!(project.find_named(NodeVariant::Method, "b").is_none());
        let class = project.find_type("Foo1").unwrap();
        assert!(print(project.ast(), class).contains("return 3 - 2;"));

        let outcomes = check_expectations(&script, &project, &InterpreterOracle);
        assert!(outcomes.iter().all(ExpectationOutcome::passed), "{outcomes:?}");
    }

    #[test]
    fn rerun_reports_already_applied() {
        let script = load_from_str(SCRIPT).unwrap();
        let mut project = project();
        let _ = apply_transforms(&script, &mut project);
        let again = apply_transforms(&script, &mut project);
        assert_eq!(again[0].1.as_ref().unwrap(), &TransformResult::AlreadyApplied);
        assert_eq!(again[1].1.as_ref().unwrap(), &TransformResult::AlreadyApplied);
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let script = load_from_str(
            r#"
[meta]
inputs = ["Foo1.java"]

[[transforms]]
id = "missing"
class = "Foo2"
operation = { type = "delete-method", name = "b" }

[[transforms]]
id = "body"
class = "Foo1"
operation = { type = "replace-body", method = "m", body = "return 7;" }
"#,
        )
        .unwrap();
        let mut project = project();
        let results = apply_transforms(&script, &mut project);
        let err = results[0].1.as_ref().unwrap_err();
        assert!(err.to_string().contains("did you mean 'Foo1'"), "{err}");
        assert!(results[1].1.is_ok());
    }

    #[test]
    fn expectation_failures_are_described() {
        let script = load_from_str(
            r#"
[meta]
inputs = ["Foo1.java"]

[[transforms]]
id = "noop"
operation = { type = "replace-operator", from = "*", to = "/" }

[[expect]]
class = "Foo1"
method = "m"
returns = 4

[[expect]]
class = "Foo1"
method = "m"
throws = "ArithmeticException"

[[expect]]
class = "Foo1"
method = "b"
output = ""
"#,
        )
        .unwrap();
        let outcomes = check_expectations(&script, &project(), &InterpreterOracle);
        assert_eq!(outcomes[0].failure.as_deref(), Some("expected 4, got 5"));
        assert!(outcomes[1]
            .failure
            .as_deref()
            .is_some_and(|failure| failure.starts_with("expected ArithmeticException")));
        assert!(outcomes[2].passed());
    }
}
