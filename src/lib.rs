//! java-rewriter: programmatic transformation of Java source.
//!
//! Source text is parsed into a typed arena AST, queried with lazy filtered
//! traversals, mutated at node level, merged with separately parsed
//! fragments and printed back to canonical Java. Printed units can be
//! cross-checked against the tree-sitter Java grammar and executed through
//! an [`oracle::Oracle`] to confirm the transformation behaves as intended.
//!
//! # Architecture
//!
//! Everything hangs off one [`Ast`] arena. A [`Project`] owns it together
//! with the list of parsed units and an index of declared types. Queries
//! return [`NodeId`]s; mutations take them back. Fragments parsed for
//! [`merge::add_code_to`] are copied into the same arena, so nothing ever
//! refers across trees.
//!
//! # Example
//!
//! ```no_run
//! use java_rewriter::ast::{BinaryOperatorKind, NodeVariant};
//! use java_rewriter::{merge, Project};
//!
//! let mut project = Project::builder()
//!     .input("src/main/java")
//!     .output_dir("target/rewritten")
//!     .build()?;
//!
//! let foo = project.get_type("transformation.Foo1")?;
//! let unit = project.ast().compilation_unit_of(foo).unwrap_or(foo);
//! project
//!     .ast_mut()
//!     .replace_operator_kind(unit, BinaryOperatorKind::Plus, BinaryOperatorKind::Minus);
//! merge::add_code_to(project.ast_mut(), foo, "private int counter = 0;")?;
//! assert!(project.find_named(NodeVariant::Field, "counter").is_some());
//!
//! project.pretty_print()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod ast;
pub mod config;
pub mod merge;
pub mod oracle;
pub mod output;
pub mod printer;
pub mod project;
pub mod query;
pub mod sg;
pub mod syntax;
pub mod validate;

// Re-exports
pub use ast::{Ast, MutationError, NodeId, NodeKind, NodeVariant};
pub use config::{
    apply_transforms, check_expectations, load_from_path, load_from_str, ApplicationError,
    ConfigError, TransformResult, TransformScript,
};
pub use merge::{add_code_to, add_missing_code_to, replace_method_body, MergeError, MergeReport};
pub use oracle::{InterpreterOracle, Oracle, OracleError, Value};
pub use output::{OutputError, WriteOutcome};
pub use printer::print;
pub use project::{Project, ProjectBuilder, ProjectError, UnitRole};
pub use query::{Filter, QueryError};
pub use syntax::{parse_source, ParseError, SourceUnit};
pub use validate::{check_java, SyntaxCheckError};
