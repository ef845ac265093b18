//! ast-grep structural search over Java text.
//!
//! Patterns use ast-grep's metavariable syntax (`$A + $B`,
//! `System.out.println($$$ARGS)`) and are matched against the tree-sitter
//! Java grammar, independently of the crate's own parser.

pub mod errors;
pub mod matcher;

pub use ast_grep_language::SupportLang;
pub use errors::AstGrepError;
pub use matcher::{PatternMatch, PatternMatcher};

/// The language every pattern and source is parsed as.
pub fn java() -> SupportLang {
    SupportLang::Java
}
