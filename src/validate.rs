//! Syntax cross-check of printed Java against the tree-sitter grammar.
//!
//! Printed output is re-parsed with an independent grammar and every ERROR
//! or MISSING node is reported with its line, column and surrounding text.

use ast_grep_language::{LanguageExt, SupportLang};
use std::cell::RefCell;
use std::path::Path;
use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

#[derive(Error, Debug)]
pub enum SyntaxCheckError {
    #[error("failed to set Java language for parser")]
    LanguageSet,

    #[error("tree-sitter produced no tree")]
    ParseFailed,

    #[error("{count} syntax error(s), first at {}", first_location(.errors))]
    SyntaxErrors {
        count: usize,
        errors: Vec<ErrorLocation>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn first_location(errors: &[ErrorLocation]) -> String {
    errors
        .first()
        .map(|e| format!("{}:{} near `{}`", e.line, e.column, e.context))
        .unwrap_or_default()
}

/// Location of an error node in the checked text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLocation {
    pub byte_start: usize,
    pub byte_end: usize,
    pub line: usize,
    pub column: usize,
    pub context: String,
}

pub struct JavaSyntaxChecker {
    parser: Parser,
}

impl JavaSyntaxChecker {
    pub fn new() -> Result<Self, SyntaxCheckError> {
        let mut parser = Parser::new();
        parser
            .set_language(&SupportLang::Java.get_ts_language())
            .map_err(|_| SyntaxCheckError::LanguageSet)?;
        Ok(Self { parser })
    }

    fn parse(&mut self, source: &str) -> Result<Tree, SyntaxCheckError> {
        self.parser
            .parse(source, None)
            .ok_or(SyntaxCheckError::ParseFailed)
    }

    /// Fails if `source` contains any syntax error.
    pub fn check(&mut self, source: &str) -> Result<(), SyntaxCheckError> {
        let tree = self.parse(source)?;
        let errors = collect_errors(tree.root_node(), source);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SyntaxCheckError::SyntaxErrors {
                count: errors.len(),
                errors,
            })
        }
    }

    pub fn check_file(&mut self, path: impl AsRef<Path>) -> Result<(), SyntaxCheckError> {
        let source = std::fs::read_to_string(path)?;
        self.check(&source)
    }
}

thread_local! {
    static CHECKER: RefCell<Option<JavaSyntaxChecker>> = const { RefCell::new(None) };
}

/// [`JavaSyntaxChecker::check`] with a checker reused per thread.
pub fn check_java(source: &str) -> Result<(), SyntaxCheckError> {
    CHECKER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(JavaSyntaxChecker::new()?);
        }
        match slot.as_mut() {
            Some(checker) => checker.check(source),
            None => Err(SyntaxCheckError::ParseFailed),
        }
    })
}

fn collect_errors(root: Node<'_>, source: &str) -> Vec<ErrorLocation> {
    let mut errors = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let start = node.start_position();
            let byte_start = node.start_byte();
            let byte_end = node.end_byte();
            let context = source
                .get(byte_start.saturating_sub(20)..(byte_end + 20).min(source.len()))
                .unwrap_or("")
                .replace('\n', "\\n");
            errors.push(ErrorLocation {
                byte_start,
                byte_end,
                line: start.row + 1,
                column: start.column + 1,
                context,
            });
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    errors.sort_by_key(|e| e.byte_start);
    errors
}
