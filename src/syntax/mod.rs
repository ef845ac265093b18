//! Java source text to [`Ast`] nodes.

mod errors;
mod lexer;
mod parser;

pub use errors::ParseError;
pub use lexer::{tokenize, Token, TokenKind};
pub(crate) use lexer::escape;

use crate::ast::{Ast, NodeId};
use parser::Parser;
use std::path::{Path, PathBuf};

/// A named piece of source text, either read from disk or supplied in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub name: String,
    pub text: String,
    /// Where the text came from; `None` for virtual units.
    pub path: Option<PathBuf>,
}

impl SourceUnit {
    /// An in-memory unit. `name` is used in positions and error messages.
    pub fn virtual_file(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            path: None,
        }
    }

    pub fn read(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self {
            name: path.display().to_string(),
            text,
            path: Some(path.to_path_buf()),
        })
    }
}

/// Parse a whole compilation unit into `ast`, returning its root.
///
/// On error, nodes allocated before the failure stay in the arena but are
/// unreachable from any returned root.
pub fn parse_source(ast: &mut Ast, file: &str, text: &str) -> Result<NodeId, ParseError> {
    Parser::new(ast, file, text)?.compilation_unit()
}

pub fn parse_unit(ast: &mut Ast, unit: &SourceUnit) -> Result<NodeId, ParseError> {
    parse_source(ast, &unit.name, &unit.text)
}

/// Parse a single expression spanning all of `text`.
pub fn parse_expression(ast: &mut Ast, text: &str) -> Result<NodeId, ParseError> {
    let mut parser = Parser::new(ast, "<expression>", text)?;
    let expression = parser.expression()?;
    parser.finish()?;
    Ok(expression)
}

/// Parse a `{ ... }` block spanning all of `text`.
pub fn parse_block(ast: &mut Ast, text: &str) -> Result<NodeId, ParseError> {
    let mut parser = Parser::new(ast, "<block>", text)?;
    let block = parser.block()?;
    parser.finish()?;
    Ok(block)
}
