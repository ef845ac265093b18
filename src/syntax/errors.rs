use thiserror::Error;

/// A lexical or grammatical failure, located in the unit that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{file}:{line}:{column}: {message}")]
pub struct ParseError {
    pub file: String,
    /// 1-based.
    pub line: usize,
    /// 1-based, in characters.
    pub column: usize,
    /// Byte offset into the unit text.
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(
        file: &str,
        line: usize,
        column: usize,
        offset: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.to_string(),
            line,
            column,
            offset,
            message: message.into(),
        }
    }
}
