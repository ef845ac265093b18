use thiserror::Error;

#[derive(Error, Debug)]
pub enum AstGrepError {
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("pattern matched {count} locations, expected exactly 1")]
    AmbiguousMatch { count: usize },

    #[error("pattern matched 0 locations")]
    NoMatch,

    #[error("no method named '{name}' in source")]
    MethodNotFound { name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
