use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The source was rejected before anything ran.
    #[error("compilation failed: {0}")]
    Compile(String),

    /// An exception escaped the invoked method.
    #[error("{exception}{}", .message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Runtime {
        exception: String,
        message: Option<String>,
    },
}

impl OracleError {
    pub(crate) fn compile(message: impl Into<String>) -> Self {
        OracleError::Compile(message.into())
    }
}
