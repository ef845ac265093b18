use crate::ast::NodeVariant;
use thiserror::Error;

fn hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{name}'?)"),
        None => String::new(),
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("no {variant} named '{name}' found{}", hint(.suggestion))]
    ElementNotFound {
        variant: NodeVariant,
        name: String,
        suggestion: Option<String>,
    },

    #[error("no {variant} found")]
    NoMatch { variant: NodeVariant },

    #[error("unknown node kind '{0}'")]
    UnknownVariant(String),
}
