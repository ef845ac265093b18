use crate::ast::node::{NodeId, NodeVariant};
use thiserror::Error;

fn describe(variant: &NodeVariant, name: &Option<String>) -> String {
    match name {
        Some(name) => format!("{variant} '{name}'"),
        None => variant.to_string(),
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("cannot add {} as a member: only fields and methods can be added", describe(.variant, .name))]
    UnsupportedMemberKind {
        variant: NodeVariant,
        name: Option<String>,
    },

    #[error("{} is already attached to a parent; detach or clone it first", describe(.variant, .name))]
    AlreadyAttached {
        variant: NodeVariant,
        name: Option<String>,
    },

    #[error("{} is not a child of {}", describe(.child, .child_name), describe(.parent, .parent_name))]
    NotAChild {
        child: NodeVariant,
        child_name: Option<String>,
        parent: NodeVariant,
        parent_name: Option<String>,
    },

    #[error("expected {expected}, found {}", describe(.found, .name))]
    UnexpectedVariant {
        expected: &'static str,
        found: NodeVariant,
        name: Option<String>,
    },

    #[error("{} occupies a required slot of {parent} and cannot be removed", describe(.variant, .name))]
    RequiredChild {
        variant: NodeVariant,
        name: Option<String>,
        parent: NodeVariant,
    },

    #[error("integrity violation at {node}: {message}")]
    Integrity { node: NodeId, message: String },
}
