//! Typed Java syntax tree held in an arena.
//!
//! Nodes are addressed by [`NodeId`]. Every attached node has exactly one
//! parent; nodes without one are detached roots that can be grafted
//! elsewhere. Copies made with [`Ast::clone_subtree`] or [`Ast::import`]
//! carry [`SourcePosition::Synthetic`].

mod errors;
mod kinds;
mod mutate;
mod node;
mod tree;

pub use errors::MutationError;
pub use kinds::{
    modifiers_from, BinaryOperatorKind, Comment, CommentKind, Import, Literal, ModifierKind,
    Modifiers, UnaryOperatorKind,
};
pub use node::{HasBody, HasModifiers, Named, NodeData, NodeId, NodeKind, NodeVariant, SourcePosition};
pub use tree::Ast;
