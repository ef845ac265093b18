//! Node identity, the closed set of node variants, and the capability traits
//! shared across them.

use crate::ast::kinds::{
    BinaryOperatorKind, Comment, Import, Literal, Modifiers, UnaryOperatorKind,
};
use std::fmt;
use std::sync::Arc;

/// Stable handle to a node inside an [`Ast`](crate::ast::Ast) arena.
///
/// Handles are only meaningful for the arena that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) const PLACEHOLDER: NodeId = NodeId(u32::MAX);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a node came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum SourcePosition {
    /// Derived from parsed text. `line` and `column` are 1-based; `start`
    /// and `end` are byte offsets into the unit's text.
    Real {
        file: Arc<str>,
        line: usize,
        column: usize,
        start: usize,
        end: usize,
    },
    /// Constructed or copied in memory.
    #[default]
    Synthetic,
}

impl SourcePosition {
    pub fn is_real(&self) -> bool {
        matches!(self, SourcePosition::Real { .. })
    }

    pub fn byte_range(&self) -> Option<std::ops::Range<usize>> {
        match self {
            SourcePosition::Real { start, end, .. } => Some(*start..*end),
            SourcePosition::Synthetic => None,
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourcePosition::Real {
                file, line, column, ..
            } => write!(f, "{file}:{line}:{column}"),
            SourcePosition::Synthetic => f.write_str("<synthetic>"),
        }
    }
}

/// Payload of a node. Child links are [`NodeId`]s owned by the arena.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    CompilationUnit {
        package: Option<String>,
        imports: Vec<Import>,
        types: Vec<NodeId>,
    },
    Class {
        name: String,
        modifiers: Modifiers,
        annotations: Vec<NodeId>,
        type_parameters: Vec<NodeId>,
        superclass: Option<NodeId>,
        interfaces: Vec<NodeId>,
        members: Vec<NodeId>,
    },
    Interface {
        name: String,
        modifiers: Modifiers,
        annotations: Vec<NodeId>,
        type_parameters: Vec<NodeId>,
        extends: Vec<NodeId>,
        members: Vec<NodeId>,
    },
    Method {
        name: String,
        modifiers: Modifiers,
        annotations: Vec<NodeId>,
        type_parameters: Vec<NodeId>,
        return_type: NodeId,
        parameters: Vec<NodeId>,
        thrown: Vec<NodeId>,
        body: Option<NodeId>,
    },
    Constructor {
        name: String,
        modifiers: Modifiers,
        annotations: Vec<NodeId>,
        parameters: Vec<NodeId>,
        thrown: Vec<NodeId>,
        body: NodeId,
    },
    Field {
        name: String,
        modifiers: Modifiers,
        annotations: Vec<NodeId>,
        ty: NodeId,
        initializer: Option<NodeId>,
    },
    Parameter {
        name: String,
        modifiers: Modifiers,
        annotations: Vec<NodeId>,
        ty: NodeId,
        varargs: bool,
    },
    Annotation {
        name: String,
        arguments: Vec<NodeId>,
    },
    TypeParameter {
        name: String,
        bounds: Vec<NodeId>,
    },
    TypeReference {
        name: String,
        arguments: Vec<NodeId>,
        /// `List<>` in a constructor call.
        diamond: bool,
        dimensions: u8,
    },
    WildcardType {
        bound: Option<NodeId>,
        /// `? extends T` when true, `? super T` when false.
        upper: bool,
    },
    Block {
        statements: Vec<NodeId>,
    },
    LocalVariable {
        name: String,
        modifiers: Modifiers,
        ty: NodeId,
        initializer: Option<NodeId>,
    },
    ExpressionStatement {
        expression: NodeId,
    },
    If {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    While {
        condition: NodeId,
        body: NodeId,
    },
    DoWhile {
        body: NodeId,
        condition: NodeId,
    },
    For {
        init: Vec<NodeId>,
        condition: Option<NodeId>,
        update: Vec<NodeId>,
        body: NodeId,
    },
    ForEach {
        variable: NodeId,
        iterable: NodeId,
        body: NodeId,
    },
    Return {
        value: Option<NodeId>,
    },
    Throw {
        value: NodeId,
    },
    Break {
        label: Option<String>,
    },
    Continue {
        label: Option<String>,
    },
    Try {
        body: NodeId,
        catchers: Vec<NodeId>,
        finalizer: Option<NodeId>,
    },
    Catch {
        name: String,
        modifiers: Modifiers,
        types: Vec<NodeId>,
        body: NodeId,
    },
    Empty,
    Literal(Literal),
    Name {
        name: String,
    },
    FieldAccess {
        target: NodeId,
        name: String,
    },
    Invocation {
        target: Option<NodeId>,
        name: String,
        arguments: Vec<NodeId>,
    },
    New {
        ty: NodeId,
        arguments: Vec<NodeId>,
    },
    NewArray {
        element: NodeId,
        dimensions: Vec<NodeId>,
        extra_dimensions: u8,
    },
    ArrayAccess {
        target: NodeId,
        index: NodeId,
    },
    Binary {
        kind: BinaryOperatorKind,
        left: NodeId,
        right: NodeId,
    },
    Unary {
        kind: UnaryOperatorKind,
        operand: NodeId,
    },
    Assignment {
        /// `None` for plain `=`, the arithmetic kind for `+=` and friends.
        operator: Option<BinaryOperatorKind>,
        target: NodeId,
        value: NodeId,
    },
    Conditional {
        condition: NodeId,
        then_value: NodeId,
        else_value: NodeId,
    },
    Cast {
        ty: NodeId,
        expression: NodeId,
    },
    This,
    Super,
}

/// Fieldless mirror of [`NodeKind`], used by filters and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeVariant {
    CompilationUnit,
    Class,
    Interface,
    Method,
    Constructor,
    Field,
    Parameter,
    Annotation,
    TypeParameter,
    TypeReference,
    WildcardType,
    Block,
    LocalVariable,
    ExpressionStatement,
    If,
    While,
    DoWhile,
    For,
    ForEach,
    Return,
    Throw,
    Break,
    Continue,
    Try,
    Catch,
    Empty,
    Literal,
    Name,
    FieldAccess,
    Invocation,
    New,
    NewArray,
    ArrayAccess,
    Binary,
    Unary,
    Assignment,
    Conditional,
    Cast,
    This,
    Super,
}

impl NodeVariant {
    pub const ALL: [NodeVariant; 40] = [
        NodeVariant::CompilationUnit,
        NodeVariant::Class,
        NodeVariant::Interface,
        NodeVariant::Method,
        NodeVariant::Constructor,
        NodeVariant::Field,
        NodeVariant::Parameter,
        NodeVariant::Annotation,
        NodeVariant::TypeParameter,
        NodeVariant::TypeReference,
        NodeVariant::WildcardType,
        NodeVariant::Block,
        NodeVariant::LocalVariable,
        NodeVariant::ExpressionStatement,
        NodeVariant::If,
        NodeVariant::While,
        NodeVariant::DoWhile,
        NodeVariant::For,
        NodeVariant::ForEach,
        NodeVariant::Return,
        NodeVariant::Throw,
        NodeVariant::Break,
        NodeVariant::Continue,
        NodeVariant::Try,
        NodeVariant::Catch,
        NodeVariant::Empty,
        NodeVariant::Literal,
        NodeVariant::Name,
        NodeVariant::FieldAccess,
        NodeVariant::Invocation,
        NodeVariant::New,
        NodeVariant::NewArray,
        NodeVariant::ArrayAccess,
        NodeVariant::Binary,
        NodeVariant::Unary,
        NodeVariant::Assignment,
        NodeVariant::Conditional,
        NodeVariant::Cast,
        NodeVariant::This,
        NodeVariant::Super,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NodeVariant::CompilationUnit => "CompilationUnit",
            NodeVariant::Class => "Class",
            NodeVariant::Interface => "Interface",
            NodeVariant::Method => "Method",
            NodeVariant::Constructor => "Constructor",
            NodeVariant::Field => "Field",
            NodeVariant::Parameter => "Parameter",
            NodeVariant::Annotation => "Annotation",
            NodeVariant::TypeParameter => "TypeParameter",
            NodeVariant::TypeReference => "TypeReference",
            NodeVariant::WildcardType => "WildcardType",
            NodeVariant::Block => "Block",
            NodeVariant::LocalVariable => "LocalVariable",
            NodeVariant::ExpressionStatement => "ExpressionStatement",
            NodeVariant::If => "If",
            NodeVariant::While => "While",
            NodeVariant::DoWhile => "DoWhile",
            NodeVariant::For => "For",
            NodeVariant::ForEach => "ForEach",
            NodeVariant::Return => "Return",
            NodeVariant::Throw => "Throw",
            NodeVariant::Break => "Break",
            NodeVariant::Continue => "Continue",
            NodeVariant::Try => "Try",
            NodeVariant::Catch => "Catch",
            NodeVariant::Empty => "Empty",
            NodeVariant::Literal => "Literal",
            NodeVariant::Name => "Name",
            NodeVariant::FieldAccess => "FieldAccess",
            NodeVariant::Invocation => "Invocation",
            NodeVariant::New => "New",
            NodeVariant::NewArray => "NewArray",
            NodeVariant::ArrayAccess => "ArrayAccess",
            NodeVariant::Binary => "Binary",
            NodeVariant::Unary => "Unary",
            NodeVariant::Assignment => "Assignment",
            NodeVariant::Conditional => "Conditional",
            NodeVariant::Cast => "Cast",
            NodeVariant::This => "This",
            NodeVariant::Super => "Super",
        }
    }

    /// Case-insensitive lookup by name, as typed on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn is_type(self) -> bool {
        matches!(self, NodeVariant::Class | NodeVariant::Interface)
    }

    pub fn is_member(self) -> bool {
        matches!(
            self,
            NodeVariant::Method
                | NodeVariant::Constructor
                | NodeVariant::Field
                | NodeVariant::Class
                | NodeVariant::Interface
        )
    }

    pub fn is_statement(self) -> bool {
        matches!(
            self,
            NodeVariant::Block
                | NodeVariant::LocalVariable
                | NodeVariant::ExpressionStatement
                | NodeVariant::If
                | NodeVariant::While
                | NodeVariant::DoWhile
                | NodeVariant::For
                | NodeVariant::ForEach
                | NodeVariant::Return
                | NodeVariant::Throw
                | NodeVariant::Break
                | NodeVariant::Continue
                | NodeVariant::Try
                | NodeVariant::Empty
        )
    }

    pub fn is_expression(self) -> bool {
        matches!(
            self,
            NodeVariant::Literal
                | NodeVariant::Name
                | NodeVariant::FieldAccess
                | NodeVariant::Invocation
                | NodeVariant::New
                | NodeVariant::NewArray
                | NodeVariant::ArrayAccess
                | NodeVariant::Binary
                | NodeVariant::Unary
                | NodeVariant::Assignment
                | NodeVariant::Conditional
                | NodeVariant::Cast
                | NodeVariant::This
                | NodeVariant::Super
        )
    }
}

impl fmt::Display for NodeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Nodes that carry a simple name.
pub trait Named {
    fn simple_name(&self) -> Option<&str>;
}

/// Nodes that own a body block (or body statement, for loops).
pub trait HasBody {
    fn body(&self) -> Option<NodeId>;
}

/// Declarations that carry a modifier set.
pub trait HasModifiers {
    fn modifiers(&self) -> Option<&Modifiers>;
    fn modifiers_mut(&mut self) -> Option<&mut Modifiers>;
}

impl Named for NodeKind {
    fn simple_name(&self) -> Option<&str> {
        match self {
            NodeKind::Class { name, .. }
            | NodeKind::Interface { name, .. }
            | NodeKind::Method { name, .. }
            | NodeKind::Constructor { name, .. }
            | NodeKind::Field { name, .. }
            | NodeKind::Parameter { name, .. }
            | NodeKind::Annotation { name, .. }
            | NodeKind::TypeParameter { name, .. }
            | NodeKind::TypeReference { name, .. }
            | NodeKind::LocalVariable { name, .. }
            | NodeKind::Catch { name, .. }
            | NodeKind::Name { name }
            | NodeKind::FieldAccess { name, .. }
            | NodeKind::Invocation { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl HasBody for NodeKind {
    fn body(&self) -> Option<NodeId> {
        match self {
            NodeKind::Method { body, .. } => *body,
            NodeKind::Constructor { body, .. }
            | NodeKind::While { body, .. }
            | NodeKind::DoWhile { body, .. }
            | NodeKind::For { body, .. }
            | NodeKind::ForEach { body, .. }
            | NodeKind::Try { body, .. }
            | NodeKind::Catch { body, .. } => Some(*body),
            _ => None,
        }
    }
}

impl HasModifiers for NodeKind {
    fn modifiers(&self) -> Option<&Modifiers> {
        match self {
            NodeKind::Class { modifiers, .. }
            | NodeKind::Interface { modifiers, .. }
            | NodeKind::Method { modifiers, .. }
            | NodeKind::Constructor { modifiers, .. }
            | NodeKind::Field { modifiers, .. }
            | NodeKind::Parameter { modifiers, .. }
            | NodeKind::LocalVariable { modifiers, .. }
            | NodeKind::Catch { modifiers, .. } => Some(modifiers),
            _ => None,
        }
    }

    fn modifiers_mut(&mut self) -> Option<&mut Modifiers> {
        match self {
            NodeKind::Class { modifiers, .. }
            | NodeKind::Interface { modifiers, .. }
            | NodeKind::Method { modifiers, .. }
            | NodeKind::Constructor { modifiers, .. }
            | NodeKind::Field { modifiers, .. }
            | NodeKind::Parameter { modifiers, .. }
            | NodeKind::LocalVariable { modifiers, .. }
            | NodeKind::Catch { modifiers, .. } => Some(modifiers),
            _ => None,
        }
    }
}

/// Outcome of unlinking a child from its parent's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RemoveOutcome {
    Removed,
    /// The child sits in a slot that cannot be empty.
    Required,
    NotFound,
}

fn remove_from(list: &mut Vec<NodeId>, child: NodeId) -> bool {
    match list.iter().position(|id| *id == child) {
        Some(index) => {
            list.remove(index);
            true
        }
        None => false,
    }
}

fn take_if(slot: &mut Option<NodeId>, child: NodeId) -> bool {
    if *slot == Some(child) {
        *slot = None;
        true
    } else {
        false
    }
}

impl NodeKind {
    pub fn variant(&self) -> NodeVariant {
        match self {
            NodeKind::CompilationUnit { .. } => NodeVariant::CompilationUnit,
            NodeKind::Class { .. } => NodeVariant::Class,
            NodeKind::Interface { .. } => NodeVariant::Interface,
            NodeKind::Method { .. } => NodeVariant::Method,
            NodeKind::Constructor { .. } => NodeVariant::Constructor,
            NodeKind::Field { .. } => NodeVariant::Field,
            NodeKind::Parameter { .. } => NodeVariant::Parameter,
            NodeKind::Annotation { .. } => NodeVariant::Annotation,
            NodeKind::TypeParameter { .. } => NodeVariant::TypeParameter,
            NodeKind::TypeReference { .. } => NodeVariant::TypeReference,
            NodeKind::WildcardType { .. } => NodeVariant::WildcardType,
            NodeKind::Block { .. } => NodeVariant::Block,
            NodeKind::LocalVariable { .. } => NodeVariant::LocalVariable,
            NodeKind::ExpressionStatement { .. } => NodeVariant::ExpressionStatement,
            NodeKind::If { .. } => NodeVariant::If,
            NodeKind::While { .. } => NodeVariant::While,
            NodeKind::DoWhile { .. } => NodeVariant::DoWhile,
            NodeKind::For { .. } => NodeVariant::For,
            NodeKind::ForEach { .. } => NodeVariant::ForEach,
            NodeKind::Return { .. } => NodeVariant::Return,
            NodeKind::Throw { .. } => NodeVariant::Throw,
            NodeKind::Break { .. } => NodeVariant::Break,
            NodeKind::Continue { .. } => NodeVariant::Continue,
            NodeKind::Try { .. } => NodeVariant::Try,
            NodeKind::Catch { .. } => NodeVariant::Catch,
            NodeKind::Empty => NodeVariant::Empty,
            NodeKind::Literal(_) => NodeVariant::Literal,
            NodeKind::Name { .. } => NodeVariant::Name,
            NodeKind::FieldAccess { .. } => NodeVariant::FieldAccess,
            NodeKind::Invocation { .. } => NodeVariant::Invocation,
            NodeKind::New { .. } => NodeVariant::New,
            NodeKind::NewArray { .. } => NodeVariant::NewArray,
            NodeKind::ArrayAccess { .. } => NodeVariant::ArrayAccess,
            NodeKind::Binary { .. } => NodeVariant::Binary,
            NodeKind::Unary { .. } => NodeVariant::Unary,
            NodeKind::Assignment { .. } => NodeVariant::Assignment,
            NodeKind::Conditional { .. } => NodeVariant::Conditional,
            NodeKind::Cast { .. } => NodeVariant::Cast,
            NodeKind::This => NodeVariant::This,
            NodeKind::Super => NodeVariant::Super,
        }
    }

    /// Visit child links in source order.
    pub fn for_each_child(&self, mut f: impl FnMut(NodeId)) {
        fn each(ids: &[NodeId], f: &mut dyn FnMut(NodeId)) {
            ids.iter().for_each(|id| f(*id));
        }
        match self {
            NodeKind::CompilationUnit { types, .. } => each(types, &mut f),
            NodeKind::Class {
                annotations,
                type_parameters,
                superclass,
                interfaces,
                members,
                ..
            } => {
                each(annotations, &mut f);
                each(type_parameters, &mut f);
                superclass.iter().for_each(|id| f(*id));
                each(interfaces, &mut f);
                each(members, &mut f);
            }
            NodeKind::Interface {
                annotations,
                type_parameters,
                extends,
                members,
                ..
            } => {
                each(annotations, &mut f);
                each(type_parameters, &mut f);
                each(extends, &mut f);
                each(members, &mut f);
            }
            NodeKind::Method {
                annotations,
                type_parameters,
                return_type,
                parameters,
                thrown,
                body,
                ..
            } => {
                each(annotations, &mut f);
                each(type_parameters, &mut f);
                f(*return_type);
                each(parameters, &mut f);
                each(thrown, &mut f);
                body.iter().for_each(|id| f(*id));
            }
            NodeKind::Constructor {
                annotations,
                parameters,
                thrown,
                body,
                ..
            } => {
                each(annotations, &mut f);
                each(parameters, &mut f);
                each(thrown, &mut f);
                f(*body);
            }
            NodeKind::Field {
                annotations,
                ty,
                initializer,
                ..
            } => {
                each(annotations, &mut f);
                f(*ty);
                initializer.iter().for_each(|id| f(*id));
            }
            NodeKind::Parameter {
                annotations, ty, ..
            } => {
                each(annotations, &mut f);
                f(*ty);
            }
            NodeKind::Annotation { arguments, .. } => each(arguments, &mut f),
            NodeKind::TypeParameter { bounds, .. } => each(bounds, &mut f),
            NodeKind::TypeReference { arguments, .. } => each(arguments, &mut f),
            NodeKind::WildcardType { bound, .. } => bound.iter().for_each(|id| f(*id)),
            NodeKind::Block { statements } => each(statements, &mut f),
            NodeKind::LocalVariable {
                ty, initializer, ..
            } => {
                f(*ty);
                initializer.iter().for_each(|id| f(*id));
            }
            NodeKind::ExpressionStatement { expression } => f(*expression),
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                f(*condition);
                f(*then_branch);
                else_branch.iter().for_each(|id| f(*id));
            }
            NodeKind::While { condition, body } => {
                f(*condition);
                f(*body);
            }
            NodeKind::DoWhile { body, condition } => {
                f(*body);
                f(*condition);
            }
            NodeKind::For {
                init,
                condition,
                update,
                body,
            } => {
                each(init, &mut f);
                condition.iter().for_each(|id| f(*id));
                each(update, &mut f);
                f(*body);
            }
            NodeKind::ForEach {
                variable,
                iterable,
                body,
            } => {
                f(*variable);
                f(*iterable);
                f(*body);
            }
            NodeKind::Return { value } => value.iter().for_each(|id| f(*id)),
            NodeKind::Throw { value } => f(*value),
            NodeKind::Try {
                body,
                catchers,
                finalizer,
            } => {
                f(*body);
                each(catchers, &mut f);
                finalizer.iter().for_each(|id| f(*id));
            }
            NodeKind::Catch { types, body, .. } => {
                each(types, &mut f);
                f(*body);
            }
            NodeKind::FieldAccess { target, .. } => f(*target),
            NodeKind::Invocation {
                target, arguments, ..
            } => {
                target.iter().for_each(|id| f(*id));
                each(arguments, &mut f);
            }
            NodeKind::New { ty, arguments } => {
                f(*ty);
                each(arguments, &mut f);
            }
            NodeKind::NewArray {
                element,
                dimensions,
                ..
            } => {
                f(*element);
                each(dimensions, &mut f);
            }
            NodeKind::ArrayAccess { target, index } => {
                f(*target);
                f(*index);
            }
            NodeKind::Binary { left, right, .. } => {
                f(*left);
                f(*right);
            }
            NodeKind::Unary { operand, .. } => f(*operand),
            NodeKind::Assignment { target, value, .. } => {
                f(*target);
                f(*value);
            }
            NodeKind::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                f(*condition);
                f(*then_value);
                f(*else_value);
            }
            NodeKind::Cast { ty, expression } => {
                f(*ty);
                f(*expression);
            }
            NodeKind::Break { .. }
            | NodeKind::Continue { .. }
            | NodeKind::Empty
            | NodeKind::Literal(_)
            | NodeKind::Name { .. }
            | NodeKind::This
            | NodeKind::Super => {}
        }
    }

    /// Visit child links mutably, in the same order as [`for_each_child`](Self::for_each_child).
    pub(crate) fn for_each_child_mut(&mut self, mut f: impl FnMut(&mut NodeId)) {
        fn each(ids: &mut [NodeId], f: &mut dyn FnMut(&mut NodeId)) {
            ids.iter_mut().for_each(f);
        }
        match self {
            NodeKind::CompilationUnit { types, .. } => each(types, &mut f),
            NodeKind::Class {
                annotations,
                type_parameters,
                superclass,
                interfaces,
                members,
                ..
            } => {
                each(annotations, &mut f);
                each(type_parameters, &mut f);
                superclass.iter_mut().for_each(&mut f);
                each(interfaces, &mut f);
                each(members, &mut f);
            }
            NodeKind::Interface {
                annotations,
                type_parameters,
                extends,
                members,
                ..
            } => {
                each(annotations, &mut f);
                each(type_parameters, &mut f);
                each(extends, &mut f);
                each(members, &mut f);
            }
            NodeKind::Method {
                annotations,
                type_parameters,
                return_type,
                parameters,
                thrown,
                body,
                ..
            } => {
                each(annotations, &mut f);
                each(type_parameters, &mut f);
                f(return_type);
                each(parameters, &mut f);
                each(thrown, &mut f);
                body.iter_mut().for_each(&mut f);
            }
            NodeKind::Constructor {
                annotations,
                parameters,
                thrown,
                body,
                ..
            } => {
                each(annotations, &mut f);
                each(parameters, &mut f);
                each(thrown, &mut f);
                f(body);
            }
            NodeKind::Field {
                annotations,
                ty,
                initializer,
                ..
            } => {
                each(annotations, &mut f);
                f(ty);
                initializer.iter_mut().for_each(&mut f);
            }
            NodeKind::Parameter {
                annotations, ty, ..
            } => {
                each(annotations, &mut f);
                f(ty);
            }
            NodeKind::Annotation { arguments, .. } => each(arguments, &mut f),
            NodeKind::TypeParameter { bounds, .. } => each(bounds, &mut f),
            NodeKind::TypeReference { arguments, .. } => each(arguments, &mut f),
            NodeKind::WildcardType { bound, .. } => bound.iter_mut().for_each(&mut f),
            NodeKind::Block { statements } => each(statements, &mut f),
            NodeKind::LocalVariable {
                ty, initializer, ..
            } => {
                f(ty);
                initializer.iter_mut().for_each(&mut f);
            }
            NodeKind::ExpressionStatement { expression } => f(expression),
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                f(condition);
                f(then_branch);
                else_branch.iter_mut().for_each(&mut f);
            }
            NodeKind::While { condition, body } => {
                f(condition);
                f(body);
            }
            NodeKind::DoWhile { body, condition } => {
                f(body);
                f(condition);
            }
            NodeKind::For {
                init,
                condition,
                update,
                body,
            } => {
                each(init, &mut f);
                condition.iter_mut().for_each(&mut f);
                each(update, &mut f);
                f(body);
            }
            NodeKind::ForEach {
                variable,
                iterable,
                body,
            } => {
                f(variable);
                f(iterable);
                f(body);
            }
            NodeKind::Return { value } => value.iter_mut().for_each(&mut f),
            NodeKind::Throw { value } => f(value),
            NodeKind::Try {
                body,
                catchers,
                finalizer,
            } => {
                f(body);
                each(catchers, &mut f);
                finalizer.iter_mut().for_each(&mut f);
            }
            NodeKind::Catch { types, body, .. } => {
                each(types, &mut f);
                f(body);
            }
            NodeKind::FieldAccess { target, .. } => f(target),
            NodeKind::Invocation {
                target, arguments, ..
            } => {
                target.iter_mut().for_each(&mut f);
                each(arguments, &mut f);
            }
            NodeKind::New { ty, arguments } => {
                f(ty);
                each(arguments, &mut f);
            }
            NodeKind::NewArray {
                element,
                dimensions,
                ..
            } => {
                f(element);
                each(dimensions, &mut f);
            }
            NodeKind::ArrayAccess { target, index } => {
                f(target);
                f(index);
            }
            NodeKind::Binary { left, right, .. } => {
                f(left);
                f(right);
            }
            NodeKind::Unary { operand, .. } => f(operand),
            NodeKind::Assignment { target, value, .. } => {
                f(target);
                f(value);
            }
            NodeKind::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                f(condition);
                f(then_value);
                f(else_value);
            }
            NodeKind::Cast { ty, expression } => {
                f(ty);
                f(expression);
            }
            NodeKind::Break { .. }
            | NodeKind::Continue { .. }
            | NodeKind::Empty
            | NodeKind::Literal(_)
            | NodeKind::Name { .. }
            | NodeKind::This
            | NodeKind::Super => {}
        }
    }

    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.for_each_child(|id| out.push(id));
        out
    }

    /// Unlink `child` from a list or optional slot.
    pub(crate) fn remove_child(&mut self, child: NodeId) -> RemoveOutcome {
        let removed = match self {
            NodeKind::CompilationUnit { types, .. } => remove_from(types, child),
            NodeKind::Class {
                annotations,
                type_parameters,
                superclass,
                interfaces,
                members,
                ..
            } => {
                remove_from(annotations, child)
                    || remove_from(type_parameters, child)
                    || take_if(superclass, child)
                    || remove_from(interfaces, child)
                    || remove_from(members, child)
            }
            NodeKind::Interface {
                annotations,
                type_parameters,
                extends,
                members,
                ..
            } => {
                remove_from(annotations, child)
                    || remove_from(type_parameters, child)
                    || remove_from(extends, child)
                    || remove_from(members, child)
            }
            NodeKind::Method {
                annotations,
                type_parameters,
                parameters,
                thrown,
                body,
                ..
            } => {
                remove_from(annotations, child)
                    || remove_from(type_parameters, child)
                    || remove_from(parameters, child)
                    || remove_from(thrown, child)
                    || take_if(body, child)
            }
            NodeKind::Constructor {
                annotations,
                parameters,
                thrown,
                ..
            } => {
                remove_from(annotations, child)
                    || remove_from(parameters, child)
                    || remove_from(thrown, child)
            }
            NodeKind::Field {
                annotations,
                initializer,
                ..
            } => remove_from(annotations, child) || take_if(initializer, child),
            NodeKind::Parameter { annotations, .. } => remove_from(annotations, child),
            NodeKind::Annotation { arguments, .. } => remove_from(arguments, child),
            NodeKind::TypeParameter { bounds, .. } => remove_from(bounds, child),
            NodeKind::TypeReference { arguments, .. } => remove_from(arguments, child),
            NodeKind::WildcardType { bound, .. } => take_if(bound, child),
            NodeKind::Block { statements } => remove_from(statements, child),
            NodeKind::LocalVariable { initializer, .. } => take_if(initializer, child),
            NodeKind::If { else_branch, .. } => take_if(else_branch, child),
            NodeKind::For {
                init,
                condition,
                update,
                ..
            } => {
                remove_from(init, child)
                    || take_if(condition, child)
                    || remove_from(update, child)
            }
            NodeKind::Return { value } => take_if(value, child),
            NodeKind::Try {
                catchers,
                finalizer,
                ..
            } => remove_from(catchers, child) || take_if(finalizer, child),
            NodeKind::Catch { types, .. } => types.len() > 1 && remove_from(types, child),
            NodeKind::Invocation {
                target, arguments, ..
            } => take_if(target, child) || remove_from(arguments, child),
            NodeKind::New { arguments, .. } => remove_from(arguments, child),
            _ => false,
        };
        if removed {
            RemoveOutcome::Removed
        } else if self.children().contains(&child) {
            RemoveOutcome::Required
        } else {
            RemoveOutcome::NotFound
        }
    }

    /// Redirect every link to `old` so that it points at `new`.
    pub(crate) fn replace_child(&mut self, old: NodeId, new: NodeId) -> bool {
        let mut found = false;
        self.for_each_child_mut(|id| {
            if *id == old {
                *id = new;
                found = true;
            }
        });
        found
    }

    /// Payload with every child link blanked, for shape comparison.
    pub(crate) fn shape(&self) -> NodeKind {
        let mut shape = self.clone();
        shape.for_each_child_mut(|id| *id = NodeId::PLACEHOLDER);
        shape
    }

    pub(crate) fn simple_name_mut(&mut self) -> Option<&mut String> {
        match self {
            NodeKind::Class { name, .. }
            | NodeKind::Interface { name, .. }
            | NodeKind::Method { name, .. }
            | NodeKind::Constructor { name, .. }
            | NodeKind::Field { name, .. }
            | NodeKind::Parameter { name, .. }
            | NodeKind::Annotation { name, .. }
            | NodeKind::TypeParameter { name, .. }
            | NodeKind::TypeReference { name, .. }
            | NodeKind::LocalVariable { name, .. }
            | NodeKind::Catch { name, .. }
            | NodeKind::Name { name }
            | NodeKind::FieldAccess { name, .. }
            | NodeKind::Invocation { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// One arena slot.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) position: SourcePosition,
    pub(crate) comments: Vec<Comment>,
}

impl NodeData {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn position(&self) -> &SourcePosition {
        &self.position
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_follow_source_order() {
        let kind = NodeKind::If {
            condition: NodeId(1),
            then_branch: NodeId(2),
            else_branch: Some(NodeId(3)),
        };
        assert_eq!(kind.children(), vec![NodeId(1), NodeId(2), NodeId(3)]);
    }

    #[test]
    fn remove_child_distinguishes_required_slots() {
        let mut kind = NodeKind::If {
            condition: NodeId(1),
            then_branch: NodeId(2),
            else_branch: Some(NodeId(3)),
        };
        assert_eq!(kind.remove_child(NodeId(3)), RemoveOutcome::Removed);
        assert_eq!(kind.remove_child(NodeId(1)), RemoveOutcome::Required);
        assert_eq!(kind.remove_child(NodeId(9)), RemoveOutcome::NotFound);
    }

    #[test]
    fn shape_ignores_child_identity() {
        let a = NodeKind::Binary {
            kind: BinaryOperatorKind::Plus,
            left: NodeId(1),
            right: NodeId(2),
        };
        let b = NodeKind::Binary {
            kind: BinaryOperatorKind::Plus,
            left: NodeId(7),
            right: NodeId(8),
        };
        assert_eq!(a.shape(), b.shape());
    }

    #[test]
    fn variant_lookup_is_case_insensitive() {
        assert_eq!(NodeVariant::from_name("method"), Some(NodeVariant::Method));
        assert_eq!(NodeVariant::from_name("BINARY"), Some(NodeVariant::Binary));
        assert_eq!(NodeVariant::from_name("lambda"), None);
    }
}
