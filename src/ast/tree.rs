//! The node arena.

use crate::ast::errors::MutationError;
use crate::ast::kinds::Comment;
use crate::ast::node::{Named, NodeData, NodeId, NodeKind, NodeVariant, SourcePosition};
use std::collections::{HashMap, HashSet};

/// Arena owning every node of one or more compilation units.
///
/// Node handles stay valid for the lifetime of the arena; detached nodes are
/// never reclaimed, they simply become unreachable from any root.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<NodeData>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a node and adopt its children. Callers guarantee the
    /// children are detached.
    pub(crate) fn alloc(
        &mut self,
        kind: NodeKind,
        position: SourcePosition,
        comments: Vec<Comment>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        kind.for_each_child(|child| self.nodes[child.index()].parent = Some(id));
        self.nodes.push(NodeData {
            kind,
            parent: None,
            position,
            comments,
        });
        id
    }

    /// Build a synthetic node from detached children.
    pub fn create(&mut self, kind: NodeKind) -> Result<NodeId, MutationError> {
        let mut seen = HashSet::new();
        for child in kind.children() {
            if child.index() >= self.nodes.len() {
                return Err(MutationError::Integrity {
                    node: child,
                    message: "handle does not belong to this arena".into(),
                });
            }
            if !self.is_detached(child) || !seen.insert(child) {
                return Err(self.already_attached(child));
            }
        }
        Ok(self.alloc(kind, SourcePosition::Synthetic, Vec::new()))
    }

    pub fn get(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub(crate) fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    pub fn variant(&self, id: NodeId) -> NodeVariant {
        self.kind(id).variant()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub(crate) fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.nodes[id.index()].parent = parent;
    }

    pub fn position(&self, id: NodeId) -> &SourcePosition {
        &self.nodes[id.index()].position
    }

    pub fn comments(&self, id: NodeId) -> &[Comment] {
        &self.nodes[id.index()].comments
    }

    pub fn add_comment(&mut self, id: NodeId, comment: Comment) {
        self.nodes[id.index()].comments.push(comment);
    }

    pub fn clear_comments(&mut self, id: NodeId) {
        self.nodes[id.index()].comments.clear();
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    pub fn is_detached(&self, id: NodeId) -> bool {
        self.parent(id).is_none()
    }

    pub fn simple_name(&self, id: NodeId) -> Option<&str> {
        self.kind(id).simple_name()
    }

    /// Parent chain, nearest first. Does not include `id`.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    pub fn compilation_unit_of(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|node| self.variant(*node) == NodeVariant::CompilationUnit)
    }

    /// Nearest class or interface strictly above `id`.
    pub fn enclosing_type(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).find(|node| self.variant(*node).is_type())
    }

    pub fn package_of(&self, id: NodeId) -> Option<&str> {
        match self.kind(self.compilation_unit_of(id)?) {
            NodeKind::CompilationUnit { package, .. } => package.as_deref(),
            _ => None,
        }
    }

    /// `pkg.Outer.Inner` for a class or interface node.
    pub fn qualified_name(&self, id: NodeId) -> Option<String> {
        if !self.variant(id).is_type() {
            return None;
        }
        let mut segments: Vec<&str> = std::iter::once(id)
            .chain(self.ancestors(id))
            .filter(|node| self.variant(*node).is_type())
            .filter_map(|node| self.simple_name(node))
            .collect();
        if let Some(package) = self.package_of(id) {
            segments.push(package);
        }
        segments.reverse();
        Some(segments.join("."))
    }

    /// Deep copy of `id`'s subtree within this arena. The copy is detached
    /// and every node in it has a synthetic position.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let snapshot = snapshot(self, id);
        self.materialize(snapshot, id)
    }

    /// Deep copy of a subtree owned by another arena.
    pub fn import(&mut self, source: &Ast, id: NodeId) -> NodeId {
        let snapshot = snapshot(source, id);
        self.materialize(snapshot, id)
    }

    fn materialize(&mut self, snapshot: Vec<(NodeId, NodeKind, Vec<Comment>)>, root: NodeId) -> NodeId {
        let mut remap: HashMap<NodeId, NodeId> = HashMap::with_capacity(snapshot.len());
        for (original, mut kind, comments) in snapshot {
            kind.for_each_child_mut(|child| {
                if let Some(copy) = remap.get(&*child) {
                    *child = *copy;
                }
            });
            let copy = self.alloc(kind, SourcePosition::Synthetic, comments);
            remap.insert(original, copy);
        }
        remap[&root]
    }

    /// Compare two subtrees by shape and payload, ignoring positions,
    /// comments and node identity.
    pub fn structurally_equal(&self, a: NodeId, other: &Ast, b: NodeId) -> bool {
        let mut pending = vec![(a, b)];
        while let Some((left, right)) = pending.pop() {
            let (left_kind, right_kind) = (self.kind(left), other.kind(right));
            if left_kind.shape() != right_kind.shape() {
                return false;
            }
            let (left_children, right_children) = (left_kind.children(), right_kind.children());
            if left_children.len() != right_children.len() {
                return false;
            }
            pending.extend(left_children.into_iter().zip(right_children));
        }
        true
    }

    /// Verify that every node under `root` is owned exactly once and that
    /// its parent link points back at its owner.
    pub fn check_integrity(&self, root: NodeId) -> Result<(), MutationError> {
        let mut seen = HashSet::new();
        let mut pending = vec![root];
        seen.insert(root);
        while let Some(node) = pending.pop() {
            for child in self.children(node) {
                if !seen.insert(child) {
                    return Err(MutationError::Integrity {
                        node: child,
                        message: format!("{} is reachable twice", self.variant(child)),
                    });
                }
                if self.parent(child) != Some(node) {
                    return Err(MutationError::Integrity {
                        node: child,
                        message: format!(
                            "{} under {} {node} records parent {:?}",
                            self.variant(child),
                            self.variant(node),
                            self.parent(child)
                        ),
                    });
                }
                pending.push(child);
            }
        }
        Ok(())
    }

    pub(crate) fn already_attached(&self, id: NodeId) -> MutationError {
        MutationError::AlreadyAttached {
            variant: self.variant(id),
            name: self.simple_name(id).map(str::to_string),
        }
    }

    pub(crate) fn unexpected(&self, id: NodeId, expected: &'static str) -> MutationError {
        MutationError::UnexpectedVariant {
            expected,
            found: self.variant(id),
            name: self.simple_name(id).map(str::to_string),
        }
    }
}

/// Post-order copy of the kinds under `root`, children before parents.
fn snapshot(source: &Ast, root: NodeId) -> Vec<(NodeId, NodeKind, Vec<Comment>)> {
    let mut out = Vec::new();
    let mut stack = vec![(root, false)];
    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            let data = source.get(id);
            out.push((id, data.kind.clone(), data.comments.clone()));
            continue;
        }
        stack.push((id, true));
        for child in source.children(id).into_iter().rev() {
            stack.push((child, false));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::kinds::{BinaryOperatorKind, Literal};

    fn sum(ast: &mut Ast, a: i32, b: i32) -> NodeId {
        let left = ast.create(NodeKind::Literal(Literal::Int(a))).unwrap();
        let right = ast.create(NodeKind::Literal(Literal::Int(b))).unwrap();
        ast.create(NodeKind::Binary {
            kind: BinaryOperatorKind::Plus,
            left,
            right,
        })
        .unwrap()
    }

    #[test]
    fn create_adopts_children() {
        let mut ast = Ast::new();
        let root = sum(&mut ast, 3, 2);
        for child in ast.children(root) {
            assert_eq!(ast.parent(child), Some(root));
        }
        assert!(ast.is_detached(root));
        ast.check_integrity(root).unwrap();
    }

    #[test]
    fn create_rejects_attached_children() {
        let mut ast = Ast::new();
        let root = sum(&mut ast, 1, 1);
        let left = ast.children(root)[0];
        let err = ast
            .create(NodeKind::Return { value: Some(left) })
            .unwrap_err();
        assert!(matches!(err, MutationError::AlreadyAttached { .. }));
    }

    #[test]
    fn clone_is_detached_synthetic_and_equal() {
        let mut ast = Ast::new();
        let root = sum(&mut ast, 3, 2);
        ast.add_comment(root, Comment::line(" sum"));
        let copy = ast.clone_subtree(root);
        assert_ne!(copy, root);
        assert!(ast.is_detached(copy));
        assert!(!ast.position(copy).is_real());
        assert_eq!(ast.comments(copy), ast.comments(root));
        assert!(ast.structurally_equal(root, &ast, copy));
        ast.check_integrity(copy).unwrap();
    }

    #[test]
    fn import_copies_across_arenas() {
        let mut source = Ast::new();
        let root = sum(&mut source, 4, 5);
        let mut target = Ast::new();
        let copy = target.import(&source, root);
        assert_eq!(target.len(), 3);
        assert!(target.structurally_equal(copy, &source, root));
    }

    #[test]
    fn structural_equality_sees_payload_changes() {
        let mut ast = Ast::new();
        let a = sum(&mut ast, 3, 2);
        let b = sum(&mut ast, 3, 4);
        assert!(!ast.structurally_equal(a, &ast, b));
    }

    #[test]
    fn integrity_check_reports_broken_parent_links() {
        let mut ast = Ast::new();
        let root = sum(&mut ast, 1, 2);
        let left = ast.children(root)[0];
        ast.set_parent(left, None);
        assert!(ast.check_integrity(root).is_err());
    }
}
