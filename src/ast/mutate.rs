//! Node-level edits. Every operation here keeps the arena single-owner:
//! a node gains a parent only while detached, and loses it when unlinked.

use crate::ast::errors::MutationError;
use crate::ast::kinds::{BinaryOperatorKind, Modifiers};
use crate::ast::node::{HasModifiers, NodeId, NodeKind, NodeVariant, RemoveOutcome};
use crate::ast::tree::Ast;
use crate::query::BinaryOperatorFilter;

impl Ast {
    /// Member list of a class or interface; empty for anything else.
    pub fn members(&self, container: NodeId) -> &[NodeId] {
        match self.kind(container) {
            NodeKind::Class { members, .. } | NodeKind::Interface { members, .. } => members,
            _ => &[],
        }
    }

    pub fn set_operator_kind(
        &mut self,
        node: NodeId,
        new_kind: BinaryOperatorKind,
    ) -> Result<(), MutationError> {
        match self.kind_mut(node) {
            NodeKind::Binary { kind, .. } => {
                *kind = new_kind;
                Ok(())
            }
            _ => Err(self.unexpected(node, "Binary")),
        }
    }

    /// Rewrite every `from` operator under `root` to `to`. Returns the
    /// number of nodes changed.
    pub fn replace_operator_kind(
        &mut self,
        root: NodeId,
        from: BinaryOperatorKind,
        to: BinaryOperatorKind,
    ) -> usize {
        let targets: Vec<NodeId> = self.elements(root, BinaryOperatorFilter(from)).collect();
        for node in &targets {
            if let NodeKind::Binary { kind, .. } = self.kind_mut(*node) {
                *kind = to;
            }
        }
        tracing::debug!(count = targets.len(), %from, %to, "replaced binary operators");
        targets.len()
    }

    /// Unlink `node` from its parent. `Ok(false)` when it was already a root.
    pub fn detach(&mut self, node: NodeId) -> Result<bool, MutationError> {
        let Some(parent) = self.parent(node) else {
            return Ok(false);
        };
        match self.kind_mut(parent).remove_child(node) {
            RemoveOutcome::Removed => {
                self.set_parent(node, None);
                Ok(true)
            }
            RemoveOutcome::Required => Err(MutationError::RequiredChild {
                variant: self.variant(node),
                name: self.simple_name(node).map(str::to_string),
                parent: self.variant(parent),
            }),
            RemoveOutcome::NotFound => Err(MutationError::Integrity {
                node,
                message: format!("parent {parent} does not link back"),
            }),
        }
    }

    /// Remove `member` from `container`'s member list.
    ///
    /// Returns `Ok(false)` if the member is already detached, and
    /// [`MutationError::NotAChild`] if it belongs to another node.
    pub fn delete_member(
        &mut self,
        container: NodeId,
        member: NodeId,
    ) -> Result<bool, MutationError> {
        if !self.variant(container).is_type() {
            return Err(self.unexpected(container, "Class or Interface"));
        }
        match self.parent(member) {
            None => Ok(false),
            Some(parent) if parent == container => self.detach(member),
            Some(_) => Err(MutationError::NotAChild {
                child: self.variant(member),
                child_name: self.simple_name(member).map(str::to_string),
                parent: self.variant(container),
                parent_name: self.simple_name(container).map(str::to_string),
            }),
        }
    }

    /// Delete every method of `container` with the given simple name.
    pub fn delete_methods_named(
        &mut self,
        container: NodeId,
        name: &str,
    ) -> Result<usize, MutationError> {
        let doomed: Vec<NodeId> = self
            .members(container)
            .iter()
            .copied()
            .filter(|member| {
                self.variant(*member) == NodeVariant::Method
                    && self.simple_name(*member) == Some(name)
            })
            .collect();
        for member in &doomed {
            self.delete_member(container, *member)?;
        }
        tracing::debug!(count = doomed.len(), name, "deleted methods");
        Ok(doomed.len())
    }

    /// Put detached `new` where `old` sits; `old` becomes detached.
    pub fn replace_node(&mut self, old: NodeId, new: NodeId) -> Result<(), MutationError> {
        if !self.is_detached(new) {
            return Err(self.already_attached(new));
        }
        let Some(parent) = self.parent(old) else {
            return Ok(());
        };
        if self.is_within(parent, new) {
            return Err(self.cycle(new, parent));
        }
        if !self.kind_mut(parent).replace_child(old, new) {
            return Err(MutationError::Integrity {
                node: old,
                message: format!("parent {parent} does not link back"),
            });
        }
        self.set_parent(new, Some(parent));
        self.set_parent(old, None);
        Ok(())
    }

    /// Swap the body of a method or constructor for `block`. The previous
    /// body, if any, is detached and returned.
    pub fn replace_body(
        &mut self,
        method: NodeId,
        block: NodeId,
    ) -> Result<Option<NodeId>, MutationError> {
        if self.variant(block) != NodeVariant::Block {
            return Err(self.unexpected(block, "Block"));
        }
        if !self.is_detached(block) {
            return Err(self.already_attached(block));
        }
        let current = match self.kind(method) {
            NodeKind::Method { body, .. } => *body,
            NodeKind::Constructor { body, .. } => Some(*body),
            _ => return Err(self.unexpected(method, "Method or Constructor")),
        };
        match current {
            Some(old) => {
                self.replace_node(old, block)?;
                Ok(Some(old))
            }
            None => {
                if let NodeKind::Method { body, .. } = self.kind_mut(method) {
                    *body = Some(block);
                }
                self.set_parent(block, Some(method));
                Ok(None)
            }
        }
    }

    /// Append a detached field or method to a class or interface.
    pub fn add_member(&mut self, container: NodeId, member: NodeId) -> Result<(), MutationError> {
        let variant = self.variant(member);
        if !matches!(variant, NodeVariant::Field | NodeVariant::Method) {
            return Err(MutationError::UnsupportedMemberKind {
                variant,
                name: self.simple_name(member).map(str::to_string),
            });
        }
        if !self.is_detached(member) {
            return Err(self.already_attached(member));
        }
        if self.is_within(container, member) {
            return Err(self.cycle(member, container));
        }
        match self.kind_mut(container) {
            NodeKind::Class { members, .. } | NodeKind::Interface { members, .. } => {
                members.push(member)
            }
            _ => return Err(self.unexpected(container, "Class or Interface")),
        }
        self.set_parent(member, Some(container));
        Ok(())
    }

    /// Whether `node` is `ancestor` or lies below it.
    pub fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|up| up == ancestor)
    }

    fn cycle(&self, node: NodeId, target: NodeId) -> MutationError {
        MutationError::Integrity {
            node,
            message: format!(
                "grafting {} under its own descendant {}",
                self.variant(node),
                self.variant(target)
            ),
        }
    }

    pub fn set_simple_name(&mut self, node: NodeId, name: &str) -> Result<(), MutationError> {
        match self.kind_mut(node).simple_name_mut() {
            Some(slot) => {
                *slot = name.to_string();
                Ok(())
            }
            None => Err(self.unexpected(node, "named node")),
        }
    }

    pub fn set_modifiers(&mut self, node: NodeId, modifiers: Modifiers) -> Result<(), MutationError> {
        match self.kind_mut(node).modifiers_mut() {
            Some(slot) => {
                *slot = modifiers;
                Ok(())
            }
            None => Err(self.unexpected(node, "declaration with modifiers")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::kinds::{modifiers_from, ModifierKind};
    use crate::syntax::parse_source;

    const SOURCE: &str = r#"
package demo;

public class Foo1 implements IFoo {
    public int m() {
        return 3 + 2;
    }

    void b() {
    }

    void b(int x) {
        x = x + 1;
    }
}
"#;

    fn parsed() -> (Ast, NodeId, NodeId) {
        let mut ast = Ast::new();
        let unit = parse_source(&mut ast, "Foo1.java", SOURCE).unwrap();
        let class = ast.find_named(unit, NodeVariant::Class, "Foo1").unwrap();
        (ast, unit, class)
    }

    #[test]
    fn operator_sweep_changes_every_match() {
        let (mut ast, unit, _) = parsed();
        assert_eq!(
            ast.replace_operator_kind(unit, BinaryOperatorKind::Plus, BinaryOperatorKind::Minus),
            2
        );
        assert_eq!(
            ast.elements(unit, BinaryOperatorFilter(BinaryOperatorKind::Plus))
                .count(),
            0
        );
        ast.check_integrity(unit).unwrap();
    }

    #[test]
    fn set_operator_kind_rejects_non_binary() {
        let (mut ast, _, class) = parsed();
        let err = ast
            .set_operator_kind(class, BinaryOperatorKind::Minus)
            .unwrap_err();
        assert!(err.to_string().contains("Class 'Foo1'"));
    }

    #[test]
    fn delete_methods_named_removes_overloads() {
        let (mut ast, unit, class) = parsed();
        assert_eq!(ast.delete_methods_named(class, "b").unwrap(), 2);
        assert!(ast.find_named(unit, NodeVariant::Method, "b").is_none());
        assert_eq!(ast.members(class).len(), 1);
        ast.check_integrity(unit).unwrap();
    }

    #[test]
    fn delete_member_twice_reports_false() {
        let (mut ast, _, class) = parsed();
        let m = ast.members(class)[0];
        assert!(ast.delete_member(class, m).unwrap());
        assert!(!ast.delete_member(class, m).unwrap());
        assert!(ast.is_detached(m));
    }

    #[test]
    fn delete_member_of_other_container_is_rejected() {
        let (mut ast, unit, class) = parsed();
        let other = ast
            .push_empty_class(unit)
            .unwrap();
        let m = ast.members(class)[0];
        let err = ast.delete_member(other, m).unwrap_err();
        assert!(matches!(err, MutationError::NotAChild { .. }));
    }

    #[test]
    fn add_member_requires_detached_field_or_method() {
        let (mut ast, _, class) = parsed();
        let m = ast.members(class)[0];
        let err = ast.add_member(class, m).unwrap_err();
        assert!(matches!(err, MutationError::AlreadyAttached { .. }));

        let copy = ast.clone_subtree(m);
        ast.set_simple_name(copy, "m2").unwrap();
        ast.add_member(class, copy).unwrap();
        assert_eq!(ast.members(class).len(), 4);

        let body = ast.get_body(copy);
        let detached_body = ast.clone_subtree(body);
        let err = ast.add_member(class, detached_body).unwrap_err();
        assert_eq!(
            err,
            MutationError::UnsupportedMemberKind {
                variant: NodeVariant::Block,
                name: None,
            }
        );
    }

    #[test]
    fn replace_body_returns_detached_old_block() {
        let (mut ast, unit, class) = parsed();
        let m = ast.members(class)[0];
        let old = ast.get_body(m);
        let replacement = ast.create(NodeKind::Block { statements: vec![] }).unwrap();
        assert_eq!(ast.replace_body(m, replacement).unwrap(), Some(old));
        assert!(ast.is_detached(old));
        assert_eq!(ast.parent(replacement), Some(m));
        ast.check_integrity(unit).unwrap();
    }

    #[test]
    fn detach_refuses_required_slots() {
        let (mut ast, _, class) = parsed();
        let m = ast.members(class)[0];
        let return_type = ast.children(m)[0];
        assert!(matches!(
            ast.detach(return_type),
            Err(MutationError::RequiredChild { .. })
        ));
    }

    #[test]
    fn set_modifiers_replaces_the_set() {
        let (mut ast, _, class) = parsed();
        let m = ast.members(class)[0];
        ast.set_modifiers(m, modifiers_from(["private", "static"])).unwrap();
        let mods = ast.kind(m).modifiers().unwrap();
        assert!(mods.contains(&ModifierKind::Private));
        assert!(!mods.contains(&ModifierKind::Public));
    }

    #[test]
    fn mutating_a_clone_leaves_the_original_alone() {
        let (mut ast, unit, class) = parsed();
        let m = ast.members(class)[0];
        let original_sum = ast
            .elements(m, BinaryOperatorFilter(BinaryOperatorKind::Plus))
            .next()
            .unwrap();

        let copy = ast.clone_subtree(m);
        assert!(ast.structurally_equal(m, &ast, copy));
        ast.set_simple_name(copy, "m2").unwrap();
        ast.set_modifiers(copy, modifiers_from(["private", "static"]))
            .unwrap();
        assert_eq!(
            ast.replace_operator_kind(copy, BinaryOperatorKind::Plus, BinaryOperatorKind::Mul),
            1
        );

        assert_eq!(ast.simple_name(m), Some("m"));
        assert_eq!(
            ast.kind(m).modifiers().unwrap(),
            &modifiers_from(["public"])
        );
        assert!(matches!(
            ast.kind(original_sum),
            NodeKind::Binary {
                kind: BinaryOperatorKind::Plus,
                ..
            }
        ));
        assert!(!ast.structurally_equal(m, &ast, copy));
        assert_eq!(ast.parent(original_sum).and_then(|p| ast.parent(p)).and_then(|p| ast.parent(p)), Some(m));
        assert!(ast.is_detached(copy));
        ast.check_integrity(unit).unwrap();
        ast.check_integrity(copy).unwrap();
    }

    impl Ast {
        fn get_body(&self, method: NodeId) -> NodeId {
            use crate::ast::HasBody;
            self.kind(method).body().unwrap()
        }

        fn push_empty_class(&mut self, unit: NodeId) -> Option<NodeId> {
            let class = self
                .create(NodeKind::Class {
                    name: "Other".into(),
                    modifiers: Modifiers::new(),
                    annotations: vec![],
                    type_parameters: vec![],
                    superclass: None,
                    interfaces: vec![],
                    members: vec![],
                })
                .ok()?;
            if let NodeKind::CompilationUnit { types, .. } = self.kind_mut(unit) {
                types.push(class);
            }
            self.set_parent(class, Some(unit));
            Some(class)
        }
    }
}
