//! Structural queries over an [`Ast`].
//!
//! Traversal is pre-order, starts at (and includes) the given root, and is
//! lazy: the tree is walked only as far as the caller pulls.
//!
//! ```ignore
//! let adds = ast.elements(unit, BinaryOperatorFilter(BinaryOperatorKind::Plus)).count();
//! let m = query::expect_first(&ast, unit, NodeVariant::Method, "m")?;
//! ```

mod errors;

pub use errors::QueryError;

use crate::ast::{Ast, BinaryOperatorKind, NodeId, NodeKind, NodeVariant};

/// Predicate over nodes.
pub trait Filter {
    fn matches(&self, ast: &Ast, node: NodeId) -> bool;
}

impl<F> Filter for F
where
    F: Fn(&Ast, NodeId) -> bool,
{
    fn matches(&self, ast: &Ast, node: NodeId) -> bool {
        self(ast, node)
    }
}

/// Matches every node of one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeFilter(pub NodeVariant);

impl Filter for TypeFilter {
    fn matches(&self, ast: &Ast, node: NodeId) -> bool {
        ast.variant(node) == self.0
    }
}

/// Matches nodes of one variant carrying an exact simple name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedElementFilter {
    pub variant: NodeVariant,
    pub name: String,
}

impl NamedElementFilter {
    pub fn new(variant: NodeVariant, name: impl Into<String>) -> Self {
        Self {
            variant,
            name: name.into(),
        }
    }
}

impl Filter for NamedElementFilter {
    fn matches(&self, ast: &Ast, node: NodeId) -> bool {
        ast.variant(node) == self.variant && ast.simple_name(node) == Some(self.name.as_str())
    }
}

/// Matches binary operator nodes of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryOperatorFilter(pub BinaryOperatorKind);

impl Filter for BinaryOperatorFilter {
    fn matches(&self, ast: &Ast, node: NodeId) -> bool {
        matches!(ast.kind(node), NodeKind::Binary { kind, .. } if *kind == self.0)
    }
}

/// Lazy pre-order iterator returned by [`Ast::elements`].
#[derive(Clone)]
pub struct Elements<'a, F> {
    ast: &'a Ast,
    filter: F,
    pending: Vec<NodeId>,
}

impl<F: Filter> Iterator for Elements<'_, F> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(node) = self.pending.pop() {
            let children = self.ast.children(node);
            self.pending.extend(children.into_iter().rev());
            if self.filter.matches(self.ast, node) {
                return Some(node);
            }
        }
        None
    }
}

impl Ast {
    pub fn elements<F: Filter>(&self, root: NodeId, filter: F) -> Elements<'_, F> {
        Elements {
            ast: self,
            filter,
            pending: vec![root],
        }
    }

    /// First pre-order node of `variant` named `name`.
    pub fn find_named(&self, root: NodeId, variant: NodeVariant, name: &str) -> Option<NodeId> {
        self.elements(root, NamedElementFilter::new(variant, name)).next()
    }
}

/// Like [`Ast::find_named`], but a miss is an error naming the closest
/// existing element of the same variant.
pub fn expect_first(
    ast: &Ast,
    root: NodeId,
    variant: NodeVariant,
    name: &str,
) -> Result<NodeId, QueryError> {
    ast.find_named(root, variant, name)
        .ok_or_else(|| QueryError::ElementNotFound {
            variant,
            name: name.to_string(),
            suggestion: suggest(ast, root, variant, name),
        })
}

/// Closest simple name among nodes of `variant`, if any is reasonably close.
pub fn suggest(ast: &Ast, root: NodeId, variant: NodeVariant, name: &str) -> Option<String> {
    ast.elements(root, TypeFilter(variant))
        .filter_map(|node| ast.simple_name(node))
        .map(|candidate| (strsim::jaro_winkler(name, candidate), candidate))
        .filter(|(score, _)| *score >= 0.8)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_source;

    const SOURCE: &str = r#"
package demo;

public class Calc {
    int total;

    int add(int a, int b) {
        return a + b + 1;
    }

    int sub(int a, int b) {
        return a - b;
    }
}
"#;

    #[test]
    fn elements_visit_root_first_in_preorder() {
        let mut ast = Ast::new();
        let unit = parse_source(&mut ast, "Calc.java", SOURCE).unwrap();
        let all: Vec<_> = ast.elements(unit, |_: &Ast, _: NodeId| true).collect();
        assert_eq!(all[0], unit);
        assert_eq!(ast.variant(all[1]), NodeVariant::Class);
    }

    #[test]
    fn binary_filter_counts_every_plus() {
        let mut ast = Ast::new();
        let unit = parse_source(&mut ast, "Calc.java", SOURCE).unwrap();
        let plus = ast
            .elements(unit, BinaryOperatorFilter(BinaryOperatorKind::Plus))
            .count();
        assert_eq!(plus, 2);
    }

    #[test]
    fn named_filter_narrows_to_first_match() {
        let mut ast = Ast::new();
        let unit = parse_source(&mut ast, "Calc.java", SOURCE).unwrap();
        let sub = ast.find_named(unit, NodeVariant::Method, "sub").unwrap();
        assert_eq!(ast.simple_name(sub), Some("sub"));
        assert!(ast.find_named(unit, NodeVariant::Field, "sub").is_none());
    }

    #[test]
    fn missing_element_suggests_close_name() {
        let mut ast = Ast::new();
        let unit = parse_source(&mut ast, "Calc.java", SOURCE).unwrap();
        let err = expect_first(&ast, unit, NodeVariant::Method, "ad").unwrap_err();
        assert_eq!(
            err,
            QueryError::ElementNotFound {
                variant: NodeVariant::Method,
                name: "ad".into(),
                suggestion: Some("add".into()),
            }
        );
        assert!(err.to_string().contains("did you mean 'add'"));
    }

    #[test]
    fn elements_iterator_is_restartable() {
        let mut ast = Ast::new();
        let unit = parse_source(&mut ast, "Calc.java", SOURCE).unwrap();
        let methods = ast.elements(unit, TypeFilter(NodeVariant::Method));
        assert_eq!(methods.clone().count(), 2);
        assert_eq!(methods.count(), 2);
    }
}
