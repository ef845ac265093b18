use crate::sg::errors::AstGrepError;
use crate::sg::java;
use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_core::{AstGrep, Node, NodeMatch, Pattern};
use ast_grep_language::SupportLang;
use std::collections::HashMap;

/// A match from an ast-grep pattern with captured metavariables.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    pub byte_start: usize,
    pub byte_end: usize,
    /// 1-based line of `byte_start`.
    pub line: usize,
    pub text: String,
    /// Captured metavariables: name -> text
    pub captures: HashMap<String, String>,
}

impl PatternMatch {
    /// Byte span of a capture, found as the first occurrence of the captured
    /// text inside the match.
    pub fn find_capture_span(&self, name: &str) -> Option<(usize, usize)> {
        let capture_text = self.captures.get(name)?;
        let offset = self.text.find(capture_text.as_str())?;
        let start = self.byte_start + offset;
        Some((start, start + capture_text.len()))
    }
}

/// Structural matcher over one Java source text.
///
/// # Metavariable Syntax
///
/// - `$NAME` - Matches a single node and captures it
/// - `$$$NAME` - Matches zero or more nodes (variadic)
/// - `$_` - Matches any single node (anonymous)
///
/// # Example Patterns
///
/// ```text
/// $A + $B                          // any addition
/// System.out.println($MSG)         // console output
/// new $TYPE($$$ARGS)               // instance creation
/// ```
pub struct PatternMatcher {
    source: String,
    sg: AstGrep<StrDoc<SupportLang>>,
}

impl PatternMatcher {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            sg: AstGrep::new(source, java()),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn compile(pattern: &str) -> Result<Pattern, AstGrepError> {
        Pattern::try_new(pattern, java()).map_err(|e| AstGrepError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
    }

    /// Find all matches for a pattern, in source order.
    pub fn find_all(&self, pattern: &str) -> Result<Vec<PatternMatch>, AstGrepError> {
        let pat = Self::compile(pattern)?;
        let results = self
            .sg
            .root()
            .find_all(&pat)
            .map(|m| self.node_match_to_pattern_match(m))
            .collect();
        Ok(results)
    }

    /// Find exactly one match for a pattern.
    pub fn find_unique(&self, pattern: &str) -> Result<PatternMatch, AstGrepError> {
        let mut matches = self.find_all(pattern)?;
        match matches.len() {
            0 => Err(AstGrepError::NoMatch),
            1 => matches.pop().ok_or(AstGrepError::NoMatch),
            n => Err(AstGrepError::AmbiguousMatch { count: n }),
        }
    }

    pub fn has_match(&self, pattern: &str) -> Result<bool, AstGrepError> {
        let pat = Self::compile(pattern)?;
        Ok(self.sg.root().find(&pat).is_some())
    }

    /// Matches lying entirely inside `start..end`.
    pub fn find_in_range(
        &self,
        pattern: &str,
        start: usize,
        end: usize,
    ) -> Result<Vec<PatternMatch>, AstGrepError> {
        Ok(self
            .find_all(pattern)?
            .into_iter()
            .filter(|m| m.byte_start >= start && m.byte_end <= end)
            .collect())
    }

    /// Matches inside any method declaration named `method_name`. Every
    /// overload is searched.
    pub fn find_in_method(
        &self,
        pattern: &str,
        method_name: &str,
    ) -> Result<Vec<PatternMatch>, AstGrepError> {
        let methods: Vec<(usize, usize)> = self
            .sg
            .root()
            .dfs()
            .filter(|node| node.kind() == "method_declaration")
            .filter(|node| {
                node.field("name")
                    .is_some_and(|name| name.text() == method_name)
            })
            .map(|node| {
                let range = node.range();
                (range.start, range.end)
            })
            .collect();
        if methods.is_empty() {
            return Err(AstGrepError::MethodNotFound {
                name: method_name.to_string(),
            });
        }

        let mut results = Vec::new();
        for (start, end) in methods {
            results.extend(self.find_in_range(pattern, start, end)?);
        }
        Ok(results)
    }

    /// All nodes of a tree-sitter kind, optionally keeping only those whose
    /// `field` contains a match for a pattern.
    ///
    /// Useful for constructs that are not valid standalone snippets, such as
    /// a `catch_clause` or a `switch_label`.
    pub fn find_by_kind_with_field(
        &self,
        kind: &str,
        field_filter: Option<(&str, &str)>,
    ) -> Result<Vec<PatternMatch>, AstGrepError> {
        let filter = match field_filter {
            Some((field, pattern)) => Some((field, Self::compile(pattern)?)),
            None => None,
        };

        let mut results = Vec::new();
        for node in self.sg.root().dfs() {
            if node.kind() != kind {
                continue;
            }
            if let Some((field_name, pat)) = &filter {
                let Some(field) = node.field(field_name) else {
                    continue;
                };
                if field.find(pat).is_none() {
                    continue;
                }
            }
            results.push(self.node_to_pattern_match(&node, HashMap::new()));
        }
        Ok(results)
    }

    fn node_to_pattern_match(
        &self,
        node: &Node<StrDoc<SupportLang>>,
        captures: HashMap<String, String>,
    ) -> PatternMatch {
        let range = node.range();
        PatternMatch {
            byte_start: range.start,
            byte_end: range.end,
            line: self.source[..range.start].matches('\n').count() + 1,
            text: self.source[range.start..range.end].to_string(),
            captures,
        }
    }

    fn node_match_to_pattern_match(&self, m: NodeMatch<StrDoc<SupportLang>>) -> PatternMatch {
        let captures: HashMap<String, String> = m.get_env().clone().into();
        self.node_to_pattern_match(m.get_node(), captures)
    }
}
