//! Recursive-descent parser producing arena nodes.
//!
//! Local declarations and casts are told apart from expressions by a
//! non-consuming scan over the token stream ([`Parser::scan_type`]), so the
//! parser itself never rewinds. Binary expressions use precedence climbing
//! over [`BinaryOperatorKind::precedence`].

use crate::ast::{
    Ast, BinaryOperatorKind, Comment, Import, Literal, ModifierKind, Modifiers, NodeId, NodeKind,
    NodeVariant, SourcePosition, UnaryOperatorKind,
};
use crate::syntax::errors::ParseError;
use crate::syntax::lexer::{tokenize, unescape, Token, TokenKind, PRIMITIVES};
use std::sync::Arc;

/// Maximum nesting of statements, expressions and types.
const MAX_DEPTH: usize = 256;

type PResult<T> = Result<T, ParseError>;

pub(crate) struct Parser<'a> {
    ast: &'a mut Ast,
    file: Arc<str>,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    /// Names of the enclosing type declarations, innermost last.
    type_names: Vec<String>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(ast: &'a mut Ast, file: &str, text: &str) -> PResult<Self> {
        let tokens = tokenize(file, text)?;
        Ok(Self {
            ast,
            file: Arc::from(file),
            tokens,
            pos: 0,
            depth: 0,
            type_names: Vec::new(),
        })
    }

    pub(crate) fn finish(&self) -> PResult<()> {
        if self.at_eof() {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    // ---- token helpers ----

    fn token_at(&self, index: usize) -> &Token {
        &self.tokens[index.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        self.token_at(self.pos)
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        self.token_at(self.pos + ahead)
    }

    fn at(&self, text: &str) -> bool {
        self.peek().is(text)
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn at_identifier(&self, word: &str) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Identifier && token.text == word
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.at(text) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> PResult<Token> {
        if self.at(text) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{text}'")))
        }
    }

    fn expect_identifier(&mut self) -> PResult<String> {
        if self.peek().kind == TokenKind::Identifier {
            Ok(self.advance().text)
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    fn qualified_name(&mut self) -> PResult<String> {
        let mut name = self.expect_identifier()?;
        while self.at(".") && self.peek_at(1).kind == TokenKind::Identifier {
            self.advance();
            name.push('.');
            name.push_str(&self.advance().text);
        }
        Ok(name)
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> ParseError {
        ParseError::new(&self.file, token.line, token.column, token.start, message)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        self.error_at(self.peek(), message)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        let found = match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", token.text),
        };
        self.error(format!("expected {expected}, found {found}"))
    }

    fn unsupported(&self, what: &str) -> ParseError {
        self.error(format!("{what} are not supported"))
    }

    fn take_comments(&mut self) -> Vec<Comment> {
        let index = self.pos.min(self.tokens.len() - 1);
        std::mem::take(&mut self.tokens[index].comments)
    }

    fn position(&self, start: usize) -> SourcePosition {
        let first = self.token_at(start);
        let end = if self.pos > start {
            self.token_at(self.pos - 1).end
        } else {
            first.end
        };
        SourcePosition::Real {
            file: Arc::clone(&self.file),
            line: first.line,
            column: first.column,
            start: first.start,
            end,
        }
    }

    fn node(&mut self, start: usize, kind: NodeKind) -> NodeId {
        self.node_with_comments(start, kind, Vec::new())
    }

    fn node_with_comments(&mut self, start: usize, kind: NodeKind, comments: Vec<Comment>) -> NodeId {
        let position = self.position(start);
        self.ast.alloc(kind, position, comments)
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {MAX_DEPTH} levels")));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Consume one `>`, splitting `>>`, `>>>`, `>=` and friends in place.
    fn close_angle(&mut self) -> PResult<()> {
        let token = self.peek();
        if token.kind == TokenKind::Operator && token.text.len() > 1 && token.text.starts_with('>') {
            let mut rest = token.clone();
            rest.text.remove(0);
            rest.start += 1;
            rest.column += 1;
            rest.comments.clear();
            let head = &mut self.tokens[self.pos];
            head.text.truncate(1);
            head.end = head.start + 1;
            self.tokens.insert(self.pos + 1, rest);
        }
        self.expect(">").map(|_| ())
    }

    // ---- lookahead ----

    fn is_primitive(token: &Token) -> bool {
        token.kind == TokenKind::Keyword && PRIMITIVES.contains(&token.text.as_str())
    }

    /// Index just past a type starting at `index`, without consuming.
    fn scan_type(&self, mut index: usize) -> Option<usize> {
        let token = self.token_at(index);
        if Self::is_primitive(token) {
            index += 1;
        } else if token.kind == TokenKind::Identifier {
            index += 1;
            while self.token_at(index).is(".")
                && self.token_at(index + 1).kind == TokenKind::Identifier
            {
                index += 2;
            }
            if self.token_at(index).is("<") {
                index = self.scan_type_arguments(index)?;
            }
        } else {
            return None;
        }
        while self.token_at(index).is("[") && self.token_at(index + 1).is("]") {
            index += 2;
        }
        Some(index)
    }

    fn scan_type_arguments(&self, mut index: usize) -> Option<usize> {
        let mut depth: i32 = 0;
        loop {
            let token = self.token_at(index);
            match token.kind {
                TokenKind::Identifier => {}
                TokenKind::Keyword
                    if Self::is_primitive(token) || token.text == "extends" || token.text == "super" => {}
                TokenKind::Operator => match token.text.as_str() {
                    "<" => depth += 1,
                    ">" => depth -= 1,
                    ">>" => depth -= 2,
                    ">>>" => depth -= 3,
                    "," | "." | "?" | "[" | "]" | "&" => {}
                    _ => return None,
                },
                _ => return None,
            }
            index += 1;
            match depth {
                0 => return Some(index),
                d if d < 0 => return None,
                _ => {}
            }
        }
    }

    fn is_local_declaration(&self) -> bool {
        if self.at("final") || self.at("@") {
            return true;
        }
        match self.scan_type(self.pos) {
            Some(after) => {
                self.token_at(after).kind == TokenKind::Identifier
                    && ["=", ";", ",", "["]
                        .iter()
                        .any(|text| self.token_at(after + 1).is(text))
            }
            None => false,
        }
    }

    fn is_for_each_header(&self) -> bool {
        let mut index = self.pos;
        while self.token_at(index).is("final") {
            index += 1;
        }
        match self.scan_type(index) {
            Some(after) => {
                self.token_at(after).kind == TokenKind::Identifier
                    && self.token_at(after + 1).is(":")
            }
            None => false,
        }
    }

    /// Whether the parenthesis at `index` opens a lambda parameter list.
    fn is_lambda_at(&self, index: usize) -> bool {
        let mut depth = 0usize;
        let mut cursor = index;
        loop {
            let token = self.token_at(cursor);
            if token.kind == TokenKind::Eof {
                return false;
            }
            if token.is("(") {
                depth += 1;
            } else if token.is(")") {
                depth -= 1;
                if depth == 0 {
                    return self.token_at(cursor + 1).is("->");
                }
            }
            cursor += 1;
        }
    }

    // ---- declarations ----

    pub(crate) fn compilation_unit(&mut self) -> PResult<NodeId> {
        let comments = if self.at("package") {
            self.take_comments()
        } else {
            Vec::new()
        };
        if self.at("@") {
            return Err(self.unsupported("package annotations"));
        }
        let mut package = None;
        if self.eat("package") {
            package = Some(self.qualified_name()?);
            self.expect(";")?;
        }
        let mut imports = Vec::new();
        while self.eat("import") {
            let is_static = self.eat("static");
            let mut path = self.expect_identifier()?;
            let mut wildcard = false;
            while self.eat(".") {
                if self.eat("*") {
                    wildcard = true;
                    break;
                }
                path.push('.');
                path.push_str(&self.expect_identifier()?);
            }
            self.expect(";")?;
            imports.push(Import {
                path,
                is_static,
                wildcard,
            });
        }
        let mut types = Vec::new();
        while !self.at_eof() {
            if self.eat(";") {
                continue;
            }
            let comments = self.take_comments();
            let start = self.pos;
            let (modifiers, annotations) = self.modifiers()?;
            types.push(self.type_declaration(start, comments, modifiers, annotations)?);
        }
        let end = self.peek().start;
        let position = SourcePosition::Real {
            file: Arc::clone(&self.file),
            line: 1,
            column: 1,
            start: 0,
            end,
        };
        tracing::debug!(file = %self.file, types = types.len(), "parsed compilation unit");
        Ok(self.ast.alloc(
            NodeKind::CompilationUnit {
                package,
                imports,
                types,
            },
            position,
            comments,
        ))
    }

    fn modifiers(&mut self) -> PResult<(Modifiers, Vec<NodeId>)> {
        let mut modifiers = Modifiers::new();
        let mut annotations = Vec::new();
        loop {
            if self.at("@") {
                if self.peek_at(1).is("interface") {
                    return Err(self.unsupported("annotation type declarations"));
                }
                annotations.push(self.annotation()?);
                continue;
            }
            let token = self.peek();
            let modifier = match token.kind {
                TokenKind::Keyword => ModifierKind::from_keyword(&token.text),
                _ => None,
            };
            let Some(modifier) = modifier else {
                break;
            };
            if !modifiers.insert(modifier) {
                return Err(self.error(format!("repeated modifier '{modifier}'")));
            }
            self.advance();
        }
        Ok((modifiers, annotations))
    }

    fn annotation(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        self.expect("@")?;
        let name = self.qualified_name()?;
        let mut arguments = Vec::new();
        if self.eat("(") {
            if !self.at(")") {
                loop {
                    if self.peek().kind == TokenKind::Identifier && self.peek_at(1).is("=") {
                        let key_start = self.pos;
                        let key = self.expect_identifier()?;
                        let target = self.node(key_start, NodeKind::Name { name: key });
                        self.expect("=")?;
                        let value = self.element_value()?;
                        arguments.push(self.node(
                            key_start,
                            NodeKind::Assignment {
                                operator: None,
                                target,
                                value,
                            },
                        ));
                    } else {
                        arguments.push(self.element_value()?);
                    }
                    if !self.eat(",") {
                        break;
                    }
                }
            }
            self.expect(")")?;
        }
        Ok(self.node(start, NodeKind::Annotation { name, arguments }))
    }

    fn element_value(&mut self) -> PResult<NodeId> {
        if self.at("@") {
            self.annotation()
        } else if self.at("{") {
            Err(self.unsupported("array-valued annotation arguments"))
        } else {
            self.expression()
        }
    }

    fn type_declaration(
        &mut self,
        start: usize,
        comments: Vec<Comment>,
        modifiers: Modifiers,
        annotations: Vec<NodeId>,
    ) -> PResult<NodeId> {
        if self.at("enum") {
            return Err(self.unsupported("enums"));
        }
        if self.at_identifier("record") && self.peek_at(1).kind == TokenKind::Identifier {
            return Err(self.unsupported("records"));
        }
        let is_class = if self.eat("class") {
            true
        } else if self.eat("interface") {
            false
        } else {
            return Err(self.unexpected("class or interface declaration"));
        };
        let name = self.expect_identifier()?;
        let type_parameters = self.type_parameters()?;
        let mut superclass = None;
        let mut supertypes = Vec::new();
        if self.eat("extends") {
            if is_class {
                superclass = Some(self.parse_type()?);
            } else {
                supertypes = self.type_list()?;
            }
        }
        if is_class && self.eat("implements") {
            supertypes = self.type_list()?;
        }
        if self.at_identifier("permits") {
            return Err(self.unsupported("sealed type hierarchies"));
        }
        self.type_names.push(name.clone());
        let members = self.class_body();
        self.type_names.pop();
        let members = members?;
        let kind = if is_class {
            NodeKind::Class {
                name,
                modifiers,
                annotations,
                type_parameters,
                superclass,
                interfaces: supertypes,
                members,
            }
        } else {
            NodeKind::Interface {
                name,
                modifiers,
                annotations,
                type_parameters,
                extends: supertypes,
                members,
            }
        };
        Ok(self.node_with_comments(start, kind, comments))
    }

    fn type_list(&mut self) -> PResult<Vec<NodeId>> {
        let mut types = vec![self.parse_type()?];
        while self.eat(",") {
            types.push(self.parse_type()?);
        }
        Ok(types)
    }

    fn type_parameters(&mut self) -> PResult<Vec<NodeId>> {
        if !self.eat("<") {
            return Ok(Vec::new());
        }
        let mut parameters = Vec::new();
        loop {
            let start = self.pos;
            if self.at("@") {
                return Err(self.unsupported("annotations on type parameters"));
            }
            let name = self.expect_identifier()?;
            let mut bounds = Vec::new();
            if self.eat("extends") {
                bounds.push(self.parse_type()?);
                while self.eat("&") {
                    bounds.push(self.parse_type()?);
                }
            }
            parameters.push(self.node(start, NodeKind::TypeParameter { name, bounds }));
            if !self.eat(",") {
                break;
            }
        }
        self.close_angle()?;
        Ok(parameters)
    }

    fn class_body(&mut self) -> PResult<Vec<NodeId>> {
        self.expect("{")?;
        let mut members = Vec::new();
        while !self.at("}") {
            if self.at_eof() {
                return Err(self.unexpected("'}'"));
            }
            if self.eat(";") {
                continue;
            }
            members.extend(self.member()?);
        }
        self.advance();
        Ok(members)
    }

    fn member(&mut self) -> PResult<Vec<NodeId>> {
        let comments = self.take_comments();
        let start = self.pos;
        if self.at("{") || (self.at("static") && self.peek_at(1).is("{")) {
            return Err(self.unsupported("initializer blocks"));
        }
        let (modifiers, annotations) = self.modifiers()?;
        if self.at("class")
            || self.at("interface")
            || self.at("enum")
            || (self.at_identifier("record") && self.peek_at(1).kind == TokenKind::Identifier)
        {
            return Ok(vec![self.type_declaration(start, comments, modifiers, annotations)?]);
        }
        let type_parameters = self.type_parameters()?;

        if self.peek().kind == TokenKind::Identifier && self.peek_at(1).is("(") {
            let name = self.peek().text.clone();
            if self.type_names.last() != Some(&name) {
                return Err(self.error(format!("method '{name}' is missing a return type")));
            }
            if !type_parameters.is_empty() {
                return Err(self.unsupported("generic constructors"));
            }
            self.advance();
            let parameters = self.parameters()?;
            let thrown = self.throws_clause()?;
            let body = self.block()?;
            let kind = NodeKind::Constructor {
                name,
                modifiers,
                annotations,
                parameters,
                thrown,
                body,
            };
            return Ok(vec![self.node_with_comments(start, kind, comments)]);
        }

        let ty = self.parse_type()?;
        let name = self.expect_identifier()?;
        if self.at("(") {
            let parameters = self.parameters()?;
            if self.at("[") {
                return Err(self.unsupported("array dimensions after a method signature"));
            }
            let thrown = self.throws_clause()?;
            let body = if self.eat(";") {
                None
            } else {
                Some(self.block()?)
            };
            let kind = NodeKind::Method {
                name,
                modifiers,
                annotations,
                type_parameters,
                return_type: ty,
                parameters,
                thrown,
                body,
            };
            return Ok(vec![self.node_with_comments(start, kind, comments)]);
        }
        if !type_parameters.is_empty() {
            return Err(self.unexpected("'('"));
        }
        let declarators = self.declarators(name)?;
        self.expect(";")?;

        let mut fields = Vec::with_capacity(declarators.len());
        let mut comments = Some(comments);
        for (index, (name, initializer)) in declarators.into_iter().enumerate() {
            let (ty, annotations) = if index == 0 {
                (ty, annotations.clone())
            } else {
                self.copy_declaration_parts(ty, &annotations)
            };
            let kind = NodeKind::Field {
                name,
                modifiers: modifiers.clone(),
                annotations,
                ty,
                initializer,
            };
            let comments = comments.take().unwrap_or_default();
            fields.push(self.node_with_comments(start, kind, comments));
        }
        Ok(fields)
    }

    /// Fresh copies of a shared declaration type and annotations for the
    /// second and later declarators.
    fn copy_declaration_parts(&mut self, ty: NodeId, annotations: &[NodeId]) -> (NodeId, Vec<NodeId>) {
        let ty = self.ast.clone_subtree(ty);
        let annotations = annotations
            .iter()
            .map(|annotation| self.ast.clone_subtree(*annotation))
            .collect();
        (ty, annotations)
    }

    /// `a = 1, b, c = 2` after the type, starting from the first name.
    fn declarators(&mut self, first: String) -> PResult<Vec<(String, Option<NodeId>)>> {
        let mut out = Vec::new();
        let mut name = first;
        loop {
            if self.at("[") {
                return Err(self.unsupported("array dimensions after a variable name"));
            }
            let initializer = if self.eat("=") {
                if self.at("{") {
                    return Err(self.unsupported("array initializers"));
                }
                Some(self.expression()?)
            } else {
                None
            };
            out.push((name, initializer));
            if !self.eat(",") {
                return Ok(out);
            }
            name = self.expect_identifier()?;
        }
    }

    fn parameters(&mut self) -> PResult<Vec<NodeId>> {
        self.expect("(")?;
        let mut parameters = Vec::new();
        if !self.at(")") {
            loop {
                let start = self.pos;
                let (modifiers, annotations) = self.modifiers()?;
                let ty = self.parse_type()?;
                let varargs = self.eat("...");
                let name = self.expect_identifier()?;
                if self.at("[") {
                    return Err(self.unsupported("array dimensions after a parameter name"));
                }
                parameters.push(self.node(
                    start,
                    NodeKind::Parameter {
                        name,
                        modifiers,
                        annotations,
                        ty,
                        varargs,
                    },
                ));
                if varargs && !self.at(")") {
                    return Err(self.error("a varargs parameter must be the last parameter"));
                }
                if !self.eat(",") {
                    break;
                }
            }
        }
        self.expect(")")?;
        Ok(parameters)
    }

    fn throws_clause(&mut self) -> PResult<Vec<NodeId>> {
        if self.eat("throws") {
            self.type_list()
        } else {
            Ok(Vec::new())
        }
    }

    // ---- types ----

    pub(crate) fn parse_type(&mut self) -> PResult<NodeId> {
        self.nested(|p| p.type_reference(false, true))
    }

    fn type_reference(&mut self, allow_diamond: bool, with_dimensions: bool) -> PResult<NodeId> {
        let start = self.pos;
        if self.at("@") {
            return Err(self.unsupported("type annotations"));
        }
        let primitive = Self::is_primitive(self.peek());
        let name = if primitive {
            self.advance().text
        } else if self.peek().kind == TokenKind::Identifier {
            self.qualified_name()?
        } else {
            return Err(self.unexpected("type"));
        };
        let mut arguments = Vec::new();
        let mut diamond = false;
        if !primitive && self.at("<") {
            self.advance();
            if allow_diamond && self.at(">") {
                self.advance();
                diamond = true;
            } else {
                loop {
                    arguments.push(self.type_argument()?);
                    if !self.eat(",") {
                        break;
                    }
                }
                self.close_angle()?;
            }
        }
        let mut dimensions: u8 = 0;
        while with_dimensions && self.at("[") && self.peek_at(1).is("]") {
            self.advance();
            self.advance();
            dimensions = dimensions
                .checked_add(1)
                .ok_or_else(|| self.error("too many array dimensions"))?;
        }
        Ok(self.node(
            start,
            NodeKind::TypeReference {
                name,
                arguments,
                diamond,
                dimensions,
            },
        ))
    }

    fn type_argument(&mut self) -> PResult<NodeId> {
        if !self.at("?") {
            return self.parse_type();
        }
        let start = self.pos;
        self.advance();
        let (bound, upper) = if self.eat("extends") {
            (Some(self.parse_type()?), true)
        } else if self.eat("super") {
            (Some(self.parse_type()?), false)
        } else {
            (None, true)
        };
        Ok(self.node(start, NodeKind::WildcardType { bound, upper }))
    }

    // ---- statements ----

    pub(crate) fn block(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        self.expect("{")?;
        let mut statements = Vec::new();
        while !self.at("}") {
            if self.at_eof() {
                return Err(self.unexpected("'}'"));
            }
            statements.extend(self.block_statement()?);
        }
        self.advance();
        Ok(self.node(start, NodeKind::Block { statements }))
    }

    fn block_statement(&mut self) -> PResult<Vec<NodeId>> {
        if self.at("class")
            || self.at("interface")
            || self.at("enum")
            || self.at("abstract")
            || self.at("static")
            || (self.at("final") && self.peek_at(1).is("class"))
        {
            return Err(self.unsupported("local type declarations"));
        }
        if !self.is_local_declaration() {
            return Ok(vec![self.statement()?]);
        }
        let comments = self.take_comments();
        let start = self.pos;
        let locals = self.local_variables(start, comments)?;
        self.expect(";")?;
        Ok(locals)
    }

    /// `[final] Type a = 1, b` without the terminating semicolon.
    fn local_variables(&mut self, start: usize, comments: Vec<Comment>) -> PResult<Vec<NodeId>> {
        let (modifiers, annotations) = self.modifiers()?;
        if !annotations.is_empty() {
            return Err(self.unsupported("annotations on local variables"));
        }
        if modifiers.iter().any(|m| *m != ModifierKind::Final) {
            return Err(self.error("only 'final' may modify a local variable"));
        }
        let ty = self.parse_type()?;
        let name = self.expect_identifier()?;
        let declarators = self.declarators(name)?;
        let mut locals = Vec::with_capacity(declarators.len());
        let mut comments = Some(comments);
        for (index, (name, initializer)) in declarators.into_iter().enumerate() {
            let ty = if index == 0 {
                ty
            } else {
                self.ast.clone_subtree(ty)
            };
            let kind = NodeKind::LocalVariable {
                name,
                modifiers: modifiers.clone(),
                ty,
                initializer,
            };
            let comments = comments.take().unwrap_or_default();
            locals.push(self.node_with_comments(start, kind, comments));
        }
        Ok(locals)
    }

    pub(crate) fn statement(&mut self) -> PResult<NodeId> {
        self.nested(|p| p.statement_inner())
    }

    fn statement_inner(&mut self) -> PResult<NodeId> {
        let comments = self.take_comments();
        let start = self.pos;
        if self.at("{") {
            let block = self.block()?;
            for comment in comments {
                self.ast.add_comment(block, comment);
            }
            return Ok(block);
        }
        if self.at("switch") {
            return Err(self.unsupported("switch statements"));
        }
        if self.at("synchronized") {
            return Err(self.unsupported("synchronized blocks"));
        }
        if self.at("assert") {
            return Err(self.unsupported("assert statements"));
        }
        if self.peek().kind == TokenKind::Identifier && self.peek_at(1).is(":") {
            return Err(self.unsupported("labeled statements"));
        }

        let kind = if self.eat(";") {
            NodeKind::Empty
        } else if self.eat("if") {
            let condition = self.parenthesized()?;
            let then_branch = self.statement()?;
            let else_branch = if self.eat("else") {
                Some(self.statement()?)
            } else {
                None
            };
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            }
        } else if self.eat("while") {
            let condition = self.parenthesized()?;
            let body = self.statement()?;
            NodeKind::While { condition, body }
        } else if self.eat("do") {
            let body = self.statement()?;
            self.expect("while")?;
            let condition = self.parenthesized()?;
            self.expect(";")?;
            NodeKind::DoWhile { body, condition }
        } else if self.eat("for") {
            self.for_statement()?
        } else if self.eat("return") {
            let value = if self.at(";") {
                None
            } else {
                Some(self.expression()?)
            };
            self.expect(";")?;
            NodeKind::Return { value }
        } else if self.eat("throw") {
            let value = self.expression()?;
            self.expect(";")?;
            NodeKind::Throw { value }
        } else if self.at("break") || self.at("continue") {
            let is_break = self.advance().text == "break";
            let label = if self.peek().kind == TokenKind::Identifier {
                Some(self.advance().text)
            } else {
                None
            };
            self.expect(";")?;
            if is_break {
                NodeKind::Break { label }
            } else {
                NodeKind::Continue { label }
            }
        } else if self.eat("try") {
            self.try_statement()?
        } else {
            let expression = self.expression()?;
            if !self.is_statement_expression(expression) {
                return Err(self.error_at(
                    self.token_at(start),
                    format!("{} is not a statement", self.ast.variant(expression)),
                ));
            }
            self.expect(";")?;
            NodeKind::ExpressionStatement { expression }
        };
        Ok(self.node_with_comments(start, kind, comments))
    }

    fn parenthesized(&mut self) -> PResult<NodeId> {
        self.expect("(")?;
        let expression = self.expression()?;
        self.expect(")")?;
        Ok(expression)
    }

    fn for_statement(&mut self) -> PResult<NodeKind> {
        self.expect("(")?;
        if self.is_for_each_header() {
            let start = self.pos;
            let (modifiers, _) = self.modifiers()?;
            let ty = self.parse_type()?;
            let name = self.expect_identifier()?;
            let variable = self.node(
                start,
                NodeKind::LocalVariable {
                    name,
                    modifiers,
                    ty,
                    initializer: None,
                },
            );
            self.expect(":")?;
            let iterable = self.expression()?;
            self.expect(")")?;
            let body = self.statement()?;
            return Ok(NodeKind::ForEach {
                variable,
                iterable,
                body,
            });
        }

        let mut init = Vec::new();
        if !self.at(";") {
            if self.is_local_declaration() {
                let start = self.pos;
                init = self.local_variables(start, Vec::new())?;
            } else {
                loop {
                    let start = self.pos;
                    let expression = self.expression()?;
                    init.push(self.node(start, NodeKind::ExpressionStatement { expression }));
                    if !self.eat(",") {
                        break;
                    }
                }
            }
        }
        self.expect(";")?;
        let condition = if self.at(";") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(";")?;
        let mut update = Vec::new();
        if !self.at(")") {
            loop {
                update.push(self.expression()?);
                if !self.eat(",") {
                    break;
                }
            }
        }
        self.expect(")")?;
        let body = self.statement()?;
        Ok(NodeKind::For {
            init,
            condition,
            update,
            body,
        })
    }

    fn try_statement(&mut self) -> PResult<NodeKind> {
        if self.at("(") {
            return Err(self.unsupported("try-with-resources statements"));
        }
        let body = self.block()?;
        let mut catchers = Vec::new();
        while self.at("catch") {
            catchers.push(self.catch_clause()?);
        }
        let finalizer = if self.eat("finally") {
            Some(self.block()?)
        } else {
            None
        };
        if catchers.is_empty() && finalizer.is_none() {
            return Err(self.unexpected("'catch' or 'finally'"));
        }
        Ok(NodeKind::Try {
            body,
            catchers,
            finalizer,
        })
    }

    fn catch_clause(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        self.expect("catch")?;
        self.expect("(")?;
        let (modifiers, annotations) = self.modifiers()?;
        if !annotations.is_empty() {
            return Err(self.unsupported("annotations on catch parameters"));
        }
        let mut types = vec![self.parse_type()?];
        while self.eat("|") {
            types.push(self.parse_type()?);
        }
        let name = self.expect_identifier()?;
        self.expect(")")?;
        let body = self.block()?;
        Ok(self.node(
            start,
            NodeKind::Catch {
                name,
                modifiers,
                types,
                body,
            },
        ))
    }

    // ---- expressions ----

    pub(crate) fn expression(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        let target = self.conditional()?;
        let token = self.peek();
        if token.kind != TokenKind::Operator {
            return Ok(target);
        }
        let operator = if token.text == "=" {
            Some(None)
        } else {
            BinaryOperatorKind::from_compound_assignment(&token.text).map(Some)
        };
        let Some(operator) = operator else {
            return Ok(target);
        };
        if !self.is_assignable(target) {
            return Err(self.error_at(self.token_at(start), "invalid assignment target"));
        }
        self.advance();
        let value = self.expression()?;
        Ok(self.node(
            start,
            NodeKind::Assignment {
                operator,
                target,
                value,
            },
        ))
    }

    fn is_statement_expression(&self, node: NodeId) -> bool {
        match self.ast.kind(node) {
            NodeKind::Unary { kind, .. } => kind.is_update(),
            NodeKind::Assignment { .. } | NodeKind::Invocation { .. } | NodeKind::New { .. } => true,
            _ => false,
        }
    }

    fn is_assignable(&self, node: NodeId) -> bool {
        matches!(
            self.ast.variant(node),
            NodeVariant::Name | NodeVariant::FieldAccess | NodeVariant::ArrayAccess
        )
    }

    fn conditional(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        let condition = self.binary(BinaryOperatorKind::Or.precedence())?;
        if !self.eat("?") {
            return Ok(condition);
        }
        let then_value = self.expression()?;
        self.expect(":")?;
        let else_value = self.conditional()?;
        Ok(self.node(
            start,
            NodeKind::Conditional {
                condition,
                then_value,
                else_value,
            },
        ))
    }

    fn binary_operator_here(&self) -> Option<BinaryOperatorKind> {
        let token = self.peek();
        match token.kind {
            TokenKind::Operator => BinaryOperatorKind::from_symbol(&token.text),
            TokenKind::Keyword if token.text == "instanceof" => Some(BinaryOperatorKind::InstanceOf),
            _ => None,
        }
    }

    fn binary(&mut self, min_precedence: u8) -> PResult<NodeId> {
        let start = self.pos;
        let mut left = self.unary()?;
        while let Some(kind) = self.binary_operator_here() {
            let precedence = kind.precedence();
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = if kind == BinaryOperatorKind::InstanceOf {
                if self.at("final") {
                    return Err(self.unsupported("instanceof patterns"));
                }
                let ty = self.parse_type()?;
                if self.peek().kind == TokenKind::Identifier {
                    return Err(self.unsupported("instanceof patterns"));
                }
                ty
            } else {
                self.binary(precedence + 1)?
            };
            left = self.node(start, NodeKind::Binary { kind, left, right });
        }
        Ok(left)
    }

    fn unary(&mut self) -> PResult<NodeId> {
        self.nested(|p| p.unary_inner())
    }

    fn unary_inner(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        let token = self.peek();
        let prefix = match (token.kind, token.text.as_str()) {
            (TokenKind::Operator, "+") => Some(UnaryOperatorKind::Pos),
            (TokenKind::Operator, "-") => Some(UnaryOperatorKind::Neg),
            (TokenKind::Operator, "!") => Some(UnaryOperatorKind::Not),
            (TokenKind::Operator, "~") => Some(UnaryOperatorKind::Compl),
            (TokenKind::Operator, "++") => Some(UnaryOperatorKind::PreInc),
            (TokenKind::Operator, "--") => Some(UnaryOperatorKind::PreDec),
            _ => None,
        };
        if let Some(kind) = prefix {
            self.advance();
            if kind == UnaryOperatorKind::Neg {
                if let Some(literal) = self.minimum_value_literal() {
                    return Ok(self.node(start, NodeKind::Literal(literal)));
                }
            }
            let operand = self.unary()?;
            if kind.is_update() && !self.is_assignable(operand) {
                return Err(self.error_at(self.token_at(start), format!("invalid operand for {kind}")));
            }
            return Ok(self.node(start, NodeKind::Unary { kind, operand }));
        }
        if self.at("(") {
            if let Some(cast) = self.cast()? {
                return Ok(cast);
            }
        }
        let primary = self.primary()?;
        self.postfix(start, primary)
    }

    /// `-2147483648` and `-9223372036854775808L` only exist as negated literals.
    fn minimum_value_literal(&mut self) -> Option<Literal> {
        let token = self.peek();
        let digits: String = token.text.chars().filter(|c| *c != '_').collect();
        let literal = match (token.kind, digits.as_str()) {
            (TokenKind::IntLiteral, "2147483648") => Literal::Int(i32::MIN),
            (TokenKind::LongLiteral, "9223372036854775808L" | "9223372036854775808l") => {
                Literal::Long(i64::MIN)
            }
            _ => return None,
        };
        self.advance();
        Some(literal)
    }

    fn cast(&mut self) -> PResult<Option<NodeId>> {
        let start = self.pos;
        let Some(after) = self.scan_type(self.pos + 1) else {
            return Ok(None);
        };
        if !self.token_at(after).is(")") {
            return Ok(None);
        }
        let primitive = Self::is_primitive(self.token_at(self.pos + 1)) && after == self.pos + 2;
        let next = self.token_at(after + 1);
        let is_cast = primitive
            || match next.kind {
                TokenKind::Identifier
                | TokenKind::IntLiteral
                | TokenKind::LongLiteral
                | TokenKind::FloatLiteral
                | TokenKind::DoubleLiteral
                | TokenKind::CharLiteral
                | TokenKind::StringLiteral => true,
                TokenKind::Keyword => matches!(
                    next.text.as_str(),
                    "this" | "super" | "new" | "true" | "false" | "null"
                ),
                TokenKind::Operator => matches!(next.text.as_str(), "(" | "!" | "~"),
                TokenKind::Eof => false,
            };
        if !is_cast || self.is_lambda_at(self.pos) {
            return Ok(None);
        }
        self.advance();
        let ty = self.parse_type()?;
        self.expect(")")?;
        let expression = self.unary()?;
        Ok(Some(self.node(start, NodeKind::Cast { ty, expression })))
    }

    fn postfix(&mut self, start: usize, mut expression: NodeId) -> PResult<NodeId> {
        loop {
            if self.eat(".") {
                if self.at("<") {
                    return Err(self.unsupported("explicit generic invocations"));
                }
                if self.at("new") || self.at("this") || self.at("class") || self.at("super") {
                    return Err(self.unsupported("qualified this, super, new and class literals"));
                }
                let name = self.expect_identifier()?;
                let kind = if self.at("(") {
                    NodeKind::Invocation {
                        target: Some(expression),
                        name,
                        arguments: self.arguments()?,
                    }
                } else {
                    NodeKind::FieldAccess {
                        target: expression,
                        name,
                    }
                };
                expression = self.node(start, kind);
            } else if self.eat("[") {
                let index = self.expression()?;
                self.expect("]")?;
                expression = self.node(
                    start,
                    NodeKind::ArrayAccess {
                        target: expression,
                        index,
                    },
                );
            } else if self.at("++") || self.at("--") {
                let kind = if self.advance().text == "++" {
                    UnaryOperatorKind::PostInc
                } else {
                    UnaryOperatorKind::PostDec
                };
                if !self.is_assignable(expression) {
                    return Err(self.error_at(self.token_at(start), format!("invalid operand for {kind}")));
                }
                expression = self.node(
                    start,
                    NodeKind::Unary {
                        kind,
                        operand: expression,
                    },
                );
            } else if self.at("::") {
                return Err(self.unsupported("method references"));
            } else {
                return Ok(expression);
            }
        }
    }

    fn arguments(&mut self) -> PResult<Vec<NodeId>> {
        self.expect("(")?;
        let mut arguments = Vec::new();
        if !self.at(")") {
            loop {
                arguments.push(self.expression()?);
                if !self.eat(",") {
                    break;
                }
            }
        }
        self.expect(")")?;
        Ok(arguments)
    }

    fn primary(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        let token = self.peek().clone();
        let literal = |parsed: Result<Literal, String>| parsed.map_err(|message| (token.clone(), message));
        let kind = match token.kind {
            TokenKind::IntLiteral => literal(int_literal(&token.text)),
            TokenKind::LongLiteral => literal(long_literal(&token.text)),
            TokenKind::FloatLiteral => literal(float_literal(&token.text)),
            TokenKind::DoubleLiteral => literal(double_literal(&token.text)),
            TokenKind::CharLiteral => literal(char_literal(&token.text)),
            TokenKind::StringLiteral => literal(string_literal(&token.text)),
            TokenKind::Identifier => {
                if self.peek_at(1).is("->") {
                    return Err(self.unsupported("lambda expressions"));
                }
                self.advance();
                let kind = if self.at("(") {
                    NodeKind::Invocation {
                        target: None,
                        name: token.text.clone(),
                        arguments: self.arguments()?,
                    }
                } else {
                    NodeKind::Name {
                        name: token.text.clone(),
                    }
                };
                return Ok(self.node(start, kind));
            }
            TokenKind::Keyword => match token.text.as_str() {
                "true" => Ok(Literal::Boolean(true)),
                "false" => Ok(Literal::Boolean(false)),
                "null" => Ok(Literal::Null),
                "this" | "super" => {
                    self.advance();
                    let kind = if self.at("(") {
                        NodeKind::Invocation {
                            target: None,
                            name: token.text.clone(),
                            arguments: self.arguments()?,
                        }
                    } else if token.text == "this" {
                        NodeKind::This
                    } else if self.at(".") {
                        NodeKind::Super
                    } else {
                        return Err(self.unexpected("'.' after 'super'"));
                    };
                    return Ok(self.node(start, kind));
                }
                "new" => return self.creation(),
                "switch" => return Err(self.unsupported("switch expressions")),
                _ if Self::is_primitive(&token) => {
                    return Err(self.unsupported("class literals"));
                }
                _ => return Err(self.unexpected("expression")),
            },
            TokenKind::Operator if token.text == "(" => {
                if self.is_lambda_at(self.pos) {
                    return Err(self.unsupported("lambda expressions"));
                }
                return self.parenthesized();
            }
            _ => return Err(self.unexpected("expression")),
        };
        let literal = kind.map_err(|(token, message)| self.error_at(&token, message))?;
        self.advance();
        Ok(self.node(start, NodeKind::Literal(literal)))
    }

    fn creation(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        self.expect("new")?;
        if self.at("<") {
            return Err(self.unsupported("explicit generic invocations"));
        }
        let ty = self.nested(|p| p.type_reference(true, false))?;
        if self.at("[") {
            let mut dimensions = Vec::new();
            let mut extra_dimensions: u8 = 0;
            while self.eat("[") {
                if self.eat("]") {
                    extra_dimensions = extra_dimensions.saturating_add(1);
                    continue;
                }
                if extra_dimensions > 0 {
                    return Err(self.error("sized dimension after an unsized one"));
                }
                dimensions.push(self.expression()?);
                self.expect("]")?;
            }
            if self.at("{") {
                return Err(self.unsupported("array initializers"));
            }
            if dimensions.is_empty() {
                return Err(self.error("array creation needs at least one sized dimension"));
            }
            return Ok(self.node(
                start,
                NodeKind::NewArray {
                    element: ty,
                    dimensions,
                    extra_dimensions,
                },
            ));
        }
        let arguments = self.arguments()?;
        if self.at("{") {
            return Err(self.unsupported("anonymous classes"));
        }
        Ok(self.node(start, NodeKind::New { ty, arguments }))
    }
}

/// Value of an integer literal that fits in `bits`. Decimal literals must
/// be non-negative in the signed range; hex, octal and binary literals may
/// use the full unsigned width.
fn integer_bits(text: &str, bits: u32) -> Result<u64, String> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    let (radix, body, decimal) = if let Some(rest) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, rest, false)
    } else if let Some(rest) = digits
        .strip_prefix("0b")
        .or_else(|| digits.strip_prefix("0B"))
    {
        (2, rest, false)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..], false)
    } else {
        (10, digits.as_str(), true)
    };
    let value = u64::from_str_radix(body, radix)
        .map_err(|_| format!("malformed integer literal '{text}'"))?;
    let limit = if decimal {
        (1u64 << (bits - 1)) - 1
    } else {
        u64::MAX >> (64 - bits)
    };
    if value > limit {
        return Err(format!("integer literal '{text}' is out of range"));
    }
    Ok(value)
}

fn int_literal(text: &str) -> Result<Literal, String> {
    Ok(Literal::Int(integer_bits(text, 32)? as u32 as i32))
}

fn long_literal(text: &str) -> Result<Literal, String> {
    let body = &text[..text.len() - 1];
    Ok(Literal::Long(integer_bits(body, 64)? as i64))
}

fn float_literal(text: &str) -> Result<Literal, String> {
    let body: String = text
        .trim_end_matches(['f', 'F'])
        .chars()
        .filter(|c| *c != '_')
        .collect();
    match body.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(Literal::Float(value)),
        _ => Err(format!("invalid float literal '{text}'")),
    }
}

fn double_literal(text: &str) -> Result<Literal, String> {
    let body: String = text
        .trim_end_matches(['d', 'D'])
        .chars()
        .filter(|c| *c != '_')
        .collect();
    match body.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Literal::Double(value)),
        _ => Err(format!("invalid double literal '{text}'")),
    }
}

fn char_literal(text: &str) -> Result<Literal, String> {
    let decoded = unescape(&text[1..text.len() - 1])?;
    let mut chars = decoded.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Literal::Char(c)),
        _ => Err(format!("character literal {text} must hold exactly one character")),
    }
}

fn string_literal(text: &str) -> Result<Literal, String> {
    Ok(Literal::String(unescape(&text[1..text.len() - 1])?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{HasBody, Named};
    use crate::syntax::{parse_expression, parse_source};

    fn expr(text: &str) -> (Ast, NodeId) {
        let mut ast = Ast::new();
        let id = parse_expression(&mut ast, text).unwrap();
        (ast, id)
    }

    #[test]
    fn binary_precedence_nests_multiplication_deeper() {
        let (ast, root) = expr("1 + 2 * 3");
        let NodeKind::Binary { kind, right, .. } = ast.kind(root) else {
            panic!("expected binary");
        };
        assert_eq!(*kind, BinaryOperatorKind::Plus);
        assert!(matches!(
            ast.kind(*right),
            NodeKind::Binary {
                kind: BinaryOperatorKind::Mul,
                ..
            }
        ));
    }

    #[test]
    fn subtraction_is_left_associative() {
        let (ast, root) = expr("a - b - c");
        let NodeKind::Binary { left, .. } = ast.kind(root) else {
            panic!("expected binary");
        };
        assert_eq!(ast.variant(*left), NodeVariant::Binary);
    }

    #[test]
    fn assignment_is_right_associative() {
        let (ast, root) = expr("a = b += 2");
        let NodeKind::Assignment { operator, value, .. } = ast.kind(root) else {
            panic!("expected assignment");
        };
        assert_eq!(*operator, None);
        assert!(matches!(
            ast.kind(*value),
            NodeKind::Assignment {
                operator: Some(BinaryOperatorKind::Plus),
                ..
            }
        ));
    }

    #[test]
    fn casts_are_distinguished_from_parentheses() {
        let (ast, root) = expr("(int) x + (y) - (String) z");
        let casts = ast
            .elements(root, crate::query::TypeFilter(NodeVariant::Cast))
            .count();
        assert_eq!(casts, 2);
    }

    #[test]
    fn nested_generics_split_shift_tokens() {
        let mut ast = Ast::new();
        let unit = parse_source(
            &mut ast,
            "G.java",
            "class G { java.util.Map<String, java.util.List<java.util.List<Integer>>> m; int s = 8 >> 1; }",
        )
        .unwrap();
        let field = ast.find_named(unit, NodeVariant::Field, "m").unwrap();
        let NodeKind::Field { ty, .. } = ast.kind(field) else {
            panic!("expected field");
        };
        assert_eq!(ast.simple_name(*ty), Some("java.util.Map"));
        assert_eq!(ast.children(*ty).len(), 2);
        assert!(ast
            .find_named(unit, NodeVariant::Field, "s")
            .is_some());
    }

    #[test]
    fn multi_declarators_split_into_fields() {
        let mut ast = Ast::new();
        let unit = parse_source(&mut ast, "F.java", "class F { private int a = 1, b, c = 3; }").unwrap();
        let class = ast.find_named(unit, NodeVariant::Class, "F").unwrap();
        let names: Vec<_> = ast
            .members(class)
            .iter()
            .filter_map(|m| ast.kind(*m).simple_name())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        ast.check_integrity(unit).unwrap();
    }

    #[test]
    fn constructor_requires_enclosing_name() {
        let mut ast = Ast::new();
        let unit = parse_source(&mut ast, "C.java", "class C { C() { super(); } }").unwrap();
        assert!(ast.find_named(unit, NodeVariant::Constructor, "C").is_some());

        let err = parse_source(&mut ast, "C.java", "class C { D() {} }").unwrap_err();
        assert!(err.message.contains("missing a return type"));
    }

    #[test]
    fn try_catch_finally_keeps_clause_order() {
        let mut ast = Ast::new();
        let unit = parse_source(
            &mut ast,
            "T.java",
            r#"class T {
                int f() {
                    try { return 1; }
                    catch (IllegalStateException | IllegalArgumentException e) { return 2; }
                    catch (RuntimeException e) { throw e; }
                    finally { g(); }
                }
            }"#,
        )
        .unwrap();
        let method = ast.find_named(unit, NodeVariant::Method, "f").unwrap();
        let body = ast.kind(method).body().unwrap();
        let try_node = ast.children(body)[0];
        let NodeKind::Try {
            catchers,
            finalizer,
            ..
        } = ast.kind(try_node)
        else {
            panic!("expected try");
        };
        assert_eq!(catchers.len(), 2);
        assert!(finalizer.is_some());
        let NodeKind::Catch { types, .. } = ast.kind(catchers[0]) else {
            panic!("expected catch");
        };
        assert_eq!(types.len(), 2);
    }

    #[test]
    fn comments_attach_to_members_and_statements() {
        let mut ast = Ast::new();
        let unit = parse_source(
            &mut ast,
            "K.java",
            "class K {\n  /** Doc. */\n  void f() {\n    // step\n    g();\n  }\n}\n",
        )
        .unwrap();
        let method = ast.find_named(unit, NodeVariant::Method, "f").unwrap();
        assert_eq!(ast.comments(method).len(), 1);
        let body = ast.kind(method).body().unwrap();
        let statement = ast.children(body)[0];
        assert_eq!(ast.comments(statement)[0].text, " step");
    }

    #[test]
    fn positions_are_real_and_located() {
        let mut ast = Ast::new();
        let unit = parse_source(&mut ast, "P.java", "class P {\n    int x;\n}\n").unwrap();
        let field = ast.find_named(unit, NodeVariant::Field, "x").unwrap();
        let SourcePosition::Real { line, column, .. } = ast.position(field) else {
            panic!("expected real position");
        };
        assert_eq!((*line, *column), (2, 5));
    }

    #[test]
    fn integer_literal_ranges() {
        assert!(parse_expression(&mut Ast::new(), "2147483647").is_ok());
        assert!(parse_expression(&mut Ast::new(), "2147483648").is_err());
        let (ast, root) = expr("-2147483648");
        assert_eq!(ast.kind(root), &NodeKind::Literal(Literal::Int(i32::MIN)));
        let (ast, root) = expr("0xFFFFFFFF");
        assert_eq!(ast.kind(root), &NodeKind::Literal(Literal::Int(-1)));
        let (ast, root) = expr("017");
        assert_eq!(ast.kind(root), &NodeKind::Literal(Literal::Int(15)));
    }

    #[test]
    fn unsupported_constructs_fail_cleanly() {
        let cases = [
            ("enum E { A }", "enums"),
            ("class A { void f() { switch (x) {} } }", "switch statements"),
            ("class A { Runnable r = () -> g(); }", "lambda expressions"),
            ("class A { int[] a = {1, 2}; }", "array initializers"),
            ("class A { static { } }", "initializer blocks"),
            ("class A { void f() { try (R r = open()) {} } }", "try-with-resources"),
        ];
        for (source, needle) in cases {
            let err = parse_source(&mut Ast::new(), "A.java", source).unwrap_err();
            assert!(err.message.contains(needle), "{source}: {}", err.message);
        }
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let worker = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let text = format!("{}1{}", "(".repeat(400), ")".repeat(400));
                parse_expression(&mut Ast::new(), &text).unwrap_err()
            })
            .unwrap();
        let err = worker.join().unwrap();
        assert!(err.message.contains("nesting"));
    }

    #[test]
    fn expression_statements_must_have_effects() {
        let err = parse_source(&mut Ast::new(), "A.java", "class A { void f() { a + b; } }").unwrap_err();
        assert!(err.message.contains("not a statement"));
    }
}
