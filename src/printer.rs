//! Deterministic source rendering.
//!
//! Output uses four-space indentation, one blank line between members and
//! the canonical modifier order. Parentheses are derived from operator
//! precedence, so the tree does not need to remember them.

use crate::ast::{Ast, Comment, CommentKind, Literal, Modifiers, NodeId, NodeKind};
use crate::syntax::escape;

const INDENT: &str = "    ";

/// Precedence of postfix and primary expressions.
const POSTFIX: u8 = 14;
const PRIMARY: u8 = 15;
const PREFIX: u8 = 13;

/// Render any subtree.
pub fn print(ast: &Ast, node: NodeId) -> String {
    let mut printer = Printer::new(ast);
    printer.node(node);
    printer.out
}

/// Render a compilation unit, ending with a newline.
pub fn print_unit(ast: &Ast, unit: NodeId) -> String {
    let mut printer = Printer::new(ast);
    printer.unit(unit);
    tracing::debug!(bytes = printer.out.len(), "printed compilation unit");
    printer.out
}

/// Package and import lines of a unit, followed by a blank line when
/// non-empty.
pub fn print_unit_header(ast: &Ast, unit: NodeId) -> String {
    let mut printer = Printer::new(ast);
    printer.unit_header(unit);
    printer.out
}

/// Signature of a method or constructor, without annotations or body:
/// `public int add(int a, int b) throws X`.
pub fn print_method_header(ast: &Ast, method: NodeId) -> String {
    let mut printer = Printer::new(ast);
    printer.method_header(method);
    printer.out
}

struct Printer<'a> {
    ast: &'a Ast,
    out: String,
    indent: usize,
}

impl<'a> Printer<'a> {
    fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            out: String::new(),
            indent: 0,
        }
    }

    fn ast(&self) -> &'a Ast {
        self.ast
    }

    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn newline(&mut self) {
        self.out.push('\n');
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
    }

    /// Render into a scratch buffer and return the text.
    fn capture(&mut self, f: impl FnOnce(&mut Self)) -> String {
        let saved = std::mem::take(&mut self.out);
        f(self);
        std::mem::replace(&mut self.out, saved)
    }

    fn comments(&mut self, node: NodeId) {
        let comments: Vec<Comment> = self.ast().comments(node).to_vec();
        for comment in comments {
            self.write_indent();
            match comment.kind {
                CommentKind::Line => {
                    self.write("//");
                    self.write(&comment.text);
                }
                CommentKind::Block => {
                    self.write("/*");
                    self.write(&comment.text);
                    self.write("*/");
                }
                CommentKind::Javadoc => {
                    self.write("/**");
                    self.write(&comment.text);
                    self.write("*/");
                }
            }
            self.newline();
        }
    }

    /// Entry point for an arbitrary subtree.
    fn node(&mut self, node: NodeId) {
        let variant = self.ast().variant(node);
        match self.ast().kind(node) {
            NodeKind::CompilationUnit { .. } => self.unit(node),
            NodeKind::Class { .. }
            | NodeKind::Interface { .. }
            | NodeKind::Method { .. }
            | NodeKind::Constructor { .. }
            | NodeKind::Field { .. } => {
                self.member(node);
                if self.out.ends_with('\n') {
                    self.out.pop();
                }
            }
            NodeKind::Parameter { .. } => self.parameter(node),
            NodeKind::Annotation { .. } => self.annotation(node),
            NodeKind::TypeParameter { .. } => self.type_parameter(node),
            NodeKind::TypeReference { .. } | NodeKind::WildcardType { .. } => self.ty(node),
            NodeKind::Catch { .. } => self.catch_clause(node),
            _ if variant.is_statement() => self.statement_body(node),
            _ => self.expression(node, 0),
        }
    }

    // ---- declarations ----

    fn unit_header(&mut self, unit: NodeId) {
        let NodeKind::CompilationUnit {
            package, imports, ..
        } = self.ast().kind(unit)
        else {
            return;
        };
        if let Some(package) = package {
            self.write(&format!("package {package};\n\n"));
        }
        for import in imports {
            self.write("import ");
            if import.is_static {
                self.write("static ");
            }
            self.write(&import.path);
            if import.wildcard {
                self.write(".*");
            }
            self.write(";\n");
        }
        if !imports.is_empty() {
            self.newline();
        }
    }

    fn unit(&mut self, unit: NodeId) {
        self.comments(unit);
        self.unit_header(unit);
        let NodeKind::CompilationUnit { types, .. } = self.ast().kind(unit) else {
            return;
        };
        for (index, ty) in types.iter().enumerate() {
            if index > 0 {
                self.newline();
            }
            self.member(*ty);
        }
    }

    fn modifiers(&mut self, modifiers: &Modifiers) {
        for modifier in modifiers {
            self.write(modifier.keyword());
            self.write(" ");
        }
    }

    fn annotation_lines(&mut self, annotations: &[NodeId]) {
        for annotation in annotations {
            self.write_indent();
            self.annotation(*annotation);
            self.newline();
        }
    }

    fn annotation(&mut self, node: NodeId) {
        let NodeKind::Annotation { name, arguments } = self.ast().kind(node) else {
            return;
        };
        self.write("@");
        self.write(name);
        if !arguments.is_empty() {
            self.write("(");
            self.comma_separated(arguments, |p, argument| p.expression(argument, 0));
            self.write(")");
        }
    }

    fn comma_separated(&mut self, items: &[NodeId], mut each: impl FnMut(&mut Self, NodeId)) {
        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                self.write(", ");
            }
            each(self, *item);
        }
    }

    fn type_parameters(&mut self, parameters: &[NodeId]) {
        if parameters.is_empty() {
            return;
        }
        self.write("<");
        self.comma_separated(parameters, |p, parameter| p.type_parameter(parameter));
        self.write(">");
    }

    fn type_parameter(&mut self, node: NodeId) {
        let NodeKind::TypeParameter { name, bounds } = self.ast().kind(node) else {
            return;
        };
        self.write(name);
        for (index, bound) in bounds.iter().enumerate() {
            self.write(if index == 0 { " extends " } else { " & " });
            self.ty(*bound);
        }
    }

    /// A member or type declaration on its own lines, at the current indent.
    fn member(&mut self, node: NodeId) {
        self.comments(node);
        let ast = self.ast();
        match ast.kind(node) {
            NodeKind::Class {
                name,
                modifiers,
                annotations,
                type_parameters,
                superclass,
                interfaces,
                members,
            } => {
                self.annotation_lines(annotations);
                self.write_indent();
                self.modifiers(modifiers);
                self.write("class ");
                self.write(name);
                self.type_parameters(type_parameters);
                if let Some(superclass) = superclass {
                    self.write(" extends ");
                    self.ty(*superclass);
                }
                if !interfaces.is_empty() {
                    self.write(" implements ");
                    self.comma_separated(interfaces, |p, ty| p.ty(ty));
                }
                self.type_body(members);
            }
            NodeKind::Interface {
                name,
                modifiers,
                annotations,
                type_parameters,
                extends,
                members,
            } => {
                self.annotation_lines(annotations);
                self.write_indent();
                self.modifiers(modifiers);
                self.write("interface ");
                self.write(name);
                self.type_parameters(type_parameters);
                if !extends.is_empty() {
                    self.write(" extends ");
                    self.comma_separated(extends, |p, ty| p.ty(ty));
                }
                self.type_body(members);
            }
            NodeKind::Method {
                annotations, body, ..
            } => {
                self.annotation_lines(annotations);
                self.write_indent();
                self.method_header(node);
                match body {
                    Some(body) => {
                        self.write(" ");
                        self.block(*body);
                        self.newline();
                    }
                    None => self.write(";\n"),
                }
            }
            NodeKind::Constructor {
                annotations, body, ..
            } => {
                self.annotation_lines(annotations);
                self.write_indent();
                self.method_header(node);
                self.write(" ");
                self.block(*body);
                self.newline();
            }
            NodeKind::Field {
                name,
                modifiers,
                annotations,
                ty,
                initializer,
            } => {
                self.annotation_lines(annotations);
                self.write_indent();
                self.modifiers(modifiers);
                self.ty(*ty);
                self.write(" ");
                self.write(name);
                if let Some(initializer) = initializer {
                    self.write(" = ");
                    self.expression(*initializer, 0);
                }
                self.write(";\n");
            }
            _ => {
                self.write_indent();
                self.node(node);
                self.newline();
            }
        }
    }

    fn type_body(&mut self, members: &[NodeId]) {
        self.write(" {\n");
        self.indent += 1;
        for (index, member) in members.iter().enumerate() {
            if index > 0 {
                self.newline();
            }
            self.member(*member);
        }
        self.indent -= 1;
        self.write_indent();
        self.write("}\n");
    }

    fn method_header(&mut self, node: NodeId) {
        let ast = self.ast();
        let (modifiers, type_parameters, return_type, name, parameters, thrown) = match ast.kind(node) {
            NodeKind::Method {
                name,
                modifiers,
                type_parameters,
                return_type,
                parameters,
                thrown,
                ..
            } => (modifiers, type_parameters.as_slice(), Some(*return_type), name, parameters, thrown),
            NodeKind::Constructor {
                name,
                modifiers,
                parameters,
                thrown,
                ..
            } => (modifiers, &[][..], None, name, parameters, thrown),
            _ => return,
        };
        self.modifiers(modifiers);
        if !type_parameters.is_empty() {
            self.type_parameters(type_parameters);
            self.write(" ");
        }
        if let Some(return_type) = return_type {
            self.ty(return_type);
            self.write(" ");
        }
        self.write(name);
        self.write("(");
        self.comma_separated(parameters, |p, parameter| p.parameter(parameter));
        self.write(")");
        if !thrown.is_empty() {
            self.write(" throws ");
            self.comma_separated(thrown, |p, ty| p.ty(ty));
        }
    }

    fn parameter(&mut self, node: NodeId) {
        let NodeKind::Parameter {
            name,
            modifiers,
            annotations,
            ty,
            varargs,
        } = self.ast().kind(node)
        else {
            return;
        };
        for annotation in annotations {
            self.annotation(*annotation);
            self.write(" ");
        }
        self.modifiers(modifiers);
        self.ty(*ty);
        if *varargs {
            self.write("...");
        }
        self.write(" ");
        self.write(name);
    }

    fn ty(&mut self, node: NodeId) {
        match self.ast().kind(node) {
            NodeKind::TypeReference {
                name,
                arguments,
                diamond,
                dimensions,
            } => {
                self.write(name);
                if *diamond {
                    self.write("<>");
                } else if !arguments.is_empty() {
                    self.write("<");
                    self.comma_separated(arguments, |p, argument| p.ty(argument));
                    self.write(">");
                }
                for _ in 0..*dimensions {
                    self.write("[]");
                }
            }
            NodeKind::WildcardType { bound, upper } => {
                self.write("?");
                if let Some(bound) = bound {
                    self.write(if *upper { " extends " } else { " super " });
                    self.ty(*bound);
                }
            }
            _ => self.node(node),
        }
    }

    // ---- statements ----

    fn block(&mut self, node: NodeId) {
        let NodeKind::Block { statements } = self.ast().kind(node) else {
            self.statement_body(node);
            return;
        };
        self.write("{\n");
        self.indent += 1;
        for statement in statements {
            self.statement(*statement);
        }
        self.indent -= 1;
        self.write_indent();
        self.write("}");
    }

    /// A statement on its own line(s), with leading comments.
    fn statement(&mut self, node: NodeId) {
        self.comments(node);
        self.write_indent();
        self.statement_body(node);
        self.newline();
    }

    /// Whether a trailing `else` printed after `node` would bind to an
    /// `if` inside it.
    fn ends_with_open_if(&self, node: NodeId) -> bool {
        match self.ast().kind(node) {
            NodeKind::If {
                else_branch: None, ..
            } => true,
            NodeKind::If {
                else_branch: Some(tail),
                ..
            } => self.ends_with_open_if(*tail),
            NodeKind::While { body, .. }
            | NodeKind::For { body, .. }
            | NodeKind::ForEach { body, .. } => self.ends_with_open_if(*body),
            _ => false,
        }
    }

    /// Body of a compound statement after its header. Returns whether the
    /// body was a block.
    fn branch(&mut self, node: NodeId) -> bool {
        if matches!(self.ast().kind(node), NodeKind::Block { .. }) {
            self.write(" ");
            self.comments_inline(node);
            self.block(node);
            true
        } else {
            self.newline();
            self.indent += 1;
            self.comments(node);
            self.write_indent();
            self.statement_body(node);
            self.indent -= 1;
            false
        }
    }

    /// Comments on a block that opens on the current line are hoisted
    /// inside it as block comments.
    fn comments_inline(&mut self, node: NodeId) {
        for comment in self.ast().comments(node) {
            match comment.kind {
                CommentKind::Javadoc => self.out.push_str(&format!("/**{}*/ ", comment.text)),
                _ => self.out.push_str(&format!("/*{}*/ ", comment.text)),
            }
        }
    }

    fn statement_body(&mut self, node: NodeId) {
        let ast = self.ast();
        match ast.kind(node) {
            NodeKind::Block { .. } => self.block(node),
            NodeKind::LocalVariable {
                name,
                modifiers,
                ty,
                initializer,
            } => {
                self.local_variable(modifiers, *ty, name, *initializer);
                self.write(";");
            }
            NodeKind::ExpressionStatement { expression } => {
                self.expression(*expression, 0);
                self.write(";");
            }
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.write("if (");
                self.expression(*condition, 0);
                self.write(")");
                let Some(else_branch) = else_branch else {
                    self.branch(*then_branch);
                    return;
                };
                let braced = if self.ends_with_open_if(*then_branch) {
                    self.write(" {\n");
                    self.indent += 1;
                    self.statement(*then_branch);
                    self.indent -= 1;
                    self.write_indent();
                    self.write("}");
                    true
                } else {
                    self.branch(*then_branch)
                };
                if braced {
                    self.write(" else");
                } else {
                    self.newline();
                    self.write_indent();
                    self.write("else");
                }
                if matches!(ast.kind(*else_branch), NodeKind::If { .. }) {
                    self.write(" ");
                    self.statement_body(*else_branch);
                } else {
                    self.branch(*else_branch);
                }
            }
            NodeKind::While { condition, body } => {
                self.write("while (");
                self.expression(*condition, 0);
                self.write(")");
                self.branch(*body);
            }
            NodeKind::DoWhile { body, condition } => {
                self.write("do");
                if self.branch(*body) {
                    self.write(" ");
                } else {
                    self.newline();
                    self.write_indent();
                }
                self.write("while (");
                self.expression(*condition, 0);
                self.write(");");
            }
            NodeKind::For {
                init,
                condition,
                update,
                body,
            } => {
                self.write("for (");
                for (index, item) in init.iter().enumerate() {
                    match ast.kind(*item) {
                        NodeKind::LocalVariable {
                            name,
                            modifiers,
                            ty,
                            initializer,
                        } if index == 0 => self.local_variable(modifiers, *ty, name, *initializer),
                        NodeKind::LocalVariable {
                            name, initializer, ..
                        } => {
                            self.write(", ");
                            self.declarator(name, *initializer);
                        }
                        NodeKind::ExpressionStatement { expression } => {
                            if index > 0 {
                                self.write(", ");
                            }
                            self.expression(*expression, 0);
                        }
                        _ => self.node(*item),
                    }
                }
                self.write(";");
                if let Some(condition) = condition {
                    self.write(" ");
                    self.expression(*condition, 0);
                }
                self.write(";");
                if !update.is_empty() {
                    self.write(" ");
                    self.comma_separated(update, |p, expression| p.expression(expression, 0));
                }
                self.write(")");
                self.branch(*body);
            }
            NodeKind::ForEach {
                variable,
                iterable,
                body,
            } => {
                self.write("for (");
                if let NodeKind::LocalVariable {
                    name,
                    modifiers,
                    ty,
                    ..
                } = ast.kind(*variable)
                {
                    self.local_variable(modifiers, *ty, name, None);
                }
                self.write(" : ");
                self.expression(*iterable, 0);
                self.write(")");
                self.branch(*body);
            }
            NodeKind::Return { value } => match value {
                Some(value) => {
                    self.write("return ");
                    self.expression(*value, 0);
                    self.write(";");
                }
                None => self.write("return;"),
            },
            NodeKind::Throw { value } => {
                self.write("throw ");
                self.expression(*value, 0);
                self.write(";");
            }
            NodeKind::Break { label } => self.jump("break", label.as_deref()),
            NodeKind::Continue { label } => self.jump("continue", label.as_deref()),
            NodeKind::Try {
                body,
                catchers,
                finalizer,
            } => {
                self.write("try ");
                self.block(*body);
                for catcher in catchers {
                    self.write(" ");
                    self.catch_clause(*catcher);
                }
                if let Some(finalizer) = finalizer {
                    self.write(" finally ");
                    self.block(*finalizer);
                }
            }
            NodeKind::Catch { .. } => self.catch_clause(node),
            NodeKind::Empty => self.write(";"),
            _ => self.expression(node, 0),
        }
    }

    fn jump(&mut self, keyword: &str, label: Option<&str>) {
        self.write(keyword);
        if let Some(label) = label {
            self.write(" ");
            self.write(label);
        }
        self.write(";");
    }

    fn local_variable(
        &mut self,
        modifiers: &Modifiers,
        ty: NodeId,
        name: &str,
        initializer: Option<NodeId>,
    ) {
        self.modifiers(modifiers);
        self.ty(ty);
        self.write(" ");
        self.declarator(name, initializer);
    }

    fn declarator(&mut self, name: &str, initializer: Option<NodeId>) {
        self.write(name);
        if let Some(initializer) = initializer {
            self.write(" = ");
            self.expression(initializer, 0);
        }
    }

    fn catch_clause(&mut self, node: NodeId) {
        let NodeKind::Catch {
            name,
            modifiers,
            types,
            body,
        } = self.ast().kind(node)
        else {
            return;
        };
        self.write("catch (");
        self.modifiers(modifiers);
        for (index, ty) in types.iter().enumerate() {
            if index > 0 {
                self.write(" | ");
            }
            self.ty(*ty);
        }
        self.write(" ");
        self.write(name);
        self.write(") ");
        self.block(*body);
    }

    // ---- expressions ----

    fn precedence(&self, node: NodeId) -> u8 {
        match self.ast().kind(node) {
            NodeKind::Assignment { .. } => 1,
            NodeKind::Conditional { .. } => 2,
            NodeKind::Binary { kind, .. } => kind.precedence(),
            NodeKind::Unary { kind, .. } if kind.is_postfix() => POSTFIX,
            NodeKind::Unary { .. } | NodeKind::Cast { .. } => PREFIX,
            NodeKind::NewArray { .. } => POSTFIX,
            _ => PRIMARY,
        }
    }

    /// Print `node`, parenthesised if it binds looser than `min`.
    fn expression(&mut self, node: NodeId, min: u8) {
        let wrap = self.precedence(node) < min;
        if wrap {
            self.write("(");
        }
        self.expression_inner(node);
        if wrap {
            self.write(")");
        }
    }

    fn expression_inner(&mut self, node: NodeId) {
        let ast = self.ast();
        match ast.kind(node) {
            NodeKind::Literal(literal) => {
                let text = literal_text(literal);
                self.write(&text);
            }
            NodeKind::Name { name } => self.write(name),
            NodeKind::This => self.write("this"),
            NodeKind::Super => self.write("super"),
            NodeKind::FieldAccess { target, name } => {
                self.expression(*target, PRIMARY);
                self.write(".");
                self.write(name);
            }
            NodeKind::Invocation {
                target,
                name,
                arguments,
            } => {
                if let Some(target) = target {
                    self.expression(*target, PRIMARY);
                    self.write(".");
                }
                self.write(name);
                self.arguments(arguments);
            }
            NodeKind::New { ty, arguments } => {
                self.write("new ");
                self.ty(*ty);
                self.arguments(arguments);
            }
            NodeKind::NewArray {
                element,
                dimensions,
                extra_dimensions,
            } => {
                self.write("new ");
                self.ty(*element);
                for dimension in dimensions {
                    self.write("[");
                    self.expression(*dimension, 0);
                    self.write("]");
                }
                for _ in 0..*extra_dimensions {
                    self.write("[]");
                }
            }
            NodeKind::ArrayAccess { target, index } => {
                self.expression(*target, PRIMARY);
                self.write("[");
                self.expression(*index, 0);
                self.write("]");
            }
            NodeKind::Binary { kind, left, right } => {
                let precedence = kind.precedence();
                self.expression(*left, precedence);
                self.write(" ");
                self.write(kind.symbol());
                self.write(" ");
                if matches!(
                    ast.kind(*right),
                    NodeKind::TypeReference { .. } | NodeKind::WildcardType { .. }
                ) {
                    self.ty(*right);
                } else {
                    self.expression(*right, precedence + 1);
                }
            }
            NodeKind::Unary { kind, operand } => {
                if kind.is_postfix() {
                    self.expression(*operand, POSTFIX);
                    self.write(kind.symbol());
                } else {
                    let symbol = kind.symbol();
                    let text = self.capture(|p| p.expression(*operand, PREFIX));
                    self.write(symbol);
                    if text.starts_with(['+', '-']) && symbol.starts_with(['+', '-']) {
                        self.write(&format!("({text})"));
                    } else {
                        self.write(&text);
                    }
                }
            }
            NodeKind::Assignment {
                operator,
                target,
                value,
            } => {
                self.expression(*target, POSTFIX);
                match operator {
                    Some(kind) => self.write(&format!(" {}= ", kind.symbol())),
                    None => self.write(" = "),
                }
                self.expression(*value, 1);
            }
            NodeKind::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                self.expression(*condition, 3);
                self.write(" ? ");
                self.expression(*then_value, 1);
                self.write(" : ");
                self.expression(*else_value, 2);
            }
            NodeKind::Cast { ty, expression } => {
                self.write("(");
                self.ty(*ty);
                self.write(") ");
                let text = self.capture(|p| p.expression(*expression, PREFIX));
                if !is_primitive_type(ast, *ty) && text.starts_with(['+', '-']) {
                    self.write(&format!("({text})"));
                } else {
                    self.write(&text);
                }
            }
            NodeKind::Annotation { .. } => self.annotation(node),
            _ => self.node(node),
        }
    }

    fn arguments(&mut self, arguments: &[NodeId]) {
        self.write("(");
        self.comma_separated(arguments, |p, argument| p.expression(argument, 0));
        self.write(")");
    }
}

fn is_primitive_type(ast: &Ast, ty: NodeId) -> bool {
    matches!(
        ast.kind(ty),
        NodeKind::TypeReference { name, dimensions: 0, .. }
            if matches!(name.as_str(), "boolean" | "byte" | "char" | "short" | "int" | "long" | "float" | "double")
    )
}

fn literal_text(literal: &Literal) -> String {
    match literal {
        Literal::Int(value) if *value < 0 => format!("0x{:X}", *value as u32),
        Literal::Int(value) => value.to_string(),
        Literal::Long(value) if *value < 0 => format!("0x{:X}L", *value as u64),
        Literal::Long(value) => format!("{value}L"),
        Literal::Float(value) if value.is_nan() => "(0.0f / 0.0f)".to_string(),
        Literal::Float(value) if value.is_infinite() => {
            format!("({}1.0f / 0.0f)", if *value < 0.0 { "-" } else { "" })
        }
        Literal::Float(value) => format!("{value:?}f"),
        Literal::Double(value) if value.is_nan() => "(0.0 / 0.0)".to_string(),
        Literal::Double(value) if value.is_infinite() => {
            format!("({}1.0 / 0.0)", if *value < 0.0 { "-" } else { "" })
        }
        Literal::Double(value) => format!("{value:?}"),
        Literal::Char(c) => format!("'{}'", escape(&c.to_string(), '\'')),
        Literal::String(text) => format!("\"{}\"", escape(text, '"')),
        Literal::Boolean(value) => value.to_string(),
        Literal::Null => "null".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{HasBody, NodeVariant};
    use crate::syntax::{parse_expression, parse_source};

    fn round_trip(text: &str) -> String {
        let mut ast = Ast::new();
        let id = parse_expression(&mut ast, text).unwrap();
        print(&ast, id)
    }

    #[test]
    fn parentheses_follow_precedence() {
        assert_eq!(round_trip("(1 + 2) * 3"), "(1 + 2) * 3");
        assert_eq!(round_trip("1 + (2 * 3)"), "1 + 2 * 3");
        assert_eq!(round_trip("a - (b - c)"), "a - (b - c)");
        assert_eq!(round_trip("(a - b) - c"), "a - b - c");
        assert_eq!(round_trip("x = (y = 2)"), "x = y = 2");
        assert_eq!(round_trip("(a ? b : c) ? d : e"), "(a ? b : c) ? d : e");
    }

    #[test]
    fn nested_negation_keeps_parentheses() {
        assert_eq!(round_trip("-(-x)"), "-(-x)");
        assert_eq!(round_trip("- -x"), "-(-x)");
        assert_eq!(round_trip("-(--x)"), "-(--x)");
        assert_eq!(round_trip("!(!x)"), "!!x");
    }

    #[test]
    fn reference_casts_guard_signed_operands() {
        assert_eq!(round_trip("(Integer) (-x)"), "(Integer) (-x)");
        assert_eq!(round_trip("(int) -x"), "(int) -x");
    }

    #[test]
    fn literals_print_in_java_syntax() {
        assert_eq!(round_trip("-2147483648"), "0x80000000");
        assert_eq!(round_trip("10L"), "10L");
        assert_eq!(round_trip("1.5f"), "1.5f");
        assert_eq!(round_trip("2.0"), "2.0");
        assert_eq!(round_trip("'\\n'"), "'\\n'");
        assert_eq!(round_trip("\"a\\\"b\""), "\"a\\\"b\"");
    }

    #[test]
    fn prints_a_class_canonically() {
        let source = r#"package demo;
import java.util.List;
final public class Foo1 implements IFoo {
  // the answer
  public int m() { return 3 + 2; }
  private int counter = 0;
  void loop(int n) { for (int i = 0, j = 1; i < n; i++) { if (i > 2) break; else continue; } }
}"#;
        let mut ast = Ast::new();
        let unit = parse_source(&mut ast, "Foo1.java", source).unwrap();
        let printed = print_unit(&ast, unit);
        let expected = r#"package demo;

import java.util.List;

public final class Foo1 implements IFoo {
    // the answer
    public int m() {
        return 3 + 2;
    }

    private int counter = 0;

    void loop(int n) {
        for (int i = 0, j = 1; i < n; i++) {
            if (i > 2)
                break;
            else
                continue;
        }
    }
}
"#;
        assert_eq!(printed, expected);
    }

    #[test]
    fn dangling_else_is_braced() {
        let mut ast = Ast::new();
        let unit = parse_source(
            &mut ast,
            "D.java",
            "class D { void f() { if (a) { if (b) g(); } else h(); } }",
        )
        .unwrap();
        let method = ast.find_named(unit, NodeVariant::Method, "f").unwrap();
        let body = ast.kind(method).body().unwrap();
        let if_node = ast.children(body)[0];
        let NodeKind::If { then_branch, .. } = ast.kind(if_node).clone() else {
            panic!("expected if");
        };
        let inner = ast.children(then_branch)[0];
        let inner_copy = ast.clone_subtree(inner);
        ast.replace_node(then_branch, inner_copy).unwrap();
        let printed = print(&ast, if_node);
        assert!(printed.starts_with("if (a) {\n"), "{printed}");
        assert!(printed.contains("} else"), "{printed}");
    }

    #[test]
    fn method_header_omits_body() {
        let mut ast = Ast::new();
        let unit = parse_source(
            &mut ast,
            "H.java",
            "class H { @Deprecated public static <T> T pick(T a, String... rest) throws Exception { return a; } }",
        )
        .unwrap();
        let method = ast.find_named(unit, NodeVariant::Method, "pick").unwrap();
        assert_eq!(
            print_method_header(&ast, method),
            "public static <T> T pick(T a, String... rest) throws Exception"
        );
    }
}
