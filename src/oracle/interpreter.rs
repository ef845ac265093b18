//! Tree-walking evaluation of the supported Java subset.
//!
//! Integer arithmetic wraps like the JVM, division by zero throws
//! `ArithmeticException`, and `System.out` is captured per instance. String
//! `==` compares content. Unresolved names surface as compile errors when the
//! code referring to them runs.

use super::errors::OracleError;
use super::value::{Number, Object, Primitive, Slot, Value};
use super::{CompiledClass, Instance, Oracle};
use crate::ast::{
    Ast, BinaryOperatorKind, HasModifiers, Literal, ModifierKind, NodeId, NodeKind,
    UnaryOperatorKind,
};
use crate::syntax::parse_source;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Nested Java calls allowed before `StackOverflowError`.
const MAX_CALL_DEPTH: usize = 64;

/// Native stack one entry into the interpreter may consume before
/// `StackOverflowError`. Half of the 2 MiB a spawned thread gets by default.
const NATIVE_STACK_BUDGET: usize = 1 << 20;

/// Address of a local in the caller's frame.
#[inline(never)]
fn stack_address() -> usize {
    let marker = 0u8;
    std::hint::black_box(&marker) as *const u8 as usize
}

/// Built-in classes with a known superclass.
const BUILTIN_CLASSES: &[(&str, &str)] = &[
    ("Throwable", "Object"),
    ("Exception", "Throwable"),
    ("Error", "Throwable"),
    ("StackOverflowError", "Error"),
    ("RuntimeException", "Exception"),
    ("ArithmeticException", "RuntimeException"),
    ("IllegalArgumentException", "RuntimeException"),
    ("NumberFormatException", "IllegalArgumentException"),
    ("IllegalStateException", "RuntimeException"),
    ("NullPointerException", "RuntimeException"),
    ("UnsupportedOperationException", "RuntimeException"),
    ("ClassCastException", "RuntimeException"),
    ("NegativeArraySizeException", "RuntimeException"),
    ("IndexOutOfBoundsException", "RuntimeException"),
    ("ArrayIndexOutOfBoundsException", "IndexOutOfBoundsException"),
    ("StringIndexOutOfBoundsException", "IndexOutOfBoundsException"),
];

/// Classes whose static members are provided natively.
const NATIVE_STATIC_CLASSES: &[&str] = &[
    "Math", "Integer", "Long", "Double", "Float", "Boolean", "Character", "String", "System",
    "Object",
];

const VALUE_TYPES: &[&str] = &[
    "Object", "String", "CharSequence", "Comparable", "Number", "Integer", "Long", "Short",
    "Byte", "Double", "Float", "Boolean", "Character",
];

fn builtin_parent(name: &str) -> Option<&'static str> {
    BUILTIN_CLASSES
        .iter()
        .find(|(class, _)| *class == name)
        .map(|(_, parent)| *parent)
}

pub(crate) fn is_builtin_throwable(name: &str) -> bool {
    let mut current = name;
    while let Some(parent) = builtin_parent(current) {
        if current == "Throwable" {
            return true;
        }
        current = parent;
    }
    false
}

/// Last segment of a possibly qualified name.
fn simple(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn type_name(ast: &Ast, ty: NodeId) -> &str {
    match ast.kind(ty) {
        NodeKind::TypeReference { name, .. } => simple(name),
        _ => "Object",
    }
}

fn dimensions(ast: &Ast, ty: NodeId) -> u8 {
    match ast.kind(ty) {
        NodeKind::TypeReference { dimensions, .. } => *dimensions,
        _ => 0,
    }
}

fn primitive_of(ast: &Ast, ty: NodeId) -> Option<Primitive> {
    match ast.kind(ty) {
        NodeKind::TypeReference {
            name,
            dimensions: 0,
            ..
        } => Primitive::from_name(name),
        _ => None,
    }
}

fn primitive_of_value(value: &Value) -> Option<Primitive> {
    match value {
        Value::Boolean(_) => Some(Primitive::Boolean),
        Value::Char(_) => Some(Primitive::Char),
        Value::Int(_) => Some(Primitive::Int),
        Value::Long(_) => Some(Primitive::Long),
        Value::Float(_) => Some(Primitive::Float),
        Value::Double(_) => Some(Primitive::Double),
        _ => None,
    }
}

fn default_value(primitive: Option<Primitive>) -> Value {
    primitive.map(Primitive::default_value).unwrap_or(Value::Null)
}

fn literal(literal: &Literal) -> Value {
    match literal {
        Literal::Int(v) => Value::Int(*v),
        Literal::Long(v) => Value::Long(*v),
        Literal::Float(v) => Value::Float(*v),
        Literal::Double(v) => Value::Double(*v),
        Literal::Char(v) => Value::Char(*v),
        Literal::String(v) => Value::from(v.as_str()),
        Literal::Boolean(v) => Value::Boolean(*v),
        Literal::Null => Value::Null,
    }
}

fn is_static(ast: &Ast, member: NodeId) -> bool {
    ast.kind(member)
        .modifiers()
        .is_some_and(|mods| mods.contains(&ModifierKind::Static))
}

/// `name(int,String[])`, used to reject duplicate declarations.
fn signature(ast: &Ast, member: NodeId) -> String {
    let (name, parameters) = match ast.kind(member) {
        NodeKind::Method {
            name, parameters, ..
        }
        | NodeKind::Constructor {
            name, parameters, ..
        } => (name, parameters),
        _ => return String::new(),
    };
    let types: Vec<String> = parameters
        .iter()
        .map(|parameter| match ast.kind(*parameter) {
            NodeKind::Parameter { ty, varargs, .. } => {
                let dims = usize::from(dimensions(ast, *ty)) + usize::from(*varargs);
                format!("{}{}", type_name(ast, *ty), "[]".repeat(dims))
            }
            _ => String::new(),
        })
        .collect();
    format!("{name}({})", types.join(","))
}

fn parameters_of(ast: &Ast, member: NodeId) -> &[NodeId] {
    match ast.kind(member) {
        NodeKind::Method { parameters, .. } | NodeKind::Constructor { parameters, .. } => {
            parameters
        }
        _ => &[],
    }
}

fn is_varargs(ast: &Ast, parameter: NodeId) -> bool {
    matches!(ast.kind(parameter), NodeKind::Parameter { varargs: true, .. })
}

#[derive(Debug)]
struct ClassInfo {
    name: String,
    superclass: Option<String>,
    interfaces: Vec<String>,
    outer: Option<String>,
    is_interface: bool,
    is_abstract: bool,
    fields: Vec<NodeId>,
    methods: Vec<NodeId>,
    constructors: Vec<NodeId>,
}

impl ClassInfo {
    fn from_node(ast: &Ast, ty: NodeId) -> Result<Self, OracleError> {
        let (name, modifiers, superclass, interfaces, members, is_interface) = match ast.kind(ty) {
            NodeKind::Class {
                name,
                modifiers,
                superclass,
                interfaces,
                members,
                ..
            } => (name, modifiers, *superclass, interfaces, members, false),
            NodeKind::Interface {
                name,
                modifiers,
                extends,
                members,
                ..
            } => (name, modifiers, None, extends, members, true),
            _ => return Err(OracleError::compile("expected a class or interface")),
        };
        let mut info = ClassInfo {
            name: name.clone(),
            superclass: superclass.map(|sup| type_name(ast, sup).to_string()),
            interfaces: interfaces
                .iter()
                .map(|ty| type_name(ast, *ty).to_string())
                .collect(),
            outer: ast
                .enclosing_type(ty)
                .and_then(|outer| ast.simple_name(outer))
                .map(str::to_string),
            is_interface,
            is_abstract: modifiers.contains(&ModifierKind::Abstract),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        };

        let mut signatures = HashSet::new();
        for member in members {
            match ast.kind(*member) {
                NodeKind::Field { name: field, .. } => {
                    let duplicate = info
                        .fields
                        .iter()
                        .any(|existing| ast.simple_name(*existing) == Some(field.as_str()));
                    if duplicate {
                        return Err(OracleError::compile(format!(
                            "variable {field} is already defined in class {name}"
                        )));
                    }
                    info.fields.push(*member);
                }
                NodeKind::Method {
                    name: method,
                    modifiers,
                    body,
                    ..
                } => {
                    if !signatures.insert(signature(ast, *member)) {
                        return Err(OracleError::compile(format!(
                            "method {} is already defined in {name}",
                            signature(ast, *member)
                        )));
                    }
                    let bodiless_allowed = is_interface
                        || modifiers.contains(&ModifierKind::Abstract)
                        || modifiers.contains(&ModifierKind::Native);
                    if body.is_none() && !bodiless_allowed {
                        return Err(OracleError::compile(format!(
                            "missing method body in {name}.{method}"
                        )));
                    }
                    info.methods.push(*member);
                }
                NodeKind::Constructor { .. } => {
                    if !signatures.insert(signature(ast, *member)) {
                        return Err(OracleError::compile(format!(
                            "constructor {} is already defined in {name}",
                            signature(ast, *member)
                        )));
                    }
                    info.constructors.push(*member);
                }
                _ => {}
            }
        }
        Ok(info)
    }

    fn has_no_arg_constructor(&self, ast: &Ast) -> bool {
        self.constructors.is_empty()
            || self.constructors.iter().any(|ctor| {
                let parameters = parameters_of(ast, *ctor);
                parameters.is_empty() || (parameters.len() == 1 && is_varargs(ast, parameters[0]))
            })
    }
}

/// A parsed unit with its classes indexed by simple name.
#[derive(Debug)]
struct Program {
    ast: Ast,
    classes: HashMap<String, ClassInfo>,
    /// Declaration order, for static initialization.
    order: Vec<String>,
}

impl Program {
    /// Parse `source` and locate `qualified_name` in it. Returns the simple
    /// name of the target class.
    fn load(qualified_name: &str, source: &str) -> Result<(Self, String), OracleError> {
        let target = simple(qualified_name).to_string();
        let mut ast = Ast::new();
        let unit = parse_source(&mut ast, &format!("{target}.java"), source)
            .map_err(|err| OracleError::compile(err.to_string()))?;

        let types: Vec<NodeId> = ast
            .elements(unit, |ast: &Ast, node: NodeId| ast.variant(node).is_type())
            .collect();
        let mut classes = HashMap::new();
        let mut order = Vec::new();
        for ty in &types {
            let info = ClassInfo::from_node(&ast, *ty)?;
            if classes.contains_key(&info.name) {
                return Err(OracleError::compile(format!("duplicate class: {}", info.name)));
            }
            order.push(info.name.clone());
            classes.insert(info.name.clone(), info);
        }

        let found = types
            .iter()
            .any(|ty| ast.qualified_name(*ty).as_deref() == Some(qualified_name));
        if !found {
            return Err(OracleError::compile(format!(
                "class {qualified_name} not found in source"
            )));
        }
        Ok((Self { ast, classes, order }, target))
    }
}

/// Mutable state of one instance: statics, captured output and call depth.
#[derive(Debug, Default)]
struct State {
    statics: HashMap<String, HashMap<String, Slot>>,
    output: String,
    depth: usize,
    /// Stack address at the current entry into the interpreter.
    stack_base: Option<usize>,
}

impl State {
    fn begin(&mut self) {
        self.depth = 0;
        self.stack_base = Some(stack_address());
    }

    fn stack_used(&self) -> usize {
        self.stack_base
            .map_or(0, |base| base.abs_diff(stack_address()))
    }
}

enum Unwind {
    /// A Java exception in flight.
    Throw(Value),
    /// Something a compiler would have rejected.
    Fault(OracleError),
}

impl Unwind {
    fn into_error(self) -> OracleError {
        match self {
            Unwind::Throw(Value::Object(object)) => {
                let exception = if is_builtin_throwable(&object.class) {
                    format!("java.lang.{}", object.class)
                } else {
                    object.class.clone()
                };
                OracleError::Runtime {
                    exception,
                    message: object.message(),
                }
            }
            Unwind::Throw(other) => OracleError::Runtime {
                exception: other.type_name(),
                message: None,
            },
            Unwind::Fault(err) => err,
        }
    }
}

type Exec<T> = Result<T, Unwind>;

fn throw<T>(class: &str, message: impl Into<String>) -> Exec<T> {
    Err(Unwind::Throw(Object::exception(class, Some(message.into()))))
}

fn fault<T>(message: impl Into<String>) -> Exec<T> {
    Err(Unwind::Fault(OracleError::compile(message)))
}

fn null_pointer<T>(member: &str) -> Exec<T> {
    throw(
        "NullPointerException",
        format!("Cannot invoke \"{member}\" because value is null"),
    )
}

enum Flow {
    Normal,
    Return(Value),
    Break(Option<String>),
    Continue(Option<String>),
}

struct Frame<'a> {
    this: Option<Rc<Object>>,
    class: &'a str,
    scopes: Vec<HashMap<String, Slot>>,
}

impl<'a> Frame<'a> {
    fn new(this: Option<Rc<Object>>, class: &'a str) -> Self {
        Self {
            this,
            class,
            scopes: vec![HashMap::new()],
        }
    }

    fn lookup(&self, name: &str) -> Option<&Slot> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Slot> {
        self.scopes.iter_mut().rev().find_map(|scope| scope.get_mut(name))
    }

    fn declare(&mut self, name: &str, slot: Slot) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), slot);
        }
    }
}

enum Place<'a> {
    Local(&'a str),
    Field(Rc<Object>, &'a str),
    Static(&'a str, &'a str),
    Element(Rc<RefCell<Vec<Value>>>, usize),
}

#[derive(Clone, Copy)]
enum Stream {
    Out,
    Err,
}

struct Interp<'a> {
    program: &'a Program,
    ast: &'a Ast,
    state: &'a mut State,
}

impl<'a> Interp<'a> {
    fn new(program: &'a Program, state: &'a mut State) -> Self {
        Self {
            program,
            ast: &program.ast,
            state,
        }
    }

    fn class(&self, name: &str) -> Option<&'a ClassInfo> {
        self.program.classes.get(name)
    }

    /// `class` and its user-declared superclasses, nearest first.
    fn chain(&self, class: &str) -> Vec<&'a ClassInfo> {
        let mut chain = Vec::new();
        let mut current = self.class(class);
        while let Some(info) = current {
            if chain.iter().any(|seen: &&ClassInfo| seen.name == info.name) {
                break;
            }
            chain.push(info);
            current = info.superclass.as_deref().and_then(|sup| self.class(sup));
        }
        chain
    }

    fn is_subtype(&self, class: &str, target: &str) -> bool {
        let mut pending = vec![class];
        let mut seen = HashSet::new();
        while let Some(current) = pending.pop() {
            if current == target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(info) = self.class(current) {
                pending.extend(info.interfaces.iter().map(String::as_str));
                match &info.superclass {
                    Some(sup) => pending.push(sup),
                    None if !info.is_interface => pending.push("Object"),
                    None => {}
                }
            } else if let Some(parent) = builtin_parent(current) {
                pending.push(parent);
            }
        }
        target == "Object"
    }

    fn is_known_type(&self, name: &str) -> bool {
        Primitive::from_name(name).is_some()
            || self.class(name).is_some()
            || builtin_parent(name).is_some()
            || VALUE_TYPES.contains(&name)
    }

    fn is_instance(&self, value: &Value, name: &str) -> bool {
        match value {
            Value::Null | Value::Void => false,
            Value::Str(_) => matches!(name, "String" | "Object" | "CharSequence" | "Comparable"),
            Value::Boolean(_) => matches!(name, "Boolean" | "Object"),
            Value::Char(_) => matches!(name, "Character" | "Object"),
            Value::Int(_) => matches!(name, "Integer" | "Short" | "Byte" | "Number" | "Object"),
            Value::Long(_) => matches!(name, "Long" | "Number" | "Object"),
            Value::Float(_) => matches!(name, "Float" | "Number" | "Object"),
            Value::Double(_) => matches!(name, "Double" | "Number" | "Object"),
            Value::Object(object) => self.is_subtype(&object.class, name),
            Value::Array(_) => name == "Object",
        }
    }

    /// Whether `value` can be passed where `ty` is declared.
    fn accepts(&self, ty: NodeId, value: &Value) -> bool {
        if dimensions(self.ast, ty) > 0 {
            return matches!(value, Value::Array(_) | Value::Null);
        }
        if let Some(primitive) = primitive_of(self.ast, ty) {
            return match primitive {
                Primitive::Boolean => matches!(value, Value::Boolean(_)),
                Primitive::Char => matches!(value, Value::Char(_)),
                Primitive::Byte | Primitive::Short | Primitive::Int => {
                    matches!(value, Value::Int(_) | Value::Char(_))
                }
                Primitive::Long => matches!(value, Value::Int(_) | Value::Char(_) | Value::Long(_)),
                Primitive::Float => matches!(
                    value,
                    Value::Int(_) | Value::Char(_) | Value::Long(_) | Value::Float(_)
                ),
                Primitive::Double => Number::of(value).is_some(),
            };
        }
        let name = type_name(self.ast, ty);
        value.is_null() || self.is_instance(value, name) || !self.is_known_type(name)
    }

    /// Overload resolution: exact arity with compatible arguments, then
    /// applicable varargs, then exact arity alone.
    fn select(&self, candidates: &[NodeId], args: &[Value]) -> Option<NodeId> {
        let ast = self.ast;
        let compatible = |member: NodeId| {
            let parameters = parameters_of(ast, member);
            parameters.len() == args.len()
                && parameters.iter().zip(args).all(|(parameter, arg)| match ast.kind(*parameter) {
                    NodeKind::Parameter { ty, .. } => self.accepts(*ty, arg),
                    _ => false,
                })
        };
        let varargs = |member: NodeId| {
            let parameters = parameters_of(ast, member);
            parameters.last().is_some_and(|last| is_varargs(ast, *last))
                && args.len() + 1 >= parameters.len()
        };
        candidates
            .iter()
            .copied()
            .find(|member| compatible(*member))
            .or_else(|| candidates.iter().copied().find(|member| varargs(*member)))
            .or_else(|| {
                candidates
                    .iter()
                    .copied()
                    .find(|member| parameters_of(ast, *member).len() == args.len())
            })
    }

    /// Most specific declaration of `name` visible from `class`, searching
    /// superclasses and then default methods of interfaces.
    fn find_method(&self, class: &str, name: &str, args: &[Value]) -> Option<(&'a str, NodeId)> {
        let chain = self.chain(class);
        for &info in &chain {
            let candidates: Vec<NodeId> = info
                .methods
                .iter()
                .copied()
                .filter(|method| self.ast.simple_name(*method) == Some(name))
                .collect();
            if let Some(method) = self.select(&candidates, args) {
                return Some((info.name.as_str(), method));
            }
        }
        let mut interfaces: Vec<&str> = chain
            .iter()
            .flat_map(|&info| info.interfaces.iter().map(String::as_str))
            .collect();
        let mut seen = HashSet::new();
        while let Some(interface) = interfaces.pop() {
            if !seen.insert(interface) {
                continue;
            }
            let Some(info) = self.class(interface) else {
                continue;
            };
            let candidates: Vec<NodeId> = info
                .methods
                .iter()
                .copied()
                .filter(|method| {
                    self.ast.simple_name(*method) == Some(name)
                        && matches!(self.ast.kind(*method), NodeKind::Method { body: Some(_), .. })
                })
                .collect();
            if let Some(method) = self.select(&candidates, args) {
                return Some((info.name.as_str(), method));
            }
            interfaces.extend(info.interfaces.iter().map(String::as_str));
        }
        None
    }

    // ---- variables ----

    fn field_of_this(frame: &Frame<'a>, name: &str) -> Option<Value> {
        frame.this.as_ref().and_then(|this| this.field(name))
    }

    /// Class declaring static `name`, searching superclasses and then
    /// enclosing classes.
    fn static_owner(&self, class: &str, name: &str) -> Option<&'a str> {
        let mut scope = self.class(class);
        while let Some(info) = scope {
            for declaring in self.chain(&info.name) {
                let declares = self
                    .state
                    .statics
                    .get(&declaring.name)
                    .is_some_and(|fields| fields.contains_key(name));
                if declares {
                    return Some(declaring.name.as_str());
                }
            }
            scope = info.outer.as_deref().and_then(|outer| self.class(outer));
        }
        None
    }

    fn is_variable(&self, frame: &Frame<'a>, name: &str) -> bool {
        frame.lookup(name).is_some()
            || Self::field_of_this(frame, name).is_some()
            || self.static_owner(frame.class, name).is_some()
    }

    /// The class named by `expr` when it is used as a qualifier.
    fn class_receiver(&self, frame: &Frame<'a>, expr: NodeId) -> Option<&'a str> {
        let NodeKind::Name { name } = self.ast.kind(expr) else {
            return None;
        };
        if self.is_variable(frame, name) {
            return None;
        }
        let is_class = self.class(name).is_some()
            || NATIVE_STATIC_CLASSES.contains(&name.as_str())
            || builtin_parent(name).is_some();
        is_class.then_some(name.as_str())
    }

    fn read_name(&self, frame: &Frame<'a>, name: &str) -> Exec<Value> {
        if let Some(slot) = frame.lookup(name) {
            return Ok(slot.value.clone());
        }
        if let Some(value) = Self::field_of_this(frame, name) {
            return Ok(value);
        }
        match self.static_owner(frame.class, name) {
            Some(owner) => self.read_static(owner, name),
            None => fault(format!("cannot find symbol: variable {name}")),
        }
    }

    fn read_static(&self, class: &str, name: &str) -> Exec<Value> {
        if let Some(slot) = self.state.statics.get(class).and_then(|fields| fields.get(name)) {
            return Ok(slot.value.clone());
        }
        let value = match (class, name) {
            ("Integer", "MAX_VALUE") => Value::Int(i32::MAX),
            ("Integer", "MIN_VALUE") => Value::Int(i32::MIN),
            ("Long", "MAX_VALUE") => Value::Long(i64::MAX),
            ("Long", "MIN_VALUE") => Value::Long(i64::MIN),
            ("Double", "MAX_VALUE") => Value::Double(f64::MAX),
            ("Double", "NaN") => Value::Double(f64::NAN),
            ("Math", "PI") => Value::Double(std::f64::consts::PI),
            ("Math", "E") => Value::Double(std::f64::consts::E),
            _ => return fault(format!("cannot find symbol: variable {class}.{name}")),
        };
        Ok(value)
    }

    fn place(&mut self, frame: &mut Frame<'a>, target: NodeId) -> Exec<Place<'a>> {
        let ast = self.ast;
        match ast.kind(target) {
            NodeKind::Name { name } => {
                if frame.lookup(name).is_some() {
                    return Ok(Place::Local(name));
                }
                if let Some(this) = &frame.this {
                    if this.field(name).is_some() {
                        return Ok(Place::Field(Rc::clone(this), name));
                    }
                }
                match self.static_owner(frame.class, name) {
                    Some(owner) => Ok(Place::Static(owner, name)),
                    None => fault(format!("cannot find symbol: variable {name}")),
                }
            }
            NodeKind::FieldAccess { target, name } => {
                if let Some(class) = self.class_receiver(frame, *target) {
                    return match self.static_owner(class, name) {
                        Some(owner) => Ok(Place::Static(owner, name)),
                        None => fault(format!("cannot assign a value to {class}.{name}")),
                    };
                }
                match self.eval(frame, *target)? {
                    Value::Object(object) if object.field(name).is_some() => {
                        Ok(Place::Field(object, name))
                    }
                    Value::Null => null_pointer(name),
                    other => fault(format!(
                        "cannot find symbol: variable {name} in {}",
                        other.type_name()
                    )),
                }
            }
            NodeKind::ArrayAccess { target, index } => {
                let array = self.eval(frame, *target)?;
                let index = self.eval(frame, *index)?;
                let (array, index) = self.element(array, index)?;
                Ok(Place::Element(array, index))
            }
            _ => fault(format!("unexpected assignment target {}", ast.variant(target))),
        }
    }

    /// Bounds-checked array element address.
    fn element(&self, array: Value, index: Value) -> Exec<(Rc<RefCell<Vec<Value>>>, usize)> {
        let array = match array {
            Value::Array(array) => array,
            Value::Null => return null_pointer("array access"),
            other => {
                return fault(format!("array required, but {} found", other.type_name()))
            }
        };
        let Some(index) = Number::of(&index).and_then(|n| match n {
            Number::Int(i) => Some(i),
            _ => None,
        }) else {
            return fault("array index must be an int");
        };
        let len = array.borrow().len();
        match usize::try_from(index) {
            Ok(i) if i < len => Ok((array, i)),
            _ => throw(
                "ArrayIndexOutOfBoundsException",
                format!("Index {index} out of bounds for length {len}"),
            ),
        }
    }

    fn read_place(&self, frame: &Frame<'a>, place: &Place<'a>) -> Exec<Value> {
        match place {
            Place::Local(name) => self.read_name(frame, name),
            Place::Field(object, name) => match object.field(name) {
                Some(value) => Ok(value),
                None => fault(format!("cannot find symbol: variable {name}")),
            },
            Place::Static(class, name) => self.read_static(class, name),
            Place::Element(array, index) => Ok(array.borrow()[*index].clone()),
        }
    }

    /// Store `value`, converting it to the slot's type; returns what was
    /// stored.
    fn write_place(&mut self, frame: &mut Frame<'a>, place: Place<'a>, value: Value) -> Exec<Value> {
        let slot = match &place {
            Place::Local(name) => frame.lookup_mut(name).map(|slot| {
                slot.store(value.clone());
                slot.value.clone()
            }),
            Place::Field(object, name) => object.fields.borrow_mut().get_mut(*name).map(|slot| {
                slot.store(value.clone());
                slot.value.clone()
            }),
            Place::Static(class, name) => self
                .state
                .statics
                .get_mut(*class)
                .and_then(|fields| fields.get_mut(*name))
                .map(|slot| {
                    slot.store(value.clone());
                    slot.value.clone()
                }),
            Place::Element(array, index) => {
                let mut items = array.borrow_mut();
                let primitive = primitive_of_value(&items[*index]);
                items[*index] = value.clone().convert(primitive);
                Some(items[*index].clone())
            }
        };
        match slot {
            Some(stored) => Ok(stored),
            None => fault("cannot assign a value to an undeclared variable"),
        }
    }

    // ---- statements ----

    fn scoped<T>(
        &mut self,
        frame: &mut Frame<'a>,
        f: impl FnOnce(&mut Self, &mut Frame<'a>) -> Exec<T>,
    ) -> Exec<T> {
        frame.scopes.push(HashMap::new());
        let result = f(self, frame);
        frame.scopes.pop();
        result
    }

    fn exec_all(&mut self, frame: &mut Frame<'a>, statements: &'a [NodeId]) -> Exec<Flow> {
        for statement in statements {
            match self.exec(frame, *statement)? {
                Flow::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Flow::Normal)
    }

    fn condition(&mut self, frame: &mut Frame<'a>, expr: NodeId) -> Exec<bool> {
        match self.eval(frame, expr)? {
            Value::Boolean(value) => Ok(value),
            other => fault(format!(
                "incompatible types: {} cannot be converted to boolean",
                other.type_name()
            )),
        }
    }

    /// Run a loop body. `None` means keep looping.
    fn loop_body(&mut self, frame: &mut Frame<'a>, body: NodeId) -> Exec<Option<Flow>> {
        Ok(match self.exec(frame, body)? {
            Flow::Normal | Flow::Continue(None) => None,
            Flow::Break(None) => Some(Flow::Normal),
            abrupt => Some(abrupt),
        })
    }

    fn exec(&mut self, frame: &mut Frame<'a>, statement: NodeId) -> Exec<Flow> {
        let ast = self.ast;
        match ast.kind(statement) {
            NodeKind::Block { statements } => {
                self.scoped(frame, |this, frame| this.exec_all(frame, statements))
            }
            NodeKind::LocalVariable {
                name,
                ty,
                initializer,
                ..
            } => {
                let primitive = primitive_of(ast, *ty);
                let value = match initializer {
                    Some(init) => self.eval(frame, *init)?,
                    None => default_value(primitive),
                };
                frame.declare(name, Slot::new(value, primitive));
                Ok(Flow::Normal)
            }
            NodeKind::ExpressionStatement { expression } => {
                self.eval(frame, *expression)?;
                Ok(Flow::Normal)
            }
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.condition(frame, *condition)? {
                    self.exec(frame, *then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec(frame, *else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            NodeKind::While { condition, body } => {
                while self.condition(frame, *condition)? {
                    if let Some(flow) = self.loop_body(frame, *body)? {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Normal)
            }
            NodeKind::DoWhile { body, condition } => loop {
                if let Some(flow) = self.loop_body(frame, *body)? {
                    return Ok(flow);
                }
                if !self.condition(frame, *condition)? {
                    return Ok(Flow::Normal);
                }
            },
            NodeKind::For {
                init,
                condition,
                update,
                body,
            } => self.scoped(frame, |this, frame| {
                for item in init {
                    this.exec(frame, *item)?;
                }
                loop {
                    if let Some(condition) = condition {
                        if !this.condition(frame, *condition)? {
                            return Ok(Flow::Normal);
                        }
                    }
                    if let Some(flow) = this.loop_body(frame, *body)? {
                        return Ok(flow);
                    }
                    for expression in update {
                        this.eval(frame, *expression)?;
                    }
                }
            }),
            NodeKind::ForEach {
                variable,
                iterable,
                body,
            } => {
                let items = match self.eval(frame, *iterable)? {
                    Value::Array(items) => items.borrow().clone(),
                    Value::Null => return null_pointer("iterator()"),
                    other => {
                        return fault(format!(
                            "for-each not applicable to expression type {}",
                            other.type_name()
                        ))
                    }
                };
                let NodeKind::LocalVariable { name, ty, .. } = ast.kind(*variable) else {
                    return fault("malformed for-each variable");
                };
                let primitive = primitive_of(ast, *ty);
                for item in items {
                    let flow = self.scoped(frame, |this, frame| {
                        frame.declare(name, Slot::new(item, primitive));
                        this.loop_body(frame, *body)
                    })?;
                    if let Some(flow) = flow {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Normal)
            }
            NodeKind::Return { value } => {
                let value = match value {
                    Some(value) => self.eval(frame, *value)?,
                    None => Value::Void,
                };
                Ok(Flow::Return(value))
            }
            NodeKind::Throw { value } => match self.eval(frame, *value)? {
                Value::Object(object) if self.is_subtype(&object.class, "Throwable") => {
                    Err(Unwind::Throw(Value::Object(object)))
                }
                Value::Null => null_pointer("throw"),
                other => fault(format!(
                    "incompatible types: {} cannot be converted to Throwable",
                    other.type_name()
                )),
            },
            NodeKind::Break { label } => Ok(Flow::Break(label.clone())),
            NodeKind::Continue { label } => Ok(Flow::Continue(label.clone())),
            NodeKind::Try {
                body,
                catchers,
                finalizer,
            } => {
                let mut outcome = self.exec(frame, *body);
                if let Err(Unwind::Throw(exception)) = &outcome {
                    let exception = exception.clone();
                    if let Some((name, handler)) = self.matching_catch(catchers, &exception) {
                        outcome = self.scoped(frame, |this, frame| {
                            frame.declare(name, Slot::new(exception, None));
                            this.exec(frame, handler)
                        });
                    }
                }
                if let Some(finalizer) = finalizer {
                    match self.exec(frame, *finalizer)? {
                        Flow::Normal => {}
                        abrupt => return Ok(abrupt),
                    }
                }
                outcome
            }
            NodeKind::Empty => Ok(Flow::Normal),
            _ => fault(format!("not a statement: {}", ast.variant(statement))),
        }
    }

    fn matching_catch(&self, catchers: &'a [NodeId], exception: &Value) -> Option<(&'a str, NodeId)> {
        catchers.iter().find_map(|catcher| match self.ast.kind(*catcher) {
            NodeKind::Catch { name, types, body, .. } => types
                .iter()
                .any(|ty| self.is_instance(exception, type_name(self.ast, *ty)))
                .then_some((name.as_str(), *body)),
            _ => None,
        })
    }

    // ---- expressions ----

    fn eval_all(&mut self, frame: &mut Frame<'a>, expressions: &'a [NodeId]) -> Exec<Vec<Value>> {
        let mut values = Vec::with_capacity(expressions.len());
        for expression in expressions {
            values.push(self.eval(frame, *expression)?);
        }
        Ok(values)
    }

    fn eval(&mut self, frame: &mut Frame<'a>, expr: NodeId) -> Exec<Value> {
        let ast = self.ast;
        match ast.kind(expr) {
            NodeKind::Literal(value) => Ok(literal(value)),
            NodeKind::Name { name } => self.read_name(frame, name),
            NodeKind::This => match &frame.this {
                Some(this) => Ok(Value::Object(Rc::clone(this))),
                None => fault("non-static variable this cannot be referenced from a static context"),
            },
            NodeKind::FieldAccess { target, name } => {
                if let Some(class) = self.class_receiver(frame, *target) {
                    return match self.static_owner(class, name) {
                        Some(owner) => self.read_static(owner, name),
                        None => self.read_static(class, name),
                    };
                }
                match self.eval(frame, *target)? {
                    Value::Object(object) => match object.field(name) {
                        Some(value) => Ok(value),
                        None => fault(format!("cannot find symbol: variable {name}")),
                    },
                    Value::Array(items) if name == "length" => {
                        Ok(Value::Int(items.borrow().len() as i32))
                    }
                    Value::Null => null_pointer(name),
                    other => fault(format!(
                        "cannot find symbol: variable {name} in {}",
                        other.type_name()
                    )),
                }
            }
            NodeKind::Invocation {
                target,
                name,
                arguments,
            } => self.invocation(frame, *target, name, arguments),
            NodeKind::New { ty, arguments } => {
                let args = self.eval_all(frame, arguments)?;
                self.instantiate(type_name(ast, *ty), args)
            }
            NodeKind::NewArray {
                element,
                dimensions: sizes,
                extra_dimensions,
            } => {
                let mut lengths = Vec::with_capacity(sizes.len());
                for size in self.eval_all(frame, sizes)? {
                    let length = match size {
                        Value::Int(n) => n,
                        Value::Char(c) => c as i32,
                        other => {
                            return fault(format!(
                                "incompatible types: {} cannot be converted to int",
                                other.type_name()
                            ))
                        }
                    };
                    match usize::try_from(length) {
                        Ok(length) => lengths.push(length),
                        Err(_) => return throw("NegativeArraySizeException", length.to_string()),
                    }
                }
                let leaf = if *extra_dimensions > 0 {
                    Value::Null
                } else {
                    default_value(primitive_of(ast, *element))
                };
                Ok(make_array(&lengths, &leaf))
            }
            NodeKind::ArrayAccess { target, index } => {
                let array = self.eval(frame, *target)?;
                let index = self.eval(frame, *index)?;
                let (array, index) = self.element(array, index)?;
                let value = array.borrow()[index].clone();
                Ok(value)
            }
            NodeKind::Binary { kind, left, right } => match kind {
                BinaryOperatorKind::And => Ok(Value::Boolean(
                    self.condition(frame, *left)? && self.condition(frame, *right)?,
                )),
                BinaryOperatorKind::Or => Ok(Value::Boolean(
                    self.condition(frame, *left)? || self.condition(frame, *right)?,
                )),
                BinaryOperatorKind::InstanceOf => {
                    let value = self.eval(frame, *left)?;
                    let matches = if dimensions(ast, *right) > 0 {
                        matches!(value, Value::Array(_))
                    } else {
                        self.is_instance(&value, type_name(ast, *right))
                    };
                    Ok(Value::Boolean(matches))
                }
                _ => {
                    let lhs = self.eval(frame, *left)?;
                    let rhs = self.eval(frame, *right)?;
                    self.binary(*kind, lhs, rhs)
                }
            },
            NodeKind::Unary { kind, operand } => {
                if kind.is_update() {
                    let place = self.place(frame, *operand)?;
                    let old = self.read_place(frame, &place)?;
                    let step = match kind {
                        UnaryOperatorKind::PreInc | UnaryOperatorKind::PostInc => {
                            BinaryOperatorKind::Plus
                        }
                        _ => BinaryOperatorKind::Minus,
                    };
                    let updated = self.binary(step, old.clone(), Value::Int(1))?;
                    let stored = self.write_place(frame, place, updated)?;
                    Ok(if kind.is_postfix() { old } else { stored })
                } else {
                    let value = self.eval(frame, *operand)?;
                    unary(*kind, value)
                }
            }
            NodeKind::Assignment {
                operator,
                target,
                value,
            } => {
                let place = self.place(frame, *target)?;
                let value = match operator {
                    None => self.eval(frame, *value)?,
                    Some(kind) => {
                        let old = self.read_place(frame, &place)?;
                        let rhs = self.eval(frame, *value)?;
                        self.binary(*kind, old, rhs)?
                    }
                };
                self.write_place(frame, place, value)
            }
            NodeKind::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                if self.condition(frame, *condition)? {
                    self.eval(frame, *then_value)
                } else {
                    self.eval(frame, *else_value)
                }
            }
            NodeKind::Cast { ty, expression } => {
                let value = self.eval(frame, *expression)?;
                self.cast(*ty, value)
            }
            _ => fault(format!("not an expression: {}", ast.variant(expr))),
        }
    }

    fn cast(&self, ty: NodeId, value: Value) -> Exec<Value> {
        if let Some(primitive) = primitive_of(self.ast, ty) {
            let convertible = if primitive == Primitive::Boolean {
                matches!(value, Value::Boolean(_))
            } else {
                Number::of(&value).is_some()
            };
            if !convertible {
                return fault(format!(
                    "incompatible types: {} cannot be converted to {}",
                    value.type_name(),
                    type_name(self.ast, ty)
                ));
            }
            return Ok(value.convert(Some(primitive)));
        }
        let target = type_name(self.ast, ty);
        let fits = if dimensions(self.ast, ty) > 0 {
            matches!(value, Value::Array(_) | Value::Null)
        } else {
            value.is_null() || self.is_instance(&value, target) || !self.is_known_type(target)
        };
        if fits {
            Ok(value)
        } else {
            throw(
                "ClassCastException",
                format!("class {} cannot be cast to class {target}", value.type_name()),
            )
        }
    }

    fn binary(&mut self, kind: BinaryOperatorKind, lhs: Value, rhs: Value) -> Exec<Value> {
        use BinaryOperatorKind as Op;
        if kind == Op::Plus && (matches!(lhs, Value::Str(_)) || matches!(rhs, Value::Str(_))) {
            let mut text = self.stringify(lhs)?;
            text.push_str(&self.stringify(rhs)?);
            return Ok(Value::string(text));
        }
        match kind {
            Op::Eq => Ok(Value::Boolean(lhs == rhs)),
            Op::Ne => Ok(Value::Boolean(lhs != rhs)),
            Op::And | Op::Or | Op::BitAnd | Op::BitOr | Op::BitXor
                if matches!((&lhs, &rhs), (Value::Boolean(_), Value::Boolean(_))) =>
            {
                let (Value::Boolean(a), Value::Boolean(b)) = (lhs, rhs) else {
                    return fault("bad operand types for boolean operator");
                };
                Ok(Value::Boolean(match kind {
                    Op::And | Op::BitAnd => a & b,
                    Op::Or | Op::BitOr => a | b,
                    _ => a ^ b,
                }))
            }
            _ => {
                let (Some(a), Some(b)) = (Number::of(&lhs), Number::of(&rhs)) else {
                    return fault(format!(
                        "bad operand types for binary operator '{}': {} and {}",
                        kind.symbol(),
                        lhs.type_name(),
                        rhs.type_name()
                    ));
                };
                numeric(kind, a, b)
            }
        }
    }

    /// `String.valueOf`, calling user `toString` overrides.
    fn stringify(&mut self, value: Value) -> Exec<String> {
        if let Value::Object(object) = &value {
            if let Some((owner, method)) = self.find_method(&object.class, "toString", &[]) {
                let result =
                    self.run_method(Some(Rc::clone(object)), owner, method, Vec::new())?;
                return Ok(result.to_string());
            }
        }
        Ok(value.to_string())
    }

    // ---- calls ----

    fn print_stream(&self, frame: &Frame<'a>, target: NodeId) -> Option<Stream> {
        let NodeKind::FieldAccess { target, name } = self.ast.kind(target) else {
            return None;
        };
        if self.class_receiver(frame, *target) != Some("System") {
            return None;
        }
        match name.as_str() {
            "out" => Some(Stream::Out),
            "err" => Some(Stream::Err),
            _ => None,
        }
    }

    fn print(&mut self, stream: Stream, method: &str, args: Vec<Value>) -> Exec<Value> {
        let mut text = match (method, args.len()) {
            ("println", 0) => String::new(),
            ("println" | "print", 1) => {
                let Some(value) = args.into_iter().next() else {
                    return fault("missing argument");
                };
                self.stringify(value)?
            }
            ("flush", 0) => return Ok(Value::Void),
            _ => return fault(format!("cannot find symbol: method PrintStream.{method}")),
        };
        if method == "println" {
            text.push('\n');
        }
        match stream {
            Stream::Out => self.state.output.push_str(&text),
            Stream::Err => tracing::debug!(stderr = %text.trim_end(), "program wrote to System.err"),
        }
        Ok(Value::Void)
    }

    fn invocation(
        &mut self,
        frame: &mut Frame<'a>,
        target: Option<NodeId>,
        name: &'a str,
        arguments: &'a [NodeId],
    ) -> Exec<Value> {
        let Some(target) = target else {
            if name == "this" || name == "super" {
                return fault(format!("call to {name} must be first statement in constructor"));
            }
            let args = self.eval_all(frame, arguments)?;
            return self.call_unqualified(frame, name, args);
        };
        if let Some(stream) = self.print_stream(frame, target) {
            let args = self.eval_all(frame, arguments)?;
            return self.print(stream, name, args);
        }
        if matches!(self.ast.kind(target), NodeKind::Super) {
            let Some(this) = frame.this.clone() else {
                return fault("non-static variable super cannot be referenced from a static context");
            };
            let args = self.eval_all(frame, arguments)?;
            let parent = self
                .class(frame.class)
                .and_then(|info| info.superclass.as_deref())
                .unwrap_or("Object");
            return match self.find_method(parent, name, &args) {
                Some((owner, method)) => self.run_method(Some(this), owner, method, args),
                None => self.object_method(&this, name, args),
            };
        }
        if let Some(class) = self.class_receiver(frame, target) {
            let args = self.eval_all(frame, arguments)?;
            return self.call_static(class, name, args);
        }
        let receiver = self.eval(frame, target)?;
        let args = self.eval_all(frame, arguments)?;
        self.call_on(receiver, name, args)
    }

    fn call_unqualified(&mut self, frame: &Frame<'a>, name: &str, args: Vec<Value>) -> Exec<Value> {
        let start = frame
            .this
            .as_ref()
            .map(|this| this.class.clone())
            .unwrap_or_else(|| frame.class.to_string());
        if let Some((owner, method)) = self
            .find_method(&start, name, &args)
            .or_else(|| self.find_method(frame.class, name, &args))
        {
            let receiver = if is_static(self.ast, method) {
                None
            } else {
                match &frame.this {
                    Some(this) => Some(Rc::clone(this)),
                    None => {
                        return fault(format!(
                            "non-static method {name} cannot be referenced from a static context"
                        ))
                    }
                }
            };
            return self.run_method(receiver, owner, method, args);
        }
        let mut outer = self.class(frame.class).and_then(|info| info.outer.as_deref());
        while let Some(class) = outer {
            if let Some((owner, method)) = self.find_method(class, name, &args) {
                if is_static(self.ast, method) {
                    return self.run_method(None, owner, method, args);
                }
            }
            outer = self.class(class).and_then(|info| info.outer.as_deref());
        }
        if let Some(this) = frame.this.clone() {
            return self.object_method(&this, name, args);
        }
        fault(format!("cannot find symbol: method {name}"))
    }

    fn call_on(&mut self, receiver: Value, name: &str, args: Vec<Value>) -> Exec<Value> {
        match receiver {
            Value::Object(object) => {
                let class = object.class.clone();
                match self.find_method(&class, name, &args) {
                    Some((owner, method)) => self.run_method(Some(object), owner, method, args),
                    None => self.object_method(&object, name, args),
                }
            }
            Value::Str(text) => self.string_method(&text, name, args),
            Value::Null => null_pointer(&format!("{name}()")),
            Value::Array(_) => fault(format!("cannot find symbol: method {name} on array")),
            Value::Void => fault("'void' type not allowed here"),
            boxed => self.boxed_method(boxed, name, args),
        }
    }

    /// Methods every object inherits.
    fn object_method(&mut self, object: &Rc<Object>, name: &str, args: Vec<Value>) -> Exec<Value> {
        let throwable = self.is_subtype(&object.class, "Throwable");
        match (name, args.as_slice()) {
            ("getMessage" | "getLocalizedMessage", []) if throwable => {
                Ok(object.message().map(Value::string).unwrap_or(Value::Null))
            }
            ("toString", []) => Ok(Value::string(self.describe(object))),
            ("hashCode", []) => Ok(Value::Int(object.id as i32)),
            ("equals", [other]) => Ok(Value::Boolean(
                matches!(other, Value::Object(o) if Rc::ptr_eq(o, object)),
            )),
            _ => fault(format!("cannot find symbol: method {name} in {}", object.class)),
        }
    }

    /// Default `toString` of an object.
    fn describe(&self, object: &Object) -> String {
        if self.is_subtype(&object.class, "Throwable") && !is_builtin_throwable(&object.class) {
            return match object.message() {
                Some(message) => format!("{}: {message}", object.class),
                None => object.class.clone(),
            };
        }
        object.to_string()
    }

    fn string_method(&mut self, text: &str, name: &str, args: Vec<Value>) -> Exec<Value> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len() as i32;
        let slice = |from: i32, to: i32| -> Exec<Value> {
            if from < 0 || to > len || from > to {
                return throw(
                    "StringIndexOutOfBoundsException",
                    format!("begin {from}, end {to}, length {len}"),
                );
            }
            Ok(Value::string(
                chars[from as usize..to as usize].iter().collect::<String>(),
            ))
        };
        let value = match (name, args.as_slice()) {
            ("length", []) => Value::Int(len),
            ("isEmpty", []) => Value::Boolean(text.is_empty()),
            ("equals", [other]) => Value::Boolean(other.as_str() == Some(text)),
            ("equalsIgnoreCase", [other]) => Value::Boolean(
                other
                    .as_str()
                    .is_some_and(|other| other.to_lowercase() == text.to_lowercase()),
            ),
            ("charAt", [Value::Int(index)]) => match usize::try_from(*index)
                .ok()
                .and_then(|i| chars.get(i))
            {
                Some(c) => Value::Char(*c),
                None => {
                    return throw(
                        "StringIndexOutOfBoundsException",
                        format!("Index {index} out of bounds for length {len}"),
                    )
                }
            },
            ("concat", [Value::Str(other)]) => Value::string(format!("{text}{other}")),
            ("contains", [Value::Str(other)]) => Value::Boolean(text.contains(&**other)),
            ("startsWith", [Value::Str(other)]) => Value::Boolean(text.starts_with(&**other)),
            ("endsWith", [Value::Str(other)]) => Value::Boolean(text.ends_with(&**other)),
            ("indexOf", [Value::Str(other)]) => Value::Int(
                text.find(&**other)
                    .map(|byte| text[..byte].chars().count() as i32)
                    .unwrap_or(-1),
            ),
            ("substring", [Value::Int(from)]) => return slice(*from, len),
            ("substring", [Value::Int(from), Value::Int(to)]) => return slice(*from, *to),
            ("trim", []) => Value::string(text.trim_matches(|c: char| c <= ' ')),
            ("toUpperCase", []) => Value::string(text.to_uppercase()),
            ("toLowerCase", []) => Value::string(text.to_lowercase()),
            ("toString" | "intern", []) => Value::from(text),
            ("hashCode", []) => Value::Int(
                text.encode_utf16()
                    .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit))),
            ),
            ("compareTo", [Value::Str(other)]) => Value::Int(compare_strings(text, other)),
            _ => return fault(format!("cannot find symbol: method String.{name}")),
        };
        Ok(value)
    }

    /// Methods on boxed primitives.
    fn boxed_method(&mut self, value: Value, name: &str, args: Vec<Value>) -> Exec<Value> {
        let number = Number::of(&value);
        match (name, args.as_slice(), number) {
            ("toString", [], _) => Ok(Value::string(value.to_string())),
            ("equals", [other], _) => Ok(Value::Boolean(
                other.type_name() == value.type_name() && *other == value,
            )),
            ("hashCode", [], Some(Number::Int(v))) => Ok(Value::Int(v)),
            ("hashCode", [], Some(Number::Long(v))) => Ok(Value::Int((v ^ (v >> 32)) as i32)),
            ("intValue", [], Some(n)) => Ok(Value::Int(n.to_i32())),
            ("longValue", [], Some(n)) => Ok(Value::Long(n.to_i64())),
            ("doubleValue", [], Some(n)) => Ok(Value::Double(n.to_f64())),
            ("booleanValue", [], None) if matches!(value, Value::Boolean(_)) => Ok(value),
            ("compareTo", [other], Some(a)) => match Number::of(other).and_then(|b| compare(a, b)) {
                Some(ordering) => Ok(Value::Int(ordering as i32)),
                None => fault("incomparable types"),
            },
            _ => fault(format!(
                "cannot find symbol: method {name} in {}",
                value.type_name()
            )),
        }
    }

    fn call_static(&mut self, class: &'a str, name: &str, args: Vec<Value>) -> Exec<Value> {
        if self.class(class).is_some() {
            return match self.find_method(class, name, &args) {
                Some((owner, method)) if is_static(self.ast, method) => {
                    self.run_method(None, owner, method, args)
                }
                Some(_) => fault(format!(
                    "non-static method {name} cannot be referenced from a static context"
                )),
                None => fault(format!("cannot find symbol: method {class}.{name}")),
            };
        }
        let number = |index: usize| args.get(index).and_then(Number::of);
        let parse_failure = |text: &str| -> Exec<Value> {
            throw(
                "NumberFormatException",
                format!("For input string: \"{text}\""),
            )
        };
        match (class, name, args.len()) {
            ("Math", "max" | "min", 2) => {
                let (Some(a), Some(b)) = (number(0), number(1)) else {
                    return fault(format!("bad arguments for Math.{name}"));
                };
                let (a, b) = Number::promote(a, b);
                let pick_first = match compare(a, b) {
                    Some(Ordering::Greater) => name == "max",
                    Some(Ordering::Less) => name == "min",
                    _ => true,
                };
                let chosen = if pick_first { a } else { b };
                Ok(chosen.into_value())
            }
            ("Math", "abs", 1) => match number(0) {
                Some(Number::Int(v)) => Ok(Value::Int(v.wrapping_abs())),
                Some(Number::Long(v)) => Ok(Value::Long(v.wrapping_abs())),
                Some(Number::Float(v)) => Ok(Value::Float(v.abs())),
                Some(Number::Double(v)) => Ok(Value::Double(v.abs())),
                None => fault("bad argument for Math.abs"),
            },
            ("Math", "pow", 2) => match (number(0), number(1)) {
                (Some(a), Some(b)) => Ok(Value::Double(a.to_f64().powf(b.to_f64()))),
                _ => fault("bad arguments for Math.pow"),
            },
            ("Math", "sqrt", 1) => match number(0) {
                Some(a) => Ok(Value::Double(a.to_f64().sqrt())),
                None => fault("bad argument for Math.sqrt"),
            },
            ("Integer", "parseInt" | "valueOf", 1) => match &args[0] {
                Value::Str(text) => match text.parse::<i32>() {
                    Ok(v) => Ok(Value::Int(v)),
                    Err(_) => parse_failure(text),
                },
                Value::Int(v) => Ok(Value::Int(*v)),
                other => fault(format!("bad argument for Integer.{name}: {}", other.type_name())),
            },
            ("Long", "parseLong" | "valueOf", 1) => match &args[0] {
                Value::Str(text) => match text.parse::<i64>() {
                    Ok(v) => Ok(Value::Long(v)),
                    Err(_) => parse_failure(text),
                },
                other => match Number::of(other) {
                    Some(n) => Ok(Value::Long(n.to_i64())),
                    None => fault(format!("bad argument for Long.{name}")),
                },
            },
            ("Double", "parseDouble" | "valueOf", 1) => match &args[0] {
                Value::Str(text) => match text.trim().parse::<f64>() {
                    Ok(v) => Ok(Value::Double(v)),
                    Err(_) => parse_failure(text),
                },
                other => match Number::of(other) {
                    Some(n) => Ok(Value::Double(n.to_f64())),
                    None => fault(format!("bad argument for Double.{name}")),
                },
            },
            ("Boolean", "parseBoolean", 1) => Ok(Value::Boolean(
                args[0]
                    .as_str()
                    .is_some_and(|text| text.eq_ignore_ascii_case("true")),
            )),
            ("String" | "Integer" | "Long" | "Double", "valueOf" | "toString", 1) => {
                let value = args.into_iter().next().unwrap_or(Value::Null);
                Ok(Value::string(self.stringify(value)?))
            }
            _ => fault(format!("cannot find symbol: method {class}.{name}")),
        }
    }

    fn bind_parameters(
        &self,
        frame: &mut Frame<'a>,
        parameters: &'a [NodeId],
        mut args: Vec<Value>,
    ) -> Exec<()> {
        let ast = self.ast;
        if let Some(last) = parameters.last() {
            let fixed = parameters.len() - 1;
            let passthrough = args.len() == parameters.len()
                && matches!(args[fixed], Value::Array(_) | Value::Null);
            if is_varargs(ast, *last) && !passthrough && args.len() >= fixed {
                let rest: Vec<Value> = args.split_off(fixed);
                args.push(Value::Array(Rc::new(RefCell::new(rest))));
            }
        }
        if args.len() != parameters.len() {
            return fault(format!(
                "wrong number of arguments: expected {}, found {}",
                parameters.len(),
                args.len()
            ));
        }
        for (parameter, arg) in parameters.iter().zip(args) {
            let NodeKind::Parameter { name, ty, .. } = ast.kind(*parameter) else {
                return fault("malformed parameter");
            };
            frame.declare(name, Slot::new(arg, primitive_of(ast, *ty)));
        }
        Ok(())
    }

    fn enter(&mut self) -> Exec<()> {
        if self.state.depth >= MAX_CALL_DEPTH || self.state.stack_used() > NATIVE_STACK_BUDGET {
            return Err(Unwind::Throw(Object::exception("StackOverflowError", None)));
        }
        self.state.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.state.depth = self.state.depth.saturating_sub(1);
    }

    fn run_method(
        &mut self,
        receiver: Option<Rc<Object>>,
        owner: &'a str,
        method: NodeId,
        args: Vec<Value>,
    ) -> Exec<Value> {
        let ast = self.ast;
        let NodeKind::Method {
            name,
            parameters,
            return_type,
            body,
            ..
        } = ast.kind(method)
        else {
            return fault("not a method");
        };
        let Some(body) = body else {
            return fault(format!("abstract method {owner}.{name} cannot be invoked"));
        };
        let this = if is_static(ast, method) { None } else { receiver };
        let mut frame = Frame::new(this, owner);
        self.bind_parameters(&mut frame, parameters, args)?;

        self.enter()?;
        let flow = self.exec(&mut frame, *body);
        self.leave();
        match flow? {
            Flow::Return(value) => Ok(value.convert(primitive_of(ast, *return_type))),
            Flow::Normal => Ok(Value::Void),
            Flow::Break(_) | Flow::Continue(_) => fault("break or continue outside of loop"),
        }
    }

    // ---- construction ----

    fn instantiate(&mut self, class: &str, args: Vec<Value>) -> Exec<Value> {
        if let Some(info) = self.class(class) {
            if info.is_interface || info.is_abstract {
                return fault(format!("{class} is abstract; cannot be instantiated"));
            }
            return Ok(Value::Object(self.construct(&info.name, args)?));
        }
        if is_builtin_throwable(class) {
            let message = match args.into_iter().next() {
                Some(Value::Str(text)) => Some(text.to_string()),
                Some(Value::Null) | None => None,
                Some(cause) => Some(self.stringify(cause)?),
            };
            return Ok(Object::exception(class, message));
        }
        match class {
            "Object" => Ok(Value::Object(Object::new("Object"))),
            "String" => match args.into_iter().next() {
                Some(Value::Str(text)) => Ok(Value::Str(text)),
                None => Ok(Value::from("")),
                Some(other) => fault(format!("no suitable constructor for String({})", other.type_name())),
            },
            _ => fault(format!("cannot find symbol: class {class}")),
        }
    }

    fn construct(&mut self, class: &'a str, args: Vec<Value>) -> Exec<Rc<Object>> {
        let object = Object::new(class);
        {
            let mut fields = object.fields.borrow_mut();
            for info in self.chain(class) {
                for field in &info.fields {
                    if let NodeKind::Field { name, ty, modifiers, .. } = self.ast.kind(*field) {
                        if info.is_interface || modifiers.contains(&ModifierKind::Static) {
                            continue;
                        }
                        let primitive = primitive_of(self.ast, *ty);
                        fields.insert(name.clone(), Slot::new(default_value(primitive), primitive));
                    }
                }
            }
        }
        self.run_constructor(&object, class, args)?;
        Ok(object)
    }

    fn run_constructor(&mut self, object: &Rc<Object>, class: &'a str, args: Vec<Value>) -> Exec<()> {
        let ast = self.ast;
        let Some(info) = self.class(class) else {
            return fault(format!("cannot find symbol: class {class}"));
        };
        let constructor = if info.constructors.is_empty() {
            if !args.is_empty() {
                return fault(format!("constructor {class} in class {class} cannot be applied to given types"));
            }
            None
        } else {
            match self.select(&info.constructors, &args) {
                Some(ctor) => Some(ctor),
                None => return fault(format!("no suitable constructor found for {class}")),
            }
        };

        let mut frame = Frame::new(Some(Rc::clone(object)), info.name.as_str());
        let statements: &'a [NodeId] = match constructor {
            Some(ctor) => {
                self.bind_parameters(&mut frame, parameters_of(ast, ctor), args)?;
                match ast.kind(ctor) {
                    NodeKind::Constructor { body, .. } => match ast.kind(*body) {
                        NodeKind::Block { statements } => statements.as_slice(),
                        _ => &[],
                    },
                    _ => &[],
                }
            }
            None => &[],
        };

        let explicit = statements.first().and_then(|first| match ast.kind(*first) {
            NodeKind::ExpressionStatement { expression } => match ast.kind(*expression) {
                NodeKind::Invocation {
                    target: None,
                    name,
                    arguments,
                } if name == "this" || name == "super" => Some((name.as_str(), arguments.as_slice())),
                _ => None,
            },
            _ => None,
        });
        let rest = if explicit.is_some() { &statements[1..] } else { statements };

        self.enter()?;
        let result = self.constructor_body(&mut frame, object, info, explicit, rest);
        self.leave();
        result
    }

    fn constructor_body(
        &mut self,
        frame: &mut Frame<'a>,
        object: &Rc<Object>,
        info: &'a ClassInfo,
        explicit: Option<(&'a str, &'a [NodeId])>,
        rest: &'a [NodeId],
    ) -> Exec<()> {
        match explicit {
            Some(("this", arguments)) => {
                let args = self.eval_all(frame, arguments)?;
                self.run_constructor(object, info.name.as_str(), args)?;
            }
            Some((_, arguments)) => {
                let args = self.eval_all(frame, arguments)?;
                self.super_constructor(object, info, args)?;
                self.init_fields(object, info)?;
            }
            None => {
                self.super_constructor(object, info, Vec::new())?;
                self.init_fields(object, info)?;
            }
        }
        match self.scoped(frame, |this, frame| this.exec_all(frame, rest))? {
            Flow::Normal | Flow::Return(_) => Ok(()),
            Flow::Break(_) | Flow::Continue(_) => fault("break or continue outside of loop"),
        }
    }

    fn super_constructor(&mut self, object: &Rc<Object>, info: &'a ClassInfo, args: Vec<Value>) -> Exec<()> {
        let Some(parent) = info.superclass.as_deref() else {
            return Ok(());
        };
        if let Some(parent) = self.class(parent) {
            return self.run_constructor(object, parent.name.as_str(), args);
        }
        if is_builtin_throwable(parent) {
            let message = match args.into_iter().next() {
                Some(Value::Str(text)) => Some(text.to_string()),
                Some(Value::Null) | None => None,
                Some(cause) => Some(self.stringify(cause)?),
            };
            object.set_message(message);
        }
        Ok(())
    }

    fn init_fields(&mut self, object: &Rc<Object>, info: &'a ClassInfo) -> Exec<()> {
        let ast = self.ast;
        for field in &info.fields {
            let NodeKind::Field {
                name,
                modifiers,
                initializer: Some(initializer),
                ..
            } = ast.kind(*field)
            else {
                continue;
            };
            if modifiers.contains(&ModifierKind::Static) {
                continue;
            }
            let mut frame = Frame::new(Some(Rc::clone(object)), info.name.as_str());
            let value = self.eval(&mut frame, *initializer)?;
            self.write_place(&mut frame, Place::Field(Rc::clone(object), name), value)?;
        }
        Ok(())
    }

    /// Allocate every static field, then run initializers in declaration
    /// order.
    fn init_statics(&mut self) -> Exec<()> {
        let ast = self.ast;
        let program = self.program;
        let statics = |info: &'a ClassInfo| {
            info.fields.iter().copied().filter(move |field| {
                info.is_interface || is_static(ast, *field)
            })
        };
        for class in &program.order {
            let Some(info) = self.class(class) else {
                continue;
            };
            let fields = self.state.statics.entry(info.name.clone()).or_default();
            for field in statics(info) {
                if let NodeKind::Field { name, ty, .. } = ast.kind(field) {
                    let primitive = primitive_of(ast, *ty);
                    fields.insert(name.clone(), Slot::new(default_value(primitive), primitive));
                }
            }
        }
        for class in &program.order {
            let Some(info) = self.class(class) else {
                continue;
            };
            for field in statics(info) {
                if let NodeKind::Field {
                    name,
                    initializer: Some(initializer),
                    ..
                } = ast.kind(field)
                {
                    let mut frame = Frame::new(None, info.name.as_str());
                    let value = self.eval(&mut frame, *initializer)?;
                    self.write_place(&mut frame, Place::Static(info.name.as_str(), name), value)?;
                }
            }
        }
        Ok(())
    }
}

fn make_array(lengths: &[usize], leaf: &Value) -> Value {
    match lengths.split_first() {
        None => leaf.clone(),
        Some((length, rest)) => Value::Array(Rc::new(RefCell::new(
            (0..*length).map(|_| make_array(rest, leaf)).collect(),
        ))),
    }
}

fn compare(a: Number, b: Number) -> Option<Ordering> {
    match Number::promote(a, b) {
        (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
        (Number::Long(x), Number::Long(y)) => Some(x.cmp(&y)),
        (x, y) => x.to_f64().partial_cmp(&y.to_f64()),
    }
}

fn compare_strings(a: &str, b: &str) -> i32 {
    let mut left = a.encode_utf16();
    let mut right = b.encode_utf16();
    loop {
        match (left.next(), right.next()) {
            (Some(x), Some(y)) if x != y => return i32::from(x) - i32::from(y),
            (Some(_), Some(_)) => {}
            (Some(_), None) => return 1 + left.count() as i32,
            (None, Some(_)) => return -(1 + right.count() as i32),
            (None, None) => return 0,
        }
    }
}

fn unary(kind: UnaryOperatorKind, value: Value) -> Exec<Value> {
    let number = Number::of(&value);
    match (kind, &value, number) {
        (UnaryOperatorKind::Not, Value::Boolean(b), _) => Ok(Value::Boolean(!b)),
        (UnaryOperatorKind::Pos, _, Some(n)) => Ok(n.into_value()),
        (UnaryOperatorKind::Neg, _, Some(Number::Int(v))) => Ok(Value::Int(v.wrapping_neg())),
        (UnaryOperatorKind::Neg, _, Some(Number::Long(v))) => Ok(Value::Long(v.wrapping_neg())),
        (UnaryOperatorKind::Neg, _, Some(Number::Float(v))) => Ok(Value::Float(-v)),
        (UnaryOperatorKind::Neg, _, Some(Number::Double(v))) => Ok(Value::Double(-v)),
        (UnaryOperatorKind::Compl, _, Some(Number::Int(v))) => Ok(Value::Int(!v)),
        (UnaryOperatorKind::Compl, _, Some(Number::Long(v))) => Ok(Value::Long(!v)),
        _ => fault(format!(
            "bad operand type {} for unary operator '{}'",
            value.type_name(),
            kind.symbol()
        )),
    }
}

fn numeric(kind: BinaryOperatorKind, a: Number, b: Number) -> Exec<Value> {
    use BinaryOperatorKind as Op;
    match kind {
        Op::Lt | Op::Gt | Op::Le | Op::Ge => {
            let result = compare(a, b).is_some_and(|ordering| match kind {
                Op::Lt => ordering == Ordering::Less,
                Op::Gt => ordering == Ordering::Greater,
                Op::Le => ordering != Ordering::Greater,
                _ => ordering != Ordering::Less,
            });
            return Ok(Value::Boolean(result));
        }
        Op::Shl | Op::Shr | Op::UShr => {
            let distance = b.to_i64();
            return match a {
                Number::Int(v) => {
                    let n = (distance & 31) as u32;
                    Ok(Value::Int(match kind {
                        Op::Shl => v.wrapping_shl(n),
                        Op::Shr => v >> n,
                        _ => ((v as u32) >> n) as i32,
                    }))
                }
                Number::Long(v) => {
                    let n = (distance & 63) as u32;
                    Ok(Value::Long(match kind {
                        Op::Shl => v.wrapping_shl(n),
                        Op::Shr => v >> n,
                        _ => ((v as u64) >> n) as i64,
                    }))
                }
                _ => fault(format!("bad operand types for shift operator '{}'", kind.symbol())),
            };
        }
        _ => {}
    }

    match Number::promote(a, b) {
        (Number::Int(x), Number::Int(y)) => Ok(Value::Int(match kind {
            Op::Plus => x.wrapping_add(y),
            Op::Minus => x.wrapping_sub(y),
            Op::Mul => x.wrapping_mul(y),
            Op::Div | Op::Mod if y == 0 => return throw("ArithmeticException", "/ by zero"),
            Op::Div => x.wrapping_div(y),
            Op::Mod => x.wrapping_rem(y),
            Op::BitAnd => x & y,
            Op::BitOr => x | y,
            Op::BitXor => x ^ y,
            _ => return fault(format!("bad operand types for '{}'", kind.symbol())),
        })),
        (Number::Long(x), Number::Long(y)) => Ok(Value::Long(match kind {
            Op::Plus => x.wrapping_add(y),
            Op::Minus => x.wrapping_sub(y),
            Op::Mul => x.wrapping_mul(y),
            Op::Div | Op::Mod if y == 0 => return throw("ArithmeticException", "/ by zero"),
            Op::Div => x.wrapping_div(y),
            Op::Mod => x.wrapping_rem(y),
            Op::BitAnd => x & y,
            Op::BitOr => x | y,
            Op::BitXor => x ^ y,
            _ => return fault(format!("bad operand types for '{}'", kind.symbol())),
        })),
        (Number::Float(x), Number::Float(y)) => Ok(Value::Float(match kind {
            Op::Plus => x + y,
            Op::Minus => x - y,
            Op::Mul => x * y,
            Op::Div => x / y,
            Op::Mod => x % y,
            _ => return fault(format!("bad operand types for '{}'", kind.symbol())),
        })),
        (x, y) => {
            let (x, y) = (x.to_f64(), y.to_f64());
            Ok(Value::Double(match kind {
                Op::Plus => x + y,
                Op::Minus => x - y,
                Op::Mul => x * y,
                Op::Div => x / y,
                Op::Mod => x % y,
                _ => return fault(format!("bad operand types for '{}'", kind.symbol())),
            }))
        }
    }
}

/// Oracle that runs classes with the built-in interpreter.
#[derive(Debug, Default, Clone, Copy)]
pub struct InterpreterOracle;

impl InterpreterOracle {
    pub fn new() -> Self {
        Self
    }
}

impl Oracle for InterpreterOracle {
    fn compile(
        &self,
        qualified_name: &str,
        source: &str,
    ) -> Result<Box<dyn CompiledClass>, OracleError> {
        let (program, target) = Program::load(qualified_name, source)?;
        let info = program
            .classes
            .get(&target)
            .ok_or_else(|| OracleError::compile(format!("class {qualified_name} not found")))?;
        if !info.has_no_arg_constructor(&program.ast) {
            return Err(OracleError::compile(format!(
                "{qualified_name} has no no-arg constructor"
            )));
        }
        tracing::debug!(class = qualified_name, classes = program.classes.len(), "compiled");
        Ok(Box::new(InterpretedClass {
            program: Rc::new(program),
            name: target,
            qualified_name: qualified_name.to_string(),
        }))
    }
}

struct InterpretedClass {
    program: Rc<Program>,
    name: String,
    qualified_name: String,
}

impl CompiledClass for InterpretedClass {
    fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    fn instantiate(&self) -> Result<Box<dyn Instance>, OracleError> {
        let mut state = State::default();
        state.begin();
        let object = {
            let mut interp = Interp::new(&self.program, &mut state);
            match interp.class(&self.name) {
                Some(info) if info.is_interface || info.is_abstract => {
                    return Err(OracleError::Runtime {
                        exception: "java.lang.InstantiationException".to_string(),
                        message: Some(self.qualified_name.clone()),
                    });
                }
                _ => {}
            }
            let name = self.name.as_str();
            interp
                .init_statics()
                .and_then(|()| interp.construct(name, Vec::new()))
                .map_err(Unwind::into_error)?
        };
        Ok(Box::new(InterpretedInstance {
            program: Rc::clone(&self.program),
            state,
            object,
        }))
    }
}

struct InterpretedInstance {
    program: Rc<Program>,
    state: State,
    object: Rc<Object>,
}

impl Instance for InterpretedInstance {
    fn invoke(&mut self, method: &str, args: &[Value]) -> Result<Value, OracleError> {
        tracing::debug!(class = %self.object.class, method, "invoking");
        let mut interp = Interp::new(&self.program, &mut self.state);
        let class = self.object.class.clone();
        let Some((owner, declaration)) = interp.find_method(&class, method, args) else {
            return Err(OracleError::Runtime {
                exception: "java.lang.NoSuchMethodException".to_string(),
                message: Some(format!("{class}.{method}()")),
            });
        };
        interp.state.begin();
        interp
            .run_method(Some(Rc::clone(&self.object)), owner, declaration, args.to_vec())
            .map_err(Unwind::into_error)
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.object.field(name)
    }

    fn take_output(&mut self) -> String {
        std::mem::take(&mut self.state.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str, method: &str) -> (Result<Value, OracleError>, String) {
        let class = InterpreterOracle.compile("demo.T", source).unwrap();
        let mut instance = class.instantiate().unwrap();
        let result = instance.invoke(method, &[]);
        (result, instance.take_output())
    }

    fn unit(body: &str) -> String {
        format!("package demo;\n\npublic class T {{\n{body}\n}}\n")
    }

    #[test]
    fn int_arithmetic_wraps() {
        let source = unit("int m() { int x = 2147483647; x++; return x + 3 - 2 * 2; }");
        let (result, _) = run(&source, "m");
        assert_eq!(result.unwrap(), Value::Int(i32::MAX));
    }

    #[test]
    fn division_by_zero_throws() {
        let source = unit("int m() { int z = 0; return 1 / z; }");
        let (result, _) = run(&source, "m");
        assert_eq!(
            result.unwrap_err(),
            OracleError::Runtime {
                exception: "java.lang.ArithmeticException".to_string(),
                message: Some("/ by zero".to_string()),
            }
        );
    }

    #[test]
    fn try_catch_finally_runs_in_order() {
        let source = unit(
            r#"
    private int counter = 0;

    public int add(int a, int b) {
        try {
            return a / b;
        } catch (RuntimeException ignored) {
            System.out.println("ignoring " + ignored.getMessage());
            return -1;
        } finally {
            counter++;
        }
    }

    int twice() {
        add(1, 0);
        add(4, 2);
        return counter;
    }"#,
        );
        let (result, output) = run(&source, "twice");
        assert_eq!(result.unwrap(), Value::Int(2));
        assert_eq!(output, "ignoring / by zero\n");
    }

    #[test]
    fn finally_return_overrides_exception() {
        let source = unit(
            "int m() { try { throw new IllegalStateException(\"x\"); } finally { return 7; } }",
        );
        assert_eq!(run(&source, "m").0.unwrap(), Value::Int(7));
    }

    #[test]
    fn user_exceptions_and_inheritance() {
        let source = r#"package demo;

class Shape {
    int sides() { return 0; }
    String describe() { return "shape with " + sides() + " sides"; }
}

class Square extends Shape {
    int sides() { return 4; }
}

class Bad extends RuntimeException {
    Bad(String message) { super(message); }
}

public class T {
    String m() {
        Shape s = new Square();
        return s.describe();
    }

    String boom() {
        try {
            throw new Bad("nope");
        } catch (IllegalStateException e) {
            return "wrong";
        } catch (RuntimeException e) {
            return e.getMessage() + "/" + (e instanceof Bad);
        }
    }
}
"#;
        assert_eq!(run(source, "m").0.unwrap(), Value::from("shape with 4 sides"));
        assert_eq!(run(source, "boom").0.unwrap(), Value::from("nope/true"));
    }

    #[test]
    fn loops_arrays_and_statics() {
        let source = unit(
            r#"
    static int calls = 0;

    static int sum(int... values) {
        calls++;
        int total = 0;
        for (int v : values) {
            total += v;
        }
        return total;
    }

    long m() {
        int[] squares = new int[5];
        for (int i = 0; i < squares.length; i++) {
            squares[i] = i * i;
        }
        int k = 0;
        while (true) {
            k++;
            if (k > 3) break;
        }
        long result = sum(squares[1], squares[2], squares[4]) + k;
        return result * calls;
    }"#,
        );
        assert_eq!(run(&source, "m").0.unwrap(), Value::Long(25));
    }

    #[test]
    fn strings_and_builtins() {
        let source = unit(
            r#"
    String m() {
        String s = "Hello";
        char c = s.charAt(1);
        int n = Integer.parseInt("41") + 1;
        return s.length() + ":" + c + ":" + n + ":" + Math.max(3, 9) + ":" + s.isEmpty() + ":" + 1.5;
    }"#,
        );
        assert_eq!(run(&source, "m").0.unwrap(), Value::from("5:e:42:9:false:1.5"));
    }

    #[test]
    fn uncaught_user_exception_is_reported() {
        let source = unit("void m() { throw new UnsupportedOperationException(\"later\"); }");
        let err = run(&source, "m").0.unwrap_err();
        assert_eq!(
            err.to_string(),
            "java.lang.UnsupportedOperationException: later"
        );
    }

    #[test]
    fn unknown_method_is_reported() {
        let source = unit("int m() { return 1; }");
        let err = run(&source, "nothing").0.unwrap_err();
        assert!(matches!(err, OracleError::Runtime { ref exception, .. } if exception == "java.lang.NoSuchMethodException"));
    }

    #[test]
    fn compile_rejects_bad_units() {
        let oracle = InterpreterOracle::new();
        let duplicate = unit("int m() { return 1; }\nint m() { return 2; }");
        assert!(matches!(
            oracle.compile("demo.T", &duplicate),
            Err(OracleError::Compile(message)) if message.contains("m() is already defined")
        ));
        let no_default = unit("T(int x) { }");
        assert!(matches!(
            oracle.compile("demo.T", &no_default),
            Err(OracleError::Compile(message)) if message.contains("no-arg constructor")
        ));
        assert!(matches!(
            oracle.compile("demo.Missing", &unit("")),
            Err(OracleError::Compile(_))
        ));
        assert!(matches!(
            oracle.compile("demo.T", "public class T {"),
            Err(OracleError::Compile(_))
        ));
    }

    #[test]
    fn constructors_chain_and_initialize_fields() {
        let source = unit(
            r#"
    private int a = 1;
    private int b;

    T() {
        this(10);
        b += 5;
    }

    T(int start) {
        b = start + a;
    }

    int m() { return b; }"#,
        );
        let class = InterpreterOracle.compile("demo.T", &source).unwrap();
        let mut instance = class.instantiate().unwrap();
        assert_eq!(instance.invoke("m", &[]).unwrap(), Value::Int(16));
        assert_eq!(instance.field("a"), Some(Value::Int(1)));
    }

    #[test]
    fn unbounded_recursion_overflows() {
        let source = unit("int m() { return m() + 1; }");
        let err = run(&source, "m").0.unwrap_err();
        assert!(matches!(err, OracleError::Runtime { ref exception, .. } if exception == "java.lang.StackOverflowError"));
    }

    #[test]
    fn recursion_is_cut_off_inside_a_small_thread_stack() {
        let source = unit("int m() { return m() + 1; }");
        let outcome = std::thread::Builder::new()
            .stack_size(2 << 20)
            .spawn(move || format!("{:?}", run(&source, "m").0))
            .unwrap()
            .join()
            .unwrap();
        assert!(outcome.contains("java.lang.StackOverflowError"), "{outcome}");
    }

    #[test]
    fn recursive_construction_overflows() {
        let source = unit("T() { T next = new T(); }");
        let class = InterpreterOracle.compile("demo.T", &source).unwrap();
        let err = class.instantiate().err().unwrap();
        assert!(matches!(err, OracleError::Runtime { ref exception, .. } if exception == "java.lang.StackOverflowError"));
    }

    #[test]
    fn arguments_are_converted_to_parameter_types() {
        let source = unit("double half(double x) { return x / 2; }");
        let class = InterpreterOracle.compile("demo.T", &source).unwrap();
        let mut instance = class.instantiate().unwrap();
        assert_eq!(instance.invoke("half", &[Value::Int(3)]).unwrap(), Value::Double(1.5));
    }
}
