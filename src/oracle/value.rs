use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Field holding a throwable's message.
pub(crate) const MESSAGE_FIELD: &str = "detailMessage";

/// Primitive types; values of these types are converted on assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Primitive {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl Primitive {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "boolean" => Primitive::Boolean,
            "byte" => Primitive::Byte,
            "short" => Primitive::Short,
            "char" => Primitive::Char,
            "int" => Primitive::Int,
            "long" => Primitive::Long,
            "float" => Primitive::Float,
            "double" => Primitive::Double,
            _ => return None,
        })
    }

    pub(crate) fn default_value(self) -> Value {
        match self {
            Primitive::Boolean => Value::Boolean(false),
            Primitive::Char => Value::Char('\0'),
            Primitive::Byte | Primitive::Short | Primitive::Int => Value::Int(0),
            Primitive::Long => Value::Long(0),
            Primitive::Float => Value::Float(0.0),
            Primitive::Double => Value::Double(0.0),
        }
    }
}

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Result of a `void` method.
    Void,
    Null,
    Boolean(bool),
    Char(char),
    /// `byte`, `short` and `int`.
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(Rc<str>),
    Object(Rc<Object>),
    Array(Rc<RefCell<Vec<Value>>>),
}

impl Value {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub(crate) fn string(text: impl Into<String>) -> Self {
        Value::Str(Rc::from(text.into()))
    }

    /// Java type name used in error messages.
    pub fn type_name(&self) -> String {
        match self {
            Value::Void => "void".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(_) => "boolean".to_string(),
            Value::Char(_) => "char".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Long(_) => "long".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Double(_) => "double".to_string(),
            Value::Str(_) => "String".to_string(),
            Value::Object(object) => object.class.clone(),
            Value::Array(_) => "array".to_string(),
        }
    }

    /// Convert for storage in a slot of type `primitive`. Reference slots
    /// take the value unchanged.
    pub(crate) fn convert(self, primitive: Option<Primitive>) -> Value {
        let Some(primitive) = primitive else {
            return self;
        };
        let Some(number) = Number::of(&self) else {
            return self;
        };
        match primitive {
            Primitive::Boolean => self,
            Primitive::Int => Value::Int(number.to_i32()),
            Primitive::Byte => Value::Int(number.to_i32() as i8 as i32),
            Primitive::Short => Value::Int(number.to_i32() as i16 as i32),
            Primitive::Char => Value::Char(
                char::from_u32(number.to_i32() as u16 as u32).unwrap_or(char::REPLACEMENT_CHARACTER),
            ),
            Primitive::Long => Value::Long(number.to_i64()),
            Primitive::Float => Value::Float(number.to_f64() as f32),
            Primitive::Double => Value::Double(number.to_f64()),
        }
    }
}

impl PartialEq for Value {
    /// Primitive equality by value, strings by content, objects and arrays
    /// by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) | (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (a, b) => match (Number::of(a), Number::of(b)) {
                (Some(x), Some(y)) => x.equals(y),
                _ => false,
            },
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::string(value)
    }
}

/// `String.valueOf` for everything but objects with a user `toString`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => Ok(()),
            Value::Null => f.write_str("null"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Char(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => f.write_str(&java_float_string(f64::from(*v), v.to_string())),
            Value::Double(v) => f.write_str(&java_float_string(*v, format!("{v:?}"))),
            Value::Str(s) => f.write_str(s),
            Value::Object(object) => write!(f, "{object}"),
            Value::Array(array) => write!(f, "[@{:x}", Rc::as_ptr(array) as *const () as usize),
        }
    }
}

/// Java's `Double.toString` layout: plain between 1e-3 and 1e7, otherwise
/// computerized scientific notation with at least one fractional digit.
fn java_float_string(value: f64, plain: String) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = value.abs();
    if value == 0.0 || (1e-3..1e7).contains(&magnitude) {
        if plain.contains(['.', 'e', 'E']) {
            return plain;
        }
        return format!("{plain}.0");
    }
    let scientific = format!("{value:E}");
    match scientific.split_once('E') {
        Some((mantissa, exponent)) if !mantissa.contains('.') => format!("{mantissa}.0E{exponent}"),
        _ => scientific,
    }
}

/// An instance of a user class or of a built-in throwable.
#[derive(Debug)]
pub struct Object {
    pub class: String,
    pub(crate) id: u64,
    pub(crate) fields: RefCell<HashMap<String, Slot>>,
}

impl Object {
    pub(crate) fn new(class: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            class: class.into(),
            id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
            fields: RefCell::new(HashMap::new()),
        })
    }

    /// A built-in exception carrying `message`.
    pub(crate) fn exception(class: &str, message: Option<String>) -> Value {
        let object = Object::new(class);
        object.set_message(message);
        Value::Object(object)
    }

    pub(crate) fn set_message(&self, message: Option<String>) {
        let value = message.map(Value::string).unwrap_or(Value::Null);
        self.fields
            .borrow_mut()
            .insert(MESSAGE_FIELD.to_string(), Slot::new(value, None));
    }

    pub fn message(&self) -> Option<String> {
        match self.field(MESSAGE_FIELD) {
            Some(Value::Str(text)) => Some(text.to_string()),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).map(|slot| slot.value.clone())
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if super::interpreter::is_builtin_throwable(&self.class) {
            write!(f, "java.lang.{}", self.class)?;
            if let Some(message) = self.message() {
                write!(f, ": {message}")?;
            }
            return Ok(());
        }
        write!(f, "{}@{:x}", self.class, self.id)
    }
}

/// A variable or field: its value and, for primitives, its declared type.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub(crate) value: Value,
    pub(crate) primitive: Option<Primitive>,
}

impl Slot {
    pub(crate) fn new(value: Value, primitive: Option<Primitive>) -> Self {
        Self {
            value: value.convert(primitive),
            primitive,
        }
    }

    pub(crate) fn store(&mut self, value: Value) {
        self.value = value.convert(self.primitive);
    }
}

/// Numeric view of a value after unary promotion.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Number {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl Number {
    pub(crate) fn of(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Char(c) => Number::Int(*c as i32),
            Value::Int(v) => Number::Int(*v),
            Value::Long(v) => Number::Long(*v),
            Value::Float(v) => Number::Float(*v),
            Value::Double(v) => Number::Double(*v),
            _ => return None,
        })
    }

    fn rank(self) -> u8 {
        match self {
            Number::Int(_) => 0,
            Number::Long(_) => 1,
            Number::Float(_) => 2,
            Number::Double(_) => 3,
        }
    }

    pub(crate) fn to_i32(self) -> i32 {
        match self {
            Number::Int(v) => v,
            Number::Long(v) => v as i32,
            Number::Float(v) => v as i32,
            Number::Double(v) => v as i32,
        }
    }

    pub(crate) fn to_i64(self) -> i64 {
        match self {
            Number::Int(v) => i64::from(v),
            Number::Long(v) => v,
            Number::Float(v) => v as i64,
            Number::Double(v) => v as i64,
        }
    }

    pub(crate) fn to_f64(self) -> f64 {
        match self {
            Number::Int(v) => f64::from(v),
            Number::Long(v) => v as f64,
            Number::Float(v) => f64::from(v),
            Number::Double(v) => v,
        }
    }

    fn to_rank(self, rank: u8) -> Number {
        match rank {
            0 => Number::Int(self.to_i32()),
            1 => Number::Long(self.to_i64()),
            2 => Number::Float(self.to_f64() as f32),
            _ => Number::Double(self.to_f64()),
        }
    }

    /// Binary numeric promotion.
    pub(crate) fn promote(a: Number, b: Number) -> (Number, Number) {
        let rank = a.rank().max(b.rank());
        (a.to_rank(rank), b.to_rank(rank))
    }

    pub(crate) fn into_value(self) -> Value {
        match self {
            Number::Int(v) => Value::Int(v),
            Number::Long(v) => Value::Long(v),
            Number::Float(v) => Value::Float(v),
            Number::Double(v) => Value::Double(v),
        }
    }

    fn equals(self, other: Number) -> bool {
        match Number::promote(self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Long(a), Number::Long(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => a == b,
            (a, b) => a.to_f64() == b.to_f64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_print_like_java() {
        assert_eq!(Value::Double(1.0).to_string(), "1.0");
        assert_eq!(Value::Double(0.5).to_string(), "0.5");
        assert_eq!(Value::Double(1e7).to_string(), "1.0E7");
        assert_eq!(Value::Double(1.5e-5).to_string(), "1.5E-5");
        assert_eq!(Value::Double(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
    }

    #[test]
    fn conversion_narrows_like_java() {
        assert_eq!(Value::Double(3.9).convert(Some(Primitive::Int)), Value::Int(3));
        assert_eq!(Value::Int(300).convert(Some(Primitive::Byte)), Value::Int(44));
        assert_eq!(Value::Long(1 << 40).convert(Some(Primitive::Int)), Value::Int(0));
        assert_eq!(Value::Int(65).convert(Some(Primitive::Char)), Value::Char('A'));
        assert_eq!(Value::Char('A').convert(Some(Primitive::Long)), Value::Long(65));
        assert_eq!(Value::Double(f64::NAN).convert(Some(Primitive::Int)), Value::Int(0));
    }

    #[test]
    fn equality_promotes_numbers() {
        assert_eq!(Value::Int(1), Value::Long(1));
        assert_eq!(Value::Char('a'), Value::Int(97));
        assert_ne!(Value::Int(1), Value::from("1"));
    }

    #[test]
    fn exceptions_display_with_message() {
        let err = Object::exception("ArithmeticException", Some("/ by zero".into()));
        assert_eq!(err.to_string(), "java.lang.ArithmeticException: / by zero");
        let bare = Object::exception("IllegalStateException", None);
        assert_eq!(bare.to_string(), "java.lang.IllegalStateException");
    }
}
