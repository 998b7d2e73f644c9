use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::scope::Scope;
use crate::dom::{Representation, StreamNode};
use crate::error::RuntimeError;
use crate::normalize::{format_number, SafeString};
use crate::syntax::Function;

pub type Object = IndexMap<Rc<str>, Value>;

pub type NativeFn = fn(Vec<Value>) -> Result<Value, RuntimeError>;

/// A function implemented in Rust.
#[derive(Clone, Copy)]
pub struct Native {
    pub name: &'static str,
    pub func: NativeFn,
}

/// An arrow function together with the scope it was created in.
pub struct Closure {
    pub function: Rc<Function>,
    pub scope: Rc<Scope>,
}

/// A value of the evaluated language.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Rc<Vec<Value>>),
    Object(Rc<Object>),
    Function(Rc<Closure>),
    Native(Native),
    /// A stream representation node.
    Stream(StreamNode),
    /// Content marked as already escaped.
    Safe(SafeString),
    /// The output buffer handed to a stream render function.
    Sink(Rc<RefCell<String>>),
    /// The builder of one representation.
    Builder(Representation),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(items))
    }

    pub fn object<K: Into<Rc<str>>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(Rc::new(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn native(name: &'static str, func: NativeFn) -> Self {
        Value::Native(Native { name, func })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The name reported for this value in type errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) | Value::Native(_) => "function",
            Value::Stream(_) => "stream node",
            Value::Safe(_) => "safe string",
            Value::Sink(_) => "sink",
            Value::Builder(_) => "builder",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// `===`. Compound values are equal only to themselves.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => a.name == b.name,
            (Value::Sink(a), Value::Sink(b)) => Rc::ptr_eq(a, b),
            (Value::Builder(a), Value::Builder(b)) => a == b,
            _ => false,
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            _ => f64::NAN,
        }
    }

    fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_)
        )
    }

    /// `+`: numeric addition when neither side is a string or compound value,
    /// concatenation otherwise.
    pub fn add(&self, other: &Value) -> Value {
        if self.is_primitive() && other.is_primitive() {
            return Value::Number(self.to_number() + other.to_number());
        }
        Value::string(format!("{}{}", self, other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    if !matches!(item, Value::Undefined | Value::Null) {
                        write!(f, "{}", item)?;
                    }
                }
                Ok(())
            }
            Value::Safe(html) => write!(f, "{}", html.as_str()),
            Value::Function(_) | Value::Native(_) => write!(f, "function"),
            _ => write!(f, "[object Object]"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Object(fields) => f.debug_map().entries(fields.iter()).finish(),
            Value::Native(native) => write!(f, "[native {}]", native.name),
            Value::Stream(node) => write!(f, "{:?}", node),
            Value::Builder(representation) => write!(f, "[builder {}]", representation),
            other => write!(f, "{}", other),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(Rc::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}
