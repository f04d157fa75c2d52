//! Runtime Values
//!
//! The dynamic values programs evaluate over. Hosts pass data in as
//! `Value`s (usually converted from JSON) or expose their own objects
//! through `HostObject`.

use indexmap::IndexMap;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::EvalError;
use crate::expression_parser::Literal;

pub type Kwargs = IndexMap<String, Value>;

/// Render parameters.
pub type Params = IndexMap<String, Value>;

type CallableFn = dyn Fn(Vec<Value>, Kwargs) -> Result<Value, EvalError> + Send + Sync;

/// A host or program function.
#[derive(Clone)]
pub struct Callable {
    name: Arc<str>,
    func: Arc<CallableFn>,
}

impl Callable {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(Vec<Value>, Kwargs) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Callable {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: Vec<Value>, kwargs: Kwargs) -> Result<Value, EvalError> {
        (self.func)(args, kwargs)
    }

    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

/// An object provided by the host application.
///
/// Every method has a conservative default so implementors only override
/// the capabilities they support.
pub trait HostObject: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;

    /// Attribute-style lookup.
    fn get_attr(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Mapping-style lookup.
    fn get_item(&self, _key: &Value) -> Option<Value> {
        None
    }

    /// Generic traversal hook, tried after attribute and item lookup.
    fn traverse(&self, name: &str) -> Result<Value, EvalError> {
        Err(EvalError::Attribute {
            type_name: self.type_name().to_string(),
            attribute: name.to_string(),
        })
    }

    /// `None` means the object is not callable.
    fn call(&self, _args: Vec<Value>, _kwargs: Kwargs) -> Option<Result<Value, EvalError>> {
        None
    }

    /// `None` means the object is not iterable.
    fn iterate(&self) -> Option<Box<dyn Iterator<Item = Value> + Send>> {
        None
    }

    /// Size, when known up front.
    fn len(&self) -> Option<usize> {
        None
    }

    fn is_true(&self) -> bool {
        true
    }

    fn to_text(&self) -> String {
        format!("<{} object>", self.type_name())
    }
}

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    /// Text that is already markup and must not be escaped again.
    Markup(Arc<str>),
    List(Arc<Vec<Value>>),
    Map(Arc<IndexMap<String, Value>>),
    Callable(Callable),
    Object(Arc<dyn HostObject>),
}

impl Value {
    pub fn str(text: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(text.as_ref()))
    }

    pub fn markup(text: impl AsRef<str>) -> Self {
        Value::Markup(Arc::from(text.as_ref()))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }

    pub fn map(entries: IndexMap<String, Value>) -> Self {
        Value::Map(Arc::new(entries))
    }

    pub fn object<T: HostObject + 'static>(object: T) -> Self {
        Value::Object(Arc::new(object))
    }

    pub fn function<F>(name: &str, func: F) -> Self
    where
        F: Fn(Vec<Value>, Kwargs) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Value::Callable(Callable::new(name, func))
    }

    pub fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::None => Value::None,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(n) => Value::Int(*n),
            Literal::Float(n) => Value::Float(*n),
            Literal::Str(s) => Value::str(s),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Markup(_) => "Markup",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Callable(_) => "function",
            Value::Object(object) => object.type_name(),
        }
    }

    pub fn is_true(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) | Value::Markup(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::Callable(_) => true,
            Value::Object(object) => object.is_true(),
        }
    }

    /// Text form used for output and concatenation.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Value::None => Cow::Borrowed("None"),
            Value::Bool(true) => Cow::Borrowed("True"),
            Value::Bool(false) => Cow::Borrowed("False"),
            Value::Int(n) => Cow::Owned(n.to_string()),
            Value::Float(n) => Cow::Owned(format_float(*n)),
            Value::Str(s) | Value::Markup(s) => Cow::Borrowed(s),
            Value::List(items) => Cow::Owned(format!(
                "[{}]",
                items.iter().map(Value::repr).collect::<Vec<_>>().join(", ")
            )),
            Value::Map(entries) => Cow::Owned(format!(
                "{{{}}}",
                entries
                    .iter()
                    .map(|(key, value)| format!("'{}': {}", key, value.repr()))
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            Value::Callable(callable) => Cow::Owned(format!("{:?}", callable)),
            Value::Object(object) => Cow::Owned(object.to_text()),
        }
    }

    /// Representation used inside containers and error messages.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) | Value::Markup(s) => format!("'{}'", s.replace('\'', "\\'")),
            other => other.to_text().into_owned(),
        }
    }

    /// Number of items, when known.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Str(s) | Value::Markup(s) => Some(s.chars().count()),
            Value::List(items) => Some(items.len()),
            Value::Map(entries) => Some(entries.len()),
            Value::Object(object) => object.len(),
            _ => None,
        }
    }

    /// Iterate the value: list items, mapping keys, string characters or a
    /// host iterator.
    pub fn iterate(&self) -> Result<Box<dyn Iterator<Item = Value> + Send>, EvalError> {
        match self {
            Value::List(items) => {
                let items = Arc::clone(items);
                Ok(Box::new((0..items.len()).map(move |i| items[i].clone())))
            }
            Value::Map(entries) => Ok(Box::new(
                entries.keys().map(Value::str).collect::<Vec<_>>().into_iter(),
            )),
            Value::Str(s) | Value::Markup(s) => Ok(Box::new(
                s.chars()
                    .map(|c| Value::str(c.to_string()))
                    .collect::<Vec<_>>()
                    .into_iter(),
            )),
            Value::Object(object) => object.iterate().ok_or_else(|| self.not_iterable()),
            _ => Err(self.not_iterable()),
        }
    }

    fn not_iterable(&self) -> EvalError {
        EvalError::NotIterable(format!("{} value {}", self.type_name(), self.repr()))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::Bool(b) => Some(*b as i64 as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Markup(s) => Some(s),
            _ => None,
        }
    }

    /// Identity comparison (`is`).
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) | (Value::Markup(a), Value::Markup(b)) => {
                Arc::ptr_eq(a, b)
            }
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b),
            (Value::Callable(a), Value::Callable(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::eq(Arc::as_ptr(a) as *const u8, Arc::as_ptr(b) as *const u8)
            }
            _ => false,
        }
    }
}

fn format_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a) | Value::Markup(a), Value::Str(b) | Value::Markup(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.ptr_eq(b),
            (Value::Object(_), Value::Object(_)) => self.is_same(other),
            (a, b) => match (a.as_float(), b.as_float()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Markup(s) => write!(f, "Markup({:?})", s),
            Value::Object(object) => write!(f, "{:?}", object),
            other => f.write_str(&other.repr()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::str(s),
            serde_json::Value::Array(items) => {
                Value::list(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::str(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::list(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::None)
    }
}

/// Build render parameters from a JSON object; other JSON values yield no
/// parameters.
pub fn params_from_json(value: serde_json::Value) -> Params {
    match value {
        serde_json::Value::Object(entries) => entries
            .into_iter()
            .map(|(key, value)| (key, Value::from(value)))
            .collect(),
        _ => Params::new(),
    }
}
