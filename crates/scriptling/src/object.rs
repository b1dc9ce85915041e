//! The runtime value type and host-facing conversions.
//!
//! `Object` is both the interpreter's runtime value and the public type hosts
//! use to pass data in and out. Compound values share their storage through
//! `Rc`, so cloning an `Object` is cheap and mutation through one handle is
//! visible through every other, matching script semantics for lists, dicts
//! and instances.

use std::{
    cell::RefCell,
    fmt,
    rc::Rc,
};

use indexmap::IndexMap;

use crate::{
    class::{Class, Instance, SuperProxy},
    exception::{ExcType, Exception},
    function::{BoundMethod, Builtin, Function, LambdaFn},
};

/// Depth bound for `repr` of self-referential containers.
const MAX_REPR_DEPTH: usize = 32;

#[derive(Clone)]
pub enum Object {
    None,
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit IEEE-754 float.
    Float(f64),
    /// Immutable UTF-8 text.
    Str(Rc<str>),
    /// Mutable ordered sequence.
    List(Rc<RefCell<Vec<Object>>>),
    /// Immutable ordered sequence.
    Tuple(Rc<Vec<Object>>),
    /// String-keyed mapping; see [`Dict`].
    Dict(Rc<RefCell<Dict>>),
    /// Script-defined function with captured environment.
    Function(Rc<Function>),
    /// Script-defined lambda with expression body.
    Lambda(Rc<LambdaFn>),
    /// Host-supplied callable.
    Builtin(Rc<Builtin>),
    Class(Rc<Class>),
    Instance(Rc<RefCell<Instance>>),
    /// Instance + method pair produced by attribute access.
    BoundMethod(Rc<BoundMethod>),
    /// `super()` dispatch proxy.
    Super(Rc<SuperProxy>),
    /// A caught or raised exception value (`except E as e`).
    Exception(Rc<Exception>),
}

impl Object {
    pub fn str(text: impl AsRef<str>) -> Self {
        Self::Str(Rc::from(text.as_ref()))
    }

    pub fn list(items: Vec<Self>) -> Self {
        Self::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Self>) -> Self {
        Self::Tuple(Rc::new(items))
    }

    pub fn dict(dict: Dict) -> Self {
        Self::Dict(Rc::new(RefCell::new(dict)))
    }

    /// The script-visible type name (as reported by `type()`).
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Dict(_) => "dict",
            Self::Function(_) | Self::Lambda(_) => "function",
            Self::Builtin(_) => "builtin",
            Self::Class(_) => "class",
            Self::Instance(_) => "instance",
            Self::BoundMethod(_) => "method",
            Self::Super(_) => "super",
            Self::Exception(exc) => exc.kind().name(),
        }
    }

    /// Python-style truthiness.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.borrow().is_empty(),
            Self::Tuple(items) => !items.is_empty(),
            Self::Dict(dict) => !dict.borrow().is_empty(),
            _ => true,
        }
    }

    /// Numeric view shared by `Int`, `Float` and `Bool`.
    #[must_use]
    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub(crate) fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_) | Self::Bool(_))
    }

    /// Script equality: numeric kinds compare as one family, any other kind
    /// mismatch compares unequal without raising.
    #[must_use]
    pub fn py_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (a, b) if a.is_numeric() && b.is_numeric() => match (a, b) {
                (Self::Int(x), Self::Int(y)) => x == y,
                (Self::Bool(x), Self::Bool(y)) => x == y,
                _ => a.as_f64() == b.as_f64(),
            },
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.py_eq(y))
            }
            (Self::Tuple(a), Self::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.py_eq(y))
            }
            (Self::Dict(a), Self::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                a.borrow().py_eq(&b.borrow())
            }
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Lambda(a), Self::Lambda(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => Rc::ptr_eq(a, b),
            (Self::Class(a), Self::Class(b)) => Rc::ptr_eq(a, b),
            (Self::Instance(a), Self::Instance(b)) => Rc::ptr_eq(a, b),
            (Self::Exception(a), Self::Exception(b)) => a == b,
            _ => false,
        }
    }

    /// `repr()`-style rendering: strings quoted, containers recursive.
    #[must_use]
    pub fn repr(&self) -> String {
        self.repr_depth(0)
    }

    fn repr_depth(&self, depth: usize) -> String {
        if depth > MAX_REPR_DEPTH {
            return "...".to_owned();
        }
        match self {
            Self::None => "None".to_owned(),
            Self::Bool(true) => "True".to_owned(),
            Self::Bool(false) => "False".to_owned(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => format_float(*f),
            Self::Str(s) => string_repr(s),
            Self::List(items) => {
                let items = items.borrow();
                let parts: Vec<String> = items.iter().map(|item| item.repr_depth(depth + 1)).collect();
                format!("[{}]", parts.join(", "))
            }
            Self::Tuple(items) => {
                let parts: Vec<String> = items.iter().map(|item| item.repr_depth(depth + 1)).collect();
                if parts.len() == 1 {
                    format!("({},)", parts[0])
                } else {
                    format!("({})", parts.join(", "))
                }
            }
            Self::Dict(dict) => {
                let dict = dict.borrow();
                let parts: Vec<String> = dict
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key.repr_depth(depth + 1), value.repr_depth(depth + 1)))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Self::Function(func) => format!("<function {}>", func.name),
            Self::Lambda(_) => "<lambda>".to_owned(),
            Self::Builtin(builtin) => format!("<builtin {}>", builtin.name),
            Self::Class(class) => format!("<class '{}'>", class.name),
            Self::Instance(instance) => format!("<{} instance>", instance.borrow().class.name),
            Self::BoundMethod(method) => format!("<bound method {}>", method.name()),
            Self::Super(_) => "<super>".to_owned(),
            Self::Exception(exc) => format!("{}({})", exc.kind().name(), string_repr(exc.message())),
        }
    }
}

impl fmt::Display for Object {
    /// `str()`-style rendering: strings bare, everything else as `repr`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Instance(instance) => write!(f, "<{} instance>", instance.borrow().class.name),
            Self::Exception(exc) => f.write_str(exc.message()),
            other => f.write_str(&other.repr()),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

/// Strict host-side equality: same kind, equal contents. Reference kinds
/// compare by identity. (Script `==` uses [`Object::py_eq`], which also
/// equates numeric kinds.)
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::None, Self::None) => true,
            _ => self.py_eq(other) && std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

fn string_repr(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// Renders a float the way scripts expect: shortest round-trip form, with a
/// trailing `.0` for integral values.
pub(crate) fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_owned();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf".to_owned() } else { "-inf".to_owned() };
    }
    let mut buffer = ryu::Buffer::new();
    buffer.format(f).to_owned()
}

/// A string-keyed mapping.
///
/// Every key is canonicalized to its `str()` form for storage; each entry
/// keeps the original key object alongside the value so iteration yields the
/// keys as written. Insertion order is preserved.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    entries: IndexMap<String, (Object, Object)>,
}

impl Dict {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: IndexMap::new() }
    }

    /// The canonical storage key for a key object.
    #[must_use]
    pub fn canonical_key(key: &Object) -> String {
        key.to_string()
    }

    pub fn insert(&mut self, key: Object, value: Object) {
        let canonical = Self::canonical_key(&key);
        self.entries.insert(canonical, (key, value));
    }

    #[must_use]
    pub fn get_by_string(&self, key: &str) -> Option<Object> {
        self.entries.get(key).map(|(_, value)| value.clone())
    }

    pub fn set_by_string(&mut self, key: &str, value: Object) {
        self.entries.insert(key.to_owned(), (Object::str(key), value));
    }

    #[must_use]
    pub fn contains_string(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove_by_string(&mut self, key: &str) -> Option<Object> {
        self.entries.shift_remove(key).map(|(_, value)| value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates `(key object, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Object, &Object)> {
        self.entries.values().map(|(key, value)| (key, value))
    }

    #[must_use]
    pub fn keys(&self) -> Vec<Object> {
        self.entries.values().map(|(key, _)| key.clone()).collect()
    }

    #[must_use]
    pub fn values(&self) -> Vec<Object> {
        self.entries.values().map(|(_, value)| value.clone()).collect()
    }

    pub(crate) fn py_eq(&self, other: &Self) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries.iter().all(|(canonical, (_, value))| {
            other
                .entries
                .get(canonical)
                .is_some_and(|(_, other_value)| value.py_eq(other_value))
        })
    }
}

// === Host conversions ===

impl From<()> for Object {
    fn from((): ()) -> Self {
        Self::None
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Object {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Object {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for Object {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for Object {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<&str> for Object {
    fn from(value: &str) -> Self {
        Self::str(value)
    }
}

impl From<String> for Object {
    fn from(value: String) -> Self {
        Self::Str(Rc::from(value.as_str()))
    }
}

impl<T: Into<Object>> From<Vec<T>> for Object {
    fn from(values: Vec<T>) -> Self {
        Self::list(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Object>> From<IndexMap<String, T>> for Object {
    fn from(values: IndexMap<String, T>) -> Self {
        let mut dict = Dict::new();
        for (key, value) in values {
            dict.set_by_string(&key, value.into());
        }
        Self::dict(dict)
    }
}

impl<T: Into<Object>> From<std::collections::HashMap<String, T>> for Object {
    fn from(values: std::collections::HashMap<String, T>) -> Self {
        let mut dict = Dict::new();
        for (key, value) in values {
            dict.set_by_string(&key, value.into());
        }
        Self::dict(dict)
    }
}

impl TryFrom<&Object> for i64 {
    type Error = Exception;

    fn try_from(obj: &Object) -> Result<Self, Exception> {
        match obj {
            Object::Int(n) => Ok(*n),
            Object::Bool(b) => Ok(Self::from(*b)),
            other => Err(Exception::new(
                ExcType::TypeError,
                format!("expected int, got {}", other.type_name()),
            )),
        }
    }
}

impl TryFrom<&Object> for f64 {
    type Error = Exception;

    fn try_from(obj: &Object) -> Result<Self, Exception> {
        obj.as_f64().ok_or_else(|| {
            Exception::new(ExcType::TypeError, format!("expected float, got {}", obj.type_name()))
        })
    }
}

impl TryFrom<&Object> for bool {
    type Error = Exception;

    fn try_from(obj: &Object) -> Result<Self, Exception> {
        match obj {
            Object::Bool(b) => Ok(*b),
            other => Err(Exception::new(
                ExcType::TypeError,
                format!("expected bool, got {}", other.type_name()),
            )),
        }
    }
}

impl TryFrom<&Object> for String {
    type Error = Exception;

    fn try_from(obj: &Object) -> Result<Self, Exception> {
        match obj {
            Object::Str(s) => Ok(s.to_string()),
            other => Err(Exception::new(
                ExcType::TypeError,
                format!("expected str, got {}", other.type_name()),
            )),
        }
    }
}

impl TryFrom<&Object> for Vec<Object> {
    type Error = Exception;

    fn try_from(obj: &Object) -> Result<Self, Exception> {
        match obj {
            Object::List(items) => Ok(items.borrow().clone()),
            Object::Tuple(items) => Ok(items.as_ref().clone()),
            other => Err(Exception::new(
                ExcType::TypeError,
                format!("expected list, got {}", other.type_name()),
            )),
        }
    }
}

impl Object {
    /// Converts any serde-serializable host value through the JSON data
    /// model. This is the fallback for host types with no direct mapping.
    pub fn from_serialize<T: serde::Serialize>(value: &T) -> Result<Self, Exception> {
        let json = serde_json::to_value(value)
            .map_err(|err| Exception::new(ExcType::TypeError, format!("cannot convert host value: {err}")))?;
        Ok(Self::from_json(&json))
    }

    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::str(s),
            serde_json::Value::Array(items) => Self::list(items.iter().map(Self::from_json).collect()),
            serde_json::Value::Object(map) => {
                let mut dict = Dict::new();
                for (key, value) in map {
                    dict.set_by_string(key, Self::from_json(value));
                }
                Self::dict(dict)
            }
        }
    }

    /// Converts back to JSON. Callables, classes and instances have no JSON
    /// form and produce a `TypeError`.
    pub fn to_json(&self) -> Result<serde_json::Value, Exception> {
        Ok(match self {
            Self::None => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(n) => serde_json::Value::from(*n),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Str(s) => serde_json::Value::from(s.as_ref()),
            Self::List(items) => {
                let items = items.borrow();
                serde_json::Value::Array(items.iter().map(Self::to_json).collect::<Result<_, _>>()?)
            }
            Self::Tuple(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_json).collect::<Result<_, _>>()?)
            }
            Self::Dict(dict) => {
                let dict = dict.borrow();
                let mut map = serde_json::Map::with_capacity(dict.len());
                for (key, value) in dict.iter() {
                    map.insert(key.to_string(), value.to_json()?);
                }
                serde_json::Value::Object(map)
            }
            other => {
                return Err(Exception::new(
                    ExcType::TypeError,
                    format!("{} is not JSON-serializable", other.type_name()),
                ));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_family_equality() {
        assert!(Object::Int(1).py_eq(&Object::Float(1.0)));
        assert!(Object::Bool(true).py_eq(&Object::Int(1)));
        assert!(!Object::Int(5).py_eq(&Object::str("hello")));
    }

    #[test]
    fn repr_forms() {
        assert_eq!(Object::str("a'b").repr(), "'a\\'b'");
        assert_eq!(Object::Float(3.0).repr(), "3.0");
        assert_eq!(Object::tuple(vec![Object::Int(1)]).repr(), "(1,)");
    }

    #[test]
    fn dict_canonical_keys() {
        let mut dict = Dict::new();
        dict.insert(Object::Int(1), Object::str("int"));
        assert_eq!(dict.get_by_string("1"), Some(Object::str("int")));
        dict.insert(Object::str("1"), Object::str("str"));
        // Same canonical slot: the later write wins.
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get_by_string("1"), Some(Object::str("str")));
    }

    #[test]
    fn json_round_trip() {
        let json: serde_json::Value = serde_json::from_str(r#"{"a": [1, 2.5, "x", null, true]}"#).unwrap();
        let obj = Object::from_json(&json);
        assert_eq!(obj.to_json().unwrap(), json);
    }
}
