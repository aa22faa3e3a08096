//! Dynamic values produced and consumed by compiled expressions.
//!
//! This module provides:
//!
//! - **Value**: the closed set of runtime values an expression can evaluate to
//! - **Callable**: host functions and compiled lambdas, invoked with [`Arguments`]
//! - **LazySequence**: restartable lazy sequences (the result of `For`)
//! - **HostObject**: opaque host objects exposing attributes and items
//!
//! Environments are values too: an entity is usually a `Map`, and functional
//! bindings are overlaid onto a copy of it.

pub mod callable;
pub mod json;
pub mod methods;
pub mod object;
pub mod sequence;

pub use callable::{Arguments, Callable};
pub use object::HostObject;
pub use sequence::{LazySequence, ValueIter};

use crate::expression::{Expression, ExpressionError, ExpressionResult};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Values that an expression can evaluate to
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Sequence(LazySequence),
    Callable(Callable),
    Object(Arc<dyn HostObject>),
    /// An expression carried as plain data
    Expression(Arc<Expression>),
}

impl Value {
    /// Build a map value from key/value pairs
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a list value
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::List(items.into_iter().collect())
    }

    /// Wrap a host object
    pub fn object<T: HostObject + 'static>(object: T) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Name of the concrete type of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Sequence(_) => "sequence",
            Value::Callable(_) => "callable",
            Value::Object(_) => "object",
            Value::Expression(_) => "expression",
        }
    }

    /// Type name used in error messages; host objects report their own name
    pub(crate) fn describe_type(&self) -> String {
        match self {
            Value::Object(object) => object.type_name().to_string(),
            other => other.type_name().to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            Value::Expression(expr) => Some(expr),
            _ => None,
        }
    }

    /// Truthiness: null, false, zero and empty containers are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Sequence(_) | Value::Callable(_) | Value::Object(_) | Value::Expression(_) => {
                true
            }
        }
    }

    /// Query equality: ints and floats compare numerically, containers
    /// element-wise, callables, sequences and objects by identity.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(_), Value::Float(_))
            | (Value::Float(_), Value::Int(_))
            | (Value::Float(_), Value::Float(_)) => self.as_float() == other.as_float(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.equals(vb))
            }
            (Value::Sequence(a), Value::Sequence(b)) => a.ptr_eq(b),
            (Value::Callable(a), Value::Callable(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => same_object(a, b),
            (Value::Expression(a), Value::Expression(b)) => a == b,
            _ => false,
        }
    }

    /// Ordering between two values; values without a common order are an error
    pub fn compare(&self, other: &Value) -> ExpressionResult<Ordering> {
        let ordering = match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(_), Value::Float(_))
            | (Value::Float(_), Value::Int(_))
            | (Value::Float(_), Value::Float(_)) => self
                .as_float()
                .zip(other.as_float())
                .and_then(|(a, b)| a.partial_cmp(&b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        unequal => return Ok(unequal),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        };

        ordering.ok_or_else(|| ExpressionError::Unorderable {
            left_type: self.describe_type(),
            right_type: other.describe_type(),
        })
    }

    /// Subscript access: maps by string key, lists and strings by position
    pub fn get_item(&self, key: &Value) -> ExpressionResult<Value> {
        match (self, key) {
            (Value::Map(map), Value::String(name)) => {
                map.get(name)
                    .cloned()
                    .ok_or_else(|| ExpressionError::KeyNotFound {
                        key: key.to_string(),
                        container: "map".to_string(),
                    })
            }
            (Value::List(items), Value::Int(index)) => normalize_index(*index, items.len())
                .map(|i| items[i].clone())
                .ok_or_else(|| ExpressionError::IndexOutOfRange {
                    index: *index,
                    len: items.len(),
                    type_name: "list".to_string(),
                }),
            (Value::String(s), Value::Int(index)) => {
                let chars: Vec<char> = s.chars().collect();
                normalize_index(*index, chars.len())
                    .map(|i| Value::String(chars[i].to_string()))
                    .ok_or_else(|| ExpressionError::IndexOutOfRange {
                        index: *index,
                        len: chars.len(),
                        type_name: "str".to_string(),
                    })
            }
            (Value::Object(object), _) => {
                object
                    .item(key)
                    .ok_or_else(|| ExpressionError::KeyNotFound {
                        key: key.to_string(),
                        container: object.type_name().to_string(),
                    })
            }
            _ => Err(ExpressionError::NotSubscriptable {
                type_name: self.describe_type(),
                key_type: key.describe_type(),
            }),
        }
    }

    /// Member access: map fields, host object attributes, then builtin methods
    pub fn get_attr(&self, name: &str) -> ExpressionResult<Value> {
        let member = match self {
            Value::Map(map) => map.get(name).cloned(),
            Value::Object(object) => object.attribute(name),
            _ => None,
        };

        member
            .or_else(|| methods::bound_method(self, name).map(Value::Callable))
            .ok_or_else(|| ExpressionError::AttributeNotFound {
                type_name: self.describe_type(),
                name: name.to_string(),
            })
    }

    /// Invoke this value as a callable
    pub fn call(&self, arguments: Arguments) -> ExpressionResult<Value> {
        match self {
            Value::Callable(callable) => callable.call(arguments),
            other => Err(ExpressionError::NotCallable {
                type_name: other.describe_type(),
            }),
        }
    }

    /// Iterate over the elements of a sequence-like value
    pub fn iter(&self) -> ExpressionResult<ValueIter> {
        match self {
            Value::List(items) => Ok(Box::new(items.clone().into_iter().map(Ok))),
            Value::Sequence(sequence) => sequence.iter(),
            Value::String(s) => {
                let chars: Vec<Value> = s.chars().map(|c| Value::String(c.to_string())).collect();
                Ok(Box::new(chars.into_iter().map(Ok)))
            }
            Value::Map(map) => {
                let keys: Vec<Value> = map.keys().cloned().map(Value::String).collect();
                Ok(Box::new(keys.into_iter().map(Ok)))
            }
            other => Err(ExpressionError::NotIterable {
                type_name: other.describe_type(),
            }),
        }
    }

    /// A copy of this environment with `name` bound to `value`
    pub fn with_binding(&self, name: &str, value: Value) -> ExpressionResult<Value> {
        match self {
            Value::Map(map) => {
                let mut overlay = map.clone();
                overlay.insert(name.to_string(), value);
                Ok(Value::Map(overlay))
            }
            Value::Null => Ok(Value::map([(name, value)])),
            other => Err(ExpressionError::InvalidEnvironment {
                name: name.to_string(),
                type_name: other.describe_type(),
            }),
        }
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 {
        len as i64 + index
    } else {
        index
    };
    if resolved >= 0 && (resolved as u64) < len as u64 {
        Some(resolved as usize)
    } else {
        None
    }
}

fn same_object(a: &Arc<dyn HostObject>, b: &Arc<dyn HostObject>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Structural equality; unlike [`Value::equals`], `Int(1) != Float(1.0)`
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a.ptr_eq(b),
            (Value::Callable(a), Value::Callable(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => same_object(a, b),
            (Value::Expression(a), Value::Expression(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Boolean(true) => write!(f, "True"),
            Value::Boolean(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}': {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Sequence(_) => write!(f, "<sequence>"),
            Value::Callable(callable) => write!(f, "<callable {}>", callable.name()),
            Value::Object(object) => write!(f, "<{}>", object.type_name()),
            Value::Expression(expr) => write!(f, "Raw({})", expr),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Value::Map(value)
    }
}

impl From<Callable> for Value {
    fn from(value: Callable) -> Self {
        Value::Callable(value)
    }
}

impl From<LazySequence> for Value {
    fn from(value: LazySequence) -> Self {
        Value::Sequence(value)
    }
}

impl From<Expression> for Value {
    fn from(value: Expression) -> Self {
        Value::Expression(Arc::new(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> Value {
        Value::map([
            ("name", Value::from("Alice")),
            ("age", Value::from(30)),
            ("tags", Value::list([Value::from("a"), Value::from("b")])),
        ])
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(sample_map().is_truthy());
    }

    #[test]
    fn test_equals_vs_structural_eq() {
        assert!(Value::Int(1).equals(&Value::Float(1.0)));
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert!(!Value::Int(1).equals(&Value::from("1")));
        assert!(Value::list([Value::Int(2)]).equals(&Value::list([Value::Float(2.0)])));
    }

    #[test]
    fn test_compare() {
        assert_eq!(Value::Int(1).compare(&Value::Int(2)).unwrap(), Ordering::Less);
        assert_eq!(
            Value::Float(2.5).compare(&Value::Int(2)).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            Value::from("abc").compare(&Value::from("abd")).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            Value::list([Value::Int(1), Value::Int(2)])
                .compare(&Value::list([Value::Int(1)]))
                .unwrap(),
            Ordering::Greater
        );
        assert!(matches!(
            Value::Int(1).compare(&Value::from("1")),
            Err(ExpressionError::Unorderable { .. })
        ));
    }

    #[test]
    fn test_get_item() {
        let map = sample_map();
        assert_eq!(map.get_item(&Value::from("age")).unwrap(), Value::Int(30));
        assert!(map.get_item(&Value::from("missing")).unwrap_err().is_lookup());

        let tags = map.get_item(&Value::from("tags")).unwrap();
        assert_eq!(tags.get_item(&Value::Int(-1)).unwrap(), Value::from("b"));
        assert!(matches!(
            tags.get_item(&Value::Int(2)),
            Err(ExpressionError::IndexOutOfRange { index: 2, len: 2, .. })
        ));

        assert_eq!(
            Value::from("héllo").get_item(&Value::Int(1)).unwrap(),
            Value::from("é")
        );
        assert!(Value::Int(3).get_item(&Value::Int(0)).unwrap_err().is_type_error());
    }

    #[test]
    fn test_get_attr_prefers_fields_over_methods() {
        let map = Value::map([("len", Value::Int(99))]);
        assert_eq!(map.get_attr("len").unwrap(), Value::Int(99));

        let len = sample_map().get_attr("len").unwrap();
        assert_eq!(len.call(Arguments::default()).unwrap(), Value::Int(3));

        assert!(matches!(
            Value::Int(1).get_attr("name"),
            Err(ExpressionError::AttributeNotFound { .. })
        ));
    }

    #[test]
    fn test_iter() {
        let items: Vec<Value> = Value::from("ab")
            .iter()
            .unwrap()
            .collect::<ExpressionResult<_>>()
            .unwrap();
        assert_eq!(items, vec![Value::from("a"), Value::from("b")]);

        assert!(Value::Int(1).iter().is_err());
    }

    #[test]
    fn test_with_binding_copies_environment() {
        let env = Value::map([("x", Value::Int(1))]);
        let bound = env.with_binding("y", Value::Int(2)).unwrap();

        assert_eq!(env.as_map().unwrap().len(), 1);
        assert_eq!(bound.get_item(&Value::from("y")).unwrap(), Value::Int(2));
        assert_eq!(bound.get_item(&Value::from("x")).unwrap(), Value::Int(1));

        let fresh = Value::Null.with_binding("y", Value::Int(2)).unwrap();
        assert_eq!(fresh, Value::map([("y", Value::Int(2))]));

        assert!(matches!(
            Value::Int(1).with_binding("y", Value::Null),
            Err(ExpressionError::InvalidEnvironment { .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("Nike").to_string(), "'Nike'");
        assert_eq!(Value::Null.to_string(), "None");
        assert_eq!(
            Value::list([Value::Int(1), Value::Boolean(true)]).to_string(),
            "[1, True]"
        );
        assert_eq!(sample_map().get_attr("age").unwrap().to_string(), "30");
    }
}
