//! Opaque host objects.

use crate::value::Value;
use std::fmt;

/// A host-defined value that expressions can read attributes and items from
///
/// # Example
/// ```
/// use common_query::value::{HostObject, Value};
///
/// #[derive(Debug)]
/// struct Person {
///     name: String,
/// }
///
/// impl HostObject for Person {
///     fn type_name(&self) -> &str {
///         "Person"
///     }
///
///     fn attribute(&self, name: &str) -> Option<Value> {
///         match name {
///             "name" => Some(Value::from(self.name.as_str())),
///             _ => None,
///         }
///     }
/// }
///
/// let person = Value::object(Person { name: "Johnny".into() });
/// assert_eq!(person.get_attr("name").unwrap(), Value::from("Johnny"));
/// ```
pub trait HostObject: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;

    /// Attribute lookup; `None` falls through to builtin methods, then fails
    fn attribute(&self, name: &str) -> Option<Value>;

    /// Subscript lookup
    fn item(&self, _key: &Value) -> Option<Value> {
        None
    }
}
