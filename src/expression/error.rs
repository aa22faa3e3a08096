//! Error types for expression evaluation.
//!
//! Compiling an expression never fails; every variant here is raised while a
//! compiled expression runs against a concrete environment.

use thiserror::Error;

/// Errors that can occur during expression evaluation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    /// Key lookup into a container found nothing
    #[error("Key {key} not found in {container}")]
    KeyNotFound { key: String, container: String },

    /// Member access found no attribute or method
    #[error("'{type_name}' value has no attribute '{name}'")]
    AttributeNotFound { type_name: String, name: String },

    /// Positional index outside the container
    #[error("Index {index} out of range for {type_name} of length {len}")]
    IndexOutOfRange {
        index: i64,
        len: usize,
        type_name: String,
    },

    /// Subscript applied to a value that is not a container
    #[error("'{type_name}' value is not subscriptable with {key_type} key")]
    NotSubscriptable { type_name: String, key_type: String },

    /// Call applied to a value that is not callable
    #[error("'{type_name}' value is not callable")]
    NotCallable { type_name: String },

    /// Iteration over a value that is not a sequence
    #[error("'{type_name}' value is not iterable")]
    NotIterable { type_name: String },

    /// Invalid operand types for operator
    #[error("Invalid operand types for operator {operator}: left={left_type}, right={right_type:?}")]
    InvalidOperandTypes {
        operator: String,
        left_type: String,
        right_type: Option<String>,
    },

    /// Ordering requested between values without an order
    #[error("Cannot order {left_type} against {right_type}")]
    Unorderable {
        left_type: String,
        right_type: String,
    },

    /// Wrong number of arguments passed to a callable
    #[error("{function} expects {expected} arguments, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Division by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Integer arithmetic overflowed
    #[error("Integer overflow in {operator}")]
    Overflow { operator: String },

    /// Binding requested on an environment that cannot hold bindings
    #[error("Cannot bind '{name}' in a {type_name} environment")]
    InvalidEnvironment { name: String, type_name: String },

    /// Operator applied to an empty operand list
    #[error("Operator {operator} has no operands")]
    EmptyOperation { operator: String },

    /// Operator chain built with fewer than two operands
    #[error("Operator {operator} needs at least two operands, got {count}")]
    TooFewOperands { operator: String, count: usize },

    /// Failure raised by a host callable or host object
    #[error("{0}")]
    Host(String),
}

impl ExpressionError {
    /// Whether this error reports a missing name, attribute or index.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            ExpressionError::KeyNotFound { .. }
                | ExpressionError::AttributeNotFound { .. }
                | ExpressionError::IndexOutOfRange { .. }
        )
    }

    /// Whether this error reports an operation applied to incompatible values.
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            ExpressionError::NotSubscriptable { .. }
                | ExpressionError::NotCallable { .. }
                | ExpressionError::NotIterable { .. }
                | ExpressionError::InvalidOperandTypes { .. }
                | ExpressionError::Unorderable { .. }
                | ExpressionError::ArgumentCount { .. }
                | ExpressionError::InvalidEnvironment { .. }
        )
    }

    pub(crate) fn operands(operator: &str, left: &str, right: Option<&str>) -> Self {
        ExpressionError::InvalidOperandTypes {
            operator: operator.to_string(),
            left_type: left.to_string(),
            right_type: right.map(str::to_string),
        }
    }
}

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExpressionError::KeyNotFound {
            key: "'x'".to_string(),
            container: "map".to_string(),
        };
        assert_eq!(err.to_string(), "Key 'x' not found in map");

        let err = ExpressionError::operands("+", "int", Some("str"));
        assert_eq!(
            err.to_string(),
            "Invalid operand types for operator +: left=int, right=Some(\"str\")"
        );

        let err = ExpressionError::IndexOutOfRange {
            index: 5,
            len: 3,
            type_name: "list".to_string(),
        };
        assert_eq!(err.to_string(), "Index 5 out of range for list of length 3");

        assert_eq!(ExpressionError::DivisionByZero.to_string(), "Division by zero");

        let err = ExpressionError::ArgumentCount {
            function: "startswith".to_string(),
            expected: "1".to_string(),
            actual: 2,
        };
        assert_eq!(err.to_string(), "startswith expects 1 arguments, got 2");
    }

    #[test]
    fn test_error_classification() {
        let lookup = ExpressionError::AttributeNotFound {
            type_name: "int".to_string(),
            name: "name".to_string(),
        };
        assert!(lookup.is_lookup());
        assert!(!lookup.is_type_error());

        let type_error = ExpressionError::NotCallable {
            type_name: "str".to_string(),
        };
        assert!(type_error.is_type_error());
        assert!(!type_error.is_lookup());

        assert!(!ExpressionError::DivisionByZero.is_lookup());
        assert!(!ExpressionError::DivisionByZero.is_type_error());
    }
}
