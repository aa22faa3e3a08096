//! Callable values and the arguments passed to them.

use crate::expression::{ExpressionError, ExpressionResult};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Arguments of a call, positional first, then named in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    pub positional: Vec<Value>,
    pub named: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new(positional: Vec<Value>, named: Vec<(String, Value)>) -> Self {
        Self { positional, named }
    }

    pub fn positional(positional: Vec<Value>) -> Self {
        Self {
            positional,
            named: Vec::new(),
        }
    }

    /// Total number of arguments
    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Positional argument at `index`
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Named argument by name
    pub fn named(&self, name: &str) -> Option<&Value> {
        self.named
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Fail unless between `min` and `max` arguments were passed
    pub fn expect_count(&self, function: &str, min: usize, max: usize) -> ExpressionResult<()> {
        let actual = self.len();
        if actual < min || actual > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{} to {}", min, max)
            };
            return Err(ExpressionError::ArgumentCount {
                function: function.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Positional string argument at `index`
    pub fn string_at(&self, function: &str, index: usize) -> ExpressionResult<&str> {
        match self.get(index) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(ExpressionError::operands(
                function,
                &other.describe_type(),
                None,
            )),
            None => Err(ExpressionError::ArgumentCount {
                function: function.to_string(),
                expected: format!("at least {}", index + 1),
                actual: self.len(),
            }),
        }
    }
}

type NativeFn = dyn Fn(Arguments) -> ExpressionResult<Value> + Send + Sync;

/// A function value: either supplied by the host or produced by compiling a
/// `Function` expression
#[derive(Clone)]
pub struct Callable {
    name: Arc<str>,
    func: Arc<NativeFn>,
}

impl Callable {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Arguments) -> ExpressionResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, arguments: Arguments) -> ExpressionResult<Value> {
        (self.func)(arguments)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.name)
    }
}
