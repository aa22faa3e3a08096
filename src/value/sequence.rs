//! Restartable lazy sequences.
//!
//! A [`LazySequence`] holds a factory rather than elements: every call to
//! [`LazySequence::iter`] starts a fresh pass, and nothing is computed until the
//! iterator is pulled. Sequences may be infinite.

use crate::expression::ExpressionResult;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Iterator over evaluated elements; each element may fail independently
pub type ValueIter = Box<dyn Iterator<Item = ExpressionResult<Value>>>;

type SequenceFactory = dyn Fn() -> ExpressionResult<ValueIter> + Send + Sync;

#[derive(Clone)]
pub struct LazySequence {
    factory: Arc<SequenceFactory>,
}

impl LazySequence {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> ExpressionResult<ValueIter> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// A sequence replaying a fixed list of values
    pub fn from_values(values: Vec<Value>) -> Self {
        let values = Arc::new(values);
        Self::new(move || {
            let values = Arc::clone(&values);
            let iter = (0..values.len()).map(move |i| Ok(values[i].clone()));
            Ok(Box::new(iter) as ValueIter)
        })
    }

    /// Start a new pass over the sequence
    pub fn iter(&self) -> ExpressionResult<ValueIter> {
        (self.factory)()
    }

    /// Drain a full pass into a vector. Never returns for infinite sequences.
    pub fn to_vec(&self) -> ExpressionResult<Vec<Value>> {
        self.iter()?.collect()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &LazySequence) -> bool {
        Arc::ptr_eq(&self.factory, &other.factory)
    }
}

impl fmt::Debug for LazySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LazySequence")
    }
}
