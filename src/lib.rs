//! Deferred, symbolic queries over in-memory entities.
//!
//! Build an [`Expression`](expression::Expression) describing what to compute,
//! compile it once with a [`Compiler`](expression::Compiler), then run it
//! against any number of environments. A [`Repository`](repository::Repository)
//! chains compiled expressions into replayable filter, sort and projection
//! pipelines.

pub mod expression;
pub mod repository;
pub mod value;

pub use expression::{Compiler, Expression, ExpressionError, QueryBuilder};
pub use repository::{QueryError, Repository};
pub use value::Value;
