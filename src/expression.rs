//! Deferred query expressions.
//!
//! This module provides:
//! - Expression AST representation with chain flattening and negation rules
//! - Operator semantics on dynamic values
//! - Compilation of expressions into reusable evaluators
//! - A builder for composing queries without operator overloading

pub mod builder;
pub mod compiler;
pub mod error;
pub mod eval;
pub mod expr;
pub mod operator;

pub use builder::QueryBuilder;
pub use compiler::{AttributeLookup, CompiledExpression, Compiler, IndexLookup, ValueLookup};
pub use error::{ExpressionError, ExpressionResult};
pub use expr::{BinaryOperation, Expression};
pub use operator::{BinaryOperator, UnaryOperator};
