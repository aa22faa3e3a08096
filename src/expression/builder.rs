//! Builder functions for creating query expressions easily.
//!
//! Every method returns a plain [`Expression`]; nothing here evaluates
//! anything. The same expressions can be built with the fluent methods on
//! [`Expression`], this module just reads better for nested queries:
//!
//! ```
//! use common_query::expression::QueryBuilder as Q;
//!
//! let query = Q::and(
//!     Q::starts_with(Q::lower(Q::field("brand")), "n"),
//!     Q::gt(Q::field("group"), Q::int(1)),
//! );
//! assert_eq!(
//!     query.to_string(),
//!     "brand.lower().startswith('n') & (group > 1)"
//! );
//! ```

use crate::expression::Expression;
use crate::value::Value;

/// Builder for creating query expressions
pub struct QueryBuilder;

impl QueryBuilder {
    /// Reference a field of the environment by name
    pub fn field(name: impl Into<String>) -> Expression {
        Expression::field(name)
    }

    /// Reference a field whose name is computed by `key`
    pub fn reference(key: Expression) -> Expression {
        Expression::reference(key)
    }

    /// Create a literal value expression
    pub fn value(val: impl Into<Value>) -> Expression {
        Expression::literal(val)
    }

    /// Carry an expression as data; it is returned as is, never evaluated
    pub fn raw(expr: Expression) -> Expression {
        Expression::literal(expr)
    }

    pub fn int(val: i64) -> Expression {
        Expression::literal(Value::Int(val))
    }

    pub fn float(val: f64) -> Expression {
        Expression::literal(Value::Float(val))
    }

    pub fn string(val: impl Into<String>) -> Expression {
        Expression::literal(Value::String(val.into()))
    }

    pub fn boolean(val: bool) -> Expression {
        Expression::literal(Value::Boolean(val))
    }

    pub fn null() -> Expression {
        Expression::literal(Value::Null)
    }

    /// Member access (`parent.name`)
    pub fn attr(parent: Expression, name: impl Into<String>) -> Expression {
        parent.attr(name)
    }

    /// Subscript access (`parent[key]`)
    pub fn item(parent: Expression, key: impl Into<Expression>) -> Expression {
        parent.item(key)
    }

    /// Invoke `callee` with positional arguments
    pub fn call(callee: Expression, args: Vec<Expression>) -> Expression {
        callee.call(args)
    }

    /// Invoke the method `name` of `receiver` (`receiver.name(args...)`)
    pub fn method(
        receiver: Expression,
        name: impl Into<String>,
        args: Vec<Expression>,
    ) -> Expression {
        receiver.attr(name).call(args)
    }

    pub fn eq(left: Expression, right: impl Into<Expression>) -> Expression {
        left.equals(right)
    }

    pub fn ne(left: Expression, right: impl Into<Expression>) -> Expression {
        left.not_equals(right)
    }

    pub fn lt(left: Expression, right: impl Into<Expression>) -> Expression {
        left.lt(right)
    }

    pub fn le(left: Expression, right: impl Into<Expression>) -> Expression {
        left.le(right)
    }

    pub fn gt(left: Expression, right: impl Into<Expression>) -> Expression {
        left.gt(right)
    }

    pub fn ge(left: Expression, right: impl Into<Expression>) -> Expression {
        left.ge(right)
    }

    pub fn and(left: Expression, right: impl Into<Expression>) -> Expression {
        left.and(right)
    }

    pub fn or(left: Expression, right: impl Into<Expression>) -> Expression {
        left.or(right)
    }

    /// Logical complement, rewriting comparisons in place
    pub fn not(expr: Expression) -> Expression {
        expr.negate()
    }

    pub fn add(left: Expression, right: impl Into<Expression>) -> Expression {
        left.plus(right)
    }

    pub fn sub(left: Expression, right: impl Into<Expression>) -> Expression {
        left.minus(right)
    }

    pub fn mul(left: Expression, right: impl Into<Expression>) -> Expression {
        left.times(right)
    }

    pub fn div(left: Expression, right: impl Into<Expression>) -> Expression {
        left.divide(right)
    }

    pub fn floor_div(left: Expression, right: impl Into<Expression>) -> Expression {
        left.floor_divide(right)
    }

    pub fn pow(left: Expression, right: impl Into<Expression>) -> Expression {
        left.power(right)
    }

    pub fn modulo(left: Expression, right: impl Into<Expression>) -> Expression {
        left.modulo(right)
    }

    /// Arithmetic negation
    pub fn neg(expr: Expression) -> Expression {
        expr.negative()
    }

    /// Mark a sort key as descending; marking twice sorts ascending again
    pub fn descending(expr: Expression) -> Expression {
        expr.negative()
    }

    /// Conjunction of `exprs`; the literal `true` for an empty list
    pub fn all(exprs: Vec<Expression>) -> Expression {
        let mut exprs = exprs.into_iter();
        match exprs.next() {
            Some(first) => exprs.fold(first, |all, next| all.and(next)),
            None => Expression::Literal(Value::Boolean(true)),
        }
    }

    /// Lazily apply `function` to each element of `source`
    pub fn for_each(source: Expression, function: Expression) -> Expression {
        Expression::for_each(source).apply(function)
    }

    pub fn function(parameter: impl Into<String>, body: Expression) -> Expression {
        Expression::function(parameter, body)
    }

    pub fn if_then(condition: Expression, then: impl Into<Expression>) -> Expression {
        Expression::if_then(condition, then)
    }

    pub fn if_else(
        condition: Expression,
        then: impl Into<Expression>,
        otherwise: impl Into<Expression>,
    ) -> Expression {
        Expression::if_then(condition, then).otherwise(otherwise)
    }

    /// Bind `name` in a copy of the environment
    pub fn assign(name: impl Into<String>, value: impl Into<Expression>) -> Expression {
        Expression::assign(name, value)
    }
}

/// Convenience functions for common string queries
impl QueryBuilder {
    /// `expr.lower()`
    pub fn lower(expr: Expression) -> Expression {
        Self::method(expr, "lower", Vec::new())
    }

    /// `expr.upper()`
    pub fn upper(expr: Expression) -> Expression {
        Self::method(expr, "upper", Vec::new())
    }

    /// `expr.startswith(prefix)`
    pub fn starts_with(expr: Expression, prefix: impl Into<String>) -> Expression {
        Self::method(expr, "startswith", vec![Self::string(prefix)])
    }

    /// `expr.endswith(suffix)`
    pub fn ends_with(expr: Expression, suffix: impl Into<String>) -> Expression {
        Self::method(expr, "endswith", vec![Self::string(suffix)])
    }

    /// `expr.contains(needle)`
    pub fn contains(expr: Expression, needle: impl Into<Expression>) -> Expression {
        Self::method(expr, "contains", vec![needle.into()])
    }

    /// Filter for field equals value
    pub fn field_equals(name: impl Into<String>, value: impl Into<Value>) -> Expression {
        Self::eq(Self::field(name), Self::value(value))
    }
}
