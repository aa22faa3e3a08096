//! Operator semantics on values.
//!
//! These functions are shared by the compiler (at evaluation time) and by the
//! expression constructors (for literal folding at build time).

use crate::expression::{BinaryOperator, ExpressionError, ExpressionResult, UnaryOperator};
use crate::value::Value;
use std::cmp::Ordering;

/// Apply a binary operator to one pair of operands
///
/// Boolean operators yield `Value::Boolean`; arithmetic operators yield the
/// arithmetic result.
pub fn apply_binary(op: BinaryOperator, left: &Value, right: &Value) -> ExpressionResult<Value> {
    match op {
        BinaryOperator::Eq => Ok(Value::Boolean(left.equals(right))),
        BinaryOperator::Ne => Ok(Value::Boolean(!left.equals(right))),
        BinaryOperator::Gt => compare(left, right, |ord| ord == Ordering::Greater),
        BinaryOperator::Ge => compare(left, right, |ord| ord != Ordering::Less),
        BinaryOperator::Lt => compare(left, right, |ord| ord == Ordering::Less),
        BinaryOperator::Le => compare(left, right, |ord| ord != Ordering::Greater),
        BinaryOperator::And => Ok(Value::Boolean(left.is_truthy() && right.is_truthy())),
        BinaryOperator::Or => Ok(Value::Boolean(left.is_truthy() || right.is_truthy())),
        BinaryOperator::Add => add(left, right),
        BinaryOperator::Sub => numeric(op, left, right, i64::checked_sub, |a, b| Ok(a - b)),
        BinaryOperator::Mul => multiply(left, right),
        BinaryOperator::Div => divide(left, right),
        BinaryOperator::FloorDiv => numeric(op, left, right, floor_div_int, |a, b| {
            if b == 0.0 {
                Err(ExpressionError::DivisionByZero)
            } else {
                Ok((a / b).floor())
            }
        }),
        BinaryOperator::Mod => numeric(op, left, right, mod_int, |a, b| {
            if b == 0.0 {
                Err(ExpressionError::DivisionByZero)
            } else {
                let r = a % b;
                Ok(if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r })
            }
        }),
        BinaryOperator::Pow => power(left, right),
    }
}

/// Apply a unary operator
pub fn apply_unary(op: UnaryOperator, operand: &Value) -> ExpressionResult<Value> {
    match op {
        UnaryOperator::Not => Ok(Value::Boolean(!operand.is_truthy())),
        UnaryOperator::Negate => match operand {
            Value::Int(i) => i.checked_neg().map(Value::Int).ok_or_else(|| overflow(op.as_str())),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(ExpressionError::operands(op.as_str(), &other.describe_type(), None)),
        },
    }
}

/// Left-fold an arithmetic operator over evaluated operands
pub fn fold_arithmetic(op: BinaryOperator, operands: Vec<Value>) -> ExpressionResult<Value> {
    let mut operands = operands.into_iter();
    let first = operands
        .next()
        .ok_or_else(|| ExpressionError::EmptyOperation {
            operator: op.as_str().to_string(),
        })?;
    operands.try_fold(first, |acc, next| apply_binary(op, &acc, &next))
}

fn compare<F>(left: &Value, right: &Value, accept: F) -> ExpressionResult<Value>
where
    F: FnOnce(Ordering) -> bool,
{
    Ok(Value::Boolean(accept(left.compare(right)?)))
}

fn add(left: &Value, right: &Value) -> ExpressionResult<Value> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
        (Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
        }
        _ => numeric(BinaryOperator::Add, left, right, i64::checked_add, |a, b| {
            Ok(a + b)
        }),
    }
}

/// Largest string (in bytes) or list (in elements) repetition may produce
const MAX_REPEAT_LEN: usize = 1 << 26;

fn multiply(left: &Value, right: &Value) -> ExpressionResult<Value> {
    match (left, right) {
        (Value::String(s), Value::Int(n)) | (Value::Int(n), Value::String(s)) => {
            let count = repeat_count(s.len(), *n)?;
            Ok(Value::String(s.repeat(count)))
        }
        (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
            let count = repeat_count(items.len(), *n)?;
            let mut repeated = Vec::with_capacity(items.len() * count);
            for _ in 0..count {
                repeated.extend(items.iter().cloned());
            }
            Ok(Value::List(repeated))
        }
        _ => numeric(BinaryOperator::Mul, left, right, i64::checked_mul, |a, b| {
            Ok(a * b)
        }),
    }
}

/// Number of copies a repetition makes; empty inputs and non-positive counts
/// yield zero copies
fn repeat_count(len: usize, n: i64) -> ExpressionResult<usize> {
    if len == 0 || n <= 0 {
        return Ok(0);
    }
    usize::try_from(n)
        .ok()
        .filter(|count| {
            len.checked_mul(*count)
                .map_or(false, |total| total <= MAX_REPEAT_LEN)
        })
        .ok_or_else(|| overflow(BinaryOperator::Mul.as_str()))
}

fn divide(left: &Value, right: &Value) -> ExpressionResult<Value> {
    match (left.as_float(), right.as_float()) {
        (Some(_), Some(b)) if b == 0.0 => Err(ExpressionError::DivisionByZero),
        (Some(a), Some(b)) if is_number(left) && is_number(right) => Ok(Value::Float(a / b)),
        _ => Err(invalid(BinaryOperator::Div, left, right)),
    }
}

fn power(left: &Value, right: &Value) -> ExpressionResult<Value> {
    match (left, right) {
        (Value::Int(base), Value::Int(exp)) if *exp >= 0 => u32::try_from(*exp)
            .ok()
            .and_then(|exp| base.checked_pow(exp))
            .map(Value::Int)
            .ok_or_else(|| overflow(BinaryOperator::Pow.as_str())),
        _ if is_number(left) && is_number(right) => match (left.as_float(), right.as_float()) {
            (Some(base), Some(exp)) if base == 0.0 && exp < 0.0 => {
                Err(ExpressionError::DivisionByZero)
            }
            (Some(base), Some(exp)) => Ok(Value::Float(base.powf(exp))),
            _ => Err(invalid(BinaryOperator::Pow, left, right)),
        },
        _ => Err(invalid(BinaryOperator::Pow, left, right)),
    }
}

/// Dispatch a numeric operator: integer arithmetic when both sides are ints,
/// float arithmetic when either side is a float.
fn numeric<I, F>(
    op: BinaryOperator,
    left: &Value,
    right: &Value,
    int_op: I,
    float_op: F,
) -> ExpressionResult<Value>
where
    I: FnOnce(i64, i64) -> Option<i64>,
    F: FnOnce(f64, f64) -> ExpressionResult<f64>,
{
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            if matches!(op, BinaryOperator::FloorDiv | BinaryOperator::Mod) && *b == 0 {
                return Err(ExpressionError::DivisionByZero);
            }
            int_op(*a, *b)
                .map(Value::Int)
                .ok_or_else(|| overflow(op.as_str()))
        }
        _ if is_number(left) && is_number(right) => match (left.as_float(), right.as_float()) {
            (Some(a), Some(b)) => float_op(a, b).map(Value::Float),
            _ => Err(invalid(op, left, right)),
        },
        _ => Err(invalid(op, left, right)),
    }
}

/// Integer division rounding toward negative infinity
fn floor_div_int(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

/// Remainder taking the sign of the divisor
fn mod_int(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Some(r + b)
    } else {
        Some(r)
    }
}

fn is_number(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::Float(_))
}

fn invalid(op: BinaryOperator, left: &Value, right: &Value) -> ExpressionError {
    ExpressionError::operands(
        op.as_str(),
        &left.describe_type(),
        Some(right.describe_type().as_str()),
    )
}

fn overflow(operator: &str) -> ExpressionError {
    ExpressionError::Overflow {
        operator: operator.to_string(),
    }
}
