//! Expression AST definitions.
//!
//! Expressions are inert data: building one never evaluates anything. The
//! constructors on [`Expression`] enforce the structural rules (chain
//! flattening, literal folding, negation rewriting); evaluation lives in
//! [`crate::expression::compiler`].

use crate::expression::eval::apply_binary;
use crate::expression::{ExpressionError, ExpressionResult};
use crate::expression::operator::{BinaryOperator, UnaryOperator};
use crate::value::Value;
use std::fmt;

/// An n-ary chain of operands joined by one operator
///
/// Fields are private so every instance goes through [`BinaryOperation::new`]
/// and keeps the flattening and folding invariants.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOperation {
    op: BinaryOperator,
    operands: Vec<Expression>,
}

impl BinaryOperation {
    /// Build a chain of at least two operands, absorbing nested chains of the
    /// same operator and pre-reducing adjacent same-typed literals for
    /// foldable operators.
    ///
    /// Associative operators (comparisons, `&`, `|`, `+`, `*`) absorb a
    /// nested chain at any position. The others absorb only a chain in
    /// leading position, so `(a - b) - c` flattens to `a - b - c` while
    /// `a - (b - c)` keeps its grouping.
    pub fn new<I>(op: BinaryOperator, operands: I) -> ExpressionResult<Self>
    where
        I: IntoIterator<Item = Expression>,
    {
        let operands: Vec<Expression> = operands.into_iter().collect();
        if operands.len() < 2 {
            return Err(ExpressionError::TooFewOperands {
                operator: op.as_str().to_string(),
                count: operands.len(),
            });
        }
        Ok(Self::build(op, operands))
    }

    fn build(op: BinaryOperator, operands: Vec<Expression>) -> Self {
        let mut flattened = Vec::with_capacity(operands.len());
        for (position, operand) in operands.into_iter().enumerate() {
            match operand {
                Expression::BinaryOp(nested)
                    if nested.op == op && (op.is_associative() || position == 0) =>
                {
                    flattened.extend(nested.operands);
                }
                other => flattened.push(other),
            }
        }

        let operands = if op.is_foldable() {
            fold_literal_runs(op, flattened)
        } else {
            flattened
        };

        Self { op, operands }
    }

    pub fn op(&self) -> BinaryOperator {
        self.op
    }

    pub fn operands(&self) -> &[Expression] {
        &self.operands
    }
}

/// Reduce each run of adjacent literals sharing a concrete type. A run whose
/// reduction fails is left as is so the failure surfaces at evaluation.
fn fold_literal_runs(op: BinaryOperator, operands: Vec<Expression>) -> Vec<Expression> {
    let mut folded: Vec<Expression> = Vec::with_capacity(operands.len());
    for operand in operands {
        if let (Some(Expression::Literal(acc)), Expression::Literal(next)) =
            (folded.last_mut(), &operand)
        {
            if acc.type_name() == next.type_name() {
                if let Ok(reduced) = apply_binary(op, acc, next) {
                    *acc = reduced;
                    continue;
                }
            }
        }
        folded.push(operand);
    }
    folded
}

/// Expression tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Look up `key` in the environment through the compiler's lookup policy
    Reference { key: Box<Expression> },

    /// Member access on `parent`, or on the environment when absent
    GetAttr {
        parent: Option<Box<Expression>>,
        name: String,
    },

    /// Invocation of `parent`, or of the environment when absent
    Call {
        parent: Option<Box<Expression>>,
        args: Vec<Expression>,
        kwargs: Vec<(String, Expression)>,
    },

    /// Subscript of `parent`, or of the environment when absent
    GetItem {
        parent: Option<Box<Expression>>,
        key: Box<Expression>,
    },

    /// Constant value, returned as is even when it holds an expression
    Literal(Value),

    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    BinaryOp(BinaryOperation),

    /// Lazy map of `body` over the `source` sequence
    For {
        source: Box<Expression>,
        body: Option<Box<Expression>>,
    },

    /// Single-parameter closure
    Function {
        parameter: String,
        body: Box<Expression>,
    },

    If {
        condition: Box<Expression>,
        then: Box<Expression>,
        otherwise: Option<Box<Expression>>,
    },

    /// Evaluates to a copy of the environment with `name` bound
    Assign {
        name: String,
        value: Box<Expression>,
    },
}

impl Expression {
    /// Reference with an arbitrary key expression
    pub fn reference(key: impl Into<Expression>) -> Self {
        Expression::Reference {
            key: Box::new(key.into()),
        }
    }

    /// Reference by name
    pub fn field(name: impl Into<String>) -> Self {
        Self::reference(Expression::Literal(Value::String(name.into())))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn get_attr(parent: Option<Expression>, name: impl Into<String>) -> Self {
        Expression::GetAttr {
            parent: parent.map(Box::new),
            name: name.into(),
        }
    }

    pub fn get_item(parent: Option<Expression>, key: impl Into<Expression>) -> Self {
        Expression::GetItem {
            parent: parent.map(Box::new),
            key: Box::new(key.into()),
        }
    }

    pub fn call_with(
        parent: Option<Expression>,
        args: Vec<Expression>,
        kwargs: Vec<(String, Expression)>,
    ) -> Self {
        Expression::Call {
            parent: parent.map(Box::new),
            args,
            kwargs,
        }
    }

    pub fn unary_op(op: UnaryOperator, operand: impl Into<Expression>) -> Self {
        Expression::UnaryOp {
            op,
            operand: Box::new(operand.into()),
        }
    }

    /// Create a binary operation expression
    pub fn binary_op(
        op: BinaryOperator,
        left: impl Into<Expression>,
        right: impl Into<Expression>,
    ) -> Self {
        Expression::BinaryOp(BinaryOperation::build(op, vec![left.into(), right.into()]))
    }

    /// Create an n-ary operation expression. A single operand stands for
    /// itself; an empty operand list is rejected.
    pub fn chain<I>(op: BinaryOperator, operands: I) -> ExpressionResult<Self>
    where
        I: IntoIterator<Item = Expression>,
    {
        let mut operands: Vec<Expression> = operands.into_iter().collect();
        if operands.len() == 1 {
            return Ok(operands.remove(0));
        }
        BinaryOperation::new(op, operands).map(Expression::BinaryOp)
    }

    /// Lazy iteration over `source`; attach a body with [`Expression::apply`]
    pub fn for_each(source: impl Into<Expression>) -> Self {
        Expression::For {
            source: Box::new(source.into()),
            body: None,
        }
    }

    pub fn function(parameter: impl Into<String>, body: impl Into<Expression>) -> Self {
        Expression::Function {
            parameter: parameter.into(),
            body: Box::new(body.into()),
        }
    }

    pub fn if_then(condition: impl Into<Expression>, then: impl Into<Expression>) -> Self {
        Expression::If {
            condition: Box::new(condition.into()),
            then: Box::new(then.into()),
            otherwise: None,
        }
    }

    pub fn assign(name: impl Into<String>, value: impl Into<Expression>) -> Self {
        Expression::Assign {
            name: name.into(),
            value: Box::new(value.into()),
        }
    }

    /// Set the body of a `For`; any other expression is returned unchanged
    pub fn apply(self, body: impl Into<Expression>) -> Self {
        match self {
            Expression::For { source, .. } => Expression::For {
                source,
                body: Some(Box::new(body.into())),
            },
            other => other,
        }
    }

    /// Set the else branch of an `If`; any other expression is returned unchanged
    pub fn otherwise(self, branch: impl Into<Expression>) -> Self {
        match self {
            Expression::If {
                condition, then, ..
            } => Expression::If {
                condition,
                then,
                otherwise: Some(Box::new(branch.into())),
            },
            other => other,
        }
    }

    pub fn attr(self, name: impl Into<String>) -> Self {
        Self::get_attr(Some(self), name)
    }

    pub fn item(self, key: impl Into<Expression>) -> Self {
        Self::get_item(Some(self), key)
    }

    pub fn call<I, A>(self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Expression>,
    {
        Self::call_with(Some(self), args.into_iter().map(Into::into).collect(), Vec::new())
    }

    pub fn call_named<I, A>(self, args: I, kwargs: Vec<(&str, Expression)>) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Expression>,
    {
        Self::call_with(
            Some(self),
            args.into_iter().map(Into::into).collect(),
            kwargs
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }

    /// Logical complement. Comparisons flip their operator, `Not` unwraps,
    /// anything else is wrapped in `Not`.
    pub fn negate(self) -> Self {
        match self {
            Expression::BinaryOp(operation) => match operation.op.inverse() {
                Some(inverse) => Expression::BinaryOp(BinaryOperation {
                    op: inverse,
                    operands: operation.operands,
                }),
                None => Self::unary_op(UnaryOperator::Not, Expression::BinaryOp(operation)),
            },
            Expression::UnaryOp {
                op: UnaryOperator::Not,
                operand,
            } => *operand,
            other => Self::unary_op(UnaryOperator::Not, other),
        }
    }

    /// Arithmetic negation; `-(-x)` unwraps to `x`
    pub fn negative(self) -> Self {
        match self {
            Expression::UnaryOp {
                op: UnaryOperator::Negate,
                operand,
            } => *operand,
            other => Self::unary_op(UnaryOperator::Negate, other),
        }
    }

    pub fn equals(self, other: impl Into<Expression>) -> Self {
        Self::binary_op(BinaryOperator::Eq, self, other)
    }

    pub fn not_equals(self, other: impl Into<Expression>) -> Self {
        Self::binary_op(BinaryOperator::Ne, self, other)
    }

    pub fn gt(self, other: impl Into<Expression>) -> Self {
        Self::binary_op(BinaryOperator::Gt, self, other)
    }

    pub fn ge(self, other: impl Into<Expression>) -> Self {
        Self::binary_op(BinaryOperator::Ge, self, other)
    }

    pub fn lt(self, other: impl Into<Expression>) -> Self {
        Self::binary_op(BinaryOperator::Lt, self, other)
    }

    pub fn le(self, other: impl Into<Expression>) -> Self {
        Self::binary_op(BinaryOperator::Le, self, other)
    }

    pub fn and(self, other: impl Into<Expression>) -> Self {
        Self::binary_op(BinaryOperator::And, self, other)
    }

    pub fn or(self, other: impl Into<Expression>) -> Self {
        Self::binary_op(BinaryOperator::Or, self, other)
    }

    pub fn plus(self, other: impl Into<Expression>) -> Self {
        Self::binary_op(BinaryOperator::Add, self, other)
    }

    pub fn minus(self, other: impl Into<Expression>) -> Self {
        Self::binary_op(BinaryOperator::Sub, self, other)
    }

    pub fn times(self, other: impl Into<Expression>) -> Self {
        Self::binary_op(BinaryOperator::Mul, self, other)
    }

    pub fn divide(self, other: impl Into<Expression>) -> Self {
        Self::binary_op(BinaryOperator::Div, self, other)
    }

    pub fn floor_divide(self, other: impl Into<Expression>) -> Self {
        Self::binary_op(BinaryOperator::FloorDiv, self, other)
    }

    pub fn power(self, other: impl Into<Expression>) -> Self {
        Self::binary_op(BinaryOperator::Pow, self, other)
    }

    pub fn modulo(self, other: impl Into<Expression>) -> Self {
        Self::binary_op(BinaryOperator::Mod, self, other)
    }

    /// The operation, if this is a `BinaryOp`
    pub fn as_binary(&self) -> Option<&BinaryOperation> {
        match self {
            Expression::BinaryOp(operation) => Some(operation),
            _ => None,
        }
    }

    /// The operand of a descending sort marker (`Negate`)
    pub fn descending_key(&self) -> Option<&Expression> {
        match self {
            Expression::UnaryOp {
                op: UnaryOperator::Negate,
                operand,
            } => Some(operand),
            _ => None,
        }
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Literal(value)
    }
}

macro_rules! literal_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Expression {
                fn from(value: $ty) -> Self {
                    Expression::Literal(Value::from(value))
                }
            }
        )*
    };
}

literal_from!(bool, i32, i64, f64, &str, String);

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Reference { key } => match key.as_ref() {
                Expression::Literal(Value::String(name)) => write!(f, "{}", name),
                other => write!(f, "ref[{}]", other),
            },
            Expression::GetAttr { parent, name } => {
                write_parent(f, parent.as_deref())?;
                write!(f, ".{}", name)
            }
            Expression::Call {
                parent,
                args,
                kwargs,
            } => {
                write_parent(f, parent.as_deref())?;
                write!(f, "(")?;
                let mut first = true;
                for arg in args {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{}", arg)?;
                }
                for (name, arg) in kwargs {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{}={}", name, arg)?;
                }
                write!(f, ")")
            }
            Expression::GetItem { parent, key } => {
                write_parent(f, parent.as_deref())?;
                write!(f, "[{}]", key)
            }
            Expression::Literal(value) => write!(f, "{}", value),
            Expression::UnaryOp { op, operand } => write!(f, "{}({})", op.as_str(), operand),
            Expression::BinaryOp(operation) => {
                for (i, operand) in operation.operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", operation.op.as_str())?;
                    }
                    if matches!(operand, Expression::BinaryOp(_)) {
                        write!(f, "({})", operand)?;
                    } else {
                        write!(f, "{}", operand)?;
                    }
                }
                Ok(())
            }
            Expression::For { source, body } => {
                write!(f, "For({})", source)?;
                if let Some(body) = body {
                    write!(f, ".do({})", body)?;
                }
                Ok(())
            }
            Expression::Function { parameter, body } => {
                write!(f, "lambda {}: {}", parameter, body)
            }
            Expression::If {
                condition,
                then,
                otherwise,
            } => {
                write!(f, "If({}, {})", condition, then)?;
                if let Some(otherwise) = otherwise {
                    write!(f, ".otherwise({})", otherwise)?;
                }
                Ok(())
            }
            Expression::Assign { name, value } => write!(f, "Assign('{}', {})", name, value),
        }
    }
}

fn write_parent(f: &mut fmt::Formatter<'_>, parent: Option<&Expression>) -> fmt::Result {
    match parent {
        None => write!(f, "@"),
        Some(parent @ (Expression::BinaryOp(_) | Expression::UnaryOp { .. })) => {
            write!(f, "({})", parent)
        }
        Some(parent) => write!(f, "{}", parent),
    }
}
