//! Compilation of expressions into reusable evaluators.
//!
//! [`Compiler::compile`] walks an [`Expression`] once and produces a
//! [`CompiledExpression`]: a tree of shared closures from an environment to a
//! [`Value`]. Compiling never fails and never looks at data; all lookup and
//! type errors are raised when the compiled expression is evaluated.
//!
//! ```
//! use common_query::expression::{Compiler, Expression};
//! use common_query::value::Value;
//!
//! let query = Expression::field("x").plus(5);
//! let compiled = Compiler::new().compile(&query);
//!
//! let env = Value::map([("x", Value::Int(5))]);
//! assert_eq!(compiled.evaluate(&env).unwrap(), Value::Int(10));
//! ```

use crate::expression::eval::{apply_binary, apply_unary, fold_arithmetic};
use crate::expression::{
    BinaryOperation, Expression, ExpressionError, ExpressionResult, UnaryOperator,
};
use crate::value::{Arguments, Callable, LazySequence, Value, ValueIter};
use log::trace;
use std::fmt;
use std::sync::Arc;

type EvalFn = dyn Fn(&Value) -> ExpressionResult<Value> + Send + Sync;

/// Policy resolving a `Reference` key against an entity
pub trait ValueLookup: Send + Sync {
    fn lookup(&self, entity: &Value, key: &Value) -> ExpressionResult<Value>;
}

impl<F> ValueLookup for F
where
    F: Fn(&Value, &Value) -> ExpressionResult<Value> + Send + Sync,
{
    fn lookup(&self, entity: &Value, key: &Value) -> ExpressionResult<Value> {
        self(entity, key)
    }
}

/// Subscript lookup, `entity[key]`. The default policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexLookup;

impl ValueLookup for IndexLookup {
    fn lookup(&self, entity: &Value, key: &Value) -> ExpressionResult<Value> {
        entity.get_item(key)
    }
}

/// Member lookup for string keys, subscript lookup for anything else.
/// Suits entities that are host objects rather than maps.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeLookup;

impl ValueLookup for AttributeLookup {
    fn lookup(&self, entity: &Value, key: &Value) -> ExpressionResult<Value> {
        match key {
            Value::String(name) => entity.get_attr(name),
            _ => entity.get_item(key),
        }
    }
}

/// An expression compiled into an evaluator
#[derive(Clone)]
pub struct CompiledExpression {
    func: Arc<EvalFn>,
}

impl CompiledExpression {
    /// Evaluate against an environment
    pub fn evaluate(&self, env: &Value) -> ExpressionResult<Value> {
        (self.func)(env)
    }

    /// Evaluate as a predicate
    pub fn matches(&self, env: &Value) -> ExpressionResult<bool> {
        self.evaluate(env).map(|value| value.is_truthy())
    }
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression").finish_non_exhaustive()
    }
}

/// Turns expressions into [`CompiledExpression`]s
#[derive(Clone)]
pub struct Compiler {
    lookup: Arc<dyn ValueLookup>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::with_lookup(IndexLookup)
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler").finish_non_exhaustive()
    }
}

impl Compiler {
    /// Compiler using [`IndexLookup`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiler using a custom lookup policy
    pub fn with_lookup(lookup: impl ValueLookup + 'static) -> Self {
        Self {
            lookup: Arc::new(lookup),
        }
    }

    /// Resolve `key` against `entity` with this compiler's policy
    pub fn lookup(&self, entity: &Value, key: &Value) -> ExpressionResult<Value> {
        self.lookup.lookup(entity, key)
    }

    pub fn compile(&self, expression: &Expression) -> CompiledExpression {
        trace!("Compiling expression: {}", expression);
        CompiledExpression {
            func: self.compile_node(expression),
        }
    }

    fn compile_node(&self, expression: &Expression) -> Arc<EvalFn> {
        match expression {
            Expression::Reference { key } => self.compile_reference(key),
            Expression::GetAttr { parent, name } => {
                let parent = self.compile_parent(parent.as_deref());
                let name = name.clone();
                node(move |env| parent(env)?.get_attr(&name))
            }
            Expression::Call {
                parent,
                args,
                kwargs,
            } => self.compile_call(parent.as_deref(), args, kwargs),
            Expression::GetItem { parent, key } => {
                let parent = self.compile_parent(parent.as_deref());
                let key = self.compile_node(key);
                node(move |env| {
                    let container = parent(env)?;
                    container.get_item(&key(env)?)
                })
            }
            Expression::Literal(value) => {
                let value = value.clone();
                node(move |_| Ok(value.clone()))
            }
            Expression::UnaryOp { op, operand } => {
                let op: UnaryOperator = *op;
                let operand = self.compile_node(operand);
                node(move |env| apply_unary(op, &operand(env)?))
            }
            Expression::BinaryOp(operation) => self.compile_binary(operation),
            Expression::For { source, body } => self.compile_for(source, body.as_deref()),
            Expression::Function { parameter, body } => self.compile_function(parameter, body),
            Expression::If {
                condition,
                then,
                otherwise,
            } => {
                let condition = self.compile_node(condition);
                let then = self.compile_node(then);
                let otherwise = otherwise.as_deref().map(|branch| self.compile_node(branch));
                node(move |env| {
                    if condition(env)?.is_truthy() {
                        then(env)
                    } else {
                        match &otherwise {
                            Some(branch) => branch(env),
                            None => Ok(Value::Null),
                        }
                    }
                })
            }
            Expression::Assign { name, value } => {
                let name = name.clone();
                let value = self.compile_node(value);
                node(move |env| env.with_binding(&name, value(env)?))
            }
        }
    }

    fn compile_reference(&self, key: &Expression) -> Arc<EvalFn> {
        let lookup = Arc::clone(&self.lookup);
        match key {
            Expression::Literal(key) => {
                let key = key.clone();
                node(move |env| lookup.lookup(env, &key))
            }
            computed => {
                let key = self.compile_node(computed);
                node(move |env| lookup.lookup(env, &key(env)?))
            }
        }
    }

    /// An absent parent stands for the environment itself
    fn compile_parent(&self, parent: Option<&Expression>) -> Arc<EvalFn> {
        match parent {
            Some(parent) => self.compile_node(parent),
            None => node(|env| Ok(env.clone())),
        }
    }

    fn compile_call(
        &self,
        parent: Option<&Expression>,
        args: &[Expression],
        kwargs: &[(String, Expression)],
    ) -> Arc<EvalFn> {
        let parent = self.compile_parent(parent);
        let args: Vec<Arc<EvalFn>> = args.iter().map(|arg| self.compile_node(arg)).collect();
        let kwargs: Vec<(String, Arc<EvalFn>)> = kwargs
            .iter()
            .map(|(name, arg)| (name.clone(), self.compile_node(arg)))
            .collect();

        node(move |env| {
            let callee = parent(env)?;
            let positional = args
                .iter()
                .map(|arg| arg(env))
                .collect::<ExpressionResult<Vec<_>>>()?;
            let named = kwargs
                .iter()
                .map(|(name, arg)| -> ExpressionResult<(String, Value)> {
                    Ok((name.clone(), arg(env)?))
                })
                .collect::<ExpressionResult<Vec<_>>>()?;
            callee.call(Arguments::new(positional, named))
        })
    }

    fn compile_binary(&self, operation: &BinaryOperation) -> Arc<EvalFn> {
        let op = operation.op();
        let operands: Vec<Arc<EvalFn>> = operation
            .operands()
            .iter()
            .map(|operand| self.compile_node(operand))
            .collect();

        if op.is_boolean() {
            // Every adjacent pair must hold; each operand is evaluated at most once
            node(move |env| {
                let mut remaining = operands.iter();
                let mut left = match remaining.next() {
                    Some(first) => first(env)?,
                    None => return Ok(Value::Boolean(true)),
                };
                for operand in remaining {
                    let right = operand(env)?;
                    if !apply_binary(op, &left, &right)?.is_truthy() {
                        return Ok(Value::Boolean(false));
                    }
                    left = right;
                }
                Ok(Value::Boolean(true))
            })
        } else {
            node(move |env| {
                let values = operands
                    .iter()
                    .map(|operand| operand(env))
                    .collect::<ExpressionResult<Vec<_>>>()?;
                fold_arithmetic(op, values)
            })
        }
    }

    fn compile_for(&self, source: &Expression, body: Option<&Expression>) -> Arc<EvalFn> {
        let source = self.compile_node(source);
        let body = body.map(|body| self.compile_node(body));

        node(move |env| {
            let items = source(env)?;
            if !matches!(
                items,
                Value::List(_) | Value::Sequence(_) | Value::String(_) | Value::Map(_)
            ) {
                return Err(ExpressionError::NotIterable {
                    type_name: items.describe_type(),
                });
            }

            let function = match &body {
                Some(body) => match body(env)? {
                    Value::Callable(function) => Some(function),
                    other => {
                        return Err(ExpressionError::NotCallable {
                            type_name: other.describe_type(),
                        })
                    }
                },
                None => None,
            };

            Ok(Value::Sequence(LazySequence::new(move || {
                let elements = items.iter()?;
                match &function {
                    None => Ok(elements),
                    Some(function) => {
                        let function = function.clone();
                        let mapped = elements.map(
                            move |element: ExpressionResult<Value>| -> ExpressionResult<Value> {
                                function.call(Arguments::positional(vec![element?]))
                            },
                        );
                        Ok(Box::new(mapped) as ValueIter)
                    }
                }
            })))
        })
    }

    fn compile_function(&self, parameter: &str, body: &Expression) -> Arc<EvalFn> {
        let parameter: Arc<str> = Arc::from(parameter);
        let body = self.compile_node(body);

        node(move |env| {
            let scope = env.clone();
            let parameter = Arc::clone(&parameter);
            let body = Arc::clone(&body);
            let name = format!("lambda {}", parameter);

            let closure = Callable::new(name.clone(), move |args: Arguments| {
                args.expect_count(&name, 1, 1)?;
                let argument = args
                    .get(0)
                    .or_else(|| args.named(&parameter))
                    .cloned()
                    .ok_or_else(|| ExpressionError::ArgumentCount {
                        function: name.clone(),
                        expected: format!("1 ({})", parameter),
                        actual: args.len(),
                    })?;
                body(&scope.with_binding(&parameter, argument)?)
            });
            Ok(Value::Callable(closure))
        })
    }
}

fn node<F>(func: F) -> Arc<EvalFn>
where
    F: Fn(&Value) -> ExpressionResult<Value> + Send + Sync + 'static,
{
    Arc::new(func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::BinaryOperator;
    use crate::value::HostObject;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Person {
        name: String,
    }

    impl HostObject for Person {
        fn type_name(&self) -> &str {
            "Person"
        }

        fn attribute(&self, name: &str) -> Option<Value> {
            match name {
                "name" => Some(Value::from(self.name.as_str())),
                _ => None,
            }
        }
    }

    fn eval(expression: &Expression, env: &Value) -> ExpressionResult<Value> {
        Compiler::new().compile(expression).evaluate(env)
    }

    fn x() -> Expression {
        Expression::field("x")
    }

    fn y() -> Expression {
        Expression::field("y")
    }

    #[test]
    fn test_reference() {
        let env = Value::map([("x", Value::Int(5))]);
        assert_eq!(eval(&x(), &env).unwrap(), Value::Int(5));

        let err = eval(&y(), &env).unwrap_err();
        assert!(err.is_lookup());
    }

    #[test]
    fn test_computed_reference() {
        let env = Value::map([("x", Value::from("y")), ("y", Value::Int(42))]);
        let expr = Expression::reference(Expression::field("x"));
        assert_eq!(eval(&expr, &env).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_comparison_chain() {
        let chain = x().lt(10).lt(y());

        let env = Value::map([("x", Value::Int(5)), ("y", Value::Int(15))]);
        assert_eq!(eval(&chain, &env).unwrap(), Value::Boolean(true));

        let env = Value::map([("x", Value::Int(5)), ("y", Value::Int(5))]);
        assert_eq!(eval(&chain, &env).unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_boolean_chain_short_circuits() {
        let chain = x().lt(0).lt(Expression::field("missing"));
        let env = Value::map([("x", Value::Int(5))]);
        assert_eq!(eval(&chain, &env).unwrap(), Value::Boolean(false));

        let env = Value::map([("x", Value::Int(-5))]);
        assert!(eval(&chain, &env).unwrap_err().is_lookup());
    }

    #[test]
    fn test_logical_operators() {
        let both = x().gt(0).and(y().gt(0));
        let either = x().gt(0).or(y().gt(0));

        let env = Value::map([("x", Value::Int(1)), ("y", Value::Int(-1))]);
        assert_eq!(eval(&both, &env).unwrap(), Value::Boolean(false));
        assert_eq!(eval(&either, &env).unwrap(), Value::Boolean(true));

        let negated = both.negate();
        assert_eq!(eval(&negated, &env).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_logical_chains_hold_pairwise() {
        let env = Value::Null;
        let chain = |op: BinaryOperator, operands: [bool; 3]| {
            Expression::chain(op, operands.map(Value::Boolean).map(Expression::Literal)).unwrap()
        };

        // Each adjacent pair is or-ed, then all pairs must hold
        let or_chain = chain(BinaryOperator::Or, [true, false, false]);
        assert_eq!(or_chain.as_binary().unwrap().operands().len(), 3);
        assert_eq!(eval(&or_chain, &env).unwrap(), Value::Boolean(false));
        assert_eq!(
            eval(&chain(BinaryOperator::Or, [false, true, false]), &env).unwrap(),
            Value::Boolean(true)
        );

        assert_eq!(
            eval(&chain(BinaryOperator::And, [true, true, true]), &env).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            eval(&chain(BinaryOperator::And, [true, true, false]), &env).unwrap(),
            Value::Boolean(false)
        );
    }

    #[test]
    fn test_get_attr_on_host_object() {
        let env = Value::map([(
            "person",
            Value::object(Person {
                name: "Johnny".to_string(),
            }),
        )]);
        let expr = Expression::field("person").attr("name");
        assert_eq!(eval(&expr, &env).unwrap(), Value::from("Johnny"));

        let missing = Expression::field("person").attr("age");
        assert!(matches!(
            eval(&missing, &env),
            Err(ExpressionError::AttributeNotFound { .. })
        ));
    }

    #[test]
    fn test_literal_is_never_compiled() {
        let expr = Expression::literal(Expression::field("users"));
        let result = eval(&expr, &Value::Null).unwrap();
        assert_eq!(result.as_expression(), Some(&Expression::field("users")));
    }

    #[test]
    fn test_arithmetic() {
        let env = Value::map([("x", Value::Int(5)), ("y", Value::Float(0.5))]);
        assert_eq!(eval(&x().plus(5), &env).unwrap(), Value::Int(10));
        assert_eq!(eval(&x().minus(1).minus(2), &env).unwrap(), Value::Int(2));
        assert_eq!(eval(&x().times(y()), &env).unwrap(), Value::Float(2.5));
        assert_eq!(eval(&x().divide(2), &env).unwrap(), Value::Float(2.5));
        assert_eq!(eval(&x().floor_divide(2), &env).unwrap(), Value::Int(2));
        assert_eq!(eval(&x().modulo(3), &env).unwrap(), Value::Int(2));
        assert_eq!(eval(&x().power(2), &env).unwrap(), Value::Int(25));
        assert_eq!(eval(&x().negative(), &env).unwrap(), Value::Int(-5));

        let err = eval(&x().plus("a"), &env).unwrap_err();
        assert!(err.is_type_error());
        assert!(matches!(
            eval(&x().divide(0), &env),
            Err(ExpressionError::DivisionByZero)
        ));
    }

    #[test]
    fn test_method_call() {
        let starts_with_n = Expression::field("brand")
            .attr("lower")
            .call(Vec::<Expression>::new())
            .attr("startswith")
            .call(["n"]);

        let nike = Value::map([("brand", Value::from("Nike"))]);
        let puma = Value::map([("brand", Value::from("PUMA"))]);
        assert_eq!(eval(&starts_with_n, &nike).unwrap(), Value::Boolean(true));
        assert_eq!(eval(&starts_with_n, &puma).unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_call_passes_arguments_in_order() {
        let record = Callable::new("record", |args: Arguments| {
            let mut parts: Vec<String> = args.positional.iter().map(|v| v.to_string()).collect();
            parts.extend(args.named.iter().map(|(k, v)| format!("{}={}", k, v)));
            Ok(Value::String(parts.join(",")))
        });
        let env = Value::map([("f", Value::Callable(record)), ("x", Value::Int(1))]);

        let expr = Expression::field("f").call_named(
            [x(), Expression::literal(2)],
            vec![("b", Expression::literal("z")), ("a", x())],
        );
        assert_eq!(eval(&expr, &env).unwrap(), Value::from("1,2,b='z',a=1"));

        let not_callable = x().call([1]);
        assert!(matches!(
            eval(&not_callable, &env),
            Err(ExpressionError::NotCallable { .. })
        ));
    }

    #[test]
    fn test_absent_parent_is_environment() {
        let env = Value::map([("x", Value::Int(3))]);
        assert_eq!(
            eval(&Expression::get_attr(None, "x"), &env).unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            eval(&Expression::get_item(None, "x"), &env).unwrap(),
            Value::Int(3)
        );

        let double = Value::Callable(Callable::new("double", |args: Arguments| {
            let n = args.get(0).and_then(Value::as_int).unwrap_or(0);
            Ok(Value::Int(n * 2))
        }));
        let call = Expression::call_with(None, vec![Expression::literal(4)], Vec::new());
        assert_eq!(eval(&call, &double).unwrap(), Value::Int(8));
    }

    #[test]
    fn test_get_item() {
        let env = Value::map([
            (
                "users",
                Value::list([
                    Value::map([("name", Value::from("ann"))]),
                    Value::map([("name", Value::from("bob"))]),
                ]),
            ),
            ("index", Value::Int(1)),
        ]);
        let expr = Expression::field("users")
            .item(Expression::field("index"))
            .item("name");
        assert_eq!(eval(&expr, &env).unwrap(), Value::from("bob"));

        let out_of_range = Expression::field("users").item(5);
        assert!(eval(&out_of_range, &env).unwrap_err().is_lookup());
    }

    #[test]
    fn test_for_maps_lazily() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        let naturals = LazySequence::new(move || {
            let counter = Arc::clone(&counter);
            let iter = (0i64..).map(move |n| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Int(n))
            });
            Ok(Box::new(iter) as ValueIter)
        });
        let env = Value::map([("xs", Value::Sequence(naturals))]);

        let doubled = Expression::for_each(Expression::field("xs"))
            .apply(Expression::function("v", Expression::field("v").times(2)));
        let result = eval(&doubled, &env).unwrap();
        assert_eq!(pulled.load(Ordering::SeqCst), 0);

        let sequence = match result {
            Value::Sequence(sequence) => sequence,
            other => panic!("expected a sequence, got {}", other),
        };
        let first: Vec<Value> = sequence
            .iter()
            .unwrap()
            .take(3)
            .collect::<ExpressionResult<_>>()
            .unwrap();
        assert_eq!(first, vec![Value::Int(0), Value::Int(2), Value::Int(4)]);
        assert_eq!(pulled.load(Ordering::SeqCst), 3);

        // Restartable
        let again = sequence.iter().unwrap().next().unwrap().unwrap();
        assert_eq!(again, Value::Int(0));
    }

    #[test]
    fn test_for_without_body_is_identity() {
        let env = Value::map([("xs", Value::list([Value::Int(1), Value::Int(2)]))]);
        let result = eval(&Expression::for_each(Expression::field("xs")), &env).unwrap();
        let items = match result {
            Value::Sequence(sequence) => sequence.to_vec().unwrap(),
            other => panic!("expected a sequence, got {}", other),
        };
        assert_eq!(items, vec![Value::Int(1), Value::Int(2)]);

        let not_iterable = Expression::for_each(Expression::literal(3));
        assert!(matches!(
            eval(&not_iterable, &env),
            Err(ExpressionError::NotIterable { .. })
        ));
        let bad_body = Expression::for_each(Expression::field("xs")).apply(1);
        assert!(matches!(
            eval(&bad_body, &env),
            Err(ExpressionError::NotCallable { .. })
        ));
    }

    #[test]
    fn test_function_closes_over_environment() {
        let add_offset = Expression::function("v", Expression::field("v").plus(Expression::field("offset")));
        let env = Value::map([("offset", Value::Int(10))]);

        let closure = eval(&add_offset, &env).unwrap();
        assert_eq!(
            closure.call(Arguments::positional(vec![Value::Int(5)])).unwrap(),
            Value::Int(15)
        );
        assert_eq!(
            closure
                .call(Arguments::new(Vec::new(), vec![("v".to_string(), Value::Int(1))]))
                .unwrap(),
            Value::Int(11)
        );
        assert!(matches!(
            closure.call(Arguments::default()),
            Err(ExpressionError::ArgumentCount { .. })
        ));

        // Functions may be applied to a null environment
        let identity = eval(&Expression::function("v", Expression::field("v")), &Value::Null).unwrap();
        assert_eq!(
            identity.call(Arguments::positional(vec![Value::from("a")])).unwrap(),
            Value::from("a")
        );
    }

    #[test]
    fn test_if() {
        let sign = Expression::if_then(x().gt(0), "pos").otherwise("neg");
        let positive = Value::map([("x", Value::Int(3))]);
        let negative = Value::map([("x", Value::Int(-3))]);
        assert_eq!(eval(&sign, &positive).unwrap(), Value::from("pos"));
        assert_eq!(eval(&sign, &negative).unwrap(), Value::from("neg"));

        let only_then = Expression::if_then(x().gt(0), "pos");
        assert_eq!(eval(&only_then, &negative).unwrap(), Value::Null);
    }

    #[test]
    fn test_assign() {
        let env = Value::map([("x", Value::Int(1))]);
        let bound = eval(&Expression::assign("y", x().plus(1)), &env).unwrap();
        assert_eq!(
            bound,
            Value::map([("x", Value::Int(1)), ("y", Value::Int(2))])
        );

        assert!(matches!(
            eval(&Expression::assign("y", 1), &Value::Int(1)),
            Err(ExpressionError::InvalidEnvironment { .. })
        ));
    }

    #[test]
    fn test_unary_operators() {
        let env = Value::map([("x", Value::Int(0))]);
        assert_eq!(eval(&x().negate(), &env).unwrap(), Value::Boolean(true));
        assert_eq!(eval(&x().negative(), &env).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_custom_lookup_policy() {
        let compiler = Compiler::with_lookup(|entity: &Value, key: &Value| {
            let key = key.as_str().map(str::to_lowercase).map(Value::from);
            entity.get_item(&key.unwrap_or(Value::Null))
        });
        let env = Value::map([("brand", Value::from("Nike"))]);
        let compiled = compiler.compile(&Expression::field("BRAND"));
        assert_eq!(compiled.evaluate(&env).unwrap(), Value::from("Nike"));

        let person = Value::object(Person {
            name: "Johnny".to_string(),
        });
        let by_attribute = Compiler::with_lookup(AttributeLookup).compile(&Expression::field("name"));
        assert_eq!(by_attribute.evaluate(&person).unwrap(), Value::from("Johnny"));
    }

    #[test]
    fn test_compiled_expression_is_reusable() {
        let compiled = Compiler::new().compile(&x().ge(2));
        let results: Vec<bool> = (0..4)
            .map(|i| compiled.matches(&Value::map([("x", Value::Int(i))])).unwrap())
            .collect();
        assert_eq!(results, vec![false, false, true, true]);
    }
}
