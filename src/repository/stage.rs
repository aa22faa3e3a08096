//! Pipeline stages.
//!
//! A stage is a labelled function from the entities produced so far to the
//! entities handed to the next stage. Stages hold compiled expressions only,
//! so a stage can be shared by every pipeline branched from the one that
//! created it.
//!
//! Supports:
//! - Filtering on a predicate (kept or excluded matches)
//! - Stable multi-key sorting, ascending or descending per key
//! - Projection to records or tuples
//! - Offset and limit slicing

use crate::expression::{CompiledExpression, Compiler, Expression, ExpressionResult};
use crate::repository::QueryResult;
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

type StageFn = dyn Fn(Vec<Value>) -> QueryResult<Vec<Value>> + Send + Sync;

/// One transformation of a pipeline
#[derive(Clone)]
pub struct Stage {
    label: String,
    func: Arc<StageFn>,
}

impl Stage {
    pub fn new<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(Vec<Value>) -> QueryResult<Vec<Value>> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            func: Arc::new(func),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn apply(&self, entities: Vec<Value>) -> QueryResult<Vec<Value>> {
        (self.func)(entities)
    }

    /// Keep entities whose predicate truthiness equals `keep`
    pub fn filter(label: impl Into<String>, predicate: CompiledExpression, keep: bool) -> Self {
        Self::new(label, move |entities| {
            let mut kept = Vec::with_capacity(entities.len());
            for entity in entities {
                if predicate.matches(&entity)? == keep {
                    kept.push(entity);
                }
            }
            Ok(kept)
        })
    }

    /// Sort by `keys`, the first key taking precedence
    pub fn sort(label: impl Into<String>, keys: Vec<SortKey>) -> Self {
        Self::new(label, move |entities| {
            // One stable pass per key, lowest priority first
            keys.iter()
                .rev()
                .try_fold(entities, |entities, key| sort_pass(entities, key))
        })
    }

    /// Map each entity to a record of `names`
    pub fn project(label: impl Into<String>, compiler: Compiler, names: Vec<String>) -> Self {
        Self::new(label, move |entities| {
            entities
                .iter()
                .map(|entity| -> QueryResult<Value> {
                    let record = names
                        .iter()
                        .map(|name| -> ExpressionResult<(String, Value)> {
                            let value = compiler.lookup(entity, &Value::from(name.as_str()))?;
                            Ok((name.clone(), value))
                        })
                        .collect::<ExpressionResult<BTreeMap<_, _>>>()?;
                    Ok(Value::Map(record))
                })
                .collect()
        })
    }

    /// Map each entity to a tuple of `names`, or to the bare value when `flat`
    pub fn project_tuples(
        label: impl Into<String>,
        compiler: Compiler,
        names: Vec<String>,
        flat: bool,
    ) -> Self {
        let keys: Vec<Value> = names.into_iter().map(Value::String).collect();
        Self::new(label, move |entities| {
            entities
                .iter()
                .map(|entity| -> QueryResult<Value> {
                    let mut values = keys
                        .iter()
                        .map(|key| compiler.lookup(entity, key))
                        .collect::<ExpressionResult<Vec<_>>>()?;
                    match (flat, values.pop()) {
                        (true, Some(value)) => Ok(value),
                        (_, last) => {
                            values.extend(last);
                            Ok(Value::List(values))
                        }
                    }
                })
                .collect()
        })
    }

    /// Skip `offset` entities, then keep at most `limit`
    pub fn slice(label: impl Into<String>, offset: usize, limit: Option<usize>) -> Self {
        Self::new(label, move |entities| {
            let remaining = entities.into_iter().skip(offset);
            Ok(match limit {
                Some(limit) => remaining.take(limit).collect(),
                None => remaining.collect(),
            })
        })
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Stage").field(&self.label).finish()
    }
}

/// Sort order for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// A compiled sort key
#[derive(Debug, Clone)]
pub struct SortKey {
    /// Key expression, without its descending marker
    pub expression: CompiledExpression,
    pub order: SortOrder,
}

impl SortKey {
    /// Compile a sort field. A field wrapped in the descending marker
    /// (arithmetic negation) sorts its operand in reverse.
    pub fn compile(compiler: &Compiler, field: &Expression) -> Self {
        match field.descending_key() {
            Some(operand) => Self {
                expression: compiler.compile(operand),
                order: SortOrder::Desc,
            },
            None => Self {
                expression: compiler.compile(field),
                order: SortOrder::Asc,
            },
        }
    }
}

/// Stable sort on a single key. Descending reverses the comparison rather
/// than the result, so ties keep their incoming order.
fn sort_pass(entities: Vec<Value>, key: &SortKey) -> QueryResult<Vec<Value>> {
    let mut keyed = entities
        .into_iter()
        .map(|entity| -> ExpressionResult<(Value, Value)> {
            Ok((key.expression.evaluate(&entity)?, entity))
        })
        .collect::<ExpressionResult<Vec<_>>>()?;

    let mut failure = None;
    keyed.sort_by(|(a, _), (b, _)| match a.compare(b) {
        Ok(ordering) => match key.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        },
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });

    match failure {
        Some(err) => Err(err.into()),
        None => Ok(keyed.into_iter().map(|(_, entity)| entity).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{ExpressionError, QueryBuilder as Q};
    use crate::repository::QueryError;

    fn entity(name: &str, rank: i64) -> Value {
        Value::map([("name", Value::from(name)), ("rank", Value::Int(rank))])
    }

    fn names(entities: &[Value]) -> Vec<String> {
        entities
            .iter()
            .map(|e| e.get_attr("name").unwrap().as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_filter_stage() {
        let compiler = Compiler::new();
        let predicate = compiler.compile(&Q::gt(Q::field("rank"), 1));
        let input = vec![entity("a", 1), entity("b", 2), entity("c", 3)];

        let kept = Stage::filter("filter", predicate.clone(), true)
            .apply(input.clone())
            .unwrap();
        assert_eq!(names(&kept), vec!["b", "c"]);

        let excluded = Stage::filter("exclude", predicate, false).apply(input).unwrap();
        assert_eq!(names(&excluded), vec!["a"]);
    }

    #[test]
    fn test_sort_is_stable_in_both_directions() {
        let compiler = Compiler::new();
        let input = vec![entity("a", 2), entity("b", 1), entity("c", 2), entity("d", 1)];

        let ascending = Stage::sort("sort", vec![SortKey::compile(&compiler, &Q::field("rank"))])
            .apply(input.clone())
            .unwrap();
        assert_eq!(names(&ascending), vec!["b", "d", "a", "c"]);

        let descending = Stage::sort(
            "sort",
            vec![SortKey::compile(&compiler, &Q::descending(Q::field("rank")))],
        )
        .apply(input)
        .unwrap();
        assert_eq!(names(&descending), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn test_sort_error_propagates() {
        let compiler = Compiler::new();
        let input = vec![entity("a", 1), Value::map([("rank", Value::from("x"))])];
        let err = Stage::sort("sort", vec![SortKey::compile(&compiler, &Q::field("rank"))])
            .apply(input)
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::Evaluation(ExpressionError::Unorderable { .. })
        ));
    }

    #[test]
    fn test_projection_stages() {
        let compiler = Compiler::new();
        let input = vec![entity("a", 1), entity("b", 2)];

        let records = Stage::project("values", compiler.clone(), vec!["name".to_string()])
            .apply(input.clone())
            .unwrap();
        assert_eq!(records[0], Value::map([("name", Value::from("a"))]));

        let tuples = Stage::project_tuples(
            "values_list",
            compiler.clone(),
            vec!["rank".to_string(), "name".to_string()],
            false,
        )
        .apply(input.clone())
        .unwrap();
        assert_eq!(tuples[1], Value::list([Value::Int(2), Value::from("b")]));

        let flat = Stage::project_tuples("values_list", compiler, vec!["rank".to_string()], true)
            .apply(input)
            .unwrap();
        assert_eq!(flat, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_slice_stage() {
        let input: Vec<Value> = (0..5).map(Value::from).collect();
        let page = Stage::slice("slice", 1, Some(2)).apply(input.clone()).unwrap();
        assert_eq!(page, vec![Value::Int(1), Value::Int(2)]);

        let tail = Stage::slice("slice", 3, None).apply(input.clone()).unwrap();
        assert_eq!(tail, vec![Value::Int(3), Value::Int(4)]);

        assert!(Stage::slice("slice", 9, Some(1)).apply(input).unwrap().is_empty());
    }
}
