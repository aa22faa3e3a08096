//! In-memory query pipelines over entities.
//!
//! A [`Repository`] pairs an entity provider with a compiler and an ordered
//! list of stages. Building operations (`filter`, `order_by`, `values`, ...)
//! compile their expressions immediately and return a new repository with
//! one more stage; the receiver is left untouched, so any repository can be
//! branched freely. Nothing touches data until the repository is
//! materialized, at which point the provider runs once and its entities flow
//! through every stage in order.
//!
//! ```
//! use common_query::expression::QueryBuilder as Q;
//! use common_query::repository::Repository;
//! use common_query::value::Value;
//!
//! let brands = Repository::from_entities(vec![
//!     Value::map([("brand", Value::from("PUMA")), ("group", Value::Int(4))]),
//!     Value::map([("brand", Value::from("Nike")), ("group", Value::Int(4))]),
//! ]);
//! let names = brands
//!     .order_by([Q::lower(Q::field("brand"))])
//!     .values_list(["brand"], true)
//!     .unwrap()
//!     .materialize()
//!     .unwrap();
//! assert_eq!(names, vec![Value::from("Nike"), Value::from("PUMA")]);
//! ```

pub mod error;
pub mod provider;
pub mod stage;

pub use error::{QueryError, QueryResult};
pub use provider::{EntityProvider, JsonFileProvider, StaticEntities};
pub use stage::{SortKey, SortOrder, Stage};

use crate::expression::{Compiler, Expression};
use crate::value::Value;
use log::debug;
use std::fmt;
use std::sync::Arc;

/// Immutable, replayable query pipeline
#[derive(Clone)]
pub struct Repository {
    provider: Arc<dyn EntityProvider>,
    compiler: Compiler,
    stages: Vec<Stage>,
}

impl Repository {
    /// Create a repository over `provider` with the default compiler
    pub fn new(provider: impl EntityProvider + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
            compiler: Compiler::new(),
            stages: Vec::new(),
        }
    }

    /// Create a repository over a fixed list of entities
    pub fn from_entities(entities: Vec<Value>) -> Self {
        Self::new(StaticEntities::new(entities))
    }

    /// Use `compiler` for every stage added from now on. Stages already
    /// added keep the compiler they were built with.
    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// Labels of the stages, in application order
    pub fn stage_labels(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::label).collect()
    }

    fn with_stage(&self, stage: Stage) -> Self {
        let mut next = self.clone();
        next.stages.push(stage);
        next
    }

    /// Keep the entities for which `query` is truthy
    pub fn filter(&self, query: Expression) -> Self {
        let label = format!("filter({})", query);
        self.with_stage(Stage::filter(label, self.compiler.compile(&query), true))
    }

    /// Drop the entities for which `query` is truthy
    pub fn exclude(&self, query: Expression) -> Self {
        let label = format!("exclude({})", query);
        self.with_stage(Stage::filter(label, self.compiler.compile(&query), false))
    }

    /// Stable multi-key sort; the first field has the highest priority.
    /// Wrap a field with [`QueryBuilder::descending`](crate::expression::QueryBuilder::descending)
    /// to sort it in reverse.
    pub fn order_by<I>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = Expression>,
    {
        let fields: Vec<Expression> = fields.into_iter().collect();
        let label = format!("order_by({})", join(&fields));
        let keys = fields
            .iter()
            .map(|field| SortKey::compile(&self.compiler, field))
            .collect();
        self.with_stage(Stage::sort(label, keys))
    }

    /// Project each entity to a map of the named fields
    pub fn values<I, S>(&self, names: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = field_names(names)?;
        let label = format!("values({})", names.join(", "));
        Ok(self.with_stage(Stage::project(label, self.compiler.clone(), names)))
    }

    /// Project each entity to a list of the named fields. With `flat`,
    /// exactly one field must be named and entities become its bare value.
    pub fn values_list<I, S>(&self, names: I, flat: bool) -> QueryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = field_names(names)?;
        if flat && names.len() != 1 {
            return Err(QueryError::InvalidProjection(format!(
                "flat projection needs exactly one field, got {}",
                names.len()
            )));
        }
        let label = format!("values_list({}, flat={})", names.join(", "), flat);
        Ok(self.with_stage(Stage::project_tuples(
            label,
            self.compiler.clone(),
            names,
            flat,
        )))
    }

    /// Keep at most `count` entities
    pub fn limit(&self, count: usize) -> Self {
        self.with_stage(Stage::slice(format!("limit({})", count), 0, Some(count)))
    }

    /// Skip the first `count` entities
    pub fn offset(&self, count: usize) -> Self {
        self.with_stage(Stage::slice(format!("offset({})", count), count, None))
    }

    /// Run the provider and every stage, returning a fresh result
    pub fn materialize(&self) -> QueryResult<Vec<Value>> {
        let mut entities = self.provider.entities()?;
        debug!("Provider returned {} entities", entities.len());

        for stage in &self.stages {
            let before = entities.len();
            entities = stage.apply(entities)?;
            debug!("{}: {} -> {} entities", stage.label(), before, entities.len());
        }
        Ok(entities)
    }

    pub fn iter(&self) -> QueryResult<std::vec::IntoIter<Value>> {
        Ok(self.materialize()?.into_iter())
    }

    /// The single entity matching `query`
    pub fn get(&self, query: Expression) -> QueryResult<Value> {
        let description = query.to_string();
        let mut matches = self.filter(query).materialize()?;
        match matches.len() {
            0 => Err(QueryError::NotFound { query: description }),
            1 => Ok(matches.remove(0)),
            count => Err(QueryError::NotUnique {
                query: description,
                count,
            }),
        }
    }

    pub fn first(&self) -> QueryResult<Option<Value>> {
        Ok(self.materialize()?.into_iter().next())
    }

    pub fn last(&self) -> QueryResult<Option<Value>> {
        Ok(self.materialize()?.pop())
    }

    pub fn count(&self) -> QueryResult<usize> {
        Ok(self.materialize()?.len())
    }

    pub fn exists(&self) -> QueryResult<bool> {
        Ok(!self.materialize()?.is_empty())
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("stages", &self.stage_labels())
            .finish_non_exhaustive()
    }
}

fn field_names<I, S>(names: I) -> QueryResult<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    if names.is_empty() {
        return Err(QueryError::InvalidProjection(
            "at least one field is required".to_string(),
        ));
    }
    Ok(names)
}

fn join(fields: &[Expression]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::QueryBuilder as Q;

    fn numbers() -> Repository {
        Repository::from_entities(
            (1..=5)
                .map(|n| Value::map([("n", Value::Int(n))]))
                .collect(),
        )
    }

    fn ns(entities: Vec<Value>) -> Vec<i64> {
        entities
            .iter()
            .map(|e| e.get_item(&Value::from("n")).unwrap().as_int().unwrap())
            .collect()
    }

    #[test]
    fn test_filter_and_exclude() {
        let repo = numbers();
        let even = Q::eq(Q::modulo(Q::field("n"), 2), 0);
        assert_eq!(ns(repo.filter(even.clone()).materialize().unwrap()), vec![2, 4]);
        assert_eq!(ns(repo.exclude(even).materialize().unwrap()), vec![1, 3, 5]);
    }

    #[test]
    fn test_limit_and_offset() {
        let repo = numbers().order_by([Q::descending(Q::field("n"))]);
        assert_eq!(ns(repo.offset(1).limit(2).materialize().unwrap()), vec![4, 3]);
        assert_eq!(ns(repo.limit(2).offset(1).materialize().unwrap()), vec![4]);
    }

    #[test]
    fn test_terminal_operations() {
        let repo = numbers();
        assert_eq!(repo.count().unwrap(), 5);
        assert!(repo.exists().unwrap());
        assert_eq!(
            repo.first().unwrap(),
            Some(Value::map([("n", Value::Int(1))]))
        );
        assert_eq!(
            repo.last().unwrap(),
            Some(Value::map([("n", Value::Int(5))]))
        );

        let empty = repo.filter(Q::gt(Q::field("n"), 10));
        assert!(!empty.exists().unwrap());
        assert_eq!(empty.first().unwrap(), None);
        assert_eq!(empty.last().unwrap(), None);
        assert_eq!(empty.iter().unwrap().count(), 0);
    }

    #[test]
    fn test_get_cardinality() {
        let repo = numbers();
        assert_eq!(
            repo.get(Q::field_equals("n", 3)).unwrap(),
            Value::map([("n", Value::Int(3))])
        );
        assert!(matches!(
            repo.get(Q::field_equals("n", 9)),
            Err(QueryError::NotFound { .. })
        ));
        assert!(matches!(
            repo.get(Q::gt(Q::field("n"), 3)),
            Err(QueryError::NotUnique { count: 2, .. })
        ));
    }

    #[test]
    fn test_projection_configuration_errors() {
        let repo = numbers();
        assert!(matches!(
            repo.values_list(["n", "m"], true),
            Err(QueryError::InvalidProjection(_))
        ));
        assert!(matches!(
            repo.values(Vec::<String>::new()),
            Err(QueryError::InvalidProjection(_))
        ));
        assert!(repo.values_list(["n"], true).is_ok());
    }

    #[test]
    fn test_stage_labels() {
        let repo = numbers()
            .filter(Q::gt(Q::field("n"), 1))
            .order_by([Q::descending(Q::field("n")), Q::field("m")])
            .limit(3);
        assert_eq!(
            repo.stage_labels(),
            vec!["filter(n > 1)", "order_by(-(n), m)", "limit(3)"]
        );
    }
}
