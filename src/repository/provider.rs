//! Entity providers.
//!
//! A provider is invoked once per materialization and never cached, so a
//! pipeline always reflects the provider's current data.

use crate::repository::{QueryError, QueryResult};
use crate::value::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Source of the entities a pipeline runs over
pub trait EntityProvider: Send + Sync {
    fn entities(&self) -> QueryResult<Vec<Value>>;
}

impl<F> EntityProvider for F
where
    F: Fn() -> Vec<Value> + Send + Sync,
{
    fn entities(&self) -> QueryResult<Vec<Value>> {
        Ok(self())
    }
}

/// A fixed list of entities, cloned on every materialization
#[derive(Debug, Clone, Default)]
pub struct StaticEntities {
    entities: Arc<Vec<Value>>,
}

impl StaticEntities {
    pub fn new(entities: Vec<Value>) -> Self {
        Self {
            entities: Arc::new(entities),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl EntityProvider for StaticEntities {
    fn entities(&self) -> QueryResult<Vec<Value>> {
        Ok(self.entities.as_ref().clone())
    }
}

/// Entities read from a JSON file holding an array of documents.
/// The file is re-read on every materialization.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EntityProvider for JsonFileProvider {
    fn entities(&self) -> QueryResult<Vec<Value>> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            QueryError::Provider(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let document: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            QueryError::Provider(format!("invalid JSON in {}: {}", self.path.display(), e))
        })?;

        match document {
            serde_json::Value::Array(items) => Ok(items.into_iter().map(Value::from).collect()),
            other => Err(QueryError::Provider(format!(
                "expected a JSON array in {}, found {}",
                self.path.display(),
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
