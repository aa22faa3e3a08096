//! Error types for query pipelines.

use crate::expression::ExpressionError;
use thiserror::Error;

/// Errors raised while building or materializing a [`Repository`](crate::repository::Repository)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// An expression failed against one of the entities
    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] ExpressionError),

    /// `get` matched no entity
    #[error("No entity matches {query}")]
    NotFound { query: String },

    /// `get` matched more than one entity
    #[error("{count} entities match {query}, expected exactly one")]
    NotUnique { query: String, count: usize },

    /// Projection arguments rejected when the stage was added
    #[error("Invalid projection: {0}")]
    InvalidProjection(String),

    /// The entity provider could not produce entities
    #[error("Entity provider failed: {0}")]
    Provider(String),
}

impl QueryError {
    /// The evaluation error, if this is one
    pub fn as_evaluation(&self) -> Option<&ExpressionError> {
        match self {
            QueryError::Evaluation(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for pipeline operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::NotUnique {
            query: "group == 4".to_string(),
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "2 entities match group == 4, expected exactly one"
        );

        let err = QueryError::from(ExpressionError::DivisionByZero);
        assert_eq!(err.to_string(), "Evaluation failed: Division by zero");
        assert_eq!(err.as_evaluation(), Some(&ExpressionError::DivisionByZero));
    }
}
