//! Structured query engine collaborator

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What an engine produces from natural language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// SQL statement, executed against a database
    Sql,
    /// HTTP request URLs
    Http,
}

impl OutputKind {
    /// Noun used when asking the model to correct a failed query.
    pub fn describe(&self) -> &'static str {
        match self {
            OutputKind::Sql => "SQL query",
            OutputKind::Http => "HTTP request URL",
        }
    }
}

/// Input handed to an engine: the query text plus the narrowed identifiers
/// (table names or API paths) it should restrict itself to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionInput {
    pub query: String,
    pub identifiers: Vec<String>,
}

impl ExecutionInput {
    pub fn new(query: impl Into<String>, identifiers: Vec<String>) -> Self {
        Self {
            query: query.into(),
            identifiers,
        }
    }
}

/// Turns an [`ExecutionInput`] into a textual result, typically by generating
/// and running a query. Failures are reported as
/// [`NlqError::QueryExecution`](crate::NlqError::QueryExecution) or
/// [`NlqError::ModelInvocation`](crate::NlqError::ModelInvocation).
#[async_trait]
pub trait StructuredQueryEngine: Send + Sync {
    fn output_kind(&self) -> OutputKind;

    async fn predict(&self, input: &ExecutionInput) -> Result<String>;
}
