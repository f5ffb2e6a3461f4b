//! DuckDB-backed SQL engine for nlq
//!
//! Opens either a local DuckDB file or a PostgreSQL database attached through
//! DuckDB's postgres extension, lists its tables as relevance candidates and
//! runs model-generated SQL against it.

use thiserror::Error;

mod catalog;
mod chain;
mod executor;

pub use catalog::{CatalogSource, ColumnInfo, TableCatalog};
pub use chain::{extract_sql, SqlChainEngine};
pub use executor::{DuckExecutor, DuckOptions, Dsn, QueryResult, SharedExecutor};

#[derive(Debug, Error)]
pub enum DuckError {
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Failed to attach {dsn}: {source}")]
    Attach {
        dsn: String,
        #[source]
        source: duckdb::Error,
    },

    #[error("Database connection lock poisoned")]
    Poisoned,

    #[error("Database task failed: {0}")]
    Join(String),
}

impl From<DuckError> for nlq_core::NlqError {
    fn from(err: DuckError) -> Self {
        match err {
            DuckError::Attach { .. } => nlq_core::NlqError::Configuration(err.to_string()),
            other => nlq_core::NlqError::QueryExecution(other.to_string()),
        }
    }
}
