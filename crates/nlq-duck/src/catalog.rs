//! Table catalog: candidate table names and per-table descriptions for prompts

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::executor::{quote_ident, DuckExecutor, QueryResult, SharedExecutor};
use crate::DuckError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableCatalog {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub sample: Option<QueryResult>,
}

impl TableCatalog {
    /// Describe the named tables. Names that do not resolve to a table are
    /// skipped, so identifiers invented by the model never reach the prompt.
    pub fn describe(executor: &DuckExecutor, tables: &[String]) -> Result<Vec<Self>, DuckError> {
        let sample_rows = executor.options().sample_rows;
        let mut described = Vec::with_capacity(tables.len());

        for table in tables {
            let columns: Vec<ColumnInfo> = executor
                .table_columns(table)?
                .into_iter()
                .map(|(name, data_type, is_nullable)| ColumnInfo {
                    name,
                    data_type,
                    is_nullable,
                })
                .collect();

            if columns.is_empty() {
                warn!(table = %table, "Skipping unknown table");
                continue;
            }

            let sample = if sample_rows > 0 {
                Some(executor.sample_rows(table, sample_rows)?)
            } else {
                None
            };

            described.push(TableCatalog {
                name: table.clone(),
                columns,
                sample,
            });
        }

        Ok(described)
    }

    /// `CREATE TABLE` style description followed by sample rows.
    pub fn to_prompt_text(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|col| {
                let null = if col.is_nullable { "" } else { " NOT NULL" };
                format!("\t{} {}{}", quote_ident(&col.name), col.data_type, null)
            })
            .collect();

        let mut text = format!(
            "CREATE TABLE {} (\n{}\n)",
            quote_ident(&self.name),
            columns.join(",\n")
        );

        if let Some(sample) = &self.sample {
            if !sample.rows.is_empty() {
                text.push_str(&format!(
                    "\n\n/*\n{} rows from {} table:\n{}\n*/",
                    sample.rows.len(),
                    self.name,
                    sample.to_text()
                ));
            }
        }

        text
    }
}

/// Offers every table in the configured schema as a relevance candidate.
#[derive(Clone)]
pub struct CatalogSource {
    executor: SharedExecutor,
}

impl CatalogSource {
    pub fn new(executor: SharedExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl nlq_core::CandidateSource for CatalogSource {
    async fn candidates(&self) -> nlq_core::Result<Vec<String>> {
        let tables = self.executor.run(|db| db.list_tables()).await?;
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::DuckOptions;
    use nlq_core::CandidateSource;

    fn boundary_db() -> DuckExecutor {
        let executor = DuckExecutor::open(DuckOptions::default()).unwrap();
        executor
            .execute_batch(
                "CREATE TABLE session (public_id VARCHAR NOT NULL, user_id VARCHAR);
                 INSERT INTO session VALUES ('s_1', 'u_1');
                 CREATE TABLE session_state (session_id VARCHAR, state VARCHAR);",
            )
            .unwrap();
        executor
    }

    #[test]
    fn test_describe_skips_unknown_tables() {
        let executor = boundary_db();
        let tables = TableCatalog::describe(
            &executor,
            &["session".to_string(), "made_up".to_string()],
        )
        .unwrap();

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "session");
        assert_eq!(tables[0].columns.len(), 2);
        assert!(!tables[0].columns[0].is_nullable);
    }

    #[test]
    fn test_prompt_text() {
        let executor = boundary_db();
        let tables = TableCatalog::describe(&executor, &["session".to_string()]).unwrap();
        let text = tables[0].to_prompt_text();

        assert!(text.starts_with("CREATE TABLE \"session\" ("));
        assert!(text.contains("\"public_id\" VARCHAR NOT NULL"));
        assert!(text.contains("1 rows from session table:"));
        assert!(text.contains("[\"s_1\",\"u_1\"]"));
    }

    #[test]
    fn test_empty_table_has_no_sample_block() {
        let executor = boundary_db();
        let tables = TableCatalog::describe(&executor, &["session_state".to_string()]).unwrap();
        assert!(!tables[0].to_prompt_text().contains("/*"));
    }

    #[tokio::test]
    async fn test_catalog_source_lists_tables() {
        let source = CatalogSource::new(SharedExecutor::new(boundary_db()));
        assert_eq!(
            source.candidates().await.unwrap(),
            vec!["session", "session_state"]
        );
    }
}
