//! SQL chain: generate SQL for the narrowed tables, run it, summarize the rows

use std::sync::Arc;

use async_trait::async_trait;
use nlq_core::{
    CallOptions, ExecutionInput, LanguageModel, NlqError, OutputKind, StructuredQueryEngine,
};
use tracing::{debug, info, warn};

use crate::catalog::TableCatalog;
use crate::executor::SharedExecutor;

fn sql_prompt(dialect: &str, table_info: &str, question: &str, top_k: usize) -> String {
    format!(
        r#"Given an input question, create a syntactically correct {dialect} query to run.
Unless the user specifies in the question a specific number of examples to obtain, query for at most {top_k} results using the LIMIT clause.
Never query for all columns from a table. You must query only the columns that are needed to answer the question.
Wrap each column name in double quotes (") to denote them as delimited identifiers.
Pay attention to use only the column names you can see in the tables below. Be careful to not query for columns that do not exist.
Also, pay attention to which column is in which table.

Return only the SQL query, with no explanation and no markdown.

Only use the following tables:
{table_info}

Question: {question}
SQLQuery:"#
    )
}

fn answer_prompt(question: &str, sql: &str, result: &str) -> String {
    format!(
        r#"Given an input question, the SQL query that was run and its result, write a short answer to the question.

Question: {question}
SQLQuery: {sql}
SQLResult:
{result}
Answer:"#
    )
}

/// Pull the SQL statement out of a model completion: strips markdown code
/// fences, a leading `SQLQuery:` label, and a trailing semicolon.
pub fn extract_sql(completion: &str) -> String {
    let mut text = completion.trim();

    if text.starts_with("```") {
        let start = text.find('\n').map(|i| i + 1).unwrap_or(text.len());
        let end = text.rfind("```").filter(|&end| end >= start).unwrap_or(text.len());
        text = text[start..end].trim();
    }

    if let Some(rest) = text.strip_prefix("SQLQuery:") {
        text = rest.trim();
    }

    // the model sometimes keeps going with SQLResult / Answer sections
    if let Some(idx) = text.find("\nSQLResult:") {
        text = text[..idx].trim();
    }

    text.trim_end_matches(';').trim().to_string()
}

/// SQL engine backed by DuckDB. Each prediction describes the narrowed tables
/// (all tables when none were selected), asks the model for one query, runs
/// it, and asks the model to answer from the rows.
pub struct SqlChainEngine {
    model: Arc<dyn LanguageModel>,
    executor: SharedExecutor,
    dialect: &'static str,
    top_k: usize,
}

impl SqlChainEngine {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        executor: SharedExecutor,
        dialect: &'static str,
        top_k: usize,
    ) -> Self {
        Self {
            model,
            executor,
            dialect,
            top_k,
        }
    }

    /// Describe the selected tables. When none of them exist, every table is
    /// described instead so a repair prompt can still name real tables.
    async fn table_info(&self, identifiers: &[String]) -> nlq_core::Result<String> {
        let identifiers = identifiers.to_vec();
        let tables = self
            .executor
            .run(move |db| {
                if !identifiers.is_empty() {
                    let selected = TableCatalog::describe(db, &identifiers)?;
                    if !selected.is_empty() {
                        return Ok(selected);
                    }
                    warn!(tables = ?identifiers, "None of the selected tables exist, describing all tables");
                }
                let all = db.list_tables()?;
                TableCatalog::describe(db, &all)
            })
            .await?;

        if tables.is_empty() {
            return Err(NlqError::SchemaFetch(
                "The database has no tables to query".to_string(),
            ));
        }

        Ok(tables
            .iter()
            .map(TableCatalog::to_prompt_text)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[async_trait]
impl StructuredQueryEngine for SqlChainEngine {
    fn output_kind(&self) -> OutputKind {
        OutputKind::Sql
    }

    async fn predict(&self, input: &ExecutionInput) -> nlq_core::Result<String> {
        let table_info = self.table_info(&input.identifiers).await?;

        let completion = self
            .model
            .call(
                &sql_prompt(self.dialect, &table_info, &input.query, self.top_k),
                &CallOptions::deterministic(),
            )
            .await?;

        let sql = extract_sql(&completion);
        if sql.is_empty() {
            return Err(NlqError::QueryExecution(
                "Model returned no SQL query".to_string(),
            ));
        }
        info!(sql = %sql, "Generated SQL");

        let statement = sql.clone();
        let result = self
            .executor
            .run(move |db| db.execute_sql(&statement))
            .await
            .map_err(|e| NlqError::QueryExecution(format!("`{}` failed: {}", sql, e)))?;
        debug!(rows = result.rows.len(), truncated = result.truncated, "SQL executed");

        let result_text = result.to_text();
        let answer = self
            .model
            .call(
                &answer_prompt(&input.query, &sql, &result_text),
                &CallOptions::deterministic(),
            )
            .await?;

        Ok(format!(
            "SQLQuery: {}\nSQLResult:\n{}\nAnswer: {}",
            sql,
            result_text,
            answer.trim()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{DuckExecutor, DuckOptions};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingModel(AtomicUsize);

    #[async_trait]
    impl LanguageModel for CountingModel {
        async fn call(&self, _prompt: &str, _options: &CallOptions) -> nlq_core::Result<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok("SELECT 1".to_string())
        }
    }

    #[test]
    fn test_extract_sql_plain() {
        assert_eq!(extract_sql("SELECT 1;"), "SELECT 1");
        assert_eq!(extract_sql("  SQLQuery: SELECT 1  "), "SELECT 1");
    }

    #[test]
    fn test_extract_sql_fenced() {
        let completion = "```sql\nSELECT \"id\" FROM \"session\"\nLIMIT 5;\n```";
        assert_eq!(extract_sql(completion), "SELECT \"id\" FROM \"session\"\nLIMIT 5");
    }

    #[test]
    fn test_extract_sql_stops_at_result_section() {
        let completion = "SELECT count(*) FROM session\nSQLResult: 3\nAnswer: three";
        assert_eq!(extract_sql(completion), "SELECT count(*) FROM session");
    }

    #[test]
    fn test_extract_sql_empty() {
        assert_eq!(extract_sql("```\n```"), "");
        assert_eq!(extract_sql("   "), "");
    }

    #[test]
    fn test_sql_prompt_embeds_tables_and_question() {
        let prompt = sql_prompt("DuckDB", "CREATE TABLE \"session\" ()", "how many sessions?", 5);
        assert!(prompt.contains("syntactically correct DuckDB query"));
        assert!(prompt.contains("at most 5 results"));
        assert!(prompt.contains("CREATE TABLE \"session\""));
        assert!(prompt.ends_with("Question: how many sessions?\nSQLQuery:"));
    }

    #[tokio::test]
    async fn test_empty_database_is_not_repairable() {
        let model = Arc::new(CountingModel(AtomicUsize::new(0)));
        let executor = SharedExecutor::new(DuckExecutor::open(DuckOptions::default()).unwrap());
        let engine = SqlChainEngine::new(model.clone(), executor, "DuckDB", 10);

        let err = engine
            .predict(&ExecutionInput::new("list sessions", vec!["session".to_string()]))
            .await
            .unwrap_err();

        assert!(matches!(err, NlqError::SchemaFetch(_)));
        assert!(!err.is_repairable());
        assert_eq!(model.0.load(Ordering::SeqCst), 0);
    }
}
