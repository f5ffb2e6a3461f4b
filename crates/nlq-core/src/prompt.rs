//! Prompt templates
//!
//! Every prompt embeds the operator query verbatim. Candidate lists are
//! rendered one identifier per line so commas inside the list never collide
//! with the comma-separated format requested back from the model.

use crate::engine::OutputKind;

/// Base URL assumed by the HTTP request prompt when the query names none.
pub const DEFAULT_HTTP_BASE_URL: &str = "http://localhost:9200";

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ask for the tables relevant to `query`, as a comma separated list.
pub fn relevant_tables(query: &str, tables: &[String]) -> String {
    format!(
        r#"Of the following database tables and the given query, return an ordered list of the tables
that contain information relevant to the query, most relevant first.

Format the response to be a comma separated list of table names and nothing else.
Query: {}
Tables:
{}"#,
        query,
        bullet_list(tables)
    )
}

/// Ask for the API paths relevant to `query`, as a comma separated list.
pub fn relevant_paths(query: &str, paths: &[String]) -> String {
    format!(
        r#"Of the following HTTP API paths and the given query, return an ordered list of HTTP API requests that
return relevant information about the query.

Format the response to be a comma separated list.
Query: {}
API Paths:
{}"#,
        query,
        bullet_list(paths)
    )
}

/// Ask for HTTP request URLs answering `query` using only `paths`.
pub fn http_requests(query: &str, paths: &[String], default_base_url: &str) -> String {
    format!(
        r#"Given the following query and set of HTTP API paths, write syntactically correct HTTP request URLs to get the
relevant information using the base URL provided in the query. If no base URL is given, default to {}.
Query: {}
Paths:
{}"#,
        default_base_url,
        query,
        bullet_list(paths)
    )
}

/// Ask the model to correct the query that produced `error`.
pub fn repair(kind: OutputKind, original_query: &str, error: &str) -> String {
    format!(
        r#"Given the following query and error, return a syntactically correct {} that fixes the error.
Query: {}
Error: {}"#,
        kind.describe(),
        original_query,
        error
    )
}
