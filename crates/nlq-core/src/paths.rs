//! API path candidates from a remote swagger / OpenAPI document

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{NlqError, Result};
use crate::source::CandidateSource;

/// Swagger document of the Boundary controller API.
pub const DEFAULT_PATHS_URL: &str =
    "https://raw.githubusercontent.com/hashicorp/boundary/main/internal/gen/controller.swagger.json";

/// Extract the keys of the top-level `paths` object.
pub fn parse_path_document(body: &[u8]) -> Result<Vec<String>> {
    let document: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| NlqError::SchemaFetch(format!("Invalid JSON in path document: {}", e)))?;

    let paths = document
        .get("paths")
        .and_then(|v| v.as_object())
        .ok_or_else(|| {
            NlqError::SchemaFetch("Path document has no top-level `paths` object".to_string())
        })?;

    Ok(paths.keys().cloned().collect())
}

/// Fetches the path document on every call. No caching, no retry.
pub struct HttpPathSource {
    client: Client,
    url: String,
}

impl HttpPathSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| NlqError::SchemaFetch(format!("GET {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NlqError::SchemaFetch(format!(
                "GET {} returned {}",
                self.url, status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| NlqError::SchemaFetch(format!("Reading {} failed: {}", self.url, e)))?;

        let paths = parse_path_document(&body)?;
        debug!(url = %self.url, count = paths.len(), "Fetched API paths");
        Ok(paths)
    }
}

#[async_trait]
impl CandidateSource for HttpPathSource {
    async fn candidates(&self) -> Result<Vec<String>> {
        self.fetch().await
    }
}
