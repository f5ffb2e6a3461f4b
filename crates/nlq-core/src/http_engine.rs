//! HTTP variant engine: the model writes request URLs for the narrowed paths

use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::{ExecutionInput, OutputKind, StructuredQueryEngine};
use crate::error::{NlqError, Result};
use crate::model::{CallOptions, LanguageModel};
use crate::prompt;

pub struct HttpRequestEngine {
    model: Arc<dyn LanguageModel>,
    default_base_url: String,
}

impl HttpRequestEngine {
    pub fn new(model: Arc<dyn LanguageModel>, default_base_url: impl Into<String>) -> Self {
        Self {
            model,
            default_base_url: default_base_url.into(),
        }
    }
}

#[async_trait]
impl StructuredQueryEngine for HttpRequestEngine {
    fn output_kind(&self) -> OutputKind {
        OutputKind::Http
    }

    async fn predict(&self, input: &ExecutionInput) -> Result<String> {
        let prompt = prompt::http_requests(&input.query, &input.identifiers, &self.default_base_url);
        let completion = self
            .model
            .call(&prompt, &CallOptions::deterministic())
            .await?;

        let completion = completion.trim();
        if completion.is_empty() {
            return Err(NlqError::QueryExecution(
                "Model returned no request URLs".to_string(),
            ));
        }

        Ok(completion.to_string())
    }
}
