//! OpenAI chat completions as the language model behind every prompt

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use nlq_core::{CallOptions, LanguageModel, NlqError};
use tracing::debug;

pub struct OpenAiModel {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiModel {
    pub fn new(api_key: &str, base_url: Option<&str>, model: impl Into<String>) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = base_url {
            config = config.with_api_base(base_url);
        }

        Self {
            client: Client::with_config(config),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One user message carrying the whole prompt.
    fn request(
        &self,
        prompt: &str,
        options: &CallOptions,
    ) -> Result<CreateChatCompletionRequest, OpenAIError> {
        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?,
            )])
            .temperature(options.temperature)
            .build()
    }
}

fn model_error(err: OpenAIError) -> NlqError {
    NlqError::ModelInvocation(err.to_string())
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn call(&self, prompt: &str, options: &CallOptions) -> nlq_core::Result<String> {
        let request = self.request(prompt, options).map_err(model_error)?;
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(model_error)?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| NlqError::ModelInvocation("No response from OpenAI".to_string()))?;

        debug!(model = %self.model, chars = content.len(), "Model replied");
        Ok(content)
    }
}
