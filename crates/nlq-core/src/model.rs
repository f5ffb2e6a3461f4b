//! Language model collaborator

use async_trait::async_trait;

use crate::error::Result;

/// Sampling options for a single completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallOptions {
    pub temperature: f32,
}

impl CallOptions {
    /// Temperature 0, used for every call nlq makes.
    pub fn deterministic() -> Self {
        Self { temperature: 0.0 }
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self::deterministic()
    }
}

/// Opaque text completion. Implementations map provider failures to
/// [`NlqError::ModelInvocation`](crate::NlqError::ModelInvocation).
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn call(&self, prompt: &str, options: &CallOptions) -> Result<String>;
}
