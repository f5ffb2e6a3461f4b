//! Error taxonomy shared by every nlq crate

use thiserror::Error;

/// Text shown to the operator when a turn runs out of repair attempts.
pub const EXHAUSTED_MESSAGE: &str =
    "maximum retry attempts reached — rephrase the query and try again";

#[derive(Debug, Error)]
pub enum NlqError {
    /// Missing or invalid startup configuration. Fatal to the process.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The language model call failed (network, auth, quota, empty response).
    #[error("Model invocation failed: {0}")]
    ModelInvocation(String),

    /// The remote path document could not be fetched or parsed.
    #[error("Schema fetch failed: {0}")]
    SchemaFetch(String),

    /// The structured query engine rejected or failed to run the query.
    #[error("Query execution failed: {0}")]
    QueryExecution(String),

    /// Every repair attempt failed. `last` is the final underlying error.
    #[error("maximum retry attempts reached — rephrase the query and try again")]
    RetryBudgetExhausted {
        attempts: u32,
        #[source]
        last: Box<NlqError>,
    },

    #[error("Turn cancelled")]
    Cancelled,
}

impl NlqError {
    /// Whether the repair loop may feed this error back to the model.
    pub fn is_repairable(&self) -> bool {
        matches!(
            self,
            NlqError::ModelInvocation(_) | NlqError::QueryExecution(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, NlqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_display_matches_constant() {
        let err = NlqError::RetryBudgetExhausted {
            attempts: 3,
            last: Box::new(NlqError::QueryExecution("boom".to_string())),
        };
        assert_eq!(err.to_string(), EXHAUSTED_MESSAGE);

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "Query execution failed: boom");
    }

    #[test]
    fn test_repairable_errors() {
        assert!(NlqError::QueryExecution("x".into()).is_repairable());
        assert!(NlqError::ModelInvocation("x".into()).is_repairable());
        assert!(!NlqError::Cancelled.is_repairable());
        assert!(!NlqError::SchemaFetch("x".into()).is_repairable());
        assert!(!NlqError::Configuration("x".into()).is_repairable());
    }
}
