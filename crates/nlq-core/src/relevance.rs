//! Relevance filter: narrow a candidate set to what the query needs
//!
//! The model is asked for a comma separated, ordered list. Its answer is split
//! on commas and each element trimmed; order is the model's.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cancel::with_cancel;
use crate::error::Result;
use crate::model::{CallOptions, LanguageModel};
use crate::prompt;

/// What the candidate identifiers name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Tables,
    ApiPaths,
}

#[derive(Debug, Clone, Copy)]
pub struct RelevanceOptions {
    pub kind: CandidateKind,
    /// Drop identifiers the model returned that are not in the candidate set.
    /// Unknown identifiers are always logged.
    pub strict: bool,
}

impl Default for RelevanceOptions {
    fn default() -> Self {
        Self {
            kind: CandidateKind::Tables,
            strict: false,
        }
    }
}

/// Split a raw model answer into trimmed identifiers, skipping empty pieces.
pub fn parse_relevance_response(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ask `model` which of `candidates` are relevant to `query`.
///
/// An empty candidate list short-circuits to an empty result without calling
/// the model. Model failures are returned as-is.
pub async fn filter_relevant(
    query: &str,
    candidates: &[String],
    model: &dyn LanguageModel,
    options: RelevanceOptions,
    cancel: &CancellationToken,
) -> Result<Vec<String>> {
    if candidates.is_empty() {
        debug!("No candidates, skipping relevance call");
        return Ok(Vec::new());
    }

    let prompt = match options.kind {
        CandidateKind::Tables => prompt::relevant_tables(query, candidates),
        CandidateKind::ApiPaths => prompt::relevant_paths(query, candidates),
    };

    let completion = with_cancel(
        cancel,
        model.call(&prompt, &CallOptions::deterministic()),
    )
    .await?;

    let relevant = parse_relevance_response(&completion);

    let known: HashSet<&str> = candidates.iter().map(String::as_str).collect();
    let unknown: Vec<&String> = relevant
        .iter()
        .filter(|id| !known.contains(id.as_str()))
        .collect();

    if !unknown.is_empty() {
        warn!(unknown = ?unknown, strict = options.strict, "Model returned identifiers outside the candidate set");
    }

    let relevant = if options.strict && !unknown.is_empty() {
        relevant
            .into_iter()
            .filter(|id| known.contains(id.as_str()))
            .collect()
    } else {
        relevant
    };

    debug!(count = relevant.len(), of = candidates.len(), "Relevance filter done");
    Ok(relevant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NlqError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CannedModel {
        reply: std::result::Result<String, String>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
        last_options: Mutex<Option<CallOptions>>,
    }

    impl CannedModel {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
                last_options: Mutex::new(None),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                ..Self::ok("")
            }
        }
    }

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn call(&self, prompt: &str, options: &CallOptions) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            *self.last_options.lock().unwrap() = Some(*options);
            self.reply.clone().map_err(NlqError::ModelInvocation)
        }
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(parse_relevance_response(" a , b ,c "), names(&["a", "b", "c"]));
    }

    #[test]
    fn test_parse_single_element() {
        assert_eq!(parse_relevance_response("session"), names(&["session"]));
    }

    #[test]
    fn test_parse_skips_empty_pieces() {
        assert_eq!(parse_relevance_response("a, ,b,"), names(&["a", "b"]));
        assert!(parse_relevance_response("   ").is_empty());
    }

    #[tokio::test]
    async fn test_filter_uses_deterministic_sampling() {
        let model = CannedModel::ok("session, session_state");
        let candidates = names(&["session", "session_state", "target"]);

        let relevant = filter_relevant(
            "show me all active sessions",
            &candidates,
            &model,
            RelevanceOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(relevant, names(&["session", "session_state"]));
        assert_eq!(model.last_options.lock().unwrap().unwrap().temperature, 0.0);
        let prompt = model.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("show me all active sessions"));
        assert!(prompt.contains("- session_state"));
    }

    #[tokio::test]
    async fn test_empty_candidates_skip_model() {
        let model = CannedModel::ok("should, not, be, used");
        let relevant = filter_relevant(
            "anything",
            &[],
            &model,
            RelevanceOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(relevant.is_empty());
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let model = CannedModel::failing("rate limited");
        let err = filter_relevant(
            "q",
            &names(&["a"]),
            &model,
            RelevanceOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, NlqError::ModelInvocation(ref m) if m == "rate limited"));
    }

    #[tokio::test]
    async fn test_unknown_identifiers_pass_through_by_default() {
        let model = CannedModel::ok("session, ghost_table");
        let relevant = filter_relevant(
            "q",
            &names(&["session", "target"]),
            &model,
            RelevanceOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(relevant, names(&["session", "ghost_table"]));
    }

    #[tokio::test]
    async fn test_strict_mode_drops_unknown_identifiers() {
        let model = CannedModel::ok("ghost_table, target");
        let options = RelevanceOptions {
            kind: CandidateKind::Tables,
            strict: true,
        };
        let relevant = filter_relevant(
            "q",
            &names(&["session", "target"]),
            &model,
            options,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(relevant, names(&["target"]));
    }

    #[tokio::test]
    async fn test_identical_inputs_identical_output() {
        let model = CannedModel::ok("/v1/users ,/v1/scopes");
        let candidates = names(&["/v1/users", "/v1/scopes", "/v1/targets"]);
        let options = RelevanceOptions {
            kind: CandidateKind::ApiPaths,
            strict: false,
        };
        let cancel = CancellationToken::new();

        let first = filter_relevant("users", &candidates, &model, options, &cancel)
            .await
            .unwrap();
        let second = filter_relevant("users", &candidates, &model, options, &cancel)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert!(model
            .last_prompt
            .lock()
            .unwrap()
            .as_deref()
            .unwrap()
            .contains("HTTP API paths"));
    }
}
