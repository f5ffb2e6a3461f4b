//! Per-turn pipeline: candidates → relevance filter → execute → repair

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::cancel::with_cancel;
use crate::engine::{ExecutionInput, StructuredQueryEngine};
use crate::error::Result;
use crate::executor::execute;
use crate::model::LanguageModel;
use crate::relevance::{filter_relevant, RelevanceOptions};
use crate::retry::{retry_predict, RetryBudget};
use crate::source::CandidateSource;

/// Settings fixed at startup and shared by every turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineConfig {
    pub relevance: RelevanceOptions,
    pub retry_budget: RetryBudget,
}

/// What a successful turn produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutput {
    pub answer: String,
    pub relevant: Vec<String>,
    /// Repair attempts used; 0 when the first execution succeeded.
    pub repairs: u32,
}

pub struct Pipeline {
    model: Arc<dyn LanguageModel>,
    source: Arc<dyn CandidateSource>,
    engine: Arc<dyn StructuredQueryEngine>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        source: Arc<dyn CandidateSource>,
        engine: Arc<dyn StructuredQueryEngine>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            model,
            source,
            engine,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolve one operator query, including every repair attempt.
    pub async fn run_turn(&self, query: &str, cancel: &CancellationToken) -> Result<TurnOutput> {
        let span = tracing::info_span!("turn", turn_id = %Uuid::new_v4());
        self.run_turn_inner(query, cancel).instrument(span).await
    }

    async fn run_turn_inner(&self, query: &str, cancel: &CancellationToken) -> Result<TurnOutput> {
        info!(query, "Turn started");

        let candidates = with_cancel(cancel, self.source.candidates()).await?;
        let relevant = filter_relevant(
            query,
            &candidates,
            self.model.as_ref(),
            self.config.relevance,
            cancel,
        )
        .await?;
        info!(relevant = ?relevant, "Narrowed candidates");

        let input = ExecutionInput::new(query, relevant.clone());
        match execute(&input, self.engine.as_ref(), cancel).await {
            Ok(answer) => Ok(TurnOutput {
                answer,
                relevant,
                repairs: 0,
            }),
            Err(err) if !err.is_repairable() => Err(err),
            Err(err) => {
                info!(error = %err, budget = self.config.retry_budget.get(), "Initial execution failed, repairing");
                let outcome = retry_predict(
                    input,
                    err,
                    self.engine.as_ref(),
                    self.config.retry_budget,
                    cancel,
                )
                .await?;
                info!(repairs = outcome.attempts, "Turn repaired");
                Ok(TurnOutput {
                    answer: outcome.output,
                    relevant,
                    repairs: outcome.attempts,
                })
            }
        }
    }
}
