//! Retry-repair loop
//!
//! After the initial execution fails, the engine is re-invoked with a repair
//! prompt built from the original query and the most recent error. The loop
//! makes at most `budget` engine calls; the initial execution does not count
//! against the budget.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cancel::with_cancel;
use crate::engine::{ExecutionInput, StructuredQueryEngine};
use crate::error::{NlqError, Result};
use crate::prompt;

/// Maximum number of repair attempts per turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget(pub u32);

impl RetryBudget {
    pub const DEFAULT: RetryBudget = RetryBudget(10);

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One failed execution. Attempt 0 is the initial execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub error: String,
}

/// State of a turn being repaired. The original query never changes; each
/// failure is appended to the history.
#[derive(Debug, Clone)]
pub struct ExecutionAttempt {
    original: ExecutionInput,
    history: Vec<AttemptRecord>,
}

impl ExecutionAttempt {
    /// Start from the input whose initial execution failed with `error`.
    pub fn new(original: ExecutionInput, error: &NlqError) -> Self {
        Self {
            original,
            history: vec![AttemptRecord {
                attempt: 0,
                error: error.to_string(),
            }],
        }
    }

    pub fn original(&self) -> &ExecutionInput {
        &self.original
    }

    pub fn history(&self) -> &[AttemptRecord] {
        &self.history
    }

    pub fn latest_error(&self) -> &str {
        self.history
            .last()
            .map(|record| record.error.as_str())
            .unwrap_or_default()
    }

    fn record(&mut self, attempt: u32, error: &NlqError) {
        self.history.push(AttemptRecord {
            attempt,
            error: error.to_string(),
        });
    }

    /// Input for the next engine call: the repair prompt in place of the
    /// query, same identifiers.
    fn repair_input(&self, engine: &dyn StructuredQueryEngine) -> ExecutionInput {
        ExecutionInput {
            query: prompt::repair(
                engine.output_kind(),
                &self.original.query,
                self.latest_error(),
            ),
            identifiers: self.original.identifiers.clone(),
        }
    }
}

/// Result of a successful repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOutcome {
    pub output: String,
    /// Engine calls made by the loop, including the successful one.
    pub attempts: u32,
}

/// Re-run the engine with repair prompts until it succeeds or the budget is
/// spent.
///
/// `initial_error` is the failure of the execution that preceded the loop.
/// On exhaustion the returned [`NlqError::RetryBudgetExhausted`] carries the
/// last underlying error. Cancellation and non-repairable errors end the loop
/// immediately.
pub async fn retry_predict(
    input: ExecutionInput,
    initial_error: NlqError,
    engine: &dyn StructuredQueryEngine,
    budget: RetryBudget,
    cancel: &CancellationToken,
) -> Result<RepairOutcome> {
    if !initial_error.is_repairable() {
        return Err(initial_error);
    }

    let mut state = ExecutionAttempt::new(input, &initial_error);
    let mut last = initial_error;

    for attempt in 1..=budget.get() {
        let repair = state.repair_input(engine);

        match with_cancel(cancel, engine.predict(&repair)).await {
            Ok(output) => {
                debug!(attempt, "Repair attempt succeeded");
                return Ok(RepairOutcome {
                    output,
                    attempts: attempt,
                });
            }
            Err(err) if err.is_repairable() => {
                debug!(attempt, error = %err, "Repair attempt failed");
                state.record(attempt, &err);
                last = err;
            }
            Err(err) => return Err(err),
        }
    }

    Err(NlqError::RetryBudgetExhausted {
        attempts: budget.get(),
        last: Box::new(last),
    })
}
