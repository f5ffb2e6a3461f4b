//! Query executor: one delegation to the structured query engine

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cancel::with_cancel;
use crate::engine::{ExecutionInput, StructuredQueryEngine};
use crate::error::Result;

/// Run `input` through `engine` once. The engine's result and error are
/// returned unmodified; recovery belongs to the caller.
pub async fn execute(
    input: &ExecutionInput,
    engine: &dyn StructuredQueryEngine,
    cancel: &CancellationToken,
) -> Result<String> {
    debug!(identifiers = ?input.identifiers, "Executing query");
    with_cancel(cancel, engine.predict(input)).await
}
