//! nlq core - natural language to SQL / HTTP turn handling
//!
//! A turn narrows a candidate set (table names or API paths) down to the
//! identifiers relevant to an operator query, hands the query and that subset
//! to a structured query engine, and repairs failed executions with a bounded
//! retry loop.
//!
//! The language model, the query engine and the candidate source are
//! collaborators behind traits so the turn logic can be driven by stubs.

pub mod cancel;
pub mod engine;
pub mod error;
pub mod executor;
pub mod http_engine;
pub mod model;
pub mod paths;
pub mod pipeline;
pub mod prompt;
pub mod relevance;
pub mod retry;
pub mod source;

pub use engine::{ExecutionInput, OutputKind, StructuredQueryEngine};
pub use error::{NlqError, Result, EXHAUSTED_MESSAGE};
pub use http_engine::HttpRequestEngine;
pub use model::{CallOptions, LanguageModel};
pub use paths::HttpPathSource;
pub use pipeline::{Pipeline, PipelineConfig, TurnOutput};
pub use relevance::{CandidateKind, RelevanceOptions};
pub use retry::{AttemptRecord, ExecutionAttempt, RepairOutcome, RetryBudget};
pub use source::{CandidateSource, StaticCandidates};

pub use tokio_util::sync::CancellationToken;
