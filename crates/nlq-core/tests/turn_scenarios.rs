//! End-to-end turns through `Pipeline` with stub collaborators

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nlq_core::{
    CallOptions, CancellationToken, CandidateKind, CandidateSource, ExecutionInput,
    LanguageModel, NlqError, OutputKind, Pipeline, PipelineConfig, RelevanceOptions,
    RetryBudget, StaticCandidates, StructuredQueryEngine, EXHAUSTED_MESSAGE,
};

struct FixedModel(&'static str);

#[async_trait]
impl LanguageModel for FixedModel {
    async fn call(&self, _prompt: &str, _options: &CallOptions) -> nlq_core::Result<String> {
        Ok(self.0.to_string())
    }
}

struct ScriptedEngine {
    replies: Mutex<VecDeque<nlq_core::Result<String>>>,
    inputs: Mutex<Vec<ExecutionInput>>,
}

impl ScriptedEngine {
    fn new(replies: Vec<nlq_core::Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            inputs: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl StructuredQueryEngine for ScriptedEngine {
    fn output_kind(&self) -> OutputKind {
        OutputKind::Sql
    }

    async fn predict(&self, input: &ExecutionInput) -> nlq_core::Result<String> {
        self.inputs.lock().unwrap().push(input.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(NlqError::QueryExecution("relation does not exist".to_string())))
    }
}

struct FailingSource;

#[async_trait]
impl CandidateSource for FailingSource {
    async fn candidates(&self) -> nlq_core::Result<Vec<String>> {
        Err(NlqError::SchemaFetch("connection refused".to_string()))
    }
}

struct SlowEngine {
    calls: AtomicUsize,
}

#[async_trait]
impl StructuredQueryEngine for SlowEngine {
    fn output_kind(&self) -> OutputKind {
        OutputKind::Sql
    }

    async fn predict(&self, _input: &ExecutionInput) -> nlq_core::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("too late".to_string())
    }
}

fn session_candidates() -> Arc<StaticCandidates> {
    Arc::new(StaticCandidates::new(["session", "session_state", "target"]))
}

fn config(budget: u32) -> PipelineConfig {
    PipelineConfig {
        relevance: RelevanceOptions {
            kind: CandidateKind::Tables,
            strict: false,
        },
        retry_budget: RetryBudget(budget),
    }
}

#[tokio::test]
async fn active_sessions_succeed_without_repair() {
    let engine = ScriptedEngine::new(vec![Ok(
        "SELECT * FROM session WHERE state='active'".to_string()
    )]);
    let pipeline = Pipeline::new(
        Arc::new(FixedModel("session, session_state")),
        session_candidates(),
        engine.clone(),
        config(10),
    );

    let out = pipeline
        .run_turn("show me all active sessions", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(out.relevant, vec!["session", "session_state"]);
    assert_eq!(out.answer, "SELECT * FROM session WHERE state='active'");
    assert_eq!(out.repairs, 0);

    let inputs = engine.inputs.lock().unwrap();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].query, "show me all active sessions");
    assert_eq!(inputs[0].identifiers, vec!["session", "session_state"]);
}

#[tokio::test]
async fn repair_prompt_carries_execution_error() {
    let engine = ScriptedEngine::new(vec![
        Err(NlqError::QueryExecution("column does not exist".to_string())),
        Ok("SELECT id FROM session".to_string()),
    ]);
    let pipeline = Pipeline::new(
        Arc::new(FixedModel("session")),
        session_candidates(),
        engine.clone(),
        config(10),
    );

    let out = pipeline
        .run_turn("show me all active sessions", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(out.answer, "SELECT id FROM session");
    assert_eq!(out.repairs, 1);

    let inputs = engine.inputs.lock().unwrap();
    assert_eq!(inputs.len(), 2);
    assert!(inputs[1].query.contains("column does not exist"));
    assert!(inputs[1].query.contains("show me all active sessions"));
    assert_eq!(inputs[1].identifiers, vec!["session"]);
}

#[tokio::test]
async fn exhausted_budget_reports_fixed_message() {
    let engine = ScriptedEngine::new(vec![]);
    let pipeline = Pipeline::new(
        Arc::new(FixedModel("session")),
        session_candidates(),
        engine.clone(),
        config(3),
    );

    let err = pipeline
        .run_turn("show me all active sessions", &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), EXHAUSTED_MESSAGE);
    // initial execution plus three repairs
    assert_eq!(engine.inputs.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn schema_fetch_failure_fails_turn() {
    let engine = ScriptedEngine::new(vec![Ok("unused".to_string())]);
    let pipeline = Pipeline::new(
        Arc::new(FixedModel("session")),
        Arc::new(FailingSource),
        engine.clone(),
        config(10),
    );

    let err = pipeline
        .run_turn("anything", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, NlqError::SchemaFetch(_)));
    assert!(engine.inputs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn cancellation_aborts_in_flight_execution() {
    let engine = Arc::new(SlowEngine {
        calls: AtomicUsize::new(0),
    });
    let pipeline = Pipeline::new(
        Arc::new(FixedModel("session")),
        session_candidates(),
        engine.clone(),
        config(10),
    );

    let cancel = CancellationToken::new();
    let timer = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        timer.cancel();
    });

    let err = pipeline.run_turn("slow", &cancel).await.unwrap_err();

    assert!(matches!(err, NlqError::Cancelled));
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
}
