//! nlq: natural language queries against a database or an HTTP API
//!
//! Each operator line becomes one turn: the model narrows the candidate tables
//! (or API paths), a structured query is generated and run, and failures are
//! fed back to the model until the retry budget runs out.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use nlq_core::{
    CancellationToken, CandidateKind, CandidateSource, HttpPathSource, HttpRequestEngine,
    LanguageModel, Pipeline, PipelineConfig, RelevanceOptions, RetryBudget, StaticCandidates,
    StructuredQueryEngine,
};
use nlq_duck::{CatalogSource, DuckExecutor, DuckOptions, Dsn, SharedExecutor, SqlChainEngine};
use tokio::io::BufReader;
use tracing::info;

mod cli;
mod config;
mod llm;
mod logging;
mod repl;

use cli::Cli;
use config::{Config, Mode};
use llm::OpenAiModel;
use repl::Repl;

/// 128 + SIGINT, as a shell reports a process killed by Ctrl-C.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::resolve(&cli).context("Invalid configuration")?;
    logging::init(&config.logging);

    let model = OpenAiModel::new(
        config.openai_api_key()?,
        config.llm.base_url.as_deref(),
        config.llm.model.clone(),
    );
    info!(model = model.model(), mode = ?config.mode, "Starting nlq");
    let model: Arc<dyn LanguageModel> = Arc::new(model);

    let pipeline = build_pipeline(&config, model)?;

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, shutting down");
                shutdown.cancel();
            }
        });
    }

    let conversation = Repl::new(&pipeline, shutdown)
        .with_turn_timeout(config.turn_timeout_secs.map(Duration::from_secs))
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
        .context("Conversation I/O failed")?;

    // the blocking stdin reader (and any running DuckDB query) would hold
    // runtime shutdown until the next newline
    if conversation.interrupted {
        std::process::exit(INTERRUPTED_EXIT_CODE);
    }

    Ok(())
}

fn build_pipeline(config: &Config, model: Arc<dyn LanguageModel>) -> anyhow::Result<Pipeline> {
    let (kind, source, engine): (
        CandidateKind,
        Arc<dyn CandidateSource>,
        Arc<dyn StructuredQueryEngine>,
    ) = match config.mode {
        Mode::Sql => {
            let dsn_text = config
                .database
                .dsn
                .as_deref()
                .context("A database DSN is required in sql mode")?;
            let dsn = Dsn::parse(dsn_text);
            let dialect = dsn.dialect();

            let executor = DuckExecutor::open(DuckOptions {
                dsn,
                schema: config.database.schema.clone(),
                read_only: config.database.read_only,
                max_result_rows: config.database.max_result_rows,
                sample_rows: config.database.sample_rows,
            })
            .context("Failed to open database")?;
            let executor = SharedExecutor::new(executor);

            let source: Arc<dyn CandidateSource> = if config.relevance.tables.is_empty() {
                Arc::new(CatalogSource::new(executor.clone()))
            } else {
                Arc::new(StaticCandidates::new(config.relevance.tables.iter().cloned()))
            };
            let engine = SqlChainEngine::new(
                model.clone(),
                executor,
                dialect,
                config.database.max_result_rows,
            );

            (CandidateKind::Tables, source, Arc::new(engine))
        }
        Mode::Http => {
            let source = HttpPathSource::new(config.paths.url.clone());
            info!(url = source.url(), "Using API paths from document");
            let engine = HttpRequestEngine::new(model.clone(), config.paths.default_base_url.clone());

            (CandidateKind::ApiPaths, Arc::new(source), Arc::new(engine))
        }
    };

    Ok(Pipeline::new(
        model,
        source,
        engine,
        PipelineConfig {
            relevance: RelevanceOptions {
                kind,
                strict: config.relevance.strict,
            },
            retry_budget: RetryBudget(config.max_retries),
        },
    ))
}
