use std::path::PathBuf;

use clap::Parser;

use crate::config::Mode;

/// Talk to your database or HTTP API in plain language.
///
/// Flags override config.yaml and environment variables.
#[derive(Debug, Parser)]
#[command(name = "nlq", version)]
pub struct Cli {
    /// YAML configuration file (default: ./config.yaml when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// PostgreSQL connection string or DuckDB database path [env: PSQL_DSN]
    #[arg(long, value_name = "DSN")]
    pub psql_dsn: Option<String>,

    /// OpenAI API key [env: OPENAI_API_KEY]
    #[arg(long, value_name = "KEY")]
    pub openai_api_key: Option<String>,

    /// Repair attempts per turn after a failed execution [env: NLQ_MAX_RETRIES]
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Generate SQL or HTTP requests [env: NLQ_MODE]
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Chat model name [env: NLQ_MODEL]
    #[arg(long)]
    pub model: Option<String>,
}
