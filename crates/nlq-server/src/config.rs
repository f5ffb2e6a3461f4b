//! Configuration system for nlq
//!
//! Loads configuration from, lowest precedence first:
//! 1. built-in defaults
//! 2. config.yaml - operational settings (mode, database, logging)
//! 3. environment variables (a `.env` file is loaded into the environment first)
//! 4. command line flags
//!
//! Secrets (the OpenAI API key, the database DSN) belong in `.env` or the
//! environment rather than config.yaml.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Cli;

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Missing required setting: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

impl From<ConfigError> for nlq_core::NlqError {
    fn from(err: ConfigError) -> Self {
        nlq_core::NlqError::Configuration(err.to_string())
    }
}

/// What the operator talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// SQL against a database; candidates are table names
    Sql,
    /// HTTP request URLs; candidates are API paths from a swagger document
    Http,
}

impl Mode {
    /// Case-insensitive, accepting the same names as `--mode`.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        <Mode as clap::ValueEnum>::from_str(value.trim(), true).map_err(|_| ConfigError::Invalid {
            key: "mode".to_string(),
            value: value.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string or DuckDB database path
    #[serde(skip_serializing)]
    pub dsn: Option<String>,

    /// Schema whose tables are candidates (defaults to the current schema)
    pub schema: Option<String>,

    pub read_only: bool,

    /// Rows kept from a query result
    pub max_result_rows: usize,

    /// Example rows shown to the model per table
    pub sample_rows: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            schema: None,
            read_only: true,
            max_result_rows: 50,
            sample_rows: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    /// OpenAI-compatible API base URL
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    /// Drop identifiers the model invents
    pub strict: bool,

    /// Fixed candidate table list; the database catalog is used when empty
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Swagger / OpenAPI document listing the API paths
    pub url: String,

    /// Base URL for generated requests when the query names none
    pub default_base_url: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            url: nlq_core::paths::DEFAULT_PATHS_URL.to_string(),
            default_base_url: nlq_core::prompt::DEFAULT_HTTP_BASE_URL.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directives, e.g. "warn,nlq_core=debug"
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stdout, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn,nlq_server=info,nlq_core=info,nlq_duck=info".to_string(),
            format: "compact".to_string(),
            output: "stdout".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: Mode,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,

    /// Repair attempts per turn after the first execution fails
    pub max_retries: u32,

    /// Cancel a turn that runs longer than this
    pub turn_timeout_secs: Option<u64>,

    pub relevance: RelevanceConfig,
    pub paths: PathsConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Sql,
            database: DatabaseConfig::default(),
            llm: LlmConfig::default(),
            max_retries: nlq_core::RetryBudget::DEFAULT.get(),
            turn_timeout_secs: None,
            relevance: RelevanceConfig::default(),
            paths: PathsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Build the effective configuration for this process.
    ///
    /// An explicit `--config` file must exist; otherwise `config.yaml` in the
    /// working directory is used when present.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE)?,
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file. Missing sections keep defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Override with environment variables if present.
    pub fn apply_env<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = var("NLQ_MODE") {
            self.mode = Mode::parse(&mode)?;
        }
        if let Some(dsn) = var("PSQL_DSN") {
            self.database.dsn = Some(dsn);
        }
        if let Some(schema) = var("NLQ_DB_SCHEMA") {
            self.database.schema = Some(schema);
        }

        if let Some(key) = var("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = var("NLQ_MODEL") {
            self.llm.model = model;
        }
        if let Some(base_url) = var("OPENAI_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }

        if let Some(retries) = var("NLQ_MAX_RETRIES") {
            self.max_retries = parse_number("NLQ_MAX_RETRIES", &retries)?;
        }
        if let Some(secs) = var("NLQ_TURN_TIMEOUT_SECS") {
            self.turn_timeout_secs = Some(parse_number("NLQ_TURN_TIMEOUT_SECS", &secs)?);
        }
        if let Some(url) = var("NLQ_PATHS_URL") {
            self.paths.url = url;
        }

        if let Some(level) = var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(output) = var("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Some(dir) = var("LOG_DIR") {
            self.logging.directory = dir;
        }

        Ok(())
    }

    /// Command line flags win over everything else.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(mode) = cli.mode {
            self.mode = mode;
        }
        if let Some(dsn) = &cli.psql_dsn {
            self.database.dsn = Some(dsn.clone());
        }
        if let Some(key) = &cli.openai_api_key {
            self.llm.api_key = Some(key.clone());
        }
        if let Some(model) = &cli.model {
            self.llm.model = model.clone();
        }
        if let Some(retries) = cli.max_retries {
            self.max_retries = retries;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Missing(
                "OpenAI API key (--openai-api-key or OPENAI_API_KEY)".to_string(),
            ));
        }
        if self.mode == Mode::Sql && self.database.dsn.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Missing(
                "database DSN (--psql-dsn or PSQL_DSN)".to_string(),
            ));
        }
        if self.turn_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid {
                key: "turn_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// API key, present once [`Config::validate`] has passed.
    pub fn openai_api_key(&self) -> Result<&str, ConfigError> {
        self.llm
            .api_key
            .as_deref()
            .ok_or_else(|| ConfigError::Missing("OPENAI_API_KEY".to_string()))
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}
