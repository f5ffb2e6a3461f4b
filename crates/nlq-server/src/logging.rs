//! Structured logging for nlq
//!
//! Standard output belongs to the conversation, so console logs are written
//! to stderr. Settings come from [`LoggingConfig`]:
//! - `level`: filter directives (RUST_LOG)
//! - `format`: "pretty", "json", "compact" (LOG_FORMAT)
//! - `output`: "stdout", "file", "both" (LOG_OUTPUT); "stdout" means the console
//! - `directory`: where daily rolled log files go (LOG_DIR)
//!
//! ```bash
//! # Debug a session, JSON lines to ./logs
//! RUST_LOG=nlq_core=debug LOG_FORMAT=json LOG_OUTPUT=file nlq --psql-dsn boundary.duckdb
//! ```

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt, layer::Layered, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "nlq.log";

type Filtered = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Filtered> + Send + Sync>;

/// Log format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, multi-line
    Pretty,
    /// One JSON object per event
    Json,
    /// Single-line
    Compact,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Compact,
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Console (stderr) only
    Console,
    /// Log to file only
    File,
    /// Console and file
    Both,
}

impl LogOutput {
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "file" => LogOutput::File,
            "both" => LogOutput::Both,
            _ => LogOutput::Console,
        }
    }
}

fn env_filter(level: &str) -> EnvFilter {
    let mut filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));

    // quiet transport crates unless asked for explicitly
    for directive in ["hyper=warn", "reqwest=warn", "h2=warn", "rustls=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

fn console_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .boxed(),
    }
}

fn file_layer(directory: &str, format: LogFormat) -> BoxedLayer {
    std::fs::create_dir_all(directory).ok();
    let file_appender = RollingFileAppender::new(Rotation::DAILY, directory, LOG_FILE_PREFIX);

    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(file_appender)
            .with_ansi(false)
            .boxed(),
        _ => fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .boxed(),
    }
}

/// Install the global subscriber. Call once, before the first turn.
pub fn init(config: &LoggingConfig) {
    let format = LogFormat::parse(&config.format);
    let output = LogOutput::parse(&config.output);

    let layers: Vec<BoxedLayer> = match output {
        LogOutput::Console => vec![console_layer(format)],
        LogOutput::File => vec![file_layer(&config.directory, format)],
        LogOutput::Both => vec![
            console_layer(format),
            file_layer(&config.directory, format),
        ],
    };

    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(layers)
        .init();

    tracing::debug!(
        format = ?format,
        output = ?output,
        level = %config.level,
        "Logging initialized"
    );
    if output != LogOutput::Console {
        tracing::debug!(directory = %config.directory, "Writing log files");
    }
}
