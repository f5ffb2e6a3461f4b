//! Operator conversation loop
//!
//! Reads one query per line and prints one outcome per turn. A failed turn
//! never ends the conversation; end of input does.

use std::time::Duration;

use nlq_core::{CancellationToken, NlqError, Pipeline, EXHAUSTED_MESSAGE};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

const BANNER: &str = "Conversation\n---------------------\n";
const PROMPT: &str = "> ";

/// How a conversation ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Conversation {
    pub turns: usize,
    /// Stopped by the shutdown token rather than end of input.
    pub interrupted: bool,
}

pub struct Repl<'a> {
    pipeline: &'a Pipeline,
    turn_timeout: Option<Duration>,
    shutdown: CancellationToken,
}

impl<'a> Repl<'a> {
    pub fn new(pipeline: &'a Pipeline, shutdown: CancellationToken) -> Self {
        Self {
            pipeline,
            turn_timeout: None,
            shutdown,
        }
    }

    pub fn with_turn_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.turn_timeout = timeout;
        self
    }

    /// Run until end of input or shutdown.
    pub async fn run<R, W>(&self, mut input: R, mut output: W) -> std::io::Result<Conversation>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut conversation = Conversation::default();
        let mut buf = Vec::new();

        output.write_all(BANNER.as_bytes()).await?;

        loop {
            output.write_all(PROMPT.as_bytes()).await?;
            output.flush().await?;

            buf.clear();
            let read = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    conversation.interrupted = true;
                    break;
                }
                read = input.read_until(b'\n', &mut buf) => read?,
            };
            if read == 0 {
                // end of input
                output.write_all(b"\n").await?;
                break;
            }

            // undecodable bytes become U+FFFD rather than ending the conversation
            let line = String::from_utf8_lossy(&buf);
            let query = line.trim();
            if query.is_empty() {
                continue;
            }

            conversation.turns += 1;
            let outcome = self.turn(query).await;
            output.write_all(outcome.as_bytes()).await?;

            if self.shutdown.is_cancelled() {
                conversation.interrupted = true;
                break;
            }
        }

        output.flush().await?;
        info!(turns = conversation.turns, interrupted = conversation.interrupted, "Conversation ended");
        Ok(conversation)
    }

    /// Run one turn and render its outcome for the operator.
    async fn turn(&self, query: &str) -> String {
        let cancel = self.shutdown.child_token();
        let timer = self.turn_timeout.map(|timeout| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                cancel.cancel();
            })
        });

        let result = self.pipeline.run_turn(query, &cancel).await;
        if let Some(timer) = timer {
            timer.abort();
        }

        match result {
            Ok(output) => format!("{}\n", output.answer),
            Err(NlqError::RetryBudgetExhausted { attempts, last }) => {
                warn!(attempts, error = %last, "Turn gave up");
                format!("{}\nlast error: {}\n", EXHAUSTED_MESSAGE, last)
            }
            Err(NlqError::Cancelled) if !self.shutdown.is_cancelled() => {
                let timeout = self.turn_timeout.unwrap_or_default();
                warn!(timeout = ?timeout, "Turn timed out");
                format!("error: turn timed out after {:?}\n", timeout)
            }
            Err(err) => {
                warn!(error = %err, "Turn failed");
                format!("error: {}\n", err)
            }
        }
    }
}
