//! Candidate identifier sources

use async_trait::async_trait;

use crate::error::Result;

/// Supplies the full candidate identifier set for a turn.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn candidates(&self) -> Result<Vec<String>>;
}

/// Fixed list, configured up front.
#[derive(Debug, Clone, Default)]
pub struct StaticCandidates {
    identifiers: Vec<String>,
}

impl StaticCandidates {
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifiers: identifiers.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl CandidateSource for StaticCandidates {
    async fn candidates(&self) -> Result<Vec<String>> {
        Ok(self.identifiers.clone())
    }
}
