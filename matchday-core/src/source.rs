//! The Snapshot Source contract.
//!
//! Adapters own everything source-specific: endpoint shapes, status-word
//! vocabularies, validation of raw payloads into [`MatchSnapshot`]s. The
//! tracker consumes only what comes out of `fetch_today`.

use crate::fixture::MatchSnapshot;
use async_trait::async_trait;
use thiserror::Error;

/// Errors a Snapshot Source can surface for a whole cycle.
///
/// All of these are recoverable: the caller logs and treats the cycle as
/// "no data". Per-match problems (one fixture's fields unusable) are
/// handled inside the adapter by skipping that fixture, never by failing
/// the batch.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network-level failure reaching the source.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The source answered with a non-success status.
    #[error("unexpected response status {0}")]
    Status(u16),

    /// The response body could not be interpreted at all.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// A pluggable producer of today's fixture snapshots.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the current state of today's fixtures.
    async fn fetch_today(&self) -> Result<Vec<MatchSnapshot>, SourceError>;

    /// Short name for logging.
    fn name(&self) -> &'static str;
}
