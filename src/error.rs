//! Error taxonomy surfaced by the retrieval pipeline.

use thiserror::Error;

/// Failures a caller of the search pipeline must handle.
///
/// Retrieval errors are never collapsed into an empty result: an empty
/// chunk list always means the search genuinely matched nothing.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Persisted artifacts are missing, unreadable, or mutually misaligned.
    /// Fatal at startup; the process refuses to serve misaligned results.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The embedding provider failed for a live query. The query fails;
    /// no fallback vector is substituted on the online path.
    #[error("embedding request failed: {0}")]
    Embedding(anyhow::Error),

    /// The query was empty or whitespace-only. Rejected before any
    /// network call is attempted.
    #[error("query text must not be empty")]
    EmptyQuery,

    /// The answer model call failed. Retrieval results produced before
    /// this point remain valid and displayable.
    #[error("answer generation failed: {0}")]
    Generation(anyhow::Error),
}

impl SearchError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        SearchError::Configuration(message.into())
    }
}
