//! Embedding provider boundary.
//!
//! The online query path talks to the provider through [`QueryEmbedder`]
//! so callers must handle failure explicitly and tests can substitute
//! stub providers with synthetic vectors.

pub mod azure;

pub use azure::AzureOpenAiEmbedder;

use crate::error::SearchError;

/// Services that turn a text string into a fixed-dimension dense vector.
pub trait QueryEmbedder {
    /// Embeds a single query string.
    ///
    /// A failed call yields [`SearchError::Embedding`]; the online path
    /// never substitutes a fallback vector.
    fn embed_query(&self, query: &str) -> Result<Vec<f32>, SearchError>;
}
