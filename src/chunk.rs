//! Chunk records shared across retrieval stages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An immutable unit of retrievable text with a stable row position.
///
/// `position` is the join key between the vector index, the embedding
/// matrix, and the metadata store; all three are written in the same row
/// order by the offline build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Row index shared by all persisted artifacts.
    pub position: usize,
    /// Human-readable chunk body.
    pub text: String,
    /// Optional source attributes carried through from preprocessing.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Chunk {
    /// Builds a chunk with no extra attributes.
    pub fn new(position: usize, text: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
            attributes: BTreeMap::new(),
        }
    }
}

/// A chunk returned by the coarse index search, with its squared
/// Euclidean distance from the query embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Squared L2 distance reported by the index (smaller is closer).
    pub distance: f32,
}

/// A chunk that survived reranking, with its exact cosine similarity
/// to the query embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedChunk {
    /// The reranked chunk.
    pub chunk: Chunk,
    /// Cosine similarity in `[-1, 1]`, or `0.0` for degenerate rows.
    pub similarity: f32,
}
