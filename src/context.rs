//! Init-once lifecycle for the persisted retrieval artifacts.
//!
//! The vector index, the embedding matrix, and the metadata store are all
//! derived from the same offline build and are never independently updated
//! at runtime. Loading validates that they are mutually row-aligned; any
//! mismatch is fatal and the process must refuse to start.

use std::path::PathBuf;

use crate::embeddings::EmbeddingMatrix;
use crate::error::SearchError;
use crate::index::FlatIndex;
use crate::metadata::ChunkStore;

/// Locations of the three persisted artifacts produced by the offline build.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    /// Flat vector index (JSON).
    pub index: PathBuf,
    /// Embedding matrix (JSONL, one float array per row).
    pub embeddings: PathBuf,
    /// Metadata store (JSONL, one chunk record per row).
    pub metadata: PathBuf,
}

/// Immutable bundle of loaded artifacts, constructed once at startup and
/// passed explicitly to the search engine.
#[derive(Debug, Clone)]
pub struct SearchContext {
    index: FlatIndex,
    embeddings: EmbeddingMatrix,
    store: ChunkStore,
}

impl SearchContext {
    /// Loads and cross-validates all three artifacts.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, SearchError> {
        let index = FlatIndex::load(&paths.index).map_err(|err| {
            SearchError::configuration(format!(
                "failed to load vector index {:?}: {err:#}",
                paths.index
            ))
        })?;
        let embeddings = EmbeddingMatrix::load(&paths.embeddings).map_err(|err| {
            SearchError::configuration(format!(
                "failed to load embedding matrix {:?}: {err:#}",
                paths.embeddings
            ))
        })?;
        let store = ChunkStore::load(&paths.metadata).map_err(|err| {
            SearchError::configuration(format!(
                "failed to load metadata store {:?}: {err:#}",
                paths.metadata
            ))
        })?;
        Self::from_parts(index, embeddings, store)
    }

    /// Assembles a context from already-loaded parts, enforcing row
    /// alignment. This is the seam tests use to supply synthetic indices.
    pub fn from_parts(
        index: FlatIndex,
        embeddings: EmbeddingMatrix,
        store: ChunkStore,
    ) -> Result<Self, SearchError> {
        if store.is_empty() {
            return Err(SearchError::configuration(
                "metadata store contains no chunks",
            ));
        }
        if index.len() != store.len() || embeddings.len() != store.len() {
            return Err(SearchError::configuration(format!(
                "row counts disagree: index has {}, embedding matrix has {}, metadata has {}",
                index.len(),
                embeddings.len(),
                store.len()
            )));
        }
        if index.dimension() != embeddings.dimension() {
            return Err(SearchError::configuration(format!(
                "index dimension {} does not match embedding matrix dimension {}",
                index.dimension(),
                embeddings.dimension()
            )));
        }
        Ok(Self {
            index,
            embeddings,
            store,
        })
    }

    /// The coarse-search index.
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// The rerank embedding matrix.
    pub fn embeddings(&self) -> &EmbeddingMatrix {
        &self.embeddings
    }

    /// The chunk metadata store.
    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the context holds no chunks. Always false for a context
    /// that passed validation.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<Vec<f32>> {
        (0..n).map(|i| vec![i as f32, 1.0]).collect()
    }

    #[test]
    fn aligned_parts_are_accepted() {
        let index = FlatIndex::from_rows(rows(3)).expect("index");
        let matrix = EmbeddingMatrix::from_rows(rows(3)).expect("matrix");
        let store = ChunkStore::from_texts(["a", "b", "c"]);
        let context = SearchContext::from_parts(index, matrix, store).expect("aligned");
        assert_eq!(context.len(), 3);
    }

    #[test]
    fn mismatched_row_counts_are_fatal() {
        let index = FlatIndex::from_rows(rows(3)).expect("index");
        let matrix = EmbeddingMatrix::from_rows(rows(2)).expect("matrix");
        let store = ChunkStore::from_texts(["a", "b", "c"]);
        match SearchContext::from_parts(index, matrix, store) {
            Err(SearchError::Configuration(message)) => {
                assert!(message.contains("row counts disagree"), "{message}");
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_dimensions_are_fatal() {
        let index = FlatIndex::from_rows(rows(2)).expect("index");
        let matrix =
            EmbeddingMatrix::from_rows(vec![vec![0.0, 1.0, 2.0], vec![1.0, 2.0, 3.0]])
                .expect("matrix");
        let store = ChunkStore::from_texts(["a", "b"]);
        assert!(matches!(
            SearchContext::from_parts(index, matrix, store),
            Err(SearchError::Configuration(_))
        ));
    }

    #[test]
    fn empty_corpus_is_fatal() {
        let index = FlatIndex::new(2).expect("index");
        let matrix = EmbeddingMatrix::from_rows(rows(1)).expect("matrix");
        let store = ChunkStore::from_texts(Vec::<String>::new());
        assert!(matches!(
            SearchContext::from_parts(index, matrix, store),
            Err(SearchError::Configuration(_))
        ));
    }
}
