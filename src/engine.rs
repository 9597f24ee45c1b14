//! Two-stage retrieval: coarse index search followed by exact reranking.

use crate::chunk::{RankedChunk, RetrievedChunk};
use crate::context::SearchContext;
use crate::embedder::QueryEmbedder;
use crate::error::SearchError;
use crate::index::SearchHit;
use crate::reranker::rerank;

/// Transient outcome of one search call: the query's embedding plus the
/// reranked chunks. Created per call, never persisted.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Embedding computed for the query text.
    pub query_embedding: Vec<f32>,
    /// Reranked chunks, similarity-descending.
    pub chunks: Vec<RankedChunk>,
}

/// Orchestrates embed, coarse search, row gather, and rerank over an
/// immutable [`SearchContext`].
pub struct SearchEngine<E> {
    context: SearchContext,
    embedder: E,
}

impl<E: QueryEmbedder> SearchEngine<E> {
    /// Builds an engine over loaded artifacts and an embedding provider.
    pub fn new(context: SearchContext, embedder: E) -> Self {
        Self { context, embedder }
    }

    /// The loaded artifact bundle.
    pub fn context(&self) -> &SearchContext {
        &self.context
    }

    /// Coarse retrieval: embed the query and return the `k` chunks whose
    /// index vectors are closest by squared Euclidean distance, ascending.
    ///
    /// `k` is clamped to at least 1. Empty or whitespace-only queries are
    /// rejected before any network call.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, SearchError> {
        let (_, hits) = self.coarse_search(query, k)?;
        hits.into_iter()
            .map(|hit| {
                self.chunk_at(hit.position).map(|chunk| RetrievedChunk {
                    chunk,
                    distance: hit.distance,
                })
            })
            .collect()
    }

    /// Full pipeline: coarse top-`k` search, then exact cosine rerank down
    /// to `top_n` chunks. The query is embedded exactly once and the same
    /// vector feeds both stages.
    pub fn retrieve_and_rerank(
        &self,
        query: &str,
        k: usize,
        top_n: usize,
    ) -> Result<QueryResult, SearchError> {
        let (query_embedding, hits) = self.coarse_search(query, k)?;

        let mut candidates = Vec::with_capacity(hits.len());
        let mut candidate_embeddings = Vec::with_capacity(hits.len());
        for hit in &hits {
            candidates.push(self.chunk_at(hit.position)?);
            let row = self.context.embeddings().row(hit.position).ok_or_else(|| {
                SearchError::configuration(format!(
                    "embedding matrix is missing row {}",
                    hit.position
                ))
            })?;
            candidate_embeddings.push(row.to_vec());
        }

        let chunks = rerank(&query_embedding, candidates, &candidate_embeddings, top_n)
            .map_err(|err| SearchError::configuration(format!("rerank failed: {err:#}")))?;
        crate::debug_log!(
            "query reranked: {} coarse hits -> {} chunks",
            hits.len(),
            chunks.len()
        );
        Ok(QueryResult {
            query_embedding,
            chunks,
        })
    }

    fn coarse_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<(Vec<f32>, Vec<SearchHit>), SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let k = k.max(1);
        let query_embedding = self.embedder.embed_query(query)?;
        let hits = self
            .context
            .index()
            .search(&query_embedding, k)
            .map_err(|err| {
                SearchError::configuration(format!(
                    "coarse search rejected query embedding: {err:#}"
                ))
            })?;
        Ok((query_embedding, hits))
    }

    fn chunk_at(&self, position: usize) -> Result<crate::chunk::Chunk, SearchError> {
        self.context
            .store()
            .get(position)
            .cloned()
            .ok_or_else(|| {
                SearchError::configuration(format!("metadata store is missing row {position}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;

    use super::*;
    use crate::context::SearchContext;
    use crate::embeddings::EmbeddingMatrix;
    use crate::index::FlatIndex;
    use crate::metadata::ChunkStore;

    /// Deterministic stand-in for the embedding provider, with a call
    /// counter so tests can assert no network call was attempted.
    struct StubEmbedder {
        vector: Vec<f32>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubEmbedder {
        fn returning(vector: Vec<f32>) -> Self {
            Self {
                vector,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                vector: Vec::new(),
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl QueryEmbedder for StubEmbedder {
        fn embed_query(&self, _query: &str) -> Result<Vec<f32>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SearchError::Embedding(anyhow!("stub provider down")));
            }
            Ok(self.vector.clone())
        }
    }

    fn people_context() -> SearchContext {
        let rows = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.9, 0.1],
        ];
        let index = FlatIndex::from_rows(rows.clone()).expect("index");
        let matrix = EmbeddingMatrix::from_rows(rows).expect("matrix");
        let store = ChunkStore::from_texts([
            "Alice works in Tokyo.",
            "Bob is in Paris.",
            "Carol manages the Paris team.",
        ]);
        SearchContext::from_parts(index, matrix, store).expect("aligned context")
    }

    #[test]
    fn empty_query_is_rejected_before_any_provider_call() {
        let embedder = StubEmbedder::returning(vec![0.0, 1.0, 0.0]);
        let engine = SearchEngine::new(people_context(), embedder);
        assert!(matches!(
            engine.retrieve("   \t  ", 5),
            Err(SearchError::EmptyQuery)
        ));
        assert_eq!(engine.embedder.call_count(), 0);
    }

    #[test]
    fn embedding_failure_fails_the_query() {
        let engine = SearchEngine::new(people_context(), StubEmbedder::failing());
        match engine.retrieve_and_rerank("who is in paris", 2, 1) {
            Err(SearchError::Embedding(_)) => {}
            other => panic!("expected embedding failure, got {other:?}"),
        }
        assert_eq!(engine.embedder.call_count(), 1);
    }

    #[test]
    fn paris_query_retrieves_the_two_paris_rows() {
        // "Who is in Paris?" embeds near rows 1 and 2.
        let embedder = StubEmbedder::returning(vec![0.0, 1.0, 0.05]);
        let engine = SearchEngine::new(people_context(), embedder);

        let retrieved = engine.retrieve("Who is in Paris?", 2).expect("retrieve");
        let mut positions: Vec<usize> =
            retrieved.iter().map(|r| r.chunk.position).collect();
        positions.sort_unstable();
        assert_eq!(positions, vec![1, 2]);
        assert!(retrieved[0].distance <= retrieved[1].distance);

        let result = engine
            .retrieve_and_rerank("Who is in Paris?", 2, 1)
            .expect("rerank");
        assert_eq!(result.chunks.len(), 1);
        // Row 1 points exactly along the query's dominant axis.
        assert_eq!(result.chunks[0].chunk.text, "Bob is in Paris.");
    }

    #[test]
    fn k_of_zero_is_clamped_to_one() {
        let embedder = StubEmbedder::returning(vec![1.0, 0.0, 0.0]);
        let engine = SearchEngine::new(people_context(), embedder);
        let retrieved = engine.retrieve("alice", 0).expect("retrieve");
        assert_eq!(retrieved.len(), 1);
        assert_eq!(retrieved[0].chunk.position, 0);
    }

    #[test]
    fn mismatched_query_dimension_is_a_configuration_error() {
        let embedder = StubEmbedder::returning(vec![1.0, 0.0]);
        let engine = SearchEngine::new(people_context(), embedder);
        assert!(matches!(
            engine.retrieve("alice", 3),
            Err(SearchError::Configuration(_))
        ));
    }
}
