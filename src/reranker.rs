//! Exact cosine-similarity reranking over coarse-search candidates.
//!
//! The coarse index search is tuned for scanning the whole corpus; this
//! second pass applies an exact, scale-invariant metric over the small
//! candidate set and corrects cases where Euclidean distance and relevance
//! diverge. Pure and deterministic: no I/O, no external calls.

use std::cmp::Ordering;

use anyhow::Result;

use crate::chunk::{Chunk, RankedChunk};

/// Cosine similarity between two vectors of equal dimension.
///
/// Defined as `0.0` when either vector has a zero norm, so degenerate
/// all-zero fallback rows rank below every real candidate.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vector dimensions differ");
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Reorders `candidates` by descending cosine similarity to the query
/// embedding and keeps the first `top_n`.
///
/// `candidate_embeddings` must align 1:1 with `candidates`. Ties keep the
/// original coarse-search order, so identical inputs always produce
/// identical output. `top_n` is clamped to at least 1; the result length
/// is `min(top_n, candidates.len())`.
pub fn rerank(
    query_embedding: &[f32],
    candidates: Vec<Chunk>,
    candidate_embeddings: &[Vec<f32>],
    top_n: usize,
) -> Result<Vec<RankedChunk>> {
    anyhow::ensure!(
        candidates.len() == candidate_embeddings.len(),
        "{} candidates but {} candidate embeddings",
        candidates.len(),
        candidate_embeddings.len()
    );
    let top_n = top_n.max(1);

    let mut order: Vec<(usize, f32)> = candidate_embeddings
        .iter()
        .map(|embedding| cosine_similarity(query_embedding, embedding))
        .enumerate()
        .collect();
    order.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    order.truncate(top_n);

    let mut slots: Vec<Option<Chunk>> = candidates.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|(index, similarity)| {
            slots[index].take().map(|chunk| RankedChunk { chunk, similarity })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n).map(|i| Chunk::new(i, format!("chunk {i}"))).collect()
    }

    #[test]
    fn cosine_of_vector_with_itself_is_one() {
        let v = [0.3, -1.2, 4.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 5.0]).abs() < EPSILON);
    }

    #[test]
    #[should_panic(expected = "vector dimensions differ")]
    fn cosine_rejects_mismatched_dimensions_in_debug_builds() {
        cosine_similarity(&[1.0, 0.0], &[1.0]);
    }

    #[test]
    fn cosine_with_zero_vector_uses_fallback() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn returns_exactly_top_n_chunks_from_candidates() {
        let embeddings = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.7, 0.7],
            vec![-1.0, 0.0],
        ];
        let ranked = rerank(&[1.0, 0.0], chunks(4), &embeddings, 2).expect("rerank");
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].chunk.position, 0);
        assert_eq!(ranked[1].chunk.position, 2);
    }

    #[test]
    fn top_n_larger_than_candidates_returns_all() {
        let embeddings = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let ranked = rerank(&[1.0, 1.0], chunks(2), &embeddings, 10).expect("rerank");
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn output_is_non_increasing_in_similarity() {
        let embeddings = vec![
            vec![0.2, 1.0],
            vec![1.0, 0.1],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
            vec![-0.5, 1.0],
        ];
        let ranked = rerank(&[1.0, 0.0], chunks(5), &embeddings, 5).expect("rerank");
        assert!(ranked
            .windows(2)
            .all(|w| w[0].similarity >= w[1].similarity));
    }

    #[test]
    fn ties_keep_coarse_search_order() {
        // Rows 0 and 2 are scaled copies of the query: identical cosine.
        let embeddings = vec![vec![2.0, 0.0], vec![0.0, 1.0], vec![5.0, 0.0]];
        let ranked = rerank(&[1.0, 0.0], chunks(3), &embeddings, 3).expect("rerank");
        let positions: Vec<usize> = ranked.iter().map(|r| r.chunk.position).collect();
        assert_eq!(positions, vec![0, 2, 1]);
    }

    #[test]
    fn deterministic_across_calls() {
        let embeddings = vec![
            vec![0.4, 0.9],
            vec![0.9, 0.4],
            vec![0.9, 0.4],
            vec![0.1, 0.1],
        ];
        let first = rerank(&[1.0, 0.5], chunks(4), &embeddings, 4).expect("rerank");
        let second = rerank(&[1.0, 0.5], chunks(4), &embeddings, 4).expect("rerank");
        assert_eq!(first, second);
    }

    #[test]
    fn similarity_ignores_candidate_scale() {
        // Candidates are the query rotated by varying amounts, each with an
        // arbitrary positive scale. Rerank must order by direction only.
        let query = [1.0, 0.0];
        let embeddings = vec![
            scale(rotate(&query, 0.9), 100.0),
            scale(rotate(&query, 0.05), 0.01),
            scale(rotate(&query, 0.4), 7.0),
            scale(rotate(&query, 0.02), 3.0),
            scale(rotate(&query, 1.4), 0.5),
            scale(rotate(&query, 0.2), 42.0),
            scale(rotate(&query, 0.6), 1.0),
            scale(rotate(&query, 0.01), 0.25),
            scale(rotate(&query, 1.1), 9.0),
            scale(rotate(&query, 0.3), 2.0),
        ];
        let ranked = rerank(&query, chunks(10), &embeddings, 3).expect("rerank");
        let positions: Vec<usize> = ranked.iter().map(|r| r.chunk.position).collect();
        // Smallest rotation angles win regardless of scale.
        assert_eq!(positions, vec![7, 3, 1]);
    }

    #[test]
    fn rejects_misaligned_candidate_embeddings() {
        let embeddings = vec![vec![1.0, 0.0]];
        assert!(rerank(&[1.0, 0.0], chunks(2), &embeddings, 1).is_err());
    }

    fn rotate(v: &[f32; 2], angle: f32) -> Vec<f32> {
        vec![
            v[0] * angle.cos() - v[1] * angle.sin(),
            v[0] * angle.sin() + v[1] * angle.cos(),
        ]
    }

    fn scale(v: Vec<f32>, factor: f32) -> Vec<f32> {
        v.into_iter().map(|x| x * factor).collect()
    }
}
