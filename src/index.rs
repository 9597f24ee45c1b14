//! Flat nearest-neighbor index over chunk embeddings.
//!
//! The index is exhaustive and exact: every query is compared against every
//! stored vector by squared Euclidean distance. It is built once offline,
//! persisted as a single JSON document, and read-only after load.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One coarse-search match: a row position and its distance from the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Row index into the metadata store and embedding matrix.
    pub position: usize,
    /// Squared L2 distance (smaller is closer).
    pub distance: f32,
}

/// Exact flat index supporting top-k search by squared Euclidean distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Creates an empty index for vectors of the given dimension.
    pub fn new(dimension: usize) -> Result<Self> {
        anyhow::ensure!(dimension > 0, "index dimension must be at least 1");
        Ok(Self {
            dimension,
            vectors: Vec::new(),
        })
    }

    /// Builds an index from pre-computed rows, inferring the dimension
    /// from the first row. All rows must share one dimension.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let dimension = rows
            .first()
            .map(Vec::len)
            .context("cannot build an index from zero rows")?;
        let mut index = Self::new(dimension)?;
        for row in rows {
            index.add(row)?;
        }
        Ok(index)
    }

    /// Appends one vector at the next row position.
    pub fn add(&mut self, vector: Vec<f32>) -> Result<()> {
        anyhow::ensure!(
            vector.len() == self.dimension,
            "vector dimension {} does not match index dimension {}",
            vector.len(),
            self.dimension
        );
        self.vectors.push(vector);
        Ok(())
    }

    /// Number of indexed rows.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index holds no rows.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Fixed vector dimension accepted by this index.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Returns the `k` rows closest to `query`, distance-ascending.
    ///
    /// Ties are broken by row position so results are deterministic.
    /// Returns fewer than `k` hits only when the index holds fewer rows.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        anyhow::ensure!(
            query.len() == self.dimension,
            "query dimension {} does not match index dimension {}",
            query.len(),
            self.dimension
        );
        let mut hits: Vec<SearchHit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| SearchHit {
                position,
                distance: squared_l2(query, vector),
            })
            .collect();
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.position.cmp(&b.position))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Loads a persisted index from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("failed to open {:?}", path))?;
        let index: FlatIndex = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("invalid index file {:?}", path))?;
        anyhow::ensure!(index.dimension > 0, "index dimension must be at least 1");
        for (position, vector) in index.vectors.iter().enumerate() {
            anyhow::ensure!(
                vector.len() == index.dimension,
                "index row {} has dimension {}, expected {}",
                position,
                vector.len(),
                index.dimension
            );
        }
        Ok(index)
    }

    /// Persists the index to `path`, overwriting any previous file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("failed to create {:?}", path))?;
        serde_json::to_writer(BufWriter::new(file), self)
            .with_context(|| format!("failed to write index to {:?}", path))?;
        Ok(())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> FlatIndex {
        FlatIndex::from_rows(vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 2.0],
            vec![3.0, 3.0],
        ])
        .expect("build index")
    }

    #[test]
    fn search_orders_by_ascending_distance() {
        let index = sample_index();
        let hits = index.search(&[0.9, 0.0], 4).expect("search");
        let positions: Vec<usize> = hits.iter().map(|hit| hit.position).collect();
        assert_eq!(positions, vec![1, 0, 2, 3]);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn search_truncates_to_k() {
        let index = sample_index();
        let hits = index.search(&[0.0, 0.0], 2).expect("search");
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn search_returns_all_rows_when_k_exceeds_len() {
        let index = sample_index();
        let hits = index.search(&[0.0, 0.0], 10).expect("search");
        assert_eq!(hits.len(), index.len());
    }

    #[test]
    fn equal_distances_tie_break_by_position() {
        let index = FlatIndex::from_rows(vec![
            vec![1.0, 0.0],
            vec![-1.0, 0.0],
            vec![0.0, 1.0],
        ])
        .expect("build index");
        let hits = index.search(&[0.0, 0.0], 3).expect("search");
        let positions: Vec<usize> = hits.iter().map(|hit| hit.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn rejects_mismatched_query_dimension() {
        let index = sample_index();
        assert!(index.search(&[0.0, 0.0, 0.0], 1).is_err());
    }

    #[test]
    fn rejects_mismatched_row_dimension() {
        let mut index = FlatIndex::new(2).expect("new index");
        index.add(vec![0.0, 1.0]).expect("add");
        assert!(index.add(vec![0.0]).is_err());
    }
}
