//! Row-aligned embedding matrix used by the exact reranking pass.
//!
//! The matrix duplicates the vectors held by the index on purpose: the
//! index serves the coarse distance search, the matrix serves the cosine
//! rerank, and both are written by the same offline build in the same
//! row order.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Read-only 2-D float array, one row per chunk.
#[derive(Debug, Clone)]
pub struct EmbeddingMatrix {
    dimension: usize,
    rows: Vec<Vec<f32>>,
}

impl EmbeddingMatrix {
    /// Builds a matrix from pre-computed rows, inferring the dimension
    /// from the first row. All-zero rows are permitted; they are the
    /// build-time fallback for chunks whose embedding call failed.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let dimension = rows
            .first()
            .map(Vec::len)
            .context("cannot build a matrix from zero rows")?;
        anyhow::ensure!(dimension > 0, "embedding dimension must be at least 1");
        for (position, row) in rows.iter().enumerate() {
            anyhow::ensure!(
                row.len() == dimension,
                "matrix row {} has dimension {}, expected {}",
                position,
                row.len(),
                dimension
            );
        }
        Ok(Self { dimension, rows })
    }

    /// Loads a JSONL matrix file, one float array per line.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("failed to open {:?}", path))?;
        let reader = BufReader::new(file);
        let mut rows = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line =
                line.with_context(|| format!("failed to read embedding line {}", line_no + 1))?;
            if line.trim().is_empty() {
                continue;
            }
            let row: Vec<f32> = serde_json::from_str(&line)
                .with_context(|| format!("invalid embedding row at line {}", line_no + 1))?;
            rows.push(row);
        }
        Self::from_rows(rows).with_context(|| format!("inconsistent matrix in {:?}", path))
    }

    /// Number of rows in the matrix.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the matrix holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fixed dimension shared by every row.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Fetches the embedding at a row position.
    pub fn row(&self, position: usize) -> Option<&[f32]> {
        self.rows.get(position).map(Vec::as_slice)
    }

    /// Persists the matrix as JSONL, one float array per row.
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("failed to create {:?}", path))?;
        let mut writer = BufWriter::new(file);
        for row in &self.rows {
            serde_json::to_writer(&mut writer, row)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_rows() {
        let rows = vec![vec![1.0, 0.0], vec![0.5]];
        assert!(EmbeddingMatrix::from_rows(rows).is_err());
    }

    #[test]
    fn permits_zero_fallback_rows() {
        let rows = vec![vec![1.0, 0.0], vec![0.0, 0.0]];
        let matrix = EmbeddingMatrix::from_rows(rows).expect("build matrix");
        assert_eq!(matrix.row(1), Some([0.0, 0.0].as_slice()));
    }
}
