//! Row-ordered metadata store mapping index positions to text chunks.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::chunk::Chunk;

/// On-disk row shape: the position is implied by line order, exactly as
/// rows were inserted into the vector index by the offline build.
#[derive(Debug, Serialize, Deserialize)]
struct MetadataRow {
    text: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, String>,
}

/// Read-only table of chunks, loaded once per process.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    chunks: Vec<Chunk>,
}

impl ChunkStore {
    /// Loads a JSONL metadata file, one chunk record per line.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("failed to open {:?}", path))?;
        let reader = BufReader::new(file);
        let mut chunks = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line =
                line.with_context(|| format!("failed to read metadata line {}", line_no + 1))?;
            if line.trim().is_empty() {
                continue;
            }
            let row: MetadataRow = serde_json::from_str(&line)
                .with_context(|| format!("invalid metadata record at line {}", line_no + 1))?;
            chunks.push(Chunk {
                position: chunks.len(),
                text: row.text,
                attributes: row.attributes,
            });
        }
        Ok(Self { chunks })
    }

    /// Builds a store from in-memory chunks, reassigning positions to
    /// match insertion order. Used by tests and external build tooling.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let chunks = texts
            .into_iter()
            .enumerate()
            .map(|(position, text)| Chunk::new(position, text))
            .collect();
        Self { chunks }
    }

    /// Number of rows in the store.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Fetches the chunk at a row position.
    pub fn get(&self, position: usize) -> Option<&Chunk> {
        self.chunks.get(position)
    }

    /// All chunks in row order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Persists the store as JSONL, one record per row.
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("failed to create {:?}", path))?;
        let mut writer = BufWriter::new(file);
        for chunk in &self.chunks {
            let row = MetadataRow {
                text: chunk.text.clone(),
                attributes: chunk.attributes.clone(),
            };
            serde_json::to_writer(&mut writer, &row)?;
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
    fn positions_follow_insertion_order() {
        let store = ChunkStore::from_texts(["first", "second", "third"]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(1).map(|c| c.text.as_str()), Some("second"));
        assert_eq!(store.get(2).map(|c| c.position), Some(2));
        assert!(store.get(3).is_none());
    }
}
