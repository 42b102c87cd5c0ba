//! In-memory nearest-neighbour index over document chunks.
//!
//! Brute-force cosine scoring: the index lives only as long as the chat
//! session and holds at most a few thousand chunks.

use crate::doc_processor::DocumentChunk;
use crate::embedding::cosine_similarity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMatch {
    pub chunk: DocumentChunk,
    pub score: f32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("embedding has {got} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("embedding is empty")]
    EmptyVector,
}

#[derive(Debug, Clone)]
struct Entry {
    chunk: DocumentChunk,
    vector: Vec<f32>,
}

#[derive(Debug, Default)]
pub struct VectorStore {
    entries: Vec<Entry>,
    dims: Option<usize>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimensionality fixed by the first insert since the store was last empty.
    pub fn dims(&self) -> Option<usize> {
        self.dims
    }

    fn check_dims(&self, got: usize) -> Result<(), IndexError> {
        if got == 0 {
            return Err(IndexError::EmptyVector);
        }
        match self.dims {
            Some(expected) if expected != got => Err(IndexError::DimensionMismatch { expected, got }),
            _ => Ok(()),
        }
    }

    pub fn insert(&mut self, chunk: DocumentChunk, vector: Vec<f32>) -> Result<(), IndexError> {
        self.check_dims(vector.len())?;
        self.dims = Some(vector.len());
        self.entries.push(Entry { chunk, vector });
        Ok(())
    }

    /// Insert a whole document's chunks, all or nothing.
    pub fn insert_all(
        &mut self,
        items: impl IntoIterator<Item = (DocumentChunk, Vec<f32>)>,
    ) -> Result<usize, IndexError> {
        let items: Vec<(DocumentChunk, Vec<f32>)> = items.into_iter().collect();
        validate_batch(self.dims, &items)?;
        Ok(self.push_all(items))
    }

    /// Swap every chunk of `source` for `items`, all or nothing.
    ///
    /// The new vectors only have to agree with the chunks of other sources,
    /// so a document can be re-embedded with a different model when it is
    /// the only one indexed. On error the old chunks stay in place.
    pub fn replace_source(
        &mut self,
        source: &str,
        items: impl IntoIterator<Item = (DocumentChunk, Vec<f32>)>,
    ) -> Result<usize, IndexError> {
        let items: Vec<(DocumentChunk, Vec<f32>)> = items.into_iter().collect();
        let others_dims = if self.entries.iter().any(|e| e.chunk.source != source) {
            self.dims
        } else {
            None
        };
        validate_batch(others_dims, &items)?;
        self.remove_source(source);
        Ok(self.push_all(items))
    }

    fn push_all(&mut self, items: Vec<(DocumentChunk, Vec<f32>)>) -> usize {
        let count = items.len();
        for (chunk, vector) in items {
            self.dims = Some(vector.len());
            self.entries.push(Entry { chunk, vector });
        }
        count
    }

    /// Best `k` chunks for `query`, highest score first.
    ///
    /// Equal scores are ordered by source name, then chunk index.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ChunkMatch>, IndexError> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }
        self.check_dims(query.len())?;

        let mut scored: Vec<(&Entry, f32)> = self
            .entries
            .iter()
            .map(|e| (e, cosine_similarity(query, &e.vector)))
            .collect();

        scored.sort_by(|(a, sa), (b, sb)| {
            sb.total_cmp(sa)
                .then_with(|| a.chunk.source.cmp(&b.chunk.source))
                .then_with(|| a.chunk.index.cmp(&b.chunk.index))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(e, score)| ChunkMatch {
                chunk: e.chunk.clone(),
                score,
            })
            .collect())
    }

    /// Drop every chunk that came from `source`. Returns how many were removed.
    pub fn remove_source(&mut self, source: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.chunk.source != source);
        if self.entries.is_empty() {
            self.dims = None;
        }
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dims = None;
    }

    /// Distinct source names, in insertion order.
    pub fn sources(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for entry in &self.entries {
            if !out.contains(&entry.chunk.source) {
                out.push(entry.chunk.source.clone());
            }
        }
        out
    }
}

/// Every vector non-empty and of one length, matching `expected` when set.
fn validate_batch(
    mut expected: Option<usize>,
    items: &[(DocumentChunk, Vec<f32>)],
) -> Result<(), IndexError> {
    for (_, vector) in items {
        if vector.is_empty() {
            return Err(IndexError::EmptyVector);
        }
        match expected {
            Some(dims) if dims != vector.len() => {
                return Err(IndexError::DimensionMismatch {
                    expected: dims,
                    got: vector.len(),
                })
            }
            _ => expected = Some(vector.len()),
        }
    }
    Ok(())
}
