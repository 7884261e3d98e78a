//! In-memory flat index opened from one artifact pair.
use std::path::Path;

use stylerag_core::error::{Error, Result};
use stylerag_core::traits::Embedder;
use stylerag_core::types::IndexId;

use crate::artifact::{self, ArtifactSet, StoredFragment};

/// An opened, read-only index. Shared across requests behind an `Arc`;
/// nothing here mutates after construction.
#[derive(Debug)]
pub struct VectorIndexHandle {
    id: IndexId,
    model: String,
    dim: usize,
    vectors: Vec<f32>,
    fragments: Vec<StoredFragment>,
}

impl VectorIndexHandle {
    pub fn from_artifacts(id: IndexId, set: ArtifactSet) -> Self {
        Self { id, model: set.model, dim: set.dim, vectors: set.vectors, fragments: set.fragments }
    }

    /// Read and decode both files, then check they live in the embedder's
    /// embedding space. Every failure here is a `LoadError`.
    pub async fn open(id: IndexId, vector_path: &Path, metadata_path: &Path, embedder: &dyn Embedder) -> Result<Self> {
        let blob = tokio::fs::read(vector_path).await.map_err(|e| Error::load(id.as_str(), format!("{}: {}", vector_path.display(), e)))?;
        let meta = tokio::fs::read(metadata_path).await.map_err(|e| Error::load(id.as_str(), format!("{}: {}", metadata_path.display(), e)))?;
        let set = artifact::decode(&blob, &meta).map_err(|e| Error::load(id.as_str(), e))?;
        if set.model != embedder.model_id() {
            return Err(Error::load(id.as_str(), format!(
                "index was built with embedding model '{}' but the active embedder is '{}'", set.model, embedder.model_id()
            )));
        }
        if set.dim != embedder.dim() {
            return Err(Error::load(id.as_str(), format!(
                "index dimension {} does not match embedder dimension {}", set.dim, embedder.dim()
            )));
        }
        tracing::debug!(index = %id, fragments = set.fragments.len(), dim = set.dim, "index decoded");
        Ok(Self::from_artifacts(id, set))
    }

    pub fn id(&self) -> &IndexId { &self.id }
    pub fn model(&self) -> &str { &self.model }
    pub fn dim(&self) -> usize { self.dim }
    pub fn len(&self) -> usize { self.fragments.len() }
    pub fn is_empty(&self) -> bool { self.fragments.is_empty() }
    pub fn fragment(&self, i: usize) -> Option<&StoredFragment> { self.fragments.get(i) }

    /// Exhaustive squared-L2 scan. Returns `(row, distance)` for the `k`
    /// closest rows, ascending by distance; equal distances keep row order.
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if self.dim == 0 { return Vec::new(); }
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(row, v)| (row, v.iter().zip(query).map(|(a, b)| (a - b) * (a - b)).sum::<f32>()))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);
        scored
    }
}
