//! Top-k similarity search over an opened index.
use std::sync::Arc;

use stylerag_core::error::{Error, Result};
use stylerag_core::traits::Embedder;
use stylerag_core::types::RetrievedFragment;

use crate::handle::VectorIndexHandle;

pub const DEFAULT_TOP_K: usize = 5;

/// Separator placed between fragments when building the prompt context.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

pub struct Retriever { embedder: Arc<dyn Embedder>, k: usize }

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, k: usize) -> Self { Self { embedder, k: k.max(1) } }

    pub fn top_k(&self) -> usize { self.k }

    /// Embed `query` and return up to `k` fragments, closest first.
    pub async fn search(&self, index: &VectorIndexHandle, query: &str) -> Result<Vec<RetrievedFragment>> {
        let mut embedded = self.embedder.embed_batch(&[query.to_string()]).await.map_err(Error::retrieval)?;
        if embedded.len() != 1 {
            return Err(Error::Retrieval(format!("embedder returned {} vectors for one query", embedded.len())));
        }
        let query_vec = embedded.remove(0);
        if query_vec.len() != index.dim() {
            return Err(Error::Retrieval(format!(
                "query embedding has {} dims but index '{}' has {}", query_vec.len(), index.id(), index.dim()
            )));
        }
        let hits = index.nearest(&query_vec, self.k);
        let mut out = Vec::with_capacity(hits.len());
        for (rank, (row, distance)) in hits.into_iter().enumerate() {
            let fragment = index
                .fragment(row)
                .ok_or_else(|| Error::Retrieval(format!("index '{}' has no fragment for row {}", index.id(), row)))?;
            out.push(RetrievedFragment {
                id: fragment.id.clone(),
                content: fragment.content.clone(),
                metadata: fragment.metadata.clone(),
                rank,
                distance,
            });
        }
        tracing::debug!(index = %index.id(), hits = out.len(), "similarity search done");
        Ok(out)
    }
}

/// Fragment contents in rank order, separated by a blank line.
pub fn join_context(fragments: &[RetrievedFragment]) -> String {
    fragments.iter().map(|f| f.content.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}
