//! Embedding backends for query-time retrieval.
//!
//! - `LocalEmbedder`: BGE-M3 (XLM-RoBERTa) through candle, masked-mean pooled
//!   and L2-normalized.
//! - `HttpEmbedder`: any OpenAI-compatible `/v1/embeddings` endpoint.
//! - `FakeEmbedder`: hash-based, deterministic; for tests and development.
//!
//! `APP_USE_FAKE_EMBEDDINGS=1` forces the fake embedder regardless of config.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stylerag_core::config::{expand_path, EmbeddingConfig, EmbeddingProvider};
use stylerag_core::traits::Embedder;

pub mod http;
pub mod local;

pub use http::HttpEmbedder;
pub use local::{fit_window, masked_mean_l2, LocalEmbedder, QueryWindow};

pub const FAKE_MODEL_ID: &str = "fake-hash-v1";

/// Deterministic bag-of-hashed-tokens embedder.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim } }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher}; use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model_id(&self) -> &str { FAKE_MODEL_ID }
    fn dim(&self) -> usize { self.dim }
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// Build the embedder selected by configuration.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    if use_fake_embeddings() || config.provider == EmbeddingProvider::Fake {
        tracing::info!(dim = config.dim, "using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(config.dim)));
    }
    match config.provider {
        EmbeddingProvider::Http => Ok(Arc::new(HttpEmbedder::from_config(config)?)),
        _ => {
            let dir = resolve_model_dir(config.model_dir.as_deref())?;
            Ok(Arc::new(LocalEmbedder::load(&dir, &config.model, config.dim, config.max_len)?))
        }
    }
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured { let p = expand_path(dir); if p.exists() { return Ok(p); } return Err(anyhow!("embedding.model_dir {} does not exist", p.display())); }
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") { let p = PathBuf::from(&dir); if p.exists() { return Ok(p); } }
    if let Ok(dir) = std::env::var("MODEL_DIR") { let p = PathBuf::from(&dir); if p.exists() { return Ok(p); } }
    let root = Path::new("../models/bge-m3"); if root.exists() { return Ok(root.to_path_buf()); }
    let legacy = Path::new("models/bge-m3"); if legacy.exists() { return Ok(legacy.to_path_buf()); }
    Err(anyhow!("Could not locate BGE-M3 model directory"))
}
