use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::types::GenerationRequest;

/// Text embedding backend. Queries must be embedded with the same model the
/// index was built with; `model_id` and `dim` are checked against the index
/// metadata when it is loaded.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: Option<u64>,
}

/// Remote store holding the published index artifacts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Human readable location, e.g. `s3://bucket`.
    fn describe(&self) -> String;
    /// Errors when the object does not exist.
    async fn head(&self, key: &str) -> anyhow::Result<ObjectMeta>;
    /// Writes the whole object to `dest`, returning the byte count.
    async fn get(&self, key: &str, dest: &Path) -> anyhow::Result<u64>;
}

/// Hosted text-generation model.
///
/// Implementations report every transport or model failure as
/// `Error::Generation`.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

#[async_trait]
impl<T: Generator + ?Sized> Generator for std::sync::Arc<T> {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> { (**self).generate(request).await }
}
