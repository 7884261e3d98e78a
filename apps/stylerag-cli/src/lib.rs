//! Argument parsing and wiring for the `stylerag` binary.
pub mod args;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use stylerag_core::config::AppConfig;
use stylerag_core::error::{Error, Result};
use stylerag_core::traits::Embedder;
use stylerag_embed::build_embedder;
use stylerag_index::store::build_store;
use stylerag_index::{IndexProvisioner, Retriever};
use stylerag_llm::HttpGenerator;
use stylerag_pipeline::Pipeline;
use stylerag_prompt::PromptComposer;

pub type AppPipeline = Pipeline<Arc<IndexProvisioner>, HttpGenerator>;

/// Logs go to stderr; stdout is reserved for the answer.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,stylerag=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).try_init();
}

pub fn build_provisioner(config: &AppConfig, embedder: Arc<dyn Embedder>) -> Result<Arc<IndexProvisioner>> {
    let store = build_store(&config.storage)?;
    tracing::info!(store = %store.describe(), model = embedder.model_id(), "storage and embedder ready");
    Ok(Arc::new(IndexProvisioner::new(store, embedder, &config.storage)))
}

/// One embedder is shared by provisioning checks and query embedding.
pub fn build_pipeline(config: &AppConfig) -> Result<AppPipeline> {
    let embedder = build_embedder(&config.embedding).map_err(Error::config)?;
    let provisioner = build_provisioner(config, embedder.clone())?;
    let generator = HttpGenerator::from_config(&config.generation)?;
    Ok(Pipeline::new(
        provisioner,
        generator,
        Retriever::new(embedder, config.retrieval.top_k),
        PromptComposer::from_config(&config.prompt),
    ))
}
