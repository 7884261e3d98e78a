//! BGE-M3 query embedding on candle.
//!
//! Queries are short, so each one is run as its own `[1, max_len]` batch on
//! the blocking pool; the model itself is shared behind an `Arc`.

use anyhow::{Result, anyhow, ensure};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use stylerag_core::traits::Embedder;

/// XLM-R `<pad>`.
const PAD_ID: u32 = 1;

pub struct LocalEmbedder { inner: Arc<LocalModel>, model_id: String, dim: usize }

struct LocalModel { model: XLMRobertaModel, tokenizer: Tokenizer, device: Device, model_id: String, dim: usize, max_len: usize }

/// Token window for one query, already padded to `max_len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryWindow { pub ids: Vec<u32>, pub mask: Vec<u32>, pub used: usize, pub dropped: usize }

/// Cut or pad token ids and mask to exactly `max_len`.
pub fn fit_window(mut ids: Vec<u32>, mut mask: Vec<u32>, max_len: usize) -> QueryWindow {
    let dropped = ids.len().saturating_sub(max_len);
    ids.truncate(max_len);
    mask.truncate(max_len);
    let used = ids.len();
    ids.resize(max_len, PAD_ID);
    mask.resize(max_len, 0);
    QueryWindow { ids, mask, used, dropped }
}

/// Mean over the unmasked tokens of `hidden` [B,T,H], then unit-length rows.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, _, width) = hidden.dims3().map_err(|e| anyhow!("hidden states must be [B,T,H]: {e}"))?;
    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    // all-padding rows pool to zero instead of NaN
    let counts = mask.sum(1)?.maximum(1.0)?;
    let mean = summed.broadcast_div(&counts)?;
    let floor = if hidden.dtype() == DType::F16 { 1e-6 } else { 1e-12 };
    let norms = mean.sqr()?.sum_keepdim(1)?.sqrt()?.maximum(floor)?;
    let pooled = mean.broadcast_div(&norms)?;
    ensure!(pooled.dims() == [batch, width], "pooled shape {:?}, expected [{batch}, {width}]", pooled.dims());
    Ok(pooled)
}

fn select_device(model_id: &str) -> Device {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(dev) => { tracing::info!(model = model_id, device = "metal", "embedding device selected"); return dev; }
            Err(e) => tracing::warn!(model = model_id, error = %e, "metal unavailable, falling back to cpu"),
        }
    }
    tracing::info!(model = model_id, device = "cpu", "embedding device selected");
    Device::Cpu
}

impl LocalEmbedder {
    pub fn load(model_dir: &Path, model_id: &str, dim: usize, max_len: usize) -> Result<Self> {
        let device = select_device(model_id);
        tracing::info!(model = model_id, dir = %model_dir.display(), max_len, "loading embedding model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(model_dir.join("config.json"))?)?;
        let weights: HashMap<String, Tensor> = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?.into_iter().collect();
        let model = XLMRobertaModel::new(&config, VarBuilder::from_tensors(weights, DType::F32, &device))?;
        tracing::info!(model = model_id, "embedding model loaded");
        let inner = LocalModel { model, tokenizer, device, model_id: model_id.to_string(), dim, max_len };
        Ok(Self { inner: Arc::new(inner), model_id: model_id.to_string(), dim })
    }
}

impl LocalModel {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let enc = self.tokenizer.encode(text, true).map_err(|e| anyhow!("tokenization failed: {}", e))?;
        let window = fit_window(enc.get_ids().to_vec(), enc.get_attention_mask().to_vec(), self.max_len);
        if window.dropped > 0 {
            tracing::warn!(model = %self.model_id, kept = window.used, dropped = window.dropped, "query longer than max_len, truncated");
        }
        let shape = (1, self.max_len);
        let input_ids = Tensor::new(window.ids.as_slice(), &self.device)?.reshape(shape)?;
        let attention_mask = Tensor::new(window.mask.as_slice(), &self.device)?.reshape(shape)?;
        let token_type_ids = Tensor::zeros(shape, DType::U32, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let emb = masked_mean_l2(&hidden, &attention_mask)?.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        ensure!(emb.len() == self.dim, "model produced {} dims, configured for {}", emb.len(), self.dim);
        tracing::debug!(model = %self.model_id, tokens = window.used, ms = start.elapsed().as_millis() as u64, "query embedded");
        Ok(emb)
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.inner);
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || texts.iter().map(|t| model.embed_query(t)).collect())
            .await
            .map_err(|e| anyhow!("embedding task failed: {e}"))?
    }
}
