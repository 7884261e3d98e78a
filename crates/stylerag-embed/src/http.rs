use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use stylerag_core::config::EmbeddingConfig;
use stylerag_core::traits::Embedder;

/// Embeddings from an OpenAI-compatible `/v1/embeddings` endpoint.
pub struct HttpEmbedder {
    base_url: String,
    api_key: Option<String>,
    model_id: String,
    dim: usize,
    client: Client,
}

impl HttpEmbedder {
    pub fn new(base_url: &str, model_id: &str, dim: usize, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), api_key, model_id: model_id.to_string(), dim, client })
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let endpoint = config.endpoint.as_deref().ok_or_else(|| anyhow!("embedding.endpoint is not set"))?;
        Self::new(endpoint, &config.model, config.dim, config.api_key.clone(), Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({ "model": self.model_id, "input": texts });
        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key { req = req.bearer_auth(key); }
        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            bail!("embedding endpoint returned {}: {}", status, text);
        }
        let payload: Value = res.json().await?;
        let embeddings = parse_embeddings(&payload)?;
        if embeddings.len() != texts.len() { bail!("embedder returned {} vectors for {} inputs", embeddings.len(), texts.len()); }
        Ok(embeddings)
    }
}

/// Extract `data[*].embedding`, ordered by `index` when present.
fn parse_embeddings(payload: &Value) -> Result<Vec<Vec<f32>>> {
    let data = payload["data"].as_array().ok_or_else(|| anyhow!("response has no 'data' array"))?;
    let mut rows: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let vals = item["embedding"].as_array().ok_or_else(|| anyhow!("data[{}] has no embedding", pos))?;
        let vec: Vec<f32> = vals.iter().filter_map(|v| v.as_f64().map(|f| f as f32)).collect();
        if vec.len() != vals.len() { bail!("data[{}] embedding contains non-numeric values", pos); }
        let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(pos);
        rows.push((index, vec));
    }
    rows.sort_by_key(|(i, _)| *i);
    Ok(rows.into_iter().map(|(_, v)| v).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeddings_are_reordered_by_index() {
        let payload = json!({ "data": [
            { "index": 1, "embedding": [0.0, 1.0] },
            { "index": 0, "embedding": [1.0, 0.0] }
        ]});
        let out = parse_embeddings(&payload).unwrap();
        assert_eq!(out, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn missing_data_is_an_error() {
        assert!(parse_embeddings(&json!({ "error": "bad model" })).is_err());
    }
}
