//! Chat-completion client for the hosted generation model.
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use stylerag_core::config::GenerationConfig;
use stylerag_core::error::{Error, Result};
use stylerag_core::traits::Generator;
use stylerag_core::types::GenerationRequest;

/// Talks to an OpenAI-compatible `POST /v1/chat/completions` endpoint.
#[derive(Clone)]
pub struct HttpGenerator {
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    timeout: Duration,
    client: Client,
}

impl HttpGenerator {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>, max_tokens: u32, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(Error::config)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            max_tokens,
            timeout,
            client,
        })
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Self::new(&config.endpoint, config.model()?, config.api_key.clone(), config.max_tokens, config.timeout())
    }

    pub fn model(&self) -> &str { &self.model }

    async fn chat(&self, request: &GenerationRequest) -> anyhow::Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "temperature": request.temperature,
            "max_tokens": self.max_tokens,
            "stream": false,
        });
        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key { req = req.bearer_auth(key); }
        let res = req.send().await.map_err(|e| {
            if e.is_timeout() { anyhow!("no response from {} within {:?}", url, self.timeout) } else { anyhow!(e) }
        })?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            bail!("{} returned {}: {}", url, status, text);
        }
        let payload: Value = res.json().await.map_err(|e| anyhow!("response body is not JSON: {}", e))?;
        parse_completion(&payload)
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let started = Instant::now();
        match self.chat(request).await {
            Ok(text) => {
                tracing::debug!(model = %self.model, chars = text.len(), ms = started.elapsed().as_millis() as u64, "completion received");
                Ok(text)
            }
            Err(e) => {
                tracing::warn!(model = %self.model, error = %e, "generation call failed");
                Err(Error::generation(e))
            }
        }
    }
}

/// `choices[0].message.content`; blank content counts as a failure.
pub fn parse_completion(payload: &Value) -> anyhow::Result<String> {
    let content = payload["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| anyhow!("response has no choices[0].message.content"))?;
    if content.trim().is_empty() { bail!("model returned an empty completion"); }
    Ok(content.to_string())
}
