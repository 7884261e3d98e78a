//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars,
//! plus the plain `BUCKET_NAME` / `AWS_REGION` variables used by the admin
//! tooling. The result is an immutable `AppConfig` built once at startup.
//! Provides a helper to expand `~` and `${VAR}` in configured paths.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// AWS SDK with the standard credential chain.
    S3,
    /// Plain HEAD/GET with an optional bearer token.
    Http,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket: Option<String>,
    pub region: String,
    /// Custom S3 endpoint (`s3`), HTTP base URL (`http`), or a directory
    /// when `backend = "local"`.
    pub endpoint: Option<String>,
    pub backend: StorageBackend,
    pub auth_token: Option<String>,
    pub index_prefix: String,
    pub cache_dir: String,
    pub fetch_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            region: "us-east-1".to_string(),
            endpoint: None,
            backend: StorageBackend::S3,
            auth_token: None,
            index_prefix: "my_faiss".to_string(),
            cache_dir: "/tmp/stylerag".to_string(),
            fetch_timeout_secs: 60,
        }
    }
}

impl StorageConfig {
    pub fn bucket(&self) -> Result<&str> {
        match self.bucket.as_deref().map(str::trim) {
            Some(b) if !b.is_empty() => Ok(b),
            _ => Err(Error::Configuration(
                "storage bucket is not set (set storage.bucket, APP_STORAGE__BUCKET or BUCKET_NAME)".to_string(),
            )),
        }
    }

    /// Base URL objects are addressed under. An explicit endpoint is used
    /// path-style (`<endpoint>/<bucket>`); otherwise the virtual-host S3 URL
    /// for the bucket and region.
    pub fn endpoint_url(&self) -> Result<String> {
        if let Some(ep) = &self.endpoint {
            return Ok(format!("{}/{}", ep.trim_end_matches('/'), self.bucket()?));
        }
        Ok(format!("https://{}.s3.{}.amazonaws.com", self.bucket()?, self.region))
    }

    pub fn local_root(&self) -> Result<PathBuf> {
        self.endpoint
            .as_deref()
            .map(expand_path)
            .ok_or_else(|| Error::Configuration("storage.endpoint must name a directory when backend = \"local\"".to_string()))
    }

    pub fn cache_path(&self) -> PathBuf { expand_path(&self.cache_dir) }

    pub fn fetch_timeout(&self) -> Duration { Duration::from_secs(self.fetch_timeout_secs) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Local,
    Http,
    Fake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub model_dir: Option<String>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub dim: usize,
    pub max_len: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Local,
            model: "bge-m3".to_string(),
            model_dir: None,
            endpoint: None,
            api_key: None,
            dim: 1024,
            max_len: 256,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub endpoint: String,
    /// Model name as the endpoint knows it; no default since it depends
    /// entirely on what the server has loaded.
    pub model: Option<String>,
    pub api_key: Option<String>,
    /// Response ceiling; the word limit is enforced by instruction, not here.
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:1234".to_string(),
            model: None,
            api_key: None,
            max_tokens: 5000,
            timeout_secs: 120,
        }
    }
}

impl GenerationConfig {
    pub fn model(&self) -> Result<&str> {
        match self.model.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => Ok(m),
            _ => Err(Error::Configuration(
                "generation.model is not set (set generation.model or APP_GENERATION__MODEL)".to_string(),
            )),
        }
    }

    pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self { Self { top_k: 5 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub sign_off: String,
    pub feedback_answer_words: u32,
}

impl Default for PromptConfig {
    fn default() -> Self { Self { sign_off: "Shashi".to_string(), feedback_answer_words: 60 } }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub retrieval: RetrievalConfig,
    pub prompt: PromptConfig,
}

impl AppConfig {
    /// Load from the working directory, picking the env overlay from `RUST_ENV`.
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    pub fn load_from(base: &Path, env_name: &str) -> Result<Self> {
        Self::from_figment(layered_figment(base, env_name))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(Error::config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.storage.bucket()?;
        if self.storage.backend == StorageBackend::Local {
            self.storage.local_root()?;
        }
        if self.storage.index_prefix.trim().is_empty() {
            return Err(Error::Configuration("storage.index_prefix must not be empty".to_string()));
        }
        if self.embedding.provider == EmbeddingProvider::Http && self.embedding.endpoint.is_none() {
            return Err(Error::Configuration("embedding.endpoint is required when embedding.provider = \"http\"".to_string()));
        }
        if self.embedding.dim == 0 {
            return Err(Error::Configuration("embedding.dim must be positive".to_string()));
        }
        if self.generation.max_tokens == 0 {
            return Err(Error::Configuration("generation.max_tokens must be positive".to_string()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Configuration("retrieval.top_k must be at least 1".to_string()));
        }
        if self.prompt.feedback_answer_words == 0 {
            return Err(Error::Configuration("prompt.feedback_answer_words must be positive".to_string()));
        }
        Ok(())
    }
}

/// `config.toml`, then the env overlay, then environment variables.
pub fn layered_figment(base: &Path, env_name: &str) -> Figment {
    let mut figment = Figment::new().merge(Toml::file(base.join("config.toml")));
    match env_name {
        "dev" | "development" => figment = figment.merge(Toml::file(base.join("config.dev.toml"))),
        "prod" | "production" => figment = figment.merge(Toml::file(base.join("config.prod.toml"))),
        "test" | "testing" => figment = figment.merge(Toml::file(base.join("config.test.toml"))),
        _ => {}
    }
    figment
        .merge(Env::prefixed("APP_").split("__"))
        .merge(Env::raw().only(&["BUCKET_NAME", "AWS_REGION"]).map(|key| {
            if key.as_str().eq_ignore_ascii_case("BUCKET_NAME") {
                "storage.bucket".into()
            } else if key.as_str().eq_ignore_ascii_case("AWS_REGION") {
                "storage.region".into()
            } else {
                key.as_str().to_string().into()
            }
        }))
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
