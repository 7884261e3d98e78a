use anyhow::{Result, bail};
use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use stylerag_core::traits::{ObjectMeta, ObjectStore};

/// S3-compatible store reached over plain HTTP(S) `HEAD`/`GET`.
///
/// Objects live at `<base_url>/<key>`. Requests carry a bearer token when
/// one is configured, which covers presigning proxies and MinIO-style
/// gateways; public buckets need none.
pub struct HttpObjectStore {
    base_url: String,
    bucket: String,
    auth_token: Option<String>,
    client: Client,
}

impl HttpObjectStore {
    pub fn new(base_url: &str, bucket: &str, auth_token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), bucket: bucket.to_string(), auth_token, client })
    }

    fn url(&self, key: &str) -> String { format!("{}/{}", self.base_url, key) }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.auth_token { Some(token) => req.bearer_auth(token), None => req }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    fn describe(&self) -> String { format!("s3://{} ({})", self.bucket, self.base_url) }

    async fn head(&self, key: &str) -> Result<ObjectMeta> {
        let res = self.authorize(self.client.head(self.url(key))).send().await?;
        match res.status() {
            s if s.is_success() => {
                // the body of a HEAD response is empty, so read the header itself
                let size = res.headers().get(CONTENT_LENGTH).and_then(|v| v.to_str().ok()).and_then(|v| v.parse().ok());
                Ok(ObjectMeta { key: key.to_string(), size })
            }
            StatusCode::NOT_FOUND => bail!("object '{}' does not exist in {}", key, self.describe()),
            s => bail!("HEAD {} returned {}", key, s),
        }
    }

    async fn get(&self, key: &str, dest: &Path) -> Result<u64> {
        let mut res = self.authorize(self.client.get(self.url(key))).send().await?;
        if !res.status().is_success() { bail!("GET {} returned {}", key, res.status()); }
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = res.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}
