use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;

use stylerag_core::traits::{ObjectMeta, ObjectStore};

/// Amazon S3 (or an S3-compatible endpoint) through the AWS SDK.
///
/// Credentials come from the standard AWS chain: environment, shared
/// profile, SSO, then instance/container metadata. The client is built on
/// first use so constructing the store never blocks on credential lookup.
pub struct S3ObjectStore {
    bucket: String,
    region: String,
    endpoint: Option<String>,
    client: OnceCell<Client>,
}

impl S3ObjectStore {
    /// `endpoint` switches to path-style addressing against a custom host
    /// such as MinIO or LocalStack.
    pub fn new(bucket: &str, region: &str, endpoint: Option<String>) -> Self {
        Self { bucket: bucket.to_string(), region: region.to_string(), endpoint, client: OnceCell::new() }
    }

    /// Use an already configured client.
    pub fn with_client(client: Client, bucket: &str) -> Self {
        Self { bucket: bucket.to_string(), region: String::new(), endpoint: None, client: OnceCell::new_with(Some(client)) }
    }

    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| async {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(self.region.clone()))
                    .load()
                    .await;
                let mut conf = aws_sdk_s3::config::Builder::from(&shared);
                if let Some(endpoint) = &self.endpoint {
                    conf = conf.endpoint_url(endpoint).force_path_style(true);
                }
                tracing::debug!(bucket = %self.bucket, region = %self.region, endpoint = ?self.endpoint, "s3 client ready");
                Client::from_conf(conf.build())
            })
            .await
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn describe(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("s3://{} ({})", self.bucket, endpoint),
            None => format!("s3://{}", self.bucket),
        }
    }

    async fn head(&self, key: &str) -> Result<ObjectMeta> {
        match self.client().await.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(out) => Ok(ObjectMeta { key: key.to_string(), size: out.content_length().and_then(|n| u64::try_from(n).ok()) }),
            Err(err) => {
                let missing = err.as_service_error().is_some_and(|e| e.is_not_found())
                    || err.raw_response().is_some_and(|r| r.status().as_u16() == 404);
                if missing { bail!("object '{}' does not exist in {}", key, self.describe()); }
                Err(anyhow!("HEAD {} failed: {}", key, DisplayErrorContext(&err)))
            }
        }
    }

    async fn get(&self, key: &str, dest: &Path) -> Result<u64> {
        let out = self
            .client()
            .await
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow!("GET {} failed: {}", key, DisplayErrorContext(&e)))?;
        let mut body = out.body;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = body.try_next().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}
