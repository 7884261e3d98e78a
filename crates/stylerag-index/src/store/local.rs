use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use stylerag_core::traits::{ObjectMeta, ObjectStore};

/// A directory standing in for a bucket; keys are file names under `root`.
pub struct LocalObjectStore { root: PathBuf }

impl LocalObjectStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self { Self { root: root.into() } }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn describe(&self) -> String { format!("file://{}", self.root.display()) }

    async fn head(&self, key: &str) -> Result<ObjectMeta> {
        let path = self.root.join(key);
        let meta = tokio::fs::metadata(&path).await.map_err(|e| anyhow!("object '{}' not found at {}: {}", key, path.display(), e))?;
        if !meta.is_file() { return Err(anyhow!("object '{}' at {} is not a file", key, path.display())); }
        Ok(ObjectMeta { key: key.to_string(), size: Some(meta.len()) })
    }

    async fn get(&self, key: &str, dest: &Path) -> Result<u64> {
        Ok(tokio::fs::copy(self.root.join(key), dest).await?)
    }
}
