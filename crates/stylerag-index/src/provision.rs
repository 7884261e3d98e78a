//! Fetches a style's artifact pair into the working directory and opens it.
//!
//! Opened handles are cached per `IndexId` for the life of the provisioner;
//! only `reprovision` refetches. Provisioning of one id is serialized by a
//! per-id async lock, and downloads land in temp files inside the cache
//! directory that are renamed into place only after both artifacts arrived,
//! so a reader never sees a half-written or mismatched pair.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use stylerag_core::config::StorageConfig;
use stylerag_core::error::{Error, Result};
use stylerag_core::traits::{Embedder, ObjectStore};
use stylerag_core::types::IndexId;

use crate::artifact::{METADATA_EXT, VECTOR_EXT};
use crate::handle::VectorIndexHandle;

pub struct IndexProvisioner {
    store: Arc<dyn ObjectStore>,
    embedder: Arc<dyn Embedder>,
    cache_dir: PathBuf,
    prefix: String,
    fetch_timeout: Duration,
    handles: Mutex<HashMap<IndexId, Arc<VectorIndexHandle>>>,
    locks: Mutex<HashMap<IndexId, Arc<Mutex<()>>>>,
}

impl IndexProvisioner {
    pub fn new(store: Arc<dyn ObjectStore>, embedder: Arc<dyn Embedder>, config: &StorageConfig) -> Self {
        Self::with_settings(store, embedder, config.cache_path(), &config.index_prefix, config.fetch_timeout())
    }

    pub fn with_settings(
        store: Arc<dyn ObjectStore>,
        embedder: Arc<dyn Embedder>,
        cache_dir: PathBuf,
        prefix: &str,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            embedder,
            cache_dir,
            prefix: prefix.to_string(),
            fetch_timeout,
            handles: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// `[vector blob, metadata]` object keys for an index.
    pub fn artifact_names(&self, id: &IndexId) -> [String; 2] {
        [id.artifact_name(&self.prefix, VECTOR_EXT), id.artifact_name(&self.prefix, METADATA_EXT)]
    }

    pub fn cache_dir(&self) -> &Path { &self.cache_dir }

    pub async fn cached(&self, id: &IndexId) -> Option<Arc<VectorIndexHandle>> {
        self.handles.lock().await.get(id).cloned()
    }

    /// Cached handle for `id`, provisioning it on first use.
    pub async fn open(&self, id: &IndexId) -> Result<Arc<VectorIndexHandle>> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;
        if let Some(handle) = self.cached(id).await {
            tracing::debug!(index = %id, "index cache hit");
            return Ok(handle);
        }
        let handle = Arc::new(self.fetch_and_load(id).await?);
        self.handles.lock().await.insert(id.clone(), handle.clone());
        Ok(handle)
    }

    /// Refetch and reload `id`, replacing the cached handle on success.
    /// A failed refresh leaves the previous handle in place.
    pub async fn reprovision(&self, id: &IndexId) -> Result<Arc<VectorIndexHandle>> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;
        let handle = Arc::new(self.fetch_and_load(id).await?);
        self.handles.lock().await.insert(id.clone(), handle.clone());
        Ok(handle)
    }

    async fn lock_for(&self, id: &IndexId) -> Arc<Mutex<()>> {
        self.locks.lock().await.entry(id.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    async fn fetch_and_load(&self, id: &IndexId) -> Result<VectorIndexHandle> {
        let started = Instant::now();
        let names = self.artifact_names(id);
        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| Error::provision(&names[0], format!("cannot create cache dir {}: {}", self.cache_dir.display(), e)))?;

        let mut staged = Vec::with_capacity(names.len());
        for name in &names {
            staged.push(self.fetch_one(name).await?);
        }
        let mut paths = Vec::with_capacity(names.len());
        for (name, tmp) in names.iter().zip(staged) {
            let dest = self.cache_dir.join(name);
            tmp.persist(&dest).map_err(|e| Error::provision(name, format!("cannot move into {}: {}", dest.display(), e.error)))?;
            paths.push(dest);
        }
        tracing::info!(index = %id, dir = %self.cache_dir.display(), ms = started.elapsed().as_millis() as u64, "artifacts downloaded");

        let handle = VectorIndexHandle::open(id.clone(), &paths[0], &paths[1], self.embedder.as_ref()).await?;
        tracing::info!(index = %id, fragments = handle.len(), "index loaded");
        Ok(handle)
    }

    /// Existence check, then download into a temp file in the cache dir.
    async fn fetch_one(&self, name: &str) -> Result<NamedTempFile> {
        let meta = tokio::time::timeout(self.fetch_timeout, self.store.head(name))
            .await
            .map_err(|_| Error::provision(name, format!("existence check timed out after {:?}", self.fetch_timeout)))?
            .map_err(|e| Error::provision(name, e))?;
        let tmp = tempfile::Builder::new()
            .prefix(".stylerag-")
            .suffix(".part")
            .tempfile_in(&self.cache_dir)
            .map_err(|e| Error::provision(name, e))?;
        let bytes = tokio::time::timeout(self.fetch_timeout, self.store.get(name, tmp.path()))
            .await
            .map_err(|_| Error::provision(name, format!("download timed out after {:?}", self.fetch_timeout)))?
            .map_err(|e| Error::provision(name, e))?;
        if let Some(expected) = meta.size {
            if expected != bytes {
                return Err(Error::provision(name, format!("expected {} bytes, received {}", expected, bytes)));
            }
        }
        tracing::debug!(artifact = name, bytes, store = %self.store.describe(), "artifact fetched");
        Ok(tmp)
    }
}
