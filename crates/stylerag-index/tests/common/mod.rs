#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use stylerag_core::traits::{ObjectMeta, ObjectStore};
use stylerag_core::types::Meta;
use stylerag_embed::FakeEmbedder;
use stylerag_index::artifact::{encode, ArtifactSet, StoredFragment};
use stylerag_index::store::LocalObjectStore;

pub const DIM: usize = 64;
pub const PREFIX: &str = "my_faiss";

pub fn fake_embedder() -> Arc<FakeEmbedder> { Arc::new(FakeEmbedder::new(DIM)) }

pub fn artifact_set(model: &str, contents: &[&str]) -> ArtifactSet {
    let embedder = FakeEmbedder::new(DIM);
    let mut vectors = Vec::new();
    let mut fragments = Vec::new();
    for (i, text) in contents.iter().enumerate() {
        vectors.extend(embedder.embed_text(text));
        let mut metadata = Meta::new();
        metadata.insert("source".to_string(), format!("doc{}.txt", i));
        fragments.push(StoredFragment { id: format!("frag:{}", i), content: text.to_string(), metadata });
    }
    ArtifactSet { model: model.to_string(), dim: DIM, vectors, fragments }
}

/// Publish an artifact pair for `token` into a bucket directory.
pub fn publish(bucket: &Path, token: &str, set: &ArtifactSet) {
    let (blob, meta) = encode(set).expect("encode");
    std::fs::write(bucket.join(format!("{}_{}.vec", PREFIX, token)), blob).expect("write vec");
    std::fs::write(bucket.join(format!("{}_{}.json", PREFIX, token)), meta).expect("write json");
}

/// Local store that counts downloads and can be slowed down.
pub struct CountingStore {
    inner: LocalObjectStore,
    gets: AtomicUsize,
    delay: Option<Duration>,
}

impl CountingStore {
    pub fn new(root: &Path) -> Self { Self { inner: LocalObjectStore::new(root), gets: AtomicUsize::new(0), delay: None } }
    pub fn slow(root: &Path, delay: Duration) -> Self { Self { delay: Some(delay), ..Self::new(root) } }
    pub fn get_count(&self) -> usize { self.gets.load(Ordering::SeqCst) }
}

#[async_trait]
impl ObjectStore for CountingStore {
    fn describe(&self) -> String { self.inner.describe() }

    async fn head(&self, key: &str) -> anyhow::Result<ObjectMeta> { self.inner.head(key).await }

    async fn get(&self, key: &str, dest: &Path) -> anyhow::Result<u64> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay { tokio::time::sleep(d).await; }
        self.inner.get(key, dest).await
    }
}

/// One canned response per accepted connection.
pub struct Reply { status: &'static str, length: usize, body: Vec<u8> }

impl Reply {
    pub fn body(status: &'static str, body: &[u8]) -> Self { Self { status, length: body.len(), body: body.to_vec() } }
    /// Headers only, advertising `length` bytes the way a `HEAD` answer does.
    pub fn head(status: &'static str, length: usize) -> Self { Self { status, length, body: Vec::new() } }
}

pub type Seen = Arc<std::sync::Mutex<Vec<String>>>;

/// Answer connections in order with `replies`, recording each raw request.
pub async fn serve(replies: Vec<Reply>) -> (String, Seen) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: Seen = Arc::default();
    let log = seen.clone();
    tokio::spawn(async move {
        for reply in replies {
            let (mut sock, _) = listener.accept().await.unwrap();
            let request = read_request(&mut sock).await;
            log.lock().unwrap().push(request);
            let head = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/octet-stream\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                reply.status, reply.length
            );
            let _ = sock.write_all(head.as_bytes()).await;
            let _ = sock.write_all(&reply.body).await;
            let _ = sock.shutdown().await;
        }
    });
    (format!("http://{}", addr), seen)
}

async fn read_request(sock: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = sock.read(&mut chunk).await.unwrap();
        if n == 0 { break; }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = String::from_utf8_lossy(&buf).find("\r\n\r\n") {
            let length = String::from_utf8_lossy(&buf[..end])
                .lines()
                .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap_or(0)))
                .unwrap_or(0);
            if buf.len() >= end + 4 + length { break; }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
