use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use stylerag_core::traits::Embedder;
use stylerag_embed::HttpEmbedder;

/// Serve one canned JSON response and hand back the raw request.
async fn stub(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = sock.read(&mut chunk).await.unwrap();
            if n == 0 { break; }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap_or(0)))
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length { break; }
            }
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let _ = sock.write_all(response.as_bytes()).await;
        let _ = sock.shutdown().await;
    });
    (format!("http://{}", addr), rx)
}

fn embedder(url: &str, key: Option<&str>) -> HttpEmbedder {
    HttpEmbedder::new(url, "bge-m3", 2, key.map(str::to_string), Duration::from_secs(5)).unwrap()
}

fn texts(items: &[&str]) -> Vec<String> { items.iter().map(|s| s.to_string()).collect() }

#[tokio::test]
async fn posts_inputs_and_orders_rows_by_index() {
    let body = r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#;
    let (url, seen) = stub("200 OK", body).await;

    let out = embedder(&url, Some("emb-key")).embed_batch(&texts(&["lunch friday", "quarterly report"])).await.unwrap();
    assert_eq!(out, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);

    let raw = seen.await.unwrap();
    assert!(raw.starts_with("POST /v1/embeddings"));
    assert!(raw.to_ascii_lowercase().contains("authorization: bearer emb-key"));
    assert!(raw.contains("\"model\":\"bge-m3\""));
    assert!(raw.contains("quarterly report"));
}

#[tokio::test]
async fn non_success_status_carries_status_and_body() {
    let (url, _seen) = stub("500 Internal Server Error", r#"{"error":"model not loaded"}"#).await;

    let err = embedder(&url, None).embed_batch(&texts(&["hello"])).await.unwrap_err().to_string();
    assert!(err.contains("500"), "{err}");
    assert!(err.contains("model not loaded"), "{err}");
}

#[tokio::test]
async fn fewer_vectors_than_inputs_is_an_error() {
    let (url, _seen) = stub("200 OK", r#"{"data":[{"index":0,"embedding":[1.0,0.0]}]}"#).await;

    let err = embedder(&url, None).embed_batch(&texts(&["one", "two"])).await.unwrap_err().to_string();
    assert!(err.contains("1 vectors for 2 inputs"), "{err}");
}

#[tokio::test]
async fn no_auth_header_without_api_key() {
    let (url, seen) = stub("200 OK", r#"{"data":[{"embedding":[0.6,0.8]}]}"#).await;

    embedder(&url, None).embed_batch(&texts(&["hi"])).await.unwrap();
    assert!(!seen.await.unwrap().to_ascii_lowercase().contains("authorization:"));
}
