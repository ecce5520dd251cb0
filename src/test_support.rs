//! Local stand-ins for proxies, upstream APIs and DoH servers used by unit tests

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::models::ProxyCandidate;
use crate::proxy::sources::ProxySource;

/// One canned HTTP response
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl StubResponse {
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.to_string(),
        }
    }

    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
        }
    }
}

/// Scripted HTTP server. Responses are served in order; the last one repeats.
pub struct StubServer {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Request heads received so far
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn spawn_stub(script: Vec<StubResponse>) -> StubServer {
    assert!(!script.is_empty());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let script = Arc::new(script);

    let server_hits = hits.clone();
    let server_requests = requests.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let hits = server_hits.clone();
            let requests = server_requests.clone();
            let script = script.clone();

            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    let n = match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    buf.extend_from_slice(&chunk[..n]);
                    if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }

                requests.lock().push(String::from_utf8_lossy(&buf).to_string());
                let idx = hits.fetch_add(1, Ordering::SeqCst).min(script.len() - 1);
                let response = &script[idx];
                let reason = if response.status == 200 { "OK" } else { "Stub" };
                let raw = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    response.status,
                    reason,
                    response.content_type,
                    response.body.len(),
                    response.body
                );
                let _ = stream.write_all(raw.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    StubServer {
        addr,
        hits,
        requests,
    }
}

/// Address nothing is listening on
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Proxy source returning a fixed candidate list
pub struct StaticSource {
    name: &'static str,
    candidates: Vec<ProxyCandidate>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(name: &'static str, candidates: Vec<ProxyCandidate>) -> Arc<Self> {
        Arc::new(Self {
            name,
            candidates,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProxySource for StaticSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch_candidates(&self) -> Vec<ProxyCandidate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.candidates.clone()
    }
}

/// Proxy source that panics, standing in for a misbehaving feed
pub struct PanickingSource;

#[async_trait]
impl ProxySource for PanickingSource {
    fn name(&self) -> &'static str {
        "panicking"
    }

    async fn fetch_candidates(&self) -> Vec<ProxyCandidate> {
        panic!("feed exploded");
    }
}
