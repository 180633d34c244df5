//! Shared fixtures: a mockito-backed Messages API and raw TCP servers for
//! behavior mockito cannot script (response sequences, silence, resets).

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mcp_assistant::config::{RetryConfig, TimeoutConfig};
use mcp_assistant::ClientConfig;
use mockito::{Mock, Server, ServerGuard};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};

pub const API_KEY: &str = "sk-test-key";

/// Client configuration pointed at `base_url` with millisecond retry delays.
pub fn test_config(base_url: &str, max_attempts: u32) -> ClientConfig {
    ClientConfig {
        base_url: base_url.trim_end_matches('/').to_string(),
        timeouts: TimeoutConfig {
            connect_timeout_ms: 2_000,
            socket_timeout_ms: 5_000,
            request_timeout_ms: 5_000,
        },
        retry: RetryConfig {
            max_attempts,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            multiplier: 2.0,
        },
        ..ClientConfig::default()
    }
}

pub fn text_response(texts: &[&str]) -> String {
    let content: Vec<_> = texts
        .iter()
        .map(|t| serde_json::json!({ "type": "text", "text": t }))
        .collect();
    serde_json::json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-5-sonnet-20241022",
        "content": content,
        "stop_reason": "end_turn",
        "usage": { "input_tokens": 10, "output_tokens": 20 }
    })
    .to_string()
}

/// Mock Messages API.
pub struct MockApi {
    pub server: ServerGuard,
}

impl MockApi {
    pub async fn new() -> Self {
        Self {
            server: Server::new_async().await,
        }
    }

    pub fn url(&self) -> String {
        self.server.url()
    }

    /// `POST /messages` answering `status`/`body`, expected `hits` times.
    pub async fn mock_messages(&mut self, status: usize, body: &str, hits: usize) -> Mock {
        self.server
            .mock("POST", "/messages")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }
}

/// Server that answers successive connections with the scripted responses,
/// repeating the last one. Returns its base URL and a connection counter.
pub async fn scripted_server(responses: Vec<(u16, String)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let (status, body) = responses
                .get(n)
                .or_else(|| responses.last())
                .cloned()
                .unwrap_or((500, String::new()));
            tokio::spawn(async move {
                read_request(&mut stream).await;
                let reply = format!(
                    "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(reply.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    (format!("http://{}", addr), hits)
}

/// Server that accepts connections and reads requests but never answers.
pub async fn silent_server() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        let mut held = Vec::new();
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            read_request(&mut stream).await;
            held.push(stream);
        }
    });

    (format!("http://{}", addr), hits)
}

/// Server that reads each request and then resets the connection.
pub async fn resetting_server() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            read_request(&mut stream).await;
            reset(stream);
        }
    });

    (format!("http://{}", addr), hits)
}

/// Close with SO_LINGER 0 so the peer sees an RST instead of a FIN.
#[allow(deprecated)]
fn reset(stream: TcpStream) {
    let _ = stream.set_linger(Some(Duration::ZERO));
    drop(stream);
}

/// Listener whose accept queue is full, so new connects hang in SYN_SENT.
///
/// Returns `None` when the host accepts connections past the backlog.
pub async fn saturated_listener() -> Option<(String, SaturatedListener)> {
    let socket = TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let listener = socket.listen(1).unwrap();
    let addr = listener.local_addr().unwrap();

    let mut fillers = Vec::new();
    for _ in 0..64 {
        match tokio::time::timeout(Duration::from_millis(200), TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => fillers.push(stream),
            Ok(Err(_)) => return None,
            Err(_) => {
                return Some((
                    format!("http://{}", addr),
                    SaturatedListener {
                        _listener: listener,
                        _fillers: fillers,
                    },
                ))
            }
        }
    }
    None
}

/// Keeps the listener and its queued connections alive.
pub struct SaturatedListener {
    _listener: TcpListener,
    _fillers: Vec<TcpStream>,
}

/// Base URL of a port nothing listens on.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn read_request(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let Ok(n) = stream.read(&mut chunk).await else {
            return;
        };
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find_header_end(&buf) {
            let body_len = content_length(&buf[..end]);
            if buf.len() >= end + 4 + body_len {
                return;
            }
        }
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(head: &[u8]) -> usize {
    String::from_utf8_lossy(head)
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse().ok()
            } else {
                None
            }
        })
        .unwrap_or(0)
}
