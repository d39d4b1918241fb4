//! Shared utilities for integration testing: a scriptable upstream HTTP
//! server, a WebSocket controller, and a bridge launcher.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use ja3_bridge::config::BridgeConfig;
use ja3_bridge::executor::RequestExecutor;
use ja3_bridge::fingerprint::{Ja3ProfileBuilder, ProfileCache};
use ja3_bridge::{BridgeResult, Server, Shutdown};

pub const CHROME_JA3: &str =
    "771,4865-4866-4867-49195-49199-49196-49200,0-23-65281-10-11-35-16-5-13-18-51-45-43-27,29-23-24,0";

/// A request as seen by the upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What the upstream answers.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub delay: Duration,
}

impl MockResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Start an upstream on an ephemeral port that answers with `handler`.
pub async fn start_upstream<F>(handler: F) -> SocketAddr
where
    F: Fn(RecordedRequest) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let response = handler(request);
                        tokio::time::sleep(response.delay).await;

                        let mut head = format!("HTTP/1.1 {} Mock\r\n", response.status);
                        for (name, value) in &response.headers {
                            head.push_str(&format!("{}: {}\r\n", name, value));
                        }
                        head.push_str(&format!(
                            "Content-Length: {}\r\nConnection: close\r\n\r\n",
                            response.body.len()
                        ));
                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(&response.body).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Upstream that reports what it received as a JSON body.
pub async fn start_echo_upstream() -> SocketAddr {
    start_upstream(|req| {
        let headers: serde_json::Map<String, Value> = req
            .headers
            .iter()
            .map(|(n, v)| (n.to_ascii_lowercase(), Value::String(v.clone())))
            .collect();
        let body = json!({
            "method": req.method,
            "path": req.path,
            "headers": headers,
            "body": String::from_utf8_lossy(&req.body),
        });
        MockResponse::ok(body.to_string()).header("Content-Type", "application/json")
    })
    .await
}

/// Forward proxy that records each request line target and answers itself.
pub async fn start_forward_proxy(body: &'static str) -> (SocketAddr, mpsc::UnboundedReceiver<RecordedRequest>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let addr = start_upstream(move |req| {
        let _ = tx.send(req);
        MockResponse::ok(body).header("Via", "1.1 mock-proxy")
    })
    .await;
    (addr, rx)
}

/// Listener that only counts accepted connections.
pub async fn start_counting_listener() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((_socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    (addr, accepted)
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

/// WebSocket server playing the controlling application.
pub struct Controller {
    pub addr: SocketAddr,
    connections: mpsc::UnboundedReceiver<WebSocketStream<TcpStream>>,
}

pub async fn start_controller() -> Controller {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, connections) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            if let Ok(ws) = tokio_tungstenite::accept_async(socket).await {
                if tx.send(ws).is_err() {
                    break;
                }
            }
        }
    });

    Controller { addr, connections }
}

impl Controller {
    /// Wait for the bridge to connect.
    pub async fn accept(&mut self) -> ControllerConn {
        let ws = tokio::time::timeout(Duration::from_secs(5), self.connections.recv())
            .await
            .expect("bridge did not connect")
            .expect("controller listener stopped");
        ControllerConn { ws }
    }
}

/// One accepted bridge connection.
pub struct ControllerConn {
    ws: WebSocketStream<TcpStream>,
}

impl ControllerConn {
    pub async fn send(&mut self, frame: Value) {
        self.send_raw(&frame.to_string()).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws.send(Message::text(text.to_string())).await.unwrap();
    }

    /// Next JSON frame, failing the test after five seconds.
    pub async fn next_frame(&mut self) -> Value {
        self.try_next_frame(Duration::from_secs(5))
            .await
            .expect("no frame from bridge")
    }

    /// Next JSON frame, or `None` on timeout or close.
    pub async fn try_next_frame(&mut self, wait: Duration) -> Option<Value> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let msg = tokio::time::timeout_at(deadline, self.ws.next()).await.ok()??.ok()?;
            match msg {
                Message::Text(text) => return serde_json::from_str(text.as_str()).ok(),
                Message::Close(_) => return None,
                _ => {}
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}

/// Config pointing at `controller` with fast reconnects.
pub fn bridge_config(controller: SocketAddr) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.channel.host = controller.ip().to_string();
    config.channel.port = controller.port();
    config.reconnect.base_delay_ms = 20;
    config.reconnect.max_delay_ms = 200;
    config.executor.request_timeout_secs = 5;
    config.executor.connect_timeout_secs = 2;
    config
}

/// Run a bridge in the background.
pub fn spawn_bridge(config: BridgeConfig) -> (Shutdown, JoinHandle<BridgeResult<()>>) {
    let builder = Ja3ProfileBuilder::new(&config.fingerprints, config.executor.connect_timeout());
    let profiles = Arc::new(ProfileCache::new(Arc::new(builder)));
    let executor = Arc::new(RequestExecutor::new(profiles, &config.executor));
    let server = Server::new(config, executor);

    let shutdown = Shutdown::new();
    let handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { server.run(&shutdown).await })
    };
    (shutdown, handle)
}

/// A GET request frame using the Chrome-like profile.
pub fn request_frame(request_id: &str, url: &str) -> Value {
    json!({
        "requestId": request_id,
        "options": {
            "url": url,
            "method": "GET",
            "headers": {},
            "body": "",
            "ja3": CHROME_JA3,
            "proxy": ""
        }
    })
}
