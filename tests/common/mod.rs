//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderValue, Request, Response};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tower::ServiceExt;

use logplex_gateway::config::{CredentialConfig, GatewayConfig};
use logplex_gateway::delivery::{outlet, ForwarderSet, OutletReceiver, Transport, TransportError};
use logplex_gateway::http::HttpServer;
use logplex_gateway::lifecycle::{InFlight, Shutdown};

pub const USER: &str = "user";
pub const SECRET: &str = "secret";
pub const OLD_USER: &str = "legacy";
pub const OLD_SECRET: &str = "old-secret";

/// Two frames as emitted by logplex. Each frame carries its trailing newline.
pub const TWO_FRAMES: &str = "64 <13>1 2013-06-07T13:17:49.468822+00:00 host heroku web.7 - - hi\n67 <13>1 2013-06-07T13:17:49.468822+00:00 host heroku web.7 - - hello\n";

/// `TWO_FRAMES` rewritten for a client at 1.2.3.4 with no query metadata.
pub const TWO_FRAMES_FIXED: &str = "84 <13>1 2013-06-07T13:17:49.468822+00:00 host heroku web.7 - [origin ip=\"1.2.3.4\"] hi\n87 <13>1 2013-06-07T13:17:49.468822+00:00 host heroku web.7 - [origin ip=\"1.2.3.4\"] hello\n";

/// Config with one current and one deprecated credential and fast timeouts.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.observability.metrics_enabled = false;
    config.metadata.id = "metadata@123".to_string();
    config.outlet.capacity = 8;
    config.outlet.deliver_timeout_ms = 300;
    config.listener.body_timeout_ms = 200;
    config.credentials.insert(
        USER.to_string(),
        CredentialConfig {
            secret: SECRET.to_string(),
            stage: "current".to_string(),
            deprecated: false,
        },
    );
    config.credentials.insert(
        OLD_USER.to_string(),
        CredentialConfig {
            secret: OLD_SECRET.to_string(),
            stage: "previous".to_string(),
            deprecated: true,
        },
    );
    config
}

pub fn basic_auth(user: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{secret}")))
}

/// A `POST /logs` request with valid auth and logplex content type.
pub fn post_logs(uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/logplex-1")
        .header("authorization", basic_auth(USER, SECRET))
        .header("x-forwarded-for", "1.2.3.4")
}

/// Overwrite `name` on an already built request instead of appending a value.
pub fn replace_header(mut request: Request<Body>, name: &'static str, value: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(name, HeaderValue::from_str(value).unwrap());
    request
}

/// Transport that records bodies in memory, optionally after a delay.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    pub bodies: Arc<Mutex<Vec<Vec<u8>>>>,
    pub delay: Duration,
}

impl RecordingTransport {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn bodies(&self) -> Vec<Vec<u8>> {
        self.bodies.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    async fn transmit(&mut self, body: &[u8]) -> Result<(), TransportError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.bodies.lock().unwrap().push(body.to_vec());
        Ok(())
    }
}

/// A gateway wired to in-memory forwarders, driven without a socket.
pub struct Harness {
    pub server: HttpServer,
    pub router: Router,
    pub shutdown: Shutdown,
    pub inflight: InFlight,
    pub transport: RecordingTransport,
    pub forwarders: Option<ForwarderSet>,
    /// Present when no forwarders were started, so the outlet stays open.
    pub receiver: Option<OutletReceiver>,
}

impl Harness {
    pub fn new(config: GatewayConfig, transport: RecordingTransport) -> Self {
        Self::build(config, Some(transport))
    }

    /// No forwarders: nothing ever leaves the outlet.
    pub fn stalled(config: GatewayConfig) -> Self {
        Self::build(config, None)
    }

    fn build(config: GatewayConfig, transport: Option<RecordingTransport>) -> Self {
        let shutdown = Shutdown::new();
        let inflight = InFlight::new();
        let (tx, rx) = outlet(config.outlet.capacity);

        let (forwarders, receiver, transport) = match transport {
            Some(t) => {
                let worker_transport = t.clone();
                let set = ForwarderSet::start(config.outlet.forwarders, rx, move |_| {
                    worker_transport.clone()
                });
                (Some(set), None, t)
            }
            None => (None, Some(rx), RecordingTransport::default()),
        };

        let server = HttpServer::new(&config, tx, shutdown.clone(), inflight.clone());
        let router = server.router();
        Self {
            server,
            router,
            shutdown,
            inflight,
            transport,
            forwarders,
            receiver,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Start a drain that accepts connections and collects everything written.
pub async fn start_mock_drain() -> (SocketAddr, Arc<Mutex<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let sink = Arc::clone(&sink);
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        loop {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => sink.lock().unwrap().extend_from_slice(&buf[..n]),
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, received)
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn eventually<F: Fn() -> bool>(timeout: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
