//! Downstream transports used by the forwarders.
//!
//! # Responsibilities
//! - Define the seam between a forwarder and the drain it writes to
//! - Provide a TCP transport that reconnects with backoff
//!
//! # Design Decisions
//! - One transport per forwarder; no shared connection state
//! - A broken stream is dropped and reopened on the next attempt

use std::future::Future;
use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::config::schema::ForwarderConfig;
use crate::resilience::backoff::retry_delay;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<TransportError>,
    },
}

/// Something a forwarder can push rewritten bodies into.
pub trait Transport: Send + 'static {
    /// Deliver one payload body. Retries are the transport's business.
    fn transmit(&mut self, body: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Writes bodies to a TCP drain, reconnecting on failure.
#[derive(Debug)]
pub struct TcpTransport {
    config: ForwarderConfig,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(config: ForwarderConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn connect(config: &ForwarderConfig) -> Result<TcpStream, TransportError> {
        let timeout = Duration::from_millis(config.connect_timeout_ms);
        match tokio::time::timeout(timeout, TcpStream::connect(&config.destination)).await {
            Ok(stream) => {
                let stream = stream?;
                tracing::debug!(destination = %config.destination, "Connected to drain");
                Ok(stream)
            }
            Err(_) => Err(TransportError::ConnectTimeout {
                addr: config.destination.clone(),
                timeout,
            }),
        }
    }

    async fn attempt(&mut self, body: &[u8]) -> Result<(), TransportError> {
        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => Self::connect(&self.config).await?,
        };
        stream.write_all(body).await?;
        self.stream = Some(stream);
        Ok(())
    }
}

impl Transport for TcpTransport {
    async fn transmit(&mut self, body: &[u8]) -> Result<(), TransportError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.attempt(body).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= max_attempts => {
                    return Err(TransportError::Exhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = retry_delay(&self.config, attempt);
                    tracing::warn!(
                        destination = %self.config.destination,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Drain write failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn config(destination: String) -> ForwarderConfig {
        ForwarderConfig {
            destination,
            connect_timeout_ms: 500,
            max_attempts: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    #[tokio::test]
    async fn writes_bodies_over_one_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let reader = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        let mut transport = TcpTransport::new(config(addr.to_string()));
        transport.transmit(b"first ").await.unwrap();
        transport.transmit(b"second").await.unwrap();
        assert!(transport.is_connected());
        drop(transport);

        assert_eq!(reader.await.unwrap(), b"first second");
    }

    #[tokio::test]
    async fn unreachable_drain_exhausts_attempts() {
        // Bind then drop to get a port nothing listens on.
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();

        let mut transport = TcpTransport::new(config(addr.to_string()));
        match transport.transmit(b"body").await {
            Err(TransportError::Exhausted { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert!(!transport.is_connected());
    }
}
