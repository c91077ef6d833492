//! Payloads handed from ingress to the forwarders.

use bytes::Bytes;
use tokio::sync::oneshot;

/// One accepted request's rewritten body plus its completion rendezvous.
///
/// The request task owns the payload until it is enqueued; the forwarder
/// that dequeues it owns the body from then on and must call
/// [`Payload::complete`] once transmission has finished or been given up.
#[derive(Debug)]
pub struct Payload {
    pub source_addr: String,
    pub request_id: String,
    pub body: Bytes,
    completion: oneshot::Sender<()>,
}

impl Payload {
    /// Create a payload and the acknowledgement its submitter waits on.
    pub fn new(
        source_addr: impl Into<String>,
        request_id: impl Into<String>,
        body: impl Into<Bytes>,
    ) -> (Self, Acknowledgement) {
        let (tx, rx) = oneshot::channel();
        let payload = Self {
            source_addr: source_addr.into(),
            request_id: request_id.into(),
            body: body.into(),
            completion: tx,
        };
        (payload, Acknowledgement { rx })
    }

    /// Signal completion. Consumes the payload, so it fires at most once.
    pub fn complete(self) {
        // The submitter may have stopped waiting after its deadline.
        let _ = self.completion.send(());
    }
}

/// Why an acknowledgement never arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("payload dropped before completion")]
pub struct Abandoned;

/// Receiving half of a payload's completion signal.
#[derive(Debug)]
pub struct Acknowledgement {
    rx: oneshot::Receiver<()>,
}

impl Acknowledgement {
    /// Wait for the forwarder to complete the payload.
    ///
    /// Fails if the payload was dropped without completing.
    pub async fn wait(self) -> Result<(), Abandoned> {
        self.rx.await.map_err(|_| Abandoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completion_reaches_waiter() {
        let (payload, ack) = Payload::new("1.2.3.4", "req-1", &b"body"[..]);
        assert_eq!(payload.body, Bytes::from_static(b"body"));
        payload.complete();
        assert_eq!(ack.wait().await, Ok(()));
    }

    #[tokio::test]
    async fn dropped_payload_abandons_waiter() {
        let (payload, ack) = Payload::new("", "", Vec::new());
        drop(payload);
        assert_eq!(ack.wait().await, Err(Abandoned));
    }

    #[test]
    fn completing_without_waiter_is_harmless() {
        let (payload, ack) = Payload::new("", "", Vec::new());
        drop(ack);
        payload.complete();
    }
}
