//! In-process fake transport for unit tests
//!
//! [`FakeTransport`] replaces real process or network I/O in tests. The
//! complementary [`FakeHandle`] plays the server:
//!
//! - Read what the client sent: `handle.outbound_rx.recv().await`
//! - Inject server frames: `handle.inject(json)` (a `Message` event)
//! - End the conversation: `handle.close("reason")` (the `Closed` event)
//!
//! The `Ready` event is emitted at construction, like the HTTP transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{McpError, Result};
use crate::transport::{TransportEvent, TransportEvents};

/// In-process fake transport for use in tests.
#[derive(Debug)]
pub struct FakeTransport {
    /// `send()` writes here; the handle drains it via `outbound_rx`.
    outbound_tx: mpsc::UnboundedSender<Value>,
    /// Event channel shared with the handle.
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    /// False once closed from either side.
    connected: Arc<AtomicBool>,
}

/// The test-side handle for a [`FakeTransport`].
#[derive(Debug)]
pub struct FakeHandle {
    /// Frames the client sent via `send`.
    pub outbound_rx: mpsc::UnboundedReceiver<Value>,
    /// Event channel into the client.
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    /// Shared connection flag.
    connected: Arc<AtomicBool>,
}

impl FakeTransport {
    /// Create a `(transport, handle, events)` triple.
    ///
    /// The events receiver already holds a `Ready` event.
    pub fn new() -> (Self, FakeHandle, TransportEvents) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(true));

        let _ = event_tx.send(TransportEvent::Ready);

        let transport = Self {
            outbound_tx,
            event_tx: event_tx.clone(),
            connected: Arc::clone(&connected),
        };
        let handle = FakeHandle {
            outbound_rx,
            event_tx,
            connected,
        };
        (transport, handle, events)
    }

    /// Record an outbound frame for the test to read.
    pub fn send(&self, message: &Value) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(McpError::Transport("fake transport closed".to_string()).into());
        }
        self.outbound_tx
            .send(message.clone())
            .map_err(|_| McpError::Transport("fake outbound channel closed".to_string()).into())
    }

    /// Close from the client side; emits the final `Closed` event.
    pub fn close(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            let _ = self
                .event_tx
                .send(TransportEvent::Closed("closed".to_string()));
        }
    }

    /// Whether the fake is still open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl FakeHandle {
    /// Inject a server frame as a `Message` event.
    pub fn inject(&self, frame: Value) {
        let _ = self.event_tx.send(TransportEvent::Message(frame));
    }

    /// Inject a non-fatal transport error.
    pub fn inject_error(&self, reason: &str) {
        let _ = self
            .event_tx
            .send(TransportEvent::Error(reason.to_string()));
    }

    /// Close from the server side with the given reason.
    pub fn close(&self, reason: &str) {
        if self.connected.swap(false, Ordering::SeqCst) {
            let _ = self
                .event_tx
                .send(TransportEvent::Closed(reason.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_ready_queued_at_construction() {
        let (_transport, _handle, mut events) = FakeTransport::new();
        assert!(matches!(events.try_recv(), Ok(TransportEvent::Ready)));
    }

    #[tokio::test]
    async fn test_send_reaches_handle() {
        let (transport, mut handle, _events) = FakeTransport::new();
        transport.send(&json!({"method": "ping"})).unwrap();
        let sent = handle.outbound_rx.recv().await.unwrap();
        assert_eq!(sent["method"], "ping");
    }

    #[tokio::test]
    async fn test_inject_surfaces_as_message_event() {
        let (_transport, handle, mut events) = FakeTransport::new();
        let _ = events.try_recv(); // Ready
        handle.inject(json!({"id": 1, "result": {}}));
        match events.try_recv().unwrap() {
            TransportEvent::Message(frame) => assert_eq!(frame["id"], 1),
            other => panic!("expected Message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_close_emits_closed_once_and_blocks_sends() {
        let (transport, handle, mut events) = FakeTransport::new();
        let _ = events.try_recv(); // Ready
        handle.close("server gone");
        handle.close("again");

        match events.try_recv().unwrap() {
            TransportEvent::Closed(reason) => assert_eq!(reason, "server gone"),
            other => panic!("expected Closed, got {other:?}"),
        }
        assert!(events.try_recv().is_err(), "exactly one Closed");
        assert!(transport.send(&json!({})).is_err());
    }
}
