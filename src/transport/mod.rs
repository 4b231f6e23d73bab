//! MCP transports and the transport event contract
//!
//! Two wire transports exist and the set is closed, so [`Transport`] is a
//! tagged enum rather than a trait object:
//!
//! - [`stdio::StdioTransport`] -- spawns a server subprocess and exchanges
//!   newline-delimited JSON over its stdin/stdout pipes.
//! - [`http::HttpTransport`] -- Streamable HTTP: every outbound message is
//!   an HTTP POST; responses arrive as JSON or SSE bodies.
//! - [`fake::FakeTransport`] -- in-process scripted transport used in tests
//!   (cfg(test) only).
//!
//! # Event contract
//!
//! Each transport constructor returns the transport paired with an
//! [`mpsc::UnboundedReceiver`] of [`TransportEvent`]s. The owning
//! connection receives, in order:
//!
//! 1. [`TransportEvent::Ready`] exactly once, before any other event;
//! 2. [`TransportEvent::Message`] for each inbound JSON object;
//! 3. [`TransportEvent::Error`] for non-fatal issues, at any point;
//! 4. [`TransportEvent::Closed`] exactly once, last. Bytes still buffered
//!    at close are flushed as `Message` events first; nothing follows
//!    `Closed`.
//!
//! `send` accepts a decoded message value and reports local delivery
//! synchronously; the actual wire write may complete asynchronously.

use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::TransportConfig;
use crate::error::Result;

pub mod http;
pub mod stdio;

#[cfg(test)]
pub mod fake;

/// An asynchronous event surfaced by a transport to its owning connection.
#[derive(Debug)]
pub enum TransportEvent {
    /// The transport can accept sends. Emitted exactly once, first.
    Ready,
    /// One inbound JSON-RPC frame.
    Message(Value),
    /// A non-fatal transport issue (an HTTP error status, a dropped POST).
    Error(String),
    /// The transport has ended; the reason is `"normal"` for a clean
    /// subprocess exit, the numeric exit status otherwise, or a short
    /// description for other causes. Emitted exactly once, last.
    Closed(String),
}

/// The receiver half a connection consumes transport events from.
pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

/// A wire transport for one MCP peer.
///
/// The two real variants are constructed from a [`TransportConfig`] via
/// [`Transport::start`]; tests construct the fake variant directly.
#[derive(Debug)]
pub enum Transport {
    /// Subprocess stdio transport.
    Stdio(stdio::StdioTransport),
    /// Streamable HTTP transport.
    Http(http::HttpTransport),
    /// In-process scripted transport for tests.
    #[cfg(test)]
    Fake(fake::FakeTransport),
}

impl Transport {
    /// Start a transport described by `config`.
    ///
    /// For stdio this spawns the server subprocess; for HTTP it builds the
    /// client and is immediately ready. Either way the returned receiver
    /// will carry a [`TransportEvent::Ready`] before anything else.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::McpError::Spawn`] when a stdio server cannot
    /// be spawned, or [`crate::error::McpError::Config`] for an invalid
    /// HTTP configuration.
    pub fn start(config: &TransportConfig) -> Result<(Self, TransportEvents)> {
        match config {
            TransportConfig::Stdio {
                command,
                args,
                env,
                cd,
                max_frame_bytes,
            } => {
                let (transport, events) = stdio::StdioTransport::spawn_with_frame_cap(
                    command,
                    args.clone(),
                    env.clone(),
                    cd.clone(),
                    *max_frame_bytes,
                )?;
                Ok((Transport::Stdio(transport), events))
            }
            TransportConfig::Http {
                url,
                headers,
                req_options,
            } => {
                let (transport, events) =
                    http::HttpTransport::new(url.clone(), headers.clone(), req_options)?;
                Ok((Transport::Http(transport), events))
            }
        }
    }

    /// Hand a message to the transport for wire delivery.
    ///
    /// Returns as soon as the message is accepted locally; the wire write
    /// may still be in flight.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::McpError::Transport`] when the transport has
    /// already closed.
    pub async fn send(&self, message: &Value) -> Result<()> {
        match self {
            Transport::Stdio(t) => t.send(message),
            Transport::Http(t) => t.send(message),
            #[cfg(test)]
            Transport::Fake(t) => t.send(message),
        }
    }

    /// Shut the transport down.
    ///
    /// Idempotent. The event stream ends with a single
    /// [`TransportEvent::Closed`], preceded by any still-buffered messages.
    pub async fn close(&self) {
        match self {
            Transport::Stdio(t) => t.close().await,
            Transport::Http(t) => t.close().await,
            #[cfg(test)]
            Transport::Fake(t) => t.close(),
        }
    }

    /// Whether the transport is still able to carry messages.
    pub fn is_connected(&self) -> bool {
        match self {
            Transport::Stdio(t) => t.is_connected(),
            Transport::Http(t) => t.is_connected(),
            #[cfg(test)]
            Transport::Fake(t) => t.is_connected(),
        }
    }
}
