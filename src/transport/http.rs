//! Streamable HTTP transport for MCP
//!
//! [`HttpTransport`] sends every outbound JSON-RPC message as an HTTP POST
//! and surfaces whatever comes back as transport events. The server may
//! reply with:
//!
//! - `application/json` -- one JSON object (one frame) or an array (one
//!   frame per element);
//! - `text/event-stream` -- an SSE body whose `data:` payloads decode to
//!   JSON objects;
//! - `202 Accepted` -- an acknowledgement with no body (used for
//!   notifications);
//! - any other status -- a non-fatal transport error carrying the status
//!   and body.
//!
//! Each POST runs on its own Tokio task, so concurrent sends never block
//! one another and responses complete in whatever order the server answers.
//!
//! # Session management
//!
//! An `mcp-session-id` header on any response is captured (header lookup is
//! case-insensitive) and attached to every subsequent request until the
//! transport closes. Closing issues a best-effort DELETE to terminate the
//! session server-side.
//!
//! The transport is ready immediately on construction; there is no
//! connection preamble, and an unreachable server surfaces through the
//! first request's error event.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::HttpRequestOptions;
use crate::error::{McpError, Result};
use crate::transport::{TransportEvent, TransportEvents};

/// The session header name, sent and matched case-insensitively.
const SESSION_HEADER: &str = "mcp-session-id";

/// Streamable HTTP transport.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use mcpkit::config::HttpRequestOptions;
/// use mcpkit::transport::http::HttpTransport;
///
/// let (transport, events) = HttpTransport::new(
///     url::Url::parse("http://localhost:3000/mcp").unwrap(),
///     HashMap::new(),
///     &HttpRequestOptions::default(),
/// ).unwrap();
/// # drop((transport, events));
/// ```
#[derive(Debug)]
pub struct HttpTransport {
    /// Underlying reqwest HTTP client; shared by all POST tasks.
    client: reqwest::Client,
    /// The MCP endpoint URL (POST target).
    endpoint: url::Url,
    /// Static extra headers merged into every request (e.g. Authorization).
    headers: HashMap<String, String>,
    /// Active session ID, captured from a response header.
    session_id: Arc<RwLock<Option<String>>>,
    /// Sender for transport events.
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    /// False once `close()` has run.
    connected: Arc<AtomicBool>,
}

impl HttpTransport {
    /// Construct a transport targeting `endpoint`.
    ///
    /// The `headers` map is merged into every outbound request; callers
    /// should inject bearer tokens or API keys here. No network I/O happens
    /// at construction; the `Ready` event is emitted immediately.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Config`] when the HTTP client cannot be built
    /// from the request options.
    pub fn new(
        endpoint: url::Url,
        headers: HashMap<String, String>,
        req_options: &HttpRequestOptions,
    ) -> Result<(Self, TransportEvents)> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_millis(req_options.timeout_ms));
        if let Some(connect_ms) = req_options.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(connect_ms));
        }
        let client = builder
            .build()
            .map_err(|e| McpError::Config(format!("http client: {e}")))?;

        let (event_tx, events) = mpsc::unbounded_channel();

        // No connection preamble: the transport is usable at once.
        let _ = event_tx.send(TransportEvent::Ready);

        Ok((
            Self {
                client,
                endpoint,
                headers,
                session_id: Arc::new(RwLock::new(None)),
                event_tx,
                connected: Arc::new(AtomicBool::new(true)),
            },
            events,
        ))
    }

    /// Send a message as an HTTP POST on an independent task.
    ///
    /// Returns as soon as the POST task is spawned; response frames and
    /// errors arrive asynchronously as transport events. Completion order
    /// of concurrent sends is whatever order the server answers in.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Transport`] when the transport is closed.
    pub fn send(&self, message: &Value) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(McpError::Transport("http transport closed".to_string()).into());
        }

        let body = serde_json::to_string(message).map_err(McpError::Serialization)?;
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let headers = self.headers.clone();
        let session_id = Arc::clone(&self.session_id);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let mut req = client
                .post(endpoint.as_str())
                .header("accept", "application/json, text/event-stream")
                .header("content-type", "application/json");

            let active_session = read_session(&session_id);
            if let Some(ref sid) = active_session {
                req = req.header(SESSION_HEADER, sid.as_str());
            }
            for (k, v) in &headers {
                req = req.header(k.as_str(), v.as_str());
            }

            let response = match req.body(body).send().await {
                Ok(r) => r,
                Err(e) => {
                    let _ = event_tx.send(TransportEvent::Error(format!("HTTP POST failed: {e}")));
                    return;
                }
            };

            // Capture the session ID from any response carrying the header.
            // reqwest header lookup is case-insensitive.
            if let Some(sid) = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
            {
                let mut guard = session_id.write().unwrap_or_else(PoisonError::into_inner);
                *guard = Some(sid);
            }

            let status = response.status();

            // 202 Accepted: notification acknowledgement, no content.
            if status == reqwest::StatusCode::ACCEPTED {
                return;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let _ = event_tx.send(TransportEvent::Error(format!(
                    "HTTP {status}: {body}"
                )));
                return;
            }

            let content_type = response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();

            let body = match response.text().await {
                Ok(b) => b,
                Err(e) => {
                    let _ = event_tx.send(TransportEvent::Error(format!(
                        "failed to read response body: {e}"
                    )));
                    return;
                }
            };

            if content_type.contains("text/event-stream") {
                for frame in parse_sse_body(&body) {
                    let _ = event_tx.send(TransportEvent::Message(frame));
                }
            } else {
                match serde_json::from_str::<Value>(&body) {
                    Ok(Value::Array(items)) => {
                        for item in items {
                            let _ = event_tx.send(TransportEvent::Message(item));
                        }
                    }
                    Ok(value @ Value::Object(_)) => {
                        let _ = event_tx.send(TransportEvent::Message(value));
                    }
                    Ok(other) => {
                        let _ = event_tx.send(TransportEvent::Error(format!(
                            "response body is not a JSON object or array: {other}"
                        )));
                    }
                    Err(e) if body.trim().is_empty() => {
                        tracing::debug!("empty response body on HTTP {status}: {e}");
                    }
                    Err(e) => {
                        let _ = event_tx.send(TransportEvent::Error(format!(
                            "undecodable response body: {e}"
                        )));
                    }
                }
            }
        });

        Ok(())
    }

    /// Shut the transport down.
    ///
    /// Marks the transport closed, emits the final `Closed` event, and
    /// issues a best-effort DELETE to terminate any active session.
    pub async fn close(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            let _ = self
                .event_tx
                .send(TransportEvent::Closed("closed".to_string()));

            if let Some(sid) = read_session(&self.session_id) {
                let client = self.client.clone();
                let endpoint = self.endpoint.clone();
                let headers = self.headers.clone();
                tokio::spawn(async move {
                    let mut req = client.delete(endpoint.as_str()).header(SESSION_HEADER, sid);
                    for (k, v) in &headers {
                        req = req.header(k.as_str(), v.as_str());
                    }
                    if let Err(e) = req.send().await {
                        tracing::debug!("session DELETE failed: {e}");
                    }
                });
            }
        }
    }

    /// Whether the transport is still accepting sends.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// The active session ID, when one has been captured.
    pub fn session_id(&self) -> Option<String> {
        read_session(&self.session_id)
    }
}

/// Read the session ID, recovering from poisoning.
fn read_session(session_id: &RwLock<Option<String>>) -> Option<String> {
    session_id
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

// ---------------------------------------------------------------------------
// SSE body parsing
// ---------------------------------------------------------------------------

/// Parse a complete SSE body into JSON frames.
///
/// Events are separated by blank lines. Within an event, every `data:`
/// payload line is collected (prefix stripped, one optional leading space
/// removed) and the payloads are joined with newlines before JSON decoding.
/// Events with no data, `event: ping` keepalives, and payloads that do not
/// decode to a JSON object are ignored.
pub fn parse_sse_body(body: &str) -> Vec<Value> {
    let normalized = body.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .filter_map(parse_sse_event)
        .collect()
}

/// Parse one SSE event block into a JSON frame, if it carries one.
fn parse_sse_event(block: &str) -> Option<Value> {
    let mut data_lines: Vec<&str> = Vec::new();
    let mut event_type: Option<&str> = None;

    for line in block.lines() {
        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.strip_prefix(' ').unwrap_or(value));
        } else if let Some(value) = line.strip_prefix("event:") {
            event_type = Some(value.trim());
        }
        // `id:` and `retry:` fields and `:` comments are ignored; whole-body
        // parsing has no use for resumption state.
    }

    // Keepalive events are dropped silently.
    if event_type.is_some_and(|t| t.eq_ignore_ascii_case("ping")) {
        return None;
    }

    if data_lines.is_empty() {
        return None;
    }
    let data = data_lines.join("\n");
    if data.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(&data) {
        Ok(value) if value.is_object() => Some(value),
        Ok(other) => {
            tracing::debug!("dropping non-object SSE payload: {other}");
            None
        }
        Err(e) => {
            tracing::debug!("dropping undecodable SSE payload: {e}");
            None
        }
    }
}
