//! Per-peer connection state machine
//!
//! A [`Connection`] owns one transport and one request tracker and drives
//! the MCP lifecycle: transport startup, the `initialize` /
//! `notifications/initialized` handshake, request/response correlation, and
//! teardown.
//!
//! # Actor model
//!
//! All inbound activity is processed by a single background task that owns
//! the transport's event receiver. Because that task reacts to one event at
//! a time, no lock is ever contended over the state machine itself; the
//! recorded server identity, capabilities, and status are published through
//! watch/`RwLock` cells that only the actor writes.
//!
//! Caller requests do not pass through the actor: `request` registers a
//! waiter with the concurrent-safe tracker, hands the encoded frame to the
//! transport, and suspends on its own one-shot channel. The actor completes
//! the waiter when the matching response frame arrives.
//!
//! # Server-initiated traffic
//!
//! Inbound server requests are auto-answered: `ping` with `{}`,
//! `roots/list` with an empty root list, and everything else -- including
//! `sampling/createMessage`, which this client never services -- with a
//! method-not-found error. Server notifications are forwarded to the
//! configured handler in arrival order.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::capabilities::extract_initialize_result;
use crate::codec::{self, Inbound};
use crate::config::ConnectionConfig;
use crate::error::{McpError, Result, RpcError};
use crate::messages;
use crate::tracker::{RequestTracker, RpcOutcome, StatsSnapshot};
use crate::transport::{Transport, TransportEvent, TransportEvents};
use crate::types::{
    CallToolResult, ClientCapabilities, CompleteArgument, CompleteRef, CompleteResult,
    GetPromptResult, Implementation, ListPromptsResult, ListResourceTemplatesResult,
    ListResourcesResult, ListToolsResult, LoggingLevel, Prompt, PromptArguments,
    ReadResourceResult, Resource, ResourceContents, ResourceTemplate, ServerCapabilities, Tool,
    LATEST_PROTOCOL_VERSION, METHOD_INITIALIZE, METHOD_PING, METHOD_ROOTS_LIST,
    METHOD_SAMPLING_CREATE_MESSAGE,
};

/// Deadline for the `initialize` request. Longer than the default call
/// timeout because subprocess servers can be slow to start.
pub const INITIALIZE_TIMEOUT: Duration = Duration::from_secs(60);

/// Lifecycle states of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Not connected; terminal after a disconnect or fatal failure.
    Disconnected,
    /// Transport is starting up.
    Connecting,
    /// Transport is up; the handshake is in flight.
    Initializing,
    /// Handshake complete; requests are accepted.
    Ready,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Initializing => "initializing",
            ConnectionStatus::Ready => "ready",
        };
        write!(f, "{name}")
    }
}

/// Callback for server notifications: `(method, params)`.
///
/// Called from the connection's actor task in arrival order; long-running
/// work should be handed off to its own task.
pub type NotificationHandler = Arc<dyn Fn(&str, Value) + Send + Sync + 'static>;

/// State published by the actor and read by accessors.
#[derive(Debug)]
struct Shared {
    status_tx: watch::Sender<ConnectionStatus>,
    server_info: RwLock<Option<Implementation>>,
    server_capabilities: RwLock<Option<ServerCapabilities>>,
    protocol_version: RwLock<Option<String>>,
    fail_reason: RwLock<Option<String>>,
    /// Set on explicit disconnect and fatal failure; no state can follow.
    terminal: AtomicBool,
}

impl Shared {
    fn status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    fn set_status(&self, status: ConnectionStatus) {
        // Terminal means terminal: once disconnected for good, no racing
        // transition may resurrect the connection.
        if self.terminal.load(Ordering::SeqCst) && status != ConnectionStatus::Disconnected {
            return;
        }
        self.status_tx.send_replace(status);
    }

    fn record_fail_reason(&self, reason: &str) {
        let mut guard = self
            .fail_reason
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            *guard = Some(reason.to_string());
        }
    }

    fn fail_reason(&self) -> Option<String> {
        self.fail_reason
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn read_cell<T: Clone>(cell: &RwLock<Option<T>>) -> Option<T> {
    cell.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn write_cell<T>(cell: &RwLock<Option<T>>, value: T) {
    *cell.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
}

/// One MCP connection: transport + tracker + state machine.
///
/// # Examples
///
/// ```no_run
/// use mcpkit::config::{ConnectionConfig, TransportConfig};
/// use mcpkit::connection::Connection;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let config = ConnectionConfig::new(TransportConfig::stdio("my-mcp-server"));
/// let conn = Connection::connect(config).await?;
/// let tools = conn.list_tools().await?;
/// println!("{} tools", tools.len());
/// conn.disconnect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Connection {
    transport: Arc<Transport>,
    tracker: Arc<RequestTracker>,
    shared: Arc<Shared>,
    default_timeout: Duration,
    cancel: CancellationToken,
}

impl Connection {
    /// Establish a connection and complete the MCP handshake.
    ///
    /// Starts the configured transport, performs the `initialize` /
    /// `notifications/initialized` exchange, and returns once the
    /// connection is `ready`.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Spawn`] or [`McpError::Config`] for transport
    /// startup failures, and [`McpError::Handshake`] when the handshake
    /// fails or the transport closes before it completes. Handshake failure
    /// is fatal: the connection is not retried internally.
    pub async fn connect(config: ConnectionConfig) -> Result<Self> {
        Self::connect_with_handler(config, None).await
    }

    /// Like [`Connection::connect`], with a handler for server
    /// notifications.
    pub async fn connect_with_handler(
        config: ConnectionConfig,
        handler: Option<NotificationHandler>,
    ) -> Result<Self> {
        config.validate()?;
        let (transport, events) = Transport::start(&config.transport)?;
        Self::establish(
            transport,
            events,
            config.client_info.clone(),
            config.capabilities.clone(),
            config.timeout(),
            handler,
        )
        .await
    }

    /// Drive an already-started transport through the handshake.
    pub(crate) async fn establish(
        transport: Transport,
        events: TransportEvents,
        client_info: Implementation,
        capabilities: ClientCapabilities,
        default_timeout: Duration,
        handler: Option<NotificationHandler>,
    ) -> Result<Self> {
        let (status_tx, mut status_rx) = watch::channel(ConnectionStatus::Connecting);
        let shared = Arc::new(Shared {
            status_tx,
            server_info: RwLock::new(None),
            server_capabilities: RwLock::new(None),
            protocol_version: RwLock::new(None),
            fail_reason: RwLock::new(None),
            terminal: AtomicBool::new(false),
        });
        let transport = Arc::new(transport);
        let tracker = Arc::new(RequestTracker::new());
        let cancel = CancellationToken::new();

        let actor = Actor {
            events,
            transport: Arc::clone(&transport),
            tracker: Arc::clone(&tracker),
            shared: Arc::clone(&shared),
            handler,
            client_info,
            capabilities,
            cancel: cancel.clone(),
        };
        tokio::spawn(actor.run());

        // Wait for the handshake to settle either way.
        loop {
            let status = *status_rx.borrow_and_update();
            match status {
                ConnectionStatus::Ready => break,
                ConnectionStatus::Disconnected => {
                    let reason = shared
                        .fail_reason()
                        .unwrap_or_else(|| "connection closed during handshake".to_string());
                    return Err(McpError::Handshake(reason).into());
                }
                ConnectionStatus::Connecting | ConnectionStatus::Initializing => {
                    if status_rx.changed().await.is_err() {
                        return Err(
                            McpError::Handshake("connection task exited".to_string()).into()
                        );
                    }
                }
            }
        }

        Ok(Self {
            transport,
            tracker,
            shared,
            default_timeout,
            cancel,
        })
    }

    /// Issue a request and await its outcome.
    ///
    /// Allocates the next request id, registers a waiter with the given
    /// timeout (the connection default when `None`), submits the encoded
    /// frame, and suspends until exactly one outcome arrives: the server's
    /// result, the server's error unchanged, a timeout (`-32001`), or a
    /// connection closure (`-32000`). Dropping the returned future cancels
    /// the request (`cancel` on the tracker plus a best-effort
    /// `notifications/cancelled` on the wire).
    ///
    /// # Errors
    ///
    /// Returns [`McpError::NotReady`] immediately when the connection is
    /// not `ready`, naming the current state; otherwise [`McpError::Rpc`]
    /// carrying the outcome's error.
    pub async fn request(
        &self,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let status = self.status();
        if status != ConnectionStatus::Ready {
            return Err(McpError::NotReady(status.to_string()).into());
        }

        let id = self.tracker.next_id();
        let (tx, rx) = oneshot::channel();
        self.tracker
            .track(id, method, tx, timeout.unwrap_or(self.default_timeout));

        // Armed before the send so a caller dropped mid-send still converts
        // to a tracker cancellation.
        let mut guard = CancelGuard {
            tracker: Arc::clone(&self.tracker),
            transport: Arc::clone(&self.transport),
            id,
            armed: true,
        };

        let message = codec::encode_request(id, method, params);
        if let Err(e) = self.transport.send(&message).await {
            // Never delivered; the entry must not linger until its timer.
            guard.armed = false;
            self.tracker.fail(id);
            return Err(e);
        }

        let outcome = rx.await;
        guard.armed = false;

        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(rpc)) => Err(McpError::Rpc(rpc).into()),
            Err(_) => {
                Err(McpError::Transport("reply channel dropped before a response".to_string())
                    .into())
            }
        }
    }

    /// Send a one-way notification.
    ///
    /// Returns as soon as the transport accepts the frame locally.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::NotReady`] when the connection is not `ready`.
    pub async fn notify(&self, method: &str, params: Value) -> Result<()> {
        let status = self.status();
        if status != ConnectionStatus::Ready {
            return Err(McpError::NotReady(status.to_string()).into());
        }
        self.transport
            .send(&codec::encode_notification(method, params))
            .await
    }

    /// Tear the connection down. Terminal and idempotent.
    ///
    /// Every outstanding request fails with a connection-closed error;
    /// subsequent calls fail with a not-ready error naming the
    /// `disconnected` state.
    pub async fn disconnect(&self) {
        self.shared.terminal.store(true, Ordering::SeqCst);
        self.shared.record_fail_reason("disconnect");
        self.shared.set_status(ConnectionStatus::Disconnected);
        self.cancel.cancel();
        self.transport.close().await;
        deliver_connection_closed(&self.tracker, "disconnect");
    }

    /// The current lifecycle state.
    pub fn status(&self) -> ConnectionStatus {
        self.shared.status()
    }

    /// Whether the transport still carries messages.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// The server identity recorded at handshake completion.
    pub fn server_info(&self) -> Option<Implementation> {
        read_cell(&self.shared.server_info)
    }

    /// The server capability map recorded at handshake completion.
    pub fn server_capabilities(&self) -> Option<ServerCapabilities> {
        read_cell(&self.shared.server_capabilities)
    }

    /// The protocol version the server chose.
    pub fn protocol_version(&self) -> Option<String> {
        read_cell(&self.shared.protocol_version)
    }

    /// Number of requests currently in flight.
    pub fn pending_count(&self) -> usize {
        self.tracker.pending_count()
    }

    /// Lifetime tracker counters.
    pub fn tracker_stats(&self) -> StatsSnapshot {
        self.tracker.stats()
    }

    // -- typed wrappers -----------------------------------------------------

    /// Send a keepalive `ping`.
    pub async fn ping(&self) -> Result<()> {
        let (method, params) = messages::ping();
        self.request(method, params, None).await?;
        Ok(())
    }

    /// List all tools, following cursor pagination to completion.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let (method, params) = messages::tools_list(cursor.as_deref());
            let result = self.request(method, params, None).await?;
            let page: ListToolsResult =
                serde_json::from_value(result).map_err(McpError::Serialization)?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(c) if !c.is_empty() => cursor = Some(c),
                _ => break,
            }
        }
        Ok(tools)
    }

    /// Invoke a named tool.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<CallToolResult> {
        let (method, params) = messages::tools_call(name, arguments);
        let result = self.request(method, params, None).await?;
        serde_json::from_value(result).map_err(|e| McpError::Serialization(e).into())
    }

    /// List all resources, following cursor pagination to completion.
    pub async fn list_resources(&self) -> Result<Vec<Resource>> {
        let mut resources = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let (method, params) = messages::resources_list(cursor.as_deref());
            let result = self.request(method, params, None).await?;
            let page: ListResourcesResult =
                serde_json::from_value(result).map_err(McpError::Serialization)?;
            resources.extend(page.resources);
            match page.next_cursor {
                Some(c) if !c.is_empty() => cursor = Some(c),
                _ => break,
            }
        }
        Ok(resources)
    }

    /// List all resource templates, following cursor pagination to completion.
    pub async fn list_resource_templates(&self) -> Result<Vec<ResourceTemplate>> {
        let mut templates = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let (method, params) = messages::resources_templates_list(cursor.as_deref());
            let result = self.request(method, params, None).await?;
            let page: ListResourceTemplatesResult =
                serde_json::from_value(result).map_err(McpError::Serialization)?;
            templates.extend(page.resource_templates);
            match page.next_cursor {
                Some(c) if !c.is_empty() => cursor = Some(c),
                _ => break,
            }
        }
        Ok(templates)
    }

    /// Read a resource by URI.
    pub async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContents>> {
        let (method, params) = messages::resources_read(uri);
        let result = self.request(method, params, None).await?;
        let result: ReadResourceResult =
            serde_json::from_value(result).map_err(McpError::Serialization)?;
        Ok(result.contents)
    }

    /// Subscribe to updates for a resource URI.
    pub async fn subscribe_resource(&self, uri: &str) -> Result<()> {
        let (method, params) = messages::resources_subscribe(uri);
        self.request(method, params, None).await?;
        Ok(())
    }

    /// Unsubscribe from a resource URI.
    pub async fn unsubscribe_resource(&self, uri: &str) -> Result<()> {
        let (method, params) = messages::resources_unsubscribe(uri);
        self.request(method, params, None).await?;
        Ok(())
    }

    /// List all prompts, following cursor pagination to completion.
    pub async fn list_prompts(&self) -> Result<Vec<Prompt>> {
        let mut prompts = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let (method, params) = messages::prompts_list(cursor.as_deref());
            let result = self.request(method, params, None).await?;
            let page: ListPromptsResult =
                serde_json::from_value(result).map_err(McpError::Serialization)?;
            prompts.extend(page.prompts);
            match page.next_cursor {
                Some(c) if !c.is_empty() => cursor = Some(c),
                _ => break,
            }
        }
        Ok(prompts)
    }

    /// Retrieve a rendered prompt by name.
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<&PromptArguments>,
    ) -> Result<GetPromptResult> {
        let (method, params) = messages::prompts_get(name, arguments);
        let result = self.request(method, params, None).await?;
        serde_json::from_value(result).map_err(|e| McpError::Serialization(e).into())
    }

    /// Set the server-side logging verbosity.
    pub async fn set_logging_level(&self, level: LoggingLevel) -> Result<()> {
        let (method, params) = messages::logging_set_level(level);
        self.request(method, params, None).await?;
        Ok(())
    }

    /// Request argument completions for a prompt or resource template.
    pub async fn complete(
        &self,
        reference: &CompleteRef,
        argument: &CompleteArgument,
    ) -> Result<CompleteResult> {
        let (method, params) = messages::completion_complete(reference, argument);
        let result = self.request(method, params, None).await?;
        serde_json::from_value(result).map_err(|e| McpError::Serialization(e).into())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Stop the actor; the transport's own drop handles the subprocess.
        self.cancel.cancel();
    }
}

/// Converts a dropped `request` future into a tracker cancellation.
///
/// The tracker removal is synchronous, so a late server reply for the id
/// correlates to nothing rather than racing into a dead channel. The
/// wire-level `notifications/cancelled` is fire-and-forget.
struct CancelGuard {
    tracker: Arc<RequestTracker>,
    transport: Arc<Transport>,
    id: u64,
    armed: bool,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self.tracker.cancel(self.id) {
            let (method, params) = messages::cancelled(self.id, None);
            let notification = codec::encode_notification(method, params);
            let transport = Arc::clone(&self.transport);
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = transport.send(&notification).await;
                });
            }
        }
    }
}

/// Fail every pending request with a `-32000` connection-closed error.
fn deliver_connection_closed(tracker: &RequestTracker, reason: &str) {
    for (waiter, method) in tracker.fail_all() {
        tracing::debug!(%method, "failing in-flight request: connection closed");
        let _ = waiter.send(Err(RpcError::connection_closed(reason)));
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The background task that owns the transport event stream.
struct Actor {
    events: TransportEvents,
    transport: Arc<Transport>,
    tracker: Arc<RequestTracker>,
    shared: Arc<Shared>,
    handler: Option<NotificationHandler>,
    client_info: Implementation,
    capabilities: ClientCapabilities,
    cancel: CancellationToken,
}

impl Actor {
    async fn run(mut self) {
        let mut init_rx: Option<oneshot::Receiver<RpcOutcome>> = None;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    self.shared.record_fail_reason("disconnect");
                    self.transport.close().await;
                    deliver_connection_closed(&self.tracker, "disconnect");
                    self.shared.set_status(ConnectionStatus::Disconnected);
                    break;
                }

                outcome = async { init_rx.as_mut().expect("guarded by condition").await },
                    if init_rx.is_some() =>
                {
                    init_rx = None;
                    if !self.finish_handshake(outcome).await {
                        break;
                    }
                }

                event = self.events.recv() => {
                    match event {
                        Some(TransportEvent::Ready) => {
                            if !self.begin_handshake(&mut init_rx).await {
                                break;
                            }
                        }
                        Some(TransportEvent::Message(frame)) => self.route(frame).await,
                        Some(TransportEvent::Error(reason)) => {
                            tracing::warn!(%reason, "transport error");
                        }
                        Some(TransportEvent::Closed(reason)) => {
                            self.on_closed(&reason);
                            break;
                        }
                        None => {
                            self.on_closed("transport event channel closed");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Transport came up: send `initialize` tracked with an internal
    /// waiter. Its completion drives the state transition; no caller is
    /// suspended on it.
    async fn begin_handshake(
        &mut self,
        init_rx: &mut Option<oneshot::Receiver<RpcOutcome>>,
    ) -> bool {
        if self.shared.status() != ConnectionStatus::Connecting {
            tracing::warn!("transport signalled ready twice; ignoring");
            return true;
        }
        self.shared.set_status(ConnectionStatus::Initializing);

        let id = self.tracker.next_id();
        let (tx, rx) = oneshot::channel();
        self.tracker
            .track(id, METHOD_INITIALIZE, tx, INITIALIZE_TIMEOUT);

        let (method, params) = messages::initialize(
            LATEST_PROTOCOL_VERSION,
            &self.capabilities,
            &self.client_info,
        );
        let message = codec::encode_request(id, method, params);
        if let Err(e) = self.transport.send(&message).await {
            self.tracker.fail(id);
            self.fatal(format!("failed to send initialize: {e}")).await;
            return false;
        }

        *init_rx = Some(rx);
        true
    }

    /// The internal initialize waiter resolved.
    async fn finish_handshake(
        &mut self,
        outcome: std::result::Result<RpcOutcome, oneshot::error::RecvError>,
    ) -> bool {
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(rpc)) => {
                self.fatal(format!("initialize failed: {rpc}")).await;
                return false;
            }
            Err(_) => {
                self.fatal("initialize waiter dropped".to_string()).await;
                return false;
            }
        };

        let init = match extract_initialize_result(result) {
            Ok(init) => init,
            Err(e) => {
                self.fatal(e.to_string()).await;
                return false;
            }
        };

        write_cell(&self.shared.server_info, init.server_info.clone());
        write_cell(&self.shared.server_capabilities, init.capabilities);
        write_cell(&self.shared.protocol_version, init.protocol_version.clone());

        let (method, params) = messages::initialized();
        if let Err(e) = self
            .transport
            .send(&codec::encode_notification(method, params))
            .await
        {
            self.fatal(format!("failed to send initialized notification: {e}"))
                .await;
            return false;
        }

        tracing::debug!(
            server = %init.server_info.name,
            version = %init.protocol_version,
            "mcp handshake complete"
        );
        self.shared.set_status(ConnectionStatus::Ready);
        true
    }

    /// Route one inbound frame by its JSON-RPC shape.
    async fn route(&self, frame: Value) {
        match codec::classify(frame) {
            Inbound::Success { id, result } => match codec::numeric_id(&id) {
                Some(id) => match self.tracker.complete(id) {
                    Some((waiter, method)) => {
                        tracing::trace!(id, %method, "response correlated");
                        let _ = waiter.send(Ok(result));
                    }
                    None => tracing::debug!(id, "response for unknown id; ignoring"),
                },
                None => tracing::warn!(?id, "response id is not an integer; ignoring"),
            },
            Inbound::Error { id, error } => match codec::numeric_id(&id) {
                Some(id) => match self.tracker.fail(id) {
                    Some((waiter, method)) => {
                        tracing::debug!(id, %method, code = error.code, "error response");
                        let _ = waiter.send(Err(error));
                    }
                    None => tracing::debug!(id, "error for unknown id; ignoring"),
                },
                None => tracing::warn!(?id, "error id is not an integer; ignoring"),
            },
            Inbound::Request { id, method, params } => {
                let _ = params;
                self.answer_server_request(id, &method).await;
            }
            Inbound::Notification { method, params } => match &self.handler {
                Some(handler) => handler(&method, params),
                None => tracing::debug!(%method, "no notification handler; dropping"),
            },
            Inbound::Invalid => {
                tracing::warn!("unclassifiable inbound frame; ignoring");
            }
        }
    }

    /// Answer the small set of server-initiated requests this client
    /// serves; everything else is refused.
    async fn answer_server_request(&self, id: Value, method: &str) {
        let response = match method {
            METHOD_PING => codec::encode_response(&id, json!({})),
            METHOD_ROOTS_LIST => codec::encode_response(&id, json!({ "roots": [] })),
            METHOD_SAMPLING_CREATE_MESSAGE => {
                // Never serviced, advertised or not.
                codec::encode_error_response(&id, &RpcError::method_not_found(method))
            }
            _ => codec::encode_error_response(&id, &RpcError::method_not_found(method)),
        };
        if let Err(e) = self.transport.send(&response).await {
            tracing::warn!(%method, "failed to answer server request: {e}");
        }
    }

    /// The transport ended. Fail everything outstanding; terminal.
    fn on_closed(&self, reason: &str) {
        tracing::debug!(%reason, "transport closed");
        self.shared.record_fail_reason(reason);
        deliver_connection_closed(&self.tracker, reason);
        self.shared.set_status(ConnectionStatus::Disconnected);
    }

    /// A failure fatal to the connection (handshake errors, send failures
    /// during the handshake).
    async fn fatal(&self, reason: String) {
        tracing::warn!(%reason, "mcp connection failed");
        self.shared.record_fail_reason(&reason);
        self.shared.terminal.store(true, Ordering::SeqCst);
        self.transport.close().await;
        deliver_connection_closed(&self.tracker, &reason);
        self.shared.set_status(ConnectionStatus::Disconnected);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
