//! Error types for MCPKit
//!
//! Two layers of errors exist in this crate:
//!
//! - [`RpcError`] is the JSON-RPC 2.0 wire error object (`{code, message,
//!   data}`). It is what a server puts in the `error` field of a response,
//!   and what the request tracker delivers to a waiter when a request times
//!   out, is cancelled, or loses its connection. Server-produced errors are
//!   surfaced to callers unchanged.
//! - [`McpError`] is the crate-level error enum, built with `thiserror`,
//!   covering everything else that can go wrong: transport I/O, process
//!   spawning, configuration, serialization, and lifecycle violations.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0: the inbound frame could not be decoded.
pub const CODE_PARSE_ERROR: i64 = -32700;
/// JSON-RPC 2.0: the message was structurally invalid.
pub const CODE_INVALID_REQUEST: i64 = -32600;
/// JSON-RPC 2.0: the method is not recognized (in either direction).
pub const CODE_METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC 2.0: the method arguments were rejected.
pub const CODE_INVALID_PARAMS: i64 = -32602;
/// JSON-RPC 2.0: a generic fault inside the receiving party.
pub const CODE_INTERNAL_ERROR: i64 = -32603;
/// MCP: the transport ended while requests were still outstanding.
pub const CODE_CONNECTION_CLOSED: i64 = -32000;
/// MCP: the per-request timer fired before a response arrived.
pub const CODE_REQUEST_TIMEOUT: i64 = -32001;
/// MCP: the caller cancelled the request.
pub const CODE_REQUEST_CANCELLED: i64 = -32002;
/// MCP: a resource URI lookup failed.
pub const CODE_RESOURCE_NOT_FOUND: i64 = -32003;

// ---------------------------------------------------------------------------
// RpcError -- the wire error object
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 error object.
///
/// Implements `Display` as `"JSON-RPC error {code}: {message}"`.
///
/// # Examples
///
/// ```
/// use mcpkit::error::RpcError;
///
/// let e = RpcError::new(-32600, "Invalid Request");
/// assert_eq!(e.to_string(), "JSON-RPC error -32600: Invalid Request");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Numeric error code as defined by JSON-RPC 2.0 or the MCP spec.
    pub code: i64,
    /// Human-readable error description.
    pub message: String,
    /// Optional additional error context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

impl RpcError {
    /// Construct an error with the given code and message and no data.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach a `data` value to this error.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// An undecodable inbound frame (`-32700`).
    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self::new(CODE_PARSE_ERROR, format!("Parse error: {}", detail.into()))
    }

    /// A structurally bad message (`-32600`).
    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::new(
            CODE_INVALID_REQUEST,
            format!("Invalid request: {}", detail.into()),
        )
    }

    /// An unknown method, in either direction (`-32601`).
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            CODE_METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        )
    }

    /// Bad method arguments (`-32602`).
    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self::new(
            CODE_INVALID_PARAMS,
            format!("Invalid params: {}", detail.into()),
        )
    }

    /// A generic internal fault (`-32603`).
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(CODE_INTERNAL_ERROR, detail.into())
    }

    /// The transport ended with this request still outstanding (`-32000`).
    pub fn connection_closed(reason: impl Into<String>) -> Self {
        Self::new(
            CODE_CONNECTION_CLOSED,
            format!("Connection closed: {}", reason.into()),
        )
    }

    /// The per-request timer fired (`-32001`).
    pub fn request_timeout(method: &str) -> Self {
        Self::new(
            CODE_REQUEST_TIMEOUT,
            format!("Request timed out: {method}"),
        )
    }

    /// The caller cancelled the request (`-32002`).
    pub fn request_cancelled(method: &str) -> Self {
        Self::new(
            CODE_REQUEST_CANCELLED,
            format!("Request cancelled: {method}"),
        )
    }

    /// A resource URI lookup failed (`-32003`).
    pub fn resource_not_found(uri: &str) -> Self {
        Self::new(
            CODE_RESOURCE_NOT_FOUND,
            format!("Resource not found: {uri}"),
        )
    }

    /// Whether a caller-side retry may reasonably succeed.
    ///
    /// Only connection-closed and request-timeout qualify; every other code
    /// reflects a deterministic rejection and is surfaced unchanged.
    pub fn is_retriable(&self) -> bool {
        matches!(self.code, CODE_CONNECTION_CLOSED | CODE_REQUEST_TIMEOUT)
    }

    /// Whether the code is a standard JSON-RPC 2.0 code rather than one of
    /// the MCP-specific extensions.
    pub fn is_standard(&self) -> bool {
        matches!(
            self.code,
            CODE_PARSE_ERROR
                | CODE_INVALID_REQUEST
                | CODE_METHOD_NOT_FOUND
                | CODE_INVALID_PARAMS
                | CODE_INTERNAL_ERROR
        )
    }

    /// Whether the code is one of the MCP-specific extensions
    /// (`-32000..=-32003`).
    pub fn is_mcp_specific(&self) -> bool {
        (CODE_RESOURCE_NOT_FOUND..=CODE_CONNECTION_CLOSED).contains(&self.code)
    }
}

// ---------------------------------------------------------------------------
// McpError -- crate-level error enum
// ---------------------------------------------------------------------------

/// Main error type for MCPKit operations.
///
/// This enum encompasses all possible errors that can occur during
/// connection establishment, request dispatch, transport I/O, and
/// configuration loading.
#[derive(Error, Debug)]
pub enum McpError {
    /// A JSON-RPC error delivered to a waiter: a server-returned error, a
    /// timeout, a cancellation, or a connection closure.
    #[error("{0}")]
    Rpc(RpcError),

    /// Transport-level I/O failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server subprocess could not be spawned
    #[error("Failed to spawn MCP server `{command}`: {reason}")]
    Spawn {
        /// The executable that was attempted
        command: String,
        /// Why the spawn failed
        reason: String,
    },

    /// An operation required the `ready` state
    #[error("Connection not ready, current={0}")]
    NotReady(String),

    /// The MCP handshake failed, which is fatal to the connection
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Pool checkout found zero live connections
    #[error("No live connections available in pool")]
    NoConnections,

    /// The message buffer's retained tail exceeded its frame cap
    #[error("Frame exceeds buffer cap: {size} > {cap} bytes")]
    FrameTooLarge {
        /// Bytes currently retained without a terminating newline
        size: usize,
        /// The configured cap
        cap: usize,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl McpError {
    /// Whether a caller-side retry may reasonably succeed.
    ///
    /// Delegates to [`RpcError::is_retriable`] for RPC-layer errors; every
    /// other variant is non-retriable.
    pub fn is_retriable(&self) -> bool {
        match self {
            McpError::Rpc(e) => e.is_retriable(),
            _ => false,
        }
    }

    /// The RPC error code carried by this error, if any.
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            McpError::Rpc(e) => Some(e.code),
            _ => None,
        }
    }
}

impl From<RpcError> for McpError {
    fn from(e: RpcError) -> Self {
        McpError::Rpc(e)
    }
}

/// Result type alias for MCPKit operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

/// Retriability check over an [`anyhow::Error`] chain.
///
/// Walks the chain looking for an [`McpError`] or [`RpcError`] and applies
/// the retriable classification. Unknown errors are non-retriable.
///
/// # Examples
///
/// ```
/// use mcpkit::error::{is_retriable, McpError, RpcError};
///
/// let err = anyhow::anyhow!(McpError::Rpc(RpcError::request_timeout("ping")));
/// assert!(is_retriable(&err));
/// ```
pub fn is_retriable(err: &anyhow::Error) -> bool {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<McpError>() {
            return e.is_retriable();
        }
        if let Some(e) = cause.downcast_ref::<RpcError>() {
            return e.is_retriable();
        }
    }
    false
}
