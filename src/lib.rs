//! MCPKit - Async Model Context Protocol client
//!
//! This library implements an MCP client: a JSON-RPC 2.0 protocol engine
//! with two wire transports (subprocess stdio and Streamable HTTP/SSE),
//! per-request timeout tracking, and a load-balanced connection pool.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `buffer`: newline-delimited JSON frame reassembly for the stdio transport
//! - `codec`: JSON-RPC 2.0 encoding and message classification
//! - `messages`: builders for every MCP method body
//! - `capabilities`: capability predicates and handshake-result extraction
//! - `transport`: the stdio and HTTP transports behind one closed enum
//! - `tracker`: request ids, waiters, timeouts, and bulk failure
//! - `connection`: the per-peer state machine and typed RPC surface
//! - `pool`: connection supervision with checkout strategies
//! - `config`: serde configuration for connections and pools
//! - `content`: tool-result content helpers
//! - `error`: error types and result alias
//!
//! # Example
//!
//! ```no_run
//! use mcpkit::{Connection, ConnectionConfig, TransportConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConnectionConfig::new(TransportConfig::stdio("my-mcp-server"));
//!     let conn = Connection::connect(config).await?;
//!
//!     for tool in conn.list_tools().await? {
//!         println!("{}", tool.name);
//!     }
//!
//!     let result = conn
//!         .call_tool("echo", Some(serde_json::json!({ "message": "hi" })))
//!         .await?;
//!     println!("{}", mcpkit::content::text_content(&result));
//!
//!     conn.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod capabilities;
pub mod codec;
pub mod config;
pub mod connection;
pub mod content;
pub mod error;
pub mod messages;
pub mod pool;
pub mod tracker;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use config::{ConnectionConfig, PoolConfig, TransportConfig};
pub use connection::{Connection, ConnectionStatus, NotificationHandler};
pub use error::{McpError, Result, RpcError};
pub use pool::{Pool, Strategy};
pub use types::{ClientCapabilities, Implementation, ServerCapabilities};
