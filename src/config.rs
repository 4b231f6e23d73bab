//! Configuration types for connections and pools
//!
//! All configuration is plain serde data, loadable from YAML. A connection
//! is described by a [`ConnectionConfig`]: a transport selection plus the
//! client identity, capability map, and default request timeout. A pool is
//! described by a [`PoolConfig`]: either a homogeneous template (`size` +
//! `connection`) or an explicit heterogeneous `connections` list, plus a
//! checkout strategy.
//!
//! The transport variant is selected by the `transport` key, with the
//! variant's own options as sibling keys:
//!
//! ```yaml
//! transport: stdio
//! command: npx
//! args: ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]
//! timeout_ms: 30000
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{McpError, Result};
use crate::pool::Strategy;
use crate::types::{ClientCapabilities, Implementation};

/// Default per-request deadline: 30 seconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

fn default_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// HTTP request decoration beyond headers: timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequestOptions {
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Optional TCP connect timeout in milliseconds.
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
}

impl Default for HttpRequestOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            connect_timeout_ms: None,
        }
    }
}

/// Selects and parameterizes a wire transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Local subprocess speaking newline-delimited JSON over stdio.
    Stdio {
        /// Executable name or path; bare names are resolved on `PATH`.
        command: String,
        /// Command-line arguments.
        #[serde(default)]
        args: Vec<String>,
        /// Environment overrides applied over the inherited environment.
        #[serde(default)]
        env: HashMap<String, String>,
        /// Working directory for the subprocess.
        #[serde(default)]
        cd: Option<PathBuf>,
        /// Cap on an unterminated stdout frame; defaults to 16 MiB.
        #[serde(default)]
        max_frame_bytes: Option<usize>,
    },
    /// Remote server speaking Streamable HTTP.
    Http {
        /// The MCP endpoint URL.
        url: url::Url,
        /// Extra headers added to every request (auth tokens go here).
        #[serde(default)]
        headers: HashMap<String, String>,
        /// Request decoration: timeouts.
        #[serde(default)]
        req_options: HttpRequestOptions,
    },
}

impl TransportConfig {
    /// A stdio transport running `command` with no arguments.
    pub fn stdio(command: impl Into<String>) -> Self {
        TransportConfig::Stdio {
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            cd: None,
            max_frame_bytes: None,
        }
    }

    /// An HTTP transport targeting `url` with default options.
    pub fn http(url: url::Url) -> Self {
        TransportConfig::Http {
            url,
            headers: HashMap::new(),
            req_options: HttpRequestOptions::default(),
        }
    }
}

/// Everything needed to establish one connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// The wire transport, selected by the `transport` key.
    #[serde(flatten)]
    pub transport: TransportConfig,
    /// Identity sent in the `initialize` request.
    #[serde(default)]
    pub client_info: Implementation,
    /// Capability map sent in the `initialize` request.
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    /// Default per-request deadline in milliseconds; per-call overrides are
    /// possible on `request`.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ConnectionConfig {
    /// A connection config with defaults for everything but the transport.
    pub fn new(transport: TransportConfig) -> Self {
        Self {
            transport,
            client_info: Implementation::default(),
            capabilities: ClientCapabilities::default(),
            timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }

    /// The default request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load a connection config from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Io`] when the file cannot be read or
    /// [`McpError::Yaml`] when it does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = load_yaml(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Reject structurally valid but unusable configurations.
    pub fn validate(&self) -> Result<()> {
        match &self.transport {
            TransportConfig::Stdio { command, .. } if command.is_empty() => {
                Err(McpError::Config("stdio transport requires a command".to_string()).into())
            }
            _ => Ok(()),
        }
    }
}

/// Pool sizing, membership, and checkout strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of connections to build from the `connection` template.
    #[serde(default)]
    pub size: Option<usize>,
    /// The homogeneous template used with `size`.
    #[serde(default)]
    pub connection: Option<ConnectionConfig>,
    /// An explicit heterogeneous membership list.
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
    /// Checkout strategy; round-robin when omitted.
    #[serde(default)]
    pub strategy: Strategy,
}

impl PoolConfig {
    /// A homogeneous pool of `size` connections built from `template`.
    pub fn homogeneous(size: usize, template: ConnectionConfig) -> Self {
        Self {
            size: Some(size),
            connection: Some(template),
            connections: Vec::new(),
            strategy: Strategy::default(),
        }
    }

    /// A heterogeneous pool over an explicit member list.
    pub fn heterogeneous(connections: Vec<ConnectionConfig>) -> Self {
        Self {
            size: None,
            connection: None,
            connections,
            strategy: Strategy::default(),
        }
    }

    /// Set the checkout strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Load a pool config from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = load_yaml(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// The resolved member list: the template expanded `size` times, or the
    /// explicit list.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Config`] when neither form is present.
    pub fn members(&self) -> Result<Vec<ConnectionConfig>> {
        self.validate()?;
        if let (Some(size), Some(template)) = (self.size, &self.connection) {
            return Ok(vec![template.clone(); size]);
        }
        Ok(self.connections.clone())
    }

    /// Reject structurally valid but unusable configurations.
    pub fn validate(&self) -> Result<()> {
        let templated = self.size.is_some() || self.connection.is_some();
        if templated {
            if self.size.is_none() || self.connection.is_none() {
                return Err(McpError::Config(
                    "pool template requires both `size` and `connection`".to_string(),
                )
                .into());
            }
            if self.size == Some(0) {
                return Err(McpError::Config("pool size must be nonzero".to_string()).into());
            }
            if !self.connections.is_empty() {
                return Err(McpError::Config(
                    "pool takes either a template or an explicit list, not both".to_string(),
                )
                .into());
            }
        } else if self.connections.is_empty() {
            return Err(McpError::Config(
                "pool requires `size` + `connection` or a `connections` list".to_string(),
            )
            .into());
        }
        for member in &self.connections {
            member.validate()?;
        }
        if let Some(template) = &self.connection {
            template.validate()?;
        }
        Ok(())
    }
}

/// Read and parse a YAML config file.
fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).map_err(McpError::Io)?;
    let parsed = serde_yaml::from_str(&contents).map_err(McpError::Yaml)?;
    Ok(parsed)
}
