//! Capability inspection and handshake-result extraction
//!
//! The handshake leaves the connection holding the server's capability map;
//! this module provides the predicates callers use to decide which requests
//! a server will accept, plus the extraction of the typed
//! [`InitializeResult`] from a raw `initialize` response value.
//!
//! Version policy: the client requests [`LATEST_PROTOCOL_VERSION`] and
//! records whatever version string the server returns. Unknown versions are
//! not rejected; [`is_known_version`] only reports whether the string is in
//! the table.

use serde_json::Value;

use crate::error::{McpError, Result};
use crate::types::{InitializeResult, ServerCapabilities, KNOWN_PROTOCOL_VERSIONS};

pub use crate::types::LATEST_PROTOCOL_VERSION;

/// Identifies a feature a server may advertise in its capability map.
///
/// # Examples
///
/// ```
/// use mcpkit::capabilities::ServerFeature;
/// use mcpkit::types::ServerCapabilities;
///
/// let caps: ServerCapabilities =
///     serde_json::from_value(serde_json::json!({ "tools": {} })).unwrap();
/// assert!(caps.supports(ServerFeature::Tools));
/// assert!(!caps.supports(ServerFeature::Prompts));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerFeature {
    /// Tools via `tools/list` and `tools/call`.
    Tools,
    /// Resources via `resources/list` and `resources/read`.
    Resources,
    /// Prompts via `prompts/list` and `prompts/get`.
    Prompts,
    /// `logging/setLevel` and log notifications.
    Logging,
    /// `completion/complete`.
    Completions,
    /// Experimental, implementation-specific features.
    Experimental,
}

impl ServerCapabilities {
    /// Whether the server advertises a feature at all.
    pub fn supports(&self, feature: ServerFeature) -> bool {
        self.descriptor(feature).is_some()
    }

    /// Whether the server emits list-changed notifications for a feature.
    ///
    /// Reads the `listChanged` sub-flag of the feature's descriptor;
    /// meaningful for tools, resources, and prompts.
    pub fn supports_list_changed(&self, feature: ServerFeature) -> bool {
        self.descriptor(feature)
            .and_then(|d| d.get("listChanged"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Whether the server accepts `resources/subscribe`.
    pub fn supports_subscribe(&self) -> bool {
        self.resources
            .as_ref()
            .and_then(|d| d.get("subscribe"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// The raw descriptor object for a feature, when advertised.
    fn descriptor(&self, feature: ServerFeature) -> Option<&Value> {
        match feature {
            ServerFeature::Tools => self.tools.as_ref(),
            ServerFeature::Resources => self.resources.as_ref(),
            ServerFeature::Prompts => self.prompts.as_ref(),
            ServerFeature::Logging => self.logging.as_ref(),
            ServerFeature::Completions => self.completions.as_ref(),
            ServerFeature::Experimental => self.experimental.as_ref(),
        }
    }
}

/// Whether a protocol-version string appears in the known-version table.
pub fn is_known_version(version: &str) -> bool {
    KNOWN_PROTOCOL_VERSIONS.contains(&version)
}

/// Extract the typed handshake result from a raw `initialize` response
/// value: server capabilities, server identity, and the chosen protocol
/// version.
///
/// Unknown protocol versions are accepted and logged; the server's choice
/// is recorded as-is.
///
/// # Errors
///
/// Returns [`McpError::Handshake`] when the value is missing required
/// fields (`protocolVersion`, `serverInfo`).
pub fn extract_initialize_result(result: Value) -> Result<InitializeResult> {
    let parsed: InitializeResult = serde_json::from_value(result)
        .map_err(|e| McpError::Handshake(format!("malformed initialize result: {e}")))?;

    if !is_known_version(&parsed.protocol_version) {
        tracing::debug!(
            version = %parsed.protocol_version,
            "server chose a protocol version not in the known table; accepting"
        );
    }

    Ok(parsed)
}
