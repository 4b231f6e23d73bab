//! Pure builders for MCP method bodies
//!
//! Every MCP operation is represented as a `(method, params)` pair; the
//! builders here produce exactly the wire method names and parameter shapes,
//! eliding optional cursors and arguments when absent. The connection layer
//! feeds these into [`crate::codec::encode_request`] /
//! [`crate::codec::encode_notification`].

use serde_json::{json, Value};

use crate::types::{
    ClientCapabilities, CompleteArgument, CompleteRef, Implementation, LoggingLevel,
    PromptArguments, METHOD_COMPLETION_COMPLETE, METHOD_INITIALIZE, METHOD_LOGGING_SET_LEVEL,
    METHOD_PING, METHOD_PROMPTS_GET, METHOD_PROMPTS_LIST, METHOD_RESOURCES_LIST,
    METHOD_RESOURCES_READ, METHOD_RESOURCES_SUBSCRIBE, METHOD_RESOURCES_TEMPLATES_LIST,
    METHOD_RESOURCES_UNSUBSCRIBE, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, NOTIF_CANCELLED,
    NOTIF_INITIALIZED, NOTIF_PROGRESS, NOTIF_ROOTS_LIST_CHANGED,
};

/// A built protocol message: wire method name plus params value.
pub type ProtocolMessage = (&'static str, Value);

/// Params for a paginated list request: just the optional cursor.
fn paginated(cursor: Option<&str>) -> Value {
    match cursor {
        Some(c) => json!({ "cursor": c }),
        None => json!({}),
    }
}

/// The `initialize` handshake request.
///
/// # Examples
///
/// ```
/// use mcpkit::messages;
/// use mcpkit::types::{ClientCapabilities, Implementation, LATEST_PROTOCOL_VERSION};
///
/// let (method, params) = messages::initialize(
///     LATEST_PROTOCOL_VERSION,
///     &ClientCapabilities::default(),
///     &Implementation::new("demo", "1.0"),
/// );
/// assert_eq!(method, "initialize");
/// assert_eq!(params["protocolVersion"], LATEST_PROTOCOL_VERSION);
/// assert_eq!(params["clientInfo"]["name"], "demo");
/// ```
pub fn initialize(
    protocol_version: &str,
    capabilities: &ClientCapabilities,
    client_info: &Implementation,
) -> ProtocolMessage {
    (
        METHOD_INITIALIZE,
        json!({
            "protocolVersion": protocol_version,
            "capabilities": capabilities,
            "clientInfo": client_info,
        }),
    )
}

/// A keepalive `ping`.
pub fn ping() -> ProtocolMessage {
    (METHOD_PING, json!({}))
}

/// One page of `tools/list`.
pub fn tools_list(cursor: Option<&str>) -> ProtocolMessage {
    (METHOD_TOOLS_LIST, paginated(cursor))
}

/// Invoke a named tool; `arguments` elided when `None`.
pub fn tools_call(name: &str, arguments: Option<Value>) -> ProtocolMessage {
    let mut params = json!({ "name": name });
    if let Some(args) = arguments {
        params["arguments"] = args;
    }
    (METHOD_TOOLS_CALL, params)
}

/// One page of `resources/list`.
pub fn resources_list(cursor: Option<&str>) -> ProtocolMessage {
    (METHOD_RESOURCES_LIST, paginated(cursor))
}

/// One page of `resources/templates/list`.
pub fn resources_templates_list(cursor: Option<&str>) -> ProtocolMessage {
    (METHOD_RESOURCES_TEMPLATES_LIST, paginated(cursor))
}

/// Read a resource by URI.
pub fn resources_read(uri: &str) -> ProtocolMessage {
    (METHOD_RESOURCES_READ, json!({ "uri": uri }))
}

/// Subscribe to updates for a resource URI.
pub fn resources_subscribe(uri: &str) -> ProtocolMessage {
    (METHOD_RESOURCES_SUBSCRIBE, json!({ "uri": uri }))
}

/// Unsubscribe from a resource URI.
pub fn resources_unsubscribe(uri: &str) -> ProtocolMessage {
    (METHOD_RESOURCES_UNSUBSCRIBE, json!({ "uri": uri }))
}

/// One page of `prompts/list`.
pub fn prompts_list(cursor: Option<&str>) -> ProtocolMessage {
    (METHOD_PROMPTS_LIST, paginated(cursor))
}

/// Retrieve a rendered prompt; `arguments` elided when `None`.
pub fn prompts_get(name: &str, arguments: Option<&PromptArguments>) -> ProtocolMessage {
    let mut params = json!({ "name": name });
    if let Some(args) = arguments {
        params["arguments"] = json!(args);
    }
    (METHOD_PROMPTS_GET, params)
}

/// Set the server-side logging verbosity.
pub fn logging_set_level(level: LoggingLevel) -> ProtocolMessage {
    (METHOD_LOGGING_SET_LEVEL, json!({ "level": level }))
}

/// Request argument completions for a prompt or resource template.
pub fn completion_complete(reference: &CompleteRef, argument: &CompleteArgument) -> ProtocolMessage {
    (
        METHOD_COMPLETION_COMPLETE,
        json!({
            "ref": reference,
            "argument": argument,
        }),
    )
}

/// The `notifications/initialized` handshake-completion notification.
pub fn initialized() -> ProtocolMessage {
    (NOTIF_INITIALIZED, json!({}))
}

/// Best-effort cancellation notice for a prior request.
pub fn cancelled(request_id: u64, reason: Option<&str>) -> ProtocolMessage {
    let mut params = json!({ "requestId": request_id });
    if let Some(r) = reason {
        params["reason"] = json!(r);
    }
    (NOTIF_CANCELLED, params)
}

/// Progress report for a long-running operation.
pub fn progress(progress_token: Value, progress: f64, total: Option<f64>) -> ProtocolMessage {
    let mut params = json!({
        "progressToken": progress_token,
        "progress": progress,
    });
    if let Some(t) = total {
        params["total"] = json!(t);
    }
    (NOTIF_PROGRESS, params)
}

/// Client-side roots-changed notification.
pub fn roots_list_changed() -> ProtocolMessage {
    (NOTIF_ROOTS_LIST_CHANGED, json!({}))
}
