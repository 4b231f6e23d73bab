//! JSON-RPC 2.0 codec
//!
//! Encoding and classification of the four JSON-RPC 2.0 message shapes:
//! requests, notifications, success responses, and error responses. Every
//! encoder stamps `jsonrpc: "2.0"`; `params` is omitted when empty.
//!
//! Request ids produced by this client are integers (the request tracker
//! allocates them), but [`decode`] accepts string ids too, and
//! [`numeric_id`] folds a string that parses as an integer back into the
//! tracker's key space.
//!
//! Classification is by key presence: `error` + `id` is an error response,
//! `result` + `id` a success response, `method` + `id` a request, `method`
//! without `id` a notification, and anything else [`Inbound::Invalid`].
//! Parse failure is distinct from invalidity: [`decode`] returns `Err` for
//! bytes that are not JSON at all.

use serde_json::{json, Value};

use crate::error::{Result, RpcError};

/// A classified inbound JSON-RPC message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A success response to a client-originated request.
    Success {
        /// The correlation id (numeric or string).
        id: Value,
        /// The `result` value, verbatim.
        result: Value,
    },
    /// An error response to a client-originated request.
    Error {
        /// The correlation id (numeric or string).
        id: Value,
        /// The wire error object, verbatim.
        error: RpcError,
    },
    /// A server-initiated request that expects a response.
    Request {
        /// The server's correlation id, echoed back in the response.
        id: Value,
        /// The method name.
        method: String,
        /// The `params` value; `Null` when absent.
        params: Value,
    },
    /// A one-way server notification.
    Notification {
        /// The method name.
        method: String,
        /// The `params` value; `Null` when absent.
        params: Value,
    },
    /// Valid JSON that matches none of the four shapes.
    Invalid,
}

/// Whether a `params` value should be omitted from the encoded message.
fn params_is_empty(params: &Value) -> bool {
    match params {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Encode a client request with a numeric id.
///
/// # Examples
///
/// ```
/// use mcpkit::codec::encode_request;
///
/// let msg = encode_request(1, "ping", serde_json::json!({}));
/// assert_eq!(msg["jsonrpc"], "2.0");
/// assert_eq!(msg["id"], 1);
/// assert!(msg.get("params").is_none(), "empty params are omitted");
/// ```
pub fn encode_request(id: u64, method: &str, params: Value) -> Value {
    let mut msg = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
    });
    if !params_is_empty(&params) {
        msg["params"] = params;
    }
    msg
}

/// Encode a notification (no id; the peer must not reply).
pub fn encode_notification(method: &str, params: Value) -> Value {
    let mut msg = json!({
        "jsonrpc": "2.0",
        "method": method,
    });
    if !params_is_empty(&params) {
        msg["params"] = params;
    }
    msg
}

/// Encode a success response to a server-initiated request.
///
/// The id is echoed verbatim, numeric or string.
pub fn encode_response(id: &Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

/// Encode an error response to a server-initiated request.
pub fn encode_error_response(id: &Value, error: &RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": error,
    })
}

/// Decode raw text into a classified message.
///
/// # Errors
///
/// Returns an error when the text is not valid JSON at all; structural
/// problems with valid JSON yield [`Inbound::Invalid`] instead.
pub fn decode(raw: &str) -> Result<Inbound> {
    let value: Value = serde_json::from_str(raw)?;
    Ok(classify(value))
}

/// Classify an already-parsed JSON value by key presence.
pub fn classify(value: Value) -> Inbound {
    let Value::Object(ref map) = value else {
        return Inbound::Invalid;
    };

    let id = map.get("id").filter(|v| !v.is_null()).cloned();
    let has_method = map.contains_key("method");

    if let Some(id) = id.clone() {
        if let Some(error_val) = map.get("error") {
            let error = match serde_json::from_value::<RpcError>(error_val.clone()) {
                Ok(e) => e,
                Err(_) => RpcError::internal(format!("malformed error object: {error_val}")),
            };
            return Inbound::Error { id, error };
        }
        if let Some(result) = map.get("result") {
            return Inbound::Success {
                id,
                result: result.clone(),
            };
        }
    }

    if has_method {
        let Some(method) = map.get("method").and_then(|m| m.as_str()) else {
            return Inbound::Invalid;
        };
        let method = method.to_string();
        let params = map.get("params").cloned().unwrap_or(Value::Null);
        return match id {
            Some(id) => Inbound::Request { id, method, params },
            None => Inbound::Notification { method, params },
        };
    }

    Inbound::Invalid
}

/// Fold a decoded id into the tracker's numeric key space.
///
/// Accepts a JSON number or a string that parses as `u64`; anything else is
/// uncorrelatable and yields `None`.
pub fn numeric_id(id: &Value) -> Option<u64> {
    match id {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_round_trip() {
        let msg = encode_request(7, "tools/call", json!({"name": "echo"}));
        let decoded = classify(msg);
        // A request we encode looks like a server request when decoded: the
        // shapes are symmetric.
        match decoded {
            Inbound::Request { id, method, params } => {
                assert_eq!(id, json!(7));
                assert_eq!(method, "tools/call");
                assert_eq!(params["name"], "echo");
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_request_empty_params_omitted() {
        let msg = encode_request(1, "ping", json!({}));
        assert!(msg.get("params").is_none());

        let msg = encode_request(1, "ping", Value::Null);
        assert!(msg.get("params").is_none());
    }

    #[test]
    fn test_encode_notification_has_no_id() {
        let msg = encode_notification("notifications/initialized", json!({}));
        assert_eq!(msg["jsonrpc"], "2.0");
        assert!(msg.get("id").is_none());
        assert!(msg.get("params").is_none());
    }

    #[test]
    fn test_decode_tolerates_absent_and_empty_params() {
        let with_empty = decode(r#"{"jsonrpc":"2.0","method":"m","params":{}}"#).unwrap();
        let without = decode(r#"{"jsonrpc":"2.0","method":"m"}"#).unwrap();
        match (with_empty, without) {
            (
                Inbound::Notification { params: p1, .. },
                Inbound::Notification { params: p2, .. },
            ) => {
                assert_eq!(p1, json!({}));
                assert_eq!(p2, Value::Null);
            }
            other => panic!("expected notifications, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_success_response() {
        let msg = classify(json!({"jsonrpc": "2.0", "id": 3, "result": {"ok": true}}));
        match msg {
            Inbound::Success { id, result } => {
                assert_eq!(id, json!(3));
                assert_eq!(result["ok"], true);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_error_response() {
        let msg = classify(json!({
            "jsonrpc": "2.0",
            "id": 4,
            "error": {"code": -32601, "message": "Method not found"}
        }));
        match msg {
            Inbound::Error { id, error } => {
                assert_eq!(id, json!(4));
                assert_eq!(error.code, -32601);
                assert_eq!(error.message, "Method not found");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_error_takes_precedence_over_result() {
        // A malformed response carrying both: error wins, matching the
        // key-presence rules.
        let msg = classify(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {},
            "error": {"code": -32603, "message": "boom"}
        }));
        assert!(matches!(msg, Inbound::Error { .. }));
    }

    #[test]
    fn test_classify_server_request_and_notification() {
        let req = classify(json!({"jsonrpc": "2.0", "id": 9, "method": "ping"}));
        assert!(matches!(req, Inbound::Request { .. }));

        let notif = classify(json!({"jsonrpc": "2.0", "method": "notifications/progress"}));
        assert!(matches!(notif, Inbound::Notification { .. }));
    }

    #[test]
    fn test_classify_null_id_is_notification() {
        let msg = classify(json!({"jsonrpc": "2.0", "id": null, "method": "m"}));
        assert!(matches!(msg, Inbound::Notification { .. }));
    }

    #[test]
    fn test_classify_invalid_shapes() {
        assert_eq!(classify(json!({"jsonrpc": "2.0"})), Inbound::Invalid);
        assert_eq!(classify(json!({"id": 1})), Inbound::Invalid);
        assert_eq!(classify(json!([1, 2, 3])), Inbound::Invalid);
        assert_eq!(classify(json!({"method": 42, "id": 1})), Inbound::Invalid);
        // A response with an id but neither result nor error.
        assert_eq!(classify(json!({"jsonrpc": "2.0", "id": 1})), Inbound::Invalid);
    }

    #[test]
    fn test_decode_parse_failure_is_err_not_invalid() {
        assert!(decode("{truncated").is_err());
        assert_eq!(decode("[1]").unwrap(), Inbound::Invalid);
    }

    #[test]
    fn test_decode_accepts_string_ids() {
        let msg = decode(r#"{"jsonrpc":"2.0","id":"12","result":{}}"#).unwrap();
        match msg {
            Inbound::Success { id, .. } => {
                assert_eq!(numeric_id(&id), Some(12));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_numeric_id_conversions() {
        assert_eq!(numeric_id(&json!(5)), Some(5));
        assert_eq!(numeric_id(&json!("17")), Some(17));
        assert_eq!(numeric_id(&json!("abc")), None);
        assert_eq!(numeric_id(&json!(-1)), None);
        assert_eq!(numeric_id(&json!(null)), None);
    }

    #[test]
    fn test_malformed_error_object_degrades_to_internal() {
        let msg = classify(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "error": "not an object"
        }));
        match msg {
            Inbound::Error { error, .. } => {
                assert_eq!(error.code, -32603);
                assert!(error.message.contains("malformed error object"));
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_error_response_echoes_string_id() {
        let id = json!("srv-1");
        let msg = encode_error_response(&id, &RpcError::method_not_found("x"));
        assert_eq!(msg["id"], "srv-1");
        assert_eq!(msg["error"]["code"], -32601);
    }
}
