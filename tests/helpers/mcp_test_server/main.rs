//! MCP test server binary for integration tests
//!
//! A minimal MCP server speaking newline-delimited JSON over stdin/stdout,
//! used exclusively by the stdio integration tests. One JSON-RPC message
//! per stdin line; one JSON response per stdout line.
//!
//! # Handled methods
//!
//! - `initialize` -- valid result with protocol version `2025-11-25`,
//!   `tools` and `resources` capabilities, and a fixed server identity.
//! - `notifications/*` -- swallowed silently (no response).
//! - `ping` -- empty object result.
//! - `tools/list` -- two tools: `echo` and `sleep`.
//! - `tools/call` with `name: "echo"` -- echoes `arguments.message` back as
//!   a text content item.
//! - `tools/call` with `name: "sleep"` -- never answered; lets tests drive
//!   the client-side request timeout.
//! - `tools/call` with `name: "crash"` -- the process exits with status 7
//!   without replying; lets tests observe connection closure with requests
//!   outstanding.
//! - `resources/list` -- one fixed resource.
//! - `resources/read` -- text contents for `mem://greeting`, a `-32003`
//!   error for any other URI.
//! - anything else -- a JSON-RPC `-32601 Method not found` error.

use std::io::{self, BufRead, Write};

fn main() {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request: serde_json::Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(_) => {
                let response = serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": null,
                    "error": { "code": -32700, "message": "Parse error" }
                });
                let _ = writeln!(out, "{}", response);
                let _ = out.flush();
                continue;
            }
        };

        let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");

        // Notifications expect no response.
        if method.starts_with("notifications/") {
            continue;
        }

        let id = request
            .get("id")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        let response = match method {
            "initialize" => handle_initialize(&id),
            "ping" => serde_json::json!({ "jsonrpc": "2.0", "id": id, "result": {} }),
            "tools/list" => handle_tools_list(&id),
            "tools/call" => match handle_tools_call(&id, &request) {
                Some(response) => response,
                // `sleep` is deliberately left unanswered.
                None => continue,
            },
            "resources/list" => handle_resources_list(&id),
            "resources/read" => handle_resources_read(&id, &request),
            _ => make_error(&id, -32601, &format!("Method not found: {}", method)),
        };

        let serialized = match serde_json::to_string(&response) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("mcp_test_server: failed to serialize response: {}", e);
                continue;
            }
        };

        if writeln!(out, "{}", serialized).is_err() {
            break;
        }
        if out.flush().is_err() {
            break;
        }
    }
}

/// Respond to `initialize` with a fixed identity and capability map.
fn handle_initialize(id: &serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "protocolVersion": "2025-11-25",
            "capabilities": {
                "tools": { "listChanged": true },
                "resources": { "subscribe": false }
            },
            "serverInfo": {
                "name": "mcp-test-server",
                "version": "0.1.0"
            }
        }
    })
}

/// Advertise the `echo` and `sleep` tools.
fn handle_tools_list(id: &serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "tools": [
                {
                    "name": "echo",
                    "description": "Echoes input",
                    "inputSchema": {
                        "type": "object",
                        "properties": { "message": { "type": "string" } }
                    }
                },
                {
                    "name": "sleep",
                    "description": "Never answers",
                    "inputSchema": { "type": "object" }
                }
            ]
        }
    })
}

/// Dispatch a `tools/call`. `None` means no response is written.
fn handle_tools_call(
    id: &serde_json::Value,
    request: &serde_json::Value,
) -> Option<serde_json::Value> {
    let params = request.get("params").unwrap_or(&serde_json::Value::Null);
    let tool_name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");

    match tool_name {
        "echo" => {
            let message = params
                .get("arguments")
                .and_then(|a| a.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("");
            Some(serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "content": [ { "type": "text", "text": message } ],
                    "isError": false
                }
            }))
        }
        "sleep" => None,
        "crash" => std::process::exit(7),
        other => Some(make_error(id, -32602, &format!("Unknown tool: {}", other))),
    }
}

/// Advertise one fixed resource.
fn handle_resources_list(id: &serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "resources": [
                {
                    "uri": "mem://greeting",
                    "name": "greeting",
                    "mimeType": "text/plain"
                }
            ]
        }
    })
}

/// Read `mem://greeting`; anything else is a resource-not-found error.
fn handle_resources_read(id: &serde_json::Value, request: &serde_json::Value) -> serde_json::Value {
    let uri = request
        .get("params")
        .and_then(|p| p.get("uri"))
        .and_then(|u| u.as_str())
        .unwrap_or("");

    if uri != "mem://greeting" {
        return make_error(id, -32003, &format!("Resource not found: {}", uri));
    }

    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "contents": [
                {
                    "uri": "mem://greeting",
                    "mimeType": "text/plain",
                    "text": "hello from the test server"
                }
            ]
        }
    })
}

/// Build a JSON-RPC error response.
fn make_error(id: &serde_json::Value, code: i32, message: &str) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
}
