//! Stdio end-to-end integration tests
//!
//! Drives a real [`Connection`] against the `mcp_test_server` helper binary
//! over the subprocess stdio transport: handshake, tool calls, resource
//! reads, timeouts, and failure propagation when the server process dies.

use std::sync::Arc;
use std::time::Duration;

use mcpkit::config::{ConnectionConfig, PoolConfig, TransportConfig};
use mcpkit::connection::{Connection, ConnectionStatus};
use mcpkit::content::text_content;
use mcpkit::error::McpError;
use mcpkit::pool::{Pool, Strategy};

/// Route library tracing through the test harness when `RUST_LOG` is set.
fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A connection config pointing at the compiled test server.
fn server_config() -> ConnectionConfig {
    init_logging();
    let mut config = ConnectionConfig::new(TransportConfig::stdio(env!(
        "CARGO_BIN_EXE_mcp_test_server"
    )));
    config.timeout_ms = 5_000;
    config
}

/// Pull the RPC error code out of an `anyhow` chain.
fn rpc_code(err: &anyhow::Error) -> Option<i64> {
    err.chain()
        .find_map(|c| c.downcast_ref::<McpError>())
        .and_then(McpError::rpc_code)
}

#[tokio::test]
async fn test_handshake_records_server_identity_and_capabilities() {
    let conn = Connection::connect(server_config()).await.unwrap();

    assert_eq!(conn.status(), ConnectionStatus::Ready);
    let info = conn.server_info().expect("server info");
    assert_eq!(info.name, "mcp-test-server");
    assert_eq!(info.version, "0.1.0");
    assert_eq!(conn.protocol_version().as_deref(), Some("2025-11-25"));

    let caps = conn.server_capabilities().expect("capabilities");
    use mcpkit::capabilities::ServerFeature;
    assert!(caps.supports(ServerFeature::Tools));
    assert!(caps.supports_list_changed(ServerFeature::Tools));
    assert!(caps.supports(ServerFeature::Resources));
    assert!(!caps.supports_subscribe());
    assert!(!caps.supports(ServerFeature::Prompts));

    conn.disconnect().await;
}

#[tokio::test]
async fn test_ping_round_trip() {
    let conn = Connection::connect(server_config()).await.unwrap();
    conn.ping().await.unwrap();
    conn.disconnect().await;
}

#[tokio::test]
async fn test_list_tools_returns_advertised_tools() {
    let conn = Connection::connect(server_config()).await.unwrap();
    let tools = conn.list_tools().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "sleep"]);
    conn.disconnect().await;
}

#[tokio::test]
async fn test_call_tool_echo_round_trip() {
    let conn = Connection::connect(server_config()).await.unwrap();
    let result = conn
        .call_tool("echo", Some(serde_json::json!({ "message": "round trip" })))
        .await
        .unwrap();
    assert_eq!(text_content(&result), "round trip");
    assert_eq!(result.is_error, Some(false));
    conn.disconnect().await;
}

#[tokio::test]
async fn test_unknown_tool_error_surfaces_unchanged() {
    let conn = Connection::connect(server_config()).await.unwrap();
    let err = conn.call_tool("nope", None).await.unwrap_err();

    assert_eq!(rpc_code(&err), Some(-32602));
    assert!(
        err.to_string().contains("Unknown tool: nope"),
        "server message must pass through verbatim: {err}"
    );
    conn.disconnect().await;
}

#[tokio::test]
async fn test_unknown_method_yields_method_not_found() {
    let conn = Connection::connect(server_config()).await.unwrap();
    let err = conn
        .request("frobnicate/thing", serde_json::json!({}), None)
        .await
        .unwrap_err();
    assert_eq!(rpc_code(&err), Some(-32601));
    conn.disconnect().await;
}

#[tokio::test]
async fn test_resources_list_and_read() {
    let conn = Connection::connect(server_config()).await.unwrap();

    let resources = conn.list_resources().await.unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].uri, "mem://greeting");

    let contents = conn.read_resource("mem://greeting").await.unwrap();
    assert_eq!(contents.len(), 1);
    assert_eq!(
        contents[0].text.as_deref(),
        Some("hello from the test server")
    );

    let err = conn.read_resource("mem://missing").await.unwrap_err();
    assert_eq!(rpc_code(&err), Some(-32003));

    conn.disconnect().await;
}

#[tokio::test]
async fn test_unanswered_request_times_out_and_connection_survives() {
    let conn = Connection::connect(server_config()).await.unwrap();

    let err = conn
        .request(
            "tools/call",
            serde_json::json!({ "name": "sleep" }),
            Some(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();
    assert_eq!(rpc_code(&err), Some(-32001));
    assert_eq!(conn.tracker_stats().timed_out, 1);

    // A timeout is not fatal: the same connection keeps working.
    assert_eq!(conn.status(), ConnectionStatus::Ready);
    conn.ping().await.unwrap();

    conn.disconnect().await;
}

#[tokio::test]
async fn test_server_crash_fails_outstanding_request_with_connection_closed() {
    let conn = Arc::new(Connection::connect(server_config()).await.unwrap());

    let err = conn
        .request(
            "tools/call",
            serde_json::json!({ "name": "crash" }),
            Some(Duration::from_secs(5)),
        )
        .await
        .unwrap_err();
    assert_eq!(rpc_code(&err), Some(-32000));

    // Closure is terminal.
    let err = conn
        .request("ping", serde_json::json!({}), None)
        .await
        .unwrap_err();
    assert!(
        err.to_string().contains("not ready, current=disconnected"),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn test_concurrent_requests_resolve_independently() {
    let conn = Arc::new(Connection::connect(server_config()).await.unwrap());

    let mut tasks = Vec::new();
    for i in 0..4 {
        let conn = Arc::clone(&conn);
        tasks.push(tokio::spawn(async move {
            let message = format!("msg-{i}");
            let result = conn
                .call_tool("echo", Some(serde_json::json!({ "message": message })))
                .await?;
            anyhow::Ok(text_content(&result))
        }));
    }

    let mut echoed = Vec::new();
    for task in tasks {
        echoed.push(task.await.unwrap().unwrap());
    }
    echoed.sort();
    assert_eq!(echoed, vec!["msg-0", "msg-1", "msg-2", "msg-3"]);

    conn.disconnect().await;
}

#[tokio::test]
async fn test_disconnect_tears_down_cleanly() {
    let conn = Connection::connect(server_config()).await.unwrap();
    assert!(conn.is_connected());

    conn.disconnect().await;
    assert_eq!(conn.status(), ConnectionStatus::Disconnected);

    let err = conn
        .request("ping", serde_json::json!({}), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not ready"));
}

#[tokio::test]
async fn test_pool_over_stdio_servers_round_robin() {
    let pool = Pool::connect(
        PoolConfig::homogeneous(3, server_config()).with_strategy(Strategy::RoundRobin),
    )
    .await
    .unwrap();
    assert_eq!(pool.len(), 3);
    assert_eq!(pool.live_count(), 3);

    let mut counts = std::collections::HashMap::new();
    for _ in 0..9 {
        let conn = pool.checkout().unwrap();
        *counts.entry(Arc::as_ptr(&conn) as usize).or_insert(0usize) += 1;
        conn.ping().await.unwrap();
    }
    assert_eq!(counts.len(), 3);
    assert!(counts.values().all(|&c| c == 3));

    for _ in 0..3 {
        pool.checkout().unwrap().disconnect().await;
    }
    assert!(pool.checkout().is_err());
}
