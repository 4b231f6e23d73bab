//! Stdio transport for MCP subprocess servers
//!
//! [`StdioTransport`] spawns a server subprocess and exchanges
//! newline-delimited JSON with it: each outbound message is written to the
//! child's stdin as one line, and the child's stdout is read in chunks and
//! reassembled into frames by a [`MessageBuffer`].
//!
//! The child's stderr is forwarded to `tracing::debug!`. Per the MCP
//! specification, stderr output is diagnostic only and MUST NOT be treated
//! as an error condition.
//!
//! # Lifecycle
//!
//! [`StdioTransport::spawn`] starts three background Tokio tasks: a stdin
//! writer, a stdout reader, and a stderr drain; a fourth task reaps the
//! child and reports its exit status. Shutdown closes the child's stdin
//! first (the EOF is the stop signal most servers honor) and only kills the
//! process after a grace window. Dropping the transport sends a best-effort
//! SIGTERM on Unix.
//!
//! Event ordering is guaranteed by construction: the reaper waits for the
//! stdout reader to flush any buffered tail before it emits
//! [`TransportEvent::Closed`], so no `Message` can follow `Closed`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

use crate::buffer::MessageBuffer;
use crate::error::{McpError, Result};
use crate::transport::{TransportEvent, TransportEvents};

/// How long a child gets to exit on stdin EOF before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Commands accepted by the stdin writer task.
#[derive(Debug)]
enum WriteCmd {
    /// Write one serialized frame followed by a newline.
    Frame(String),
    /// Shut the stdin pipe down (EOF) and stop writing.
    Shutdown,
}

/// Resolve a configured command to an executable path.
///
/// A command containing a path separator is taken as-is (absolute paths
/// included); a bare name is searched for on `PATH`.
fn resolve_executable(command: &str) -> Result<PathBuf> {
    let path = Path::new(command);
    if path.components().count() > 1 || path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let search = std::env::var_os("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&search) {
        let candidate = dir.join(command);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(McpError::Spawn {
        command: command.to_string(),
        reason: "not found on PATH".to_string(),
    }
    .into())
}

/// Subprocess transport speaking newline-delimited JSON over stdio.
///
/// # Examples
///
/// ```no_run
/// use std::collections::HashMap;
/// use mcpkit::transport::stdio::StdioTransport;
///
/// # fn main() -> anyhow::Result<()> {
/// let (transport, events) = StdioTransport::spawn(
///     "npx",
///     vec!["-y".into(), "@modelcontextprotocol/server-filesystem".into(), "/tmp".into()],
///     HashMap::new(),
///     None,
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StdioTransport {
    /// Sender side of the stdin channel; `send()` writes here.
    stdin_tx: mpsc::UnboundedSender<WriteCmd>,
    /// Signals the reaper task to force-kill the child.
    kill_tx: mpsc::UnboundedSender<()>,
    /// False once the child has exited or `close()` was called.
    connected: Arc<AtomicBool>,
    /// True once the reaper has observed the exit status.
    exited: Arc<AtomicBool>,
    /// The child's OS pid, for signal delivery from `Drop`.
    pid: Option<u32>,
}

impl StdioTransport {
    /// Spawn the server subprocess with the default frame cap.
    ///
    /// The caller-supplied `env` entries override the inherited environment
    /// variable by variable. If `cd` is `Some`, the child's working
    /// directory is set accordingly.
    ///
    /// # Arguments
    ///
    /// * `command` - Executable name or path; bare names are resolved on `PATH`.
    /// * `args` - Command-line arguments for the server.
    /// * `env` - Environment overrides applied over the inherited environment.
    /// * `cd` - Optional working directory for the child.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Spawn`] when the executable cannot be resolved or
    /// the process cannot be started.
    pub fn spawn(
        command: &str,
        args: Vec<String>,
        env: HashMap<String, String>,
        cd: Option<PathBuf>,
    ) -> Result<(Self, TransportEvents)> {
        Self::spawn_with_frame_cap(command, args, env, cd, None)
    }

    /// Spawn with an explicit cap on unterminated stdout frames.
    ///
    /// Exceeding the cap is fatal: the transport emits an error event,
    /// kills the child, and closes.
    pub fn spawn_with_frame_cap(
        command: &str,
        args: Vec<String>,
        env: HashMap<String, String>,
        cd: Option<PathBuf>,
        max_frame_bytes: Option<usize>,
    ) -> Result<(Self, TransportEvents)> {
        let executable = resolve_executable(command)?;

        let mut cmd = Command::new(&executable);
        cmd.args(&args);
        cmd.envs(&env);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        if let Some(dir) = cd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| McpError::Spawn {
            command: executable.display().to_string(),
            reason: e.to_string(),
        })?;
        let pid = child.id();

        let stdin = child.stdin.take().ok_or_else(|| {
            McpError::Transport("child stdin unavailable after spawn".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            McpError::Transport("child stdout unavailable after spawn".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            McpError::Transport("child stderr unavailable after spawn".to_string())
        })?;

        let (event_tx, events) = mpsc::unbounded_channel::<TransportEvent>();
        let (stdin_tx, mut stdin_rx) = mpsc::unbounded_channel::<WriteCmd>();
        let (kill_tx, mut kill_rx) = mpsc::unbounded_channel::<()>();
        let (drained_tx, drained_rx) = oneshot::channel::<()>();

        let connected = Arc::new(AtomicBool::new(true));
        let exited = Arc::new(AtomicBool::new(false));

        // The transport is usable as soon as the process is up.
        let _ = event_tx.send(TransportEvent::Ready);

        // Writer: stdin channel -> child stdin, one line per frame.
        {
            let event_tx = event_tx.clone();
            tokio::spawn(async move {
                let mut stdin = stdin;
                loop {
                    match stdin_rx.recv().await {
                        Some(WriteCmd::Frame(frame)) => {
                            let line = format!("{frame}\n");
                            if let Err(e) = stdin.write_all(line.as_bytes()).await {
                                let _ = event_tx
                                    .send(TransportEvent::Error(format!("stdin write: {e}")));
                                break;
                            }
                            if let Err(e) = stdin.flush().await {
                                let _ = event_tx
                                    .send(TransportEvent::Error(format!("stdin flush: {e}")));
                                break;
                            }
                        }
                        // Shutdown or transport drop: EOF the pipe.
                        Some(WriteCmd::Shutdown) | None => {
                            let _ = stdin.shutdown().await;
                            break;
                        }
                    }
                }
            });
        }

        // Reader: child stdout -> message buffer -> Message events. The
        // buffered tail is flushed before the drained signal fires.
        {
            let event_tx = event_tx.clone();
            let kill_tx = kill_tx.clone();
            let cap = max_frame_bytes.unwrap_or(crate::buffer::DEFAULT_MAX_FRAME_BYTES);
            tokio::spawn(async move {
                let mut stdout = stdout;
                let mut buffer = MessageBuffer::with_max_frame_bytes(cap);
                let mut chunk = BytesMut::with_capacity(8 * 1024);
                loop {
                    chunk.clear();
                    match stdout.read_buf(&mut chunk).await {
                        Ok(0) => break,
                        Ok(_) => match buffer.append(&chunk) {
                            Ok(frames) => {
                                for frame in frames {
                                    let _ = event_tx.send(TransportEvent::Message(frame));
                                }
                            }
                            Err(e) => {
                                let _ = event_tx
                                    .send(TransportEvent::Error(format!("stdout framing: {e}")));
                                let _ = kill_tx.send(());
                                break;
                            }
                        },
                        Err(e) => {
                            let _ =
                                event_tx.send(TransportEvent::Error(format!("stdout read: {e}")));
                            break;
                        }
                    }
                }
                if let Some(frame) = buffer.reset() {
                    let _ = event_tx.send(TransportEvent::Message(frame));
                }
                tracing::debug!(
                    frames = buffer.frames_out(),
                    parse_errors = buffer.parse_errors(),
                    "mcp server stdout drained"
                );
                let _ = drained_tx.send(());
            });
        }

        // Stderr drain: diagnostic only, never an error condition.
        tokio::spawn(async move {
            let reader = BufReader::new(stderr);
            let mut lines = reader.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(target: "mcpkit::transport::stdio", "mcp server stderr: {line}");
            }
        });

        // Reaper: observe the exit status, then emit Closed after the
        // reader has flushed.
        {
            let connected = Arc::clone(&connected);
            let exited = Arc::clone(&exited);
            tokio::spawn(async move {
                let status = tokio::select! {
                    status = child.wait() => status,
                    _ = kill_rx.recv() => {
                        let _ = child.start_kill();
                        child.wait().await
                    }
                };
                exited.store(true, Ordering::SeqCst);
                // Message events for everything the child wrote come first.
                let _ = drained_rx.await;
                connected.store(false, Ordering::SeqCst);
                let reason = match status {
                    Ok(s) if s.success() => "normal".to_string(),
                    Ok(s) => s
                        .code()
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "killed".to_string()),
                    Err(e) => format!("wait failed: {e}"),
                };
                let _ = event_tx.send(TransportEvent::Closed(reason));
            });
        }

        Ok((
            Self {
                stdin_tx,
                kill_tx,
                connected,
                exited,
                pid,
            },
            events,
        ))
    }

    /// Enqueue a message for the child's stdin.
    ///
    /// Serialization and enqueueing are synchronous; the writer task
    /// performs the actual pipe write.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Transport`] when the transport is closed or the
    /// writer task has exited.
    pub fn send(&self, message: &Value) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(McpError::Transport("stdio transport closed".to_string()).into());
        }
        let frame = serde_json::to_string(message).map_err(McpError::Serialization)?;
        self.stdin_tx
            .send(WriteCmd::Frame(frame))
            .map_err(|_| McpError::Transport("stdin channel closed".to_string()).into())
    }

    /// Shut the transport down.
    ///
    /// Closes the child's stdin first (EOF is the stop signal), then kills
    /// the process if it has not exited within the grace window. Returns
    /// without waiting for the exit; the event stream ends with `Closed`.
    pub async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let _ = self.stdin_tx.send(WriteCmd::Shutdown);

        let kill_tx = self.kill_tx.clone();
        let exited = Arc::clone(&self.exited);
        tokio::spawn(async move {
            tokio::time::sleep(SHUTDOWN_GRACE).await;
            if !exited.load(Ordering::SeqCst) {
                let _ = kill_tx.send(());
            }
        });
    }

    /// Whether the child is still running and accepting writes.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for StdioTransport {
    /// Best-effort termination of the child process on drop.
    ///
    /// On Unix, sends SIGTERM to the child PID. On non-Unix platforms, the
    /// reaper task is asked to `start_kill`. This method MUST NOT block.
    fn drop(&mut self) {
        if self.exited.load(Ordering::SeqCst) {
            return;
        }
        #[cfg(unix)]
        {
            if let Some(pid) = self.pid {
                // SAFETY: pid is a valid process ID obtained from tokio::process::Child.
                unsafe {
                    libc::kill(pid as libc::pid_t, libc::SIGTERM);
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = self.kill_tx.send(());
        }
    }
}
