//! Stdio JSON-RPC 2.0 client for external tool servers.
//!
//! Spawns a child process with piped stdio, frames messages with
//! `Content-Length` headers and correlates responses to requests by id.
//! Connection states: `Spawned → Initialized → Ready → Closed`; the
//! `initialize` request plus `initialized` notification handshake must run
//! before `tools/list` or `tools/call`.
//!
//! Each request gets a hard deadline. A timed-out request rejects and its
//! pending entry is removed, so the pending map never grows without bound.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

use crate::error::{Result, TaskError};

use super::framing::{encode_frame, FrameDecoder};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Child process started, handshake not begun
    Spawned,
    /// `initialize` request acknowledged
    Initialized,
    /// `initialized` notification sent; tool requests allowed
    Ready,
    /// Child terminated; no further requests accepted
    Closed,
}

/// Outcome delivered to a pending request.
type PendingResult = std::result::Result<Value, String>;

/// Map of in-flight request ids to their response channels. Invariant: at
/// most one entry per outstanding id; entries are removed on response,
/// timeout or close, whichever comes first.
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<PendingResult>>>>;

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Serialize)]
struct RpcNotification<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcIncoming {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// A remote tool advertised by `tools/list`.
#[derive(Debug, Clone)]
pub struct RemoteToolDef {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// One stdio JSON-RPC connection to a spawned tool server.
#[derive(Debug)]
pub struct StdioClient {
    server_name: String,
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    pending: PendingMap,
    next_id: AtomicU64,
    state: std::sync::Mutex<ConnectionState>,
    timeout: Duration,
    reader: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl StdioClient {
    /// Spawn `command args...` with piped stdio and start the reader task.
    ///
    /// # Errors
    /// Returns an error if the process cannot be spawned or its pipes are
    /// unavailable.
    pub async fn spawn(
        server_name: &str,
        command: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<Self> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                TaskError::Rpc(format!("failed to spawn '{}' for {}: {}", command, server_name, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TaskError::Rpc(format!("{}: no stdin pipe", server_name)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TaskError::Rpc(format!("{}: no stdout pipe", server_name)))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader = tokio::spawn(read_loop(
            stdout,
            Arc::clone(&pending),
            server_name.to_string(),
        ));

        debug!(server = %server_name, command = %command, "Spawned tool server");

        Ok(Self {
            server_name: server_name.to_string(),
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            pending,
            next_id: AtomicU64::new(0),
            state: std::sync::Mutex::new(ConnectionState::Spawned),
            timeout,
            reader: std::sync::Mutex::new(Some(reader)),
        })
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock().expect("state lock")
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().expect("state lock") = state;
    }

    /// Send a request and await its response, subject to the per-request
    /// timeout. The pending entry is removed when the response arrives or
    /// the deadline elapses, whichever comes first.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        if self.state() == ConnectionState::Closed {
            return Err(TaskError::Rpc(format!(
                "{}: connection is closed",
                self.server_name
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        if let Err(e) = self.write_frame(&serde_json::to_vec(&request)?).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(TaskError::Rpc(format!(
                    "{}: request '{}' (id {}) timed out after {}s",
                    self.server_name,
                    method,
                    id,
                    self.timeout.as_secs()
                )))
            }
            Ok(Err(_)) => {
                self.pending.lock().await.remove(&id);
                Err(TaskError::Rpc(format!(
                    "{}: connection closed before response to '{}'",
                    self.server_name, method
                )))
            }
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(message))) => Err(TaskError::Rpc(format!(
                "{}: {}",
                self.server_name, message
            ))),
        }
    }

    /// Send a notification (no id, no response expected).
    pub async fn notify(&self, method: &str, params: Value) -> Result<()> {
        if self.state() == ConnectionState::Closed {
            return Err(TaskError::Rpc(format!(
                "{}: connection is closed",
                self.server_name
            )));
        }
        let notification = RpcNotification {
            jsonrpc: "2.0",
            method,
            params,
        };
        self.write_frame(&serde_json::to_vec(&notification)?).await
    }

    async fn write_frame(&self, body: &[u8]) -> Result<()> {
        let frame = encode_frame(body);
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(&frame).await.map_err(|e| {
            TaskError::Rpc(format!("{}: write failed: {}", self.server_name, e))
        })?;
        stdin.flush().await.map_err(|e| {
            TaskError::Rpc(format!("{}: flush failed: {}", self.server_name, e))
        })?;
        Ok(())
    }

    /// Run the `initialize` handshake expected by tool servers.
    pub async fn initialize(&self) -> Result<()> {
        self.request(
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {
                    "name": "taskclaw",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        )
        .await?;
        self.set_state(ConnectionState::Initialized);

        self.notify("notifications/initialized", json!({})).await?;
        self.set_state(ConnectionState::Ready);
        Ok(())
    }

    /// List the tools the server advertises. Requires `Ready`.
    pub async fn list_tools(&self) -> Result<Vec<RemoteToolDef>> {
        self.ensure_ready()?;
        let result = self.request("tools/list", json!({})).await?;
        let tools = result
            .get("tools")
            .and_then(|t| t.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(tools
            .iter()
            .filter_map(|tool| {
                Some(RemoteToolDef {
                    name: tool.get("name")?.as_str()?.to_string(),
                    description: tool
                        .get("description")
                        .and_then(|d| d.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    input_schema: tool
                        .get("inputSchema")
                        .cloned()
                        .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
                })
            })
            .collect())
    }

    /// Invoke a remote tool and return its text output. Requires `Ready`.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<String> {
        self.ensure_ready()?;
        let result = self
            .request("tools/call", json!({"name": name, "arguments": arguments}))
            .await?;

        let text = result
            .get("content")
            .and_then(|c| c.as_array())
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|block| {
                        if block.get("type").and_then(|t| t.as_str()) == Some("text") {
                            block.get("text").and_then(|t| t.as_str())
                        } else {
                            None
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        if result
            .get("isError")
            .and_then(|e| e.as_bool())
            .unwrap_or(false)
        {
            return Err(TaskError::Rpc(if text.is_empty() {
                format!("{}: tool '{}' returned an error", self.server_name, name)
            } else {
                text
            }));
        }

        Ok(text)
    }

    fn ensure_ready(&self) -> Result<()> {
        let state = self.state();
        if state != ConnectionState::Ready {
            return Err(TaskError::Rpc(format!(
                "{}: connection not ready (state {:?}); run initialize first",
                self.server_name, state
            )));
        }
        Ok(())
    }

    /// Terminate the child process and reject everything still pending.
    ///
    /// After close the client accepts no further requests.
    pub async fn close(&self) {
        self.set_state(ConnectionState::Closed);

        if let Some(reader) = self.reader.lock().expect("reader lock").take() {
            reader.abort();
        }

        {
            let mut pending = self.pending.lock().await;
            for (_, tx) in pending.drain() {
                let _ = tx.send(Err("connection closed".to_string()));
            }
        }

        let mut child = self.child.lock().await;
        if let Err(e) = child.kill().await {
            debug!(server = %self.server_name, error = %e, "Child already exited");
        }
    }
}

/// Reader task: decode frames off the child's stdout and resolve pending
/// requests by id. Frames with no id (server notifications) and unmatched
/// ids are logged and dropped.
async fn read_loop(mut stdout: ChildStdout, pending: PendingMap, server_name: String) {
    let mut decoder = FrameDecoder::new();
    let mut chunk = [0u8; 4096];

    loop {
        match stdout.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => decoder.push(&chunk[..n]),
        }

        while let Some(frame) = decoder.next_frame() {
            let incoming: RpcIncoming = match serde_json::from_slice(&frame) {
                Ok(incoming) => incoming,
                Err(e) => {
                    warn!(server = %server_name, error = %e, "Discarding unparseable frame");
                    continue;
                }
            };

            let Some(id) = incoming.id.as_ref().and_then(|v| v.as_u64()) else {
                debug!(server = %server_name, "Ignoring server notification");
                continue;
            };

            let sender = {
                let mut pending = pending.lock().await;
                pending.remove(&id)
            };
            let Some(sender) = sender else {
                warn!(server = %server_name, id, "Response for unknown or expired request");
                continue;
            };

            let outcome = match incoming.error {
                Some(err) => Err(format!("server error {}: {}", err.code, err.message)),
                None => Ok(incoming.result.unwrap_or(Value::Null)),
            };
            let _ = sender.send(outcome);
        }
    }

    // Child went away: fail whatever is still waiting
    let mut pending = pending.lock().await;
    for (_, tx) in pending.drain() {
        let _ = tx.send(Err("server closed the connection".to_string()));
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Write an executable /bin/sh script server for tests.
    ///
    /// Mirrors how plugin binaries are tested elsewhere: a TempDir plus an
    /// explicit script file, since some CI environments mount /tmp noexec.
    fn create_script_server(content: &str) -> (tempfile::TempDir, PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script_path = dir.path().join("server.sh");
        std::fs::write(&script_path, format!("#!/bin/sh\n{}", content)).unwrap();
        std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755)).unwrap();
        (dir, script_path)
    }

    /// Script fragment that reads one framed message body into `$body`.
    const READ_FRAME: &str = r#"read header
len=$(printf '%s' "$header" | tr -d '\r' | cut -d' ' -f2)
read blank
body=$(dd bs=1 count="$len" 2>/dev/null)"#;

    /// Script fragment that writes `$resp` as a framed message.
    const WRITE_FRAME: &str = r#"printf 'Content-Length: %s\r\n\r\n%s' "${#resp}" "$resp""#;

    #[tokio::test]
    async fn test_spawn_failure() {
        let result = StdioClient::spawn(
            "ghost",
            "/nonexistent/tool-server",
            &[],
            Duration::from_secs(1),
        )
        .await;
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("failed to spawn"));
    }

    #[tokio::test]
    async fn test_request_response_roundtrip() {
        let (_dir, script) = create_script_server(&format!(
            "{READ_FRAME}\nresp='{{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{{\"ok\":true}}}}'\n{WRITE_FRAME}"
        ));
        let client = StdioClient::spawn(
            "test",
            script.to_str().unwrap(),
            &[],
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(client.state(), ConnectionState::Spawned);
        let result = client.request("ping", json!({})).await.unwrap();
        assert_eq!(result["ok"], true);

        client.close().await;
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_server_error_response() {
        let (_dir, script) = create_script_server(&format!(
            "{READ_FRAME}\nresp='{{\"jsonrpc\":\"2.0\",\"id\":1,\"error\":{{\"code\":-32601,\"message\":\"method not found\"}}}}'\n{WRITE_FRAME}"
        ));
        let client = StdioClient::spawn(
            "test",
            script.to_str().unwrap(),
            &[],
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        let result = client.request("bogus", json!({})).await;
        client.close().await;

        let err = result.unwrap_err().to_string();
        assert!(err.contains("-32601"), "err was: {}", err);
        assert!(err.contains("method not found"), "err was: {}", err);
    }

    #[tokio::test]
    async fn test_request_timeout_clears_pending() {
        // Server that swallows input and never answers
        let (_dir, script) = create_script_server("cat > /dev/null");
        let client = StdioClient::spawn(
            "slow",
            script.to_str().unwrap(),
            &[],
            Duration::from_millis(200),
        )
        .await
        .unwrap();

        let result = client.request("ping", json!({})).await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("timed out"), "err was: {}", err);

        // Pending entry must be gone — no unbounded growth
        assert!(client.pending.lock().await.is_empty());
        client.close().await;
    }

    #[tokio::test]
    async fn test_requests_rejected_after_close() {
        let (_dir, script) = create_script_server("cat > /dev/null");
        let client = StdioClient::spawn(
            "closing",
            script.to_str().unwrap(),
            &[],
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        client.close().await;

        let result = client.request("ping", json!({})).await;
        assert!(result.unwrap_err().to_string().contains("closed"));
        let result = client.notify("note", json!({})).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_tool_requests_require_ready() {
        let (_dir, script) = create_script_server("cat > /dev/null");
        let client = StdioClient::spawn(
            "unready",
            script.to_str().unwrap(),
            &[],
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        let err = client.list_tools().await.unwrap_err().to_string();
        assert!(err.contains("not ready"), "err was: {}", err);
        let err = client
            .call_tool("x", json!({}))
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("not ready"), "err was: {}", err);

        client.close().await;
    }

    #[tokio::test]
    async fn test_initialize_handshake_reaches_ready() {
        // Answers the initialize request (id 1), absorbs the notification,
        // then answers tools/list (id 2).
        let script_body = format!(
            r#"{READ_FRAME}
resp='{{"jsonrpc":"2.0","id":1,"result":{{"protocolVersion":"2024-11-05"}}}}'
{WRITE_FRAME}
{READ_FRAME}
{READ_FRAME}
resp='{{"jsonrpc":"2.0","id":2,"result":{{"tools":[{{"name":"lookup","description":"Look things up","inputSchema":{{"type":"object","properties":{{"q":{{"type":"string"}}}}}}}}]}}}}'
{WRITE_FRAME}"#
        );
        let (_dir, script) = create_script_server(&script_body);
        let client = StdioClient::spawn(
            "handshake",
            script.to_str().unwrap(),
            &[],
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        client.initialize().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Ready);

        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "lookup");
        assert_eq!(tools[0].description, "Look things up");
        assert_eq!(tools[0].input_schema["properties"]["q"]["type"], "string");

        client.close().await;
    }

    #[tokio::test]
    async fn test_call_tool_text_extraction() {
        let script_body = format!(
            r#"{READ_FRAME}
resp='{{"jsonrpc":"2.0","id":1,"result":{{}}}}'
{WRITE_FRAME}
{READ_FRAME}
{READ_FRAME}
resp='{{"jsonrpc":"2.0","id":2,"result":{{"content":[{{"type":"text","text":"line one"}},{{"type":"text","text":"line two"}}],"isError":false}}}}'
{WRITE_FRAME}"#
        );
        let (_dir, script) = create_script_server(&script_body);
        let client = StdioClient::spawn(
            "caller",
            script.to_str().unwrap(),
            &[],
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        client.initialize().await.unwrap();
        let text = client.call_tool("lookup", json!({"q": "x"})).await.unwrap();
        assert_eq!(text, "line one\nline two");

        client.close().await;
    }

    #[tokio::test]
    async fn test_call_tool_is_error_flag() {
        let script_body = format!(
            r#"{READ_FRAME}
resp='{{"jsonrpc":"2.0","id":1,"result":{{}}}}'
{WRITE_FRAME}
{READ_FRAME}
{READ_FRAME}
resp='{{"jsonrpc":"2.0","id":2,"result":{{"content":[{{"type":"text","text":"lookup exploded"}}],"isError":true}}}}'
{WRITE_FRAME}"#
        );
        let (_dir, script) = create_script_server(&script_body);
        let client = StdioClient::spawn(
            "caller",
            script.to_str().unwrap(),
            &[],
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        client.initialize().await.unwrap();
        let err = client
            .call_tool("lookup", json!({}))
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("lookup exploded"), "err was: {}", err);

        client.close().await;
    }

    #[tokio::test]
    async fn test_server_exit_rejects_pending() {
        // Server exits immediately without answering
        let (_dir, script) = create_script_server("exit 0");
        let client = StdioClient::spawn(
            "dead",
            script.to_str().unwrap(),
            &[],
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        let result = client.request("ping", json!({})).await;
        let err = result.unwrap_err().to_string();
        assert!(
            err.contains("closed") || err.contains("timed out") || err.contains("write failed"),
            "err was: {}",
            err
        );
        client.close().await;
    }
}
