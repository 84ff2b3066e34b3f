//! Remote tool wrapper — adapts tool-server tools to the TaskClaw `Tool` trait.
//!
//! Deliberately stateless at the call site: each execution spawns a fresh
//! connection, runs the handshake, makes one call and closes. That trades
//! process-spawn cost for crash isolation — a hung server cannot leak a
//! long-lived connection into the agent.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::RpcServerConfig;
use crate::error::Result;
use crate::tools::{Tool, ToolContext};

use super::client::StdioClient;

/// How to reach one external tool server.
#[derive(Debug, Clone)]
pub struct ServerSpec {
    /// Server name; used as the tool-name prefix
    pub name: String,
    /// Command to spawn
    pub command: String,
    /// Command arguments
    pub args: Vec<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl From<&RpcServerConfig> for ServerSpec {
    fn from(config: &RpcServerConfig) -> Self {
        Self {
            name: config.name.clone(),
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Wraps a single remote tool as a local `Tool` implementation.
///
/// Tool names are prefixed with the server name: `{server}_{tool}`.
pub struct RpcToolWrapper {
    /// Tool name as exposed to the agent (prefixed with the server name)
    tool_name: String,
    /// Tool description from the server
    description: String,
    /// JSON schema for input parameters
    input_schema: Value,
    /// The original tool name on the server (without prefix)
    remote_name: String,
    /// Connection recipe for per-call spawning
    spec: ServerSpec,
}

impl RpcToolWrapper {
    /// Create a wrapper for one remote tool.
    pub fn new(spec: ServerSpec, remote_name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            tool_name: format!("{}_{}", spec.name, remote_name),
            description: description.to_string(),
            input_schema,
            remote_name: remote_name.to_string(),
            spec,
        }
    }

    /// The prefixed tool name.
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// The remote (unprefixed) tool name.
    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }
}

#[async_trait]
impl Tool for RpcToolWrapper {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.input_schema.clone()
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let client = StdioClient::spawn(
            &self.spec.name,
            &self.spec.command,
            &self.spec.args,
            self.spec.timeout,
        )
        .await?;

        let result = async {
            client.initialize().await?;
            client.call_tool(&self.remote_name, args).await
        }
        .await;

        client.close().await;
        result
    }
}

/// Connect to a server once, list its tools and return one wrapper per tool.
///
/// The listing connection is closed before returning; each wrapper spawns
/// its own connection per call.
pub async fn load_server_tools(spec: &ServerSpec) -> Result<Vec<RpcToolWrapper>> {
    let client =
        StdioClient::spawn(&spec.name, &spec.command, &spec.args, spec.timeout).await?;

    let listed = async {
        client.initialize().await?;
        client.list_tools().await
    }
    .await;

    client.close().await;

    Ok(listed?
        .into_iter()
        .map(|tool| {
            RpcToolWrapper::new(
                spec.clone(),
                &tool.name,
                &tool.description,
                tool.input_schema,
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> ServerSpec {
        ServerSpec {
            name: "files".to_string(),
            command: "/nonexistent/files-server".to_string(),
            args: vec![],
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_wrapper_name_prefixed() {
        let wrapper = RpcToolWrapper::new(spec(), "read", "Read a file", json!({"type":"object"}));
        assert_eq!(wrapper.tool_name(), "files_read");
        assert_eq!(wrapper.remote_name(), "read");
        assert_eq!(Tool::name(&wrapper), "files_read");
    }

    #[test]
    fn test_wrapper_schema_passthrough() {
        let schema = json!({
            "type": "object",
            "properties": {"path": {"type": "string"}},
            "required": ["path"]
        });
        let wrapper = RpcToolWrapper::new(spec(), "read", "desc", schema.clone());
        assert_eq!(wrapper.parameters(), schema);
        assert_eq!(wrapper.description(), "desc");
    }

    #[test]
    fn test_spec_from_config() {
        let config = RpcServerConfig {
            name: "files".to_string(),
            command: "/usr/bin/files-server".to_string(),
            args: vec!["--quiet".to_string()],
            timeout_secs: 7,
        };
        let spec = ServerSpec::from(&config);
        assert_eq!(spec.name, "files");
        assert_eq!(spec.args, vec!["--quiet".to_string()]);
        assert_eq!(spec.timeout, Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_execute_spawn_failure_surfaces() {
        let wrapper = RpcToolWrapper::new(spec(), "read", "desc", json!({"type":"object"}));
        let result = wrapper.execute(json!({}), &ToolContext::new()).await;
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("failed to spawn"));
    }

    #[tokio::test]
    async fn test_load_server_tools_spawn_failure() {
        let result = load_server_tools(&spec()).await;
        assert!(result.is_err());
    }
}
