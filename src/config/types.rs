//! Configuration types for TaskClaw.
//!
//! All sections use `#[serde(default)]` so a partial config file (or none at
//! all) yields a fully usable configuration.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Agent behaviour defaults applied to newly created agents.
    pub agents: AgentsConfig,
    /// Memory manager / compaction settings.
    pub memory: MemoryConfig,
    /// LLM provider credentials and endpoints.
    pub providers: ProvidersConfig,
    /// Logging format and level.
    pub logging: LoggingConfig,
    /// External stdio tool servers to expose as tools.
    pub rpc_servers: Vec<RpcServerConfig>,
}

/// Agent configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AgentsConfig {
    pub defaults: AgentDefaults,
}

/// Per-agent default parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentDefaults {
    /// Model identifier passed to the provider.
    pub model: String,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Hard cap on model-call/tool-execution rounds per turn.
    pub max_rounds: usize,
    /// Sliding cap on non-system messages sent per model call. Distinct from
    /// compaction: this bounds single-call payload size even before the
    /// memory manager has triggered.
    pub window_messages: usize,
    /// Workspace directory for file-oriented tools (`~` is expanded).
    pub workspace: String,
    /// Whether destructive tool calls require confirmation by default.
    pub safe_mode: bool,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250929".to_string(),
            max_tokens: 8192,
            temperature: 0.7,
            max_rounds: 50,
            window_messages: 40,
            workspace: "~/taskclaw".to_string(),
            safe_mode: false,
        }
    }
}

/// Memory manager settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Estimated token count at which compaction triggers.
    pub compaction_threshold_tokens: usize,
    /// Characters-per-token divisor for the default size estimator.
    pub chars_per_token: usize,
    /// Number of most-recent non-system messages kept verbatim ("hot" region).
    pub keep_recent: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            compaction_threshold_tokens: 16_000,
            chars_per_token: 4,
            keep_recent: 8,
        }
    }
}

/// Provider configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub anthropic: Option<ProviderConfig>,
}

/// Credentials and endpoint for one provider.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
}

/// Logging output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Optional log file path (JSON format only).
    pub file: Option<String>,
    /// Default filter level when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Compact,
            file: None,
            level: "info".to_string(),
        }
    }
}

/// One external stdio JSON-RPC tool server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcServerConfig {
    /// Server name; remote tools are exposed as `{name}_{tool}`.
    pub name: String,
    /// Command to spawn.
    pub command: String,
    /// Command arguments.
    pub args: Vec<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            command: String::new(),
            args: Vec::new(),
            timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.agents.defaults.max_rounds, 50);
        assert_eq!(cfg.agents.defaults.window_messages, 40);
        assert_eq!(cfg.memory.chars_per_token, 4);
        assert_eq!(cfg.memory.keep_recent, 8);
        assert!(cfg.providers.anthropic.is_none());
        assert!(cfg.rpc_servers.is_empty());
        assert!(!cfg.agents.defaults.safe_mode);
    }

    #[test]
    fn test_partial_config_deserializes() {
        let cfg: Config =
            serde_json::from_str(r#"{"agents":{"defaults":{"max_rounds":10}}}"#).unwrap();
        assert_eq!(cfg.agents.defaults.max_rounds, 10);
        // Unspecified fields fall back to defaults
        assert_eq!(cfg.agents.defaults.window_messages, 40);
        assert_eq!(cfg.memory.compaction_threshold_tokens, 16_000);
    }

    #[test]
    fn test_rpc_server_config() {
        let cfg: Config = serde_json::from_str(
            r#"{"rpc_servers":[{"name":"files","command":"/usr/local/bin/files-server"}]}"#,
        )
        .unwrap();
        assert_eq!(cfg.rpc_servers.len(), 1);
        assert_eq!(cfg.rpc_servers[0].name, "files");
        assert_eq!(cfg.rpc_servers[0].timeout_secs, 30);
    }

    #[test]
    fn test_config_roundtrip() {
        let mut cfg = Config::default();
        cfg.agents.defaults.model = "test-model".to_string();
        cfg.providers.anthropic = Some(ProviderConfig {
            api_key: Some("sk-test".to_string()),
            api_base: None,
        });
        let json = serde_json::to_string(&cfg).unwrap();
        let restored: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.agents.defaults.model, "test-model");
        assert_eq!(
            restored.providers.anthropic.unwrap().api_key.as_deref(),
            Some("sk-test")
        );
    }
}
