//! Configuration management for TaskClaw
//!
//! Configuration is loaded from `~/.taskclaw/config.json` with environment
//! variable overrides following the pattern `TASKCLAW_SECTION_KEY`.

mod types;

pub use types::*;

use crate::error::Result;
use std::path::PathBuf;

impl Config {
    /// Returns the TaskClaw configuration directory path (~/.taskclaw)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".taskclaw")
    }

    /// Returns the path to the config file (~/.taskclaw/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Save configuration to the default path, creating the directory if needed.
    pub fn save(&self) -> Result<()> {
        let dir = Self::dir();
        std::fs::create_dir_all(&dir)?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(Self::path(), content)?;
        Ok(())
    }

    /// Returns the workspace directory with `~` expanded to the home dir.
    pub fn workspace_path(&self) -> PathBuf {
        let raw = &self.agents.defaults.workspace;
        if let Some(stripped) = raw.strip_prefix("~/") {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(stripped)
        } else if raw == "~" {
            dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
        } else {
            PathBuf::from(raw)
        }
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TASKCLAW_AGENTS_DEFAULTS_MODEL") {
            self.agents.defaults.model = val;
        }
        if let Ok(val) = std::env::var("TASKCLAW_AGENTS_DEFAULTS_MAX_TOKENS") {
            if let Ok(v) = val.parse() {
                self.agents.defaults.max_tokens = v;
            }
        }
        if let Ok(val) = std::env::var("TASKCLAW_AGENTS_DEFAULTS_MAX_ROUNDS") {
            if let Ok(v) = val.parse() {
                self.agents.defaults.max_rounds = v;
            }
        }
        if let Ok(val) = std::env::var("TASKCLAW_AGENTS_DEFAULTS_WINDOW_MESSAGES") {
            if let Ok(v) = val.parse() {
                self.agents.defaults.window_messages = v;
            }
        }
        if let Ok(val) = std::env::var("TASKCLAW_AGENTS_DEFAULTS_WORKSPACE") {
            self.agents.defaults.workspace = val;
        }
        if let Ok(val) = std::env::var("TASKCLAW_MEMORY_COMPACTION_THRESHOLD_TOKENS") {
            if let Ok(v) = val.parse() {
                self.memory.compaction_threshold_tokens = v;
            }
        }
        if let Ok(val) = std::env::var("TASKCLAW_MEMORY_KEEP_RECENT") {
            if let Ok(v) = val.parse() {
                self.memory.keep_recent = v;
            }
        }

        // Provider keys: TASKCLAW_* takes precedence, the provider's own
        // conventional variable is accepted as a fallback.
        let anthropic_key = std::env::var("TASKCLAW_PROVIDERS_ANTHROPIC_API_KEY")
            .or_else(|_| std::env::var("ANTHROPIC_API_KEY"));
        if let Ok(val) = anthropic_key {
            let provider = self
                .providers
                .anthropic
                .get_or_insert_with(ProviderConfig::default);
            provider.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("TASKCLAW_PROVIDERS_ANTHROPIC_API_BASE") {
            let provider = self
                .providers
                .anthropic
                .get_or_insert_with(ProviderConfig::default);
            provider.api_base = Some(val);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = PathBuf::from("/nonexistent/taskclaw-config.json");
        let cfg = Config::load_from_path(&path).unwrap();
        assert_eq!(cfg.agents.defaults.max_rounds, 50);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"agents":{"defaults":{"model":"file-model","max_rounds":7}}}"#,
        )
        .unwrap();
        let cfg = Config::load_from_path(&path).unwrap();
        assert_eq!(cfg.agents.defaults.model, "file-model");
        assert_eq!(cfg.agents.defaults.max_rounds, 7);
    }

    #[test]
    fn test_load_invalid_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(Config::load_from_path(&path).is_err());
    }

    #[test]
    fn test_workspace_path_expansion() {
        let mut cfg = Config::default();
        cfg.agents.defaults.workspace = "/tmp/ws".to_string();
        assert_eq!(cfg.workspace_path(), PathBuf::from("/tmp/ws"));

        cfg.agents.defaults.workspace = "~/ws".to_string();
        let expanded = cfg.workspace_path();
        assert!(expanded.to_string_lossy().ends_with("ws"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_config_dir_under_home() {
        let dir = Config::dir();
        assert!(dir.to_string_lossy().ends_with(".taskclaw"));
    }
}
