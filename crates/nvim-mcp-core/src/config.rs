//! Configuration types for the Neovim MCP Server.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Address used when neither the config file nor the environment names one.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/nvim";

/// Environment variable overriding `neovim.socket_path`.
pub const SOCKET_PATH_ENV: &str = "NVIM_SOCKET_PATH";

/// Environment variable overriding `security.allow_shell_commands`.
pub const ALLOW_SHELL_ENV: &str = "ALLOW_SHELL_COMMANDS";

/// Server configuration loaded from YAML file and environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Server settings
    pub server: ServerSettings,
    /// Neovim connection settings
    pub neovim: NeovimSettings,
    /// Security settings
    pub security: SecuritySettings,
}

impl ServerConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let config: ServerConfig =
            serde_yaml::from_str(yaml).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(SOCKET_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            self.neovim.socket_path = path;
        }
        if let Some(flag) = lookup(ALLOW_SHELL_ENV) {
            self.security.allow_shell_commands = parse_flag(&flag);
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> crate::Result<()> {
        if self.neovim.socket_path.trim().is_empty() {
            return Err(crate::Error::Config(
                "neovim.socket_path must not be empty".to_string(),
            ));
        }

        if self.neovim.request_timeout_ms == Some(0) {
            return Err(crate::Error::Config(
                "neovim.request_timeout_ms must be > 0 when set".to_string(),
            ));
        }

        if self.server.transport != "stdio" {
            return Err(crate::Error::Config(format!(
                "unsupported transport '{}' (only stdio is available)",
                self.server.transport
            )));
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Transport type (only stdio)
    pub transport: String,
    /// Log level used when RUST_LOG is unset (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            transport: "stdio".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Neovim connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeovimSettings {
    /// Unix socket path, or `host:port` for a TCP listener
    pub socket_path: String,
    /// Per-request timeout in milliseconds (None = wait indefinitely)
    pub request_timeout_ms: Option<u64>,
}

impl Default for NeovimSettings {
    fn default() -> Self {
        Self {
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
            request_timeout_ms: None,
        }
    }
}

/// Security settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SecuritySettings {
    /// Allow `!cmd` shell execution through the editor
    pub allow_shell_commands: bool,
}
