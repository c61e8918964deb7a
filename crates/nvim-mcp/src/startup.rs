//! Command-line handling and server construction.

use std::sync::Arc;
use std::time::Duration;

use nvim_mcp_core::{Error, Result, ServerConfig};
use nvim_mcp_rpc::SocketConnector;
use nvim_mcp_session::NvimSession;

use crate::protocol::NvimMcpServer;

/// Options given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// `--config <path>`
    pub config: Option<String>,
    /// `--socket <addr>`
    pub socket: Option<String>,
}

impl CliArgs {
    /// Parse arguments, excluding the program name.
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let slot = match arg.as_str() {
                "--config" => &mut parsed.config,
                "--socket" => &mut parsed.socket,
                other => {
                    return Err(Error::InvalidInput(format!("unknown argument '{other}'")));
                }
            };
            let value = args
                .next()
                .ok_or_else(|| Error::InvalidInput(format!("{arg} requires a value")))?;
            *slot = Some(value);
        }
        Ok(parsed)
    }
}

/// Build the effective configuration.
///
/// Lowest to highest priority: defaults, the `--config` file, environment
/// variables, `--socket`.
pub fn load_config<F>(args: &CliArgs, env: F) -> Result<ServerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    config.apply_env_from(env);
    if let Some(socket) = &args.socket {
        config.neovim.socket_path = socket.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Construct the server described by `config`.
pub fn build_server(config: &ServerConfig) -> NvimMcpServer {
    let connector = SocketConnector::new(config.neovim.socket_path.clone())
        .with_timeout(config.neovim.request_timeout_ms.map(Duration::from_millis));
    let session = NvimSession::new(Arc::new(connector))
        .with_shell_commands(config.security.allow_shell_commands);
    NvimMcpServer::new(Arc::new(session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let parsed = CliArgs::parse(args(&["--socket", "/tmp/x", "--config", "c.yaml"])).unwrap();
        assert_eq!(parsed.socket.as_deref(), Some("/tmp/x"));
        assert_eq!(parsed.config.as_deref(), Some("c.yaml"));
        assert_eq!(CliArgs::parse(args(&[])).unwrap(), CliArgs::default());
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(CliArgs::parse(args(&["--socket"])).is_err());
        assert!(CliArgs::parse(args(&["--verbose"])).is_err());
    }

    #[test]
    fn test_socket_flag_beats_environment() {
        let env: HashMap<&str, &str> = [
            ("NVIM_SOCKET_PATH", "/tmp/from-env"),
            ("ALLOW_SHELL_COMMANDS", "true"),
        ]
        .into_iter()
        .collect();
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        let config = load_config(&CliArgs::default(), lookup).unwrap();
        assert_eq!(config.neovim.socket_path, "/tmp/from-env");
        assert!(config.security.allow_shell_commands);

        let cli = CliArgs {
            socket: Some("127.0.0.1:6666".to_string()),
            ..Default::default()
        };
        let config = load_config(&cli, lookup).unwrap();
        assert_eq!(config.neovim.socket_path, "127.0.0.1:6666");
    }

    #[test]
    fn test_missing_config_file() {
        let cli = CliArgs {
            config: Some("/nonexistent/nvim-mcp.yaml".to_string()),
            ..Default::default()
        };
        assert!(matches!(load_config(&cli, |_| None), Err(Error::Io(_))));
    }

    #[test]
    fn test_build_server_carries_settings() {
        let mut config = ServerConfig::default();
        config.neovim.socket_path = "/tmp/test-nvim".to_string();
        config.security.allow_shell_commands = true;

        let server = build_server(&config);
        assert_eq!(server.session().address(), "/tmp/test-nvim");
        assert!(server.session().allow_shell());
    }
}
