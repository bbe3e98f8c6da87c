//! Server configuration: TOML file, environment override and defaults.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{MupError, MupResult, PerformanceLimits, SecurityPolicy, ServerCapabilities};

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "MUP_SERVER_CONFIG";

/// Full server configuration. Every section, and every key within a
/// section, may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener and logging.
    pub server: ServerSection,
    /// Advertised security policy.
    pub security: SecurityPolicy,
    /// Advertised and enforced limits.
    pub performance: PerformanceLimits,
    /// Advertised external connectors.
    pub connectors: ConnectorSection,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Bind host. Default: `127.0.0.1`.
    pub host: String,
    /// Bind port. Default: `8080`.
    pub port: u16,
    /// WebSocket route. Default: `/mup`.
    pub path: String,
    /// Log filter used when `RUST_LOG` is unset. Default: `info`.
    pub log_level: String,
    /// Register the sample form and table at startup. Default: `true`.
    pub seed_sample_components: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            path: "/mup".to_string(),
            log_level: "info".to_string(),
            seed_sample_components: true,
        }
    }
}

/// `[connectors]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorSection {
    /// Connector names. Default: `postgres`, `file_system`, `web_api`.
    pub names: Vec<String>,
}

impl Default for ConnectorSection {
    fn default() -> Self {
        Self {
            names: vec![
                "postgres".to_string(),
                "file_system".to_string(),
                "web_api".to_string(),
            ],
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> MupResult<Self> {
        toml::from_str(raw).map_err(|e| MupError::Config(e.to_string()))
    }

    /// `host:port` as a socket address.
    pub fn listen_addr(&self) -> MupResult<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|e| MupError::Config(format!("invalid listen address '{addr}': {e}")))
    }

    /// Capabilities advertised under this configuration, without handler names.
    pub fn capabilities(&self) -> ServerCapabilities {
        let mut capabilities = ServerCapabilities::default_capabilities();
        capabilities.security_policy = self.security.clone();
        capabilities.performance_limits = self.performance.clone();
        capabilities.external_connector_names = self.connectors.names.clone();
        capabilities
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> MupResult<()> {
        self.listen_addr()?;
        if !self.server.path.starts_with('/') {
            return Err(MupError::Config(format!(
                "server.path must start with '/', got '{}'",
                self.server.path
            )));
        }
        if self.performance.max_concurrent_clients == 0 {
            return Err(MupError::Config(
                "performance.max_concurrent_clients must be at least 1".to_string(),
            ));
        }
        if self.performance.batch_operation_limit == 0 {
            return Err(MupError::Config(
                "performance.batch_operation_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pick the config file: explicit path, then `MUP_SERVER_CONFIG`, then none.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }
    std::env::var(CONFIG_ENV_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// Load configuration from `path`, or defaults when `None`.
pub fn load_config(path: Option<&Path>) -> MupResult<ServerConfig> {
    let Some(path) = path else {
        tracing::debug!("No config file given; using defaults");
        return Ok(ServerConfig::default());
    };

    let raw = std::fs::read_to_string(path)
        .map_err(|e| MupError::Config(format!("cannot read {}: {e}", path.display())))?;
    let config: ServerConfig = toml::from_str(&raw)
        .map_err(|e| MupError::Config(format!("{}: {e}", path.display())))?;
    config.validate()?;

    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}
