//! Agent configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/linkcast/agent.toml`
//! - Windows: `%APPDATA%/linkcast/agent.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use linkcast_agent_session::SessionConfig;
use linkcast_protocol::constants::{DEFAULT_PORT, RETRY_INTERVAL};

/// Agent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Hub host name or IP address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Hub port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds to wait between connection attempts.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: f64,

    /// Connection attempts before giving up (0 = retry forever).
    #[serde(default)]
    pub max_retries: u32,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_retry_interval() -> f64 {
    RETRY_INTERVAL.as_secs_f64()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            retry_interval_secs: default_retry_interval(),
            max_retries: 0,
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or writes the defaults there if the
    /// file does not exist yet.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Session settings for this configuration.
    ///
    /// A negative or non-finite retry interval falls back to the default.
    pub fn session_config(&self) -> SessionConfig {
        let retry_interval =
            Duration::try_from_secs_f64(self.retry_interval_secs).unwrap_or(RETRY_INTERVAL);
        SessionConfig {
            retry_interval,
            max_retries: self.max_retries,
            ..SessionConfig::new(self.host.clone(), self.port)
        }
    }
}

/// Returns the platform-specific configuration file path.
pub fn config_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("linkcast")
            .join("agent.toml")
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("linkcast").join("agent.toml")
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        PathBuf::from("/tmp/linkcast/agent.toml")
    }
}
