//! Hub configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/linkcast/hub.toml`
//! - Windows: `%APPDATA%/linkcast/hub.toml`

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use linkcast_hub_server::HubConfig;
use linkcast_protocol::constants::{DEFAULT_BIND, DEFAULT_PORT};

/// Hub configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Interface to listen on.
    #[serde(default = "default_bind")]
    pub bind: IpAddr,

    /// TCP port agents dial.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Saved links file (next to this config by default).
    #[serde(default = "default_links_file")]
    pub links_file: PathBuf,
}

fn default_bind() -> IpAddr {
    DEFAULT_BIND
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_links_file() -> PathBuf {
    config_dir().join(linkcast_link_store::DEFAULT_FILE_NAME)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            links_file: default_links_file(),
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

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            bind: self.bind,
            port: self.port,
            ..HubConfig::default()
        }
    }
}

/// Returns the platform-specific configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("hub.toml")
}

fn config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".config").join("linkcast")
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("linkcast")
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        PathBuf::from("/tmp/linkcast")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.bind.to_string(), "0.0.0.0");
        assert_eq!(config.port, 9999);
        assert!(config.links_file.ends_with("saved_links.json"));
    }

    #[test]
    fn config_partial_toml() {
        let config: Config = toml::from_str("port = 8080").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind, DEFAULT_BIND);
    }

    #[test]
    fn config_path_not_empty() {
        assert!(config_path().to_string_lossy().contains("linkcast"));
    }

    #[test]
    fn load_creates_default_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hub.toml");

        let config = Config::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hub.toml");
        let config = Config {
            bind: "127.0.0.1".parse().unwrap(),
            port: 7000,
            links_file: tmp.path().join("links.json"),
        };

        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn hub_config_uses_address() {
        let config = Config {
            port: 1234,
            ..Config::default()
        };
        let hub = config.hub_config();
        assert_eq!(hub.port, 1234);
        assert_eq!(hub.bind, config.bind);
    }
}
