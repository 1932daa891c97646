//! linkcast agent entry point.

mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use linkcast_agent_session::{AgentSession, SystemOpener};
use linkcast_protocol::constants::DEFAULT_PORT;

#[derive(Parser, Debug)]
#[command(name = "linkcast-agent")]
#[command(about = "Stay connected to a linkcast Hub and open the links it sends")]
#[command(version)]
struct Cli {
    /// Hub host name or IP address
    host: Option<String>,

    /// Hub port
    port: Option<String>,

    /// Give up after this many failed connection attempts (0 = never)
    #[arg(long)]
    retries: Option<u32>,

    /// Seconds between connection attempts
    #[arg(long)]
    retry_interval: Option<f64>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Parses the port argument, falling back to the default port.
fn resolve_port(raw: &str) -> u16 {
    match raw.parse() {
        Ok(port) => port,
        Err(_) => {
            tracing::warn!(
                port = raw,
                "invalid port, using default port {DEFAULT_PORT}"
            );
            DEFAULT_PORT
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting linkcast agent"
    );

    let config_path = cli.config.unwrap_or_else(config::config_path);
    let mut cfg = match config::Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            config::Config::default()
        }
    };

    if let Some(host) = cli.host {
        cfg.host = host;
    }
    if let Some(port) = cli.port.as_deref() {
        cfg.port = resolve_port(port);
    }
    if let Some(retries) = cli.retries {
        cfg.max_retries = retries;
    }
    if let Some(interval) = cli.retry_interval {
        cfg.retry_interval_secs = interval;
    }

    let session_config = cfg.session_config();
    tracing::info!(
        host = %session_config.host,
        port = session_config.port,
        "agent configured"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut session = AgentSession::new(session_config, SystemOpener);

        tokio::select! {
            err = session.run() => Err(anyhow::Error::new(err)),
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("SIGINT received, shutting down");
                Ok(())
            }
        }
    })?;

    tracing::info!("agent shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_port_is_used() {
        assert_eq!(resolve_port("8080"), 8080);
    }

    #[test]
    fn invalid_port_falls_back() {
        assert_eq!(resolve_port("http"), 9999);
        assert_eq!(resolve_port("70000"), 9999);
    }

    #[test]
    fn cli_positional_host_and_port() {
        let cli = Cli::parse_from(["linkcast-agent", "10.0.0.5", "8000", "--retries", "3"]);
        assert_eq!(cli.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(cli.port.as_deref(), Some("8000"));
        assert_eq!(cli.retries, Some(3));
        assert!(cli.retry_interval.is_none());
    }

    #[test]
    fn cli_host_only() {
        let cli = Cli::parse_from(["linkcast-agent", "hub.lan"]);
        assert_eq!(cli.host.as_deref(), Some("hub.lan"));
        assert!(cli.port.is_none());
    }
}
