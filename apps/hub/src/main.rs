//! linkcast Hub entry point.

mod config;
mod console;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use linkcast_hub_server::Hub;
use linkcast_link_store::LinkStore;

#[derive(Parser, Debug)]
#[command(name = "linkcast-hub")]
#[command(about = "Open links on every connected agent")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Do not start listening until the `start` command
    #[arg(long)]
    no_autostart: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting linkcast Hub");

    let config_path = cli.config.unwrap_or_else(config::config_path);
    let mut cfg = match config::Config::load(&config_path) {
        Ok(c) => {
            tracing::info!(path = %config_path.display(), "configuration loaded");
            c
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            config::Config::default()
        }
    };
    if let Some(port) = cli.port {
        cfg.port = port;
    }

    let links = LinkStore::load(&cfg.links_file);
    tracing::info!(count = links.len(), "saved links loaded");

    let hub = Hub::new(cfg.hub_config());
    hub.on_log(|event| console::print_stamped(event));

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(console::run(
        console::Console::new(hub, links),
        !cli.no_autostart,
    ))?;

    tracing::info!("hub shut down cleanly");
    Ok(())
}
