//! Controller Hub for linkcast.
//!
//! Listens for inbound Agent connections, keeps a registry of live peers
//! keyed by address, and fans [`Command`]s out to all of them. A failed write
//! evicts the peer; the Agent is expected to dial back on its own.
//!
//! Human-readable activity is surfaced through an injectable log sink
//! ([`Hub::on_log`]) in addition to `tracing`.

mod event;
mod registry;
mod server;

pub use event::{HubEvent, LogSink};
pub use linkcast_protocol::Command;
pub use server::{BroadcastReport, Hub, HubConfig, Started, Stopped};

use std::net::SocketAddr;

/// Errors produced by the Hub.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] linkcast_protocol::ProtocolError),
}
