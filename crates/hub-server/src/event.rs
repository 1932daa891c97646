//! Hub activity events and the log sink they are delivered to.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// Callback receiving every [`HubEvent`].
///
/// Invoked synchronously from whichever task produced the event, so it must
/// not block.
pub type LogSink = Arc<dyn Fn(&HubEvent) + Send + Sync>;

/// Something worth telling the operator about.
///
/// `Display` renders the human-readable log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    Started { addr: SocketAddr },
    Stopped { closed: usize },
    PeerConnected { addr: SocketAddr },
    /// A new connection arrived from an address that was already registered.
    PeerReplaced { addr: SocketAddr },
    PeerDisconnected { addr: SocketAddr },
    /// Informational bytes sent by an Agent (the protocol is Hub -> Agent).
    PeerMessage { addr: SocketAddr, text: String },
    WriteFailed { addr: SocketAddr, reason: String },
    AcceptFailed { reason: String },
    Broadcast {
        action: &'static str,
        succeeded: usize,
        failed: usize,
    },
}

impl fmt::Display for HubEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started { addr } => write!(f, "Server started on {addr}"),
            Self::Stopped { closed } => {
                write!(f, "Server stopped ({closed} connections closed)")
            }
            Self::PeerConnected { addr } => write!(f, "New connection from {addr}"),
            Self::PeerReplaced { addr } => {
                write!(f, "Connection from {addr} replaced an existing one")
            }
            Self::PeerDisconnected { addr } => write!(f, "Client {} disconnected", addr.ip()),
            Self::PeerMessage { addr, text } => write!(f, "Message from {}: {text}", addr.ip()),
            Self::WriteFailed { addr, reason } => {
                write!(f, "Dropping {addr} after failed write: {reason}")
            }
            Self::AcceptFailed { reason } => write!(f, "Accept failed: {reason}"),
            Self::Broadcast {
                action,
                succeeded,
                failed,
            } => write!(
                f,
                "Sent {action} to {succeeded} clients ({failed} failed)"
            ),
        }
    }
}

impl HubEvent {
    /// Mirrors the event into `tracing` at a fitting level.
    pub(crate) fn trace(&self) {
        match self {
            Self::WriteFailed { addr, reason } => {
                tracing::warn!(peer = %addr, %reason, "write failed, peer removed");
            }
            Self::AcceptFailed { reason } => tracing::warn!(%reason, "accept failed"),
            Self::PeerMessage { addr, text } => {
                tracing::debug!(peer = %addr, %text, "inbound bytes from agent");
            }
            Self::Broadcast {
                action,
                succeeded,
                failed,
            } => tracing::info!(action, succeeded, failed, "broadcast finished"),
            other => tracing::info!("{other}"),
        }
    }
}
