//! Agent Session for linkcast.
//!
//! Maintains one outbound TCP connection to the Hub, reconnecting with a
//! fixed backoff whenever it drops, and turns every received [`Command`]
//! into URL opens on this machine.
//!
//! ```text
//! Disconnected --dial ok------------------> Connected (listening)
//! Disconnected --dial fails, retries left-> Disconnected (after backoff)
//! Connected    --read fails / EOF---------> Disconnected -> dial again
//! ```

mod dialer;
mod opener;
mod session;
pub mod types;

pub use dialer::{DialFuture, Dialer, TcpDialer};
pub use linkcast_protocol::Command;
pub use opener::{SystemOpener, UrlOpener};
pub use session::AgentSession;
pub use types::{ConnectionState, SessionConfig, SessionEvent};

use std::time::Duration;

/// Timeout for a single TCP dial attempt.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity suggested for the [`SessionEvent`] channel.
pub const EVENT_BUFFER_SIZE: usize = 64;

/// Errors produced by the Agent Session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("gave up after {attempts} connection attempts")]
    GaveUp { attempts: u32 },
}
