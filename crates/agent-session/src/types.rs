//! Public types for the Agent Session.

use std::fmt;
use std::time::Duration;

use linkcast_protocol::Command;
use linkcast_protocol::constants::{DEFAULT_PORT, OPEN_DELAY, RETRY_INTERVAL};

/// Connection state of an Agent Session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport open.
    Disconnected,
    /// Dial in progress.
    Connecting,
    /// Connected and listening for commands.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        })
    }
}

/// Events emitted by the session while it runs.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(ConnectionState),
    /// A dial attempt failed. `retry_in` is `None` when the session gave up.
    DialFailed {
        attempt: u32,
        error: String,
        retry_in: Option<Duration>,
    },
    /// A well-formed command arrived and is about to be dispatched.
    CommandReceived(Command),
    /// Bytes that did not decode into a command; the connection stays open.
    DecodeFailed(String),
    /// A well-formed message with an action this agent does not know.
    Ignored(String),
}

/// Configuration for an Agent Session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Hub host name or IP.
    pub host: String,
    /// Hub port.
    pub port: u16,
    /// Fixed delay between failed dial attempts.
    pub retry_interval: Duration,
    /// Dial attempts before giving up; 0 retries forever.
    pub max_retries: u32,
    /// Delay between consecutive opens of a multi-URL command.
    pub open_delay: Duration,
}

impl SessionConfig {
    /// Creates a configuration with the default retry policy.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            retry_interval: RETRY_INTERVAL,
            max_retries: 0,
            open_delay: OPEN_DELAY,
        }
    }

    /// Returns `true` once `attempts` dials have used up the retry budget.
    pub fn retries_exhausted(&self, attempts: u32) -> bool {
        self.max_retries > 0 && attempts >= self.max_retries
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", DEFAULT_PORT)
    }
}
