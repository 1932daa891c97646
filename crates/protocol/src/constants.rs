use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Default TCP port the Hub listens on and Agents dial.
pub const DEFAULT_PORT: u16 = 9999;

/// Default Hub bind address (all interfaces).
pub const DEFAULT_BIND: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Pending inbound connections queued by the listener before refusal.
pub const LISTEN_BACKLOG: u32 = 100;

/// Fixed delay between failed Agent dial attempts.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Delay between consecutive opens of an `open_multiple_links` command.
pub const OPEN_DELAY: Duration = Duration::from_millis(500);

/// Upper bound for a single broadcast write to one peer.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Size of each socket read on the Agent side.
pub const READ_CHUNK_SIZE: usize = 4096;

/// Size of each socket read in the Hub's per-peer reader.
pub const PEER_READ_SIZE: usize = 1024;

/// Maximum bytes buffered while waiting for a document to complete (1 MB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Wire value of the `action` field for [`Command::OpenOne`](crate::Command::OpenOne).
pub const ACTION_OPEN_LINK: &str = "open_link";

/// Wire value of the `action` field for [`Command::OpenMany`](crate::Command::OpenMany).
pub const ACTION_OPEN_MULTIPLE_LINKS: &str = "open_multiple_links";
