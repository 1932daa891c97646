//! Wire protocol shared by the linkcast Hub and its Agents.
//!
//! Commands travel Hub -> Agent as one JSON object per message. Senders
//! terminate every document with `\n`; receivers accept both
//! newline-delimited and back-to-back documents (see [`frame`]).

pub mod command;
pub mod constants;
pub mod error;
pub mod frame;

// Re-export primary types for convenience.
pub use command::{Command, decode, encode};
pub use error::ProtocolError;
pub use frame::FrameDecoder;
