//! Error types for the wire protocol.

/// Errors produced while encoding or decoding commands.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("message without action")]
    MissingAction,

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("command requires at least one URL")]
    EmptyUrls,

    #[error("frame too large: {0} bytes buffered")]
    FrameTooLarge(usize),
}

impl ProtocolError {
    /// Returns `true` for errors a receiver should treat as a forward-compatible
    /// no-op rather than corrupt input.
    pub fn is_unknown_action(&self) -> bool {
        matches!(self, Self::UnknownAction(_))
    }
}
