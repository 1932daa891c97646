use serde::{Deserialize, Serialize};

use crate::constants::{ACTION_OPEN_LINK, ACTION_OPEN_MULTIPLE_LINKS};
use crate::error::ProtocolError;

/// An instruction broadcast by the Hub to every connected Agent.
///
/// Serialized with the `action` field as the discriminant:
///
/// ```text
/// {"action": "open_link", "url": "<string>"}
/// {"action": "open_multiple_links", "urls": ["<string>", ...]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Command {
    /// Open a single URL.
    #[serde(rename = "open_link")]
    OpenOne { url: String },
    /// Open several URLs, in order.
    #[serde(rename = "open_multiple_links")]
    OpenMany { urls: Vec<String> },
}

impl Command {
    /// Creates an `open_link` command.
    pub fn open_one(url: impl Into<String>) -> Self {
        Self::OpenOne { url: url.into() }
    }

    /// Creates an `open_multiple_links` command.
    ///
    /// Rejects an empty list; the codec itself still round-trips one.
    pub fn open_many<I, S>(urls: I) -> Result<Self, ProtocolError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: Vec<String> = urls.into_iter().map(Into::into).collect();
        if urls.is_empty() {
            return Err(ProtocolError::EmptyUrls);
        }
        Ok(Self::OpenMany { urls })
    }

    /// Wire value of the `action` field.
    pub fn action(&self) -> &'static str {
        match self {
            Self::OpenOne { .. } => ACTION_OPEN_LINK,
            Self::OpenMany { .. } => ACTION_OPEN_MULTIPLE_LINKS,
        }
    }

    /// URLs carried by this command, in open order.
    pub fn urls(&self) -> &[String] {
        match self {
            Self::OpenOne { url } => std::slice::from_ref(url),
            Self::OpenMany { urls } => urls,
        }
    }

    /// Converts an already-parsed JSON document into a command.
    ///
    /// Distinguishes unknown actions (forward-compatible, ignorable) from
    /// documents that are structurally wrong.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProtocolError> {
        let action = match value.as_object() {
            Some(obj) => match obj.get("action").and_then(|a| a.as_str()) {
                Some(a) => a.to_owned(),
                None => return Err(ProtocolError::MissingAction),
            },
            None => return Err(ProtocolError::NotAnObject),
        };

        if action != ACTION_OPEN_LINK && action != ACTION_OPEN_MULTIPLE_LINKS {
            return Err(ProtocolError::UnknownAction(action));
        }

        Ok(serde_json::from_value(value)?)
    }
}

/// Encodes a command to its wire form: one JSON document plus `\n`.
pub fn encode(command: &Command) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = serde_json::to_vec(command)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decodes exactly one JSON document into a command.
///
/// Surrounding whitespace (including the trailing newline added by
/// [`encode`]) is ignored.
pub fn decode(bytes: &[u8]) -> Result<Command, ProtocolError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    Command::from_value(value)
}
