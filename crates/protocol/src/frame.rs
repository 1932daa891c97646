//! Streaming decoder for the command stream.
//!
//! TCP does not preserve message boundaries, so a single read may carry a
//! partial document, exactly one, or several back to back. [`FrameDecoder`]
//! buffers raw reads and yields every complete document:
//!
//! ```text
//! {"action":"open_link","url":"a"}\n{"action":"open_link","url":"b"}\n   <- our senders
//! {"action": "open_link", "url": "a"}{"action": "open_link", "url": "b"}  <- legacy senders
//! ```
//!
//! A newline always ends a frame. Whatever is still open when one arrives is
//! reported as malformed and dropped, so a truncated document can never
//! absorb the command after it. Documents without a trailing newline are
//! yielded as soon as they close.

use crate::command::Command;
use crate::constants::MAX_FRAME_SIZE;
use crate::error::ProtocolError;

/// Incremental decoder fed with raw socket reads.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Bytes after the last newline seen.
    buf: Vec<u8>,
    /// `buf` held an incomplete document when last parsed.
    tail_open: bool,
}

enum Step {
    Value(serde_json::Value, usize),
    Incomplete(serde_json::Error),
    Empty,
    Malformed(serde_json::Error),
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes waiting for the rest of a document.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Appends `bytes` and returns every document completed by them, in
    /// stream order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<Command, ProtocolError>> {
        let mut frames = Vec::new();

        let mut rest = bytes;
        while let Some(nl) = rest.iter().position(|&b| b == b'\n') {
            self.buf.extend_from_slice(&rest[..nl]);
            rest = &rest[nl + 1..];
            let line = std::mem::take(&mut self.buf);
            self.tail_open = false;
            decode_line(&line, &mut frames);
        }

        // An open document can only close on a bracket, so reads without one
        // skip the reparse of everything buffered so far.
        let may_close = rest.iter().any(|&b| b == b'}' || b == b']');
        self.buf.extend_from_slice(rest);
        if !self.tail_open || may_close {
            self.drain_closed(&mut frames);
        }

        if self.buf.len() > MAX_FRAME_SIZE {
            let len = self.buf.len();
            self.buf.clear();
            self.tail_open = false;
            frames.push(Err(ProtocolError::FrameTooLarge(len)));
        }

        frames
    }

    /// Yields documents in the unterminated tail that are already closed.
    fn drain_closed(&mut self, frames: &mut Vec<Result<Command, ProtocolError>>) {
        self.tail_open = false;
        loop {
            match next_value(&self.buf) {
                Step::Value(value, used) => {
                    self.buf.drain(..used);
                    frames.push(Command::from_value(value));
                }
                Step::Incomplete(_) => {
                    self.tail_open = true;
                    break;
                }
                Step::Empty => {
                    self.buf.clear();
                    break;
                }
                Step::Malformed(e) => {
                    // Nothing to resynchronize on before the next newline.
                    frames.push(Err(e.into()));
                    self.buf.clear();
                    break;
                }
            }
        }
    }
}

/// Decodes every document on one newline-terminated line. A document still
/// open at the end of the line is truncated and reported once.
fn decode_line(line: &[u8], frames: &mut Vec<Result<Command, ProtocolError>>) {
    let mut offset = 0;
    loop {
        match next_value(&line[offset..]) {
            Step::Value(value, used) => {
                offset += used;
                frames.push(Command::from_value(value));
            }
            Step::Empty => return,
            Step::Incomplete(e) | Step::Malformed(e) => {
                frames.push(Err(e.into()));
                return;
            }
        }
    }
}

fn next_value(bytes: &[u8]) -> Step {
    let mut stream = serde_json::Deserializer::from_slice(bytes).into_iter::<serde_json::Value>();
    match stream.next() {
        Some(Ok(value)) => Step::Value(value, stream.byte_offset()),
        Some(Err(e)) if e.is_eof() => Step::Incomplete(e),
        Some(Err(e)) => Step::Malformed(e),
        None => Step::Empty,
    }
}
