use std::fmt;

use crate::codec::{char_len, EncodedMessage, FRAME_SEPARATOR};
use crate::error::{FrameError, Result};

/// A sealed frame: one outbound line of one or more encoded messages.
///
/// Frames are immutable once sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    text: String,
    chars: usize,
    messages: usize,
}

impl Frame {
    /// Wire text of the frame.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.chars
    }

    /// Number of messages packed into the frame.
    pub fn message_count(&self) -> usize {
        self.messages
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Packs encoded messages greedily, in arrival order, into length-bounded frames.
#[derive(Debug)]
pub struct FrameBatcher {
    buf: String,
    buf_chars: usize,
    buf_messages: usize,
    max_frame_len: usize,
}

impl FrameBatcher {
    /// Create a batcher bounded by `max_frame_len` characters.
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buf: String::with_capacity(max_frame_len),
            buf_chars: 0,
            buf_messages: 0,
            max_frame_len,
        }
    }

    /// Add a message to the unsealed frame.
    ///
    /// Returns the previously unsealed frame when `message` did not fit behind
    /// it; `message` then starts the new unsealed frame. A message longer than
    /// the budget on its own is rejected and leaves the batcher untouched.
    pub fn append(&mut self, message: EncodedMessage) -> Result<Option<Frame>> {
        if message.char_len() > self.max_frame_len {
            return Err(FrameError::MessageTooLarge {
                tag: message.tag().to_string(),
                len: message.char_len(),
                max: self.max_frame_len,
            });
        }

        if self.buf.is_empty() {
            self.push(&message);
            return Ok(None);
        }

        let separator = char_len(FRAME_SEPARATOR);
        if self.buf_chars + separator + message.char_len() > self.max_frame_len {
            let sealed = self.seal();
            self.push(&message);
            return Ok(sealed);
        }

        self.buf.push_str(FRAME_SEPARATOR);
        self.buf_chars += separator;
        self.push(&message);
        Ok(None)
    }

    /// Seal the unsealed frame, if it holds anything.
    pub fn seal(&mut self) -> Option<Frame> {
        if self.buf.is_empty() {
            return None;
        }
        let frame = Frame {
            text: std::mem::replace(&mut self.buf, String::with_capacity(self.max_frame_len)),
            chars: self.buf_chars,
            messages: self.buf_messages,
        };
        self.buf_chars = 0;
        self.buf_messages = 0;
        Some(frame)
    }

    /// Returns true if no message is waiting to be sealed.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Characters in the unsealed frame.
    pub fn pending_len(&self) -> usize {
        self.buf_chars
    }

    /// Messages in the unsealed frame.
    pub fn pending_messages(&self) -> usize {
        self.buf_messages
    }

    /// Frame budget in characters.
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    fn push(&mut self, message: &EncodedMessage) {
        self.buf.push_str(message.as_str());
        self.buf_chars += message.char_len();
        self.buf_messages += 1;
    }
}
