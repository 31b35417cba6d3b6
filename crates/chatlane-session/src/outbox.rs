use chatlane_frame::{encode, EncodedMessage, FrameError};
use chatlane_transport::validate_line_text;
use serde::Serialize;

use crate::error::Result;

/// Messages written by handlers while a tick is being processed.
///
/// Logic messages are encoded and size-checked on the spot, so a handler
/// sees an oversized message as an error from [`send`](Self::send). Both
/// lanes are flushed by the driver after dispatch completes.
#[derive(Debug)]
pub struct Outbox {
    max_frame_len: usize,
    logic: Vec<EncodedMessage>,
    chat: Vec<String>,
}

impl Outbox {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            max_frame_len,
            logic: Vec::new(),
            chat: Vec::new(),
        }
    }

    /// Encode and queue a logic-lane message.
    pub fn send<T: Serialize + ?Sized>(&mut self, tag: &str, payload: &T) -> Result<()> {
        let message = encode(tag, payload)?;
        self.send_encoded(message)
    }

    /// Queue an already encoded logic-lane message.
    pub fn send_encoded(&mut self, message: EncodedMessage) -> Result<()> {
        if message.char_len() > self.max_frame_len {
            return Err(FrameError::MessageTooLarge {
                tag: message.tag().to_string(),
                len: message.char_len(),
                max: self.max_frame_len,
            }
            .into());
        }
        self.logic.push(message);
        Ok(())
    }

    /// Queue a human-readable chat-lane line.
    pub fn chat(&mut self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        validate_line_text(&text)?;
        self.chat.push(text);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.logic.len() + self.chat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logic.is_empty() && self.chat.is_empty()
    }

    pub(crate) fn take_logic(&mut self) -> Vec<EncodedMessage> {
        std::mem::take(&mut self.logic)
    }

    pub(crate) fn take_chat(&mut self) -> Vec<String> {
        std::mem::take(&mut self.chat)
    }
}
