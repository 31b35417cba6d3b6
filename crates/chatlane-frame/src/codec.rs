use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{FrameError, Result};

/// Separator between a token's tag and its JSON payload.
pub const TAG_SEPARATOR: &str = "###";

/// Separator between tokens packed into one frame.
pub const FRAME_SEPARATOR: &str = "%%";

/// Default frame budget, in characters.
pub const DEFAULT_MAX_FRAME_LEN: usize = 480;

const PROVIDER_COMMAND: &str = " PRIVMSG #";
const PROVIDER_TEXT_DELIMITER: &str = " :";
const MAX_TAG_LEN: usize = 64;

/// Length of `text` as the provider counts it.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Check that `tag` can be carried on the wire.
///
/// Tags are short printable ASCII tokens with no whitespace and no `#` or `%`,
/// so they can never run into either separator.
pub fn validate_tag(tag: &str) -> Result<()> {
    let reason = if tag.is_empty() {
        "tag is empty"
    } else if tag.len() > MAX_TAG_LEN {
        "tag is longer than 64 bytes"
    } else if !tag.bytes().all(|b| b.is_ascii_graphic()) {
        "tag must be printable ASCII without whitespace"
    } else if tag.contains(['#', '%']) {
        "tag must not contain '#' or '%'"
    } else {
        return Ok(());
    };
    Err(FrameError::InvalidTag {
        tag: tag.to_string(),
        reason,
    })
}

/// One logical message encoded as `<tag>###<json>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMessage {
    text: String,
    tag_len: usize,
    chars: usize,
}

impl EncodedMessage {
    /// Wire text of the message.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The message tag.
    pub fn tag(&self) -> &str {
        &self.text[..self.tag_len]
    }

    /// The JSON payload text.
    pub fn json(&self) -> &str {
        &self.text[self.tag_len + TAG_SEPARATOR.len()..]
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.chars
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for EncodedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Encode `payload` under `tag`.
///
/// If the serialized payload contains the frame separator, every `%` is
/// written as the JSON escape `\u0025`; decoding yields the same value.
pub fn encode<T: Serialize + ?Sized>(tag: &str, payload: &T) -> Result<EncodedMessage> {
    validate_tag(tag)?;
    let mut json = serde_json::to_string(payload).map_err(FrameError::Serialize)?;
    if json.contains(FRAME_SEPARATOR) {
        json = json.replace('%', "\\u0025");
    }

    let mut text = String::with_capacity(tag.len() + TAG_SEPARATOR.len() + json.len());
    text.push_str(tag);
    text.push_str(TAG_SEPARATOR);
    text.push_str(&json);
    let chars = char_len(&text);

    Ok(EncodedMessage {
        text,
        tag_len: tag.len(),
        chars,
    })
}

/// Encode an already-serialized JSON payload under `tag`.
///
/// The JSON is parsed and re-emitted compactly, so pretty-printed input never
/// smuggles line breaks onto the wire.
pub fn encode_json(tag: &str, json: &str) -> Result<EncodedMessage> {
    let value: Value = serde_json::from_str(json).map_err(|source| FrameError::InvalidPayload {
        tag: tag.to_string(),
        source,
    })?;
    encode(tag, &value)
}

/// A decoded (or about-to-be-encoded) logical message.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalMessage {
    tag: String,
    payload: Value,
}

impl LogicalMessage {
    /// Build a message from a serializable payload.
    pub fn new<T: Serialize + ?Sized>(tag: impl Into<String>, payload: &T) -> Result<Self> {
        let tag = tag.into();
        validate_tag(&tag)?;
        let payload = serde_json::to_value(payload).map_err(FrameError::Serialize)?;
        Ok(Self { tag, payload })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The untyped payload.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_parts(self) -> (String, Value) {
        (self.tag, self.payload)
    }

    /// Parse the payload into a declared shape.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.payload)
    }

    pub fn encode(&self) -> Result<EncodedMessage> {
        encode(&self.tag, &self.payload)
    }
}

/// Decode one `<tag>###<json>` token.
pub fn decode_token(token: &str) -> Result<LogicalMessage> {
    let (tag, json) = token
        .split_once(TAG_SEPARATOR)
        .filter(|(tag, _)| !tag.is_empty())
        .ok_or_else(|| FrameError::MissingTagSeparator {
            token: token.to_string(),
        })?;

    let payload = serde_json::from_str(json).map_err(|source| FrameError::InvalidPayload {
        tag: tag.to_string(),
        source,
    })?;

    Ok(LogicalMessage {
        tag: tag.to_string(),
        payload,
    })
}

/// One token of a decoded frame, with its own outcome.
#[derive(Debug)]
pub struct DecodedToken {
    /// Raw token text as received.
    pub raw: String,
    /// The decoded message, or why this token was dropped.
    pub message: Result<LogicalMessage>,
}

/// Split frame text into tokens and decode each independently.
///
/// A malformed token never affects its siblings.
pub fn decode_frame(text: &str) -> Result<Vec<DecodedToken>> {
    if text.trim().is_empty() {
        return Err(FrameError::EmptyFrame);
    }
    Ok(text
        .split(FRAME_SEPARATOR)
        .map(|raw| DecodedToken {
            raw: raw.to_string(),
            message: decode_token(raw),
        })
        .collect())
}

/// An inbound provider line with its framing stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundLine {
    /// Identity of the sender.
    pub sender: String,
    /// Channel the line was posted to (without `#`).
    pub channel: String,
    /// Message text.
    pub text: String,
}

/// Strip provider framing from a raw line.
///
/// Accepted form:
/// ```text
/// [@key=value;... ]:nick!user@host PRIVMSG #channel :text
/// ```
pub fn parse_provider_line(raw: &str) -> Result<InboundLine> {
    let mut line = raw.trim_end_matches(['\r', '\n']);
    if line.starts_with('@') {
        line = line
            .split_once(' ')
            .map(|(_, rest)| rest)
            .ok_or(FrameError::MissingProviderDelimiter)?;
    }

    let command_at = line
        .find(PROVIDER_COMMAND)
        .ok_or(FrameError::MissingProviderDelimiter)?;
    let prefix = &line[..command_at];
    let (channel, text) = line[command_at + PROVIDER_COMMAND.len()..]
        .split_once(PROVIDER_TEXT_DELIMITER)
        .ok_or(FrameError::MissingProviderDelimiter)?;

    let sender = prefix
        .strip_prefix(':')
        .and_then(|source| source.split('!').next())
        .filter(|sender| !sender.is_empty())
        .ok_or(FrameError::MissingProviderDelimiter)?;

    Ok(InboundLine {
        sender: sender.to_string(),
        channel: channel.to_string(),
        text: text.to_string(),
    })
}

/// A fully decoded inbound logic-lane line.
#[derive(Debug)]
pub struct DecodedFrame {
    pub sender: String,
    pub channel: String,
    pub tokens: Vec<DecodedToken>,
}

/// Strip provider framing, then decode every token of the frame.
pub fn decode_line(raw: &str) -> Result<DecodedFrame> {
    let line = parse_provider_line(raw)?;
    let tokens = decode_frame(&line.text)?;
    Ok(DecodedFrame {
        sender: line.sender,
        channel: line.channel,
        tokens,
    })
}
