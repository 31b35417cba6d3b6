use chatlane_transport::TransportError;

/// Errors that can occur during message encoding, frame decoding and transmission.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A single encoded message exceeds the frame budget.
    #[error("encoded message for tag {tag:?} too large ({len} chars, max {max})")]
    MessageTooLarge { tag: String, len: usize, max: usize },

    /// The tag cannot be carried on the wire.
    #[error("invalid tag {tag:?}: {reason}")]
    InvalidTag { tag: String, reason: &'static str },

    /// The payload could not be serialized to JSON.
    #[error("payload serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The inbound line does not carry the provider's message delimiter.
    #[error("provider delimiter missing from line")]
    MissingProviderDelimiter,

    /// A token has no `###` separator between tag and payload.
    #[error("token has no tag separator: {token:?}")]
    MissingTagSeparator { token: String },

    /// A token's payload is not valid JSON.
    #[error("payload for tag {tag:?} is not valid JSON: {source}")]
    InvalidPayload {
        tag: String,
        source: serde_json::Error,
    },

    /// The frame text is empty.
    #[error("frame carries no tokens")]
    EmptyFrame,

    /// A transmit policy constant is out of range.
    #[error("invalid transmit policy: {0}")]
    InvalidPolicy(String),

    /// The line sink rejected a frame.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl FrameError {
    /// Returns true for errors raised while encoding an outbound message.
    pub fn is_encoding(&self) -> bool {
        matches!(
            self,
            Self::MessageTooLarge { .. } | Self::InvalidTag { .. } | Self::Serialize(_)
        )
    }

    /// Returns true for errors raised while decoding an inbound frame.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MissingProviderDelimiter
                | Self::MissingTagSeparator { .. }
                | Self::InvalidPayload { .. }
                | Self::EmptyFrame
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
