use chatlane_frame::FrameError;
use chatlane_transport::TransportError;

/// Errors that can occur while building or driving a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Two handlers were registered for one tag.
    #[error("handler already registered for tag {0:?}")]
    DuplicateTag(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Frame-level error (encoding, policy, send).
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration JSON could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SessionError {
    /// Returns true for errors that should abort startup.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DuplicateTag(_) | Self::InvalidConfig(_) | Self::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
