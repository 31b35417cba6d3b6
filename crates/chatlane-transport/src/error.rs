/// Errors that can occur in chat transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the chat provider.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Line text contains characters the provider would treat as a line break.
    #[error("line text contains a line break at byte {position}")]
    LineBreak { position: usize },

    /// Line text exceeds the provider's per-line limit.
    #[error("line too long ({len} chars, max {max})")]
    LineTooLong { len: usize, max: usize },

    /// No channel name is bound to the lane.
    #[error("no channel bound to {0} lane")]
    UnboundLane(&'static str),

    /// The provider closed the connection.
    #[error("connection closed by provider")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
