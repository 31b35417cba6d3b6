//! Batched, rate-limited game messaging over chat-provider text lines.
//!
//! chatlane carries typed game-state messages over a chat channel that
//! limits both line length and send rate. Messages are tagged, packed into
//! frames, and sent no faster than the cooldown allows, while a second lane
//! carries human-readable chat.
//!
//! # Crate Structure
//!
//! - [`transport`]: Lanes, the line sink, provider line formatting, TCP connection
//! - [`frame`]: Message codec, frame batcher and transmission scheduler
//! - [`schema`]: Optional JSON Schema validation (behind `schema` feature)
//! - [`session`]: Handler and chatter registries, the tick driver (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use chatlane_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use chatlane_frame::*;
}

/// Re-export schema types (requires `schema` feature).
#[cfg(feature = "schema")]
pub mod schema {
    pub use chatlane_schema::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use chatlane_session::*;
}
