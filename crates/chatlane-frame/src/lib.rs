//! Tagged message framing and rate-limited transmission over chat lines.
//!
//! This is the core value-add layer of chatlane. Every logical message is
//! encoded as a single text token:
//! - a short ASCII tag naming the payload shape
//! - the `###` tag separator
//! - the payload as compact JSON
//!
//! Tokens are packed greedily into frames joined by `%%`, each frame bounded
//! by the provider's line budget, and frames leave on the logic lane no more
//! often than the cooldown allows. Nothing is ever truncated or reordered.

pub mod batcher;
pub mod codec;
pub mod error;
pub mod policy;
pub mod scheduler;

pub use batcher::{Frame, FrameBatcher};
pub use codec::{
    decode_frame, decode_line, decode_token, encode, encode_json, parse_provider_line,
    validate_tag, DecodedFrame, DecodedToken, EncodedMessage, InboundLine, LogicalMessage,
    DEFAULT_MAX_FRAME_LEN, FRAME_SEPARATOR, TAG_SEPARATOR,
};
pub use error::{FrameError, Result};
pub use policy::{OverflowPolicy, TransmitPolicy, DEFAULT_COOLDOWN_TICKS, DEFAULT_QUEUE_SOFT_LIMIT};
pub use scheduler::{Pushed, SchedulerStats, TransmissionScheduler};

/// Simulation time, counted in fixed-rate ticks.
pub type Tick = u64;
