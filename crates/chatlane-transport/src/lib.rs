//! Line-oriented chat transport primitives.
//!
//! This is the lowest layer of chatlane. A chat provider carries one line of
//! text per send; everything above builds on the [`LineSink`] seam defined here:
//! - [`Lane`] names the logical channel a line travels on
//! - [`line`] formats and validates provider `PRIVMSG` lines
//! - [`tcp`] is a blocking line connection over TCP
//! - [`memory`] is an in-memory sink that records every send

pub mod error;
pub mod lane;
pub mod line;
pub mod memory;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use lane::{Lane, LaneChannels};
pub use line::{pong_reply, privmsg, validate_line_text, PROVIDER_LINE_LIMIT};
pub use memory::{RecordingSink, SentLine};
pub use tcp::TcpLineConnection;
pub use traits::LineSink;
