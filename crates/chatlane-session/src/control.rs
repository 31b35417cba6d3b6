use chatlane_frame::Tick;
use serde::{Deserialize, Serialize};

/// Reserved tag of the keepalive message.
pub const ALIVE_TAG: &str = "alive";

/// Ticks between keepalives: 20 seconds at 50 Hz.
pub const DEFAULT_KEEPALIVE_PERIOD: Tick = 50 * 20;

/// Chat-lane line sent by [`Driver::announce`](crate::Driver::announce).
pub const DEFAULT_BANNER: &str = "*** Logic Channel Initialized ***";

/// Keepalive payload. Receivers dispatch it like any other tagged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alive {
    /// Sender's tick counter when the keepalive was written.
    pub t: Tick,
}
