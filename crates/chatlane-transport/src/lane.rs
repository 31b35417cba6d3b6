//! Logical lanes over the shared chat transport.
//!
//! The logic lane carries batched game-state frames and is rate limited.
//! The chat lane carries human-readable text and is sent immediately.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A logical channel over the shared transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    /// Batched, cooldown-limited game-state frames.
    Logic,
    /// Unbatched human-readable broadcast text.
    Chat,
}

impl Lane {
    /// Both lanes, logic first.
    pub const ALL: [Lane; 2] = [Lane::Logic, Lane::Chat];

    /// Human-readable lane name.
    pub fn name(self) -> &'static str {
        match self {
            Lane::Logic => "logic",
            Lane::Chat => "chat",
        }
    }

    /// Returns true if sends on this lane go through batching and cooldown.
    pub fn is_batched(self) -> bool {
        matches!(self, Lane::Logic)
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Provider channel names bound to each lane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneChannels {
    /// Channel carrying logic-lane frames (without the leading `#`).
    pub logic: Option<String>,
    /// Channel carrying chat-lane text (without the leading `#`).
    pub chat: Option<String>,
}

impl LaneChannels {
    /// Bind both lanes.
    pub fn new(logic: impl Into<String>, chat: impl Into<String>) -> Self {
        Self {
            logic: Some(logic.into()),
            chat: Some(chat.into()),
        }
    }

    /// Channel bound to a lane, if any.
    pub fn channel(&self, lane: Lane) -> Option<&str> {
        match lane {
            Lane::Logic => self.logic.as_deref(),
            Lane::Chat => self.chat.as_deref(),
        }
    }

    /// Lane a channel name is bound to, if any. A leading `#` is ignored.
    pub fn lane_for(&self, channel: &str) -> Option<Lane> {
        let channel = channel.strip_prefix('#').unwrap_or(channel);
        Lane::ALL
            .into_iter()
            .find(|lane| self.channel(*lane) == Some(channel))
    }
}
