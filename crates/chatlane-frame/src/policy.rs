use chatlane_transport::PROVIDER_LINE_LIMIT;
use serde::{Deserialize, Serialize};

use crate::codec::DEFAULT_MAX_FRAME_LEN;
use crate::error::{FrameError, Result};
use crate::Tick;

/// Default minimum ticks between logic-lane sends.
pub const DEFAULT_COOLDOWN_TICKS: Tick = 30;

/// Default queue depth above which growth is reported.
pub const DEFAULT_QUEUE_SOFT_LIMIT: usize = 64;

/// What happens to sealed frames that arrive while the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Never drop; the queue grows without bound.
    #[default]
    Unbounded,
    /// Drop the oldest queued frame to make room.
    DropOldest { capacity: usize },
    /// Drop the frame being queued.
    DropNewest { capacity: usize },
}

impl OverflowPolicy {
    /// Queue capacity, if bounded.
    pub fn capacity(self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::DropOldest { capacity } | Self::DropNewest { capacity } => Some(capacity),
        }
    }
}

/// Rate and size policy for the logic lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmitPolicy {
    /// Minimum ticks between consecutive sends. Default: 30.
    pub cooldown_ticks: Tick,
    /// Maximum frame length in characters. Default: 480.
    pub max_frame_len: usize,
    /// Queue depth above which growth is counted and logged. Default: 64.
    pub queue_soft_limit: usize,
    /// Overflow handling. Default: unbounded.
    pub overflow: OverflowPolicy,
}

impl Default for TransmitPolicy {
    fn default() -> Self {
        Self {
            cooldown_ticks: DEFAULT_COOLDOWN_TICKS,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            queue_soft_limit: DEFAULT_QUEUE_SOFT_LIMIT,
            overflow: OverflowPolicy::Unbounded,
        }
    }
}

impl TransmitPolicy {
    /// Reject out-of-range constants.
    pub fn validate(&self) -> Result<()> {
        if self.cooldown_ticks == 0 {
            return Err(FrameError::InvalidPolicy(
                "cooldown_ticks must be at least 1".to_string(),
            ));
        }
        if self.max_frame_len == 0 || self.max_frame_len > PROVIDER_LINE_LIMIT {
            return Err(FrameError::InvalidPolicy(format!(
                "max_frame_len must be within 1..={PROVIDER_LINE_LIMIT}, got {}",
                self.max_frame_len
            )));
        }
        if self.queue_soft_limit == 0 {
            return Err(FrameError::InvalidPolicy(
                "queue_soft_limit must be at least 1".to_string(),
            ));
        }
        if self.overflow.capacity() == Some(0) {
            return Err(FrameError::InvalidPolicy(
                "bounded overflow policy needs a capacity of at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let policy = TransmitPolicy::default();
        assert_eq!(policy.cooldown_ticks, 30);
        assert_eq!(policy.max_frame_len, 480);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn out_of_range_constants_rejected() {
        let cases = [
            TransmitPolicy {
                cooldown_ticks: 0,
                ..TransmitPolicy::default()
            },
            TransmitPolicy {
                max_frame_len: 0,
                ..TransmitPolicy::default()
            },
            TransmitPolicy {
                max_frame_len: PROVIDER_LINE_LIMIT + 1,
                ..TransmitPolicy::default()
            },
            TransmitPolicy {
                queue_soft_limit: 0,
                ..TransmitPolicy::default()
            },
            TransmitPolicy {
                overflow: OverflowPolicy::DropOldest { capacity: 0 },
                ..TransmitPolicy::default()
            },
        ];
        for policy in cases {
            assert!(
                matches!(policy.validate(), Err(FrameError::InvalidPolicy(_))),
                "{policy:?} should be rejected"
            );
        }
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let policy: TransmitPolicy = serde_json::from_str(
            r#"{"cooldown_ticks":45,"overflow":{"kind":"drop_newest","capacity":8}}"#,
        )
        .unwrap();
        assert_eq!(policy.cooldown_ticks, 45);
        assert_eq!(policy.max_frame_len, 480);
        assert_eq!(policy.overflow, OverflowPolicy::DropNewest { capacity: 8 });
    }
}
