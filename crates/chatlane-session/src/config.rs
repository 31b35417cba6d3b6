use chatlane_frame::{Tick, TransmitPolicy};
use chatlane_transport::validate_line_text;
use serde::{Deserialize, Serialize};

use crate::control::{DEFAULT_BANNER, DEFAULT_KEEPALIVE_PERIOD};
use crate::error::{Result, SessionError};

/// Default ticks between chatter TTL sweeps when eviction is enabled.
pub const DEFAULT_CHATTER_SWEEP_PERIOD: Tick = 60;

/// Session-wide policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Logic-lane batching and rate policy.
    pub policy: TransmitPolicy,
    /// Ticks between keepalives. `None` disables keepalives.
    pub keepalive_period: Option<Tick>,
    /// Chatters silent for at least this many ticks are evicted. `None` keeps everyone.
    pub chatter_max_age: Option<Tick>,
    /// Ticks between eviction sweeps.
    pub chatter_sweep_period: Tick,
    /// Chat-lane line sent on announce. `None` sends nothing.
    pub banner: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            policy: TransmitPolicy::default(),
            keepalive_period: Some(DEFAULT_KEEPALIVE_PERIOD),
            chatter_max_age: None,
            chatter_sweep_period: DEFAULT_CHATTER_SWEEP_PERIOD,
            banner: Some(DEFAULT_BANNER.to_string()),
        }
    }
}

impl SessionConfig {
    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<()> {
        self.policy
            .validate()
            .map_err(|err| SessionError::InvalidConfig(err.to_string()))?;

        if self.keepalive_period == Some(0) {
            return Err(SessionError::InvalidConfig(
                "keepalive_period must be at least 1 tick".to_string(),
            ));
        }
        if self.chatter_max_age == Some(0) {
            return Err(SessionError::InvalidConfig(
                "chatter_max_age must be at least 1 tick".to_string(),
            ));
        }
        if self.chatter_sweep_period == 0 {
            return Err(SessionError::InvalidConfig(
                "chatter_sweep_period must be at least 1 tick".to_string(),
            ));
        }
        if let Some(banner) = &self.banner {
            validate_line_text(banner)
                .map_err(|err| SessionError::InvalidConfig(format!("banner: {err}")))?;
        }
        Ok(())
    }

    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
