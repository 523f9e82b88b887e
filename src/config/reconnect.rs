use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_BASE_DELAY_MS;
use crate::constants::DEFAULT_MAX_ATTEMPTS;
use crate::constants::DEFAULT_MAX_DELAY_MS;
use crate::Error;
use crate::Result;

/// Capped exponential backoff for automatic channel reconnects.
///
/// Retry `i` (0-based) waits `min(base_delay_ms * 2^i, max_delay_ms)`.
/// Once `max_attempts` retries have been scheduled the supervisor stops
/// and waits for a manual reconnect.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct ReconnectPolicy {
    /// Maximum number of automatic retries
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff base (unit: milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum backoff time (unit: milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl ReconnectPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Config(ConfigError::Message(
                "reconnect.max_attempts must be > 0".into(),
            )));
        }

        if self.base_delay_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "reconnect.base_delay_ms must be > 0".into(),
            )));
        }

        if self.base_delay_ms > self.max_delay_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "reconnect.base_delay_ms {}ms should not exceed max_delay_ms {}ms",
                self.base_delay_ms, self.max_delay_ms
            ))));
        }

        Ok(())
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(
        &self,
        attempt: u32,
    ) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Whether another automatic retry may still be scheduled
    pub fn allows(
        &self,
        attempt: u32,
    ) -> bool {
        attempt < self.max_attempts
    }
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}
fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}
