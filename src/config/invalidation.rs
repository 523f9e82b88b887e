use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_DEBOUNCE_MS;
use crate::constants::MAX_DEBOUNCE_MS;
use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InvalidationConfig {
    /// Quiet period per cache-key prefix before invalidating
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Emit toasts on INSERT for the tables that have one
    #[serde(default = "default_notify_on_insert")]
    pub notify_on_insert: bool,
}

impl Default for InvalidationConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            notify_on_insert: default_notify_on_insert(),
        }
    }
}

impl InvalidationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.debounce_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "invalidation.debounce_ms must be > 0".into(),
            )));
        }
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(Error::Config(ConfigError::Message(format!(
                "invalidation.debounce_ms must be <= {MAX_DEBOUNCE_MS}, got {}",
                self.debounce_ms
            ))));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}
fn default_notify_on_insert() -> bool {
    true
}
