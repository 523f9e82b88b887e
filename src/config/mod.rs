//! Configuration for the realtime synchronisation layer.
//!
//! Loaded from multiple sources with priority:
//! 1. Default values (hardcoded)
//! 2. File at `CONFIG_PATH`, if set
//! 3. Environment variables prefixed `MEDEQUIP__` (highest priority)
//!
//! Loading never validates; call [`RealtimeConfig::validate`] once every
//! override has been applied.

mod backend;
mod channel;
mod invalidation;
mod reconnect;
pub use backend::*;
pub use channel::*;
pub use invalidation::*;
pub use reconnect::*;


//---
use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::CONFIG_PATH_ENV;
use crate::constants::ENV_PREFIX;
use crate::constants::ENV_SEPARATOR;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RealtimeConfig {
    /// Hosted backend endpoint and credentials
    #[serde(default)]
    pub backend: BackendConfig,
    /// Change channel topic, watched tables and timeouts
    #[serde(default)]
    pub channel: ChannelConfig,
    /// Debounce window and toast behaviour
    #[serde(default)]
    pub invalidation: InvalidationConfig,
    /// Automatic reconnect backoff
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

impl RealtimeConfig {
    /// Builds the configuration from defaults, the optional `CONFIG_PATH`
    /// file and `MEDEQUIP__*` environment variables.
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Environment variables
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    ///
    /// # Example
    /// ```ignore
    /// let config = RealtimeConfig::new()?
    ///     .with_override_config("realtime.toml")?
    ///     .validate()?;
    /// ```
    pub fn validate(self) -> Result<Self> {
        self.backend.validate()?;
        self.channel.validate()?;
        self.invalidation.validate()?;
        self.reconnect.validate()?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .ignore_empty(true)
        .try_parsing(true)
}
