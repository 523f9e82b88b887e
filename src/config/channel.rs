use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_EVENT_BUFFER;
use crate::constants::DEFAULT_HEARTBEAT_INTERVAL_MS;
use crate::constants::DEFAULT_SUBSCRIBE_TIMEOUT_MS;
use crate::constants::DEFAULT_TOPIC;
use crate::Error;
use crate::Result;
use crate::TableId;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChannelConfig {
    /// Channel topic, without the `realtime:` prefix
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Watched table names; every entry must be a known table
    #[serde(default = "default_tables")]
    pub tables: Vec<String>,

    /// Time allowed between opening the channel and the subscription ack
    #[serde(default = "default_subscribe_timeout_ms")]
    pub subscribe_timeout_ms: u64,

    /// Phoenix heartbeat period
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Capacity of the transport -> supervisor queue
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            tables: default_tables(),
            subscribe_timeout_ms: default_subscribe_timeout_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl ChannelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message("channel.topic cannot be empty".into())));
        }

        if self.tables.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "channel.tables must name at least one table".into(),
            )));
        }

        if let Some(unknown) = self.tables.iter().find(|t| TableId::from_name(t).is_unknown()) {
            return Err(Error::Config(ConfigError::Message(format!(
                "channel.tables contains unknown table '{unknown}'"
            ))));
        }

        if self.subscribe_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "channel.subscribe_timeout_ms must be > 0".into(),
            )));
        }

        if self.heartbeat_interval_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "channel.heartbeat_interval_ms must be > 0".into(),
            )));
        }

        if self.event_buffer == 0 {
            return Err(Error::Config(ConfigError::Message("channel.event_buffer must be > 0".into())));
        }

        Ok(())
    }

    /// Parsed table identifiers, duplicates removed, order preserved
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<TableId> = Vec::with_capacity(self.tables.len());
        for name in &self.tables {
            let id = TableId::from_name(name);
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}
fn default_tables() -> Vec<String> {
    TableId::WATCHED.iter().map(|t| t.as_str().to_string()).collect()
}
fn default_subscribe_timeout_ms() -> u64 {
    DEFAULT_SUBSCRIBE_TIMEOUT_MS
}
fn default_heartbeat_interval_ms() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_MS
}
fn default_event_buffer() -> usize {
    DEFAULT_EVENT_BUFFER
}
