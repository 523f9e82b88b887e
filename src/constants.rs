// Configuration
pub(crate) const ENV_PREFIX: &str = "MEDEQUIP";
pub(crate) const ENV_SEPARATOR: &str = "__";
pub(crate) const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

// Backend endpoints
pub(crate) const REALTIME_PATH: &str = "realtime/v1/websocket";
pub(crate) const REST_PATH: &str = "rest/v1";
pub(crate) const RPC_PATH: &str = "rest/v1/rpc";
pub(crate) const PROTOCOL_VSN: &str = "1.0.0";
pub(crate) const DEFAULT_SCHEMA: &str = "public";

// Phoenix channel protocol
pub(crate) const PHOENIX_TOPIC: &str = "phoenix";
pub(crate) const TOPIC_PREFIX: &str = "realtime:";
pub(crate) const EVENT_JOIN: &str = "phx_join";
pub(crate) const EVENT_LEAVE: &str = "phx_leave";
pub(crate) const EVENT_REPLY: &str = "phx_reply";
pub(crate) const EVENT_ERROR: &str = "phx_error";
pub(crate) const EVENT_CLOSE: &str = "phx_close";
pub(crate) const EVENT_HEARTBEAT: &str = "heartbeat";
pub(crate) const EVENT_SYSTEM: &str = "system";
pub(crate) const EVENT_POSTGRES_CHANGES: &str = "postgres_changes";
pub(crate) const EVENT_ACCESS_TOKEN: &str = "access_token";

// Channel defaults (ms)
pub(crate) const DEFAULT_TOPIC: &str = "db-changes";
pub(crate) const DEFAULT_SUBSCRIBE_TIMEOUT_MS: u64 = 10_000;
pub(crate) const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;
pub(crate) const DEFAULT_EVENT_BUFFER: usize = 256;

// Invalidation defaults (ms)
pub(crate) const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub(crate) const MAX_DEBOUNCE_MS: u64 = 3_600_000;

// Reconnect defaults
pub(crate) const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub(crate) const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
pub(crate) const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

// Supervisor mailbox
pub(crate) const COMMAND_BUFFER: usize = 32;
