//! Realtime Synchronisation Error Hierarchy
//!
//! Errors are only returned from construction-time APIs (configuration,
//! backend handle, transport connect, supervisor control). Once the
//! supervisor runs, transport failures are folded into
//! [`ConnectionStatus`](crate::ConnectionStatus) values instead.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Backend endpoint is missing or malformed
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Change-feed transport failures
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Supervisor task could not be reached
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No backend URL or key configured
    #[error("Backend is not configured: {0}")]
    Unconfigured(String),

    /// Malformed backend address
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Websocket handshake or frame I/O failures
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Malformed frame or payload
    #[error("Failed to decode realtime payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Change payload carried an event type we do not understand
    #[error("Unknown change event type: {0}")]
    UnknownEventType(String),

    /// Server refused the channel join
    #[error("Channel join rejected: {0}")]
    JoinRejected(String),

    /// Outbound frame could not be written
    #[error("Failed to send {frame} frame")]
    SendFailure { frame: &'static str },
}

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// Supervisor task already stopped
    #[error("Realtime supervisor is not running")]
    NotRunning,
}

impl From<url::ParseError> for BackendError {
    fn from(e: url::ParseError) -> Self {
        BackendError::InvalidUrl(e.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::Backend(e.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Transport(e.into())
    }
}
