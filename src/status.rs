//! Status surface shared with UI observers.
//!
//! The supervisor publishes a [`StatusSnapshot`] through a watch channel
//! whenever the connection status, visibility, retry count or pending
//! invalidations change. [`RealtimeHandle`] keeps no state of its own: every
//! getter is a projection of the latest snapshot and every control call is a
//! command sent to the supervisor.

use std::fmt;
use std::time::SystemTime;

use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tracing::debug;

use crate::supervisor::SupervisorCommand;
use crate::Result;
use crate::SupervisorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the page hosting the dashboard is in the foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub status: ConnectionStatus,
    /// Wall-clock time of the most recent cache invalidation
    pub last_update: Option<SystemTime>,
    /// Automatic retries scheduled since the last success or manual reconnect
    pub attempt: u32,
    pub visibility: Visibility,
    pub pending_invalidations: usize,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            last_update: None,
            attempt: 0,
            visibility: Visibility::Visible,
            pending_invalidations: 0,
        }
    }
}

/// Cloneable handle to a running realtime supervisor
#[derive(Debug, Clone)]
pub struct RealtimeHandle {
    cmd_tx: mpsc::Sender<SupervisorCommand>,
    status_rx: watch::Receiver<StatusSnapshot>,
}

impl RealtimeHandle {
    pub(crate) fn new(
        cmd_tx: mpsc::Sender<SupervisorCommand>,
        status_rx: watch::Receiver<StatusSnapshot>,
    ) -> Self {
        Self { cmd_tx, status_rx }
    }

    pub fn is_connected(&self) -> bool {
        self.connection_status() == ConnectionStatus::Connected
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        if self.supervisor_gone() {
            return ConnectionStatus::Disconnected;
        }
        self.status_rx.borrow().status
    }

    pub fn last_update(&self) -> Option<SystemTime> {
        self.status_rx.borrow().last_update
    }

    /// Latest published snapshot. Once the supervisor has stopped, for
    /// whatever reason, the status reads `Disconnected`.
    pub fn snapshot(&self) -> StatusSnapshot {
        let mut snapshot = self.status_rx.borrow().clone();
        if self.supervisor_gone() {
            snapshot.status = ConnectionStatus::Disconnected;
        }
        snapshot
    }

    /// Receiver notified on every published snapshot.
    ///
    /// Any number of observers may subscribe; they all see the same values.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.status_rx.clone()
    }

    /// Drops the current channel, resets the retry counter and connects
    /// again right away.
    pub async fn reconnect(&self) -> Result<()> {
        self.send(SupervisorCommand::Reconnect).await
    }

    pub async fn set_visibility(
        &self,
        visibility: Visibility,
    ) -> Result<()> {
        self.send(SupervisorCommand::Visibility(visibility)).await
    }

    /// Closes the channel and drops every pending timer.
    ///
    /// Returns once the supervisor has torn down. Calling it again, from
    /// this or any cloned handle, is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(SupervisorCommand::Shutdown(tx)).await.is_err() {
            debug!("realtime supervisor already stopped");
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }

    fn supervisor_gone(&self) -> bool {
        self.status_rx.has_changed().is_err()
    }

    async fn send(
        &self,
        command: SupervisorCommand,
    ) -> Result<()> {
        self.cmd_tx
            .send(command)
            .await
            .map_err(|_| SupervisorError::NotRunning.into())
    }
}
