use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::trace;

use super::ChangeTransport;
use super::SubscribeRequest;
use super::TransportMessage;
use super::TransportStatus;
use super::TransportStream;
use crate::RawChange;
use crate::Result;
use crate::TransportError;

/// In-process transport: every `subscribe` call hands a
/// [`MemoryConnection`] to whoever holds the matching
/// [`MemoryConnections`], which then scripts what the "server" sends.
///
/// Used for local development without a backend and for tests.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    connections: mpsc::UnboundedSender<MemoryConnection>,
}

impl MemoryTransport {
    pub fn new() -> (Self, MemoryConnections) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { connections: tx }, MemoryConnections { rx })
    }
}

#[async_trait]
impl ChangeTransport for MemoryTransport {
    async fn subscribe(
        &self,
        request: SubscribeRequest,
    ) -> Result<TransportStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        trace!(topic = %request.topic, tables = request.tables.len(), "memory transport subscribe");
        self.connections
            .send(MemoryConnection { request, tx })
            .map_err(|_| TransportError::WebSocket("memory transport has no server side".to_string()))?;
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

/// Server side of [`MemoryTransport`]
#[derive(Debug)]
pub struct MemoryConnections {
    rx: mpsc::UnboundedReceiver<MemoryConnection>,
}

impl MemoryConnections {
    /// Waits for the next subscription attempt
    pub async fn next(&mut self) -> Option<MemoryConnection> {
        self.rx.recv().await
    }

    pub fn try_next(&mut self) -> Option<MemoryConnection> {
        self.rx.try_recv().ok()
    }
}

/// One subscription attempt seen from the server side.
///
/// Every send returns `false` once the client released the connection.
#[derive(Debug)]
pub struct MemoryConnection {
    request: SubscribeRequest,
    tx: mpsc::UnboundedSender<TransportMessage>,
}

impl MemoryConnection {
    pub fn request(&self) -> &SubscribeRequest {
        &self.request
    }

    pub fn emit(
        &self,
        message: TransportMessage,
    ) -> bool {
        self.tx.send(message).is_ok()
    }

    pub fn subscribed(&self) -> bool {
        self.emit(TransportMessage::Status(TransportStatus::Subscribed))
    }

    pub fn fail(
        &self,
        reason: &str,
    ) -> bool {
        self.emit(TransportMessage::Status(TransportStatus::ChannelError(reason.to_string())))
    }

    pub fn time_out(&self) -> bool {
        self.emit(TransportMessage::Status(TransportStatus::TimedOut))
    }

    pub fn close(&self) -> bool {
        self.emit(TransportMessage::Status(TransportStatus::Closed))
    }

    pub fn change(
        &self,
        raw: RawChange,
    ) -> bool {
        self.emit(TransportMessage::Change(raw))
    }

    /// Whether the client side dropped the stream
    pub fn is_released(&self) -> bool {
        self.tx.is_closed()
    }
}
