//! Backend change-notification transports.
//!
//! A transport turns a [`SubscribeRequest`] into a stream of
//! [`TransportMessage`]s: row changes plus the lifecycle statuses the
//! realtime service reports for the subscription. Dropping the stream
//! releases the underlying connection.

mod memory;
mod phoenix;

pub use memory::*;
pub use phoenix::*;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::RawChange;
use crate::Result;
use crate::TableId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeRequest {
    /// Channel topic, without the `realtime:` prefix
    pub topic: String,
    pub schema: String,
    pub tables: Vec<TableId>,
}

/// Subscription lifecycle as reported by the realtime service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportStatus {
    Subscribed,
    ChannelError(String),
    TimedOut,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportMessage {
    Change(RawChange),
    Status(TransportStatus),
}

pub type TransportStream = BoxStream<'static, TransportMessage>;

#[async_trait]
pub trait ChangeTransport: Send + Sync + 'static {
    /// Opens one connection carrying changes for every table in `request`.
    ///
    /// An `Err` means the connection could not even be attempted; failures
    /// after that arrive in-band as [`TransportStatus`] values.
    async fn subscribe(
        &self,
        request: SubscribeRequest,
    ) -> Result<TransportStream>;
}
