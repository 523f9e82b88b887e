//! Change subscription channel.
//!
//! A channel is one subscription attempt: it opens a transport stream for
//! the watched tables, forwards every row change and lifecycle transition to
//! a single sink, and dies on the first terminal state. Channels never
//! reconnect on their own; the supervisor opens a new one with a higher
//! generation instead.


use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep_until;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::ChangeEvent;
use crate::ChangeTransport;
use crate::SubscribeRequest;
use crate::TransportMessage;
use crate::TransportStatus;

/// Lifecycle of one channel as seen by its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelState {
    Subscribed,
    Errored(String),
    TimedOut,
    Closed,
}

impl ChannelState {
    /// Every state but `Subscribed` ends the channel
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChannelState::Subscribed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalPayload {
    Event(ChangeEvent),
    State(ChannelState),
}

/// Everything a channel reports, tagged with the generation that opened it
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSignal {
    pub generation: u64,
    pub payload: SignalPayload,
}

pub struct ChangeChannel;

impl ChangeChannel {
    /// Starts the subscription in the background and returns its handle.
    ///
    /// `subscribe_timeout` covers both connecting and waiting for the
    /// subscription ack.
    pub fn open(
        transport: Arc<dyn ChangeTransport>,
        request: SubscribeRequest,
        generation: u64,
        subscribe_timeout: Duration,
        sink: mpsc::Sender<ChannelSignal>,
    ) -> ChannelHandle {
        let cancel = CancellationToken::new();
        let pump = Pump {
            generation,
            sink,
            cancel: cancel.clone(),
        };
        let deadline = Instant::now() + subscribe_timeout;
        let task = tokio::spawn(pump.run(transport, request, deadline));

        debug!(generation, "change channel opened");
        ChannelHandle {
            generation,
            cancel,
            task: Some(task),
        }
    }
}

/// Owner side of a channel. Dropping the handle closes the channel.
#[derive(Debug)]
pub struct ChannelHandle {
    generation: u64,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stops the pump and releases the transport stream.
    ///
    /// Calling it again is a no-op.
    pub fn close(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        self.cancel.cancel();
        task.abort();
        debug!(generation = self.generation, "change channel closed");
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_none()
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.close();
    }
}

struct Pump {
    generation: u64,
    sink: mpsc::Sender<ChannelSignal>,
    cancel: CancellationToken,
}

impl Pump {
    async fn run(
        self,
        transport: Arc<dyn ChangeTransport>,
        request: SubscribeRequest,
        deadline: Instant,
    ) {
        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return,
            _ = sleep_until(deadline) => Err(None),
            result = transport.subscribe(request) => result.map_err(Some),
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(Some(e)) => {
                warn!(generation = self.generation, ?e, "change subscription failed");
                self.state(ChannelState::Errored(e.to_string())).await;
                return;
            }
            Err(None) => {
                self.state(ChannelState::TimedOut).await;
                return;
            }
        };

        let timeout = sleep_until(deadline);
        tokio::pin!(timeout);
        let mut subscribed = false;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,

                _ = &mut timeout, if !subscribed => {
                    warn!(generation = self.generation, "subscription ack not received in time");
                    self.state(ChannelState::TimedOut).await;
                    return;
                }

                message = stream.next() => {
                    let state = match message {
                        Some(TransportMessage::Change(raw)) => {
                            match ChangeEvent::try_from(raw) {
                                Ok(event) => {
                                    trace!(generation = self.generation, table = %event.table, kind = %event.kind, "change received");
                                    if !self.send(SignalPayload::Event(event)).await {
                                        return;
                                    }
                                }
                                Err(e) => warn!(generation = self.generation, ?e, "dropping malformed change payload"),
                            }
                            continue;
                        }
                        Some(TransportMessage::Status(TransportStatus::Subscribed)) => {
                            if subscribed {
                                continue;
                            }
                            subscribed = true;
                            ChannelState::Subscribed
                        }
                        Some(TransportMessage::Status(TransportStatus::ChannelError(reason))) => ChannelState::Errored(reason),
                        Some(TransportMessage::Status(TransportStatus::TimedOut)) => ChannelState::TimedOut,
                        Some(TransportMessage::Status(TransportStatus::Closed)) | None => ChannelState::Closed,
                    };

                    let terminal = state.is_terminal();
                    if !self.state(state).await || terminal {
                        return;
                    }
                }
            }
        }
    }

    async fn state(
        &self,
        state: ChannelState,
    ) -> bool {
        debug!(generation = self.generation, ?state, "channel state");
        self.send(SignalPayload::State(state)).await
    }

    /// Returns `false` once the owner stopped listening
    async fn send(
        &self,
        payload: SignalPayload,
    ) -> bool {
        self.sink
            .send(ChannelSignal {
                generation: self.generation,
                payload,
            })
            .await
            .is_ok()
    }
}
