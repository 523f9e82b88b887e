//! Reconnection supervisor.
//!
//! A single tokio task owns the change channel, the invalidation router and
//! the retry timer. Each turn of its `select!` loop handles exactly one of:
//! a command from a [`RealtimeHandle`], a channel signal, the retry timer or
//! a debounce expiry, and then republishes the status snapshot.
//!
//! ## Status transitions
//! ```text
//! Disconnected -> Connecting -> Connected
//!                 Connecting -> Error
//!                 Connected  -> Error
//!                 Error      -> Connecting   (retry timer)
//!                 any        -> Connecting   (manual reconnect, page visible)
//!                 any        -> Disconnected (shutdown)
//! ```
//!
//! Retry `i` (0-based) waits `min(base * 2^i, max)`. Once `max_attempts`
//! retries were scheduled without a successful subscription, the supervisor
//! stays in `Error` until a manual reconnect.


use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio::time::Sleep;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use crate::constants::COMMAND_BUFFER;
use crate::ChangeChannel;
use crate::ChangeTransport;
use crate::ChannelHandle;
use crate::ChannelSignal;
use crate::ChannelState;
use crate::ConnectionStatus;
use crate::InvalidationRouter;
use crate::RealtimeHandle;
use crate::ReconnectPolicy;
use crate::SignalPayload;
use crate::StatusSnapshot;
use crate::SubscribeRequest;
use crate::Visibility;

#[derive(Debug)]
pub(crate) enum SupervisorCommand {
    Reconnect,
    Visibility(Visibility),
    /// Acknowledged once teardown finished
    Shutdown(oneshot::Sender<()>),
}

#[derive(Debug, Default)]
pub(crate) struct ReconnectState {
    /// Retries scheduled since the last subscription or manual reconnect
    pub(crate) attempt_count: u32,
    pub(crate) timer: Option<Pin<Box<Sleep>>>,
}

impl ReconnectState {
    fn reset(&mut self) {
        self.attempt_count = 0;
        self.timer = None;
    }
}

pub(crate) struct Supervisor {
    transport: Arc<dyn ChangeTransport>,
    request: SubscribeRequest,
    subscribe_timeout: Duration,
    policy: ReconnectPolicy,
    router: InvalidationRouter,

    channel: Option<ChannelHandle>,
    generation: u64,
    signal_tx: mpsc::Sender<ChannelSignal>,
    signal_rx: mpsc::Receiver<ChannelSignal>,
    cmd_rx: mpsc::Receiver<SupervisorCommand>,

    retry: ReconnectState,
    status: ConnectionStatus,
    visibility: Visibility,
    status_tx: watch::Sender<StatusSnapshot>,
}

impl Supervisor {
    pub(crate) fn new(
        transport: Arc<dyn ChangeTransport>,
        request: SubscribeRequest,
        subscribe_timeout: Duration,
        policy: ReconnectPolicy,
        router: InvalidationRouter,
        event_buffer: usize,
    ) -> (Self, RealtimeHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (signal_tx, signal_rx) = mpsc::channel(event_buffer);
        let (status_tx, status_rx) = watch::channel(StatusSnapshot::default());

        let supervisor = Self {
            transport,
            request,
            subscribe_timeout,
            policy,
            router,
            channel: None,
            generation: 0,
            signal_tx,
            signal_rx,
            cmd_rx,
            retry: ReconnectState::default(),
            status: ConnectionStatus::Disconnected,
            visibility: Visibility::Visible,
            status_tx,
        };
        (supervisor, RealtimeHandle::new(cmd_tx, status_rx))
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub(crate) async fn run(mut self) {
        self.connect();
        self.publish();

        loop {
            tokio::select! {
                biased;

                command = self.cmd_rx.recv() => {
                    match command {
                        Some(SupervisorCommand::Reconnect) => self.reconnect(),
                        Some(SupervisorCommand::Visibility(visibility)) => self.on_visibility(visibility),
                        Some(SupervisorCommand::Shutdown(ack)) => {
                            self.teardown();
                            let _ = ack.send(());
                            break;
                        }
                        None => {
                            debug!("every realtime handle dropped");
                            self.teardown();
                            break;
                        }
                    }
                }

                // due invalidations before signals
                prefix = self.router.next_due() => self.router.fire(&prefix),

                Some(signal) = self.signal_rx.recv() => self.on_signal(signal),

                _ = retry_due(&mut self.retry.timer) => {
                    self.retry.timer = None;
                    debug!(attempt = self.retry.attempt_count, "retry timer fired");
                    self.connect();
                }
            }

            self.publish();
        }

        info!("realtime supervisor stopped");
    }

    /// Replaces whatever channel is open with a fresh one
    pub(crate) fn connect(&mut self) {
        self.close_channel();
        self.generation += 1;
        self.status = ConnectionStatus::Connecting;
        info!(
            generation = self.generation,
            attempt = self.retry.attempt_count,
            topic = %self.request.topic,
            "opening change channel"
        );
        self.channel = Some(ChangeChannel::open(
            self.transport.clone(),
            self.request.clone(),
            self.generation,
            self.subscribe_timeout,
            self.signal_tx.clone(),
        ));
    }

    pub(crate) fn on_signal(
        &mut self,
        signal: ChannelSignal,
    ) {
        if self.channel.is_none() || signal.generation != self.generation {
            trace!(
                generation = signal.generation,
                current = self.generation,
                "ignoring signal from stale channel"
            );
            return;
        }

        match signal.payload {
            SignalPayload::Event(event) => self.router.handle_event(&event),
            SignalPayload::State(ChannelState::Subscribed) => {
                info!(generation = self.generation, "change channel subscribed");
                self.status = ConnectionStatus::Connected;
                self.retry.reset();
            }
            SignalPayload::State(ChannelState::Errored(reason)) => self.on_failure(&reason),
            SignalPayload::State(ChannelState::TimedOut) => self.on_failure("subscription timed out"),
            SignalPayload::State(ChannelState::Closed) => self.on_failure("channel closed by server"),
        }
    }

    fn on_failure(
        &mut self,
        reason: &str,
    ) {
        self.close_channel();
        self.status = ConnectionStatus::Error;

        let attempt = self.retry.attempt_count;
        if !self.policy.allows(attempt) {
            error!(
                attempts = attempt,
                reason, "realtime retries exhausted, waiting for manual reconnect"
            );
            return;
        }

        let delay = self.policy.delay_for(attempt);
        self.retry.attempt_count = attempt + 1;
        self.retry.timer = Some(Box::pin(sleep(delay)));
        warn!(
            generation = self.generation,
            attempt = attempt + 1,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            reason,
            "change channel failed, retry scheduled"
        );
    }

    /// Manual reconnect: cancel any pending retry and start over at attempt 0
    pub(crate) fn reconnect(&mut self) {
        info!(previous_attempts = self.retry.attempt_count, "manual reconnect");
        self.retry.reset();
        self.connect();
    }

    fn on_visibility(
        &mut self,
        visibility: Visibility,
    ) {
        debug!(?visibility, status = %self.status, "visibility changed");
        self.visibility = visibility;

        if visibility == Visibility::Visible && self.status != ConnectionStatus::Connected {
            self.reconnect();
        }
    }

    fn teardown(&mut self) {
        self.close_channel();
        self.retry.reset();
        self.router.clear();
        self.status = ConnectionStatus::Disconnected;
        self.publish();
    }

    fn close_channel(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
    }

    fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            status: self.status,
            last_update: self.router.last_update(),
            attempt: self.retry.attempt_count,
            visibility: self.visibility,
            pending_invalidations: self.router.pending_count(),
        }
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.status_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}

async fn retry_due(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
