//! Websocket transport speaking the Phoenix channel protocol of the hosted
//! realtime service.
//!
//! One websocket carries one channel. The join frame registers a
//! `postgres_changes` listener per watched table; a background task then
//! keeps the socket alive with heartbeats and turns frames into
//! [`TransportMessage`]s. The task exits, after emitting a final status,
//! on the first fatal frame, on heartbeat timeout, or as soon as the
//! consumer drops the stream.

mod codec;


pub(crate) use codec::*;

use std::time::Duration;

use async_trait::async_trait;
use futures::Sink;
use futures::SinkExt;
use futures::Stream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::interval_at;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::ReceiverStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;
use url::Url;

use super::ChangeTransport;
use super::SubscribeRequest;
use super::TransportMessage;
use super::TransportStatus;
use super::TransportStream;
use crate::BackendHandle;
use crate::ChannelConfig;
use crate::Result;
use crate::TransportError;

const JOIN_REF: &str = "1";

#[derive(Debug, Clone)]
pub struct PhoenixTransport {
    endpoint: Url,
    access_token: String,
    heartbeat_interval: Duration,
    buffer: usize,
}

impl PhoenixTransport {
    pub fn new(
        backend: &BackendHandle,
        channel: &ChannelConfig,
    ) -> Result<Self> {
        Ok(Self {
            endpoint: backend.realtime_url()?,
            access_token: backend.anon_key().to_string(),
            heartbeat_interval: Duration::from_millis(channel.heartbeat_interval_ms),
            buffer: channel.event_buffer,
        })
    }
}

#[async_trait]
impl ChangeTransport for PhoenixTransport {
    async fn subscribe(
        &self,
        request: SubscribeRequest,
    ) -> Result<TransportStream> {
        let (mut socket, _response) = connect_async(self.endpoint.as_str())
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))?;

        let topic = full_topic(&request.topic);
        let join = encode_join(
            &topic,
            JOIN_REF,
            &request.schema,
            &request.tables,
            Some(&self.access_token),
        );
        socket
            .send(Message::Text(join.into()))
            .await
            .map_err(|_| TransportError::SendFailure { frame: "phx_join" })?;
        info!(%topic, tables = request.tables.len(), "realtime join sent");

        let (tx, rx) = mpsc::channel(self.buffer);
        tokio::spawn(run_socket(socket, tx, topic, self.heartbeat_interval));

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

async fn run_socket<S>(
    socket: S,
    tx: mpsc::Sender<TransportMessage>,
    topic: String,
    heartbeat_interval: Duration,
) where
    S: Stream<Item = std::result::Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin + Send + 'static,
{
    let (mut sink, mut stream) = socket.split();
    let mut heartbeat = interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut next_ref: u64 = 2;
    let mut pending_heartbeat: Option<String> = None;

    let status = loop {
        tokio::select! {
            _ = tx.closed() => {
                debug!(%topic, "realtime stream released, leaving channel");
                let leave = encode_leave(&topic, JOIN_REF, &next_ref.to_string());
                let _ = sink.send(Message::Text(leave.into())).await;
                let _ = sink.close().await;
                return;
            }

            _ = heartbeat.tick() => {
                if pending_heartbeat.is_some() {
                    warn!(%topic, "heartbeat reply missing, dropping socket");
                    break TransportStatus::TimedOut;
                }
                let msg_ref = next_ref.to_string();
                next_ref += 1;
                if sink.send(Message::Text(encode_heartbeat(&msg_ref).into())).await.is_err() {
                    break TransportStatus::ChannelError("heartbeat send failed".to_string());
                }
                trace!(%msg_ref, "heartbeat sent");
                pending_heartbeat = Some(msg_ref);
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let inbound = match decode_frame(text.as_str(), &topic, JOIN_REF) {
                            Ok(inbound) => inbound,
                            Err(e) => {
                                warn!(?e, "dropping undecodable realtime frame");
                                continue;
                            }
                        };
                        let message = match inbound {
                            Inbound::HeartbeatReply(msg_ref) => {
                                if msg_ref.is_some() && msg_ref == pending_heartbeat {
                                    pending_heartbeat = None;
                                }
                                continue;
                            }
                            Inbound::JoinReply(Ok(())) => TransportMessage::Status(TransportStatus::Subscribed),
                            Inbound::JoinReply(Err(reason)) => {
                                break TransportStatus::ChannelError(TransportError::JoinRejected(reason).to_string())
                            }
                            Inbound::Change(raw) => TransportMessage::Change(raw),
                            Inbound::SystemOk(text) => {
                                debug!(%text, "realtime system message");
                                continue;
                            }
                            Inbound::SystemError(text) | Inbound::ChannelError(text) => {
                                break TransportStatus::ChannelError(text)
                            }
                            Inbound::ChannelClosed => break TransportStatus::Closed,
                            Inbound::Ignored => continue,
                        };
                        if tx.send(message).await.is_err() {
                            let _ = sink.close().await;
                            return;
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = sink.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "realtime socket closed by server");
                        break TransportStatus::Closed;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break TransportStatus::ChannelError(e.to_string()),
                    None => break TransportStatus::Closed,
                }
            }
        }
    };

    info!(%topic, ?status, "realtime socket finished");
    let _ = tx.send(TransportMessage::Status(status)).await;
    let _ = sink.close().await;
}
