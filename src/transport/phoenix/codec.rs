//! Phoenix channel frames used by the hosted realtime service (vsn 1.0.0,
//! JSON object encoding).

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use serde_json::Value;

use crate::constants::EVENT_ACCESS_TOKEN;
use crate::constants::EVENT_CLOSE;
use crate::constants::EVENT_ERROR;
use crate::constants::EVENT_HEARTBEAT;
use crate::constants::EVENT_JOIN;
use crate::constants::EVENT_LEAVE;
use crate::constants::EVENT_POSTGRES_CHANGES;
use crate::constants::EVENT_REPLY;
use crate::constants::EVENT_SYSTEM;
use crate::constants::PHOENIX_TOPIC;
use crate::constants::TOPIC_PREFIX;
use crate::RawChange;
use crate::TableId;
use crate::TransportError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PhoenixMessage {
    pub(crate) topic: String,
    pub(crate) event: String,
    #[serde(default)]
    pub(crate) payload: Value,
    #[serde(rename = "ref", default)]
    pub(crate) msg_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) join_ref: Option<String>,
}

/// What an inbound frame means for the subscription
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Inbound {
    JoinReply(std::result::Result<(), String>),
    HeartbeatReply(Option<String>),
    Change(RawChange),
    SystemOk(String),
    SystemError(String),
    ChannelError(String),
    ChannelClosed,
    Ignored,
}

pub(crate) fn full_topic(topic: &str) -> String {
    if topic.starts_with(TOPIC_PREFIX) {
        topic.to_string()
    } else {
        format!("{TOPIC_PREFIX}{topic}")
    }
}

pub(crate) fn encode_join(
    topic: &str,
    join_ref: &str,
    schema: &str,
    tables: &[TableId],
    access_token: Option<&str>,
) -> String {
    let postgres_changes: Vec<Value> = tables
        .iter()
        .map(|table| json!({"event": "*", "schema": schema, "table": table.as_str()}))
        .collect();

    let mut payload = json!({
        "config": {
            "broadcast": {"ack": false, "self": false},
            "presence": {"key": ""},
            "postgres_changes": postgres_changes,
            "private": false
        }
    });
    if let (Some(token), Value::Object(map)) = (access_token, &mut payload) {
        map.insert(EVENT_ACCESS_TOKEN.to_string(), Value::String(token.to_string()));
    }

    encode(PhoenixMessage {
        topic: topic.to_string(),
        event: EVENT_JOIN.to_string(),
        payload,
        msg_ref: Some(join_ref.to_string()),
        join_ref: Some(join_ref.to_string()),
    })
}

pub(crate) fn encode_leave(
    topic: &str,
    join_ref: &str,
    msg_ref: &str,
) -> String {
    encode(PhoenixMessage {
        topic: topic.to_string(),
        event: EVENT_LEAVE.to_string(),
        payload: json!({}),
        msg_ref: Some(msg_ref.to_string()),
        join_ref: Some(join_ref.to_string()),
    })
}

pub(crate) fn encode_heartbeat(msg_ref: &str) -> String {
    encode(PhoenixMessage {
        topic: PHOENIX_TOPIC.to_string(),
        event: EVENT_HEARTBEAT.to_string(),
        payload: json!({}),
        msg_ref: Some(msg_ref.to_string()),
        join_ref: None,
    })
}

// Value-only messages always serialize.
fn encode(message: PhoenixMessage) -> String {
    serde_json::to_value(&message).map(|v| v.to_string()).unwrap_or_default()
}

pub(crate) fn decode_frame(
    text: &str,
    topic: &str,
    join_ref: &str,
) -> std::result::Result<Inbound, TransportError> {
    let message: PhoenixMessage = serde_json::from_str(text)?;

    if message.topic == PHOENIX_TOPIC {
        return Ok(match message.event.as_str() {
            EVENT_REPLY => Inbound::HeartbeatReply(message.msg_ref),
            _ => Inbound::Ignored,
        });
    }

    if message.topic != topic {
        return Ok(Inbound::Ignored);
    }

    let inbound = match message.event.as_str() {
        EVENT_REPLY => {
            if message.msg_ref.as_deref() != Some(join_ref) {
                return Ok(Inbound::Ignored);
            }
            match str_field(&message.payload, "status") {
                Some("ok") => Inbound::JoinReply(Ok(())),
                status => {
                    let reason = message
                        .payload
                        .get("response")
                        .and_then(|r| str_field(r, "reason"))
                        .or(status)
                        .unwrap_or("join rejected");
                    Inbound::JoinReply(Err(reason.to_string()))
                }
            }
        }
        EVENT_POSTGRES_CHANGES => {
            let data = message.payload.get("data").cloned().unwrap_or(Value::Null);
            Inbound::Change(serde_json::from_value(data)?)
        }
        EVENT_SYSTEM => {
            let text = str_field(&message.payload, "message").unwrap_or_default().to_string();
            match str_field(&message.payload, "status") {
                Some("error") => Inbound::SystemError(text),
                _ => Inbound::SystemOk(text),
            }
        }
        EVENT_ERROR => Inbound::ChannelError(
            str_field(&message.payload, "reason")
                .unwrap_or("channel error")
                .to_string(),
        ),
        EVENT_CLOSE => Inbound::ChannelClosed,
        _ => Inbound::Ignored,
    };

    Ok(inbound)
}

fn str_field<'a>(
    value: &'a Value,
    field: &str,
) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}
