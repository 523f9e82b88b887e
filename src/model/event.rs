use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::TableId;
use crate::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }
}

impl FromStr for ChangeKind {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INSERT" => Ok(ChangeKind::Insert),
            "UPDATE" => Ok(ChangeKind::Update),
            "DELETE" => Ok(ChangeKind::Delete),
            _ => Err(TransportError::UnknownEventType(s.to_string())),
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row change delivered by the change channel.
///
/// Produced once per notification and consumed once by the router.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: TableId,
    pub kind: ChangeKind,
    pub new_record: Option<Value>,
    pub old_record: Option<Value>,
}

impl ChangeEvent {
    pub fn new(
        table: TableId,
        kind: ChangeKind,
    ) -> Self {
        Self {
            table,
            kind,
            new_record: None,
            old_record: None,
        }
    }

    pub fn with_new_record(
        mut self,
        record: Value,
    ) -> Self {
        self.new_record = Some(record);
        self
    }

    pub fn with_old_record(
        mut self,
        record: Value,
    ) -> Self {
        self.old_record = Some(record);
        self
    }
}

/// Change payload as the backend sends it.
///
/// Accepts both the realtime wire names (`type`, `record`, `old_record`)
/// and the client SDK names (`eventType`, `new`, `old`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChange {
    #[serde(default)]
    pub schema: String,
    pub table: String,
    #[serde(rename = "type", alias = "eventType")]
    pub event_type: String,
    #[serde(default, rename = "record", alias = "new")]
    pub new: Option<Value>,
    #[serde(default, rename = "old_record", alias = "old")]
    pub old: Option<Value>,
}

impl TryFrom<RawChange> for ChangeEvent {
    type Error = TransportError;

    fn try_from(raw: RawChange) -> Result<Self, Self::Error> {
        let kind = raw.event_type.parse::<ChangeKind>()?;
        Ok(ChangeEvent {
            table: TableId::from_name(&raw.table),
            kind,
            new_record: non_empty(raw.new),
            old_record: non_empty(raw.old),
        })
    }
}

// The backend sends `{}` for the side of the change that does not exist.
fn non_empty(record: Option<Value>) -> Option<Value> {
    match record {
        Some(Value::Null) => None,
        Some(Value::Object(map)) if map.is_empty() => None,
        other => other,
    }
}
