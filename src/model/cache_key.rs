use std::fmt;

use serde_json::Value;

/// Root names UI features register their queries under.
///
/// This vocabulary is shared with every screen of the dashboard; a query
/// stored under any other root is never invalidated by realtime changes.
pub mod query_keys {
    pub const EQUIPMENT: &str = "equipment";
    pub const DASHBOARD_STATS: &str = "dashboard-stats";
    pub const REPORTS: &str = "reports";
    pub const EQUIPMENT_DISTRIBUTION: &str = "equipment-distribution";
    pub const EQUIPMENT_HISTORY: &str = "equipment-history";
    pub const TRANSFERS: &str = "transfers";
    pub const TRANSFER_HISTORY: &str = "transfer-history";
    pub const REPAIR_REQUESTS: &str = "repair-requests";
    pub const MAINTENANCE_PLANS: &str = "maintenance-plans";
    pub const MAINTENANCE_TASKS: &str = "maintenance-tasks";
    pub const USERS: &str = "users";
    pub const USAGE_LOGS: &str = "usage-logs";
    pub const DEPARTMENTS: &str = "departments";
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeySegment {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl KeySegment {
    fn to_json(&self) -> Value {
        match self {
            KeySegment::Str(s) => Value::String(s.clone()),
            KeySegment::Int(i) => Value::from(*i),
            KeySegment::Bool(b) => Value::Bool(*b),
        }
    }
}

impl From<&str> for KeySegment {
    fn from(s: &str) -> Self {
        KeySegment::Str(s.to_string())
    }
}

impl From<String> for KeySegment {
    fn from(s: String) -> Self {
        KeySegment::Str(s)
    }
}

impl From<i64> for KeySegment {
    fn from(i: i64) -> Self {
        KeySegment::Int(i)
    }
}

impl From<bool> for KeySegment {
    fn from(b: bool) -> Self {
        KeySegment::Bool(b)
    }
}

/// Ordered key segments identifying a family of cached queries.
///
/// A prefix matches every cached query whose key starts with the same
/// segments, so `["equipment"]` covers `["equipment", {page: 2}]` too.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKeyPrefix(Vec<KeySegment>);

impl CacheKeyPrefix {
    pub fn root(name: &str) -> Self {
        Self(vec![KeySegment::from(name)])
    }

    pub fn from_segments(segments: Vec<KeySegment>) -> Self {
        Self(segments)
    }

    pub fn with(
        mut self,
        segment: impl Into<KeySegment>,
    ) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    /// JSON array text of the segments; the debounce key.
    pub fn serialized(&self) -> String {
        Value::Array(self.0.iter().map(KeySegment::to_json).collect()).to_string()
    }

    /// Whether `key` belongs to the family this prefix names
    pub fn matches(
        &self,
        key: &[KeySegment],
    ) -> bool {
        key.len() >= self.0.len() && key[..self.0.len()] == self.0[..]
    }
}

impl fmt::Display for CacheKeyPrefix {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.serialized())
    }
}
