use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use medequip_realtime::CacheKeyPrefix;
use medequip_realtime::ConnectionStatus;
use medequip_realtime::MemoryConnection;
use medequip_realtime::MemoryConnections;
use medequip_realtime::MemoryTransport;
use medequip_realtime::QueryCache;
use medequip_realtime::RawChange;
use medequip_realtime::RealtimeBuilder;
use medequip_realtime::RealtimeConfig;
use medequip_realtime::RealtimeHandle;
use medequip_realtime::StatusSnapshot;
use serde_json::json;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

pub const WAIT: Duration = Duration::from_secs(120);
pub const SLACK: Duration = Duration::from_millis(5);

pub fn enable_logger() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp {
    Invalidate,
    RefetchActive,
}

/// Query cache recording every call with the (paused) tokio clock
#[derive(Debug, Default)]
pub struct TimedCache {
    calls: Mutex<Vec<(Instant, CacheOp, CacheKeyPrefix)>>,
}

impl TimedCache {
    pub fn calls_for(
        &self,
        op: CacheOp,
        prefix: &CacheKeyPrefix,
    ) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, o, p)| *o == op && p == prefix)
            .map(|(at, _, _)| *at)
            .collect()
    }

    pub fn total(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(
        &self,
        op: CacheOp,
        prefix: &CacheKeyPrefix,
    ) {
        self.calls.lock().unwrap().push((Instant::now(), op, prefix.clone()));
    }
}

impl QueryCache for TimedCache {
    fn invalidate(
        &self,
        prefix: &CacheKeyPrefix,
    ) {
        self.record(CacheOp::Invalidate, prefix);
    }

    fn refetch_active(
        &self,
        prefix: &CacheKeyPrefix,
    ) {
        self.record(CacheOp::RefetchActive, prefix);
    }
}

pub struct TestEnv {
    pub handle: RealtimeHandle,
    pub connections: MemoryConnections,
    pub cache: Arc<TimedCache>,
    pub status: watch::Receiver<StatusSnapshot>,
}

pub fn test_config() -> RealtimeConfig {
    let mut config = RealtimeConfig::default();
    config.invalidation.debounce_ms = 100;
    config
}

pub fn start(config: RealtimeConfig) -> TestEnv {
    let (transport, connections) = MemoryTransport::new();
    let cache = Arc::new(TimedCache::default());
    let handle = RealtimeBuilder::from_config(config, cache.clone())
        .transport(Arc::new(transport))
        .start()
        .expect("start realtime");
    let status = handle.subscribe();
    TestEnv {
        handle,
        connections,
        cache,
        status,
    }
}

impl TestEnv {
    pub async fn next_connection(&mut self) -> MemoryConnection {
        timeout(WAIT, self.connections.next())
            .await
            .expect("connection attempt")
            .expect("transport alive")
    }

    pub async fn no_connection_within(
        &mut self,
        window: Duration,
    ) -> bool {
        !matches!(timeout(window, self.connections.next()).await, Ok(Some(_)))
    }

    pub async fn wait_for(
        &mut self,
        check: impl Fn(&StatusSnapshot) -> bool,
    ) -> StatusSnapshot {
        timeout(WAIT, self.status.wait_for(|s| check(s)))
            .await
            .expect("status reached")
            .expect("supervisor alive")
            .clone()
    }

    pub async fn wait_status(
        &mut self,
        status: ConnectionStatus,
    ) -> StatusSnapshot {
        self.wait_for(|s| s.status == status).await
    }

    pub async fn connected(&mut self) -> MemoryConnection {
        let connection = self.next_connection().await;
        connection.subscribed();
        self.wait_status(ConnectionStatus::Connected).await;
        connection
    }
}

pub fn change(
    table: &str,
    event_type: &str,
    id: i64,
) -> RawChange {
    RawChange {
        schema: "public".to_string(),
        table: table.to_string(),
        event_type: event_type.to_string(),
        new: Some(json!({"id": id})),
        old: None,
    }
}

pub fn assert_close_to(
    actual: Duration,
    expected: Duration,
) {
    assert!(
        actual + SLACK >= expected && actual <= expected + SLACK,
        "expected ~{expected:?}, got {actual:?}"
    );
}
