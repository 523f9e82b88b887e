use std::sync::Arc;
use std::time::Duration;

use medequip_realtime::CacheKeyPrefix;
use medequip_realtime::ConnectionStatus;
use medequip_realtime::Error;
use medequip_realtime::MemoryTransport;
use medequip_realtime::QueryCache;
use medequip_realtime::RealtimeBuilder;
use tokio::time::sleep;

use crate::common::change;
use crate::common::enable_logger;
use crate::common::start;
use crate::common::test_config;

#[tokio::test(start_paused = true)]
async fn test_shutdown_twice_leaves_nothing_pending() {
    enable_logger();
    let mut env = start(test_config());
    let connection = env.connected().await;
    connection.change(change("ke_hoach_bao_tri", "UPDATE", 4));
    env.wait_for(|s| s.pending_invalidations == 3).await;

    env.handle.shutdown().await.unwrap();
    env.handle.shutdown().await.unwrap();

    let snapshot = env.handle.snapshot();
    assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
    assert_eq!(snapshot.pending_invalidations, 0);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(env.cache.total(), 0);
    assert!(connection.is_released());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_mid_backoff_cancels_retry() {
    enable_logger();
    let mut env = start(test_config());
    let connection = env.next_connection().await;
    connection.fail("CHANNEL_ERROR");
    env.wait_for(|s| s.status == ConnectionStatus::Error).await;

    env.handle.shutdown().await.unwrap();

    assert!(env.no_connection_within(Duration::from_secs(60)).await);
    assert_eq!(env.handle.connection_status(), ConnectionStatus::Disconnected);
    assert!(matches!(env.handle.reconnect().await, Err(Error::Supervisor(_))));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_every_handle_stops_supervisor() {
    enable_logger();
    let mut env = start(test_config());
    let connection = env.connected().await;
    let observer = env.handle.subscribe();

    drop(env.handle);
    sleep(Duration::from_millis(10)).await;

    assert_eq!(observer.borrow().status, ConnectionStatus::Disconnected);
    assert!(connection.is_released());
}

struct ExplodingCache;

impl QueryCache for ExplodingCache {
    fn invalidate(
        &self,
        _prefix: &CacheKeyPrefix,
    ) {
        panic!("cache blew up");
    }

    fn refetch_active(
        &self,
        _prefix: &CacheKeyPrefix,
    ) {
    }
}

#[tokio::test(start_paused = true)]
async fn test_crashed_supervisor_stops_reporting_connected() {
    enable_logger();
    let (transport, mut connections) = MemoryTransport::new();
    let handle = RealtimeBuilder::from_config(test_config(), Arc::new(ExplodingCache))
        .transport(Arc::new(transport))
        .start()
        .unwrap();
    let mut status = handle.subscribe();

    let connection = connections.next().await.unwrap();
    connection.subscribed();
    status.wait_for(|s| s.status == ConnectionStatus::Connected).await.unwrap();

    connection.change(change("thiet_bi", "UPDATE", 2));
    sleep(Duration::from_secs(1)).await;

    assert_eq!(handle.connection_status(), ConnectionStatus::Disconnected);
    assert!(!handle.is_connected());
    assert!(matches!(handle.reconnect().await, Err(Error::Supervisor(_))));
}
