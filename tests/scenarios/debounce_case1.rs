//! Bursts of row changes collapse into one invalidation per cache-key prefix.

use std::time::Duration;

use medequip_realtime::query_keys;
use medequip_realtime::CacheKeyPrefix;
use tokio::time::sleep;
use tokio::time::Instant;

use crate::common::assert_close_to;
use crate::common::change;
use crate::common::enable_logger;
use crate::common::start;
use crate::common::test_config;
use crate::common::CacheOp;

#[tokio::test(start_paused = true)]
async fn test_three_updates_20ms_apart_refetch_equipment_once() {
    enable_logger();
    let mut env = start(test_config());
    let connection = env.connected().await;

    connection.change(change("thiet_bi", "UPDATE", 1));
    sleep(Duration::from_millis(20)).await;
    connection.change(change("thiet_bi", "UPDATE", 2));
    sleep(Duration::from_millis(20)).await;
    connection.change(change("thiet_bi", "UPDATE", 3));
    let third = Instant::now();

    env.wait_for(|s| s.pending_invalidations > 0).await;
    env.wait_for(|s| s.pending_invalidations == 0 && s.last_update.is_some())
        .await;

    let equipment = CacheKeyPrefix::root(query_keys::EQUIPMENT);
    let refetches = env.cache.calls_for(CacheOp::RefetchActive, &equipment);
    assert_eq!(refetches.len(), 1);
    assert_close_to(refetches[0] - third, Duration::from_millis(100));
    assert_eq!(env.cache.calls_for(CacheOp::Invalidate, &equipment).len(), 1);

    for root in [
        query_keys::DASHBOARD_STATS,
        query_keys::REPORTS,
        query_keys::EQUIPMENT_DISTRIBUTION,
    ] {
        let prefix = CacheKeyPrefix::root(root);
        assert_eq!(env.cache.calls_for(CacheOp::RefetchActive, &prefix).len(), 1, "{root}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_transfer_request_fans_out_to_equipment_and_reports() {
    enable_logger();
    let mut env = start(test_config());
    let connection = env.connected().await;

    connection.change(change("yeu_cau_luan_chuyen", "INSERT", 7));
    env.wait_for(|s| s.pending_invalidations == 4).await;
    env.wait_for(|s| s.pending_invalidations == 0).await;

    for root in [query_keys::TRANSFERS, query_keys::EQUIPMENT, query_keys::REPORTS] {
        let prefix = CacheKeyPrefix::root(root);
        assert_eq!(env.cache.calls_for(CacheOp::RefetchActive, &prefix).len(), 1, "{root}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_windows_far_apart_fire_separately() {
    enable_logger();
    let mut env = start(test_config());
    let connection = env.connected().await;
    let users = CacheKeyPrefix::root(query_keys::USERS);

    connection.change(change("nhan_vien", "UPDATE", 1));
    sleep(Duration::from_millis(250)).await;
    connection.change(change("nhan_vien", "DELETE", 1));
    sleep(Duration::from_millis(250)).await;

    assert_eq!(env.cache.calls_for(CacheOp::RefetchActive, &users).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_table_touches_nothing() {
    enable_logger();
    let mut env = start(test_config());
    let connection = env.connected().await;

    connection.change(change("bang_tam", "UPDATE", 1));
    sleep(Duration::from_secs(1)).await;

    assert_eq!(env.cache.total(), 0);
    assert!(env.handle.last_update().is_none());
    assert!(env.handle.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_steady_event_stream_does_not_delay_other_prefixes() {
    enable_logger();
    let mut env = start(test_config());
    let connection = env.connected().await;

    connection.change(change("nhan_vien", "UPDATE", 1));
    let staff_changed = Instant::now();
    for id in 0..50 {
        connection.change(change("thiet_bi", "UPDATE", id));
        sleep(Duration::from_millis(5)).await;
    }

    let users = CacheKeyPrefix::root(query_keys::USERS);
    let refetches = env.cache.calls_for(CacheOp::RefetchActive, &users);
    assert_eq!(refetches.len(), 1);
    assert_close_to(refetches[0] - staff_changed, Duration::from_millis(100));

    let equipment = CacheKeyPrefix::root(query_keys::EQUIPMENT);
    assert!(env.cache.calls_for(CacheOp::RefetchActive, &equipment).is_empty());
}
