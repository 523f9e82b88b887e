//! Channel failures retry with capped exponential backoff; a manual
//! reconnect starts over.

use std::time::Duration;

use medequip_realtime::ConnectionStatus;
use tokio::time::Instant;

use crate::common::assert_close_to;
use crate::common::enable_logger;
use crate::common::start;
use crate::common::test_config;
use crate::common::SLACK;

#[tokio::test(start_paused = true)]
async fn test_channel_error_backs_off_then_stays_in_error() {
    enable_logger();
    let mut env = start(test_config());
    let mut connection = env.connected().await;

    let mut gaps = Vec::new();
    for attempt in 1..=5u32 {
        connection.fail("CHANNEL_ERROR");
        env.wait_for(|s| s.status == ConnectionStatus::Error && s.attempt == attempt)
            .await;
        let failed_at = Instant::now();
        connection = env.next_connection().await;
        gaps.push(failed_at.elapsed());
    }

    for (gap, expected_ms) in gaps.into_iter().zip([1000u64, 2000, 4000, 8000, 16000]) {
        assert_close_to(gap, Duration::from_millis(expected_ms));
    }

    connection.fail("CHANNEL_ERROR");
    env.wait_for(|s| s.status == ConnectionStatus::Error && s.attempt == 5)
        .await;
    assert!(env.no_connection_within(Duration::from_secs(600)).await);
    assert_eq!(env.handle.connection_status(), ConnectionStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_respects_configured_cap() {
    enable_logger();
    let mut config = test_config();
    config.reconnect.max_attempts = 8;
    config.reconnect.base_delay_ms = 500;
    config.reconnect.max_delay_ms = 3000;
    let mut env = start(config);
    let mut connection = env.next_connection().await;

    let mut gaps = Vec::new();
    for attempt in 1..=8u32 {
        connection.time_out();
        env.wait_for(|s| s.status == ConnectionStatus::Error && s.attempt == attempt)
            .await;
        let failed_at = Instant::now();
        connection = env.next_connection().await;
        gaps.push(failed_at.elapsed());
    }

    let expected = [500u64, 1000, 2000, 3000, 3000, 3000, 3000, 3000];
    for (gap, expected_ms) in gaps.into_iter().zip(expected) {
        assert_close_to(gap, Duration::from_millis(expected_ms));
    }
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_mid_backoff_cancels_retry_and_resets_count() {
    enable_logger();
    let mut env = start(test_config());
    let mut connection = env.next_connection().await;

    for attempt in 1..=3u32 {
        connection.fail("CHANNEL_ERROR");
        env.wait_for(|s| s.attempt == attempt && s.status == ConnectionStatus::Error)
            .await;
        if attempt < 3 {
            connection = env.next_connection().await;
        }
    }
    assert_eq!(env.handle.snapshot().attempt, 3);

    let requested = Instant::now();
    env.handle.reconnect().await.unwrap();
    let fresh = env.next_connection().await;
    assert!(requested.elapsed() <= SLACK);

    let snapshot = env.wait_status(ConnectionStatus::Connecting).await;
    assert_eq!(snapshot.attempt, 0);

    fresh.fail("CHANNEL_ERROR");
    env.wait_for(|s| s.status == ConnectionStatus::Error && s.attempt == 1)
        .await;
    let failed_at = Instant::now();
    env.next_connection().await;
    // counting restarted from attempt 0
    assert_close_to(failed_at.elapsed(), Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_status_moves_through_error_before_connecting_again() {
    enable_logger();
    let mut env = start(test_config());
    let connection = env.connected().await;

    let mut observer = env.handle.subscribe();
    let initial = observer.borrow_and_update().status;
    let recorder = tokio::spawn(async move {
        let mut seen = vec![initial];
        while observer.changed().await.is_ok() {
            seen.push(observer.borrow_and_update().status);
            if seen.len() > 1 && seen.last() == Some(&ConnectionStatus::Connected) {
                break;
            }
        }
        seen
    });

    connection.close();
    let retry = env.next_connection().await;
    retry.subscribed();
    env.wait_status(ConnectionStatus::Connected).await;

    let mut seen = recorder.await.unwrap();
    seen.dedup();
    assert_eq!(seen.first(), Some(&ConnectionStatus::Connected));
    assert_eq!(seen.last(), Some(&ConnectionStatus::Connected));
    assert!(seen.contains(&ConnectionStatus::Error), "{seen:?}");
    assert!(!seen
        .windows(2)
        .any(|w| w == [ConnectionStatus::Connected, ConnectionStatus::Connecting]));
}

#[tokio::test(start_paused = true)]
async fn test_huge_backoff_schedules_without_firing() {
    enable_logger();
    let mut config = test_config();
    config.reconnect.base_delay_ms = u64::MAX;
    config.reconnect.max_delay_ms = u64::MAX;
    let mut env = start(config);
    let connection = env.connected().await;

    connection.fail("CHANNEL_ERROR");
    let snapshot = env.wait_for(|s| s.status == ConnectionStatus::Error).await;
    assert_eq!(snapshot.attempt, 1);

    assert!(env.no_connection_within(Duration::from_secs(3_600)).await);
    env.handle.reconnect().await.unwrap();
    env.next_connection().await;
}
