use std::time::Duration;

use medequip_realtime::ConnectionStatus;
use medequip_realtime::Visibility;
use tokio::time::Instant;

use crate::common::enable_logger;
use crate::common::start;
use crate::common::test_config;
use crate::common::SLACK;

#[tokio::test(start_paused = true)]
async fn test_page_shown_after_giving_up_resumes_immediately() {
    enable_logger();
    let mut env = start(test_config());
    let mut connection = env.next_connection().await;
    for _ in 0..5 {
        connection.fail("CHANNEL_ERROR");
        connection = env.next_connection().await;
    }
    connection.fail("CHANNEL_ERROR");
    env.wait_for(|s| s.status == ConnectionStatus::Error && s.attempt == 5).await;

    env.handle.set_visibility(Visibility::Hidden).await.unwrap();
    env.wait_for(|s| s.visibility == Visibility::Hidden).await;
    assert!(env.no_connection_within(Duration::from_secs(60)).await);

    let shown = Instant::now();
    env.handle.set_visibility(Visibility::Visible).await.unwrap();
    let connection = env.next_connection().await;
    assert!(shown.elapsed() <= SLACK);

    connection.subscribed();
    let snapshot = env.wait_status(ConnectionStatus::Connected).await;
    assert_eq!(snapshot.attempt, 0);
    assert_eq!(snapshot.visibility, Visibility::Visible);
}

#[tokio::test(start_paused = true)]
async fn test_page_shown_while_connected_changes_nothing() {
    enable_logger();
    let mut env = start(test_config());
    let connection = env.connected().await;

    env.handle.set_visibility(Visibility::Hidden).await.unwrap();
    env.handle.set_visibility(Visibility::Visible).await.unwrap();
    env.wait_for(|s| s.visibility == Visibility::Visible).await;

    assert!(env.no_connection_within(Duration::from_secs(5)).await);
    assert!(!connection.is_released());
    assert!(env.handle.is_connected());
}
