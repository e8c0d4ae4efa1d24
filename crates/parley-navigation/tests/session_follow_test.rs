//! The navigator following a real session store.

use std::sync::Arc;
use std::time::Duration;

use parley_core::identity::Identity;
use parley_navigation::{Navigator, Screen, follow_session};
use parley_session::Session;
use parley_test_support::{ManualClock, StaticAuthProvider};

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_signed_in_resolution_advances_from_welcome_once() {
    // Arrange
    let provider = Arc::new(
        StaticAuthProvider::signed_in(Identity::new("google:1", "Ada"))
            .with_delay(Duration::from_millis(300)),
    );
    let session = Session::new(provider.clone(), Arc::new(ManualClock::new()));
    let navigator = Navigator::new();
    let driver = follow_session(navigator.clone(), session.subscribe());

    // Act
    let mid_resolution = {
        let resolving = session.resolve();
        tokio::pin!(resolving);
        tokio::select! {
            _ = &mut resolving => unreachable!("resolution finished before the delay"),
            () = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
        let screen = navigator.screen();
        resolving.await;
        screen
    };
    settle().await;
    let after_resolution = navigator.screen();
    session.rehydrate().await;
    settle().await;

    // Assert
    assert_eq!(mid_resolution, Screen::Welcome);
    assert_eq!(after_resolution, Screen::ScenarioList);
    assert_eq!(navigator.screen(), Screen::ScenarioList);
    driver.abort();
}

#[tokio::test]
async fn test_anonymous_resolution_stays_on_welcome_until_login_completes() {
    // Arrange
    let provider = Arc::new(StaticAuthProvider::anonymous());
    let session = Session::new(provider.clone(), Arc::new(ManualClock::new()));
    let navigator = Navigator::new();
    let driver = follow_session(navigator.clone(), session.subscribe());
    session.resolve().await;
    settle().await;
    let after_resolution = navigator.screen();

    // Act
    session.login("google").await.unwrap();
    settle().await;
    let after_hand_off = navigator.screen();
    provider.set_identity(Some(Identity::new("google:1", "Ada")));
    session.rehydrate().await;
    settle().await;

    // Assert
    assert_eq!(after_resolution, Screen::Welcome);
    assert_eq!(after_hand_off, Screen::Welcome);
    assert_eq!(navigator.screen(), Screen::ScenarioList);
    driver.abort();
}

#[tokio::test]
async fn test_driver_stops_when_session_is_dropped() {
    // Arrange
    let session = Session::new(
        Arc::new(StaticAuthProvider::anonymous()),
        Arc::new(ManualClock::new()),
    );
    let driver = follow_session(Navigator::new(), session.subscribe());

    // Act
    drop(session);

    // Assert
    tokio::time::timeout(Duration::from_secs(1), driver)
        .await
        .expect("driver did not stop")
        .unwrap();
}
