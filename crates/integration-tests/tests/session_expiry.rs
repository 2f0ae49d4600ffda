//! Session expiry through the application state.

use std::time::Duration as StdDuration;

use chrono::Duration;
use tokio::sync::broadcast::error::TryRecvError;

use bookstore_core::BookId;
use bookstore_integration_tests::{TestContext, password, signup};
use bookstore_storefront::models::{Owner, SessionEvent};

const DAY: StdDuration = StdDuration::from_secs(24 * 60 * 60);

#[test]
fn test_session_lapses_on_access_after_ttl() {
    let ctx = TestContext::in_memory();
    let state = &ctx.state;
    let user = state
        .auth()
        .signup(signup("Kiran", "kiran@example.com", "orchid7"))
        .unwrap();
    state.cart().add_to_cart(&ctx.book(2), 1).unwrap();
    let mut events = state.auth().subscribe();

    ctx.clock.advance(Duration::hours(23) + Duration::minutes(59));
    assert!(state.auth().is_authenticated());

    ctx.clock.advance(Duration::minutes(1));
    assert!(!state.auth().is_authenticated());
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Expired { user_id: user.id }
    );

    // Cart reads now hit the guest bucket; the user's cart is intact.
    assert!(state.cart().cart().unwrap().is_empty());
    state
        .auth()
        .login("kiran@example.com", &password("orchid7"))
        .unwrap();
    assert!(state.cart().cart().unwrap().contains(BookId::new(2)));
}

#[tokio::test(start_paused = true)]
async fn test_timer_fires_without_any_access() {
    let ctx = TestContext::in_memory();
    let state = &ctx.state;
    let mut events = state.auth().subscribe();

    let user = state
        .auth()
        .signup(signup("Kiran", "kiran@example.com", "orchid7"))
        .unwrap();
    assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedIn(user.clone()));

    tokio::time::advance(DAY).await;

    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::Expired { user_id: user.id }
    );
    assert_eq!(state.session().owner(), Owner::Guest);
    assert!(state.store().get("session").unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_logout_then_login_gets_a_full_window() {
    let ctx = TestContext::in_memory();
    let state = &ctx.state;

    state
        .auth()
        .signup(signup("Kiran", "kiran@example.com", "orchid7"))
        .unwrap();
    tokio::time::advance(DAY / 2).await;
    state.auth().logout().unwrap();

    let mut events = state.auth().subscribe();
    let user = state
        .auth()
        .login("kiran@example.com", &password("orchid7"))
        .unwrap();
    let _ = events.recv().await;

    // The first login's deadline passes; the new session survives it.
    tokio::time::advance(DAY / 2 + StdDuration::from_secs(60)).await;
    tokio::task::yield_now().await;
    assert!(state.auth().is_authenticated());
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));

    tokio::time::advance(DAY / 2).await;
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::Expired { user_id: user.id }
    );
}
