//! File-backed state survives a restart.

use std::fs;

use chrono::Duration;

use bookstore_core::BookId;
use bookstore_integration_tests::{TestContext, password, shipping, signup};
use bookstore_storefront::AppState;
use bookstore_storefront::config::{StorageConfig, StorefrontConfig};
use bookstore_storefront::services::auth::AuthError;

#[test]
fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let order_id = {
        let ctx = TestContext::on_disk(dir.path());
        let state = &ctx.state;
        state
            .auth()
            .signup(signup("Sana", "sana@example.com", "lotus123"))
            .unwrap();
        state.cart().add_to_cart(&ctx.book(1), 1).unwrap();
        let order = state.checkout(shipping(None)).unwrap();
        state.cart().add_to_cart(&ctx.book(3), 2).unwrap();
        state.cart().add_to_wishlist(&ctx.book(5)).unwrap();
        order.id
    };

    let config = StorefrontConfig {
        storage: StorageConfig {
            data_dir: Some(dir.path().to_path_buf()),
        },
        ..StorefrontConfig::default()
    };
    let state = AppState::new(config).unwrap();

    let user = state.auth().current_user().unwrap();
    assert_eq!(user.email.as_str(), "sana@example.com");
    assert_eq!(state.cart().cart_count().unwrap(), 2);
    assert!(state.cart().is_in_wishlist(BookId::new(5)).unwrap());
    assert_eq!(state.orders().orders().unwrap()[0].id, order_id);

    // Accounts persist too.
    state.auth().logout().unwrap();
    assert!(matches!(
        state
            .auth()
            .signup(signup("Sana", "sana@example.com", "lotus123")),
        Err(AuthError::DuplicateEmail)
    ));
    state
        .auth()
        .login("sana@example.com", &password("lotus123"))
        .unwrap();
}

#[test]
fn test_expired_session_is_not_restored() {
    let dir = tempfile::tempdir().unwrap();
    {
        let ctx = TestContext::on_disk(dir.path());
        ctx.state
            .auth()
            .signup(signup("Sana", "sana@example.com", "lotus123"))
            .unwrap();
    }

    let later = TestContext::on_disk(dir.path());
    later.clock.advance(Duration::hours(25));
    assert!(later.state.auth().restore_session().unwrap().is_none());
    assert!(!dir.path().join("session.json").exists());
}

#[test]
fn test_corrupt_documents_are_treated_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("cart_guest.json"), "{{{").unwrap();
    fs::write(dir.path().join("users.json"), "not json").unwrap();

    let ctx = TestContext::on_disk(dir.path());
    assert!(ctx.state.cart().cart().unwrap().is_empty());

    ctx.state
        .auth()
        .signup(signup("Sana", "sana@example.com", "lotus123"))
        .unwrap();
    ctx.state.cart().add_to_cart(&ctx.book(1), 1).unwrap();
    assert_eq!(ctx.state.cart().cart_count().unwrap(), 1);
}
