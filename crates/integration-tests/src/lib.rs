//! Integration tests for the Bookstore storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bookstore-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `shopping_flow` - Guest shopping, sign-in merge, checkout and history
//! - `session_expiry` - Lazy and timer-driven session expiry
//! - `persistence` - File-backed state surviving a restart
//!
//! Shared fixtures live here so every test file builds state the same way.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::path::Path;
use std::sync::Arc;

use secrecy::SecretString;

use bookstore_core::{Book, BookId, CurrencyCode, PaymentMethod, Price};
use bookstore_storefront::AppState;
use bookstore_storefront::clock::ManualClock;
use bookstore_storefront::config::{StorageConfig, StorefrontConfig};
use bookstore_storefront::db::{FileStore, KeyValueStore, MemoryStore};
use bookstore_storefront::models::{Address, ShippingInfo, SignupData};
use bookstore_storefront::services::catalog::Catalog;

/// Catalog used across the integration tests.
pub const CATALOG_JSON: &str = r#"[
    {"id": 1, "title": "The Silent River", "author": "Anita Rao", "category": "Fiction",
     "price": {"amount": "200"}, "rating": 4.5, "reviews": 1200, "bestseller": true},
    {"id": 2, "title": "Atomic Focus", "author": "J. Clear", "category": "Self-Help",
     "price": {"amount": "300"}, "rating": 4.8, "reviews": 5400, "bestseller": true},
    {"id": 3, "title": "River Songs", "author": "K. Menon", "category": "Poetry",
     "price": {"amount": "150"}, "rating": 3.9, "reviews": 80},
    {"id": 5, "title": "Midnight Library Tales", "author": "R. Silent", "category": "Fiction",
     "price": {"amount": "799"}, "rating": 4.1, "reviews": 640}
]"#;

/// Application state wired to a controllable clock.
pub struct TestContext {
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub store: Arc<dyn KeyValueStore>,
}

impl TestContext {
    /// Fresh in-memory state.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_store(StorefrontConfig::default(), Arc::new(MemoryStore::new()))
    }

    /// State backed by files under `dir`.
    #[must_use]
    pub fn on_disk(dir: &Path) -> Self {
        let config = StorefrontConfig {
            storage: StorageConfig {
                data_dir: Some(dir.to_path_buf()),
            },
            ..StorefrontConfig::default()
        };
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir).unwrap());
        Self::with_store(config, store)
    }

    fn with_store(config: StorefrontConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let clock = Arc::new(ManualClock::default());
        let catalog = Catalog::from_json(CATALOG_JSON).unwrap();
        let state = AppState::with_parts(config, store.clone(), clock.clone(), catalog);
        Self {
            state,
            clock,
            store,
        }
    }

    /// Look up a catalog book that must exist.
    #[must_use]
    pub fn book(&self, id: i32) -> Book {
        self.state.catalog().get(BookId::new(id)).cloned().unwrap()
    }
}

/// A book outside the catalog.
#[must_use]
pub fn book(id: i32, price: i64) -> Book {
    Book::new(
        BookId::new(id),
        format!("Book {id}"),
        "Author",
        "Fiction",
        Price::whole(price, CurrencyCode::INR),
    )
}

#[must_use]
pub fn signup(name: &str, email: &str, password: &str) -> SignupData {
    SignupData {
        name: name.to_string(),
        email: email.to_string(),
        password: SecretString::from(password.to_string()),
    }
}

#[must_use]
pub fn password(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

#[must_use]
pub fn address() -> Address {
    Address {
        name: "Priya Sharma".to_string(),
        phone: "9876543210".to_string(),
        line1: "Flat 4B, Lotus Apartments".to_string(),
        line2: Some("Koramangala".to_string()),
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        postal_code: "560034".to_string(),
    }
}

#[must_use]
pub fn shipping(coupon: Option<&str>) -> ShippingInfo {
    ShippingInfo {
        address: address(),
        payment_method: PaymentMethod::Upi,
        coupon: coupon.map(str::to_string),
    }
}
