//! Application state shared with UI code.

use std::sync::Arc;

use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::StorefrontConfig;
use crate::db::{self, KeyValueStore};
use crate::error::Result;
use crate::models::{Order, ProfileUpdate, ShippingInfo};
use crate::services::auth::{AuthService, SessionHandle};
use crate::services::cart::CartService;
use crate::services::catalog::Catalog;
use crate::services::orders::OrderService;

/// Application state shared across the UI.
///
/// This struct is cheaply cloneable via `Arc` and owns the single session,
/// the storage backend and every service built on them.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn KeyValueStore>,
    session: SessionHandle,
    auth: AuthService,
    cart: CartService,
    orders: OrderService,
    catalog: Catalog,
}

impl AppState {
    /// Create application state from configuration.
    ///
    /// Opens the configured store, loads the catalog if a path is set and
    /// restores any unexpired session.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be opened, the catalog cannot be
    /// loaded or the stored session cannot be read.
    pub fn new(config: StorefrontConfig) -> Result<Self> {
        let store = db::open(&config.storage)?;
        let catalog = match &config.catalog_path {
            Some(path) => Catalog::load(path)?,
            None => Catalog::default(),
        };

        let state = Self::with_parts(config, store, Arc::new(SystemClock), catalog);
        state.auth().restore_session()?;
        Ok(state)
    }

    /// Assemble state from explicit parts. Does not restore a session.
    #[must_use]
    pub fn with_parts(
        config: StorefrontConfig,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        catalog: Catalog,
    ) -> Self {
        let session = SessionHandle::new(store.clone(), clock, config.session.ttl);
        let cart = CartService::new(store.clone(), session.clone());
        let auth = AuthService::new(store.clone(), session.clone(), cart.clone());
        let orders = OrderService::new(
            store.clone(),
            session.clone(),
            cart.clone(),
            config.pricing.clone(),
        );

        info!(
            persistent = config.storage.data_dir.is_some(),
            books = catalog.len(),
            "Storefront state ready"
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                session,
                auth,
                cart,
                orders,
                catalog,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the storage backend.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.store
    }

    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.inner.session
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Full checkout: place the order for the current cart, then remember
    /// the delivery address on the profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the user is not signed in, the cart is empty,
    /// the coupon is invalid or storage fails.
    pub fn checkout(&self, info: ShippingInfo) -> Result<Order> {
        let update = ProfileUpdate {
            phone: Some(info.address.phone.clone()),
            address: Some(info.address.clone()),
            ..ProfileUpdate::default()
        };
        let order = self.orders().place_order(info)?;
        if let Err(e) = self.auth().update_profile(update) {
            warn!(order_id = %order.id, error = %e, "Failed to save delivery address");
        }
        Ok(order)
    }
}
