//! Order placement and history.

use std::sync::Arc;

use chrono::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

use bookstore_core::{OrderId, OrderStatus};

use super::auth::SessionHandle;
use super::cart::{CartError, CartService};
use super::checkout::{CheckoutError, PricingConfig, quote};
use crate::db::{BucketRepository, KeyValueStore, RepositoryError};
use crate::models::{CartItem, Order, OrderHistory, OrderStats, Owner, ShippingInfo};

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Orders require a signed-in user.
    #[error("please sign in to place an order")]
    Unauthenticated,

    /// Nothing to order.
    #[error("cart is empty")]
    EmptyCart,

    /// No order with this ID in the user's history.
    #[error("order {0} not found")]
    NotFound(OrderId),

    /// The status change is not allowed.
    #[error("cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Pricing failed (e.g., bad coupon).
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Clearing the cart after an order failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Repository/storage error.
    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Order operations for the signed-in user.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn KeyValueStore>,
    session: SessionHandle,
    cart: CartService,
    pricing: PricingConfig,
}

impl OrderService {
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        session: SessionHandle,
        cart: CartService,
        pricing: PricingConfig,
    ) -> Self {
        Self {
            store,
            session,
            cart,
            pricing,
        }
    }

    fn buckets(&self) -> BucketRepository<'_> {
        BucketRepository::new(self.store.as_ref())
    }

    #[must_use]
    pub const fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    /// Price `items`, record a pending order and prepend it to the history.
    ///
    /// The cart itself is left alone; see [`Self::place_order`].
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Unauthenticated` if no one is signed in,
    /// `OrderError::EmptyCart` if `items` is empty and
    /// `OrderError::Checkout` for an invalid coupon.
    #[instrument(skip(self, items, info), fields(lines = items.len()))]
    pub fn create_order(&self, items: &[CartItem], info: ShippingInfo) -> Result<Order, OrderError> {
        let user = self.session.user().ok_or(OrderError::Unauthenticated)?;
        if items.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let quote = quote(items, info.coupon.as_deref(), &self.pricing)?;
        let now = self.session.now();

        let order = Order {
            id: OrderId::generate(),
            user_id: user.id,
            items: items.to_vec(),
            subtotal: quote.subtotal,
            tax: quote.tax,
            shipping: quote.shipping,
            discount: quote.discount,
            coupon: quote.coupon.map(str::to_string),
            total: quote.total,
            shipping_address: info.address,
            payment_method: info.payment_method,
            status: OrderStatus::Pending,
            created_at: now,
            estimated_delivery: now + Duration::days(self.pricing.delivery_days),
        };

        let owner = Owner::User(user.id);
        let mut history: OrderHistory = self.buckets().load(owner)?;
        history.prepend(order.clone());
        self.buckets().save(owner, &history)?;

        info!(order_id = %order.id, user_id = %user.id, total = %order.total, "Order created");
        Ok(order)
    }

    /// Check out the current cart: create the order, then empty the cart.
    ///
    /// Once the order is recorded the call succeeds; a cart that cannot be
    /// cleared afterwards is only logged.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_order`], plus `OrderError::Cart` if the cart
    /// cannot be read.
    pub fn place_order(&self, info: ShippingInfo) -> Result<Order, OrderError> {
        if self.session.user().is_none() {
            return Err(OrderError::Unauthenticated);
        }

        let cart = self.cart.cart()?;
        let order = self.create_order(cart.items(), info)?;
        if let Err(e) = self.cart.clear_cart() {
            warn!(order_id = %order.id, error = %e, "Failed to clear cart after order");
        }
        Ok(order)
    }

    /// The signed-in user's orders, newest first. Empty for guests.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if storage cannot be read.
    pub fn orders(&self) -> Result<Vec<Order>, OrderError> {
        Ok(self.history()?.into_orders())
    }

    /// # Errors
    ///
    /// Returns `OrderError::Repository` if storage cannot be read.
    pub fn get_order(&self, id: OrderId) -> Result<Option<Order>, OrderError> {
        Ok(self.history()?.get(id).cloned())
    }

    /// Move an order out of `pending`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Unauthenticated` if no one is signed in,
    /// `OrderError::NotFound` if the order is not in the user's history and
    /// `OrderError::InvalidTransition` if the order is no longer pending or
    /// `status` is `pending`.
    #[instrument(skip(self))]
    pub fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, OrderError> {
        let user = self.session.user().ok_or(OrderError::Unauthenticated)?;
        let owner = Owner::User(user.id);

        let mut history: OrderHistory = self.buckets().load(owner)?;
        let order = history.get_mut(id).ok_or(OrderError::NotFound(id))?;

        if !order.status.can_transition_to(status) {
            warn!(from = %order.status, to = %status, "Rejected order status change");
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: status,
            });
        }
        order.status = status;
        let updated = order.clone();

        self.buckets().save(owner, &history)?;
        info!(order_id = %id, status = %status, "Order status updated");
        Ok(updated)
    }

    /// Cancel a pending order.
    ///
    /// # Errors
    ///
    /// See [`Self::update_order_status`].
    pub fn cancel_order(&self, id: OrderId) -> Result<Order, OrderError> {
        self.update_order_status(id, OrderStatus::Cancelled)
    }

    /// Counts by status and total spend for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if storage cannot be read.
    pub fn order_stats(&self) -> Result<OrderStats, OrderError> {
        Ok(self.history()?.stats())
    }

    fn history(&self) -> Result<OrderHistory, OrderError> {
        match self.session.user() {
            Some(user) => Ok(self.buckets().load(Owner::User(user.id))?),
            None => Ok(OrderHistory::default()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::db::MemoryStore;
    use crate::models::{Address, User};
    use bookstore_core::{Book, BookId, CurrencyCode, Email, PaymentMethod, Price, UserId};
    use chrono::Utc;

    struct Fixture {
        orders: OrderService,
        cart: CartService,
        session: SessionHandle,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let session = SessionHandle::new(
            store.clone(),
            Arc::new(ManualClock::default()),
            chrono::Duration::hours(24),
        );
        let cart = CartService::new(store.clone(), session.clone());
        let orders = OrderService::new(
            store,
            session.clone(),
            cart.clone(),
            PricingConfig::default(),
        );
        Fixture {
            orders,
            cart,
            session,
        }
    }

    /// Memory store whose deletes fail.
    struct StickyStore(MemoryStore);

    impl KeyValueStore for StickyStore {
        fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
            self.0.set(key, value)
        }

        fn remove(&self, _key: &str) -> Result<(), RepositoryError> {
            Err(RepositoryError::Unavailable("delete refused".to_string()))
        }
    }

    fn sign_in(session: &SessionHandle) -> User {
        let now = Utc::now();
        let user = User {
            id: UserId::generate(),
            name: "Dev".to_string(),
            email: Email::parse("dev@example.com").unwrap(),
            phone: None,
            address: None,
            created_at: now,
            updated_at: now,
        };
        session.begin(user.clone()).unwrap();
        user
    }

    fn book(id: i32, price: i64) -> Book {
        Book::new(
            BookId::new(id),
            "Title",
            "Author",
            "Fiction",
            Price::whole(price, CurrencyCode::INR),
        )
    }

    fn info(coupon: Option<&str>) -> ShippingInfo {
        ShippingInfo {
            address: Address::default(),
            payment_method: PaymentMethod::Upi,
            coupon: coupon.map(str::to_string),
        }
    }

    fn items() -> Vec<CartItem> {
        vec![CartItem {
            book: book(1, 500),
            quantity: 2,
        }]
    }

    #[test]
    fn test_create_order_requires_user() {
        let f = fixture();
        assert!(matches!(
            f.orders.create_order(&items(), info(None)),
            Err(OrderError::Unauthenticated)
        ));
        assert!(f.orders.orders().unwrap().is_empty());
    }

    #[test]
    fn test_create_order_rejects_empty_cart() {
        let f = fixture();
        sign_in(&f.session);
        assert!(matches!(
            f.orders.create_order(&[], info(None)),
            Err(OrderError::EmptyCart)
        ));
    }

    #[test]
    fn test_create_order_prices_and_prepends() {
        let f = fixture();
        let user = sign_in(&f.session);

        let first = f.orders.create_order(&items(), info(None)).unwrap();
        let second = f.orders.create_order(&items(), info(Some("book10"))).unwrap();

        assert_eq!(first.user_id, user.id);
        assert_eq!(first.status, OrderStatus::Pending);
        assert_eq!(first.subtotal, Price::whole(1000, CurrencyCode::INR));
        assert!(first.shipping.is_zero());
        assert_eq!(first.total, Price::whole(1180, CurrencyCode::INR));
        assert_eq!(first.estimated_delivery - first.created_at, Duration::days(7));
        assert_eq!(second.coupon.as_deref(), Some("BOOK10"));
        assert_ne!(first.id, second.id);

        let ids: Vec<OrderId> = f.orders.orders().unwrap().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_invalid_coupon_creates_nothing() {
        let f = fixture();
        sign_in(&f.session);
        assert!(matches!(
            f.orders.create_order(&items(), info(Some("NOPE"))),
            Err(OrderError::Checkout(CheckoutError::InvalidCoupon(_)))
        ));
        assert!(f.orders.orders().unwrap().is_empty());
    }

    #[test]
    fn test_place_order_clears_cart() {
        let f = fixture();
        sign_in(&f.session);
        f.cart.add_to_cart(&book(1, 200), 2).unwrap();
        f.cart.add_to_cart(&book(2, 300), 1).unwrap();

        let order = f.orders.place_order(info(None)).unwrap();

        assert_eq!(order.item_count(), 3);
        assert!(f.cart.cart().unwrap().is_empty());
        assert_eq!(f.orders.get_order(order.id).unwrap(), Some(order));
    }

    #[test]
    fn test_guest_cannot_place_order() {
        let f = fixture();
        f.cart.add_to_cart(&book(1, 200), 1).unwrap();
        assert!(matches!(
            f.orders.place_order(info(None)),
            Err(OrderError::Unauthenticated)
        ));
        assert_eq!(f.cart.cart_count().unwrap(), 1);
    }

    #[test]
    fn test_status_transitions() {
        let f = fixture();
        sign_in(&f.session);
        let delivered = f.orders.create_order(&items(), info(None)).unwrap();
        let cancelled = f.orders.create_order(&items(), info(None)).unwrap();

        f.orders
            .update_order_status(delivered.id, OrderStatus::Delivered)
            .unwrap();
        f.orders.cancel_order(cancelled.id).unwrap();

        assert!(matches!(
            f.orders.update_order_status(delivered.id, OrderStatus::Cancelled),
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Cancelled
            })
        ));
        assert!(matches!(
            f.orders.update_order_status(OrderId::generate(), OrderStatus::Delivered),
            Err(OrderError::NotFound(_))
        ));

        let stats = f.orders.order_stats().unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.total_spent, Price::whole(2360, CurrencyCode::INR));
    }

    #[test]
    fn test_orders_scoped_to_user() {
        let f = fixture();
        sign_in(&f.session);
        let order = f.orders.create_order(&items(), info(None)).unwrap();
        f.session.end().unwrap();

        assert!(f.orders.orders().unwrap().is_empty());
        assert!(f.orders.get_order(order.id).unwrap().is_none());

        sign_in(&f.session);
        assert!(f.orders.orders().unwrap().is_empty());
    }

    #[test]
    fn test_place_order_succeeds_when_cart_clear_fails() {
        let store: Arc<dyn KeyValueStore> = Arc::new(StickyStore(MemoryStore::new()));
        let session = SessionHandle::new(
            store.clone(),
            Arc::new(ManualClock::default()),
            chrono::Duration::hours(24),
        );
        let cart = CartService::new(store.clone(), session.clone());
        let orders = OrderService::new(
            store,
            session.clone(),
            cart.clone(),
            PricingConfig::default(),
        );
        sign_in(&session);
        cart.add_to_cart(&book(1, 500), 1).unwrap();

        let order = orders.place_order(info(None)).unwrap();

        assert_eq!(orders.orders().unwrap().len(), 1);
        assert_eq!(orders.orders().unwrap()[0].id, order.id);
    }
}
