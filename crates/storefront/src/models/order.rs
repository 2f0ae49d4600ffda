//! Order records and per-user order history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookstore_core::{CurrencyCode, OrderId, OrderStatus, PaymentMethod, Price, UserId};

use super::cart::CartItem;
use super::user::Address;

/// A placed order.
///
/// Everything except `status` is fixed at creation; `items` is a snapshot
/// of the cart so later price changes never rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub subtotal: Price,
    pub tax: Price,
    pub shipping: Price,
    pub discount: Price,
    /// Applied coupon code, uppercased.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon: Option<String>,
    pub total: Price,
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub estimated_delivery: DateTime<Utc>,
}

impl Order {
    /// Number of copies across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// What the shopper enters at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingInfo {
    pub address: Address,
    pub payment_method: PaymentMethod,
    pub coupon: Option<String>,
}

/// Aggregate figures over a user's orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderStats {
    pub total: usize,
    pub pending: usize,
    pub delivered: usize,
    pub cancelled: usize,
    /// Sum of order totals regardless of status.
    pub total_spent: Price,
}

/// A user's orders, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderHistory {
    orders: Vec<Order>,
}

impl OrderHistory {
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    #[must_use]
    pub fn into_orders(self) -> Vec<Order> {
        self.orders
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Insert an order at the front.
    pub fn prepend(&mut self, order: Order) {
        self.orders.insert(0, order);
    }

    #[must_use]
    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| order.id == id)
    }

    pub fn get_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        self.orders.iter_mut().find(|order| order.id == id)
    }

    #[must_use]
    pub fn stats(&self) -> OrderStats {
        let count = |status: OrderStatus| {
            self.orders
                .iter()
                .filter(|order| order.status == status)
                .count()
        };
        let currency = self
            .orders
            .first()
            .map_or_else(CurrencyCode::default, |order| order.total.currency_code);

        OrderStats {
            total: self.orders.len(),
            pending: count(OrderStatus::Pending),
            delivered: count(OrderStatus::Delivered),
            cancelled: count(OrderStatus::Cancelled),
            total_spent: Price::sum(self.orders.iter().map(|order| order.total), currency),
        }
    }
}
