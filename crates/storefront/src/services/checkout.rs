//! Checkout pricing: coupons, shipping, tax and order totals.

use rust_decimal::Decimal;
use thiserror::Error;

use bookstore_core::Price;

pub use crate::config::PricingConfig;
use crate::models::CartItem;

/// Errors raised while pricing a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// The coupon code is not recognised.
    #[error("invalid coupon code: {0}")]
    InvalidCoupon(String),
}

/// How a coupon reduces the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discount {
    /// Percentage of the subtotal.
    Percent(u32),
    /// Fixed amount in whole currency units.
    Flat(i64),
}

/// A redeemable coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coupon {
    pub code: &'static str,
    pub discount: Discount,
}

/// Every coupon the store accepts.
pub const COUPONS: &[Coupon] = &[
    Coupon {
        code: "BOOK10",
        discount: Discount::Percent(10),
    },
    Coupon {
        code: "BOOK20",
        discount: Discount::Percent(20),
    },
    Coupon {
        code: "WELCOME10",
        discount: Discount::Percent(10),
    },
    Coupon {
        code: "FIRSTORDER",
        discount: Discount::Flat(100),
    },
];

impl Coupon {
    /// Look up a coupon, ignoring case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidCoupon` for unknown codes.
    pub fn find(code: &str) -> Result<Self, CheckoutError> {
        let normalized = code.trim().to_ascii_uppercase();
        COUPONS
            .iter()
            .find(|coupon| coupon.code == normalized)
            .copied()
            .ok_or_else(|| CheckoutError::InvalidCoupon(code.trim().to_string()))
    }

    /// Amount taken off `subtotal`, never more than the subtotal itself.
    #[must_use]
    pub fn discount_on(&self, subtotal: Price) -> Price {
        let raw = match self.discount {
            Discount::Percent(percent) => subtotal.scaled(Decimal::new(i64::from(percent), 2)),
            Discount::Flat(units) => Price::whole(units, subtotal.currency_code),
        };
        raw.min(subtotal)
    }
}

/// Priced breakdown of a prospective order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuote {
    pub subtotal: Price,
    pub shipping: Price,
    pub tax: Price,
    pub discount: Price,
    /// Canonical code of the applied coupon.
    pub coupon: Option<&'static str>,
    pub total: Price,
}

/// Price `items` under `pricing`, applying `coupon` if given.
///
/// Blank coupon codes are treated as no coupon.
///
/// # Errors
///
/// Returns `CheckoutError::InvalidCoupon` if the coupon is unknown.
pub fn quote(
    items: &[CartItem],
    coupon: Option<&str>,
    pricing: &PricingConfig,
) -> Result<OrderQuote, CheckoutError> {
    let coupon = coupon
        .filter(|code| !code.trim().is_empty())
        .map(Coupon::find)
        .transpose()?;

    let subtotal =
        Price::sum(items.iter().map(CartItem::line_total), pricing.currency).rounded();

    let shipping = if items.is_empty() || subtotal.amount >= pricing.free_shipping_threshold.amount
    {
        Price::zero(pricing.currency)
    } else {
        pricing.shipping_fee
    };

    let tax = subtotal.scaled(pricing.tax_rate);
    let discount = coupon.map_or_else(
        || Price::zero(pricing.currency),
        |coupon| coupon.discount_on(subtotal),
    );
    let total = (subtotal + shipping + tax).saturating_sub(discount).rounded();

    Ok(OrderQuote {
        subtotal,
        shipping,
        tax,
        discount,
        coupon: coupon.map(|coupon| coupon.code),
        total,
    })
}
