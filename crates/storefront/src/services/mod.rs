//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Sign-up, login, the session and its expiry
//! - `cart` - Cart and wishlist for the current shopper, guest merge
//! - `orders` - Order placement, history and status changes
//! - `checkout` - Coupon, shipping and tax pricing
//! - `catalog` - Book listing, search and sorting
//!
//! Services are cheap to clone and share one [`auth::SessionHandle`], which
//! decides whose buckets cart and order operations touch.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
