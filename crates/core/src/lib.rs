//! Bookstore Core - Shared types library.
//!
//! This crate provides the domain types used across the Bookstore components:
//! - `storefront` - Session, cart, wishlist, order and catalog state
//! - `integration-tests` - End-to-end storefront scenarios
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no clocks.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, statuses and books

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
