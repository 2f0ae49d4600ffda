//! Bookstore storefront library.
//!
//! Client-side storefront state: the signed-in session and its expiry,
//! per-shopper carts and wishlists, order placement and history, checkout
//! pricing and the book catalog, all persisted to a key-value store.
//!
//! UI code talks to [`state::AppState`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod telemetry;

pub use error::{AppError, Notice, NoticeLevel};
pub use state::AppState;
