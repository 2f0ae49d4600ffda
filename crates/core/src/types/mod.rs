//! Core types for the Bookstore.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod book;
pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use book::Book;
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use status::*;
