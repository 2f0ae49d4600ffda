//! Domain models for the storefront.
//!
//! These are the documents persisted to the key-value store. Each collection
//! that belongs to a shopper is stored per [`Owner`]: the signed-in user, or
//! the shared guest bucket before anyone signs in.

use core::fmt;

use bookstore_core::UserId;

pub mod cart;
pub mod order;
pub mod session;
pub mod user;
pub mod wishlist;

pub use cart::{Cart, CartItem, CartMerge, MAX_LINE_QUANTITY, QuantityError};
pub use order::{Order, OrderHistory, OrderStats, ShippingInfo};
pub use session::{Session, SessionEvent};
pub use user::{Address, ProfileUpdate, SignupData, StoredUser, User};
pub use wishlist::Wishlist;

/// Whose bucket a cart, wishlist or order history belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Anonymous shopper; one shared bucket per storage instance.
    Guest,
    /// A signed-in user.
    User(UserId),
}

impl Owner {
    /// The user behind this owner, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Guest => None,
            Self::User(id) => Some(*id),
        }
    }

    /// Whether this is the guest bucket.
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guest => write!(f, "guest"),
            Self::User(id) => write!(f, "{id}"),
        }
    }
}

impl From<UserId> for Owner {
    fn from(id: UserId) -> Self {
        Self::User(id)
    }
}
