//! Unified error handling and user-facing notices.
//!
//! Provides a unified `AppError` type wrapping every service error. UI code
//! turns any error into a [`Notice`] (a toast) with [`AppError::notice`],
//! which logs internal failures and hides their details from the shopper.

use thiserror::Error;

use crate::config::ConfigError;
use crate::db::RepositoryError;
use crate::models::{Order, SessionEvent};
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::checkout::CheckoutError;
use crate::services::orders::OrderError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Repository(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart or wishlist operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Checkout pricing failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Catalog could not be loaded.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration is invalid.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A short message for the shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}

impl Notice {
    /// Confirmation shown once an order is recorded.
    #[must_use]
    pub fn order_placed(order: &Order) -> Self {
        Self::success(format!(
            "Order placed successfully! Paying by {}",
            order.payment_method.label()
        ))
    }
}

impl From<&SessionEvent> for Notice {
    fn from(event: &SessionEvent) -> Self {
        match event {
            SessionEvent::SignedIn(user) => Self::success(format!("Welcome, {}!", user.name)),
            SessionEvent::SignedOut { .. } => Self::info("You have been signed out"),
            SessionEvent::Expired { .. } => {
                Self::info("Your session has expired, please sign in again")
            }
            SessionEvent::ProfileUpdated(_) => Self::success("Profile updated successfully!"),
        }
    }
}

const INTERNAL_MESSAGE: &str = "Something went wrong, please try again";

impl AppError {
    /// Whether this is a failure of the system rather than of the input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Repository(_)
                | Self::Catalog(_)
                | Self::Config(_)
                | Self::Auth(AuthError::Repository(_) | AuthError::PasswordHash)
                | Self::Cart(CartError::Repository(_))
                | Self::Order(
                    OrderError::Repository(_) | OrderError::Cart(CartError::Repository(_))
                )
        )
    }

    /// Convert into a notice for the shopper.
    ///
    /// Internal failures are logged and reported with a generic message.
    #[must_use]
    pub fn notice(&self) -> Notice {
        if self.is_internal() {
            tracing::error!(error = %self, "Operation failed");
            return Notice::error(INTERNAL_MESSAGE);
        }

        let message = match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AuthError::DuplicateEmail => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::InvalidName => "Please enter your name".to_string(),
                AuthError::NotAuthenticated => "Please sign in to continue".to_string(),
                AuthError::Repository(_) | AuthError::PasswordHash => INTERNAL_MESSAGE.to_string(),
            },
            Self::Cart(err) => match err {
                CartError::QuantityLimit { max, .. } => {
                    format!("You can add at most {max} copies of a book")
                }
                CartError::InvalidQuantity => "Quantity must be at least 1".to_string(),
                CartError::NotInWishlist(_) => "That book is not in your wishlist".to_string(),
                CartError::Repository(_) => INTERNAL_MESSAGE.to_string(),
            },
            Self::Order(err) => match err {
                OrderError::Unauthenticated => "Please sign in to place an order".to_string(),
                OrderError::EmptyCart => "Your cart is empty".to_string(),
                OrderError::NotFound(_) => "Order not found".to_string(),
                OrderError::InvalidTransition { from, .. } => {
                    format!("This order is already {from}")
                }
                OrderError::Checkout(CheckoutError::InvalidCoupon(_)) => {
                    "Invalid coupon code".to_string()
                }
                OrderError::Cart(_) | OrderError::Repository(_) => INTERNAL_MESSAGE.to_string(),
            },
            Self::Checkout(CheckoutError::InvalidCoupon(_)) => "Invalid coupon code".to_string(),
            Self::Repository(_) | Self::Catalog(_) | Self::Config(_) => {
                INTERNAL_MESSAGE.to_string()
            }
        };

        Notice::error(message)
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
