//! Authentication service.
//!
//! Provides email/password sign-up and login, the session lifecycle and
//! profile updates. Signing in folds the guest cart and wishlist into the
//! user's own.

mod error;
mod session;

pub use error::AuthError;
pub use session::SessionHandle;

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use bookstore_core::Email;

use super::cart::CartService;
use crate::db::{KeyValueStore, RepositoryError, UserRepository};
use crate::models::{ProfileUpdate, SessionEvent, SignupData, StoredUser, User};

/// Minimum password length, in characters.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Authentication service.
///
/// Handles user registration, login, logout and profile management.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn KeyValueStore>,
    session: SessionHandle,
    cart: CartService,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, session: SessionHandle, cart: CartService) -> Self {
        Self {
            store,
            session,
            cart,
        }
    }

    fn users(&self) -> UserRepository<'_> {
        UserRepository::new(self.store.as_ref())
    }

    /// Register a new user and sign them in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidName` if the name is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::DuplicateEmail` if the email is already registered.
    #[instrument(skip(self, data), fields(email = %data.email))]
    pub fn signup(&self, data: SignupData) -> Result<User, AuthError> {
        let name = validate_name(&data.name)?;
        let email = Email::parse(&data.email)?;
        validate_password(data.password.expose_secret())?;

        let password_hash = hash_password(data.password.expose_secret())?;

        let now = self.session.now();
        let stored = StoredUser {
            user: User {
                id: bookstore_core::UserId::generate(),
                name,
                email,
                phone: None,
                address: None,
                created_at: now,
                updated_at: now,
            },
            password_hash,
        };

        let stored = self.users().create(stored).map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::DuplicateEmail,
            other => AuthError::Repository(other),
        })?;

        info!(user_id = %stored.user.id, "User registered");
        self.start_session(stored.user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email is malformed.
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub fn login(&self, email: &str, password: &SecretString) -> Result<User, AuthError> {
        // Validate email format
        let email = Email::parse(email)?;

        let stored = self
            .users()
            .get_by_email(&email)?
            .ok_or(AuthError::InvalidCredentials)
            .inspect_err(|_| warn!("Login failed"))?;

        verify_password(password.expose_secret(), &stored.password_hash)
            .inspect_err(|_| warn!("Login failed"))?;

        self.start_session(stored.user)
    }

    /// Sign out. Does nothing if no one is signed in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the stored session cannot be removed.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.session.end()?;
        Ok(())
    }

    /// The signed-in user, if the session is still valid.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.session.user()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    /// Receive session events (sign-in, sign-out, expiry, profile changes).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    /// Reload a persisted, unexpired session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if storage cannot be read.
    pub fn restore_session(&self) -> Result<Option<User>, AuthError> {
        Ok(self.session.restore()?)
    }

    /// Change the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` if no one is signed in.
    /// Returns `AuthError::InvalidName` or `AuthError::InvalidEmail` for bad input.
    /// Returns `AuthError::DuplicateEmail` if the new email belongs to another user.
    #[instrument(skip(self, update))]
    pub fn update_profile(&self, update: ProfileUpdate) -> Result<User, AuthError> {
        let current = self.current_user().ok_or(AuthError::NotAuthenticated)?;
        let mut stored = self
            .users()
            .get_by_id(current.id)?
            .ok_or(AuthError::NotAuthenticated)?;

        if update.is_empty() {
            return Ok(stored.user);
        }

        if let Some(name) = update.name {
            stored.user.name = validate_name(&name)?;
        }
        if let Some(email) = update.email {
            stored.user.email = Email::parse(&email)?;
        }
        if let Some(phone) = update.phone {
            let phone = phone.trim().to_string();
            stored.user.phone = (!phone.is_empty()).then_some(phone);
        }
        if let Some(address) = update.address {
            stored.user.address = Some(address);
        }
        stored.user.updated_at = self.session.now();

        let stored = self.users().update(stored).map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::DuplicateEmail,
            other => AuthError::Repository(other),
        })?;

        self.session.replace_user(stored.user.clone())?;
        info!(user_id = %stored.user.id, "Profile updated");
        Ok(stored.user)
    }

    fn start_session(&self, user: User) -> Result<User, AuthError> {
        self.session.begin(user.clone())?;

        // A failed merge leaves the guest state for the next sign-in.
        if let Err(e) = self.cart.merge_guest_into(user.id) {
            warn!(user_id = %user.id, error = %e, "Guest merge failed");
        }
        Ok(user)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn validate_name(name: &str) -> Result<String, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::InvalidName);
    }
    Ok(name.to_string())
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
