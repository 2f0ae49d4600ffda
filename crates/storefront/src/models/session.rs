//! Session-related types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use bookstore_core::{SessionId, UserId};

use super::user::User;

/// The signed-in user plus its validity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Distinguishes one sign-in from the next for the same user.
    pub id: SessionId,
    pub user: User,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `user` that lasts `ttl` from `now`.
    #[must_use]
    pub fn start(user: User, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: SessionId::generate(),
            user,
            started_at: now,
            expires_at: now + ttl,
        }
    }

    /// Whether the session is no longer valid at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, zero once expired.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

/// Notifications emitted when the session changes.
///
/// UI code subscribes to these to refresh views and show notices, most
/// importantly for expiry, which happens without any user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A user signed up or logged in.
    SignedIn(User),
    /// The user logged out.
    SignedOut { user_id: UserId },
    /// The session reached the end of its validity window.
    Expired { user_id: UserId },
    /// The signed-in user's profile changed.
    ProfileUpdated(User),
}
