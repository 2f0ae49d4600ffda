//! The live session and its expiry timer.
//!
//! A [`SessionHandle`] owns the in-memory copy of the current sign-in,
//! mirrors it to storage and broadcasts [`SessionEvent`]s. Expiry is
//! enforced two ways:
//!
//! - every read compares the session's `expires_at` with the [`Clock`];
//! - when a tokio runtime is available, a one-shot task sleeps until the
//!   deadline and then ends the session it was scheduled for.
//!
//! The task is aborted on logout and replaced on the next sign-in. It holds
//! only a weak reference to the handle and checks the session id before
//! acting, so a late timer never ends a newer session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Duration, Utc};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use bookstore_core::SessionId;

use crate::clock::Clock;
use crate::db::{KeyValueStore, RepositoryError, SessionRepository};
use crate::models::{Owner, Session, SessionEvent, User};

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 32;

/// Shared, cloneable access to the current session.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    current: Mutex<Option<Session>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(timer) = lock(&self.timer).take() {
            timer.abort();
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("ttl", &self.inner.ttl)
            .field("current", &*lock(&self.inner.current))
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    /// Create a handle with no active session.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                store,
                clock,
                ttl,
                current: Mutex::new(None),
                timer: Mutex::new(None),
                events,
            }),
        }
    }

    /// Current time according to the session clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Configured session lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// The active session, if any and not yet expired.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        let mut current = lock(&self.inner.current);
        let expired = current
            .as_ref()
            .is_some_and(|session| session.is_expired(self.now()));

        if expired {
            if let Some(timer) = lock(&self.inner.timer).take() {
                timer.abort();
            }
            if let Some(session) = current.take() {
                self.finish_expiry(&session);
            }
        }

        current.clone()
    }

    /// The signed-in user.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.current().map(|session| session.user)
    }

    /// Bucket owner for the current state: the user, or guest.
    #[must_use]
    pub fn owner(&self) -> Owner {
        self.current()
            .map_or(Owner::Guest, |session| Owner::User(session.user.id))
    }

    /// Receive session events from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Start a new session for `user`, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the session cannot be persisted.
    pub fn begin(&self, user: User) -> Result<Session, RepositoryError> {
        let session = Session::start(user, self.now(), self.inner.ttl);
        SessionRepository::new(self.inner.store.as_ref()).save(&session)?;

        let replaced = lock(&self.inner.current).replace(session.clone());
        self.schedule_expiry(&session);

        if let Some(previous) = replaced {
            info!(user_id = %previous.user.id, "Session replaced");
            self.emit(SessionEvent::SignedOut {
                user_id: previous.user.id,
            });
        }

        info!(
            user_id = %session.user.id,
            expires_at = %session.expires_at,
            "Session started"
        );
        self.emit(SessionEvent::SignedIn(session.user.clone()));
        Ok(session)
    }

    /// End the current session. Returns the user that was signed in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the stored session cannot be removed.
    /// The in-memory session is cleared regardless.
    pub fn end(&self) -> Result<Option<User>, RepositoryError> {
        if let Some(timer) = lock(&self.inner.timer).take() {
            timer.abort();
        }
        let ended = lock(&self.inner.current).take();

        let Some(session) = ended else {
            return Ok(None);
        };

        let cleared = SessionRepository::new(self.inner.store.as_ref()).clear();
        info!(user_id = %session.user.id, "Session ended");
        self.emit(SessionEvent::SignedOut {
            user_id: session.user.id,
        });

        cleared.map(|()| Some(session.user))
    }

    /// Replace the signed-in user's profile within the current session.
    ///
    /// Ignored if no session is active or it belongs to someone else.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the session cannot be persisted.
    pub fn replace_user(&self, user: User) -> Result<(), RepositoryError> {
        let mut current = lock(&self.inner.current);
        let Some(session) = current.as_mut().filter(|s| s.user.id == user.id) else {
            return Ok(());
        };

        session.user = user.clone();
        SessionRepository::new(self.inner.store.as_ref()).save(session)?;
        drop(current);

        self.emit(SessionEvent::ProfileUpdated(user));
        Ok(())
    }

    /// Reload a persisted session, discarding it if it has expired.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if storage cannot be read or cleaned up.
    pub fn restore(&self) -> Result<Option<User>, RepositoryError> {
        let repo = SessionRepository::new(self.inner.store.as_ref());
        let Some(session) = repo.load()? else {
            return Ok(None);
        };

        if session.is_expired(self.now()) {
            info!(user_id = %session.user.id, "Discarding expired stored session");
            repo.clear()?;
            return Ok(None);
        }

        *lock(&self.inner.current) = Some(session.clone());
        self.schedule_expiry(&session);
        info!(user_id = %session.user.id, "Session restored");
        Ok(Some(session.user))
    }

    /// End the session if it is still the one identified by `id`.
    ///
    /// Returns whether a session was expired.
    pub fn expire(&self, id: SessionId) -> bool {
        let mut current = lock(&self.inner.current);
        if current.as_ref().map(|session| session.id) != Some(id) {
            debug!(session_id = %id, "Stale expiry ignored");
            return false;
        }

        // Dropping the handle detaches it; the timer calling us is still running.
        drop(lock(&self.inner.timer).take());
        if let Some(session) = current.take() {
            self.finish_expiry(&session);
        }
        true
    }

    fn finish_expiry(&self, session: &Session) {
        if let Err(e) = SessionRepository::new(self.inner.store.as_ref()).clear() {
            warn!(error = %e, "Failed to remove expired session from storage");
        }
        info!(user_id = %session.user.id, "Session expired");
        self.emit(SessionEvent::Expired {
            user_id: session.user.id,
        });
    }

    fn schedule_expiry(&self, session: &Session) {
        let Ok(runtime) = Handle::try_current() else {
            debug!("No async runtime, session expiry is checked on access only");
            return;
        };

        let delay = session
            .remaining(self.now())
            .to_std()
            .unwrap_or_default();
        let deadline = Instant::now() + delay;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let id = session.id;

        let task = runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = weak.upgrade() {
                SessionHandle { inner }.expire(id);
            }
        });

        if let Some(previous) = lock(&self.inner.timer).replace(task) {
            previous.abort();
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::db::MemoryStore;
    use bookstore_core::{Email, UserId};
    use tokio::sync::broadcast::error::TryRecvError;

    fn user(name: &str) -> User {
        let now = Utc::now();
        User {
            id: UserId::generate(),
            name: name.to_string(),
            email: Email::parse(&format!("{name}@example.com")).unwrap(),
            phone: None,
            address: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn handle() -> (SessionHandle, Arc<ManualClock>, Arc<MemoryStore>) {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::new());
        let handle = SessionHandle::new(store.clone(), clock.clone(), Duration::hours(24));
        (handle, clock, store)
    }

    #[test]
    fn test_begin_and_end() {
        let (handle, _, store) = handle();
        let mut events = handle.subscribe();
        let asha = user("asha");

        handle.begin(asha.clone()).unwrap();
        assert_eq!(handle.owner(), Owner::User(asha.id));
        assert!(store.get("session").unwrap().is_some());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedIn(asha.clone()));

        let ended = handle.end().unwrap();
        assert_eq!(ended.map(|u| u.id), Some(asha.id));
        assert_eq!(handle.owner(), Owner::Guest);
        assert!(store.get("session").unwrap().is_none());
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::SignedOut { user_id: asha.id }
        );
    }

    #[test]
    fn test_end_without_session_is_noop() {
        let (handle, _, _) = handle();
        let mut events = handle.subscribe();
        assert!(handle.end().unwrap().is_none());
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_lazy_expiry_without_runtime() {
        let (handle, clock, store) = handle();
        let mut events = handle.subscribe();
        let asha = user("asha");
        handle.begin(asha.clone()).unwrap();
        let _ = events.try_recv();

        clock.advance(Duration::hours(23));
        assert!(handle.current().is_some());

        clock.advance(Duration::hours(1));
        assert!(handle.current().is_none());
        assert!(store.get("session").unwrap().is_none());
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Expired { user_id: asha.id }
        );
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_stale_expiry_ignored() {
        let (handle, _, _) = handle();
        let first = handle.begin(user("asha")).unwrap();
        let second = handle.begin(user("ravi")).unwrap();

        assert!(!handle.expire(first.id));
        assert_eq!(handle.current().map(|s| s.id), Some(second.id));
        assert!(handle.expire(second.id));
        assert!(handle.current().is_none());
    }

    #[test]
    fn test_begin_over_active_session_signs_out_previous() {
        let (handle, _, _) = handle();
        let mut events = handle.subscribe();
        let asha = user("asha");
        let ravi = user("ravi");

        handle.begin(asha.clone()).unwrap();
        handle.begin(ravi.clone()).unwrap();

        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedIn(asha.clone()));
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::SignedOut { user_id: asha.id }
        );
        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedIn(ravi.clone()));
        assert_eq!(handle.owner(), Owner::User(ravi.id));
    }

    #[test]
    fn test_restore() {
        let (handle, clock, store) = handle();
        let asha = user("asha");
        handle.begin(asha.clone()).unwrap();

        let reopened = SessionHandle::new(store.clone(), clock.clone(), Duration::hours(24));
        assert_eq!(reopened.restore().unwrap().map(|u| u.id), Some(asha.id));
        assert_eq!(reopened.owner(), Owner::User(asha.id));

        clock.advance(Duration::hours(25));
        let late = SessionHandle::new(store.clone(), clock, Duration::hours(24));
        assert!(late.restore().unwrap().is_none());
        assert!(store.get("session").unwrap().is_none());
    }

    #[test]
    fn test_replace_user() {
        let (handle, _, _) = handle();
        let mut asha = user("asha");
        handle.begin(asha.clone()).unwrap();
        let mut events = handle.subscribe();

        asha.name = "Asha R".to_string();
        handle.replace_user(asha.clone()).unwrap();

        assert_eq!(handle.user().unwrap().name, "Asha R");
        assert_eq!(events.try_recv().unwrap(), SessionEvent::ProfileUpdated(asha));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_expires_session() {
        let (handle, _, _) = handle();
        let mut events = handle.subscribe();
        let asha = user("asha");
        handle.begin(asha.clone()).unwrap();
        let _ = events.recv().await;

        tokio::time::advance(std::time::Duration::from_secs(24 * 3600)).await;
        tokio::task::yield_now().await;

        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::Expired { user_id: asha.id }
        );
        assert!(handle.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_deadline_counts_from_sign_in() {
        let (handle, _, _) = handle();
        handle.begin(user("asha")).unwrap();

        // The timer task has not been polled yet.
        tokio::time::advance(std::time::Duration::from_secs(24 * 3600)).await;
        for _ in 0..10 {
            if handle.current().is_none() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(handle.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_cancels_timer() {
        let (handle, _, _) = handle();
        let mut events = handle.subscribe();
        let asha = user("asha");
        handle.begin(asha.clone()).unwrap();
        handle.end().unwrap();
        let _ = events.recv().await;
        let _ = events.recv().await;

        tokio::time::advance(std::time::Duration::from_secs(25 * 3600)).await;
        tokio::task::yield_now().await;

        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn test_relogin_replaces_timer() {
        let (handle, _, _) = handle();
        let mut events = handle.subscribe();
        handle.begin(user("asha")).unwrap();

        tokio::time::advance(std::time::Duration::from_secs(12 * 3600)).await;
        let ravi = user("ravi");
        handle.begin(ravi.clone()).unwrap();

        // First session's deadline passes; the second is still valid.
        tokio::time::advance(std::time::Duration::from_secs(13 * 3600)).await;
        tokio::task::yield_now().await;
        assert_eq!(handle.user().map(|u| u.id), Some(ravi.id));

        tokio::time::advance(std::time::Duration::from_secs(12 * 3600)).await;
        tokio::task::yield_now().await;
        assert!(handle.current().is_none());

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(
            seen.last(),
            Some(&SessionEvent::Expired { user_id: ravi.id })
        );
        assert_eq!(
            seen.iter()
                .filter(|e| matches!(e, SessionEvent::Expired { .. }))
                .count(),
            1
        );
    }
}
