//! Session store: the single source of truth for auth and profile state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::{debug, trace};

use super::{PersistedSession, Profile, ProfileStatus, SessionState, SubscriptionId, User};

/// Post-mutation observer, called with `(next, previous)`.
pub type Listener = Arc<dyn Fn(&SessionState, &SessionState) + Send + Sync>;

/// Thread-safe container for the session snapshot.
///
/// Every mutator builds a new [`SessionState`] from the current one and swaps
/// it in whole, so readers holding an older snapshot never see a torn state.
/// Mutators cannot fail. Listeners run synchronously after each swap, in
/// mutation order; they must not call mutators on the same store.
pub struct SessionStore {
    state: RwLock<Arc<SessionState>>,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    /// Held across swap and notification so listeners see mutations in order.
    dispatch: Mutex<()>,
    hydrated: AtomicBool,
}

impl SessionStore {
    /// Create a store at the process-start defaults.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(SessionState::default())),
            listeners: RwLock::new(Vec::new()),
            dispatch: Mutex::new(()),
            hydrated: AtomicBool::new(false),
        }
    }

    /// Get the current snapshot.
    pub fn snapshot(&self) -> Arc<SessionState> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&state)
    }

    /// Set the user; `is_authenticated` follows `user.is_some()`.
    pub fn set_user(&self, user: Option<User>) {
        self.apply("set_user", |state| {
            state.is_authenticated = user.is_some();
            state.user = user;
        });
    }

    /// Replace both tokens together.
    pub fn set_tokens(&self, access_token: Option<String>, refresh_token: Option<String>) {
        self.apply("set_tokens", |state| {
            state.access_token = access_token;
            state.refresh_token = refresh_token;
        });
    }

    /// Replace the profile wholesale.
    pub fn set_profile(&self, profile: Option<Profile>) {
        self.apply("set_profile", |state| state.profile = profile);
    }

    /// Shallow-merge `partial` into the profile.
    ///
    /// With no current profile the result is `partial` alone.
    pub fn update_profile(&self, partial: Profile) {
        self.apply("update_profile", |state| match state.profile.as_mut() {
            Some(profile) => profile.merge(partial),
            None => state.profile = Some(partial),
        });
    }

    /// Replace the profile status.
    pub fn set_profile_status(&self, status: ProfileStatus) {
        self.apply("set_profile_status", |state| state.profile_status = status);
    }

    /// Replace the loading flag.
    pub fn set_loading(&self, loading: bool) {
        self.apply("set_loading", |state| state.loading = loading);
    }

    /// Reset every field to its default in one transition.
    pub fn logout(&self) {
        self.apply("logout", |state| *state = SessionState::default());
    }

    /// Register a post-mutation listener.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&SessionState, &SessionState) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        debug!(subscription = %id, "listener registered");
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        before != listeners.len()
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Replace the whole state with a rehydrated snapshot.
    ///
    /// Listeners are not notified, so nothing is written back to storage.
    /// Only the first hydration takes effect; returns whether this one did.
    pub fn hydrate(&self, persisted: PersistedSession) -> bool {
        self.finish_hydration(Some(persisted))
    }

    /// Whether a rehydration pass has completed.
    pub fn has_hydrated(&self) -> bool {
        self.hydrated.load(Ordering::Acquire)
    }

    /// Complete rehydration; `None` keeps the current state.
    ///
    /// A no-op once the store has hydrated, so a late pass cannot put a
    /// stale snapshot over newer mutations.
    pub(crate) fn finish_hydration(&self, persisted: Option<PersistedSession>) -> bool {
        let _dispatch = self.lock_dispatch();
        if self
            .hydrated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("store already hydrated, snapshot ignored");
            return false;
        }
        if let Some(persisted) = persisted {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            *state = Arc::new(SessionState::from(persisted));
        }
        true
    }

    fn apply<F>(&self, operation: &'static str, f: F)
    where
        F: FnOnce(&mut SessionState),
    {
        let _dispatch = self.lock_dispatch();

        let (previous, next) = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let previous = Arc::clone(&state);
            let mut next = SessionState::clone(&previous);
            f(&mut next);
            let next = Arc::new(next);
            *state = Arc::clone(&next);
            (previous, next)
        };
        trace!(operation, "session state replaced");

        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(&next, &previous);
        }
    }

    fn lock_dispatch(&self) -> MutexGuard<'_, ()> {
        self.dispatch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.snapshot())
            .field("listeners", &self.listener_count())
            .field("hydrated", &self.has_hydrated())
            .finish()
    }
}
