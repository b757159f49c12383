//! Auth session store.
//!
//! Holds the bearer token and the vendor profile. `is_authenticated` is not
//! stored separately; it is derived from the presence of a token, so the two
//! can never disagree. Every change is written through to the configured
//! [`SessionStorage`].

pub mod lifecycle;
pub mod storage;

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument, warn};

use crate::api::types::Profile;

pub use lifecycle::{
    BlockReason, Navigator, Route, SessionController, SessionPhase, TeardownReason,
};
pub use storage::{
    FileStorage, MemoryStorage, PersistedAuth, PersistedState, SessionStorage, StorageError,
};

/// Point-in-time view of the session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<SecretString>,
    profile: Option<Profile>,
}

impl Session {
    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    #[must_use]
    pub const fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn to_persisted(&self) -> PersistedState {
        PersistedState {
            auth: PersistedAuth {
                token: self.token.as_ref().map(|t| t.expose_secret().to_string()),
                profile: self.profile.clone(),
                is_authenticated: self.is_authenticated(),
            },
        }
    }
}

/// Process-wide session store.
pub struct SessionStore {
    state: RwLock<Session>,
    storage: Arc<dyn SessionStorage>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create an empty store backed by `storage`, ignoring anything persisted.
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            state: RwLock::new(Session::default()),
            storage,
        }
    }

    /// Rehydrate from persisted state.
    ///
    /// A persisted token makes the session authenticated optimistically; the
    /// first profile fetch reconciles status. An unreadable blob is logged
    /// and treated as no session.
    #[must_use]
    pub fn restore(storage: Arc<dyn SessionStorage>) -> Self {
        let session = match storage.load() {
            Ok(Some(state)) => {
                let token = state
                    .auth
                    .token
                    .filter(|t| !t.trim().is_empty())
                    .map(SecretString::from);
                // A profile without a token is meaningless
                let profile = token.as_ref().and(state.auth.profile);
                debug!(authenticated = token.is_some(), "Restored persisted session");
                Session { token, profile }
            }
            Ok(None) => Session::default(),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable persisted session");
                Session::default()
            }
        };

        Self {
            state: RwLock::new(session),
            storage,
        }
    }

    /// Set token and profile together.
    #[instrument(skip(self, profile, token), fields(vendor_id = %profile.id))]
    pub fn set_session(&self, profile: Profile, token: SecretString) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.token = Some(token);
        state.profile = Some(profile);
        self.persist(&state);
    }

    /// Clear token and profile. Safe to call when already cleared.
    #[instrument(skip(self))]
    pub fn clear_session(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = Session::default();
        self.persist(&state);
    }

    /// Replace the profile while keeping the current token.
    ///
    /// Returns `false` (and changes nothing) when no token is held; a profile
    /// response that lands after logout must not resurrect the session.
    pub fn refresh_profile(&self, profile: Profile) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.token.is_none() {
            debug!("Dropping profile refresh: no active session");
            return false;
        }
        state.profile = Some(profile);
        self.persist(&state);
        true
    }

    /// Remove the persisted blob.
    ///
    /// # Errors
    ///
    /// Returns the storage error; the in-memory session is unaffected.
    pub fn purge_storage(&self) -> Result<(), StorageError> {
        self.storage.purge()
    }

    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .token
            .clone()
    }

    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .profile
            .clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_authenticated()
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Write `state` through to storage. Called with the write guard held so
    /// stored order always matches in-memory order.
    fn persist(&self, state: &Session) {
        if let Err(e) = self.storage.save(&state.to_persisted()) {
            warn!(error = %e, "Failed to persist session");
        }
    }
}
