//! Session lifecycle controller.
//!
//! Owns the `anonymous → authenticated ⇄ blocked → terminating → anonymous`
//! state machine and performs teardown: clear the session, purge persisted
//! storage, clear every cached query, navigate to login. Teardown runs at
//! most once per session no matter how many auth failures arrive.

use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tracing::{debug, info, warn};
use vendor_portal_core::VendorStatus;

use super::SessionStore;
use crate::api::types::Profile;
use crate::cache::QueryCache;
use crate::gateway::{RequestGateway, UnauthorizedEvent, UnauthorizedListener};

/// Where the view layer should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Otp,
    Dashboard,
}

/// Receives navigation commands from the controller.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Why the dashboard is gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockReason {
    Pending,
    Rejected,
}

impl BlockReason {
    #[must_use]
    pub const fn heading(self) -> &'static str {
        match self {
            Self::Pending => "Account Pending",
            Self::Rejected => "Account Not Approved",
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Pending => "Your status is currently pending. Please wait for approval.",
            Self::Rejected => "Your status is currently rejected. Please contact support.",
        }
    }

    fn for_status(status: &VendorStatus) -> Option<Self> {
        match status {
            VendorStatus::Pending => Some(Self::Pending),
            VendorStatus::Rejected => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Anonymous,
    Authenticated,
    /// Signed in, but the account may not use the dashboard. Only logout is
    /// offered; the caches keep working.
    Blocked(BlockReason),
    Terminating,
}

impl SessionPhase {
    /// Phase implied by the profile's status. An absent status never blocks.
    fn for_profile(profile: &Profile) -> Self {
        profile
            .status
            .as_ref()
            .and_then(BlockReason::for_status)
            .map_or(Self::Authenticated, Self::Blocked)
    }
}

/// What started a teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    Logout,
    MissingToken,
    Unauthorized { status: u16 },
}

/// Drives session state transitions and teardown.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    session: Arc<SessionStore>,
    cache: QueryCache,
    navigator: Arc<dyn Navigator>,
    phase: watch::Sender<SessionPhase>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Create a controller. A session restored with a token starts
    /// `Authenticated`; the first profile fetch reconciles it.
    #[must_use]
    pub fn new(session: Arc<SessionStore>, cache: QueryCache, navigator: Arc<dyn Navigator>) -> Self {
        let initial = if session.is_authenticated() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        };
        let (phase, _) = watch::channel(initial);

        Self {
            inner: Arc::new(ControllerInner {
                session,
                cache,
                navigator,
                phase,
            }),
        }
    }

    /// Subscribe to 401/403 events from `gateway`.
    ///
    /// The gateway holds only a weak reference, so it never keeps the
    /// controller alive.
    pub fn attach(&self, gateway: &RequestGateway) {
        gateway.on_unauthorized(Arc::new(UnauthorizedHook {
            controller: Arc::downgrade(&self.inner),
        }));
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        *self.inner.phase.borrow()
    }

    /// Watch phase changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionPhase> {
        self.inner.phase.subscribe()
    }

    /// Record a session set by login or OTP verification.
    pub fn session_established(&self, profile: &Profile) {
        let next = SessionPhase::for_profile(profile);
        self.inner.phase.send_if_modified(|phase| {
            if *phase == SessionPhase::Terminating || *phase == next {
                return false;
            }
            info!(from = ?*phase, to = ?next, "Session established");
            *phase = next;
            true
        });
    }

    /// Reconcile the phase with a freshly fetched profile.
    ///
    /// Only moves between `Authenticated` and `Blocked`; a profile arriving
    /// while anonymous or terminating changes nothing.
    pub fn observe_profile(&self, profile: &Profile) {
        if profile.status.is_none() {
            debug!("Profile carries no status, phase unchanged");
            return;
        }
        let next = SessionPhase::for_profile(profile);
        self.inner.phase.send_if_modified(|phase| {
            let signed_in = matches!(
                *phase,
                SessionPhase::Authenticated | SessionPhase::Blocked(_)
            );
            if !signed_in || *phase == next {
                return false;
            }
            info!(from = ?*phase, to = ?next, status = ?profile.status, "Account status changed");
            *phase = next;
            true
        });
    }

    /// Entry check for the dashboard. Without a token, tears down and
    /// returns `false`.
    pub fn mount_dashboard(&self) -> bool {
        if self.inner.session.is_authenticated() {
            return true;
        }
        self.terminate(TeardownReason::MissingToken);
        false
    }

    /// Forward a navigation command to the view layer.
    pub fn navigate(&self, route: Route) {
        self.inner.navigator.navigate(route);
    }

    /// Explicit logout.
    pub fn logout(&self) {
        self.terminate(TeardownReason::Logout);
    }

    /// Tear the session down. Returns `false` when a teardown is already
    /// running, or when an auth failure arrives with no session to end.
    pub fn terminate(&self, reason: TeardownReason) -> bool {
        let started = self.inner.phase.send_if_modified(|phase| match (*phase, reason) {
            (SessionPhase::Terminating, _)
            | (SessionPhase::Anonymous, TeardownReason::Unauthorized { .. }) => false,
            _ => {
                *phase = SessionPhase::Terminating;
                true
            }
        });

        if started {
            self.inner.run_teardown(reason);
        }
        started
    }
}

impl ControllerInner {
    fn run_teardown(&self, reason: TeardownReason) {
        info!(?reason, "Tearing down session");

        self.session.clear_session();
        if let Err(e) = self.session.purge_storage() {
            warn!(error = %e, "Failed to purge persisted session");
        }
        self.cache.clear();
        self.navigator.navigate(Route::Login);

        self.phase.send_replace(SessionPhase::Anonymous);
    }
}

struct UnauthorizedHook {
    controller: Weak<ControllerInner>,
}

impl UnauthorizedListener for UnauthorizedHook {
    fn on_unauthorized(&self, event: &UnauthorizedEvent) {
        if let Some(inner) = self.controller.upgrade() {
            SessionController { inner }.terminate(TeardownReason::Unauthorized {
                status: event.status,
            });
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use futures::future::BoxFuture;
    use secrecy::SecretString;

    use crate::api::types::test_profile;
    use crate::cache::Transport;
    use crate::config::CacheConfig;
    use crate::error::{ApiError, TransportKind};
    use crate::gateway::{ApiRequest, ApiResponse};
    use crate::session::storage::{MemoryStorage, PersistedState, SessionStorage, StorageError};

    #[derive(Default)]
    struct RecordingNavigator {
        routes: Mutex<Vec<Route>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, route: Route) {
            self.routes.lock().unwrap().push(route);
        }
    }

    struct Offline;

    impl Transport for Offline {
        fn execute(&self, _: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, ApiError>> {
            Box::pin(async {
                Err(ApiError::Transport {
                    kind: TransportKind::Connect,
                    message: "offline".to_string(),
                })
            })
        }
    }

    struct BrokenPurge;

    impl SessionStorage for BrokenPurge {
        fn load(&self) -> Result<Option<PersistedState>, StorageError> {
            Ok(None)
        }
        fn save(&self, _: &PersistedState) -> Result<(), StorageError> {
            Ok(())
        }
        fn purge(&self) -> Result<(), StorageError> {
            Err(std::io::Error::other("disk on fire").into())
        }
    }

    fn controller(
        storage: Arc<dyn SessionStorage>,
    ) -> (SessionController, Arc<SessionStore>, Arc<RecordingNavigator>) {
        let session = Arc::new(SessionStore::restore(storage));
        let cache = QueryCache::new(Arc::new(Offline), CacheConfig::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let controller = SessionController::new(session.clone(), cache, navigator.clone());
        (controller, session, navigator)
    }

    fn sign_in(controller: &SessionController, session: &SessionStore, status: VendorStatus) {
        let profile = test_profile(status);
        session.set_session(profile.clone(), SecretString::from("tok"));
        controller.session_established(&profile);
    }

    #[test]
    fn test_login_then_logout() {
        let storage = Arc::new(MemoryStorage::new());
        let (controller, session, navigator) = controller(storage.clone());
        assert_eq!(controller.phase(), SessionPhase::Anonymous);

        sign_in(&controller, &session, VendorStatus::Active);
        assert_eq!(controller.phase(), SessionPhase::Authenticated);

        controller.logout();
        assert_eq!(controller.phase(), SessionPhase::Anonymous);
        assert!(!session.is_authenticated());
        assert!(storage.snapshot().is_none());
        assert_eq!(*navigator.routes.lock().unwrap(), vec![Route::Login]);
    }

    #[test]
    fn test_pending_profile_blocks_until_approved() {
        let (controller, session, _) = controller(Arc::new(MemoryStorage::new()));
        sign_in(&controller, &session, VendorStatus::Active);

        controller.observe_profile(&test_profile(VendorStatus::Pending));
        assert_eq!(
            controller.phase(),
            SessionPhase::Blocked(BlockReason::Pending)
        );
        // Blocking is a presentation gate only
        assert!(session.is_authenticated());

        controller.observe_profile(&test_profile(VendorStatus::Approved));
        assert_eq!(controller.phase(), SessionPhase::Authenticated);
    }

    #[test]
    fn test_profile_without_status_never_blocks() {
        let (controller, session, _) = controller(Arc::new(MemoryStorage::new()));
        let mut profile = test_profile(VendorStatus::Active);
        profile.status = None;
        session.set_session(profile.clone(), SecretString::from("tok"));
        controller.session_established(&profile);
        assert_eq!(controller.phase(), SessionPhase::Authenticated);

        controller.observe_profile(&profile);
        assert_eq!(controller.phase(), SessionPhase::Authenticated);

        // Nor does it lift an existing block
        controller.observe_profile(&test_profile(VendorStatus::Rejected));
        controller.observe_profile(&profile);
        assert_eq!(
            controller.phase(),
            SessionPhase::Blocked(BlockReason::Rejected)
        );
    }

    #[test]
    fn test_profile_while_anonymous_is_ignored() {
        let (controller, _, _) = controller(Arc::new(MemoryStorage::new()));
        controller.observe_profile(&test_profile(VendorStatus::Rejected));
        assert_eq!(controller.phase(), SessionPhase::Anonymous);
    }

    #[test]
    fn test_missing_token_on_mount_navigates_to_login() {
        let (controller, _, navigator) = controller(Arc::new(MemoryStorage::new()));
        assert!(!controller.mount_dashboard());
        assert_eq!(*navigator.routes.lock().unwrap(), vec![Route::Login]);
    }

    #[test]
    fn test_unauthorized_while_anonymous_does_nothing() {
        let (controller, _, navigator) = controller(Arc::new(MemoryStorage::new()));
        assert!(!controller.terminate(TeardownReason::Unauthorized { status: 401 }));
        assert!(navigator.routes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_unauthorized_tears_down_once() {
        let (controller, session, navigator) = controller(Arc::new(MemoryStorage::new()));
        sign_in(&controller, &session, VendorStatus::Active);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let controller = controller.clone();
                std::thread::spawn(move || {
                    controller.terminate(TeardownReason::Unauthorized { status: 403 })
                })
            })
            .collect();
        let started = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&ran| ran)
            .count();

        assert_eq!(started, 1);
        assert_eq!(navigator.routes.lock().unwrap().len(), 1);
        assert_eq!(controller.phase(), SessionPhase::Anonymous);
    }

    #[test]
    fn test_failed_purge_does_not_stop_teardown() {
        let (controller, session, navigator) = controller(Arc::new(BrokenPurge));
        sign_in(&controller, &session, VendorStatus::Active);

        controller.logout();

        assert!(!session.is_authenticated());
        assert_eq!(*navigator.routes.lock().unwrap(), vec![Route::Login]);
        assert_eq!(controller.phase(), SessionPhase::Anonymous);
    }

    #[test]
    fn test_restored_token_starts_authenticated() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let session = SessionStore::new(storage.clone());
            session.set_session(test_profile(VendorStatus::Pending), SecretString::from("t"));
        }
        let (controller, _, _) = controller(storage);
        assert_eq!(controller.phase(), SessionPhase::Authenticated);
    }

    #[test]
    fn test_block_reason_copy() {
        assert_eq!(BlockReason::Pending.heading(), "Account Pending");
        assert_eq!(
            BlockReason::Rejected.message(),
            "Your status is currently rejected. Please contact support."
        );
    }
}
