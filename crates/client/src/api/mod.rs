//! Typed facades over the vendor REST API.
//!
//! [`VendorClient`] is the composition root: it owns the session store,
//! gateway, query cache and lifecycle controller, and wires the controller
//! to the gateway's unauthorized signal. Each resource has a borrowed facade
//! (`client.products().list(..)`).

pub mod auth;
pub mod conversions;
pub mod dashboard;
pub mod products;
pub mod profile;
pub mod types;

use std::sync::Arc;

use tracing::error;

use crate::cache::{CacheValue, QueryCache};
use crate::config::{ApiConfig, ClientConfig};
use crate::error::ApiError;
use crate::gateway::RequestGateway;
use crate::session::{Navigator, SessionController, SessionStorage, SessionStore};

pub use auth::AuthApi;
pub use dashboard::DashboardApi;
pub use products::ProductsApi;
pub use profile::ProfileApi;

/// Client for the vendor API.
///
/// Cheap to clone; clones share the session, cache and connection pool.
#[derive(Clone)]
pub struct VendorClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    api: ApiConfig,
    session: Arc<SessionStore>,
    gateway: RequestGateway,
    cache: QueryCache,
    controller: SessionController,
}

impl std::fmt::Debug for VendorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorClient")
            .field("base_url", &self.inner.api.base_url.as_str())
            .field("phase", &self.inner.controller.phase())
            .finish_non_exhaustive()
    }
}

impl VendorClient {
    /// Wire up a client, restoring any session persisted in `storage`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        config: &ClientConfig,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let session = Arc::new(SessionStore::restore(storage));
        let gateway = RequestGateway::new(&config.api, Arc::clone(&session))?;
        let cache = QueryCache::new(Arc::new(gateway.clone()), config.cache);
        let controller = SessionController::new(Arc::clone(&session), cache.clone(), navigator);
        controller.attach(&gateway);

        Ok(Self {
            inner: Arc::new(ClientInner {
                api: config.api.clone(),
                session,
                gateway,
                cache,
                controller,
            }),
        })
    }

    #[must_use]
    pub const fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    #[must_use]
    pub const fn profile(&self) -> ProfileApi<'_> {
        ProfileApi::new(self)
    }

    #[must_use]
    pub const fn products(&self) -> ProductsApi<'_> {
        ProductsApi::new(self)
    }

    #[must_use]
    pub const fn dashboard(&self) -> DashboardApi<'_> {
        DashboardApi::new(self)
    }

    /// End the session: clear it, purge storage, clear caches, go to login.
    pub fn logout(&self) {
        self.inner.controller.logout();
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    #[must_use]
    pub fn controller(&self) -> &SessionController {
        &self.inner.controller
    }

    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    #[must_use]
    pub fn gateway(&self) -> &RequestGateway {
        &self.inner.gateway
    }

    #[must_use]
    pub fn api_config(&self) -> &ApiConfig {
        &self.inner.api
    }
}

/// Error for a cached value of the wrong variant. Only reachable if two
/// endpoints share a key, which the key scheme rules out.
fn unexpected_value(expected: &str, got: &CacheValue) -> ApiError {
    error!(expected, got = ?std::mem::discriminant(got), "Cache returned wrong value type");
    ApiError::Decode(format!("expected cached {expected}"))
}
