//! End-to-end tests for the vendor portal client.
//!
//! Every test runs a [`VendorClient`] against a `wiremock` server standing in
//! for the vendor REST API, so no backend or credentials are needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vendor-portal-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cache_coherence` - Coalescing, keyed pages and tag invalidation
//! - `product_flows` - Create, update and delete as seen by later reads
//! - `session_lifecycle` - Sign-in, blocked accounts and teardown
//! - `gateway` - Bearer auth, server messages and transport failures

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::{Value, json};
use vendor_portal_client::session::{PersistedAuth, PersistedState, StorageError};
use vendor_portal_client::{
    ApiConfig, CacheConfig, ClientConfig, MemoryStorage, Navigator, Profile, Route,
    SessionStorage, VendorClient,
};
use wiremock::MockServer;

/// Bearer token held by signed-in contexts.
pub const TOKEN: &str = "test-token";

/// Vendor id used by the profile fixtures.
pub const VENDOR_ID: &str = "vendor-1";

/// Records every navigation command.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn routes(&self) -> Vec<Route> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times `route` was requested.
    #[must_use]
    pub fn count(&self, route: Route) -> usize {
        self.routes().into_iter().filter(|r| *r == route).count()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route);
    }
}

/// Storage whose purge always fails.
#[derive(Debug, Default)]
pub struct FailingPurge {
    inner: MemoryStorage,
}

impl FailingPurge {
    #[must_use]
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            inner: MemoryStorage::with_state(state),
        }
    }
}

impl SessionStorage for FailingPurge {
    fn load(&self) -> Result<Option<PersistedState>, StorageError> {
        self.inner.load()
    }

    fn save(&self, state: &PersistedState) -> Result<(), StorageError> {
        self.inner.save(state)
    }

    fn purge(&self) -> Result<(), StorageError> {
        Err(std::io::Error::other("storage is read-only").into())
    }
}

/// A mock API server plus a client wired to it.
pub struct TestContext {
    pub server: MockServer,
    pub client: VendorClient,
    pub navigator: Arc<RecordingNavigator>,
    pub storage: Arc<dyn SessionStorage>,
    config: ClientConfig,
}

impl TestContext {
    /// A context with no stored session.
    pub async fn anonymous() -> Self {
        Self::start(Arc::new(MemoryStorage::new()), Duration::from_secs(5)).await
    }

    /// A context restored from a persisted session for a vendor with `status`.
    pub async fn signed_in(status: &str) -> Self {
        Self::start(
            Arc::new(MemoryStorage::with_state(persisted_session(status))),
            Duration::from_secs(5),
        )
        .await
    }

    /// A context with explicit storage and request timeout.
    ///
    /// # Panics
    ///
    /// Panics if the mock server URI is not a valid base URL.
    pub async fn start(storage: Arc<dyn SessionStorage>, timeout: Duration) -> Self {
        let server = MockServer::start().await;
        let config = ClientConfig {
            api: ApiConfig::new(&format!("{}/api/", server.uri()))
                .expect("mock server URI is a valid base URL")
                .with_timeout(timeout),
            cache: CacheConfig::default(),
            session_file: PathBuf::new(),
        };
        let navigator = Arc::new(RecordingNavigator::default());
        let client = VendorClient::new(&config, Arc::clone(&storage), navigator.clone())
            .expect("client builds");

        Self {
            server,
            client,
            navigator,
            storage,
            config,
        }
    }

    /// A fresh client over the same storage, as after a page reload.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn reload(&self) -> VendorClient {
        VendorClient::new(&self.config, Arc::clone(&self.storage), self.navigator.clone())
            .expect("client builds")
    }

    /// Requests the mock server has received for `path` (relative to `/api/`).
    ///
    /// # Panics
    ///
    /// Panics if request recording is disabled.
    pub async fn hits(&self, method: &str, path: &str) -> usize {
        let full = format!("/api/{path}");
        self.server
            .received_requests()
            .await
            .expect("request recording is enabled")
            .iter()
            .filter(|r| r.method.as_str() == method && r.url.path() == full)
            .count()
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Wire shape of the vendor profile.
#[must_use]
pub fn profile_json(status: &str) -> Value {
    json!({
        "_id": VENDOR_ID,
        "email": "ada@example.com",
        "firstName": "Ada",
        "lastName": "Lovelace",
        "status": status,
        "phone": "+44 20 7946 0000",
    })
}

/// `GET vendor/profile` response body.
#[must_use]
pub fn profile_body(status: &str) -> Value {
    json!({ "status": "success", "data": profile_json(status) })
}

/// Login or OTP verification response body.
#[must_use]
pub fn auth_body(status: &str) -> Value {
    let mut data = profile_json(status);
    data["token"] = json!(TOKEN);
    json!({ "message": "Login successful", "data": data })
}

/// Wire shape of one product.
#[must_use]
pub fn product_json(id: &str, name: &str) -> Value {
    json!({
        "_id": id,
        "productName": name,
        "sku": format!("SKU-{id}"),
        "price": "49.99",
        "inventory": 12,
        "status": "published",
        "category": "cat-1",
    })
}

/// `GET vendor/products` response body.
#[must_use]
pub fn product_page_body(products: &[Value], total: u64, page: u32, limit: u32) -> Value {
    json!({
        "data": products,
        "total": total,
        "page": page,
        "limit": limit,
    })
}

/// `GET vendor/dashboard` response body.
#[must_use]
pub fn dashboard_body(total_products: u64) -> Value {
    json!({
        "data": {
            "products": { "total": total_products, "active": total_products, "pending": 0 },
            "orders": { "total": 3, "pending": 1, "processing": 1, "delivered": 1 },
            "revenue": { "total": "1200.50", "tax": "100", "shipping": "25" },
        }
    })
}

/// A persisted session as a previous run would have left it.
///
/// # Panics
///
/// Panics if the profile fixture does not deserialize.
#[must_use]
pub fn persisted_session(status: &str) -> PersistedState {
    let profile: Profile = serde_json::from_value(json!({
        "id": VENDOR_ID,
        "email": "ada@example.com",
        "firstname": "Ada",
        "lastname": "Lovelace",
        "status": status,
    }))
    .expect("profile fixture deserializes");

    PersistedState {
        auth: PersistedAuth {
            token: Some(TOKEN.to_string()),
            profile: Some(profile),
            is_authenticated: true,
        },
    }
}
