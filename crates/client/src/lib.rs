//! Vendor portal client library.
//!
//! The data layer behind the vendor dashboard:
//!
//! - [`gateway`] - Every HTTP call goes through one gateway that attaches the
//!   bearer token and raises an unauthorized signal on 401/403
//! - [`cache`] - Keyed query results with tag invalidation, in-flight
//!   coalescing and subscriptions
//! - [`session`] - Persisted auth state and the lifecycle controller that
//!   tears the session down exactly once
//! - [`api`] - Typed facades per resource, composed by [`VendorClient`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vendor_portal_client::{ClientConfig, FileStorage, Navigator, Route, VendorClient};
//!
//! struct Log;
//! impl Navigator for Log {
//!     fn navigate(&self, route: Route) {
//!         tracing::info!(?route, "navigate");
//!     }
//! }
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let storage = Arc::new(FileStorage::new(&config.session_file));
//! let client = VendorClient::new(&config, storage, Arc::new(Log))?;
//! let page = client.products().list(Default::default()).await?;
//! tracing::info!(total = page.total, "products");
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod session;

pub use api::VendorClient;
pub use api::types::*;
pub use cache::{CacheEvent, CacheKey, CacheTag, QueryCache, Subscription};
pub use config::{ApiConfig, CacheConfig, ClientConfig, ConfigError};
pub use error::{ApiError, FailureKind, TransportKind};
pub use gateway::{ApiRequest, ApiResponse, FileUpload, MultipartForm, RequestGateway};
pub use session::{
    BlockReason, FileStorage, MemoryStorage, Navigator, Route, SessionController, SessionPhase,
    SessionStorage, SessionStore, TeardownReason,
};
