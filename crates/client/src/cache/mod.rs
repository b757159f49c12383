//! Tagged resource cache.
//!
//! Reads are keyed by [`CacheKey`] and stamped with the [`CacheTag`]s they
//! provide. Writes declare the tags they invalidate (see
//! [`invalidated_tags`]); matching entries are marked invalidated and, when
//! someone is subscribed, refetched immediately.
//!
//! # Read semantics
//!
//! - fresh entry: returned as-is
//! - entry older than `stale_after`: returned, and refreshed in the background
//! - invalidated or absent entry: fetched, with concurrent readers of the
//!   same key sharing one request
//!
//! Uses `moka` for bounded storage with a time-to-live.

pub mod invalidation;
pub mod key;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use moka::future::Cache;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

use crate::config::CacheConfig;
use crate::error::ApiError;
use crate::gateway::{ApiRequest, ApiResponse, RequestGateway};

pub use invalidation::{MutationKind, invalidated_tags};
pub use key::{CacheKey, CacheTag, CacheValue, Endpoint, Resource};

const EVENT_CAPACITY: usize = 64;

// =============================================================================
// Transport seam
// =============================================================================

/// Executes requests on behalf of the cache.
///
/// Implemented by [`RequestGateway`]; tests substitute an in-process fake.
pub trait Transport: Send + Sync {
    fn execute(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, ApiError>>;
}

impl Transport for RequestGateway {
    fn execute(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, ApiError>> {
        Box::pin(Self::execute(self, request))
    }
}

// =============================================================================
// Queries and mutations
// =============================================================================

/// Turns a response body into a cached value.
pub type Decoder = Arc<dyn Fn(Value) -> Result<CacheValue, ApiError> + Send + Sync>;

/// A cacheable read: where to store it, how to fetch it, what it provides.
#[derive(Clone)]
pub struct Query {
    key: CacheKey,
    request: ApiRequest,
    tags: Vec<CacheTag>,
    decode: Decoder,
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("key", &self.key)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl Query {
    #[must_use]
    pub fn new<F>(key: CacheKey, request: ApiRequest, decode: F) -> Self
    where
        F: Fn(Value) -> Result<CacheValue, ApiError> + Send + Sync + 'static,
    {
        Self {
            key,
            request,
            tags: Vec::new(),
            decode: Arc::new(decode),
        }
    }

    /// Tags the fetched data provides.
    #[must_use]
    pub fn provides(mut self, tags: impl IntoIterator<Item = CacheTag>) -> Self {
        self.tags.extend(tags);
        self
    }

    #[must_use]
    pub const fn key(&self) -> &CacheKey {
        &self.key
    }

    #[must_use]
    pub fn tags(&self) -> &[CacheTag] {
        &self.tags
    }
}

/// A write and the message to show when the server gives none.
#[derive(Debug, Clone)]
pub struct Mutation {
    kind: MutationKind,
    request: ApiRequest,
    fallback: Option<String>,
}

impl Mutation {
    #[must_use]
    pub const fn new(kind: MutationKind, request: ApiRequest) -> Self {
        Self {
            kind,
            request,
            fallback: None,
        }
    }

    /// Message used for a rejection that carries no server message.
    #[must_use]
    pub fn fallback(mut self, message: impl Into<String>) -> Self {
        self.fallback = Some(message.into());
        self
    }

    #[must_use]
    pub const fn kind(&self) -> &MutationKind {
        &self.kind
    }
}

// =============================================================================
// Events and subscriptions
// =============================================================================

/// Change notification for cache subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// Fresh data was stored for the key.
    Updated(CacheKey),
    /// The key's data was invalidated by a write.
    Invalidated(CacheKey),
    /// The server reported the resource as gone.
    Removed(CacheKey),
    /// Every entry was dropped.
    Cleared,
}

impl CacheEvent {
    fn concerns(&self, key: &CacheKey) -> bool {
        match self {
            Self::Updated(k) | Self::Invalidated(k) | Self::Removed(k) => k == key,
            Self::Cleared => true,
        }
    }
}

/// Interest in one key. Subscribed entries are refetched right after they
/// are invalidated. Dropping the subscription releases the interest.
pub struct Subscription {
    key: CacheKey,
    inner: Arc<CacheInner>,
    events: broadcast::Receiver<CacheEvent>,
}

impl Subscription {
    #[must_use]
    pub const fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Wait for the next event concerning this key.
    ///
    /// Returns `None` once the cache has been dropped.
    pub async fn changed(&mut self) -> Option<CacheEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) if event.concerns(&self.key) => return Some(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = subscribers.get_mut(&self.key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                subscribers.remove(&self.key);
            }
        }
    }
}

// =============================================================================
// QueryCache
// =============================================================================

struct CacheEntry {
    value: CacheValue,
    tags: Vec<CacheTag>,
    fetched_at: Instant,
    invalidated: AtomicBool,
    query: Query,
}

impl CacheEntry {
    fn is_invalidated(&self) -> bool {
        self.invalidated.load(Ordering::SeqCst)
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<CacheValue, ApiError>>>;

struct InFlight {
    id: u64,
    query: Query,
    fetch: SharedFetch,
    /// One of the query's tags was invalidated while the fetch ran.
    stale: bool,
    /// Refetch queued behind a stale fetch, shared by everyone who asks
    /// for the key after the invalidation.
    follow_up: Option<SharedFetch>,
}

struct CacheInner {
    transport: Arc<dyn Transport>,
    config: CacheConfig,
    entries: Cache<CacheKey, Arc<CacheEntry>>,
    in_flight: Mutex<HashMap<CacheKey, InFlight>>,
    /// Version at which each tag was last invalidated.
    tag_versions: Mutex<HashMap<CacheTag, u64>>,
    version: AtomicU64,
    /// Bumped by `clear`; fetches from an older epoch are discarded.
    epoch: AtomicU64,
    next_fetch_id: AtomicU64,
    subscribers: Mutex<HashMap<CacheKey, usize>>,
    events: broadcast::Sender<CacheEvent>,
}

/// Process-wide query cache shared by every resource facade.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.inner.entries.entry_count())
            .finish_non_exhaustive()
    }
}

impl QueryCache {
    /// Create an empty cache over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: CacheConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.time_to_live)
            .build();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(CacheInner {
                transport,
                config,
                entries,
                in_flight: Mutex::new(HashMap::new()),
                tag_versions: Mutex::new(HashMap::new()),
                version: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
                next_fetch_id: AtomicU64::new(0),
                subscribers: Mutex::new(HashMap::new()),
                events,
            }),
        }
    }

    /// Read through the cache.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure when there was no usable entry. Failures of
    /// background refreshes are logged, never returned.
    #[instrument(skip(self, query), fields(key = %query.key))]
    pub async fn read(&self, query: Query) -> Result<CacheValue, ApiError> {
        if let Some(entry) = self.inner.entries.get(&query.key).await {
            if !entry.is_invalidated() {
                if entry.fetched_at.elapsed() >= self.inner.config.stale_after {
                    debug!("Serving aged entry, refreshing in background");
                    self.refresh_in_background(&entry.query);
                } else {
                    debug!("Cache hit");
                }
                return Ok(entry.value.clone());
            }
            debug!("Entry invalidated, refetching");
        }

        self.fetch(&query).await
    }

    /// Perform a write; on success invalidate the tags its kind declares.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure, with the mutation's fallback message
    /// applied. Nothing is invalidated on failure.
    #[instrument(skip(self, mutation), fields(kind = ?mutation.kind))]
    pub async fn write(&self, mutation: Mutation) -> Result<ApiResponse, ApiError> {
        let Mutation {
            kind,
            request,
            fallback,
        } = mutation;

        let response = self
            .inner
            .transport
            .execute(request)
            .await
            .map_err(|e| match &fallback {
                Some(message) => e.with_fallback(message),
                None => e,
            })?;

        let tags = invalidated_tags(&kind);
        if !tags.is_empty() {
            self.invalidate(&tags);
        }
        Ok(response)
    }

    /// Mark every entry carrying one of `tags` as invalidated.
    ///
    /// In-flight fetches for those tags keep running and their result is
    /// stored already invalidated. Readers arriving afterwards wait for it and
    /// then share a single refetch, so a key never has two requests in flight.
    /// Subscribed keys are refetched.
    pub fn invalidate(&self, tags: &[CacheTag]) {
        if tags.is_empty() {
            return;
        }
        let version = self.inner.version.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut versions = self
                .inner
                .tag_versions
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            for tag in tags {
                versions.insert(tag.clone(), version);
            }
        }

        let mut refetch = Vec::new();
        {
            let mut in_flight = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            for (key, flight) in in_flight.iter_mut() {
                if flight.query.tags.iter().any(|t| tags.contains(t)) {
                    flight.stale = true;
                    if self.inner.is_subscribed(key) {
                        refetch.push(flight.query.clone());
                    }
                }
            }
        }

        for (key, entry) in self.inner.entries.iter() {
            if !entry.tags.iter().any(|t| tags.contains(t)) {
                continue;
            }
            entry.invalidated.store(true, Ordering::SeqCst);
            self.inner.notify(CacheEvent::Invalidated(key.as_ref().clone()));
            if self.inner.is_subscribed(&key) && !refetch.iter().any(|q| q.key == *key) {
                refetch.push(entry.query.clone());
            }
        }

        debug!(
            tags = ?tags.iter().map(ToString::to_string).collect::<Vec<_>>(),
            refetching = refetch.len(),
            "Invalidated cache tags"
        );

        for query in &refetch {
            self.refresh_in_background(query);
        }
    }

    /// Drop every entry and discard the results of fetches still in flight.
    pub fn clear(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.inner.entries.invalidate_all();
        self.inner.notify(CacheEvent::Cleared);
        debug!("Cleared all cached queries");
    }

    /// Cached value for `key`, without fetching. Invalidated entries are
    /// still returned.
    pub async fn peek(&self, key: &CacheKey) -> Option<CacheValue> {
        self.inner.entries.get(key).await.map(|e| e.value.clone())
    }

    /// Whether the entry for `key` is marked invalidated. `None` if absent.
    pub async fn is_invalidated(&self, key: &CacheKey) -> Option<bool> {
        self.inner.entries.get(key).await.map(|e| e.is_invalidated())
    }

    /// Register interest in `key`.
    #[must_use]
    pub fn subscribe(&self, key: &CacheKey) -> Subscription {
        *self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_insert(0) += 1;

        Subscription {
            key: key.clone(),
            inner: Arc::clone(&self.inner),
            events: self.inner.events.subscribe(),
        }
    }

    /// Start (or join) the fetch for `query`.
    fn fetch(&self, query: &Query) -> SharedFetch {
        let mut in_flight = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(flight) = in_flight.get_mut(&query.key) {
            if !flight.stale {
                debug!(key = %query.key, "Joining in-flight fetch");
                return flight.fetch.clone();
            }
            if let Some(follow_up) = &flight.follow_up {
                debug!(key = %query.key, "Joining queued refetch");
                return follow_up.clone();
            }

            debug!(key = %query.key, "Queueing refetch behind invalidated fetch");
            let pending = flight.fetch.clone();
            let epoch = self.inner.epoch.load(Ordering::SeqCst);
            let cache = self.clone();
            let owned = query.clone();
            let follow_up = async move {
                let settled = pending.await;
                if cache.inner.epoch.load(Ordering::SeqCst) != epoch {
                    // Cleared meanwhile; nothing should be fetched for this key
                    return settled;
                }
                cache.fetch(&owned).await
            }
            .boxed()
            .shared();
            flight.follow_up = Some(follow_up.clone());
            drop(in_flight);

            Self::drive(&follow_up);
            return follow_up;
        }

        let id = self.inner.next_fetch_id.fetch_add(1, Ordering::SeqCst);
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let started_version = self.inner.version.load(Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let owned = query.clone();

        let fetch = async move { inner.run_fetch(owned, id, epoch, started_version).await }
            .boxed()
            .shared();

        in_flight.insert(
            query.key.clone(),
            InFlight {
                id,
                query: query.clone(),
                fetch: fetch.clone(),
                stale: false,
                follow_up: None,
            },
        );
        drop(in_flight);

        Self::drive(&fetch);
        fetch
    }

    /// Run `fetch` to completion even if every waiter goes away.
    fn drive(fetch: &SharedFetch) {
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let driver = fetch.clone();
            handle.spawn(async move {
                let _ = driver.await;
            });
        }
    }

    fn refresh_in_background(&self, query: &Query) {
        let fetch = self.fetch(query);
        let key = query.key.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = fetch.await {
                        warn!(key = %key, error = %e, "Background refresh failed");
                    }
                });
            }
            Err(_) => warn!(key = %key, "No async runtime, background refresh skipped"),
        }
    }
}

impl CacheInner {
    async fn run_fetch(
        self: Arc<Self>,
        query: Query,
        id: u64,
        epoch: u64,
        started_version: u64,
    ) -> Result<CacheValue, ApiError> {
        let result = match self.transport.execute(query.request.clone()).await {
            Ok(response) => (query.decode)(response.body),
            Err(e) => Err(e),
        };

        let key = query.key.clone();
        if !self.is_current(&key, id, epoch) {
            debug!(key = %key, "Discarding result of fetch from before clear");
            return result;
        }

        match &result {
            Ok(value) => {
                let entry = Arc::new(CacheEntry {
                    value: value.clone(),
                    tags: query.tags.clone(),
                    fetched_at: Instant::now(),
                    invalidated: AtomicBool::new(false),
                    query,
                });
                self.entries.insert(key.clone(), Arc::clone(&entry)).await;

                if self.epoch.load(Ordering::SeqCst) != epoch {
                    // Cleared while storing
                    self.entries.invalidate(&key).await;
                } else {
                    if self.invalidated_since(&entry.tags, started_version) {
                        entry.invalidated.store(true, Ordering::SeqCst);
                    }
                    self.notify(CacheEvent::Updated(key.clone()));
                }
            }
            Err(e) if e.is_not_found() => {
                self.entries.invalidate(&key).await;
                self.notify(CacheEvent::Removed(key.clone()));
                debug!(key = %key, "Resource gone, entry removed");
            }
            Err(e) => debug!(key = %key, error = %e, "Fetch failed"),
        }

        self.finish(&key, id);
        result
    }

    fn is_current(&self, key: &CacheKey, id: u64, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
            && self
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(key)
                .is_some_and(|flight| flight.id == id)
    }

    fn finish(&self, key: &CacheKey, id: u64) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight.get(key).is_some_and(|flight| flight.id == id) {
            in_flight.remove(key);
        }
    }

    fn invalidated_since(&self, tags: &[CacheTag], version: u64) -> bool {
        let versions = self
            .tag_versions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        tags.iter()
            .any(|t| versions.get(t).is_some_and(|&v| v > version))
    }

    fn is_subscribed(&self, key: &CacheKey) -> bool {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .is_some_and(|&n| n > 0)
    }

    fn notify(&self, event: CacheEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }
}
