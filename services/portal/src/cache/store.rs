//! services/portal/src/cache/store.rs
//!
//! The remote data cache: de-duplicated fetches, cached reads keyed by `QueryKey`,
//! and tag-driven invalidation.
//!
//! The cache knows nothing about HTTP. Each entry is created with a `Fetcher`
//! that produces its value; endpoint definitions live in `crate::api`.
//!
//! All methods that may start a fetch must run inside a Tokio runtime, since
//! fetches are spawned as tasks.

use super::query::{QueryKey, QueryState, QueryStatus};
use super::tags::{Tag, TagRef};
use course_portal_core::ports::{PortError, PortResult};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::{hash_map, HashMap, HashSet};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A decoded value as stored in the cache. Every caller of one fetch gets a
/// clone of the same `Arc`.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// Produces a fresh request for an entry. Called once per network round trip.
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, PortResult<CachedValue>> + Send + Sync>;

type SharedFetch = Shared<BoxFuture<'static, PortResult<CachedValue>>>;

//=========================================================================================
// Configuration
//=========================================================================================

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry with no subscribers is kept before eviction.
    pub keep_unused_for: Duration,
    pub refetch_on_focus: bool,
    pub refetch_on_reconnect: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            keep_unused_for: Duration::from_secs(60),
            refetch_on_focus: false,
            refetch_on_reconnect: false,
        }
    }
}

//=========================================================================================
// Internal State
//=========================================================================================

struct Entry {
    provides: Vec<TagRef>,
    fetcher: Fetcher,
    status: QueryStatus,
    data: Option<CachedValue>,
    error: Option<PortError>,
    stale: bool,
    subscribers: usize,
    idle_since: Option<Instant>,
    in_flight: Option<SharedFetch>,
    /// Invalidated while a fetch was running; re-issue once it settles.
    refetch_after_settle: bool,
    generation: u64,
    fetch_count: u64,
    notify: watch::Sender<u64>,
}

impl Entry {
    fn new(provides: Vec<TagRef>, fetcher: Fetcher) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            provides,
            fetcher,
            status: QueryStatus::Uninitialized,
            data: None,
            error: None,
            stale: false,
            subscribers: 0,
            idle_since: Some(Instant::now()),
            in_flight: None,
            refetch_after_settle: false,
            generation: 0,
            fetch_count: 0,
            notify,
        }
    }

    fn is_fresh(&self) -> bool {
        self.status == QueryStatus::Success && !self.stale
    }

    fn touch(&self) {
        self.notify.send_modify(|version| *version += 1);
    }

    fn snapshot<T: Any + Send + Sync>(&self) -> QueryState<T> {
        QueryState {
            status: self.status,
            data: self.data.clone().and_then(|value| value.downcast::<T>().ok()),
            error: self.error.clone(),
            is_stale: self.stale,
        }
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, Entry>,
    /// tag -> keys of the entries providing it (with or without an id).
    tag_index: HashMap<Tag, HashSet<QueryKey>>,
}

impl CacheState {
    fn entry_or_insert(
        &mut self,
        key: &QueryKey,
        provides: Vec<TagRef>,
        fetcher: Fetcher,
    ) -> &mut Entry {
        match self.entries.entry(key.clone()) {
            hash_map::Entry::Occupied(occupied) => occupied.into_mut(),
            hash_map::Entry::Vacant(vacant) => {
                for tag_ref in &provides {
                    self.tag_index
                        .entry(tag_ref.tag)
                        .or_default()
                        .insert(key.clone());
                }
                vacant.insert(Entry::new(provides, fetcher))
            }
        }
    }

    fn remove(&mut self, key: &QueryKey) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        for tag_ref in &entry.provides {
            if let Some(keys) = self.tag_index.get_mut(&tag_ref.tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_index.remove(&tag_ref.tag);
                }
            }
        }
        Some(entry)
    }

    fn keys_invalidated_by(&self, tags: &[TagRef]) -> Vec<QueryKey> {
        let mut hit: Vec<QueryKey> = Vec::new();
        for invalidated in tags {
            let Some(candidates) = self.tag_index.get(&invalidated.tag) else {
                continue;
            };
            for key in candidates {
                let provides_match = self
                    .entries
                    .get(key)
                    .map(|e| e.provides.iter().any(|p| invalidated.invalidates(p)))
                    .unwrap_or(false);
                if provides_match && !hit.contains(key) {
                    hit.push(key.clone());
                }
            }
        }
        hit
    }
}

struct Inner {
    config: CacheConfig,
    state: Mutex<CacheState>,
}

/// Starts a network fetch for `entry`. Must be called with the state lock held
/// and only when no fetch is in flight for the entry.
fn start_fetch(inner: &Arc<Inner>, key: &QueryKey, entry: &mut Entry) -> SharedFetch {
    entry.generation += 1;
    entry.fetch_count += 1;
    entry.status = QueryStatus::Loading;
    entry.refetch_after_settle = false;
    let generation = entry.generation;
    debug!("Fetching {} (fetch #{})", key, entry.fetch_count);

    let request = (entry.fetcher)();
    let weak: Weak<Inner> = Arc::downgrade(inner);
    let task_key = key.clone();
    // Spawned so the request completes and settles even if every caller stops waiting.
    let handle = tokio::spawn(async move {
        let result = request.await;
        if let Some(inner) = weak.upgrade() {
            settle(&inner, &task_key, generation, &result);
        }
        result
    });

    let shared = async move {
        handle
            .await
            .unwrap_or_else(|e| Err(PortError::Unexpected(format!("fetch task failed: {}", e))))
    }
    .boxed()
    .shared();

    entry.in_flight = Some(shared.clone());
    entry.touch();
    shared
}

fn settle(inner: &Arc<Inner>, key: &QueryKey, generation: u64, result: &PortResult<CachedValue>) {
    let mut state = inner.state.lock();
    let Some(entry) = state.entries.get_mut(key) else {
        debug!("Discarding result for evicted query {}", key);
        return;
    };
    if entry.generation != generation {
        return;
    }
    entry.in_flight = None;
    match result {
        Ok(value) => {
            entry.status = QueryStatus::Success;
            entry.data = Some(value.clone());
            entry.error = None;
            entry.stale = false;
        }
        Err(e) => {
            warn!("Query {} failed: {}", key, e);
            entry.status = QueryStatus::Error;
            entry.error = Some(e.clone());
        }
    }
    if entry.subscribers == 0 {
        entry.idle_since = Some(Instant::now());
    }
    entry.touch();

    if entry.refetch_after_settle && entry.subscribers > 0 {
        entry.stale = true;
        start_fetch(inner, key, entry);
    }
}

fn downcast<T: Any + Send + Sync>(key: &QueryKey, value: CachedValue) -> PortResult<Arc<T>> {
    value.downcast::<T>().map_err(|_| {
        PortError::Unexpected(format!("cached value for {} has an unexpected type", key))
    })
}

//=========================================================================================
// QueryCache
//=========================================================================================

/// Process-wide query cache. Cheap to clone; clones share the same entries.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// One-shot read.
    ///
    /// A fresh cached value is returned without a network call. A fetch already
    /// in flight for the same key is joined rather than duplicated.
    pub async fn query<T: Any + Send + Sync>(
        &self,
        key: QueryKey,
        provides: Vec<TagRef>,
        fetcher: Fetcher,
    ) -> PortResult<Arc<T>> {
        let pending = {
            let mut state = self.inner.state.lock();
            let entry = state.entry_or_insert(&key, provides, fetcher);
            if let Some(in_flight) = entry.in_flight.clone() {
                in_flight
            } else if entry.is_fresh() {
                if let Some(value) = entry.data.clone() {
                    if entry.subscribers == 0 {
                        entry.idle_since = Some(Instant::now());
                    }
                    return downcast(&key, value);
                }
                start_fetch(&self.inner, &key, entry)
            } else {
                start_fetch(&self.inner, &key, entry)
            }
        };
        let value = pending.await?;
        downcast(&key, value)
    }

    /// Registers an active consumer of a query, fetching it if nothing usable is cached.
    pub fn subscribe<T: Any + Send + Sync>(
        &self,
        key: QueryKey,
        provides: Vec<TagRef>,
        fetcher: Fetcher,
    ) -> Subscription<T> {
        let receiver = {
            let mut state = self.inner.state.lock();
            let entry = state.entry_or_insert(&key, provides, fetcher);
            entry.subscribers += 1;
            entry.idle_since = None;
            if entry.in_flight.is_none() && !entry.is_fresh() {
                start_fetch(&self.inner, &key, entry);
            }
            entry.notify.subscribe()
        };
        Subscription {
            cache: self.clone(),
            key,
            receiver,
            _marker: PhantomData,
        }
    }

    /// Runs a mutation and, only if it succeeds, invalidates `invalidates`.
    pub async fn mutate<T, F>(&self, invalidates: &[TagRef], request: F) -> PortResult<T>
    where
        F: Future<Output = PortResult<T>>,
    {
        let result = request.await;
        if result.is_ok() && !invalidates.is_empty() {
            let affected = self.invalidate(invalidates);
            debug!(
                "Mutation invalidated {} entr{} ({})",
                affected,
                if affected == 1 { "y" } else { "ies" },
                invalidates
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        result
    }

    /// Marks every entry providing one of `tags` stale. Subscribed entries are
    /// re-fetched; unsubscribed ones are dropped. Returns the number affected.
    pub fn invalidate(&self, tags: &[TagRef]) -> usize {
        let mut state = self.inner.state.lock();
        let keys = state.keys_invalidated_by(tags);
        for key in &keys {
            let subscribed = state
                .entries
                .get(key)
                .map(|e| e.subscribers > 0)
                .unwrap_or(false);
            if !subscribed {
                state.remove(key);
                continue;
            }
            if let Some(entry) = state.entries.get_mut(key) {
                entry.stale = true;
                if entry.in_flight.is_some() {
                    entry.refetch_after_settle = true;
                    entry.touch();
                } else {
                    start_fetch(&self.inner, key, entry);
                }
            }
        }
        keys.len()
    }

    /// Re-issues every subscribed entry that has no fetch running.
    pub fn refetch_subscribed(&self) -> usize {
        let mut state = self.inner.state.lock();
        let mut started = 0;
        for (key, entry) in state.entries.iter_mut() {
            if entry.subscribers > 0 && entry.in_flight.is_none() {
                start_fetch(&self.inner, key, entry);
                started += 1;
            }
        }
        started
    }

    /// Window focus regained. No-op unless `refetch_on_focus` is enabled.
    pub fn on_focus(&self) -> usize {
        if self.inner.config.refetch_on_focus {
            self.refetch_subscribed()
        } else {
            0
        }
    }

    /// Network connectivity restored. No-op unless `refetch_on_reconnect` is enabled.
    pub fn on_reconnect(&self) -> usize {
        if self.inner.config.refetch_on_reconnect {
            self.refetch_subscribed()
        } else {
            0
        }
    }

    /// Removes unsubscribed, idle entries older than the retention window.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let retention = self.inner.config.keep_unused_for;
        let mut state = self.inner.state.lock();
        let expired: Vec<QueryKey> = state
            .entries
            .iter()
            .filter(|(_, e)| e.subscribers == 0 && e.in_flight.is_none())
            .filter(|(_, e)| {
                e.idle_since
                    .map(|since| now.duration_since(since) >= retention)
                    .unwrap_or(false)
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            state.remove(key);
        }
        expired.len()
    }

    /// Periodically evicts expired entries until `cancel` fires.
    pub fn spawn_sweeper(&self, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = cache.evict_expired();
                        if evicted > 0 {
                            debug!("Evicted {} idle cache entries", evicted);
                        }
                    }
                }
            }
        })
    }

    /// Forgets all cached data. Subscribed entries stay registered but return to
    /// `Uninitialized`; results of fetches already running are discarded.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        let idle: Vec<QueryKey> = state
            .entries
            .iter()
            .filter(|(_, e)| e.subscribers == 0)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &idle {
            state.remove(key);
        }
        for entry in state.entries.values_mut() {
            entry.generation += 1;
            entry.in_flight = None;
            entry.refetch_after_settle = false;
            entry.status = QueryStatus::Uninitialized;
            entry.data = None;
            entry.error = None;
            entry.stale = false;
            entry.touch();
        }
        info!("Query cache reset");
    }

    pub fn status(&self, key: &QueryKey) -> QueryStatus {
        self.inner
            .state
            .lock()
            .entries
            .get(key)
            .map(|e| e.status)
            .unwrap_or(QueryStatus::Uninitialized)
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.inner.state.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of network fetches issued for `key` since its entry was created.
    pub fn fetch_count(&self, key: &QueryKey) -> u64 {
        self.inner
            .state
            .lock()
            .entries
            .get(key)
            .map(|e| e.fetch_count)
            .unwrap_or(0)
    }
}

//=========================================================================================
// Subscription
//=========================================================================================

/// An active consumer of one query. Dropping it releases interest in the result
/// and starts the entry's retention clock.
pub struct Subscription<T> {
    cache: QueryCache,
    key: QueryKey,
    receiver: watch::Receiver<u64>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> Subscription<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn state(&self) -> QueryState<T> {
        self.cache
            .inner
            .state
            .lock()
            .entries
            .get(&self.key)
            .map(Entry::snapshot)
            .unwrap_or_else(QueryState::uninitialized)
    }

    /// Waits for the next change to the entry. Returns `false` once the entry is gone.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// Re-issues the query unless a fetch is already running.
    pub fn refetch(&self) {
        let mut state = self.cache.inner.state.lock();
        if let Some(entry) = state.entries.get_mut(&self.key) {
            if entry.in_flight.is_none() {
                start_fetch(&self.cache.inner, &self.key, entry);
            }
        }
    }

    /// Waits for the current fetch (starting one if needed) and returns its outcome.
    pub async fn result(&self) -> PortResult<Arc<T>> {
        let pending = {
            let mut state = self.cache.inner.state.lock();
            let Some(entry) = state.entries.get_mut(&self.key) else {
                return Err(PortError::Unexpected(format!(
                    "query {} is no longer cached",
                    self.key
                )));
            };
            if let Some(in_flight) = entry.in_flight.clone() {
                in_flight
            } else if let (QueryStatus::Success, Some(value)) = (entry.status, entry.data.clone()) {
                return downcast(&self.key, value);
            } else if entry.status == QueryStatus::Error && !entry.stale {
                return Err(entry
                    .error
                    .clone()
                    .unwrap_or_else(|| PortError::Unexpected("query failed".to_string())));
            } else {
                start_fetch(&self.cache.inner, &self.key, entry)
            }
        };
        let value = pending.await?;
        downcast(&self.key, value)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        let mut state = self.cache.inner.state.lock();
        if let Some(entry) = state.entries.get_mut(&self.key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers == 0 {
                entry.idle_since = Some(Instant::now());
            }
        }
    }
}
