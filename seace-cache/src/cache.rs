//! The response cache.
//!
//! TTL memoization of backend responses keyed by [`CacheKey`]. Concurrent
//! requests for the same key share one in-flight fetch. Successful results
//! are stored and mirrored into the optional persistent tier; failures are
//! handed to every waiter and never stored.
//!
//! # Invalidation and in-flight fetches
//!
//! Each fetch is registered under a ticket drawn from a monotonically
//! increasing counter. Invalidating a key revokes its in-flight fetch: the
//! waiters already attached still get the result, but it is not stored. The
//! revoked marker stays registered until the fetch settles, and a caller
//! arriving in the meantime waits for it and then starts a fresh fetch, so a
//! key never has two fetches running at once.
//!
//! # Persistent tier writes
//!
//! Tier operations are queued while the state lock is held and applied in
//! queue order after it is released, so store I/O never blocks readers of
//! the in-memory map.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;

use crate::entry::CacheEntry;
use crate::freshness::CacheRead;
use crate::key::CacheKey;
use crate::policy::{CacheConfig, FetchOptions};
use crate::stats::CacheStats;
use crate::store::PersistentStore;

type SharedFetch<E> = Shared<BoxFuture<'static, Result<Value, E>>>;

struct InFlight<E> {
    ticket: u64,
    action: String,
    revoked: bool,
    future: SharedFetch<E>,
}

enum StoreOp {
    Save(String, CacheEntry),
    Remove(String),
    Clear,
}

struct State<E> {
    entries: HashMap<String, CacheEntry>,
    in_flight: HashMap<String, InFlight<E>>,
    writes: VecDeque<StoreOp>,
    next_ticket: u64,
    hits: u64,
    misses: u64,
}

struct Inner<E> {
    config: CacheConfig,
    store: Option<Arc<dyn PersistentStore>>,
    state: Mutex<State<E>>,
    writer: Mutex<()>,
}

enum Step<E> {
    Hit(CacheRead<Value>),
    Join(SharedFetch<E>),
    AwaitRevoked(SharedFetch<E>),
    Prepare,
}

/// TTL response cache over async fetches.
///
/// Cloning is cheap and every clone shares the same entries. The error type
/// `E` is the fetch error; it must be `Clone` so a failed in-flight fetch can
/// be reported to each waiter.
///
/// # Example
///
/// ```ignore
/// let cache: ResponseCache<FetchError> = ResponseCache::new(CacheConfig::default());
/// let key = CacheKey::new("getProcesos");
/// let read = cache
///     .get_or_fetch(&key, Duration::from_secs(60), || rest.call("getProcesos", &[]))
///     .await?;
/// if read.was_cache_hit() {
///     tracing::info!(age = ?read.staleness(), "served from cache");
/// }
/// ```
pub struct ResponseCache<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for ResponseCache<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> ResponseCache<E>
where
    E: Clone + Send + Sync + 'static,
{
    /// Memory-only cache.
    pub fn new(config: CacheConfig) -> Self {
        Self::build(config, None)
    }

    /// Cache mirrored into `store`, hydrated from it immediately. Entries
    /// already past their TTL are dropped from the store instead of loaded.
    pub fn with_store(config: CacheConfig, store: Arc<dyn PersistentStore>) -> Self {
        let cache = Self::build(config, Some(store));
        cache.inner.hydrate();
        cache
    }

    fn build(config: CacheConfig, store: Option<Arc<dyn PersistentStore>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                state: Mutex::new(State {
                    entries: HashMap::new(),
                    in_flight: HashMap::new(),
                    writes: VecDeque::new(),
                    next_ticket: 0,
                    hits: 0,
                    misses: 0,
                }),
                writer: Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Return the live entry for `key`, or run `fetch`, store its result
    /// with `ttl` and return it.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        fetch: F,
    ) -> Result<CacheRead<Value>, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
    {
        self.get_or_fetch_with(key, FetchOptions::default().with_ttl(ttl), fetch)
            .await
    }

    /// [`get_or_fetch`](Self::get_or_fetch) with per-call options. Without
    /// an explicit TTL the policy TTL for the key's action applies.
    ///
    /// `fetch` is called at most once, never while the cache is locked, and
    /// only when no other fetch for the key is registered.
    pub async fn get_or_fetch_with<F, Fut>(
        &self,
        key: &CacheKey,
        options: FetchOptions,
        fetch: F,
    ) -> Result<CacheRead<Value>, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
    {
        let action = key.action();

        if options.skip_cache {
            tracing::debug!(action, "cache bypassed");
            return fetch().await.map(CacheRead::fetched);
        }

        let ttl = options
            .ttl
            .unwrap_or_else(|| self.inner.config.ttl_for(action));
        let encoded = key.encode();

        let mut fetch = Some(fetch);
        let mut ready: Option<Fut> = None;
        let mut counted = false;

        loop {
            let (step, dirty) = {
                let mut state = self.inner.lock();

                let hit = if options.force_refresh {
                    None
                } else {
                    self.inner.live_entry(&mut state, &encoded, Utc::now())
                };

                let step = match hit {
                    Some(read) => {
                        if !counted {
                            state.hits += 1;
                        }
                        tracing::debug!(
                            action,
                            age_ms = read.staleness().as_millis() as u64,
                            "cache hit"
                        );
                        Step::Hit(read)
                    }
                    None => {
                        if !counted {
                            state.misses += 1;
                            counted = true;
                        }
                        match state.in_flight.get(&encoded) {
                            Some(flight) if flight.revoked => {
                                Step::AwaitRevoked(flight.future.clone())
                            }
                            Some(flight) => {
                                tracing::debug!(action, "joining in-flight fetch");
                                Step::Join(flight.future.clone())
                            }
                            None => match ready.take() {
                                Some(pending) => {
                                    let ticket = state.next_ticket;
                                    state.next_ticket += 1;

                                    let future = Self::start_flight(
                                        Arc::downgrade(&self.inner),
                                        encoded.clone(),
                                        action.to_string(),
                                        ticket,
                                        ttl,
                                        pending,
                                    );
                                    state.in_flight.insert(
                                        encoded.clone(),
                                        InFlight {
                                            ticket,
                                            action: action.to_string(),
                                            revoked: false,
                                            future: future.clone(),
                                        },
                                    );
                                    tracing::debug!(
                                        action,
                                        forced = options.force_refresh,
                                        "cache miss, fetching"
                                    );
                                    Step::Join(future)
                                }
                                None => Step::Prepare,
                            },
                        }
                    }
                };
                (step, !state.writes.is_empty())
            };
            if dirty {
                self.inner.flush();
            }

            match step {
                Step::Hit(read) => return Ok(read),
                Step::Join(flight) => return flight.await.map(CacheRead::fetched),
                Step::AwaitRevoked(flight) => {
                    tracing::debug!(action, "waiting for invalidated fetch to settle");
                    let _ = flight.await;
                }
                // Built outside the lock; registered on the next pass unless
                // another caller registered a fetch first, in which case this
                // one is dropped unpolled.
                Step::Prepare => ready = fetch.take().map(|fetch| fetch()),
            }
        }
    }

    fn start_flight<Fut>(
        inner: Weak<Inner<E>>,
        key: String,
        action: String,
        ticket: u64,
        ttl: Duration,
        fetch: Fut,
    ) -> SharedFetch<E>
    where
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
    {
        async move {
            let result = fetch.await;
            if let Some(inner) = inner.upgrade() {
                inner.complete(&key, &action, ticket, ttl, &result);
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Live entry for `key` without fetching. An expired entry is removed
    /// and reported as absent. Does not count towards hit/miss statistics.
    pub fn peek(&self, key: &CacheKey) -> Option<CacheRead<Value>> {
        let (read, dirty) = {
            let mut state = self.inner.lock();
            let read = self.inner.live_entry(&mut state, &key.encode(), Utc::now());
            (read, !state.writes.is_empty())
        };
        if dirty {
            self.inner.flush();
        }
        read
    }

    /// Remove every entry tagged with `action` and revoke its in-flight
    /// fetches. Returns how many entries were removed.
    pub fn invalidate(&self, action: &str) -> usize {
        let removed = {
            let mut state = self.inner.lock();

            let keys: Vec<String> = state
                .entries
                .iter()
                .filter(|(_, entry)| entry.action == action)
                .map(|(key, _)| key.clone())
                .collect();

            for key in &keys {
                state.entries.remove(key);
                self.inner.enqueue(&mut state, StoreOp::Remove(key.clone()));
            }
            for flight in state.in_flight.values_mut() {
                if flight.action == action {
                    flight.revoked = true;
                }
            }
            keys.len()
        };
        self.inner.flush();

        if removed > 0 {
            tracing::debug!(action, removed, "cache invalidated by action");
        }
        removed
    }

    /// Remove the entry for exactly `key` and revoke its in-flight fetch.
    /// Returns whether an entry existed.
    pub fn invalidate_key(&self, key: &CacheKey) -> bool {
        let encoded = key.encode();
        let removed = {
            let mut state = self.inner.lock();
            if let Some(flight) = state.in_flight.get_mut(&encoded) {
                flight.revoked = true;
            }
            let removed = state.entries.remove(&encoded).is_some();
            self.inner.enqueue(&mut state, StoreOp::Remove(encoded.clone()));
            removed
        };
        self.inner.flush();

        if removed {
            tracing::debug!(key = %encoded, "cache entry invalidated");
        }
        removed
    }

    /// Remove every entry, in memory and in the persistent tier.
    pub fn invalidate_all(&self) {
        let removed = {
            let mut state = self.inner.lock();
            let removed = state.entries.len();
            state.entries.clear();
            for flight in state.in_flight.values_mut() {
                flight.revoked = true;
            }
            self.inner.enqueue(&mut state, StoreOp::Clear);
            removed
        };
        self.inner.flush();
        tracing::info!(removed, "cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.lock();
        let now = Utc::now();

        let live: Vec<&CacheEntry> = state
            .entries
            .values()
            .filter(|entry| !entry.is_expired(now))
            .collect();
        let actions: BTreeSet<&str> = live.iter().map(|entry| entry.action.as_str()).collect();

        CacheStats {
            entries: live.len(),
            actions: actions.into_iter().map(str::to_string).collect(),
            size_bytes: live.iter().map(|entry| entry.size_bytes()).sum(),
            hits: state.hits,
            misses: state.misses,
        }
    }
}

impl<E> Inner<E> {
    fn lock(&self) -> MutexGuard<'_, State<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live_entry(
        &self,
        state: &mut State<E>,
        key: &str,
        now: DateTime<Utc>,
    ) -> Option<CacheRead<Value>> {
        let entry = state.entries.get(key)?;
        if entry.is_expired(now) {
            tracing::debug!(action = %entry.action, key, "cache entry expired");
            state.entries.remove(key);
            self.enqueue(state, StoreOp::Remove(key.to_string()));
            return None;
        }
        Some(CacheRead::from_cache(entry.value.clone(), entry.cached_at))
    }

    fn complete(
        &self,
        key: &str,
        action: &str,
        ticket: u64,
        ttl: Duration,
        result: &Result<Value, E>,
    ) {
        {
            let mut state = self.lock();

            let owned = matches!(state.in_flight.get(key), Some(flight) if flight.ticket == ticket);
            let registered = owned
                && state
                    .in_flight
                    .remove(key)
                    .is_some_and(|flight| !flight.revoked);

            match result {
                Ok(value) if registered => {
                    let entry = CacheEntry::new(action, value.clone(), ttl);
                    self.enqueue(&mut state, StoreOp::Save(key.to_string(), entry.clone()));
                    state.entries.insert(key.to_string(), entry);
                    tracing::debug!(action, ttl_ms = ttl.as_millis() as u64, "cache set");
                }
                Ok(_) => {
                    tracing::debug!(action, "fetch finished after invalidation, result not cached");
                }
                Err(_) => {
                    tracing::debug!(action, "fetch failed, nothing cached");
                }
            }
        }
        self.flush();
    }

    fn enqueue(&self, state: &mut State<E>, op: StoreOp) {
        if self.store.is_some() {
            state.writes.push_back(op);
        }
    }

    /// Apply queued tier operations in order, logging and swallowing
    /// failures. The state lock is only taken to pop each operation.
    fn flush(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        loop {
            let Some(op) = self.lock().writes.pop_front() else {
                break;
            };
            let (key, result) = match &op {
                StoreOp::Save(key, entry) => (key.as_str(), store.save(key, entry)),
                StoreOp::Remove(key) => (key.as_str(), store.remove(key)),
                StoreOp::Clear => ("*", store.clear()),
            };
            if let Err(e) = result {
                tracing::warn!(key, error = %e, "persistent cache tier operation failed");
            }
        }
    }

    fn hydrate(&self) {
        let Some(store) = &self.store else {
            return;
        };

        let rows = match store.load_all() {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load persistent cache tier, starting empty");
                return;
            }
        };

        let now = Utc::now();
        let mut loaded = 0usize;
        let mut expired = 0usize;
        {
            let mut state = self.lock();
            for (key, entry) in rows {
                if entry.is_expired(now) {
                    expired += 1;
                    self.enqueue(&mut state, StoreOp::Remove(key));
                } else {
                    loaded += 1;
                    state.entries.insert(key, entry);
                }
            }
        }
        self.flush();

        if loaded > 0 || expired > 0 {
            tracing::info!(loaded, expired, "cache hydrated from persistent tier");
        }
    }
}
