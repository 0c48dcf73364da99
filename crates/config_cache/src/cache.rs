//! Fixed-capacity LRU cache with duplicate-suppressed construction.
//!
//! # Behaviour
//!
//! - A hit returns the stored value and marks the entry most recently used.
//! - A miss registers an in-flight marker for the key and runs the value
//!   constructor outside the bookkeeping lock. Concurrent callers for the same
//!   key wait on that marker and receive the same result, success or failure.
//! - Successful results are inserted, evicting the least recently used entry
//!   when the cache is full. Failed results are never stored.
//! - The in-flight marker is removed as soon as construction finishes, so a
//!   failed key can be retried by the next caller.
//!
//! Callers working on different keys only contend on the bookkeeping mutex,
//! which is never held across an `.await`.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, trace};

use crate::errors::{CacheError, CacheResult};

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;

/// Shared result cell for a construction that is currently running.
type InFlight<V, E> = Arc<OnceCell<Result<V, E>>>;

/// Cache performance statistics.
///
/// # Examples
///
/// ```
/// use config_cache::CacheStatistics;
///
/// let stats = CacheStatistics {
///     total_requests: 10,
///     cache_hits: 7,
///     cache_misses: 3,
///     evictions: 0,
///     cached_entries: 3,
/// };
///
/// assert_eq!(stats.hit_ratio(), 0.7);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStatistics {
    /// Total number of `get_or_add` calls that produced a key
    pub total_requests: u64,

    /// Number of requests served from a stored entry
    pub cache_hits: u64,

    /// Number of requests that had to wait for, or run, a construction
    pub cache_misses: u64,

    /// Number of entries dropped to make room for new ones
    pub evictions: u64,

    /// Current number of stored entries
    pub cached_entries: usize,
}

impl CacheStatistics {
    /// Calculate cache hit ratio (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been made.
    pub fn hit_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_requests as f64
        }
    }
}

/// Bookkeeping guarded by the cache mutex.
///
/// `entries` is kept in recency order: index 0 is the least recently used.
struct CacheState<K, V, E> {
    entries: IndexMap<K, V>,
    in_flight: HashMap<K, InFlight<V, E>>,
    stats: CacheStatistics,
}

impl<K, V, E> CacheState<K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn new(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
            in_flight: HashMap::new(),
            stats: CacheStatistics::default(),
        }
    }

    /// Returns the stored value and moves the entry to the most recent slot.
    fn touch(&mut self, key: &K) -> Option<V> {
        let value = self.entries.shift_remove(key)?;
        self.entries.insert(key.clone(), value.clone());
        Some(value)
    }

    /// Stores a value, evicting the least recently used entry if full.
    fn insert(&mut self, key: K, value: V, capacity: usize) {
        if self.entries.shift_remove(&key).is_none() && self.entries.len() >= capacity {
            if self.entries.shift_remove_index(0).is_some() {
                self.stats.evictions += 1;
                trace!("Evicted least recently used cache entry");
            }
        }
        self.entries.insert(key, value);
        self.stats.cached_entries = self.entries.len();
    }
}

/// Fixed-capacity LRU cache with duplicate-suppressed construction.
///
/// `K` is the cache key, `V` the stored value and `E` the error type shared by
/// the key and value constructors. Values and errors are cloned out to every
/// caller, so both are usually cheap handles (`Arc`, small enums).
///
/// # Examples
///
/// ```
/// use config_cache::BoundedCache;
///
/// # async fn example() {
/// let cache: BoundedCache<&'static str, String, String> =
///     BoundedCache::new(2).expect("positive capacity");
///
/// let first = cache
///     .get_or_add(|| async { Ok("a") }, || async { Ok("computed".to_string()) })
///     .await;
/// assert_eq!(first.as_deref(), Ok("computed"));
///
/// // Second call is served from the cache; the constructor never runs.
/// let second = cache
///     .get_or_add(|| async { Ok("a") }, || async { Err("not called".to_string()) })
///     .await;
/// assert_eq!(second.as_deref(), Ok("computed"));
/// # }
/// ```
pub struct BoundedCache<K, V, E> {
    capacity: usize,
    state: Mutex<CacheState<K, V, E>>,
}

impl<K, V, E> fmt::Debug for BoundedCache<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl<K, V, E> BoundedCache<K, V, E>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
    E: Clone,
{
    /// Creates an empty cache holding at most `capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidCapacity` when `capacity` is zero.
    pub fn new(capacity: usize) -> CacheResult<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity { capacity });
        }

        Ok(Self {
            capacity,
            state: Mutex::new(CacheState::new(capacity)),
        })
    }

    /// Maximum number of entries this cache holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of stored entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` when `key` is stored. Does not affect recency.
    pub fn contains(&self, key: &K) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Drops every stored entry and every in-flight marker.
    ///
    /// Constructions already running still deliver their result to the callers
    /// waiting on them, but the result is not stored.
    pub fn purge(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.in_flight.clear();
        state.stats.cached_entries = 0;
        debug!("Purged all cache entries");
    }

    /// Snapshot of the cache statistics.
    pub fn statistics(&self) -> CacheStatistics {
        self.lock().stats
    }

    /// Returns the cached value for the key produced by `key_constructor`,
    /// constructing it with `value_constructor` on a miss.
    ///
    /// A failing key constructor returns its error immediately without
    /// touching the cache. On a miss the value constructor runs at most once
    /// for all concurrent callers of that key; every caller receives a clone of
    /// its result. Errors are never cached.
    pub async fn get_or_add<KF, KFut, VF, VFut>(
        &self,
        key_constructor: KF,
        value_constructor: VF,
    ) -> Result<V, E>
    where
        KF: FnOnce() -> KFut,
        KFut: Future<Output = Result<K, E>>,
        VF: FnOnce() -> VFut,
        VFut: Future<Output = Result<V, E>>,
    {
        let key = key_constructor().await?;

        let cell = {
            let mut state = self.lock();
            state.stats.total_requests += 1;

            if let Some(value) = state.touch(&key) {
                state.stats.cache_hits += 1;
                debug!(key = ?key, "Cache hit");
                return Ok(value);
            }

            state.stats.cache_misses += 1;
            state
                .in_flight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let mut constructed = false;
        let result = cell
            .get_or_init(|| {
                constructed = true;
                debug!(key = ?key, "Cache miss, constructing value");
                value_constructor()
            })
            .await
            .clone();

        // Only the caller that ran the constructor finalises the marker.
        if constructed {
            let mut state = self.lock();
            let still_registered = state
                .in_flight
                .get(&key)
                .is_some_and(|registered| Arc::ptr_eq(registered, &cell));

            if still_registered {
                state.in_flight.remove(&key);
                if let Ok(value) = &result {
                    state.insert(key, value.clone(), self.capacity);
                }
            }
        }

        result
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<K, V, E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs `value_constructor` through `cache` when one is configured.
///
/// With no cache the key constructor is never invoked and the value
/// constructor's result is returned uncached.
pub async fn get_or_add<K, V, E, KF, KFut, VF, VFut>(
    cache: Option<&BoundedCache<K, V, E>>,
    key_constructor: KF,
    value_constructor: VF,
) -> Result<V, E>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: Clone,
    E: Clone,
    KF: FnOnce() -> KFut,
    KFut: Future<Output = Result<K, E>>,
    VF: FnOnce() -> VFut,
    VFut: Future<Output = Result<V, E>>,
{
    match cache {
        Some(cache) => cache.get_or_add(key_constructor, value_constructor).await,
        None => value_constructor().await,
    }
}
