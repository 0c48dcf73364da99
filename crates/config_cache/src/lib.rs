//! Bounded, duplicate-suppressing cache for expensive key-addressable work.
//!
//! The cache in this crate is a fixed-capacity LRU store whose misses are
//! coalesced: however many tasks ask for the same missing key at the same
//! time, the value constructor runs once and every caller receives its result.
//!
//! # Examples
//!
//! ```
//! use config_cache::BoundedCache;
//!
//! # async fn example() -> Result<(), config_cache::CacheError> {
//! let cache: BoundedCache<String, u64, String> = BoundedCache::new(16)?;
//!
//! let value = cache
//!     .get_or_add(
//!         || async { Ok("org/repo@abc123".to_string()) },
//!         || async { Ok(42) },
//!     )
//!     .await;
//!
//! assert_eq!(value, Ok(42));
//! assert_eq!(cache.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod errors;

pub use cache::{get_or_add, BoundedCache, CacheStatistics};
pub use errors::{CacheError, CacheResult};
