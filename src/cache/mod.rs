//! Persistent cache for web-service replies and downloaded files
//!
//! Backed by Fjall (an embedded LSM key-value store). Two kinds of data live
//! here:
//!
//! - Web-service replies, keyed by a component-scoped cache key
//! - An index of downloaded files per (component, module)
//!
//! ## Invalidation
//!
//! Invalidating marks entries stale instead of deleting them. A stale reply
//! forces a refetch on next access but can still be served when the site is
//! unreachable. Stale entries are removed by `CacheStore::prune_stale()` once
//! they pass the retention window.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use coursefetch::cache::CacheStore;
//!
//! let cache = CacheStore::open("data/cache")?;
//! cache.put_response("mmaModBook:book:101:42", &value)?;
//! cache.invalidate_response("mmaModBook:book:101:42")?;
//! ```

pub mod error;
pub mod keys;
pub mod pruning;
pub mod store;

pub use error::{CacheError, Result};
pub use pruning::PruneStats;
pub use store::{CacheStats, CacheStore, CachedEntry, FileEntry};
