//! Expiring resource cache.
//!
//! Owns expensive, explicitly-disposed resources keyed by string, reuses them
//! on repeat access, and evicts entries that sit idle past a TTL. Every
//! resource that enters the cache is handed to the disposal callback exactly
//! once, whether it leaves by eviction, removal, replacement, or teardown.
//!
//! ## Example
//!
//! ```rust
//! use dated_cache::ExpiringResourceCache;
//!
//! let mut cache = ExpiringResourceCache::new();
//! cache.set_purge_callback(|key: String, unit: Vec<u8>| {
//!     println!("released {key} ({} bytes)", unit.len());
//! });
//!
//! if !cache.has("main.cpp") {
//!     cache.insert("main.cpp", vec![0u8; 64]);
//! }
//! assert_eq!(cache.get("main.cpp").unwrap().len(), 64);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cache;
mod clock;
mod shared;

pub use cache::ExpiringResourceCache;
pub use clock::{ManualClock, MonotonicClock, SystemClock};
pub use shared::SharedCache;

pub use dated_core::{CacheConfig, CacheError, CacheStats, EntryInfo, MemoryUsage, Result};
