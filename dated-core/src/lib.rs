//! # dated core
//!
//! Core types, errors, and traits shared by the `dated` crates.
//!
//! - **Types**: cache configuration, statistics and entry snapshots
//! - **Errors**: the `CacheError` taxonomy
//! - **Constants**: default expiration windows and limits
//! - **Traits**: collaborator seams (`Clock`, `Disposer`, `ResourceUsage`)
//!
//! ## Example
//!
//! ```rust
//! use dated_core::CacheConfig;
//!
//! let config = CacheConfig::default().with_ttl(30).with_sweep_interval(10);
//! assert!(config.validate().is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{CacheError, Result};
pub use traits::*;
pub use types::*;
