//! Shared data types: configuration, statistics and entry snapshots.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_SWEEP_INTERVAL_SECONDS, DEFAULT_TTL_SECONDS, MAX_WINDOW_SECONDS,
    MIN_SWEEP_INTERVAL_SECONDS,
};
use crate::error::{CacheError, Result};

/// Point in time, in whole seconds since the clock's origin.
pub type Timestamp = u64;

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Cache configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Idle seconds before an entry may be evicted; `0` disables expiration
    pub ttl_seconds: u64,
    /// Minimum seconds between two sweep passes
    pub sweep_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECONDS,
        }
    }
}

impl CacheConfig {
    /// Returns a copy with the given TTL.
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Returns a copy with the given sweep interval.
    pub fn with_sweep_interval(mut self, seconds: u64) -> Self {
        self.sweep_interval_seconds = seconds;
        self
    }

    /// Checks both windows against the accepted ranges.
    pub fn validate(&self) -> Result<()> {
        validate_ttl(self.ttl_seconds)?;
        validate_sweep_interval(self.sweep_interval_seconds)
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json).map_err(|e| match e {
            CacheError::JsonError(inner) => {
                CacheError::ConfigError(format!("{}: {}", path.display(), inner))
            }
            other => other,
        })
    }
}

/// Validates a TTL value. Zero is accepted and disables expiration.
pub fn validate_ttl(ttl_seconds: u64) -> Result<()> {
    if ttl_seconds > MAX_WINDOW_SECONDS {
        return Err(CacheError::InvalidConfiguration {
            field: "ttl_seconds",
            value: ttl_seconds,
            reason: format!("must not exceed {MAX_WINDOW_SECONDS}"),
        });
    }
    Ok(())
}

/// Validates a sweep interval.
pub fn validate_sweep_interval(seconds: u64) -> Result<()> {
    if seconds < MIN_SWEEP_INTERVAL_SECONDS {
        return Err(CacheError::InvalidConfiguration {
            field: "sweep_interval_seconds",
            value: seconds,
            reason: format!("must be at least {MIN_SWEEP_INTERVAL_SECONDS}"),
        });
    }
    if seconds > MAX_WINDOW_SECONDS {
        return Err(CacheError::InvalidConfiguration {
            field: "sweep_interval_seconds",
            value: seconds,
            reason: format!("must not exceed {MAX_WINDOW_SECONDS}"),
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// SNAPSHOTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Timestamps of a live entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    /// Entry key
    pub key: String,
    /// When the entry was inserted
    pub time_inserted: Timestamp,
    /// When the entry was last returned by `get`
    pub time_accessed: Timestamp,
}

impl EntryInfo {
    /// Seconds since the last access, saturating at zero.
    pub fn idle_for(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.time_accessed)
    }
}

/// Memory footprint of one cached resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    /// Entry key
    pub key: String,
    /// Approximate bytes held by the resource
    pub bytes: u64,
}

/// Cache statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Live entries
    pub entries: usize,
    /// Successful `get` calls
    pub hits: u64,
    /// `get` calls for absent keys
    pub misses: u64,
    /// Entries created by `insert`
    pub insertions: u64,
    /// Inserts that replaced an existing entry
    pub replacements: u64,
    /// Entries dropped by `remove` or `clear`
    pub removals: u64,
    /// Entries evicted by a sweep
    pub evictions: u64,
    /// Disposal callback invocations
    pub disposals: u64,
    /// Completed sweep passes
    pub sweeps: u64,
}

impl CacheStats {
    /// Fraction of `get` calls that hit, or `0.0` before any lookup.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
