//! Default expiration windows and limits.
//!
//! All windows are expressed in whole seconds.

// ═══════════════════════════════════════════════════════════════════════════════
// EXPIRATION DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default idle time before an entry becomes eligible for eviction (30 minutes).
pub const DEFAULT_TTL_SECONDS: u64 = 30 * 60;

/// Default minimum spacing between two sweep passes (10 minutes).
pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 10 * 60;

/// TTL value that disables expiration entirely.
pub const TTL_DISABLED: u64 = 0;

// ═══════════════════════════════════════════════════════════════════════════════
// LIMITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Largest accepted TTL or sweep interval.
///
/// Windows are carried as 32-bit second counts at configuration boundaries.
pub const MAX_WINDOW_SECONDS: u64 = u32::MAX as u64;

/// Smallest accepted sweep interval.
pub const MIN_SWEEP_INTERVAL_SECONDS: u64 = 1;
