//! Collaborator traits for the cache.
//!
//! The cache never builds resources and never reads the clock directly. These
//! traits are the seams through which callers plug in time, disposal, and
//! footprint reporting.

use crate::types::Timestamp;

// ═══════════════════════════════════════════════════════════════════════════════
// CLOCK TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Source of the current time, in whole seconds.
///
/// Implementations may be monotonic or wall-clock based. The cache tolerates a
/// clock that steps backwards: access times never decrease and idle time
/// saturates at zero.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISPOSER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Release routine invoked once for every resource leaving the cache.
///
/// The cache hands over ownership of the resource; the disposer must release
/// it fully so it cannot be used again.
///
/// # Contract
///
/// `dispose` must not panic. It runs in the middle of sweeps, replacements and
/// teardown, and there is no recovery path if cleanup itself fails: a
/// panicking disposer is a programming error, not a runtime condition. The
/// entry being disposed has already been removed from the cache when the
/// disposer runs.
///
/// Any `FnMut(String, R)` closure is a disposer.
pub trait Disposer<R> {
    /// Releases `resource`, previously cached under `key`.
    fn dispose(&mut self, key: String, resource: R);
}

impl<R, F> Disposer<R> for F
where
    F: FnMut(String, R),
{
    fn dispose(&mut self, key: String, resource: R) {
        self(key, resource)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOURCE USAGE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Reports the memory footprint of a cached resource.
pub trait ResourceUsage {
    /// Approximate number of bytes held by this resource.
    fn memory_usage(&self) -> u64;
}
