//! Debug-only lifecycle tracking for pooled segments.
//!
//! A segment is either live (reachable from exactly one container) or idle
//! (parked inside a pool). In debug builds, operating on an idle segment,
//! parking a segment twice, or reviving a segment that was never parked
//! panics. In release builds, this compiles to a zero-cost no-op.

#[cfg(debug_assertions)]
use core::sync::atomic::{AtomicBool, Ordering};

/// Per-segment lifecycle tracker. Embed this in a segment and guard entry
/// points with `self.lifecycle.assert_live();`.
#[derive(Debug)]
pub struct DebugLifecycle {
    #[cfg(debug_assertions)]
    idle: AtomicBool,
}

impl DebugLifecycle {
    /// Create a tracker in the live state.
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            idle: AtomicBool::new(false),
        }
    }

    /// Panics in debug builds if the segment is parked in a pool.
    #[inline]
    pub fn assert_live(&self) {
        #[cfg(debug_assertions)]
        assert!(
            !self.idle.load(Ordering::Acquire),
            "pooled segment used while idle"
        );
    }

    /// Mark the segment as handed to a pool.
    #[inline]
    pub fn park(&self) {
        #[cfg(debug_assertions)]
        {
            let was_idle = self.idle.swap(true, Ordering::AcqRel);
            assert!(!was_idle, "segment recycled twice");
        }
    }

    /// Mark the segment as checked out of a pool.
    #[inline]
    pub fn revive(&self) {
        #[cfg(debug_assertions)]
        {
            let was_idle = self.idle.swap(false, Ordering::AcqRel);
            assert!(was_idle, "segment checked out without being parked");
        }
    }
}

impl Default for DebugLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
