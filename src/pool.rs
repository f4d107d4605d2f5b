//! SegmentPool: shared factory and recycler for chain segments.
//!
//! The pool owns idle segments only. Live segments belong to exactly one
//! chain and refer back to the pool through a `Weak` handle, so dropping the
//! last `SegmentPool` frees the idle list without stranding any container.

use crate::segment::{Segment, CAPACITY};
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

/// Counters describing pool traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Segments built from scratch because no idle one was available.
    pub allocated: usize,
    /// Checkouts served from the idle list.
    pub reused: usize,
    /// Segments handed back to the pool.
    pub recycled: usize,
    /// Segments currently parked.
    pub idle: usize,
}

pub(crate) struct PoolShared<K, V, const N: usize> {
    idle: Mutex<Vec<Box<Segment<K, V, N>>>>,
    allocated: AtomicUsize,
    reused: AtomicUsize,
    recycled: AtomicUsize,
}

impl<K, V, const N: usize> PoolShared<K, V, N> {
    /// Hand out an empty, unlinked segment: a parked one if available,
    /// otherwise a fresh one bound to this pool.
    pub(crate) fn checkout(self: &Arc<Self>) -> Box<Segment<K, V, N>> {
        let parked = self.idle.lock().pop();
        match parked {
            Some(mut seg) => {
                seg.lifecycle.revive();
                debug_assert!(seg.is_reset(), "idle segment was not reset");
                self.reused.fetch_add(1, Ordering::Relaxed);
                trace!("reusing idle segment");
                seg
            }
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                trace!(capacity = N, "allocating segment");
                Box::new(Segment::with_pool(Arc::downgrade(self)))
            }
        }
    }

    /// Take back a detached segment. Entries are dropped before the idle
    /// list is locked.
    pub(crate) fn recycle(&self, mut seg: Box<Segment<K, V, N>>) {
        seg.reset();
        seg.lifecycle.park();
        self.recycled.fetch_add(1, Ordering::Relaxed);
        let mut idle = self.idle.lock();
        idle.push(seg);
        trace!(idle = idle.len(), "segment recycled");
    }
}

/// Thread-safe factory and recycler of segments. Cloning yields another
/// handle to the same pool.
pub struct SegmentPool<K, V, const N: usize = CAPACITY> {
    shared: Arc<PoolShared<K, V, N>>,
}

impl<K, V, const N: usize> SegmentPool<K, V, N> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(PoolShared {
                idle: Mutex::new(Vec::new()),
                allocated: AtomicUsize::new(0),
                reused: AtomicUsize::new(0),
                recycled: AtomicUsize::new(0),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<PoolShared<K, V, N>>) -> Self {
        Self { shared }
    }

    /// Create an empty container. Its head segment is never recycled; only
    /// the segments it links while growing come from this pool.
    pub fn container(&self) -> Segment<K, V, N> {
        Segment::with_pool(Arc::downgrade(&self.shared))
    }

    /// Number of parked segments.
    pub fn idle(&self) -> usize {
        self.shared.idle.lock().len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocated: self.shared.allocated.load(Ordering::Relaxed),
            reused: self.shared.reused.load(Ordering::Relaxed),
            recycled: self.shared.recycled.load(Ordering::Relaxed),
            idle: self.idle(),
        }
    }

    /// Free every parked segment and return how many were dropped.
    pub fn shrink(&self) -> usize {
        let drained = core::mem::take(&mut *self.shared.idle.lock());
        let n = drained.len();
        debug!(dropped = n, "shrinking segment pool");
        n
    }
}

impl<K, V, const N: usize> Clone for SegmentPool<K, V, N> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, V, const N: usize> Default for SegmentPool<K, V, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, const N: usize> fmt::Debug for SegmentPool<K, V, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentPool")
            .field("capacity", &N)
            .field("stats", &self.stats())
            .finish()
    }
}
