//! sac: small array containers. A thread-safe key/value container for a
//! handful of entries, built from fixed-capacity array segments that are
//! recycled through a shared pool.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: beat a lock-protected hash map for very small cardinalities
//!   (roughly up to 32 entries) by scanning contiguous storage instead of
//!   hashing, and by reusing nodes instead of allocating them.
//! - Layers:
//!   - Segment<K, V, N>: an `ArrayVec` of up to `N` entries plus an owned
//!     link to the next segment, both behind one `RwLock`. A container is
//!     simply its head segment; every operation starts there and recurses
//!     into `next` when the local segment cannot answer.
//!   - SegmentPool<K, V, N>: shared factory/recycler. Chains grow by
//!     checking segments out and shrink by handing emptied segments back.
//!
//! Constraints
//! - Thread-safe: locking is per segment; unrelated containers never
//!   contend except briefly on their pool's idle list.
//! - Linear scans only; no hashing, no adaptive resizing. Lookups are
//!   O(len), which is the point for tiny maps and a poor fit for big ones.
//! - Keys need `Eq`; there is no runtime fallback for incomparable keys.
//!
//! Lock coupling
//! - A segment's successor lives inside the segment's locked slot block,
//!   so it can only be reached through the parent's guard. Every walk
//!   therefore holds each lock from the head down to the segment that
//!   answers, and releases them in reverse order as the recursion unwinds.
//! - Readers share locks along the path; a writer anywhere on the path is
//!   serialized against them.
//!
//! Placement and compaction
//! - `put` appends to the first non-full segment it reaches; it only
//!   descends through full segments, scanning each for the key first.
//! - `delete` closes the gap and pulls the successor's first entry into the
//!   vacated last slot, recursively. Every segment with a successor thus
//!   stays full, which keeps the `get` early exit sound and means `put`
//!   always scans the whole chain before appending: a key never appears in
//!   two segments.
//! - A successor emptied by compaction is detached and recycled at once.
//!
//! Recycling
//! - Segments refer to their pool through a `Weak`, so idle segments do
//!   not keep the pool alive. Without a live pool, chains fall back to
//!   plain allocation and drop what they would have recycled.
//! - A recycled segment is reset before it is parked; checkout hands out
//!   segments indistinguishable from fresh ones. In debug builds, touching
//!   a parked segment or parking one twice panics.
//! - Dropping a container recycles its successors; the head is dropped.
//!
//! Locks and panics
//! - `parking_lot` locks do not poison. Equality checks run before any
//!   slot is mutated, so a panicking `Eq` unwinds with the chain intact.
//!
//! Notes and non-goals
//! - Not a general-purpose hash map; use one for more than a few dozen
//!   entries.
//! - Lock acquisition blocks without timeout; critical sections are array
//!   scans bounded by `N`.

mod lifecycle;
mod pool;
mod segment;
mod segment_proptest;

// Public surface
pub use pool::{PoolStats, SegmentPool};
pub use segment::{NotFound, Segment, CAPACITY};

/// Create an empty pool of default-capacity segments.
pub fn new_pool<K, V>() -> SegmentPool<K, V> {
    SegmentPool::new()
}

/// Create an empty container that grows from `pool`.
pub fn new_container<K, V, const N: usize>(pool: &SegmentPool<K, V, N>) -> Segment<K, V, N> {
    pool.container()
}
