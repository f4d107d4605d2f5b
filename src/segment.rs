//! Segment: fixed-capacity node of a container chain, plus the chain
//! operations that walk it under lock coupling.

use crate::lifecycle::DebugLifecycle;
use crate::pool::{PoolShared, SegmentPool};
use arrayvec::ArrayVec;
use core::borrow::Borrow;
use core::fmt;
use parking_lot::RwLock;
use std::sync::Weak;
use thiserror::Error;
use tracing::trace;

/// Default number of entries per segment.
pub const CAPACITY: usize = 32;

/// Returned by lookups when the key is absent from the whole chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("key not found")]
pub struct NotFound;

#[derive(Clone)]
struct Entry<K, V> {
    key: K,
    value: V,
}

/// Everything guarded by a segment's lock. `next` lives here so that the
/// successor can only be reached through a borrow of the parent's guard.
struct Slots<K, V, const N: usize> {
    items: ArrayVec<Entry<K, V>, N>,
    next: Option<Box<Segment<K, V, N>>>,
}

impl<K, V, const N: usize> Slots<K, V, N> {
    fn position<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.items.iter().position(|e| e.key.borrow() == key)
    }
}

/// One fixed-capacity array node. A container is its head segment; further
/// segments are drawn from a [`SegmentPool`] as the chain grows and handed
/// back as soon as compaction empties them.
pub struct Segment<K, V, const N: usize = CAPACITY> {
    slots: RwLock<Slots<K, V, N>>,
    pool: Weak<PoolShared<K, V, N>>,
    pub(crate) lifecycle: DebugLifecycle,
}

impl<K, V, const N: usize> Segment<K, V, N> {
    const NONZERO: () = assert!(N > 0, "segment capacity must be non-zero");

    pub(crate) fn with_pool(pool: Weak<PoolShared<K, V, N>>) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NONZERO;
        Self {
            slots: RwLock::new(Slots {
                items: ArrayVec::new(),
                next: None,
            }),
            pool,
            lifecycle: DebugLifecycle::new(),
        }
    }

    /// Entries per segment.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// The pool this container grows from, if it is still alive.
    pub fn pool(&self) -> Option<SegmentPool<K, V, N>> {
        self.pool.upgrade().map(SegmentPool::from_shared)
    }

    /// Total number of entries across the chain.
    pub fn len(&self) -> usize {
        self.lifecycle.assert_live();
        let slots = self.slots.read();
        slots.items.len() + slots.next.as_deref().map_or(0, Self::len)
    }

    /// A chain only has successors behind a full head, so an empty head
    /// means an empty container.
    pub fn is_empty(&self) -> bool {
        self.lifecycle.assert_live();
        self.slots.read().items.is_empty()
    }

    /// Number of segments in the chain, head included.
    pub fn segments(&self) -> usize {
        let slots = self.slots.read();
        1 + slots.next.as_deref().map_or(0, Self::segments)
    }

    /// Look up `key` and copy its value out.
    pub fn get<Q>(&self, key: &Q) -> Result<V, NotFound>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        V: Clone,
    {
        self.with_value(key, V::clone)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.with_value(key, |_| ()).is_ok()
    }

    /// Look up `key` and run `f` on its value while the owning segment (and
    /// every segment before it) is read-locked.
    pub fn with_value<Q, R, F>(&self, key: &Q, f: F) -> Result<R, NotFound>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        F: FnOnce(&V) -> R,
    {
        self.lifecycle.assert_live();
        let slots = self.slots.read();
        if let Some(i) = slots.position(key) {
            return Ok(f(&slots.items[i].value));
        }
        // Keys are only ever appended to the first non-full segment.
        if !slots.items.is_full() {
            return Err(NotFound);
        }
        match slots.next.as_deref() {
            Some(next) => next.with_value(key, f),
            None => Err(NotFound),
        }
    }

    /// Insert or overwrite. An existing key keeps its position.
    pub fn put(&self, key: K, value: V)
    where
        K: Eq,
    {
        self.lifecycle.assert_live();
        let mut slots = self.slots.write();
        if let Some(i) = slots.position(&key) {
            slots.items[i].value = value;
            return;
        }
        if slots.items.is_full() {
            let next = slots.next.get_or_insert_with(|| {
                trace!(capacity = N, "segment full, linking a successor");
                self.grow()
            });
            next.put(key, value);
            return;
        }
        slots.items.push(Entry { key, value });
    }

    /// Remove `key` if present. Remaining entries keep their relative order
    /// and every segment but the tail stays full.
    pub fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.lifecycle.assert_live();
        let mut slots = self.slots.write();
        let found = slots.position(key);
        let Slots { items, next } = &mut *slots;
        if let Some(i) = found {
            items.remove(i);
        }
        let Some(succ) = next.as_deref() else {
            return;
        };
        if found.is_some() {
            if let Some(pulled) = succ.pull_front() {
                items.push(pulled);
            }
        }
        succ.delete(key);
        self.reclaim_vacant(next);
    }

    /// Empty the container, returning every successor to the pool.
    pub fn clear(&self) {
        self.lifecycle.assert_live();
        let mut slots = self.slots.write();
        let detached = slots.next.take();
        self.release_chain(detached);
        slots.items.clear();
    }

    /// Visit every entry in chain order.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        self.visit(&mut f);
    }

    /// Snapshot of all entries in chain order.
    pub fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let mut out = Vec::new();
        self.for_each(|k, v| out.push((k.clone(), v.clone())));
        out
    }

    fn visit(&self, f: &mut dyn FnMut(&K, &V)) {
        self.lifecycle.assert_live();
        let slots = self.slots.read();
        for e in &slots.items {
            f(&e.key, &e.value);
        }
        if let Some(next) = slots.next.as_deref() {
            next.visit(f);
        }
    }

    /// Remove and return the first entry, refilling the last slot from the
    /// successor so that this segment stays dense.
    fn pull_front(&self) -> Option<Entry<K, V>> {
        self.lifecycle.assert_live();
        let mut slots = self.slots.write();
        let front = slots.items.pop_at(0)?;
        let Slots { items, next } = &mut *slots;
        if let Some(succ) = next.as_deref() {
            if let Some(pulled) = succ.pull_front() {
                items.push(pulled);
            }
            self.reclaim_vacant(next);
        }
        Some(front)
    }

    fn is_vacant(&self) -> bool {
        self.slots.read().items.is_empty()
    }

    /// Detach and recycle the successor if compaction emptied it.
    fn reclaim_vacant(&self, next: &mut Option<Box<Self>>) {
        if !next.as_deref().map_or(false, Self::is_vacant) {
            return;
        }
        if let Some(mut seg) = next.take() {
            trace!("detaching vacant segment");
            // A vacant segment has no successor of its own.
            debug_assert!(seg.slots.get_mut().next.is_none());
            self.release(seg);
        }
    }

    fn grow(&self) -> Box<Self> {
        match self.pool.upgrade() {
            Some(pool) => PoolShared::checkout(&pool),
            None => Box::new(Self::with_pool(self.pool.clone())),
        }
    }

    fn release(&self, seg: Box<Self>) {
        if let Some(pool) = self.pool.upgrade() {
            pool.recycle(seg);
        }
    }

    /// Recycle a detached chain iteratively, so long chains never recurse
    /// on teardown.
    fn release_chain(&self, mut detached: Option<Box<Self>>) {
        while let Some(mut seg) = detached {
            detached = seg.slots.get_mut().next.take();
            self.release(seg);
        }
    }

    /// Drop all entries of an exclusively owned, already detached segment.
    pub(crate) fn reset(&mut self) {
        let slots = self.slots.get_mut();
        debug_assert!(slots.next.is_none(), "recycled segment still linked");
        slots.items.clear();
    }

    pub(crate) fn is_reset(&mut self) -> bool {
        let slots = self.slots.get_mut();
        slots.items.is_empty() && slots.next.is_none()
    }

    fn copy_into(&self, dst: &mut Slots<K, V, N>)
    where
        K: Clone,
        V: Clone,
    {
        self.lifecycle.assert_live();
        let src = self.slots.read();
        dst.items = src.items.clone();
        dst.next = src.next.as_deref().map(|succ| {
            let mut seg = self.grow();
            succ.copy_into(seg.slots.get_mut());
            seg
        });
    }

    /// Check the structural invariants of the whole chain: every segment
    /// with a successor is full, no linked successor is empty, and no key
    /// appears twice anywhere.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self)
    where
        K: Eq + Clone + fmt::Debug,
        V: Clone,
    {
        self.check_density();
        let keys: Vec<K> = self.entries().into_iter().map(|(k, _)| k).collect();
        for (i, a) in keys.iter().enumerate() {
            assert!(!keys[i + 1..].contains(a), "duplicate key {:?} in chain", a);
        }
    }

    #[cfg(test)]
    fn check_density(&self) {
        let slots = self.slots.read();
        if let Some(next) = slots.next.as_deref() {
            assert!(slots.items.is_full(), "non-tail segment is not full");
            assert!(!next.is_vacant(), "empty successor linked");
            next.check_density();
        }
    }
}

impl<K: Clone, V: Clone, const N: usize> Clone for Segment<K, V, N> {
    /// Deep copy: new segments and locks, same entries and topology.
    /// Successors of the copy come from the same pool.
    fn clone(&self) -> Self {
        let mut head = Self::with_pool(self.pool.clone());
        self.copy_into(head.slots.get_mut());
        head
    }
}

impl<K, V, const N: usize> Drop for Segment<K, V, N> {
    fn drop(&mut self) {
        let detached = self.slots.get_mut().next.take();
        self.release_chain(detached);
    }
}

impl<K: fmt::Debug, V: fmt::Debug, const N: usize> fmt::Debug for Segment<K, V, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        self.for_each(|k, v| {
            map.entry(k, v);
        });
        map.finish()
    }
}
