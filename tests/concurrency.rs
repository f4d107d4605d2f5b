// Multi-threaded behavior of containers and the shared pool.
//
// - Writers on disjoint keys lose nothing, even while the chain grows.
// - Readers racing writers only ever observe values some writer stored.
// - Many containers churning over one pool leave it consistent.
use sac::{NotFound, SegmentPool};

const THREADS: usize = 8;

// Test: concurrent puts of disjoint keys.
// Verifies: every key lands exactly once and the chain stays countable.
#[test]
fn concurrent_disjoint_puts() {
    let pool: SegmentPool<usize, usize, 4> = SegmentPool::new();
    let c = pool.container();
    crossbeam::scope(|s| {
        for t in 0..THREADS {
            let c = &c;
            s.spawn(move |_| {
                for i in 0..50 {
                    let k = t * 1000 + i;
                    c.put(k, k + 1);
                }
            });
        }
    })
    .expect("writer thread panicked");

    assert_eq!(c.len(), THREADS * 50);
    for t in 0..THREADS {
        for i in 0..50 {
            let k = t * 1000 + i;
            assert_eq!(c.get(&k), Ok(k + 1));
        }
    }
}

// Test: readers racing a writer that overwrites and deletes.
// Verifies: a read returns either NotFound or a value of the expected shape.
#[test]
fn readers_see_consistent_values() {
    let pool: SegmentPool<u32, (u32, u32), 4> = SegmentPool::new();
    let c = pool.container();
    for k in 0..32 {
        c.put(k, (k, 0));
    }
    crossbeam::scope(|s| {
        let c = &c;
        s.spawn(move |_| {
            for round in 1..200u32 {
                for k in (0..32).filter(|k| k % 4 == round % 4) {
                    c.put(k, (k, round));
                }
                c.delete(&(round % 32));
            }
        });
        for _ in 0..THREADS - 1 {
            s.spawn(move |_| {
                for _ in 0..500 {
                    for k in 0..32u32 {
                        match c.get(&k) {
                            Ok((stored, _)) => assert_eq!(stored, k),
                            Err(NotFound) => {}
                        }
                    }
                    assert!(c.len() <= 32);
                }
            });
        }
    })
    .expect("thread panicked");
}

// Test: many containers sharing one pool under put/delete/clear churn.
// Verifies: every allocated segment ends up parked once the containers drop.
#[test]
fn shared_pool_churn() {
    let pool: SegmentPool<u64, u64, 2> = SegmentPool::new();
    crossbeam::scope(|s| {
        for t in 0..THREADS as u64 {
            let pool = pool.clone();
            s.spawn(move |_| {
                let c = pool.container();
                for round in 0..100u64 {
                    for k in 0..(round % 9) {
                        c.put(t << 32 | k, round);
                    }
                    if round % 3 == 0 {
                        c.clear();
                    } else {
                        c.delete(&(t << 32));
                    }
                }
                assert_eq!(c.segments(), c.len().div_ceil(2).max(1));
            });
        }
    })
    .expect("worker thread panicked");

    let stats = pool.stats();
    assert_eq!(stats.idle, stats.allocated);
    assert_eq!(stats.allocated + stats.reused, stats.recycled);
}

// Test: one container shared by threads that each own a key range and
// delete what they insert.
// Verifies: the container ends empty and the chain fully shrinks.
#[test]
fn concurrent_insert_delete_drains() {
    let pool: SegmentPool<usize, usize, 3> = SegmentPool::new();
    let c = pool.container();
    crossbeam::scope(|s| {
        for t in 0..THREADS {
            let c = &c;
            s.spawn(move |_| {
                for i in 0..40 {
                    c.put(t * 100 + i, i);
                }
                for i in 0..40 {
                    c.delete(&(t * 100 + i));
                    assert_eq!(c.get(&(t * 100 + i)), Err(NotFound));
                }
            });
        }
    })
    .expect("thread panicked");

    assert!(c.is_empty());
    assert_eq!(c.len(), 0);
    assert_eq!(c.segments(), 1);
    assert_eq!(pool.idle(), pool.stats().allocated);
}
