#![cfg(test)]

// Property tests for Segment chains kept inside the crate so they can check
// structural invariants (density, uniqueness, pool accounting) directly.

use crate::pool::SegmentPool;
use crate::segment::{NotFound, Segment};
use proptest::prelude::*;

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Put(usize, i32),
    Delete(usize),
    Get(usize),
    Clear,
    CloneCheck(usize, i32),
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::btree_set("[a-z]{1,4}", 1..=24).prop_flat_map(|keys| {
        let pool: Vec<String> = keys.into_iter().collect();
        let idx = 0..pool.len();
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Put(i, v)),
            3 => idx.clone().prop_map(OpI::Delete),
            3 => idx.clone().prop_map(OpI::Get),
            1 => Just(OpI::Clear),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::CloneCheck(i, v)),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// The model is an ordered list: new keys append, overwrites keep their slot,
// deletes close the gap. Chain order must match it exactly.
fn model_put(model: &mut Vec<(String, i32)>, k: &str, v: i32) {
    match model.iter_mut().find(|(mk, _)| mk == k) {
        Some(slot) => slot.1 = v,
        None => model.push((k.to_string(), v)),
    }
}

fn expected_segments(len: usize, cap: usize) -> usize {
    len.div_ceil(cap).max(1)
}

fn run<const N: usize>(keys: &[String], ops: Vec<OpI>) -> Result<(), TestCaseError> {
    let pool: SegmentPool<String, i32, N> = SegmentPool::new();
    let sut: Segment<String, i32, N> = pool.container();
    let mut model: Vec<(String, i32)> = Vec::new();

    for op in ops {
        match op {
            OpI::Put(i, v) => {
                sut.put(keys[i].clone(), v);
                model_put(&mut model, &keys[i], v);
            }
            OpI::Delete(i) => {
                let before = sut.len();
                let present = model.iter().any(|(k, _)| *k == keys[i]);
                sut.delete(keys[i].as_str());
                model.retain(|(k, _)| *k != keys[i]);
                prop_assert_eq!(sut.len(), before - usize::from(present));
                prop_assert_eq!(sut.get(keys[i].as_str()), Err(NotFound));
            }
            OpI::Get(i) => {
                let expected = model
                    .iter()
                    .find(|(k, _)| *k == keys[i])
                    .map(|(_, v)| *v)
                    .ok_or(NotFound);
                prop_assert_eq!(sut.get(keys[i].as_str()), expected);
                prop_assert_eq!(sut.contains_key(keys[i].as_str()), expected.is_ok());
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
            }
            OpI::CloneCheck(i, v) => {
                let copy = sut.clone();
                prop_assert_eq!(copy.entries(), model.clone());
                prop_assert_eq!(copy.segments(), sut.segments());
                copy.put(keys[i].clone(), v);
                copy.delete(keys[(i + 1) % keys.len()].as_str());
                prop_assert_eq!(sut.entries(), model.clone());
                drop(copy);
            }
        }

        // Post-conditions after each op
        // 1) Chain order equals the model order
        prop_assert_eq!(sut.entries(), model.clone());
        // 2) Size parity and dense layout
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert_eq!(sut.segments(), expected_segments(model.len(), N));
        sut.check_invariants();
        // 3) Every segment ever allocated is either linked or parked
        let stats = pool.stats();
        prop_assert_eq!(stats.allocated, stats.idle + sut.segments() - 1);
    }
    Ok(())
}

// Property: State-machine equivalence against an ordered Vec model.
// Invariants exercised across random operation sequences:
// - put overwrites in place or appends at the end of the chain.
// - delete removes exactly one entry and preserves the order of the rest.
// - get/contains_key parity with the model, including early exit on
//   non-full segments.
// - Clones are deep: mutating one never shows through the other, and
//   dropping a clone returns its segments to the pool.
// - Only the tail may be below capacity; no key is stored twice.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_cap1((keys, ops) in arb_scenario()) {
        run::<1>(&keys, ops)?;
    }

    #[test]
    fn prop_state_machine_cap3((keys, ops) in arb_scenario()) {
        run::<3>(&keys, ops)?;
    }

    #[test]
    fn prop_state_machine_cap4((keys, ops) in arb_scenario()) {
        run::<4>(&keys, ops)?;
    }

    #[test]
    fn prop_state_machine_default_cap((keys, ops) in arb_scenario()) {
        run::<{ crate::CAPACITY }>(&keys, ops)?;
    }
}
