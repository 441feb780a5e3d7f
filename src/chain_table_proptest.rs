#![cfg(test)]

// Property tests for ChainTable kept inside the crate so they can check
// structural invariants that the public API does not expose.

use crate::chain_table::{ChainTable, MIN_CAPACITY};
use proptest::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

fn std_hash(k: &String) -> u64 {
    let mut h = DefaultHasher::new();
    k.hash(&mut h);
    h.finish()
}

fn const_hash(_: &String) -> u64 {
    0
}

// Pool-indexed operations so shrinking moves toward earlier keys, a smaller
// pool and shorter op lists.
#[derive(Clone, Debug)]
enum OpI {
    Put(usize, i32),
    Remove(usize),
    Find(usize),
    FindFresh(String),
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=40).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Put(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Find),
            1 => "[A-Z]{1,3}".prop_map(OpI::FindFresh),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Drive a ChainTable and a std HashMap model through the same operations.
// Invariants checked after every op:
// - put replaces iff the model already held the key, returning the old pair.
// - remove returns exactly the model's pair; absent keys are a no-op.
// - find agrees with the model.
// - every node is reachable once, sits in `hash % capacity`, and the
//   capacity stays a power of two >= 16 with occupancy <= 0.75 * capacity.
fn run(
    hash: fn(&String) -> u64,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut sut: ChainTable<String, i32> = ChainTable::new();
    let mut model: HashMap<String, i32> = HashMap::new();
    let mut last_capacity = MIN_CAPACITY;

    for op in ops {
        match op {
            OpI::Put(i, v) => {
                let k = pool[i].clone();
                let old = sut
                    .put(hash(&k), k.clone(), v, |a, b| a == b)
                    .expect("growth within test sizes");
                let model_old = model.insert(k.clone(), v);
                prop_assert_eq!(old.map(|(ok, ov)| (ok == k, ov)), model_old.map(|v| (true, v)));
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                let removed = sut.remove(hash(k), |q| q == k);
                let model_removed = model.remove_entry(k);
                prop_assert_eq!(removed, model_removed);
            }
            OpI::Find(i) => {
                let k = &pool[i];
                let found = sut.find(hash(k), |q| q == k).map(|(_, v)| *v);
                prop_assert_eq!(found, model.get(k).copied());
            }
            OpI::FindFresh(s) => {
                prop_assert!(sut.find(hash(&s), |q| *q == s).is_none());
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.iter().map(|(k, _)| k.clone()).collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
        }

        sut.assert_invariants(hash);
        prop_assert_eq!(sut.occupancy(), model.len());
        prop_assert!(sut.capacity() >= last_capacity, "capacity never shrinks");
        last_capacity = sut.capacity();
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run(std_hash, pool, ops)?;
    }

    // Same invariants with every key in one chain: exercises equality
    // resolution and whole-chain relocation during growth.
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run(const_hash, pool, ops)?;
    }

    // Growth moves entries without loss: after inserting `n` distinct keys
    // every one is still found with its original value.
    #[test]
    fn prop_growth_loses_nothing(keys in proptest::collection::hash_set(any::<u64>(), 0..400)) {
        let mut sut: ChainTable<u64, u64> = ChainTable::new();
        for &k in &keys {
            prop_assert!(sut.put(k, k, !k, |a, b| a == b).expect("grow").is_none());
        }
        sut.assert_invariants(|k| *k);
        prop_assert_eq!(sut.occupancy(), keys.len());
        for &k in &keys {
            prop_assert_eq!(sut.find(k, |q| *q == k).map(|(_, v)| *v), Some(!k));
        }
    }
}
