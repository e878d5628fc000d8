#![cfg(test)]

// Property tests for Dict kept inside the crate so they can call the
// structural self-check.

use crate::config::Config;
use crate::dict::Dict;
use core::hash::{BuildHasher, Hasher};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Set(usize, i32),
    Pop(usize),
    Get(usize),
    Has(Vec<u8>),
    Mutate(usize, i32),
    Clear,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<Op>)> {
    proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..6), 1..=24).prop_flat_map(
        |pool| {
            let idxs: Vec<usize> = (0..pool.len()).collect();
            let idx = proptest::sample::select(idxs);
            let has_pool = proptest::sample::select(pool.clone());
            let op = prop_oneof![
                6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Set(i, v)),
                2 => idx.clone().prop_map(Op::Pop),
                2 => idx.clone().prop_map(Op::Get),
                1 => prop_oneof![
                    has_pool,
                    proptest::collection::vec(any::<u8>(), 0..6)
                ]
                .prop_map(Op::Has),
                1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
                1 => Just(Op::Clear),
                1 => Just(Op::Iterate),
            ];
            proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
        },
    )
}

// Drives `sut` against a std HashMap model. After every step:
// - `len` matches the model and the structural self-check passes
//   (reachable node count, bucket placement, stored hashes);
// - the size class never decreases.
fn run_state_machine<S: BuildHasher>(
    mut sut: Dict<i32, S>,
    pool: &[Vec<u8>],
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Vec<u8>, i32> = HashMap::new();
    let mut class = sut.size_class();

    for op in ops {
        match op {
            Op::Set(i, v) => {
                let k = &pool[i];
                let prev = sut.set(k, v).expect("default classes never run out here");
                prop_assert_eq!(prev, model.insert(k.clone(), v));
            }
            Op::Pop(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.pop(k), model.remove(k));
                prop_assert!(!sut.has(k));
            }
            Op::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k), model.get(k));
            }
            Op::Has(k) => {
                prop_assert_eq!(sut.has(&k), model.contains_key(&k));
            }
            Op::Mutate(i, d) => {
                let k = &pool[i];
                match (sut.get_mut(k), model.get_mut(k)) {
                    (Some(sv), Some(mv)) => {
                        *sv = sv.wrapping_add(d);
                        *mv = mv.wrapping_add(d);
                    }
                    (None, None) => {}
                    _ => prop_assert!(false, "get_mut presence differs from model"),
                }
            }
            Op::Clear => {
                let before = sut.size_class();
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.size_class(), before);
            }
            Op::Iterate => {
                // Two passes through one cursor must agree with the model.
                let mut cursor = sut.iter();
                for _ in 0..2 {
                    let mut seen: BTreeMap<Vec<u8>, i32> = BTreeMap::new();
                    for (k, v) in cursor.by_ref() {
                        prop_assert!(seen.insert(k.to_vec(), *v).is_none(), "key yielded twice");
                    }
                    let expected: BTreeMap<Vec<u8>, i32> =
                        model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                    prop_assert_eq!(seen, expected);
                    cursor.rewind();
                }
            }
        }

        sut.check_invariants();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.size_class() >= class, "size class decreased");
        class = sut.size_class();
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(Dict::new(), &pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress chain walking,
// unlinking and tail appends during resize.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(Dict::with_hasher(ConstBuildHasher), &pool, ops)?;
    }

    // Small custom classes and a high load limit exercise several resizes
    // within a short run.
    #[test]
    fn prop_state_machine_small_classes((pool, ops) in arb_scenario()) {
        static CLASSES: [usize; 6] = [1, 2, 3, 5, 8, 13];
        let config = Config::new().size_classes(&CLASSES).load_limit(2.0);
        run_state_machine(Dict::with_config(config), &pool, ops)?;
    }
}
