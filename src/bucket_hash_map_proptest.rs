#![cfg(test)]

// Property tests for BucketHashMap kept inside the crate so they can build
// positions and inspect chains directly.

use crate::bucket_hash_map::BucketHashMap;
use crate::identity::IdentityBuildHasher;
use crate::position::Position;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hasher};

const BUCKETS: usize = 8;

#[derive(Clone, Debug)]
enum Op {
    Push(u16, i32),
    Peek(u16),
    Pop(u16),
    Remove(u16),
    TakePosition(u16),
    RemoveAt(usize),
    Export,
    Clear,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    // Keys 0..24 over 8 buckets: three keys per bucket, plenty of duplicates.
    let key = 0u16..24;
    let op = prop_oneof![
        4 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::Push(k, v)),
        2 => key.clone().prop_map(Op::Peek),
        2 => key.clone().prop_map(Op::Pop),
        2 => key.clone().prop_map(Op::Remove),
        2 => key.prop_map(Op::TakePosition),
        2 => any::<usize>().prop_map(Op::RemoveAt),
        1 => Just(Op::Export),
        1 => Just(Op::Clear),
    ];
    proptest::collection::vec(op, 1..80)
}

/// A position handed out by the map together with what it should still
/// resolve to while its bucket is untouched.
struct Taken {
    pos: Position,
    key: u16,
    value: i32,
    mutations: u64,
}

// Reference model: each bucket is a Vec ordered head-first.
struct BucketModel {
    chains: Vec<Vec<(u16, i32)>>,
    mutations: Vec<u64>,
}

impl BucketModel {
    fn new() -> Self {
        Self {
            chains: vec![Vec::new(); BUCKETS],
            mutations: vec![0; BUCKETS],
        }
    }

    fn bucket(k: u16) -> usize {
        k as usize % BUCKETS
    }

    fn len(&self) -> usize {
        self.chains.iter().map(Vec::len).sum()
    }

    fn first(&self, k: u16) -> Option<(usize, usize)> {
        let b = Self::bucket(k);
        self.chains[b]
            .iter()
            .position(|&(kk, _)| kk == k)
            .map(|ord| (b, ord))
    }

    fn remove(&mut self, bucket: usize, ordinal: usize) -> (u16, i32) {
        self.mutations[bucket] += 1;
        self.chains[bucket].remove(ordinal)
    }

    fn flatten(&self) -> (Vec<i32>, Vec<u16>) {
        let entries = self.chains.iter().flatten();
        (
            entries.clone().map(|&(_, v)| v).collect(),
            entries.map(|&(k, _)| k).collect(),
        )
    }
}

// Property: Chain-exact equivalence against a per-bucket Vec model using the
// identity hasher, so bucket and ordinal of every entry are predictable.
// - `push` goes to the head of bucket `k % N`; lookups hit the first match.
// - `index_of` reports exactly the model's (bucket, ordinal).
// - Positions keep resolving until their bucket is mutated, then never again.
// - `to_lists` matches the model flattened bucket by bucket, head-first.
// - `clear` returns to the unallocated state and stales every position.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_matches_bucket_model(ops in arb_ops()) {
        let mut sut: BucketHashMap<u16, i32, BUCKETS, IdentityBuildHasher> = BucketHashMap::default();
        let mut model = BucketModel::new();
        let mut taken: Vec<Taken> = Vec::new();

        for op in ops {
            match op {
                Op::Push(k, v) => {
                    let b = BucketModel::bucket(k);
                    let pos = sut.push(k, v);
                    model.chains[b].insert(0, (k, v));
                    model.mutations[b] += 1;
                    prop_assert_eq!((pos.primary_index(), pos.secondary_index()), (b, 0));
                    taken.push(Taken { pos, key: k, value: v, mutations: model.mutations[b] });
                }
                Op::Peek(k) => {
                    let expected = model.first(k).map(|(b, o)| model.chains[b][o].1);
                    prop_assert_eq!(sut.peek(&k).copied(), expected);
                    prop_assert_eq!(sut.contains_key(&k), expected.is_some());
                }
                Op::Pop(k) => {
                    let expected = model.first(k).map(|(b, o)| model.remove(b, o).1);
                    prop_assert_eq!(sut.pop(&k), expected);
                }
                Op::Remove(k) => {
                    let expected = model.first(k).map(|(b, o)| model.remove(b, o)).is_some();
                    prop_assert_eq!(sut.remove(&k), expected);
                }
                Op::TakePosition(k) => {
                    let got = sut.index_of(&k);
                    match model.first(k) {
                        Some((b, o)) => {
                            let pos = got.expect("present in model");
                            prop_assert_eq!((pos.primary_index(), pos.secondary_index()), (b, o));
                            let value = model.chains[b][o].1;
                            taken.push(Taken { pos, key: k, value, mutations: model.mutations[b] });
                        }
                        None => prop_assert!(got.is_none()),
                    }
                }
                Op::RemoveAt(i) => {
                    if !taken.is_empty() {
                        let t = &taken[i % taken.len()];
                        let b = t.pos.primary_index();
                        let live = model.mutations[b] == t.mutations;
                        let removed = sut.remove_at(t.pos);
                        prop_assert_eq!(removed, live);
                        if live {
                            let (k, v) = model.remove(b, t.pos.secondary_index());
                            prop_assert_eq!((k, v), (t.key, t.value));
                        }
                    }
                }
                Op::Export => {
                    let (values, keys) = sut.to_lists();
                    prop_assert_eq!((values, keys), model.flatten());
                }
                Op::Clear => {
                    sut.clear();
                    prop_assert!(!sut.is_allocated());
                    for (chain, m) in model.chains.iter_mut().zip(model.mutations.iter_mut()) {
                        chain.clear();
                        *m += 1;
                    }
                }
            }

            // Every handed-out position resolves exactly while its bucket is untouched.
            for t in &taken {
                let live = model.mutations[t.pos.primary_index()] == t.mutations;
                if live {
                    prop_assert_eq!(sut.key_at(t.pos), Some(&t.key));
                    prop_assert_eq!(sut.value_at(t.pos), Some(&t.value));
                } else {
                    prop_assert!(sut.key_at(t.pos).is_none());
                }
            }
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.len() == 0);
        }
    }
}

#[derive(Clone, Debug)]
enum KeyOp {
    Push(u16, i32),
    Peek(u16),
    Pop(u16),
    Remove(u16),
    FindThenRemoveAt(u16),
    Export,
}

fn arb_key_ops() -> impl Strategy<Value = Vec<KeyOp>> {
    let key = 0u16..32;
    let op = prop_oneof![
        4 => (key.clone(), any::<i32>()).prop_map(|(k, v)| KeyOp::Push(k, v)),
        2 => key.clone().prop_map(KeyOp::Peek),
        2 => key.clone().prop_map(KeyOp::Pop),
        1 => key.clone().prop_map(KeyOp::Remove),
        2 => key.prop_map(KeyOp::FindThenRemoveAt),
        1 => Just(KeyOp::Export),
    ];
    proptest::collection::vec(op, 1..80)
}

// Shared runner: per key, the live values form a stack (last pushed on top),
// whatever the hasher does with bucket placement.
fn run_key_stack_model<S: BuildHasher>(
    mut sut: BucketHashMap<u16, i32, 16, S>,
    ops: Vec<KeyOp>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<u16, Vec<i32>> = HashMap::new();
    let mut pushes = 0usize;
    let mut removals = 0usize;

    for op in ops {
        match op {
            KeyOp::Push(k, v) => {
                sut.push(k, v);
                model.entry(k).or_default().push(v);
                pushes += 1;
            }
            KeyOp::Peek(k) => {
                let expected = model.get(&k).and_then(|s| s.last()).copied();
                prop_assert_eq!(sut.peek(&k).copied(), expected);
            }
            KeyOp::Pop(k) => {
                let expected = model.get_mut(&k).and_then(Vec::pop);
                let got = sut.pop(&k);
                prop_assert_eq!(got, expected);
                removals += usize::from(got.is_some());
            }
            KeyOp::Remove(k) => {
                let expected = model.get_mut(&k).and_then(Vec::pop).is_some();
                let got = sut.remove(&k);
                prop_assert_eq!(got, expected);
                removals += usize::from(got);
            }
            KeyOp::FindThenRemoveAt(k) => {
                let expected = model.get_mut(&k).and_then(Vec::pop);
                match sut.index_of(&k) {
                    Some(pos) => {
                        prop_assert_eq!(sut.key_at(pos), Some(&k));
                        let (kk, vv) = sut.try_remove_at(pos).expect("fresh position resolves");
                        prop_assert_eq!(kk, k);
                        prop_assert_eq!(Some(vv), expected);
                        removals += 1;
                    }
                    None => prop_assert!(expected.is_none()),
                }
            }
            KeyOp::Export => {
                let (values, keys) = sut.to_lists();
                prop_assert_eq!(values.len(), sut.len());
                prop_assert_eq!(keys.len(), sut.len());
                let mut grouped: HashMap<u16, Vec<i32>> = HashMap::new();
                for (k, v) in keys.iter().zip(values.iter()) {
                    grouped.entry(*k).or_default().push(*v);
                }
                for (k, stack) in &model {
                    let newest_first: Vec<i32> = stack.iter().rev().copied().collect();
                    prop_assert_eq!(grouped.remove(k).unwrap_or_default(), newest_first);
                }
                prop_assert!(grouped.is_empty());
            }
        }
        prop_assert_eq!(sut.len(), pushes - removals);
    }
    Ok(())
}

// Every key collides into one bucket.
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

// Property: Key-level LIFO semantics and size bookkeeping hold under the
// default random hasher and under total collision.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_key_stacks_default_hasher(ops in arb_key_ops()) {
        run_key_stack_model(BucketHashMap::new(), ops)?;
    }

    #[test]
    fn prop_key_stacks_with_collisions(ops in arb_key_ops()) {
        run_key_stack_model(BucketHashMap::with_hasher(ConstBuildHasher), ops)?;
    }
}
