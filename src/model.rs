//! A randomized model of [`AvlTree`] checked against [`BTreeMap`].
//!
//! Shared by the property tests and the fuzz targets.

extern crate std;

use std::{collections::BTreeMap, prelude::v1::*};

use arbitrary::Arbitrary;
use proptest::{
    arbitrary::any,
    strategy::{Just, Strategy},
};

use crate::{AvlTree, Error};

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    /// Selects an existing key by position, falling back to the index itself when the tree is
    /// empty. This keeps hits on present keys frequent.
    Index(usize),
    Random(u32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..1000,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(ItemValue, u32),
    Get(ItemValue),
    ContainsKey(ItemValue),
    Remove(ItemValue),
    First,
    PopFirst,
    Last,
    PopLast,
    Iterate,
}

impl Op {
    fn finalize(self, sorted: &[u32]) -> FinalOp {
        fn get_key(v: &[u32], i: ItemValue) -> u32 {
            match i {
                ItemValue::Index(idx) => {
                    if v.is_empty() {
                        idx as u32
                    } else {
                        v[idx % v.len()]
                    }
                }
                ItemValue::Random(v) => v,
            }
        }

        match self {
            Op::Insert(item, value) => FinalOp::Insert(get_key(sorted, item), value),
            Op::Get(item) => FinalOp::Get(get_key(sorted, item)),
            Op::ContainsKey(item) => FinalOp::ContainsKey(get_key(sorted, item)),
            Op::Remove(item) => FinalOp::Remove(get_key(sorted, item)),
            Op::First => FinalOp::First,
            Op::PopFirst => FinalOp::PopFirst,
            Op::Last => FinalOp::Last,
            Op::PopLast => FinalOp::PopLast,
            Op::Iterate => FinalOp::Iterate,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Insert(u32, u32),
    Get(u32),
    ContainsKey(u32),
    Remove(u32),
    First,
    PopFirst,
    Last,
    PopLast,
    Iterate,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        (value_strategy(), any::<u32>()).prop_map(|(key, value)| Op::Insert(key, value)),
        value_strategy().prop_map(Op::Get),
        value_strategy().prop_map(Op::ContainsKey),
        value_strategy().prop_map(Op::Remove),
        Just(Op::First),
        Just(Op::PopFirst),
        Just(Op::Last),
        Just(Op::PopLast),
        Just(Op::Iterate),
    ]
}

/// Asserts that `tree` is no taller than the AVL worst case for its size.
pub fn assert_height_bound<K, V>(tree: &AvlTree<K, V>) {
    let bound = 1.4405 * (tree.len() as f64 + 2.0).log2();
    let height = tree.height();

    assert!(
        f64::from(height) <= bound,
        "height {height} exceeds AVL bound {bound} for {} nodes",
        tree.len()
    );
}

pub fn run_btree_equivalence(ops: Vec<Op>) {
    let mut btree = BTreeMap::new();
    let mut avl: AvlTree<u32, u32> = AvlTree::new();

    #[inline]
    fn entry<'a>((key, value): (&'a u32, &'a u32)) -> (u32, u32) {
        (*key, *value)
    }

    for (op_id, op) in ops.into_iter().enumerate() {
        let sorted_keys: Vec<u32> = btree.keys().copied().collect();
        let final_op = op.finalize(&sorted_keys);

        match final_op {
            FinalOp::Insert(key, value) => {
                let from_btree = btree.insert(key, value);
                let from_avl = avl.insert(key, value);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Get(key) => {
                let from_btree = btree.get(&key).ok_or(Error::NotFound);
                let from_avl = avl.get(&key);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::ContainsKey(key) => {
                let from_btree = btree.contains_key(&key);
                let from_avl = avl.contains_key(&key);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Remove(key) => {
                let from_btree = btree.remove(&key).ok_or(Error::NotFound);
                let from_avl = avl.remove(&key);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::First => {
                let from_btree = btree.first_key_value().map(entry);
                let from_avl = avl.first_key_value().map(entry);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopFirst => {
                let from_btree = btree.pop_first();
                let from_avl = avl.pop_first();

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Last => {
                let from_btree = btree.last_key_value().map(entry);
                let from_avl = avl.last_key_value().map(entry);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopLast => {
                let from_btree = btree.pop_last();
                let from_avl = avl.pop_last();

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Iterate => {
                let forward = avl.iter().map(entry).collect::<Vec<_>>();
                let mut backward = avl.iter().rev().map(entry).collect::<Vec<_>>();
                backward.reverse();

                assert_eq!(forward, backward, "FinalOp #{op_id}: {final_op:?}");
                assert!(
                    forward.windows(2).all(|w| w[0].0 < w[1].0),
                    "FinalOp #{op_id}: keys not strictly ascending"
                );
            }
        }

        avl.assert_invariants();
        assert_height_bound(&avl);
        assert_eq!(btree.len(), avl.len());
        assert!(btree.iter().map(entry).eq(avl.iter().map(entry)));
    }
}
