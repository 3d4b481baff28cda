//! A self-balancing ordered index built from an AVL tree.
//!
//! The crate is layered the way the structure is reasoned about:
//!
//! - [`SearchTree`] is a plain binary search tree. It keeps keys ordered, stores each node's
//!   height, and exposes single rotations, but never balances itself.
//! - The balance engine (height bookkeeping, balance factors, single and double rotations) lives
//!   in a private module and operates on individual nodes.
//! - [`AvlTree`] runs every mutation through the [`SearchTree`] and then walks from the point of
//!   change back up to the root, refreshing heights and rotating as needed.
//!
//! Conventions used in comments:
//! - The height of an absent node is 0 and the height of a leaf is 1.
//! - The balance factor of a node is the height of its right subtree minus the height of its
//!   left subtree.
//!
//! The invariants of an AVL tree are:
//! 1. Keys in a node's left subtree are less than its key; keys in its right subtree are greater.
//! 2. Every balance factor is -1, 0 or 1.
//! 3. Every stored height equals one more than the greater height of the node's children.
//! 4. Every child's parent link points at the node holding it, and the root has no parent.
//!
//! Corollary: a tree of `n` nodes has height at most `1.4405 * log2(n + 2)`.
//!
//! Nodes are heap allocated and linked with raw pointers. Child links own their targets; parent
//! links are back-references used to walk upward during rebalancing and iteration.
#![cfg_attr(not(feature = "std"), no_std)]

use core::ops::Not;

mod avl;
mod balance;
mod debug;
mod error;
mod iter;
mod node;
mod search_tree;

#[cfg(any(test, feature = "model"))]
pub mod model;


pub use crate::{
    avl::AvlTree,
    error::Error,
    iter::{IntoIter, Iter},
    search_tree::SearchTree,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}
