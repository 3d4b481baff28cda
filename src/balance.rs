//! Height bookkeeping and rotations.
//!
//! Conventions:
//! - The height of an absent node is 0 and a leaf has height 1.
//! - The balance factor of a node `x` is `h(right(x)) - h(left(x))`.
//! - A node is balanced if its balance factor is one of -1, 0 or 1.
//!
//! The rebalance step assumes exactly one structural change happened below the node since the
//! last time its subtree was balanced, so a balance factor never exceeds ±2.

use tracing::trace;

use crate::{
    node::{links, links_mut, maybe_set_parent, replace_child, Link, NodePtr},
    Dir,
};

/// The restructuring performed by a single [`rebalance`] step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Restructure {
    None,
    Single,
    Double,
}

/// Returns the stored height of `link`, or 0 if it is absent.
#[inline]
pub(crate) fn height<K, V>(link: Link<K, V>) -> u32 {
    link.map(|n| unsafe { links(n).height() }).unwrap_or(0)
}

#[inline]
pub(crate) unsafe fn balance_factor<K, V>(node: NodePtr<K, V>) -> i64 {
    let node = unsafe { links(node) };
    i64::from(height(node.right())) - i64::from(height(node.left()))
}

/// Recomputes `node`'s height from its current children.
///
/// Must be called after any link change below `node`, before its balance factor is trusted.
#[inline]
pub(crate) unsafe fn fix_height<K, V>(node: NodePtr<K, V>) {
    unsafe {
        let left = height(links(node).left());
        let right = height(links(node).right());
        links_mut(node).set_height(1 + left.max(right));
    }
}

// Rotates the subtree rooted at `down` so that `down` moves towards `dir`, and its `!dir` child
// (the pivot) takes its place. Returns the pivot, which is the new subtree root.
//
// If `down` has a parent, the parent's child slot is relinked to the pivot. The tree's root
// pointer is not touched; callers that rotate at the root must record the returned node.
//
// # Panics
//
// Panics if `down` has no `!dir` child.
unsafe fn rotate<K, V>(down: NodePtr<K, V>, dir: Dir) -> NodePtr<K, V> {
    unsafe {
        let up = links(down)
            .child(!dir)
            .expect("rotation requires a pivot child");

        // The pivot's inner subtree crosses over to `down`.
        let across = links_mut(up).set_child(dir, None);
        links_mut(down).set_child(!dir, across);
        maybe_set_parent(across, Some(down));

        // The pivot takes `down`'s place below its parent.
        let parent = links(down).parent();
        links_mut(up).set_parent(parent);
        if let Some(parent) = parent {
            replace_child(parent, down, Some(up));
        }

        links_mut(up).set_child(dir, Some(down));
        links_mut(down).set_parent(Some(up));

        // `up`'s height depends on `down`'s, so `down` goes first.
        fix_height(down);
        fix_height(up);

        trace!(?dir, height = links(up).height(), "rotated");

        up
    }
}

/// Rotates left at `q`, lifting its right child. Returns the new subtree root.
#[inline]
pub(crate) unsafe fn rotate_left<K, V>(q: NodePtr<K, V>) -> NodePtr<K, V> {
    unsafe { rotate(q, Dir::Left) }
}

/// Rotates right at `p`, lifting its left child. Returns the new subtree root.
#[inline]
pub(crate) unsafe fn rotate_right<K, V>(p: NodePtr<K, V>) -> NodePtr<K, V> {
    unsafe { rotate(p, Dir::Right) }
}

/// Refreshes `node`'s height and restores its balance with a single or double rotation.
///
/// Returns the root of the (possibly rotated) subtree that was rooted at `node`.
pub(crate) unsafe fn rebalance<K, V>(node: NodePtr<K, V>) -> (NodePtr<K, V>, Restructure) {
    unsafe {
        fix_height(node);

        let factor = balance_factor(node);
        debug_assert!(
            (-2..=2).contains(&factor),
            "balance factor {factor} exceeds a single mutation"
        );

        let heavy = match factor {
            2 => Dir::Right,
            -2 => Dir::Left,
            _ => return (node, Restructure::None),
        };

        let child = links(node)
            .child(heavy)
            .expect("heavy side of an unbalanced node must be present");

        // A child leaning towards the inside needs its own rotation first.
        let child_factor = balance_factor(child);
        let inner = match heavy {
            Dir::Right => child_factor < 0,
            Dir::Left => child_factor > 0,
        };

        let restructure = if inner {
            // `rotate` relinks `node`'s child slot to the lifted grandchild.
            rotate(child, heavy);
            Restructure::Double
        } else {
            Restructure::Single
        };

        (rotate(node, !heavy), restructure)
    }
}

/// Refreshes the heights of `start` and all of its ancestors without rotating.
pub(crate) unsafe fn fix_heights_upward<K, V>(start: Link<K, V>) {
    let mut opt_cur = start;

    while let Some(cur) = opt_cur {
        unsafe {
            fix_height(cur);
            opt_cur = links(cur).parent();
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::prelude::v1::*;

    use super::*;
    use crate::node::Node;

    // Builds a right-leaning chain 1 -> 2 -> 3 with consistent heights.
    fn right_chain() -> [NodePtr<u32, ()>; 3] {
        let a = Node::alloc(1, (), None);
        let b = Node::alloc(2, (), Some(a));
        let c = Node::alloc(3, (), Some(b));

        unsafe {
            links_mut(a).set_child(Dir::Right, Some(b));
            links_mut(b).set_child(Dir::Right, Some(c));
            fix_heights_upward(Some(c));
        }

        [a, b, c]
    }

    fn free_all(nodes: &[NodePtr<u32, ()>]) {
        for &node in nodes {
            unsafe { Node::free(node) };
        }
    }

    #[test]
    fn heights_and_factors() {
        let [a, b, c] = right_chain();

        unsafe {
            assert_eq!(height(Some(a)), 3);
            assert_eq!(height(Some(b)), 2);
            assert_eq!(height(Some(c)), 1);
            assert_eq!(height::<u32, ()>(None), 0);

            assert_eq!(balance_factor(a), 2);
            assert_eq!(balance_factor(b), 1);
            assert_eq!(balance_factor(c), 0);
        }

        free_all(&[a, b, c]);
    }

    #[test]
    fn single_rotation_relinks_parents() {
        let [a, b, c] = right_chain();

        unsafe {
            let (top, restructure) = rebalance(a);
            assert_eq!(restructure, Restructure::Single);
            assert_eq!(top, b);

            assert_eq!(links(b).parent(), None);
            assert_eq!(links(b).left(), Some(a));
            assert_eq!(links(b).right(), Some(c));
            assert_eq!(links(a).parent(), Some(b));
            assert_eq!(links(c).parent(), Some(b));
            assert_eq!(links(a).left(), None);
            assert_eq!(links(a).right(), None);

            assert_eq!(links(b).height(), 2);
            assert_eq!(links(a).height(), 1);
        }

        free_all(&[a, b, c]);
    }

    #[test]
    fn double_rotation_lifts_grandchild() {
        // 1 -> right 3 -> left 2
        let a = Node::alloc(1, (), None);
        let c = Node::alloc(3, (), Some(a));
        let b = Node::alloc(2, (), Some(c));

        unsafe {
            links_mut(a).set_child(Dir::Right, Some(c));
            links_mut(c).set_child(Dir::Left, Some(b));
            fix_heights_upward(Some(b));

            let (top, restructure) = rebalance(a);
            assert_eq!(restructure, Restructure::Double);
            assert_eq!(top, b);
            assert_eq!(links(b).left(), Some(a));
            assert_eq!(links(b).right(), Some(c));
            assert_eq!(links(a).parent(), Some(b));
            assert_eq!(links(c).parent(), Some(b));
            assert_eq!(links(b).parent(), None);
            assert_eq!(links(b).height(), 2);
        }

        free_all(&[a, b, c]);
    }

    #[test]
    fn balanced_node_is_untouched() {
        let [a, b, c] = right_chain();

        unsafe {
            let (top, restructure) = rebalance(b);
            assert_eq!(top, b);
            assert_eq!(restructure, Restructure::None);
            assert_eq!(links(b).parent(), Some(a));
        }

        free_all(&[a, b, c]);
    }

    #[test]
    #[should_panic(expected = "rotation requires a pivot child")]
    fn rotate_without_pivot_panics() {
        let leaf = Node::alloc(1u32, (), None);
        unsafe { rotate_left(leaf) };
    }
}
