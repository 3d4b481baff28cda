extern crate alloc;

use alloc::{boxed::Box, vec::Vec};
use core::{borrow::Borrow, cmp::Ordering, fmt, iter, marker::PhantomData, mem};

use tracing::debug;

use crate::{
    balance::{self, fix_heights_upward, height},
    iter::{IntoIter, Iter},
    node::{
        extreme, links, links_mut, maybe_set_parent, replace_child, step, Link, Node, NodePtr,
    },
    Dir, Error,
};

/// An unbalanced binary search tree mapping unique keys to values.
///
/// This is the structural base of [`AvlTree`](crate::AvlTree): it keeps keys ordered and every
/// node's stored height current, but never rotates on its own. Lookups and mutations take time
/// proportional to the depth of the affected key, which degrades to _O(n)_ for sorted input.
pub struct SearchTree<K, V> {
    pub(crate) root: Link<K, V>,
    pub(crate) len: usize,
    _marker: PhantomData<Box<Node<K, V>>>,
}

// SAFETY: The tree exclusively owns all of its nodes, just like `Box<Node<K, V>>` would.
unsafe impl<K: Send, V: Send> Send for SearchTree<K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for SearchTree<K, V> {}

impl<K, V> SearchTree<K, V> {
    /// Returns a new empty tree.
    pub const fn new() -> SearchTree<K, V> {
        SearchTree {
            root: None,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Returns `true` if the tree contains no elements.
    pub fn is_empty(&self) -> bool {
        let empty = self.len == 0;
        debug_assert_eq!(empty, self.root.is_none());
        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the height of the tree: 0 when empty, 1 for a single node.
    pub fn height(&self) -> u32 {
        height(self.root)
    }

    /// Returns an iterator over the entries of the tree, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    /// Returns an iterator over the keys of the tree, in ascending order.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over the values of the tree, in ascending key order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator + '_ {
        self.iter().map(|(_, value)| value)
    }

    /// Returns the first key-value pair in the tree.
    ///
    /// The returned key is the minimum key in the tree.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.edge_raw(Dir::Left).map(|node| unsafe {
            let node = links(node);
            (&node.key, &node.value)
        })
    }

    /// Returns the last key-value pair in the tree.
    ///
    /// The returned key is the maximum key in the tree.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.edge_raw(Dir::Right).map(|node| unsafe {
            let node = links(node);
            (&node.key, &node.value)
        })
    }

    /// Removes and returns the first key-value pair in the tree.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let (entry, start) = self.pop_raw(Dir::Left)?;
        unsafe { fix_heights_upward(start) };
        Some(entry)
    }

    /// Removes and returns the last key-value pair in the tree.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let (entry, start) = self.pop_raw(Dir::Right)?;
        unsafe { fix_heights_upward(start) };
        Some(entry)
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        if self.root.is_some() {
            debug!(len = self.len, "clearing tree");
        }

        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let cur = extreme(cur, Dir::Left);
                let parent = links(cur).parent();
                let right = links(cur).right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                maybe_set_parent(right, parent);

                drop(Node::free(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len, 0);
    }

    // Support methods ========================================================

    /// Returns the outermost node in direction `dir`: the minimum for `Dir::Left`.
    pub(crate) fn edge_raw(&self, dir: Dir) -> Link<K, V> {
        self.root.map(|root| unsafe { extreme(root, dir) })
    }

    /// Returns every node in ascending key order.
    pub(crate) fn nodes_raw(&self) -> impl Iterator<Item = NodePtr<K, V>> + '_ {
        iter::successors(self.edge_raw(Dir::Left), |&node| unsafe {
            step(node, Dir::Right)
        })
    }

    #[inline]
    pub(crate) unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<K, V>,
        old_child: NodePtr<K, V>,
        new_child: Link<K, V>,
    ) {
        match parent {
            Some(parent) => unsafe { replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    /// Unlinks `node` (or, if it has two children, its in-order successor after trading payloads
    /// with it) and frees the unlinked node.
    ///
    /// Returns the removed entry together with the deepest node whose subtree changed shape: the
    /// rebalancing start point. Heights are not refreshed.
    ///
    /// # Safety
    ///
    /// `node` must be an element of `self`.
    pub(crate) unsafe fn remove_raw(&mut self, node: NodePtr<K, V>) -> ((K, V), Link<K, V>) {
        unsafe {
            let target = match (links(node).left(), links(node).right()) {
                (Some(_), Some(right)) => {
                    // The successor has no left child, so unlinking it is one of the simple
                    // cases. Its payload moves up into `node` first.
                    let successor = extreme(right, Dir::Left);
                    let (node_ref, successor_ref) = (links_mut(node), links_mut(successor));
                    mem::swap(&mut node_ref.key, &mut successor_ref.key);
                    mem::swap(&mut node_ref.value, &mut successor_ref.value);
                    successor
                }

                _ => node,
            };

            let parent = links(target).parent();
            let child = links(target).left().or(links(target).right());

            self.replace_child_or_set_root(parent, target, child);
            maybe_set_parent(child, parent);
            self.len -= 1;

            (Node::free(target), parent)
        }
    }

    pub(crate) fn pop_raw(&mut self, dir: Dir) -> Option<((K, V), Link<K, V>)> {
        let node = self.edge_raw(dir)?;
        Some(unsafe { self.remove_raw(node) })
    }
}

impl<K: Ord, V> SearchTree<K, V> {
    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let mut count = 0;
        let mut stack = Vec::new();

        if let Some(root) = self.root {
            assert_eq!(unsafe { links(root).parent() }, None, "root must not have a parent");
            stack.push(root);
        }

        while let Some(node) = stack.pop() {
            count += 1;

            unsafe {
                let node_ref = links(node);

                // Ensure the stored height matches the children.
                let expected = 1 + height(node_ref.left()).max(height(node_ref.right()));
                assert_eq!(node_ref.height(), expected, "stale node height");

                for dir in [Dir::Left, Dir::Right] {
                    if let Some(child) = node_ref.child(dir) {
                        // Ensure child's parent link points to this node.
                        assert_eq!(
                            links(child).parent(),
                            Some(node),
                            "child parent pointer not set"
                        );

                        // Ensure keys are ordered with respect to their parent.
                        let ordering = links(child).key.cmp(&node_ref.key);
                        match dir {
                            Dir::Left => assert_eq!(ordering, Ordering::Less),
                            Dir::Right => assert_eq!(ordering, Ordering::Greater),
                        }

                        stack.push(child);
                    }
                }
            }
        }

        assert_eq!(count, self.len, "size counter out of sync");

        // Parent-local ordering doesn't rule out a key crossing an ancestor; in-order does.
        let in_order = self
            .nodes_raw()
            .zip(self.nodes_raw().skip(1))
            .all(|(a, b)| unsafe { links(a).key < links(b).key });
        assert!(in_order, "keys out of order");
    }

    pub(crate) fn find_raw<Q>(&self, key: &Q) -> Link<K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(links(cur).key.borrow()) {
                    Ordering::Less => opt_cur = links(cur).left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = links(cur).right(),
                }
            }
        }
    }

    /// Attaches a new leaf for `key`, or overwrites the value of the existing node.
    ///
    /// Returns the created or updated node, and the replaced value if the key was present.
    /// Heights are not refreshed.
    pub(crate) fn insert_raw(&mut self, key: K, value: V) -> (NodePtr<K, V>, Option<V>) {
        let Some(root) = self.root else {
            // Tree is empty. The new node becomes the root.
            let node = Node::alloc(key, value, None);
            self.root = Some(node);
            self.len += 1;
            return (node, None);
        };

        let mut parent = root;

        // Descend the tree, looking for a free slot.
        loop {
            let dir = match key.cmp(unsafe { &links(parent).key }) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => {
                    let old = mem::replace(unsafe { &mut links_mut(parent).value }, value);
                    return (parent, Some(old));
                }
                Ordering::Greater => Dir::Right,
            };

            match unsafe { links(parent).child(dir) } {
                Some(child) => parent = child,

                None => {
                    let node = Node::alloc(key, value, Some(parent));
                    unsafe { links_mut(parent).set_child(dir, Some(node)) };
                    self.len += 1;
                    return (node, None);
                }
            }
        }
    }

    /// Inserts a key-value pair into the tree.
    ///
    /// If the key was already present, its value is replaced and the old value is returned; the
    /// shape of the tree does not change.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (node, old) = self.insert_raw(key, value);

        if old.is_none() {
            unsafe { fix_heights_upward(links(node).parent()) };
        }

        old
    }

    /// Returns a reference to the value associated with `key`.
    pub fn get<Q>(&self, key: &Q) -> Result<&V, Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.find_raw(key).ok_or(Error::NotFound)?;
        Ok(unsafe { &links(node).value })
    }

    /// Returns a mutable reference to the value associated with `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Result<&mut V, Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.find_raw(key).ok_or(Error::NotFound)?;
        Ok(unsafe { &mut links_mut(node).value })
    }

    /// Returns `true` if the tree contains a value associated with `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_raw(key).is_some()
    }

    /// Removes `key` from the tree, returning its value.
    ///
    /// Fails with [`Error::NotFound`] if the key is absent, leaving the tree unchanged.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<V, Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.find_raw(key).ok_or(Error::NotFound)?;

        unsafe {
            let ((_, value), start) = self.remove_raw(node);
            fix_heights_upward(start);
            Ok(value)
        }
    }

    /// Performs a left rotation at the node holding `key`, lifting its right child into its place.
    ///
    /// Heights of the rotated nodes and all their ancestors are refreshed.
    pub fn rotate_left_at<Q>(&mut self, key: &Q) -> Result<(), Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.rotate_at(key, Dir::Left)
    }

    /// Performs a right rotation at the node holding `key`, lifting its left child into its place.
    ///
    /// Heights of the rotated nodes and all their ancestors are refreshed.
    pub fn rotate_right_at<Q>(&mut self, key: &Q) -> Result<(), Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.rotate_at(key, Dir::Right)
    }

    fn rotate_at<Q>(&mut self, key: &Q, dir: Dir) -> Result<(), Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.find_raw(key).ok_or(Error::NotFound)?;

        unsafe {
            if links(node).child(!dir).is_none() {
                return Err(Error::InvalidOperation(match dir {
                    Dir::Left => "left rotation requires a right child",
                    Dir::Right => "right rotation requires a left child",
                }));
            }

            let top = match dir {
                Dir::Left => balance::rotate_left(node),
                Dir::Right => balance::rotate_right(node),
            };

            let parent = links(top).parent();
            if parent.is_none() {
                self.root = Some(top);
            }

            fix_heights_upward(parent);
        }

        Ok(())
    }
}

impl<K, V> Drop for SearchTree<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V> Default for SearchTree<K, V> {
    fn default() -> Self {
        SearchTree::new()
    }
}

impl<K: Clone, V: Clone> Clone for SearchTree<K, V> {
    fn clone(&self) -> Self {
        let mut tree = SearchTree::new();

        let Some(root) = self.root else {
            return tree;
        };

        // (source node, parent in the copy, slot below that parent)
        let mut stack = Vec::new();
        stack.push((root, None, Dir::Left));

        while let Some((src, parent, dir)) = stack.pop() {
            unsafe {
                let src_ref = links(src);
                let copy = Node::alloc(src_ref.key.clone(), src_ref.value.clone(), parent);
                links_mut(copy).set_height(src_ref.height());

                tree.len += 1;
                match parent {
                    Some(parent) => {
                        links_mut(parent).set_child(dir, Some(copy));
                    }
                    None => tree.root = Some(copy),
                }

                for dir in [Dir::Left, Dir::Right] {
                    if let Some(child) = src_ref.child(dir) {
                        stack.push((child, Some(copy), dir));
                    }
                }
            }
        }

        tree
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for SearchTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for SearchTree<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq> Eq for SearchTree<K, V> {}

impl<K: Ord, V> FromIterator<(K, V)> for SearchTree<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = SearchTree::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord, V> Extend<(K, V)> for SearchTree<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a SearchTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> IntoIterator for SearchTree<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::prelude::v1::*;

    use super::*;

    fn build(keys: &[u32]) -> SearchTree<u32, u32> {
        let tree: SearchTree<u32, u32> = keys.iter().map(|&k| (k, k * 10)).collect();
        tree.assert_invariants();
        tree
    }

    // Follows `path` from the root and returns the key found there.
    fn key_at(tree: &SearchTree<u32, u32>, path: &[Dir]) -> Option<u32> {
        let mut cur = tree.root?;
        for &dir in path {
            cur = unsafe { links(cur).child(dir)? };
        }
        Some(unsafe { links(cur).key })
    }

    #[test]
    fn insert_keeps_search_order() {
        let tree = build(&[6, 4, 8, 7, 10, 9, 11]);

        assert_eq!(tree.len(), 7);
        assert_eq!(key_at(&tree, &[]), Some(6));
        assert_eq!(key_at(&tree, &[Dir::Right, Dir::Right, Dir::Left]), Some(9));
        assert_eq!(tree.height(), 4);
        assert_eq!(
            tree.keys().copied().collect::<Vec<_>>(),
            [4, 6, 7, 8, 9, 10, 11]
        );
    }

    #[test]
    fn duplicate_insert_replaces_value() {
        let mut tree = build(&[2, 1, 3]);

        assert_eq!(tree.insert(3, 99), Some(30));
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.get(&3), Ok(&99));
        tree.assert_invariants();
    }

    #[test]
    fn rotate_left_at_root() {
        let mut tree = build(&[6, 4, 8, 7, 10, 9, 11]);

        tree.rotate_left_at(&6).unwrap();
        tree.assert_invariants();

        assert_eq!(key_at(&tree, &[]), Some(8));
        assert_eq!(key_at(&tree, &[Dir::Left]), Some(6));
        assert_eq!(key_at(&tree, &[Dir::Left, Dir::Right]), Some(7));
        assert_eq!(key_at(&tree, &[Dir::Left, Dir::Left]), Some(4));
        assert_eq!(key_at(&tree, &[Dir::Right]), Some(10));
    }

    #[test]
    fn rotate_right_at_root() {
        let mut tree = build(&[6, 4, 7, 2, 5, 1, 3]);

        tree.rotate_right_at(&6).unwrap();
        tree.assert_invariants();

        assert_eq!(key_at(&tree, &[]), Some(4));
        assert_eq!(key_at(&tree, &[Dir::Right]), Some(6));
        assert_eq!(key_at(&tree, &[Dir::Right, Dir::Left]), Some(5));
        assert_eq!(key_at(&tree, &[Dir::Left]), Some(2));
    }

    #[test]
    fn rotate_below_root_relinks_parent() {
        let mut tree = build(&[6, 4, 8, 7, 10, 9, 11]);

        tree.rotate_left_at(&8).unwrap();
        tree.assert_invariants();

        assert_eq!(key_at(&tree, &[]), Some(6));
        assert_eq!(key_at(&tree, &[Dir::Right]), Some(10));
        assert_eq!(key_at(&tree, &[Dir::Right, Dir::Left]), Some(8));
        assert_eq!(key_at(&tree, &[Dir::Right, Dir::Left, Dir::Right]), Some(9));
    }

    #[test]
    fn rotate_without_pivot_fails() {
        let mut tree = build(&[2, 1]);

        assert!(matches!(
            tree.rotate_left_at(&2),
            Err(Error::InvalidOperation(_))
        ));
        assert_eq!(tree.rotate_right_at(&5), Err(Error::NotFound));
        assert_eq!(key_at(&tree, &[]), Some(2));
        tree.assert_invariants();
    }

    #[test]
    fn remove_leaf_unary_and_binary() {
        let mut tree = build(&[5, 3, 8, 1, 4, 7, 9, 6]);

        // Leaf.
        assert_eq!(tree.remove(&1), Ok(10));
        tree.assert_invariants();

        // One child.
        assert_eq!(tree.remove(&7), Ok(70));
        tree.assert_invariants();
        assert_eq!(key_at(&tree, &[Dir::Right, Dir::Left]), Some(6));

        // Two children: the successor's payload moves into the root slot.
        assert_eq!(tree.remove(&5), Ok(50));
        tree.assert_invariants();
        assert_eq!(key_at(&tree, &[]), Some(6));

        assert_eq!(tree.keys().copied().collect::<Vec<_>>(), [3, 4, 6, 8, 9]);
    }

    #[test]
    fn remove_root_until_empty() {
        let mut tree = build(&[2, 1, 3]);

        for _ in 0..3 {
            let root = key_at(&tree, &[]).unwrap();
            tree.remove(&root).unwrap();
            tree.assert_invariants();
        }

        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
    }

    #[test]
    fn empty_tree() {
        let mut tree: SearchTree<u32, u32> = SearchTree::new();

        assert_eq!(tree.get(&1), Err(Error::NotFound));
        assert_eq!(tree.remove(&1), Err(Error::NotFound));
        assert_eq!(tree.iter().next(), None);
        assert_eq!(tree.pop_first(), None);
        tree.assert_invariants();
    }

    #[test]
    fn failed_remove_leaves_tree_unchanged() {
        let mut tree = build(&[5, 3, 8]);
        let before = tree.clone();

        assert_eq!(tree.remove(&4), Err(Error::NotFound));
        assert_eq!(tree, before);
        assert_eq!(key_at(&tree, &[]), Some(5));
        tree.assert_invariants();
    }

    #[test]
    fn clone_is_deep() {
        let tree = build(&[5, 3, 8, 1]);
        let mut copy = tree.clone();
        copy.assert_invariants();

        copy.insert(2, 0);
        *copy.get_mut(&5).unwrap() = 0;

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.get(&5), Ok(&50));
        assert!(!tree.contains_key(&2));
        assert_eq!(key_at(&copy, &[Dir::Left, Dir::Left, Dir::Right]), Some(2));
    }

    #[test]
    fn degenerate_chain_drops() {
        let mut tree: SearchTree<u32, ()> = (0..4_000).map(|k| (k, ())).collect();
        assert_eq!(tree.height(), 4_000);

        let copy = tree.clone();
        assert_eq!(copy.len(), 4_000);

        assert_eq!(tree.pop_first(), Some((0, ())));
        assert_eq!(tree.pop_last(), Some((3_999, ())));
        assert_eq!(tree.height(), 3_998);
    }
}
