use core::{iter::FusedIterator, marker::PhantomData};

use crate::{
    node::{links, step, Link, Node},
    Dir, SearchTree,
};

/// An iterator over the entries of a tree, in ascending key order.
///
/// Created by [`SearchTree::iter`] and [`AvlTree::iter`](crate::AvlTree::iter). Each step follows
/// child and parent links from the previously yielded node, so the iterator holds no stack.
pub struct Iter<'tree, K, V> {
    front: Link<K, V>,
    back: Link<K, V>,
    len: usize,
    _marker: PhantomData<&'tree Node<K, V>>,
}

// SAFETY: `Iter` only hands out shared references into the tree it borrows.
unsafe impl<K: Sync, V: Sync> Send for Iter<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for Iter<'_, K, V> {}

impl<'tree, K, V> Iter<'tree, K, V> {
    pub(crate) fn new(tree: &'tree SearchTree<K, V>) -> Self {
        Iter {
            front: tree.edge_raw(Dir::Left),
            back: tree.edge_raw(Dir::Right),
            len: tree.len(),
            _marker: PhantomData,
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            front: self.front,
            back: self.back,
            len: self.len,
            _marker: PhantomData,
        }
    }
}

impl<'tree, K, V> Iterator for Iter<'tree, K, V> {
    type Item = (&'tree K, &'tree V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let cur = self.front?;
        self.len -= 1;

        unsafe {
            self.front = step(cur, Dir::Right);
            let node = links(cur);
            Some((&node.key, &node.value))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let cur = self.back?;
        self.len -= 1;

        unsafe {
            self.back = step(cur, Dir::Left);
            let node = links(cur);
            Some((&node.key, &node.value))
        }
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// An owning iterator over the entries of a tree, in ascending key order.
pub struct IntoIter<K, V> {
    tree: SearchTree<K, V>,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(tree: SearchTree<K, V>) -> Self {
        IntoIter { tree }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        // The tree is being torn down, so heights are left stale.
        self.tree.pop_raw(Dir::Left).map(|(entry, _)| entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.tree.len(), Some(self.tree.len()))
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.tree.pop_raw(Dir::Right).map(|(entry, _)| entry)
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

impl<K, V> FusedIterator for IntoIter<K, V> {}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::prelude::v1::*;

    use crate::SearchTree;

    #[test]
    fn iter_both_ends_meet() {
        let tree: SearchTree<u32, char> = [(4, 'd'), (2, 'b'), (5, 'e'), (1, 'a'), (3, 'c')]
            .into_iter()
            .collect();

        let mut iter = tree.iter();
        assert_eq!(iter.len(), 5);
        assert_eq!(iter.next(), Some((&1, &'a')));
        assert_eq!(iter.next_back(), Some((&5, &'e')));
        assert_eq!(iter.next(), Some((&2, &'b')));
        assert_eq!(iter.next_back(), Some((&4, &'d')));
        assert_eq!(iter.len(), 1);
        assert_eq!(iter.next(), Some((&3, &'c')));
        assert_eq!(iter.next_back(), None);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn iter_is_restartable() {
        let tree: SearchTree<u32, ()> = [3, 1, 2].into_iter().map(|k| (k, ())).collect();

        let first: Vec<_> = tree.keys().copied().collect();
        let second: Vec<_> = tree.keys().copied().collect();
        assert_eq!(first, [1, 2, 3]);
        assert_eq!(first, second);
        assert_eq!(tree.keys().rev().copied().collect::<Vec<_>>(), [3, 2, 1]);
    }

    #[test]
    fn into_iter_drains_in_order() {
        let tree: SearchTree<String, usize> = ["pear", "apple", "fig", "kiwi"]
            .into_iter()
            .map(|s| (s.to_string(), s.len()))
            .collect();

        let mut into_iter = tree.into_iter();
        assert_eq!(into_iter.len(), 4);
        assert_eq!(into_iter.next_back(), Some(("pear".to_string(), 4)));

        let rest: Vec<_> = into_iter.collect();
        assert_eq!(
            rest,
            [
                ("apple".to_string(), 5),
                ("fig".to_string(), 3),
                ("kiwi".to_string(), 4)
            ]
        );
    }

    #[test]
    fn partially_consumed_into_iter_frees_the_rest() {
        let tree: SearchTree<u32, Box<u32>> = (0..100).map(|k| (k, Box::new(k))).collect();

        let mut into_iter = tree.into_iter();
        assert_eq!(into_iter.next().map(|(k, _)| k), Some(0));
        drop(into_iter);
    }
}
