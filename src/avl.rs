use core::{borrow::Borrow, fmt};

use tracing::{debug, trace};

use crate::{
    balance::{self, Restructure},
    iter::{IntoIter, Iter},
    node::{links, Link},
    Dir, Error, SearchTree,
};

/// An ordered map based on an [AVL tree].
///
/// Every mutation is carried out structurally by the underlying [`SearchTree`] and then followed
/// by a bottom-up walk that refreshes node heights and rotates wherever a node's balance factor
/// reaches ±2. Lookups, insertions and removals complete in _O(log(n))_ time.
///
/// [AVL tree]: https://en.wikipedia.org/wiki/AVL_tree
pub struct AvlTree<K, V> {
    tree: SearchTree<K, V>,
}

impl<K, V> AvlTree<K, V> {
    /// Creates a new, empty `AvlTree`.
    pub const fn new() -> Self {
        Self {
            tree: SearchTree::new(),
        }
    }

    /// Returns `true` if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of elements in the map.
    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns the height of the tree: 0 when empty, 1 for a single node.
    ///
    /// An AVL tree with `n` nodes is never taller than `1.4405 * log2(n + 2)`.
    pub fn height(&self) -> u32 {
        self.tree.height()
    }

    /// Returns a read-only view of the underlying search tree.
    pub fn as_search_tree(&self) -> &SearchTree<K, V> {
        &self.tree
    }

    /// Returns an iterator over the entries of the map, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.tree.iter()
    }

    /// Returns an iterator over the keys of the map, in ascending order.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator + '_ {
        self.tree.keys()
    }

    /// Returns an iterator over the values of the map, in ascending key order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator + '_ {
        self.tree.values()
    }

    /// Returns the first key-value pair in the map.
    ///
    /// The returned key is the minimum key in the map.
    #[inline]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree.first_key_value()
    }

    /// Returns the last key-value pair in the map.
    ///
    /// The returned key is the maximum key in the map.
    #[inline]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree.last_key_value()
    }

    /// Removes and returns the first key-value pair in the map.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let (entry, start) = self.tree.pop_raw(Dir::Left)?;
        self.retrace(start);
        Some(entry)
    }

    /// Removes and returns the last key-value pair in the map.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let (entry, start) = self.tree.pop_raw(Dir::Right)?;
        self.retrace(start);
        Some(entry)
    }

    /// Clears the map, removing all elements.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    // Walks from `start` up to the root, rebalancing every node on the way, and records the final
    // subtree root as the tree root.
    //
    // Returns the number of restructurings (single or double rotations) performed.
    fn retrace(&mut self, start: Link<K, V>) -> usize {
        let mut restructures = 0;
        let mut opt_cur = start;

        while let Some(cur) = opt_cur {
            let (top, restructure) = unsafe { balance::rebalance(cur) };

            if restructure != Restructure::None {
                restructures += 1;
                trace!(?restructure, "restructured during retrace");
            }

            match unsafe { links(top).parent() } {
                Some(parent) => opt_cur = Some(parent),
                None => {
                    self.tree.root = Some(top);
                    opt_cur = None;
                }
            }
        }

        restructures
    }
}

impl<K: Ord, V> AvlTree<K, V> {
    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        self.tree.assert_invariants();

        // Ensure every node is balanced.
        for node in self.tree.nodes_raw() {
            let factor = unsafe { balance::balance_factor(node) };
            assert!((-1..=1).contains(&factor), "unbalanced node: {factor}");
        }
    }

    // Inserts and rebalances, returning the replaced value and the number of restructurings.
    pub(crate) fn insert_counted(&mut self, key: K, value: V) -> (Option<V>, usize) {
        let (node, old) = self.tree.insert_raw(key, value);

        // A value update leaves the shape, and thus every height, unchanged.
        if old.is_some() {
            return (old, 0);
        }

        let restructures = self.retrace(Some(node));
        debug_assert!(
            restructures <= 1,
            "insertion restructured {restructures} times"
        );

        (None, restructures)
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the key was already present, its value is replaced and the old value is returned.
    ///
    /// This operation completes in _O(log(n))_ time.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.insert_counted(key, value).0
    }

    /// Returns a reference to the value associated with `key`.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Result<&V, Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get(key)
    }

    /// Returns a mutable reference to the value associated with `key`.
    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Result<&mut V, Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get_mut(key)
    }

    /// Returns `true` if the map contains a value associated with `key`.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains_key(key)
    }

    /// Removes the value associated with `key` from the map.
    ///
    /// Fails with [`Error::NotFound`] if the key is absent, leaving the map unchanged. Unlike
    /// insertion, a removal may rotate at every level on the way back to the root.
    ///
    /// This operation completes in _O(log(n))_ time.
    #[inline]
    pub fn remove<Q>(&mut self, key: &Q) -> Result<V, Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_counted(key).map(|(value, _)| value)
    }

    // Removes and rebalances, returning the value and the number of restructurings.
    pub(crate) fn remove_counted<Q>(&mut self, key: &Q) -> Result<(V, usize), Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.tree.find_raw(key).ok_or(Error::NotFound)?;
        let ((_, value), start) = unsafe { self.tree.remove_raw(node) };
        Ok((value, self.retrace(start)))
    }
}

impl<K, V> Default for AvlTree<K, V> {
    fn default() -> Self {
        AvlTree::new()
    }
}

impl<K: Clone, V: Clone> Clone for AvlTree<K, V> {
    fn clone(&self) -> Self {
        AvlTree {
            tree: self.tree.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for AvlTree<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree
    }
}

impl<K: Eq, V: Eq> Eq for AvlTree<K, V> {}

impl<K: Ord, V> FromIterator<(K, V)> for AvlTree<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = AvlTree::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord, V> Extend<(K, V)> for AvlTree<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

/// Rebuilds a plain search tree as a balanced one.
impl<K: Ord, V> From<SearchTree<K, V>> for AvlTree<K, V> {
    fn from(tree: SearchTree<K, V>) -> Self {
        debug!(
            len = tree.len(),
            height = tree.height(),
            "rebuilding search tree as AVL tree"
        );

        tree.into_iter().collect()
    }
}

impl<'a, K, V> IntoIterator for &'a AvlTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> IntoIterator for AvlTree<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.tree.into_iter()
    }
}
