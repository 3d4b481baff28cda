extern crate alloc;

use alloc::boxed::Box;
use core::{mem, ptr::NonNull};

use crate::Dir;

pub(crate) type NodePtr<K, V> = NonNull<Node<K, V>>;
pub(crate) type Link<K, V> = Option<NodePtr<K, V>>;

/// A heap-allocated tree node.
///
/// Child links are owning edges: a node is reachable from exactly one child slot (or the tree
/// root). The parent link is a back-reference only and never implies ownership.
pub(crate) struct Node<K, V> {
    parent: Link<K, V>,
    children: [Link<K, V>; 2],
    height: u32,
    pub(crate) key: K,
    pub(crate) value: V,
}

impl<K, V> Node<K, V> {
    /// Allocates a new leaf node below `parent`.
    ///
    /// The parent's child slot is not updated.
    pub(crate) fn alloc(key: K, value: V, parent: Link<K, V>) -> NodePtr<K, V> {
        let node = Box::new(Node {
            parent,
            children: [None; 2],
            height: 1,
            key,
            value,
        });

        NonNull::from(Box::leak(node))
    }

    /// Frees a node, returning its key and value.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`Node::alloc`], must not have been freed already, and
    /// must no longer be reachable from any tree.
    pub(crate) unsafe fn free(ptr: NodePtr<K, V>) -> (K, V) {
        let node = unsafe { Box::from_raw(ptr.as_ptr()) };
        (node.key, node.value)
    }

    #[inline]
    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub(crate) fn parent(&self) -> Link<K, V> {
        self.parent
    }

    #[inline]
    pub(crate) fn child(&self, dir: Dir) -> Link<K, V> {
        self.children[dir as usize]
    }

    #[inline]
    pub(crate) fn left(&self) -> Link<K, V> {
        self.child(Dir::Left)
    }

    #[inline]
    pub(crate) fn right(&self) -> Link<K, V> {
        self.child(Dir::Right)
    }

    #[inline]
    pub(crate) fn set_parent(&mut self, parent: Link<K, V>) -> Link<K, V> {
        mem::replace(&mut self.parent, parent)
    }

    #[inline]
    pub(crate) fn set_child(&mut self, dir: Dir, child: Link<K, V>) -> Link<K, V> {
        mem::replace(&mut self.children[dir as usize], child)
    }

    #[inline]
    pub(crate) fn set_height(&mut self, height: u32) {
        self.height = height;
    }
}

/// Borrows the node behind `ptr`.
///
/// # Safety
///
/// `ptr` must point to a live node, and no mutable reference to that node may exist for `'a`.
#[inline]
pub(crate) unsafe fn links<'a, K, V>(ptr: NodePtr<K, V>) -> &'a Node<K, V> {
    unsafe { &*ptr.as_ptr() }
}

/// Mutably borrows the node behind `ptr`.
///
/// # Safety
///
/// `ptr` must point to a live node, and no other reference to that node may exist for `'a`.
#[inline]
pub(crate) unsafe fn links_mut<'a, K, V>(ptr: NodePtr<K, V>) -> &'a mut Node<K, V> {
    unsafe { &mut *ptr.as_ptr() }
}

/// Sets the parent link of `opt_node`, if present.
#[inline]
pub(crate) unsafe fn maybe_set_parent<K, V>(opt_node: Link<K, V>, parent: Link<K, V>) {
    let Some(node) = opt_node else {
        return;
    };

    unsafe { links_mut(node).set_parent(parent) };
}

/// Returns which child slot of `parent` holds `child`.
#[inline]
pub(crate) unsafe fn which_child<K, V>(parent: NodePtr<K, V>, child: NodePtr<K, V>) -> Dir {
    if unsafe { links(parent).left() } == Some(child) {
        Dir::Left
    } else {
        Dir::Right
    }
}

// Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
//
// `new_child`'s parent pointer is not updated.
//
// # Safety
//
// The caller must ensure that `old_child` is a child node of `parent`.
pub(crate) unsafe fn replace_child<K, V>(
    parent: NodePtr<K, V>,
    old_child: NodePtr<K, V>,
    new_child: Link<K, V>,
) {
    unsafe {
        let dir = which_child(parent, old_child);
        debug_assert_eq!(
            links(parent).child(dir),
            Some(old_child),
            "`old_child` must be a child of `parent`"
        );

        links_mut(parent).set_child(dir, new_child);
    }
}

/// Returns the outermost node in direction `dir` of the subtree rooted at `root`.
///
/// With `Dir::Left` this is the subtree minimum, with `Dir::Right` the maximum.
#[inline]
pub(crate) unsafe fn extreme<K, V>(root: NodePtr<K, V>, dir: Dir) -> NodePtr<K, V> {
    let mut cur = root;

    while let Some(next) = unsafe { links(cur).child(dir) } {
        cur = next;
    }

    cur
}

/// Returns the in-order neighbour of `node` in direction `dir`.
///
/// `Dir::Right` yields the successor and `Dir::Left` the predecessor. Only parent links are used
/// to climb, so no auxiliary stack is needed.
pub(crate) unsafe fn step<K, V>(node: NodePtr<K, V>, dir: Dir) -> Link<K, V> {
    unsafe {
        if let Some(child) = links(node).child(dir) {
            return Some(extreme(child, !dir));
        }

        // Climb until we arrive from the opposite side; that ancestor is next.
        let mut cur = node;
        while let Some(parent) = links(cur).parent() {
            if links(parent).child(!dir) == Some(cur) {
                return Some(parent);
            }

            cur = parent;
        }

        None
    }
}
