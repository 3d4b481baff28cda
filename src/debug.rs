extern crate alloc;

use alloc::{collections::VecDeque, string::String};
use core::fmt::{self, Write};

use crate::{
    node::{links, NodePtr},
    AvlTree, Dir, SearchTree,
};

impl<K: fmt::Display, V> SearchTree<K, V> {
    /// Writes the tree to `w` in Graphviz `dot` format.
    ///
    /// Each node is labelled `key:height`; absent children are drawn as points so that left and
    /// right children stay distinguishable.
    pub fn dotgraph<W: Write>(&self, name: &str, mut w: W) -> fmt::Result {
        let root = match self.root {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item<K, V> {
            Node(NodePtr<K, V>),
            Missing(u32),
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut edges = String::new();

        while !queue.is_empty() {
            write!(w, "{{rank=same; ")?;

            for _ in 0..queue.len() {
                let node = match queue.pop_front() {
                    Some(Item::Node(node)) => unsafe { links(node) },
                    Some(Item::Missing(id)) => {
                        write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                    None => break,
                };

                let key = &node.key;
                let height = node.height();
                write!(w, "\"graph{name}-{key}\" [label=\"{key}:{height}\"]; ")?;

                for dir in [Dir::Left, Dir::Right] {
                    match node.child(dir) {
                        Some(child) => {
                            let child_key = unsafe { &links(child).key };
                            queue.push_back(Item::Node(child));
                            writeln!(edges, "\"graph{name}-{key}\" -> \"graph{name}-{child_key}\";")?;
                        }
                        None => {
                            queue.push_back(Item::Missing(missing));
                            writeln!(
                                edges,
                                "\"graph{name}-{key}\" -> \"graph{name}-missing{missing}\";"
                            )?;
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&edges)?;

        w.write_str(" }\n}")
    }
}

impl<K: fmt::Display, V> AvlTree<K, V> {
    /// Writes the tree to `w` in Graphviz `dot` format.
    ///
    /// See [`SearchTree::dotgraph`].
    pub fn dotgraph<W: Write>(&self, name: &str, w: W) -> fmt::Result {
        self.as_search_tree().dotgraph(name, w)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::prelude::v1::*;

    use crate::{AvlTree, SearchTree};

    #[test]
    fn empty_graph() {
        let tree: SearchTree<u32, ()> = SearchTree::new();
        let mut out = String::new();
        tree.dotgraph("empty", &mut out).unwrap();
        assert_eq!(out, "digraph \"graph-empty\" {}");
    }

    #[test]
    fn labels_and_edges() {
        let tree: AvlTree<u32, ()> = [1, 2, 3].into_iter().map(|k| (k, ())).collect();
        let mut out = String::new();
        tree.dotgraph("t", &mut out).unwrap();

        assert!(out.starts_with("digraph \"graph-t\" {"));
        assert!(out.contains("\"grapht-2\" [label=\"2:2\"];"));
        assert!(out.contains("\"grapht-1\" [label=\"1:1\"];"));
        assert!(out.contains("\"grapht-2\" -> \"grapht-1\";"));
        assert!(out.contains("\"grapht-2\" -> \"grapht-3\";"));
        assert!(out.contains("\"grapht-3\" -> \"grapht-missing3\";"));
        assert!(out.ends_with(" }\n}"));
    }
}
