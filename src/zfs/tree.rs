//! Pre-order traversal of vdev trees.
//!
//! The tree is acyclic by construction (every child is owned by exactly one
//! parent), so plain structural recursion is enough. Device trees are a handful
//! of levels deep in practice.

use super::types::{DeviceTree, Vdev};

impl Vdev {
    /// Visit this node, then each child subtree in source order.
    pub fn walk<F>(&self, visitor: &mut F)
    where
        F: FnMut(&Vdev),
    {
        visitor(self);
        for child in &self.children {
            child.walk(visitor);
        }
    }

    /// Number of nodes in this subtree, including `self`
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Vdev::node_count).sum::<usize>()
    }
}

impl DeviceTree {
    /// Visit every node of the tree in pre-order. An empty tree is a no-op.
    pub fn walk<F>(&self, mut visitor: F)
    where
        F: FnMut(&Vdev),
    {
        if let Some(root) = &self.root {
            root.walk(&mut visitor);
        }
    }

    pub fn node_count(&self) -> usize {
        self.root.as_ref().map_or(0, Vdev::node_count)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}
