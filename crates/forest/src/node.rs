use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A flat record that carries its own id and, optionally, its parent's id.
pub trait Record: Clone {
    fn id(&self) -> Uuid;
    fn parent_id(&self) -> Option<Uuid>;
}

/// A record together with its ordered children.
///
/// Children are reference counted so that rewritten forests can share every
/// subtree that a mutation did not touch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode<T> {
    #[serde(flatten)]
    pub record: T,
    pub children: Vec<Arc<TreeNode<T>>>,
}

impl<T> TreeNode<T> {
    pub fn leaf(record: T) -> Self {
        Self {
            record,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Ordered sequence of independent trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Forest<T> {
    pub(crate) roots: Vec<Arc<TreeNode<T>>>,
}

impl<T> Default for Forest<T> {
    fn default() -> Self {
        Self { roots: Vec::new() }
    }
}

impl<T> Forest<T> {
    pub fn from_roots(roots: Vec<Arc<TreeNode<T>>>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[Arc<TreeNode<T>>] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Depth-first pre-order walk over every node in the forest.
    pub fn iter(&self) -> PreOrder<'_, T> {
        PreOrder {
            stack: self.roots.iter().rev().map(Arc::as_ref).collect(),
        }
    }

    /// Total number of nodes reachable from the roots.
    pub fn count(&self) -> usize {
        fn count_nodes<T>(nodes: &[Arc<TreeNode<T>>]) -> usize {
            nodes.len()
                + nodes
                    .iter()
                    .map(|node| count_nodes(&node.children))
                    .sum::<usize>()
        }
        count_nodes(&self.roots)
    }
}

impl<T: Record> Forest<T> {
    /// First node in pre-order whose id matches.
    pub fn find(&self, id: Uuid) -> Option<&TreeNode<T>> {
        find_in(&self.roots, id)
    }

    /// Direct parent of `child_id`; `None` for roots and unknown ids.
    pub fn find_parent(&self, child_id: Uuid) -> Option<&TreeNode<T>> {
        find_parent_in(&self.roots, child_id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.find(id).is_some()
    }

    /// Number of ancestors above `id` (roots are at depth 0).
    pub fn depth_of(&self, id: Uuid) -> Option<usize> {
        let mut depth = 0;
        let mut current = self.find(id)?.record.id();
        while let Some(parent) = self.find_parent(current) {
            depth += 1;
            current = parent.record.id();
        }
        Some(depth)
    }

    /// Ids of every node below `id`, in pre-order. `None` if `id` is unknown.
    pub fn descendant_ids(&self, id: Uuid) -> Option<Vec<Uuid>> {
        let node = self.find(id)?;
        let subtree = Forest {
            roots: node.children.clone(),
        };
        Some(subtree.iter().map(|n| n.record.id()).collect())
    }

    /// Flattens the forest back into records, in pre-order.
    pub fn records(&self) -> Vec<T> {
        self.iter().map(|node| node.record.clone()).collect()
    }
}

fn find_in<T: Record>(nodes: &[Arc<TreeNode<T>>], id: Uuid) -> Option<&TreeNode<T>> {
    for node in nodes {
        if node.record.id() == id {
            return Some(node);
        }
        if let Some(found) = find_in(&node.children, id) {
            return Some(found);
        }
    }
    None
}

fn find_parent_in<T: Record>(nodes: &[Arc<TreeNode<T>>], child_id: Uuid) -> Option<&TreeNode<T>> {
    for node in nodes {
        if node.children.iter().any(|child| child.record.id() == child_id) {
            return Some(node);
        }
        if let Some(found) = find_parent_in(&node.children, child_id) {
            return Some(found);
        }
    }
    None
}

pub struct PreOrder<'a, T> {
    stack: Vec<&'a TreeNode<T>>,
}

impl<'a, T> Iterator for PreOrder<'a, T> {
    type Item = &'a TreeNode<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(Arc::as_ref));
        Some(node)
    }
}
