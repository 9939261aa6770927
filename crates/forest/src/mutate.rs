//! Persistent edits. Every operation returns a new forest and leaves the
//! receiver untouched; only the spine from a root down to the edited node is
//! rebuilt, every other subtree is shared.

use std::sync::Arc;

use uuid::Uuid;

use crate::node::{Forest, Record, TreeNode};

impl<T: Record> Forest<T> {
    /// Appends `record` under `parent_id`, or as a new root when `None`.
    /// An unknown parent leaves the forest unchanged.
    pub fn with_child(&self, parent_id: Option<Uuid>, record: T) -> Self {
        let Some(parent_id) = parent_id else {
            let mut roots = self.roots.clone();
            roots.push(Arc::new(TreeNode::leaf(record)));
            return Self { roots };
        };

        match path_to(&self.roots, parent_id) {
            Some(path) => Self {
                roots: rewrite(&self.roots, &path, |parent| {
                    let mut children = parent.children.clone();
                    children.push(Arc::new(TreeNode::leaf(record)));
                    Some(TreeNode {
                        record: parent.record.clone(),
                        children,
                    })
                }),
            },
            None => self.clone(),
        }
    }

    /// Replaces the record with the same id, keeping its existing children.
    pub fn with_updated(&self, record: T) -> Self {
        match path_to(&self.roots, record.id()) {
            Some(path) => Self {
                roots: rewrite(&self.roots, &path, |current| {
                    Some(TreeNode {
                        record,
                        children: current.children.clone(),
                    })
                }),
            },
            None => self.clone(),
        }
    }

    /// Drops the node with `id` together with its whole subtree.
    pub fn without(&self, id: Uuid) -> Self {
        match path_to(&self.roots, id) {
            Some(path) => Self {
                roots: rewrite(&self.roots, &path, |_| None),
            },
            None => self.clone(),
        }
    }
}

/// Sibling indices leading from the roots to the first node with `id`.
fn path_to<T: Record>(nodes: &[Arc<TreeNode<T>>], id: Uuid) -> Option<Vec<usize>> {
    for (idx, node) in nodes.iter().enumerate() {
        if node.record.id() == id {
            return Some(vec![idx]);
        }
        if let Some(mut path) = path_to(&node.children, id) {
            path.insert(0, idx);
            return Some(path);
        }
    }
    None
}

/// Rebuilds the nodes along `path`, replacing the addressed node with the
/// result of `edit` (or removing it when `edit` returns `None`).
fn rewrite<T: Clone>(
    nodes: &[Arc<TreeNode<T>>],
    path: &[usize],
    edit: impl FnOnce(&TreeNode<T>) -> Option<TreeNode<T>>,
) -> Vec<Arc<TreeNode<T>>> {
    let Some((&head, rest)) = path.split_first() else {
        return nodes.to_vec();
    };
    let Some(node) = nodes.get(head) else {
        return nodes.to_vec();
    };

    let mut out = nodes.to_vec();
    if rest.is_empty() {
        match edit(node) {
            Some(replacement) => out[head] = Arc::new(replacement),
            None => {
                out.remove(head);
            }
        }
    } else {
        out[head] = Arc::new(TreeNode {
            record: node.record.clone(),
            children: rewrite(&node.children, rest, edit),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Row, chain, id, row};

    fn two_branches() -> Forest<Row> {
        Forest::from_records(vec![
            row(1, None, "A"),
            row(2, Some(1), "B"),
            row(3, Some(2), "C"),
            row(4, Some(1), "D"),
            row(5, Some(4), "E"),
        ])
        .unwrap()
    }

    #[test]
    fn test_deleting_middle_node_drops_its_subtree() {
        let forest = Forest::from_records(chain()).unwrap();
        let pruned = forest.without(id(2));
        assert_eq!(pruned.count(), 1);
        assert!(pruned.roots()[0].is_leaf());
        assert!(pruned.find(id(3)).is_none());
        // original untouched
        assert_eq!(forest.count(), 3);
    }

    #[test]
    fn test_deleting_root_and_unknown_id() {
        let forest = two_branches();
        assert!(forest.without(id(1)).is_empty());
        assert_eq!(forest.without(id(99)), forest);
    }

    #[test]
    fn test_deletion_keeps_everything_else() {
        let forest = two_branches();
        let pruned = forest.without(id(4));
        let mut remaining: Vec<_> = pruned.iter().map(|n| n.record.id).collect();
        remaining.sort();
        assert_eq!(remaining, vec![id(1), id(2), id(3)]);
    }

    #[test]
    fn test_add_child_appends_last() {
        let forest = two_branches();
        let grown = forest.with_child(Some(id(1)), row(6, Some(1), "F"));
        let names: Vec<_> = grown.roots()[0]
            .children
            .iter()
            .map(|n| n.record.name)
            .collect();
        assert_eq!(names, vec!["B", "D", "F"]);
        assert_eq!(forest.count(), 5);
        assert_eq!(grown.count(), 6);
    }

    #[test]
    fn test_add_child_to_unknown_parent_is_noop() {
        let forest = two_branches();
        assert_eq!(forest.with_child(Some(id(42)), row(6, Some(42), "F")), forest);
    }

    #[test]
    fn test_add_root() {
        let forest = two_branches();
        let grown = forest.with_child(None, row(9, None, "Z"));
        assert_eq!(grown.roots().len(), 2);
        assert_eq!(grown.roots()[1].record.name, "Z");
    }

    #[test]
    fn test_update_preserves_children() {
        let forest = two_branches();
        let updated = forest.with_updated(row(2, Some(1), "B renamed"));
        let b = updated.find(id(2)).unwrap();
        assert_eq!(b.record.name, "B renamed");
        assert_eq!(b.children.len(), 1);
        assert_eq!(b.children[0].record.name, "C");
    }

    #[test]
    fn test_update_with_same_data_is_identity() {
        let forest = two_branches();
        let current = forest.find(id(4)).unwrap().record.clone();
        assert_eq!(forest.with_updated(current), forest);
    }

    #[test]
    fn test_untouched_branches_are_shared() {
        let forest = two_branches();
        let updated = forest.with_updated(row(3, Some(2), "C renamed"));
        let before = &forest.roots()[0].children[1];
        let after = &updated.roots()[0].children[1];
        assert!(Arc::ptr_eq(before, after));
        assert!(!Arc::ptr_eq(&forest.roots()[0], &updated.roots()[0]));
    }
}
