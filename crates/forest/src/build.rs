use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::ForestError,
    node::{Forest, Record, TreeNode},
};

/// What to do with records whose `parent_id` does not resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildPolicy {
    /// Place them at the root level and report them as orphans.
    #[default]
    AdoptOrphansAsRoots,
    /// Fail with [`ForestError::Orphaned`].
    RejectOrphans,
}

/// A record whose parent reference could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orphan {
    pub id: Uuid,
    pub missing_parent_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct BuildOutcome<T> {
    pub forest: Forest<T>,
    pub orphans: Vec<Orphan>,
}

impl<T: Record> Forest<T> {
    /// Assembles flat records into a forest.
    ///
    /// Siblings keep their relative input order, as do roots. Duplicate ids
    /// and records whose parent chain never reaches a root (cycles) are
    /// rejected.
    pub fn build<I>(records: I, policy: BuildPolicy) -> Result<BuildOutcome<T>, ForestError>
    where
        I: IntoIterator<Item = T>,
    {
        let records: Vec<T> = records.into_iter().collect();
        let ids: Vec<Uuid> = records.iter().map(Record::id).collect();

        let mut index = HashMap::with_capacity(ids.len());
        for (pos, id) in ids.iter().enumerate() {
            if index.insert(*id, pos).is_some() {
                return Err(ForestError::DuplicateId(*id));
            }
        }

        let mut roots = Vec::new();
        let mut orphans = Vec::new();
        let mut children_of: HashMap<Uuid, Vec<usize>> = HashMap::new();
        for (pos, record) in records.iter().enumerate() {
            match record.parent_id() {
                Some(parent_id) if index.contains_key(&parent_id) => {
                    children_of.entry(parent_id).or_default().push(pos);
                }
                Some(parent_id) => {
                    orphans.push(Orphan {
                        id: ids[pos],
                        missing_parent_id: parent_id,
                    });
                    roots.push(pos);
                }
                None => roots.push(pos),
            }
        }

        if policy == BuildPolicy::RejectOrphans && !orphans.is_empty() {
            return Err(ForestError::Orphaned(orphans));
        }

        let mut slots: Vec<Option<T>> = records.into_iter().map(Some).collect();
        let mut assembler = Assembler {
            ids: &ids,
            children_of: &children_of,
            slots: &mut slots,
        };
        let root_nodes: Vec<_> = roots
            .iter()
            .filter_map(|&pos| assembler.assemble(pos))
            .collect();

        let unreachable: Vec<Uuid> = slots
            .iter()
            .zip(&ids)
            .filter_map(|(slot, id)| slot.as_ref().map(|_| *id))
            .collect();
        if !unreachable.is_empty() {
            return Err(ForestError::Cycle(unreachable));
        }

        Ok(BuildOutcome {
            forest: Forest::from_roots(root_nodes),
            orphans,
        })
    }

    /// Builds with [`BuildPolicy::AdoptOrphansAsRoots`], logging any orphans.
    pub fn from_records<I>(records: I) -> Result<Self, ForestError>
    where
        I: IntoIterator<Item = T>,
    {
        let outcome = Self::build(records, BuildPolicy::AdoptOrphansAsRoots)?;
        for orphan in &outcome.orphans {
            warn!(
                id = %orphan.id,
                missing_parent_id = %orphan.missing_parent_id,
                "Parent not found, placing record at the root level"
            );
        }
        Ok(outcome.forest)
    }
}

struct Assembler<'a, T> {
    ids: &'a [Uuid],
    children_of: &'a HashMap<Uuid, Vec<usize>>,
    slots: &'a mut [Option<T>],
}

impl<T> Assembler<'_, T> {
    /// Moves the record at `pos` and everything below it into a node.
    /// Each slot is taken once, so records left behind were never reached.
    fn assemble(&mut self, pos: usize) -> Option<Arc<TreeNode<T>>> {
        let record = self.slots.get_mut(pos)?.take()?;
        let children_of = self.children_of;
        let children = match children_of.get(&self.ids[pos]) {
            Some(child_positions) => child_positions
                .iter()
                .filter_map(|&child| self.assemble(child))
                .collect(),
            None => Vec::new(),
        };
        Some(Arc::new(TreeNode { record, children }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Row, chain, id, row};

    #[test]
    fn test_chain_builds_single_root() {
        let forest = Forest::from_records(chain()).unwrap();
        assert_eq!(forest.roots().len(), 1);
        let a = &forest.roots()[0];
        assert_eq!(a.record.name, "A");
        assert_eq!(a.children[0].record.name, "B");
        assert_eq!(a.children[0].children[0].record.name, "C");
        assert_eq!(forest.count(), 3);
    }

    #[test]
    fn test_child_listed_before_parent_still_attaches() {
        let forest = Forest::from_records(vec![
            row(3, Some(2), "C"),
            row(2, Some(1), "B"),
            row(1, None, "A"),
        ])
        .unwrap();
        assert_eq!(forest.roots().len(), 1);
        assert_eq!(forest.find_parent(id(3)).map(|n| n.record.id), Some(id(2)));
    }

    #[test]
    fn test_sibling_and_root_order_follow_input() {
        let forest = Forest::from_records(vec![
            row(10, None, "first root"),
            row(11, Some(10), "older"),
            row(20, None, "second root"),
            row(12, Some(10), "younger"),
        ])
        .unwrap();
        let roots: Vec<_> = forest.roots().iter().map(|n| n.record.name).collect();
        assert_eq!(roots, vec!["first root", "second root"]);
        let children: Vec<_> = forest.roots()[0]
            .children
            .iter()
            .map(|n| n.record.name)
            .collect();
        assert_eq!(children, vec!["older", "younger"]);
    }

    #[test]
    fn test_missing_parent_becomes_root_and_is_reported() {
        let outcome = Forest::build(
            vec![row(1, None, "A"), row(2, Some(42), "lost")],
            BuildPolicy::AdoptOrphansAsRoots,
        )
        .unwrap();
        assert_eq!(outcome.forest.roots().len(), 2);
        assert_eq!(outcome.forest.count(), 2);
        assert_eq!(
            outcome.orphans,
            vec![Orphan {
                id: id(2),
                missing_parent_id: id(42)
            }]
        );
    }

    #[test]
    fn test_strict_policy_rejects_orphans() {
        let err = Forest::build(vec![row(2, Some(42), "lost")], BuildPolicy::RejectOrphans)
            .unwrap_err();
        assert!(matches!(err, ForestError::Orphaned(ref o) if o.len() == 1));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let err = Forest::from_records(vec![
            row(1, None, "A"),
            row(2, Some(3), "B"),
            row(3, Some(2), "C"),
        ])
        .unwrap_err();
        match err {
            ForestError::Cycle(mut ids) => {
                ids.sort();
                assert_eq!(ids, vec![id(2), id(3)]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let err = Forest::from_records(vec![row(1, Some(1), "A")]).unwrap_err();
        assert_eq!(err, ForestError::Cycle(vec![id(1)]));
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let err = Forest::from_records(vec![row(1, None, "A"), row(1, None, "A again")])
            .unwrap_err();
        assert_eq!(err, ForestError::DuplicateId(id(1)));
    }

    #[test]
    fn test_every_node_sits_under_its_parent() {
        let records: Vec<Row> = vec![
            row(1, None, "A"),
            row(2, Some(1), "B"),
            row(3, Some(1), "C"),
            row(4, Some(3), "D"),
            row(5, Some(4), "E"),
            row(6, None, "F"),
            row(7, Some(6), "G"),
        ];
        let forest = Forest::from_records(records.clone()).unwrap();
        assert_eq!(forest.count(), records.len());
        for record in &records {
            let parent = forest.find_parent(record.id).map(|n| n.record.id);
            assert_eq!(parent, record.parent_id);
        }
    }
}
