//! Descendant collection over flat records, used for cascading deletes
//! against stores that cannot express the traversal themselves.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::node::Record;

/// Every transitive descendant of `id`, in pre-order.
///
/// Builds a parent -> children index once, so the walk is linear in the
/// number of records. Ids already visited are skipped, which keeps a cyclic
/// record set from looping.
pub fn collect_descendants<T: Record>(records: &[T], id: Uuid) -> Vec<Uuid> {
    let mut children_of: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for record in records {
        if let Some(parent_id) = record.parent_id() {
            children_of.entry(parent_id).or_default().push(record.id());
        }
    }

    let mut seen = HashSet::from([id]);
    let mut out = Vec::new();
    let mut stack: Vec<Uuid> = children_of
        .get(&id)
        .map(|children| children.iter().rev().copied().collect())
        .unwrap_or_default();

    while let Some(next) = stack.pop() {
        if !seen.insert(next) {
            continue;
        }
        out.push(next);
        if let Some(children) = children_of.get(&next) {
            stack.extend(children.iter().rev().copied());
        }
    }
    out
}

/// `id` followed by all of its descendants: the full set a cascading delete
/// must remove.
pub fn cascade_ids<T: Record>(records: &[T], id: Uuid) -> Vec<Uuid> {
    let mut ids = vec![id];
    ids.extend(collect_descendants(records, id));
    ids
}
