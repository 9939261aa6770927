//! Presentation state for a tree view. Nothing here is persisted.

use std::collections::HashSet;

use uuid::Uuid;

use crate::node::{Forest, Record};

/// Which nodes are expanded, plus the most recently expanded one (used to
/// highlight its children).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    expanded: HashSet<Uuid>,
    focused: Option<Uuid>,
}

impl ExpansionState {
    /// Initial state: only the first root is expanded and focused.
    pub fn for_forest<T: Record>(forest: &Forest<T>) -> Self {
        match forest.roots().first() {
            Some(root) => {
                let id = root.record.id();
                Self {
                    expanded: HashSet::from([id]),
                    focused: Some(id),
                }
            }
            None => Self::default(),
        }
    }

    pub fn is_expanded(&self, id: Uuid) -> bool {
        self.expanded.contains(&id)
    }

    pub fn focused(&self) -> Option<Uuid> {
        self.focused
    }

    pub fn expanded_count(&self) -> usize {
        self.expanded.len()
    }

    /// Flips `id` between expanded and collapsed and returns the new state.
    ///
    /// Expanding focuses the node. Collapsing the focused node hands focus to
    /// its parent; a collapsed root keeps focus since it has no parent.
    pub fn toggle<T: Record>(&mut self, forest: &Forest<T>, id: Uuid) -> bool {
        if self.expanded.remove(&id) {
            if self.focused == Some(id) {
                if let Some(parent) = forest.find_parent(id) {
                    self.focused = Some(parent.record.id());
                }
            }
            false
        } else {
            self.expanded.insert(id);
            self.focused = Some(id);
            true
        }
    }

    /// True when `id` is a direct child of the focused node.
    pub fn is_child_of_focused<T: Record>(&self, forest: &Forest<T>, id: Uuid) -> bool {
        self.focused
            .and_then(|focused| forest.find(focused))
            .is_some_and(|node| node.children.iter().any(|c| c.record.id() == id))
    }

    /// Re-aligns the state after the forest was reloaded: ids that no longer
    /// exist are dropped, and an empty state falls back to the initial one.
    pub fn sync<T: Record>(&mut self, forest: &Forest<T>) {
        self.expanded.retain(|id| forest.contains(*id));
        if self.focused.is_some_and(|id| !forest.contains(id)) {
            self.focused = None;
        }
        if self.expanded.is_empty() {
            *self = Self::for_forest(forest);
        }
    }
}

/// The single popover (per-person action menu) that may be open at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopoverState {
    open: Option<Uuid>,
}

impl PopoverState {
    /// Opens the popover for `id`, closing whichever one was open.
    pub fn open(&mut self, id: Uuid) {
        self.open = Some(id);
    }

    pub fn close(&mut self) {
        self.open = None;
    }

    pub fn toggle(&mut self, id: Uuid) {
        if self.is_open(id) {
            self.close();
        } else {
            self.open(id);
        }
    }

    pub fn is_open(&self, id: Uuid) -> bool {
        self.open == Some(id)
    }

    pub fn current(&self) -> Option<Uuid> {
        self.open
    }
}
