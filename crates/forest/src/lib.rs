//! In-memory family forest: assembly from flat records, lookup, and
//! persistent (structurally shared) mutation.

pub mod build;
pub mod descendants;
pub mod error;
pub mod mutate;
pub mod node;
pub mod view;

pub use build::{BuildOutcome, BuildPolicy, Orphan};
pub use descendants::{cascade_ids, collect_descendants};
pub use error::ForestError;
pub use node::{Forest, PreOrder, Record, TreeNode};
pub use view::{ExpansionState, PopoverState};
