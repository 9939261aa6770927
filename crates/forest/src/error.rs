use thiserror::Error;
use uuid::Uuid;

use crate::build::Orphan;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForestError {
    #[error("duplicate person id {0}")]
    DuplicateId(Uuid),
    #[error("parent references form a cycle through {} record(s)", .0.len())]
    Cycle(Vec<Uuid>),
    #[error("{} record(s) reference a parent that does not exist", .0.len())]
    Orphaned(Vec<Orphan>),
}
