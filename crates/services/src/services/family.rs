//! Validated reads and writes of the family, on top of a [`PersonStore`].
//!
//! Writes go to the store, never to a cached forest; callers reload the
//! forest afterwards.

use std::{collections::VecDeque, sync::Arc};

use db::{
    models::person::{Person, PersonDraft, PersonValidationError},
    store::{PersonStore, StoreError},
};
use forest::{Forest, TreeNode, collect_descendants};
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use super::sample::SampleMember;

#[derive(Debug, Error)]
pub enum FamilyServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] PersonValidationError),
    #[error("person {0} not found")]
    PersonNotFound(Uuid),
    #[error("parent {0} not found")]
    ParentNotFound(Uuid),
    #[error("cannot place {id} under {parent_id}: it is the person or one of their descendants")]
    WouldCreateCycle { id: Uuid, parent_id: Uuid },
}

#[derive(Clone)]
pub struct FamilyService {
    store: Arc<dyn PersonStore>,
}

impl FamilyService {
    pub fn new(store: Arc<dyn PersonStore>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn forest(&self) -> Result<Forest<Person>, FamilyServiceError> {
        Ok(self.store.load_forest().await?)
    }

    pub async fn member_count(&self) -> Result<usize, FamilyServiceError> {
        Ok(self.forest().await?.count())
    }

    /// The person with their subtree.
    pub async fn person(&self, id: Uuid) -> Result<TreeNode<Person>, FamilyServiceError> {
        let forest = self.forest().await?;
        forest
            .find(id)
            .cloned()
            .ok_or(FamilyServiceError::PersonNotFound(id))
    }

    /// Direct parent of `id`; `Ok(None)` for roots.
    pub async fn parent_of(&self, id: Uuid) -> Result<Option<Person>, FamilyServiceError> {
        let forest = self.forest().await?;
        if !forest.contains(id) {
            return Err(FamilyServiceError::PersonNotFound(id));
        }
        Ok(forest.find_parent(id).map(|parent| parent.record.clone()))
    }

    #[instrument(skip_all, fields(parent_id = ?data.parent_id))]
    pub async fn add_person(&self, data: PersonDraft) -> Result<Person, FamilyServiceError> {
        let data = data.normalized();
        data.validate()?;
        if let Some(parent_id) = data.parent_id {
            self.require_parent(parent_id).await?;
        }
        let person = self.store.insert(&data).await?;
        info!(id = %person.id, name = %person.name, "Added person");
        Ok(person)
    }

    /// Overwrites the person's fields. Their children stay attached.
    #[instrument(skip(self, data))]
    pub async fn update_person(
        &self,
        id: Uuid,
        data: PersonDraft,
    ) -> Result<Person, FamilyServiceError> {
        let data = data.normalized();
        data.validate()?;

        if let Some(parent_id) = data.parent_id {
            if parent_id == id {
                return Err(FamilyServiceError::WouldCreateCycle { id, parent_id });
            }
            let records = self.store.list().await?;
            if !records.iter().any(|p| p.id == id) {
                return Err(FamilyServiceError::PersonNotFound(id));
            }
            if !records.iter().any(|p| p.id == parent_id) {
                return Err(FamilyServiceError::ParentNotFound(parent_id));
            }
            if collect_descendants(&records, id).contains(&parent_id) {
                return Err(FamilyServiceError::WouldCreateCycle { id, parent_id });
            }
        }

        let person = self
            .store
            .update(id, &data)
            .await?
            .ok_or(FamilyServiceError::PersonNotFound(id))?;
        info!(id = %person.id, name = %person.name, "Updated person");
        Ok(person)
    }

    /// Deletes the person and every descendant; returns the removed ids.
    #[instrument(skip(self))]
    pub async fn delete_person(&self, id: Uuid) -> Result<Vec<Uuid>, FamilyServiceError> {
        let deleted = self.store.delete_cascade(id).await?;
        if deleted.is_empty() {
            return Err(FamilyServiceError::PersonNotFound(id));
        }
        info!(%id, removed = deleted.len(), "Deleted person and descendants");
        Ok(deleted)
    }

    /// Inserts `members` (parents before children) when the store is empty.
    /// Returns how many people were inserted.
    pub async fn seed_if_empty(
        &self,
        members: &[SampleMember],
    ) -> Result<usize, FamilyServiceError> {
        if !self.store.list().await?.is_empty() {
            return Ok(0);
        }

        let mut queue: VecDeque<(&SampleMember, Option<Uuid>)> =
            members.iter().map(|member| (member, None)).collect();
        let mut inserted = 0;
        while let Some((member, parent_id)) = queue.pop_front() {
            let mut data = member.draft.clone();
            data.parent_id = parent_id;
            let person = self.add_person(data).await?;
            inserted += 1;
            queue.extend(member.children.iter().map(|child| (child, Some(person.id))));
        }
        info!(inserted, backend = self.backend(), "Seeded sample family");
        Ok(inserted)
    }

    async fn require_parent(&self, parent_id: Uuid) -> Result<(), FamilyServiceError> {
        match self.store.get(parent_id).await? {
            Some(_) => Ok(()),
            None => Err(FamilyServiceError::ParentNotFound(parent_id)),
        }
    }
}
