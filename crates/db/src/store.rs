//! The seam between family logic and whatever holds the `people` rows.

use async_trait::async_trait;
use forest::{BuildPolicy, Forest, ForestError, cascade_ids};
use sqlx::{Sqlite, Transaction};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    DBService,
    models::{
        family_tree::FamilyTreeSnapshot,
        person::{Person, PersonDraft},
    },
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid family tree: {0}")]
    Forest(#[from] ForestError),
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("network error: {0}")]
    Transport(String),
    #[error("json error: {0}")]
    Serde(String),
}

/// Assembles `records` into a forest under `policy`, logging orphans.
pub fn assemble_forest(
    records: Vec<Person>,
    policy: BuildPolicy,
) -> Result<Forest<Person>, ForestError> {
    let outcome = Forest::build(records, policy)?;
    for orphan in &outcome.orphans {
        warn!(
            id = %orphan.id,
            missing_parent_id = %orphan.missing_parent_id,
            "Parent not found, placing person at the root level"
        );
    }
    Ok(outcome.forest)
}

#[async_trait]
pub trait PersonStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    fn build_policy(&self) -> BuildPolicy {
        BuildPolicy::default()
    }

    async fn list(&self) -> Result<Vec<Person>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Person>, StoreError>;

    async fn insert(&self, data: &PersonDraft) -> Result<Person, StoreError>;

    /// `None` when no row has `id`.
    async fn update(&self, id: Uuid, data: &PersonDraft) -> Result<Option<Person>, StoreError>;

    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, StoreError>;

    /// Deletes `id` and all of its descendants; returns the removed ids
    /// (empty when `id` does not exist).
    ///
    /// The default reads every row, walks the parent links client-side and
    /// issues one batch delete. It is not isolated from concurrent writers.
    async fn delete_cascade(&self, id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let records = self.list().await?;
        if !records.iter().any(|person| person.id == id) {
            return Ok(Vec::new());
        }
        let ids = cascade_ids(&records, id);
        let deleted = self.delete_many(&ids).await?;
        debug!(%id, requested = ids.len(), deleted, "Cascade delete issued");
        Ok(ids)
    }

    /// Current forest, assembled from a fresh read of the rows.
    async fn load_forest(&self) -> Result<Forest<Person>, StoreError> {
        let records = self.list().await?;
        Ok(assemble_forest(records, self.build_policy())?)
    }
}

/// `people` in SQLite, with the `family_tree` snapshot rebuilt inside every
/// write transaction.
#[derive(Clone)]
pub struct SqliteStore {
    db: DBService,
    policy: BuildPolicy,
}

impl SqliteStore {
    pub fn new(db: DBService, policy: BuildPolicy) -> Self {
        Self { db, policy }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    /// Re-reads the rows inside `tx` and overwrites the snapshot. A record set
    /// that no longer assembles (e.g. a cycle) fails the whole transaction.
    async fn refresh_snapshot(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> Result<Forest<Person>, StoreError> {
        let records = Person::find_all(&mut **tx).await?;
        let forest = assemble_forest(records, self.policy)?;
        FamilyTreeSnapshot::store(&mut **tx, &forest).await?;
        Ok(forest)
    }

    /// Rebuilds the snapshot from the rows, e.g. after they were edited
    /// outside of this service.
    pub async fn rebuild_snapshot(&self) -> Result<Forest<Person>, StoreError> {
        let mut tx = self.db.pool.begin().await?;
        let forest = self.refresh_snapshot(&mut tx).await?;
        tx.commit().await?;
        info!(members = forest.count(), "Rebuilt family tree snapshot");
        Ok(forest)
    }
}

#[async_trait]
impl PersonStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn build_policy(&self) -> BuildPolicy {
        self.policy
    }

    async fn list(&self) -> Result<Vec<Person>, StoreError> {
        Ok(Person::find_all(&self.db.pool).await?)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Person>, StoreError> {
        Ok(Person::find_by_id(&self.db.pool, id).await?)
    }

    async fn insert(&self, data: &PersonDraft) -> Result<Person, StoreError> {
        let mut tx = self.db.pool.begin().await?;
        let person = Person::create(&mut *tx, Uuid::new_v4(), data).await?;
        self.refresh_snapshot(&mut tx).await?;
        tx.commit().await?;
        Ok(person)
    }

    async fn update(&self, id: Uuid, data: &PersonDraft) -> Result<Option<Person>, StoreError> {
        let mut tx = self.db.pool.begin().await?;
        let Some(person) = Person::update(&mut *tx, id, data).await? else {
            return Ok(None);
        };
        self.refresh_snapshot(&mut tx).await?;
        tx.commit().await?;
        Ok(Some(person))
    }

    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, StoreError> {
        let mut tx = self.db.pool.begin().await?;
        let deleted = Person::delete_many(&mut *tx, ids).await?;
        self.refresh_snapshot(&mut tx).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    /// Resolves the subtree with a recursive query and deletes it in the same
    /// transaction as the lookup.
    async fn delete_cascade(&self, id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let mut tx = self.db.pool.begin().await?;
        let ids = Person::subtree_ids(&mut *tx, id).await?;
        if ids.is_empty() {
            return Ok(ids);
        }
        let deleted = Person::delete_many(&mut *tx, &ids).await?;
        self.refresh_snapshot(&mut tx).await?;
        tx.commit().await?;
        debug!(%id, deleted, "Cascade delete committed");
        Ok(ids)
    }

    /// Assembles the cached records. A missing or unreadable snapshot is
    /// rebuilt from the rows.
    async fn load_forest(&self) -> Result<Forest<Person>, StoreError> {
        match FamilyTreeSnapshot::find(&self.db.pool).await {
            Ok(Some(snapshot)) => match Forest::build(snapshot.records, self.policy) {
                Ok(outcome) => return Ok(outcome.forest),
                Err(e) => warn!(error = %e, "Cached family tree is invalid, rebuilding"),
            },
            Ok(None) => {}
            Err(sqlx::Error::Decode(e)) => {
                warn!(error = %e, "Cached family tree is unreadable, rebuilding")
            }
            Err(e) => return Err(e.into()),
        }
        self.rebuild_snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::person::{Gender, MaritalStatus};

    fn draft(name: &str, parent_id: Option<Uuid>) -> PersonDraft {
        PersonDraft {
            name: name.to_string(),
            birth_year: 1960,
            death_year: None,
            gender: Gender::Male,
            marital_status: MaritalStatus::Single,
            spouse_name: None,
            children_count: None,
            parent_id,
        }
    }

    async fn store() -> SqliteStore {
        let db = DBService::new_in_memory().await.unwrap();
        SqliteStore::new(db, BuildPolicy::default())
    }

    async fn snapshot(store: &SqliteStore) -> Forest<Person> {
        let records = FamilyTreeSnapshot::find(&store.db().pool)
            .await
            .unwrap()
            .unwrap()
            .records;
        Forest::from_records(records).unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_tracks_every_write() {
        let store = store().await;
        let a = store.insert(&draft("A", None)).await.unwrap();
        let b = store.insert(&draft("B", Some(a.id))).await.unwrap();
        let from_rows = assemble_forest(store.list().await.unwrap(), BuildPolicy::default()).unwrap();
        assert_eq!(snapshot(&store).await, from_rows);
        assert_eq!(from_rows.count(), 2);

        store
            .update(b.id, &draft("B renamed", Some(a.id)))
            .await
            .unwrap()
            .unwrap();
        let cached = snapshot(&store).await;
        assert_eq!(cached.find(b.id).unwrap().record.name, "B renamed");
        assert_eq!(store.load_forest().await.unwrap(), cached);
    }

    #[tokio::test]
    async fn test_cascade_delete_removes_exactly_the_subtree() {
        let store = store().await;
        let a = store.insert(&draft("A", None)).await.unwrap();
        let b = store.insert(&draft("B", Some(a.id))).await.unwrap();
        let c = store.insert(&draft("C", Some(b.id))).await.unwrap();
        let d = store.insert(&draft("D", Some(a.id))).await.unwrap();

        let deleted = store.delete_cascade(b.id).await.unwrap();
        assert_eq!(deleted, vec![b.id, c.id]);

        let forest = store.load_forest().await.unwrap();
        assert_eq!(forest.count(), 2);
        assert!(forest.find(c.id).is_none());
        assert_eq!(forest.find_parent(d.id).map(|n| n.record.id), Some(a.id));
    }

    #[tokio::test]
    async fn test_cascade_delete_of_unknown_id_is_empty() {
        let store = store().await;
        store.insert(&draft("A", None)).await.unwrap();
        assert!(store.delete_cascade(Uuid::new_v4()).await.unwrap().is_empty());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_of_unknown_id_is_none() {
        let store = store().await;
        let result = store.update(Uuid::new_v4(), &draft("X", None)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_cycle_rolls_back_update() {
        let store = store().await;
        let a = store.insert(&draft("A", None)).await.unwrap();
        let b = store.insert(&draft("B", Some(a.id))).await.unwrap();

        let err = store.update(a.id, &draft("A", Some(b.id))).await.unwrap_err();
        assert!(matches!(err, StoreError::Forest(ForestError::Cycle(_))));
        let unchanged = store.get(a.id).await.unwrap().unwrap();
        assert_eq!(unchanged.parent_id, None);
    }

    /// Exercises the provided trait methods without a database.
    struct VecStore(std::sync::Mutex<Vec<Person>>);

    #[async_trait]
    impl PersonStore for VecStore {
        fn backend(&self) -> &'static str {
            "vec"
        }

        async fn list(&self) -> Result<Vec<Person>, StoreError> {
            Ok(self.0.lock().unwrap().clone())
        }

        async fn get(&self, id: Uuid) -> Result<Option<Person>, StoreError> {
            Ok(self.0.lock().unwrap().iter().find(|p| p.id == id).cloned())
        }

        async fn insert(&self, _data: &PersonDraft) -> Result<Person, StoreError> {
            unimplemented!()
        }

        async fn update(&self, _id: Uuid, _data: &PersonDraft) -> Result<Option<Person>, StoreError> {
            unimplemented!()
        }

        async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, StoreError> {
            let mut rows = self.0.lock().unwrap();
            let before = rows.len();
            rows.retain(|p| !ids.contains(&p.id));
            Ok((before - rows.len()) as u64)
        }
    }

    #[tokio::test]
    async fn test_default_cascade_walks_flat_records() {
        let source = store().await;
        let a = source.insert(&draft("A", None)).await.unwrap();
        let b = source.insert(&draft("B", Some(a.id))).await.unwrap();
        let c = source.insert(&draft("C", Some(b.id))).await.unwrap();
        let orphan = source.insert(&draft("Lost", None)).await.unwrap();
        let mut rows = source.list().await.unwrap();
        // points at a parent that is not in the set
        rows.iter_mut()
            .find(|p| p.id == orphan.id)
            .unwrap()
            .parent_id = Some(Uuid::new_v4());

        let store = VecStore(std::sync::Mutex::new(rows));
        let forest = store.load_forest().await.unwrap();
        assert_eq!(forest.roots().len(), 2);
        assert_eq!(forest.count(), 4);

        assert_eq!(store.delete_cascade(b.id).await.unwrap(), vec![b.id, c.id]);
        assert!(store.delete_cascade(c.id).await.unwrap().is_empty());
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_deep_family_stays_readable() {
        let store = store().await;
        let mut parent_id = None;
        let mut ids = Vec::new();
        for generation in 0..200 {
            let person = store
                .insert(&draft(&format!("G{generation}"), parent_id))
                .await
                .unwrap();
            parent_id = Some(person.id);
            ids.push(person.id);
        }

        let forest = store.load_forest().await.unwrap();
        assert_eq!(forest.count(), 200);
        assert_eq!(forest.depth_of(ids[199]), Some(199));
        assert_eq!(snapshot(&store).await, forest);
    }

    #[tokio::test]
    async fn test_unreadable_snapshot_is_rebuilt_from_rows() {
        let store = store().await;
        let a = store.insert(&draft("A", None)).await.unwrap();
        let b = store.insert(&draft("B", Some(a.id))).await.unwrap();
        FamilyTreeSnapshot::store_raw(&store.db().pool, "{\"not\": \"records\"}")
            .await
            .unwrap();

        let forest = store.load_forest().await.unwrap();
        assert_eq!(forest.find_parent(b.id).map(|n| n.record.id), Some(a.id));
        assert_eq!(snapshot(&store).await, forest);
    }

    #[tokio::test]
    async fn test_load_forest_fills_missing_snapshot() {
        let store = store().await;
        let a = store.insert(&draft("A", None)).await.unwrap();
        FamilyTreeSnapshot::clear(&store.db().pool).await.unwrap();
        let forest = store.load_forest().await.unwrap();
        assert!(forest.contains(a.id));
        assert!(FamilyTreeSnapshot::find(&store.db().pool).await.unwrap().is_some());
    }
}
