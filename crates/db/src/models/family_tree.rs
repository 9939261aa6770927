use chrono::{DateTime, Utc};
use forest::Forest;
use sqlx::{Executor, Sqlite};

use super::person::Person;

/// The single-row cache of the family, kept as the forest's records in
/// pre-order. Flat storage keeps decoding independent of tree depth.
#[derive(Debug, Clone)]
pub struct FamilyTreeSnapshot {
    pub records: Vec<Person>,
    pub updated_at: DateTime<Utc>,
}

impl FamilyTreeSnapshot {
    /// Fails with [`sqlx::Error::Decode`] when `tree_data` is not a record list.
    pub async fn find<'e, E>(executor: E) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row: Option<(String, DateTime<Utc>)> =
            sqlx::query_as("SELECT tree_data, updated_at FROM family_tree WHERE id = 1")
                .fetch_optional(executor)
                .await?;

        row.map(|(tree_data, updated_at)| {
            let records = serde_json::from_str(&tree_data)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
            Ok(Self {
                records,
                updated_at,
            })
        })
        .transpose()
    }

    pub async fn store<'e, E>(executor: E, forest: &Forest<Person>) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let json = serde_json::to_string(&forest.records())
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        Self::store_raw(executor, &json).await
    }

    pub(crate) async fn store_raw<'e, E>(executor: E, tree_data: &str) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"INSERT INTO family_tree (id, tree_data)
               VALUES (1, $1)
               ON CONFLICT(id) DO UPDATE
               SET tree_data = excluded.tree_data,
                   updated_at = datetime('now', 'subsec')"#,
        )
        .bind(tree_data)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn clear<'e, E>(executor: E) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM family_tree WHERE id = 1")
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
