use chrono::{DateTime, Utc};
use forest::Record;
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, Type};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
)]
#[sqlx(type_name = "gender", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "marital_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MaritalStatus {
    #[default]
    Single,
    Married,
}

/// A family member as stored: flat, with a reference to the parent.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct Person {
    pub id: Uuid,
    pub name: String,
    pub birth_year: i32,
    pub death_year: Option<i32>,
    pub gender: Gender,
    pub marital_status: MaritalStatus,
    pub spouse_name: Option<String>,
    pub children_count: Option<i32>, // declared count for members without recorded children
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Record for Person {
    fn id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }
}

impl Person {
    /// Age in whole years, at death for deceased members.
    pub fn age(&self, current_year: i32) -> i32 {
        self.death_year.unwrap_or(current_year) - self.birth_year
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersonValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("death year {death_year} is before birth year {birth_year}")]
    DeathBeforeBirth { birth_year: i32, death_year: i32 },
    #[error("children count must not be negative (got {0})")]
    NegativeChildrenCount(i32),
}

/// Fields supplied when creating or editing a person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct PersonDraft {
    pub name: String,
    pub birth_year: i32,
    pub death_year: Option<i32>,
    pub gender: Gender,
    #[serde(default)]
    pub marital_status: MaritalStatus,
    pub spouse_name: Option<String>,
    pub children_count: Option<i32>,
    pub parent_id: Option<Uuid>,
}

impl PersonDraft {
    pub fn from_person(person: &Person) -> Self {
        Self {
            name: person.name.clone(),
            birth_year: person.birth_year,
            death_year: person.death_year,
            gender: person.gender,
            marital_status: person.marital_status,
            spouse_name: person.spouse_name.clone(),
            children_count: person.children_count,
            parent_id: person.parent_id,
        }
    }

    /// Drops fields that do not apply: the spouse of a single person and the
    /// declared children count of a male. Also trims text fields.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.spouse_name = match self.marital_status {
            MaritalStatus::Married => self
                .spouse_name
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            MaritalStatus::Single => None,
        };
        if self.gender == Gender::Male {
            self.children_count = None;
        }
        self
    }

    pub fn validate(&self) -> Result<(), PersonValidationError> {
        if self.name.trim().is_empty() {
            return Err(PersonValidationError::EmptyName);
        }
        if let Some(death_year) = self.death_year {
            if death_year < self.birth_year {
                return Err(PersonValidationError::DeathBeforeBirth {
                    birth_year: self.birth_year,
                    death_year,
                });
            }
        }
        if let Some(count) = self.children_count {
            if count < 0 {
                return Err(PersonValidationError::NegativeChildrenCount(count));
            }
        }
        Ok(())
    }
}

impl Person {
    pub async fn find_all<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Person>(
            r#"SELECT id, name, birth_year, death_year, gender, marital_status,
                      spouse_name, children_count, parent_id, created_at, updated_at
               FROM people
               ORDER BY rowid ASC"#,
        )
        .fetch_all(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Person>(
            r#"SELECT id, name, birth_year, death_year, gender, marital_status,
                      spouse_name, children_count, parent_id, created_at, updated_at
               FROM people
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        data: &PersonDraft,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Person>(
            r#"INSERT INTO people (id, name, birth_year, death_year, gender, marital_status,
                                   spouse_name, children_count, parent_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING id, name, birth_year, death_year, gender, marital_status,
                         spouse_name, children_count, parent_id, created_at, updated_at"#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(data.birth_year)
        .bind(data.death_year)
        .bind(data.gender)
        .bind(data.marital_status)
        .bind(&data.spouse_name)
        .bind(data.children_count)
        .bind(data.parent_id)
        .fetch_one(executor)
        .await
    }

    /// Overwrites every stored field of `id`. Children are rows of their own
    /// and are not affected.
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: &PersonDraft,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Person>(
            r#"UPDATE people
               SET name = $2,
                   birth_year = $3,
                   death_year = $4,
                   gender = $5,
                   marital_status = $6,
                   spouse_name = $7,
                   children_count = $8,
                   parent_id = $9,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, name, birth_year, death_year, gender, marital_status,
                         spouse_name, children_count, parent_id, created_at, updated_at"#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(data.birth_year)
        .bind(data.death_year)
        .bind(data.gender)
        .bind(data.marital_status)
        .bind(&data.spouse_name)
        .bind(data.children_count)
        .bind(data.parent_id)
        .fetch_optional(executor)
        .await
    }

    /// `id` and every row below it, resolved by the database in one query.
    /// Empty when `id` does not exist.
    pub async fn subtree_ids<'e, E>(executor: E, id: Uuid) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"WITH RECURSIVE subtree(id, depth) AS (
                   SELECT id, 0 FROM people WHERE id = $1
                   UNION
                   SELECT p.id, s.depth + 1
                   FROM people p
                   JOIN subtree s ON p.parent_id = s.id
                   WHERE s.depth < 10000
               )
               SELECT id FROM subtree ORDER BY depth ASC"#,
        )
        .bind(id)
        .fetch_all(executor)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn delete_many<'e, E>(executor: E, ids: &[Uuid]) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut query = QueryBuilder::<Sqlite>::new("DELETE FROM people WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        let result = query.build().execute(executor).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str) -> PersonDraft {
        PersonDraft {
            name: name.to_string(),
            birth_year: 1950,
            death_year: None,
            gender: Gender::Female,
            marital_status: MaritalStatus::Married,
            spouse_name: Some("  Omar ".to_string()),
            children_count: Some(2),
            parent_id: None,
        }
    }

    #[test]
    fn test_death_before_birth_is_rejected() {
        let mut data = draft("Huda");
        data.death_year = Some(1940);
        assert_eq!(
            data.validate(),
            Err(PersonValidationError::DeathBeforeBirth {
                birth_year: 1950,
                death_year: 1940
            })
        );
        data.death_year = Some(1950);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_blank_name_is_rejected() {
        assert_eq!(
            draft("   ").validate(),
            Err(PersonValidationError::EmptyName)
        );
    }

    #[test]
    fn test_normalized_drops_inapplicable_fields() {
        let married = draft(" Huda ").normalized();
        assert_eq!(married.name, "Huda");
        assert_eq!(married.spouse_name.as_deref(), Some("Omar"));
        assert_eq!(married.children_count, Some(2));

        let mut single_male = draft("Ali");
        single_male.gender = Gender::Male;
        single_male.marital_status = MaritalStatus::Single;
        let single_male = single_male.normalized();
        assert_eq!(single_male.spouse_name, None);
        assert_eq!(single_male.children_count, None);
    }

    #[test]
    fn test_age_uses_death_year_when_present() {
        let person = Person {
            id: Uuid::new_v4(),
            name: "Ahmad".to_string(),
            birth_year: 1930,
            death_year: Some(2010),
            gender: Gender::Male,
            marital_status: MaritalStatus::Married,
            spouse_name: Some("Fatima".to_string()),
            children_count: None,
            parent_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(person.age(2026), 80);
        assert_eq!(Person { death_year: None, ..person }.age(2026), 96);
    }

    #[test]
    fn test_enum_wire_forms() {
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"female\"");
        assert_eq!(MaritalStatus::Married.to_string(), "married");
        assert_eq!("single".parse::<MaritalStatus>().unwrap(), MaritalStatus::Single);
    }

    #[tokio::test]
    async fn test_subtree_ids_and_delete_many() {
        let db = crate::DBService::new_in_memory().await.unwrap();
        let a = Person::create(&db.pool, Uuid::new_v4(), &draft("A")).await.unwrap();
        let mut b_data = draft("B");
        b_data.parent_id = Some(a.id);
        let b = Person::create(&db.pool, Uuid::new_v4(), &b_data).await.unwrap();
        let mut c_data = draft("C");
        c_data.parent_id = Some(b.id);
        let c = Person::create(&db.pool, Uuid::new_v4(), &c_data).await.unwrap();

        let ids = Person::subtree_ids(&db.pool, b.id).await.unwrap();
        assert_eq!(ids, vec![b.id, c.id]);
        assert!(Person::subtree_ids(&db.pool, Uuid::new_v4()).await.unwrap().is_empty());

        assert_eq!(Person::delete_many(&db.pool, &ids).await.unwrap(), 2);
        let remaining = Person::find_all(&db.pool).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, a.id);
    }
}
