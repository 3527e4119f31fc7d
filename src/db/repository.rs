//! User repository for Gator.
//!
//! This module provides CRUD operations for users in the database.

use chrono::Utc;
use uuid::Uuid;

use super::user::{NewUser, User, UserRow};
use super::DbPool;
use crate::datetime::to_db_timestamp;
use crate::{GatorError, Result};

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user in the database.
    ///
    /// Fails with a validation error if the name is already taken.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let id = Uuid::new_v4();
        let now = to_db_timestamp(&Utc::now());

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(id.to_string())
        .bind(&new_user.name)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                GatorError::Validation(format!("user {:?} already exists", new_user.name))
            }
            other => GatorError::from(other),
        })?;

        User::try_from(row)
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by name.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// List all users ordered by name.
    pub async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users ORDER BY name ASC",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Delete every user. Feeds, follows and posts cascade.
    pub async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM users").execute(self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Count all users.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_create_user() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        let user = repo.create(&NewUser::new("kahya")).await.unwrap();

        assert_eq!(user.name, "kahya");
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_user_fails() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("kahya")).await.unwrap();
        let result = repo.create(&NewUser::new("kahya")).await;

        assert!(matches!(result, Err(GatorError::Validation(_))));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_by_name_and_id() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        let created = repo.create(&NewUser::new("holgith")).await.unwrap();

        let by_name = repo.get_by_name("holgith").await.unwrap().unwrap();
        assert_eq!(by_name, created);

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "holgith");

        assert!(repo.get_by_name("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_delete_all() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("zed")).await.unwrap();
        repo.create(&NewUser::new("amy")).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["amy", "zed"]);

        assert_eq!(repo.delete_all().await.unwrap(), 2);
        assert!(repo.list().await.unwrap().is_empty());
    }
}
