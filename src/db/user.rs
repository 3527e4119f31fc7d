//! User model for Gator.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::parse_id;
use crate::datetime::parse_db_timestamp;
use crate::Result;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: Uuid,
    /// Login name (unique).
    pub name: String,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// New user for registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login name.
    pub name: String,
}

impl NewUser {
    /// Create a new user with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Row type for users from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = crate::GatorError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: parse_id(&row.id)?,
            name: row.name,
            created_at: parse_db_timestamp(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_db_timestamp(&row.updated_at).unwrap_or_else(Utc::now),
        })
    }
}
