//! User repository implementation

use sqlx::{FromRow, PgPool};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::models::user::User;
use crate::utils::errors::EventHubError;

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    is_manual: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            is_manual: row.is_manual,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone, Debug)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, user: &User) -> Result<User, EventHubError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email, phone, is_manual, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, email, phone, is_manual, created_at
            "#
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.is_manual)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return EventHubError::Validation(format!("Email already in use: {}", user.email));
                }
            }
            EventHubError::Database(e)
        })?;

        Ok(row.into())
    }

    /// Insert the user unless the email is taken, then return whichever row owns it
    pub async fn find_or_create(&self, candidate: &User) -> Result<(User, bool), EventHubError> {
        let inserted = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email, phone, is_manual, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, name, email, phone, is_manual, created_at
            "#
        )
        .bind(candidate.id)
        .bind(&candidate.name)
        .bind(&candidate.email)
        .bind(&candidate.phone)
        .bind(candidate.is_manual)
        .bind(candidate.created_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((row.into(), true));
        }

        let existing = self
            .find_by_email(&candidate.email)
            .await?
            .ok_or_else(|| EventHubError::Storage(format!("User with email {} vanished during lookup", candidate.email)))?;
        Ok((existing, false))
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, EventHubError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, phone, is_manual, created_at FROM users WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    /// Find user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, EventHubError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, phone, is_manual, created_at FROM users WHERE email = $1"
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }
}
