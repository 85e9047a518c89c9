/// PostgreSQL user store
///
/// Runtime-checked `sqlx` queries against the `users` table created by the
/// migrations in `migrations/`.
///
/// # Example
///
/// ```no_run
/// use keystone_shared::db::pool::{create_pool, DatabaseConfig};
/// use keystone_shared::store::{PgUserStore, UserStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let store = PgUserStore::new(pool);
/// let pending = store.find_by_invitation_token("abc123").await?;
/// # Ok(())
/// # }
/// ```

use super::{StoreError, UserStore};
use crate::models::user::{normalize_email, NewInvitedUser, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, role, \
     invitation_token, token_expiry, is_email_verified, is_active, created_at, updated_at";

/// [`UserStore`] backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for health checks and shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps unique violations on the email and token columns to their
/// [`StoreError`] variants
fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some(c) if c.contains("email") => return StoreError::DuplicateEmail,
                Some(c) if c.contains("invitation_token") => return StoreError::DuplicateToken,
                _ => {}
            }
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_invitation_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE invitation_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_invited(&self, data: NewInvitedUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, first_name, last_name, role, invitation_token, token_expiry,
                               is_email_verified, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, TRUE)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(normalize_email(&data.email))
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.role)
        .bind(data.invitation_token)
        .bind(data.token_expiry)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        debug!(user_id = %user.id, role = %user.role, "Inserted invited user");
        Ok(user)
    }

    async fn consume_invitation(
        &self,
        id: Uuid,
        token: &str,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $3,
                is_email_verified = TRUE,
                invitation_token = NULL,
                token_expiry = NULL,
                updated_at = NOW()
            WHERE id = $1
              AND invitation_token = $2
              AND is_email_verified = FALSE
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn replace_invitation(
        &self,
        id: Uuid,
        token: &str,
        token_expiry: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET invitation_token = $2,
                token_expiry = $3,
                updated_at = NOW()
            WHERE id = $1
              AND is_email_verified = FALSE
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(token_expiry)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(result.rows_affected() == 1)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::db::pool::health_check(&self.pool).await?;
        Ok(())
    }
}
