/// User persistence
///
/// [`UserStore`] is the repository seam the invitation lifecycle runs
/// against. It is constructed once at process start and shared by handle, so
/// handlers never reach for a global connection.
///
/// # Backends
///
/// - [`postgres::PgUserStore`]: production backend over a `sqlx` pool
/// - [`memory::MemoryUserStore`]: in-process backend used by tests and local demos
///
/// # Guarded updates
///
/// Mutations that consume or replace an invitation are conditioned on the
/// record still being in the expected state and report whether a row
/// changed. Callers treat `Ok(false)` as a lost race.

pub mod memory;
pub mod postgres;

use crate::models::user::{NewInvitedUser, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another user already has this email address
    #[error("Email already exists")]
    DuplicateEmail,

    /// Another user already holds this invitation token
    #[error("Invitation token already in use")]
    DuplicateToken,

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository over user records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Finds the user whose pending invitation token equals `token`
    async fn find_by_invitation_token(&self, token: &str) -> Result<Option<User>, StoreError>;

    /// Finds a user by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Finds a user by normalized email address
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Inserts an invited user: no password, unverified, active
    ///
    /// Returns [`StoreError::DuplicateEmail`] if the email is taken and
    /// [`StoreError::DuplicateToken`] if another user holds the token.
    async fn create_invited(&self, data: NewInvitedUser) -> Result<User, StoreError>;

    /// Activates an account by consuming its invitation
    ///
    /// Sets the password hash, marks the email verified, clears the token and
    /// expiry and bumps `updated_at` in one update, but only while the record
    /// still carries `token` and is unverified. Returns whether a row changed.
    async fn consume_invitation(
        &self,
        id: Uuid,
        token: &str,
        password_hash: &str,
    ) -> Result<bool, StoreError>;

    /// Replaces the pending token and expiry of a still-unverified user
    ///
    /// Returns whether a row changed, or [`StoreError::DuplicateToken`] if
    /// another user holds the token.
    async fn replace_invitation(
        &self,
        id: Uuid,
        token: &str,
        token_expiry: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Checks the backend is reachable
    async fn ping(&self) -> Result<(), StoreError>;
}
