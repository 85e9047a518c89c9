/// In-memory user store
///
/// Keeps user records in a `HashMap` behind a `tokio` `RwLock`. It honors the
/// same contracts as [`super::PgUserStore`] (email and token uniqueness,
/// guarded updates) so the invitation lifecycle and the HTTP layer can be exercised
/// without a database.

use super::{StoreError, UserStore};
use crate::models::user::{normalize_email, NewInvitedUser, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

/// Whether a user other than `id` holds `token`
fn token_taken(users: &HashMap<Uuid, User>, id: Option<Uuid>, token: &str) -> bool {
    users
        .values()
        .any(|u| Some(u.id) != id && u.invitation_token.as_deref() == Some(token))
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully-formed record, e.g. a seeded admin or a fixture in an
    /// arbitrary state
    pub async fn insert(&self, mut user: User) -> Result<(), StoreError> {
        user.email = normalize_email(&user.email);
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|existing| existing.id != user.id && existing.email == user.email)
        {
            return Err(StoreError::DuplicateEmail);
        }
        if let Some(token) = user.invitation_token.as_deref() {
            if token_taken(&users, Some(user.id), token) {
                return Err(StoreError::DuplicateToken);
            }
        }
        users.insert(user.id, user);
        Ok(())
    }

    /// Number of stored users
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_invitation_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.invitation_token.as_deref() == Some(token))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn create_invited(&self, data: NewInvitedUser) -> Result<User, StoreError> {
        let email = normalize_email(&data.email);
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }
        if token_taken(&users, None, &data.invitation_token) {
            return Err(StoreError::DuplicateToken);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash: None,
            first_name: data.first_name,
            last_name: data.last_name,
            role: data.role,
            invitation_token: Some(data.invitation_token),
            token_expiry: Some(data.token_expiry),
            is_email_verified: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn consume_invitation(
        &self,
        id: Uuid,
        token: &str,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(user)
                if user.invitation_token.as_deref() == Some(token) && !user.is_email_verified =>
            {
                user.password_hash = Some(password_hash.to_string());
                user.is_email_verified = true;
                user.invitation_token = None;
                user.token_expiry = None;
                user.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn replace_invitation(
        &self,
        id: Uuid,
        token: &str,
        token_expiry: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        if token_taken(&users, Some(id), token) {
            return Err(StoreError::DuplicateToken);
        }
        match users.get_mut(&id) {
            Some(user) if !user.is_email_verified => {
                user.invitation_token = Some(token.to_string());
                user.token_expiry = Some(token_expiry);
                user.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;
    use chrono::Duration;

    fn invitee(email: &str, token: &str) -> NewInvitedUser {
        NewInvitedUser {
            email: email.to_string(),
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            role: UserRole::Manager,
            invitation_token: token.to_string(),
            token_expiry: Utc::now() + Duration::days(1),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_by_token() {
        let store = MemoryUserStore::new();
        let created = store.create_invited(invitee("Jane@X.com", "abc123")).await.unwrap();

        assert_eq!(created.email, "jane@x.com");
        assert!(created.password_hash.is_none());
        assert!(!created.is_email_verified);
        assert!(created.is_active);

        let found = store.find_by_invitation_token("abc123").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(store.find_by_invitation_token("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryUserStore::new();
        store.create_invited(invitee("jane@x.com", "t1")).await.unwrap();

        let err = store.create_invited(invitee("JANE@x.com ", "t2")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_consume_is_guarded_by_token() {
        let store = MemoryUserStore::new();
        let user = store.create_invited(invitee("jane@x.com", "abc123")).await.unwrap();

        assert!(!store.consume_invitation(user.id, "other", "hash").await.unwrap());
        assert!(store.consume_invitation(user.id, "abc123", "hash").await.unwrap());
        assert!(!store.consume_invitation(user.id, "abc123", "hash2").await.unwrap());

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash.as_deref(), Some("hash"));
        assert!(stored.is_email_verified);
        assert!(stored.invitation_token.is_none());
        assert!(stored.token_expiry.is_none());
    }

    #[tokio::test]
    async fn test_replace_refuses_verified_user() {
        let store = MemoryUserStore::new();
        let user = store.create_invited(invitee("jane@x.com", "abc123")).await.unwrap();
        let expiry = Utc::now() + Duration::days(3);

        assert!(store.replace_invitation(user.id, "fresh", expiry).await.unwrap());
        assert!(store.find_by_invitation_token("abc123").await.unwrap().is_none());

        store.consume_invitation(user.id, "fresh", "hash").await.unwrap();
        assert!(!store.replace_invitation(user.id, "again", expiry).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_token_rejected_on_create() {
        let store = MemoryUserStore::new();
        store.create_invited(invitee("jane@x.com", "abc123")).await.unwrap();

        let err = store
            .create_invited(invitee("john@x.com", "abc123"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateToken));
        assert!(store.find_by_email("john@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_token_rejected_on_replace() {
        let store = MemoryUserStore::new();
        let jane = store.create_invited(invitee("jane@x.com", "t1")).await.unwrap();
        let john = store.create_invited(invitee("john@x.com", "t2")).await.unwrap();
        let expiry = Utc::now() + Duration::days(3);

        let err = store.replace_invitation(john.id, "t1", expiry).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateToken));

        let found = store.find_by_invitation_token("t1").await.unwrap().unwrap();
        assert_eq!(found.id, jane.id);
        let john = store.find_by_id(john.id).await.unwrap().unwrap();
        assert_eq!(john.invitation_token.as_deref(), Some("t2"));

        // Re-using one's own token is not a collision
        assert!(store.replace_invitation(jane.id, "t1", expiry).await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_token() {
        let store = MemoryUserStore::new();
        let jane = store.create_invited(invitee("jane@x.com", "abc123")).await.unwrap();

        let mut other = jane.clone();
        other.id = Uuid::new_v4();
        other.email = "john@x.com".to_string();
        let err = store.insert(other).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateToken));
    }
}
