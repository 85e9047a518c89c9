/// Invitation lifecycle
///
/// An invited user record carries a single-use token and an expiry. This
/// module implements the two operations that act on that token:
///
/// - [`verify`]: read-only check that a token names a pending invitation
/// - [`accept`]: consumes the token, sets the password and verifies the account
///
/// Issuance and re-issuance live in [`issue`].
///
/// # Check order
///
/// Both operations check, in this order:
///
/// 1. the token matches a user record, else [`InvitationError::InvalidToken`]
/// 2. the current time is not after the expiry, else [`InvitationError::Expired`]
/// 3. the account is not verified yet, else [`InvitationError::AlreadySetUp`]
///
/// A record that is both expired and verified reports `Expired`.
///
/// # Example
///
/// ```no_run
/// use chrono::Utc;
/// use keystone_shared::auth::password::PasswordPolicy;
/// use keystone_shared::invitation;
/// use keystone_shared::store::MemoryUserStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryUserStore::new();
/// let details = invitation::verify(&store, "abc123", Utc::now()).await?;
/// println!("Setting up account for {}", details.email);
///
/// let user_id =
///     invitation::accept(&store, "abc123", "s3cret!", &PasswordPolicy::default(), Utc::now())
///         .await?;
/// # Ok(())
/// # }
/// ```

pub mod issue;

use crate::auth::password::{self, PasswordError, PasswordPolicy};
use crate::mail::MailError;
use crate::models::user::{User, UserRole};
use crate::store::{StoreError, UserStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use issue::{issue, reissue, InvitationSettings, IssuedInvitation, NewInvitation};

/// Minimum password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Error type for invitation operations
///
/// The `Display` text of the client-facing variants is the message returned
/// to callers.
#[derive(Debug, thiserror::Error)]
pub enum InvitationError {
    #[error("Invitation token is required")]
    TokenRequired,

    #[error("Password is required")]
    PasswordRequired,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,

    /// Token is unknown, malformed or already consumed
    #[error("Invalid invitation token")]
    InvalidToken,

    #[error("Invitation link has expired")]
    Expired,

    #[error("Account has already been set up")]
    AlreadySetUp,

    /// The guarded update matched no row: another request consumed or
    /// replaced the token between lookup and update
    #[error("Invitation has already been used")]
    Conflict,

    #[error("User not found")]
    UserNotFound,

    /// `now + ttl` falls outside the representable date range
    #[error("Invitation lifetime is out of range")]
    LifetimeOutOfRange,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Mail(#[from] MailError),
}

impl InvitationError {
    /// Whether the caller can correct the request (as opposed to a server fault)
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            InvitationError::LifetimeOutOfRange
                | InvitationError::Store(_)
                | InvitationError::Password(_)
                | InvitationError::Mail(_)
        )
    }
}

/// What a valid token reveals about the pending invitation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvitationDetails {
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl From<&User> for InvitationDetails {
    fn from(user: &User) -> Self {
        Self {
            name: user.display_name(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Looks up a token and applies the existence, expiry and verification checks
async fn find_pending(
    store: &dyn UserStore,
    token: &str,
    now: DateTime<Utc>,
) -> Result<User, InvitationError> {
    let user = store
        .find_by_invitation_token(token)
        .await?
        .ok_or(InvitationError::InvalidToken)?;

    // A token without an expiry breaks the schema invariant; treat it as expired.
    match user.token_expiry {
        Some(expiry) if now <= expiry => {}
        _ => {
            debug!(user_id = %user.id, "Invitation token expired");
            return Err(InvitationError::Expired);
        }
    }

    if user.is_email_verified {
        return Err(InvitationError::AlreadySetUp);
    }

    Ok(user)
}

/// Checks that `token` identifies a pending, unexpired invitation
///
/// Read-only.
pub async fn verify(
    store: &dyn UserStore,
    token: &str,
    now: DateTime<Utc>,
) -> Result<InvitationDetails, InvitationError> {
    if token.is_empty() {
        return Err(InvitationError::TokenRequired);
    }

    let user = find_pending(store, token, now).await?;
    Ok(InvitationDetails::from(&user))
}

/// Validates the raw accept inputs without touching the store
fn check_accept_input(token: &str, password: &str) -> Result<(), InvitationError> {
    if token.is_empty() {
        return Err(InvitationError::TokenRequired);
    }
    if password.is_empty() {
        return Err(InvitationError::PasswordRequired);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(InvitationError::PasswordTooShort);
    }
    Ok(())
}

/// Consumes an invitation and activates the account
///
/// Hashes `password` on the blocking pool, then stores the hash, marks the
/// email verified and clears the token and expiry in one guarded update.
/// Returns the activated user's ID.
///
/// # Errors
///
/// Input errors are returned before the store is touched. If the guarded
/// update matches nothing, the token was consumed or replaced concurrently
/// and [`InvitationError::Conflict`] is returned.
pub async fn accept(
    store: &dyn UserStore,
    token: &str,
    password: &str,
    policy: &PasswordPolicy,
    now: DateTime<Utc>,
) -> Result<Uuid, InvitationError> {
    check_accept_input(token, password)?;

    let user = find_pending(store, token, now).await?;

    let plaintext = password.to_owned();
    let policy = *policy;
    let password_hash =
        tokio::task::spawn_blocking(move || password::hash_password(&plaintext, &policy))
            .await
            .map_err(|e| PasswordError::HashError(format!("Hashing task failed: {}", e)))??;

    if !store.consume_invitation(user.id, token, &password_hash).await? {
        warn!(user_id = %user.id, "Invitation consumed concurrently");
        return Err(InvitationError::Conflict);
    }

    info!(user_id = %user.id, role = %user.role, "Invitation accepted");
    Ok(user.id)
}
