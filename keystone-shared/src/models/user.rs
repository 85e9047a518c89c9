/// User model
///
/// A user record doubles as a pending invitation: staff create the record with
/// an invitation token and expiry, and the invitee activates it by choosing a
/// password. Persistence lives behind [`crate::store::UserStore`].
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('admin', 'manager', 'user');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email TEXT NOT NULL UNIQUE,
///     password_hash TEXT,
///     first_name TEXT,
///     last_name TEXT,
///     role user_role NOT NULL DEFAULT 'user',
///     invitation_token TEXT UNIQUE,
///     token_expiry TIMESTAMPTZ,
///     is_email_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Full control, may invite any role
    Admin,

    /// May invite plain users
    Manager,

    /// Regular account
    User,
}

impl UserRole {
    /// Converts role to its wire/database string
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::User => "user",
        }
    }

    /// Whether this role may issue invitations at all
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }

    /// Whether a holder of this role may invite someone as `target`
    ///
    /// Admins may invite any role, managers only plain users.
    pub fn can_invite(&self, target: UserRole) -> bool {
        match self {
            UserRole::Admin => true,
            UserRole::Manager => target == UserRole::User,
            UserRole::User => false,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "manager" => Ok(UserRole::Manager),
            "user" => Ok(UserRole::User),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// User record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address, stored normalized (see [`normalize_email`])
    pub email: String,

    /// Argon2id hash, `None` until the invitation is accepted
    pub password_hash: Option<String>,

    pub first_name: Option<String>,

    pub last_name: Option<String>,

    pub role: UserRole,

    /// Pending invitation token, unique while set
    pub invitation_token: Option<String>,

    /// Instant after which `invitation_token` is no longer honored
    pub token_expiry: Option<DateTime<Utc>>,

    pub is_email_verified: bool,

    /// Account usability flag, independent of verification
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Display name built from the first and last name
    ///
    /// Each part is trimmed; blank parts are dropped and the rest are joined
    /// with a single space. A user with neither part gets an empty name.
    pub fn display_name(&self) -> String {
        join_name(self.first_name.as_deref(), self.last_name.as_deref())
    }

    /// Whether the account has a pending (unconsumed) invitation
    pub fn has_pending_invitation(&self) -> bool {
        self.invitation_token.is_some() && !self.is_email_verified
    }
}

/// Joins optional name parts the way [`User::display_name`] does
pub fn join_name(first: Option<&str>, last: Option<&str>) -> String {
    [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalizes an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Input for creating an invited (not yet activated) user
#[derive(Debug, Clone)]
pub struct NewInvitedUser {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
    pub invitation_token: String,
    pub token_expiry: DateTime<Utc>,
}
