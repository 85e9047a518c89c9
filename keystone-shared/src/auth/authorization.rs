/// Authorization for invitation management
///
/// Handlers receive an [`AuthContext`] from the bearer-token middleware and
/// call [`require_invite_permission`] before issuing or re-sending an
/// invitation.
///
/// # Rules
///
/// | Caller | May invite |
/// |---|---|
/// | admin | admin, manager, user |
/// | manager | user |
/// | user | nobody |

use crate::auth::jwt::Claims;
use crate::models::user::UserRole;
use uuid::Uuid;

/// Error type for authorization failures
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthzError {
    /// Caller's role may not manage invitations at all
    #[error("Role {0} cannot manage invitations")]
    NotStaff(UserRole),

    /// Caller may manage invitations, but not for this role
    #[error("Role {caller} cannot invite role {target}")]
    CannotInviteRole { caller: UserRole, target: UserRole },
}

/// Identity of an authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
        }
    }
}

/// Checks the caller may invite someone as `target`
pub fn require_invite_permission(auth: &AuthContext, target: UserRole) -> Result<(), AuthzError> {
    if !auth.role.is_staff() {
        return Err(AuthzError::NotStaff(auth.role));
    }

    if !auth.role.can_invite(target) {
        return Err(AuthzError::CannotInviteRole {
            caller: auth.role,
            target,
        });
    }

    Ok(())
}
