/// Invitation endpoints
///
/// # Endpoints
///
/// - `GET  /v1/invitations/verify?token=` - Check a setup link (public)
/// - `POST /v1/invitations/accept` - Set a password and activate the account (public)
/// - `POST /v1/invitations` - Invite a new user (staff)
/// - `POST /v1/invitations/:id/resend` - Replace the token and mail a new link (staff)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::Json,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension,
};
use chrono::{DateTime, Utc};
use keystone_shared::{
    auth::authorization::{require_invite_permission, AuthContext},
    invitation::{self, InvitationDetails, InvitationError, NewInvitation},
    models::user::UserRole,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Query string of the verify endpoint
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub user: InvitationDetails,
}

/// Accept request
///
/// Absent and `null` fields both deserialize as `None` so they surface as
/// the "is required" messages rather than a parse error.
#[derive(Debug, Deserialize)]
pub struct AcceptRequest {
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptResponse {
    pub message: String,
    pub user_id: Uuid,
}

/// Issue request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(max = 100, message = "First name must be at most 100 characters"))]
    pub first_name: Option<String>,

    #[validate(length(max = 100, message = "Last name must be at most 100 characters"))]
    pub last_name: Option<String>,

    pub role: UserRole,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendResponse {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Verify an invitation token
///
/// ```text
/// GET /v1/invitations/verify?token=9f86d0...
/// ```
///
/// # Response
///
/// ```json
/// { "user": { "name": "Jane Doe", "email": "jane@x.com", "role": "manager" } }
/// ```
///
/// # Errors
///
/// `400` for a missing, unknown or expired token and for an account that is
/// already set up.
pub async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> ApiResult<axum::Json<VerifyResponse>> {
    let token = params.token.unwrap_or_default();
    let user = invitation::verify(state.store.as_ref(), &token, Utc::now()).await?;
    Ok(axum::Json(VerifyResponse { user }))
}

/// Accept an invitation
///
/// ```text
/// POST /v1/invitations/accept
/// Content-Type: application/json
///
/// { "token": "9f86d0...", "password": "s3cret!" }
/// ```
///
/// # Response
///
/// ```json
/// { "message": "Account set up successfully", "userId": "uuid" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: missing input, short password, or a token that is
///   unknown, expired or already used
/// - `409 Conflict`: another request consumed the token concurrently
pub async fn accept(
    State(state): State<AppState>,
    Json(req): Json<AcceptRequest>,
) -> ApiResult<axum::Json<AcceptResponse>> {
    let token = req.token.unwrap_or_default();
    let password = req.password.unwrap_or_default();
    let user_id = invitation::accept(
        state.store.as_ref(),
        &token,
        &password,
        &state.invitation_settings().password_policy,
        Utc::now(),
    )
    .await?;

    Ok(axum::Json(AcceptResponse {
        message: "Account set up successfully".to_string(),
        user_id,
    }))
}

/// Invite a new user
///
/// ```text
/// POST /v1/invitations
/// Authorization: Bearer <token>
/// Content-Type: application/json
///
/// { "email": "jane@x.com", "firstName": "Jane", "lastName": "Doe", "role": "manager" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `403 Forbidden`: caller may not invite this role
/// - `409 Conflict`: Email already exists
/// - `500 Internal Server Error`: the email could not be sent (the invited
///   user is kept and can be re-sent)
pub async fn issue(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<IssueRequest>,
) -> ApiResult<(StatusCode, axum::Json<IssueResponse>)> {
    req.validate()?;
    require_invite_permission(&auth, req.role)?;

    let issued = invitation::issue(
        state.store.as_ref(),
        state.mailer.as_ref(),
        state.invitation_settings(),
        NewInvitation {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            role: req.role,
        },
        Utc::now(),
    )
    .await?;

    info!(invited_by = %auth.user_id, user_id = %issued.user_id, "Invitation created");

    Ok((
        StatusCode::CREATED,
        axum::Json(IssueResponse {
            user_id: issued.user_id,
            email: issued.email,
            role: issued.role,
            expires_at: issued.expires_at,
        }),
    ))
}

/// Re-send an invitation with a fresh token
///
/// ```text
/// POST /v1/invitations/:id/resend
/// Authorization: Bearer <token>
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Account has already been set up
/// - `403 Forbidden`: caller may not invite the user's role
/// - `404 Not Found`: User not found
pub async fn resend(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<axum::Json<ResendResponse>> {
    let user = state
        .store
        .find_by_id(user_id)
        .await?
        .ok_or(ApiError::from(InvitationError::UserNotFound))?;

    require_invite_permission(&auth, user.role)?;

    let issued = invitation::reissue(
        state.store.as_ref(),
        state.mailer.as_ref(),
        state.invitation_settings(),
        &user,
        Utc::now(),
    )
    .await?;

    info!(resent_by = %auth.user_id, user_id = %issued.user_id, "Invitation re-sent");

    Ok(axum::Json(ResendResponse {
        user_id: issued.user_id,
        expires_at: issued.expires_at,
    }))
}
