/// Staff login
///
/// # Endpoints
///
/// - `POST /v1/auth/login` - Exchange email and password for an access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::Json,
};
use axum::extract::State;
use keystone_shared::{
    auth::{jwt, password},
    models::user::UserRole,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: String,
    pub role: UserRole,

    /// Access token (24h)
    pub access_token: String,
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid email or password".to_string())
}

/// Login endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "admin@example.com",
///   "password": "s3cret!"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "userId": "uuid",
///   "role": "admin",
///   "accessToken": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Unknown email, wrong password, or an account that
///   has not been set up or is deactivated (all reported identically)
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<axum::Json<LoginResponse>> {
    req.validate()?;

    let user = state
        .store
        .find_by_email(&req.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    let Some(hash) = user.password_hash.clone() else {
        debug!(user_id = %user.id, "Login attempt before account setup");
        return Err(invalid_credentials());
    };

    if !user.is_email_verified || !user.is_active {
        debug!(user_id = %user.id, "Login attempt on inactive account");
        return Err(invalid_credentials());
    }

    let plaintext = req.password;
    let valid = tokio::task::spawn_blocking(move || password::verify_password(&plaintext, &hash))
        .await
        .map_err(|e| ApiError::InternalError(format!("Password task failed: {}", e)))??;

    if !valid {
        return Err(invalid_credentials());
    }

    let claims = jwt::Claims::new(user.id, user.role);
    let access_token = jwt::create_token(&claims, state.jwt_secret())?;

    info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(axum::Json(LoginResponse {
        user_id: user.id.to_string(),
        role: user.role,
        access_token,
    }))
}
