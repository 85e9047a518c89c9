/// Request extractors
///
/// [`Json`] wraps [`axum::Json`] so that a body which fails to parse is
/// answered in the API's own error format instead of axum's plain-text
/// rejection.

use crate::error::ApiError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use tracing::warn;

/// JSON request body
pub struct Json<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(inner)) => Ok(Json(inner)),
            Err(rejection) => Err(match rejection {
                JsonRejection::JsonDataError(e) => ApiError::BadRequest(e.body_text()),
                JsonRejection::JsonSyntaxError(e) => ApiError::BadRequest(e.body_text()),
                JsonRejection::MissingJsonContentType(_) => {
                    ApiError::BadRequest("Invalid content type".to_string())
                }
                JsonRejection::BytesRejection(e) => ApiError::BadRequest(e.body_text()),
                other => {
                    warn!("unhandled JSON rejection: {other:?}");
                    ApiError::BadRequest(other.body_text())
                }
            }),
        }
    }
}
