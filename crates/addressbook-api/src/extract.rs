//! Request extractors with addressbook error semantics.

use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::ApiError;

/// JSON body extractor that rejects with a 400 `{"error": ...}` body.
///
/// Covers syntax errors, type mismatches and a missing JSON content type.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// Numeric primary key from the `:id` path segment.
///
/// Anything that is not an integer is a 404, as if no row had matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pk(pub i64);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Pk
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::not_found())?;
        raw.trim()
            .parse::<i64>()
            .map(Pk)
            .map_err(|_| ApiError::not_found())
    }
}
