//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use addressbook_core::validation::{MSG_COLOR, MSG_LABEL_NAME_TAKEN};
use addressbook_core::FieldErrors;

/// SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE for check_violation.
const CHECK_VIOLATION: &str = "23514";
/// SQLSTATE for foreign_key_violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug)]
pub enum ApiError {
    Internal(String),
    NotFound(String),
    BadRequest(String),
    Validation(FieldErrors),
}

impl ApiError {
    pub fn not_found() -> Self {
        ApiError::NotFound("Not found.".to_string())
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        ApiError::Validation(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Constraint violations the client can fix, mapped to the field they concern.
fn constraint_field_error(db_err: &dyn sqlx::error::DatabaseError) -> Option<ApiError> {
    let code = db_err.code();
    let constraint = db_err.constraint();
    match (code.as_deref(), constraint) {
        (Some(UNIQUE_VIOLATION), Some("label_name_key")) => {
            Some(ApiError::field("name", MSG_LABEL_NAME_TAKEN))
        }
        (Some(CHECK_VIOLATION), Some("label_color_check")) => {
            Some(ApiError::field("color", MSG_COLOR))
        }
        // A label vanished between resolution and insert
        (Some(FOREIGN_KEY_VIOLATION), Some("contact_label_label_id_fkey")) => Some(
            ApiError::field("label_ids", "One or more labels no longer exist."),
        ),
        _ => None,
    }
}

impl From<addressbook_core::Error> for ApiError {
    fn from(err: addressbook_core::Error) -> Self {
        use addressbook_core::Error;

        match err {
            Error::NotFound(_) | Error::LabelNotFound(_) | Error::ContactNotFound(_) => {
                ApiError::not_found()
            }
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Validation(fields) => ApiError::Validation(fields),
            Error::Database(sqlx::Error::RowNotFound) => ApiError::not_found(),
            Error::Database(sqlx::Error::Database(ref db_err)) => {
                constraint_field_error(db_err.as_ref())
                    .unwrap_or_else(|| ApiError::Internal(err.to_string()))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = match self {
            ApiError::Internal(detail) => {
                tracing::error!(
                    subsystem = "api",
                    component = "error",
                    error = %detail,
                    "Request failed"
                );
                json!({ "error": "Internal server error" })
            }
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) => json!({ "error": msg }),
            ApiError::Validation(fields) => json!({
                "error": "Validation failed",
                "fields": fields,
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use addressbook_core::Error;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_not_found_variants_map_to_404() {
        for err in [
            Error::LabelNotFound(1),
            Error::ContactNotFound(2),
            Error::NotFound("x".to_string()),
            Error::Database(sqlx::Error::RowNotFound),
        ] {
            assert_eq!(ApiError::from(err).status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn test_invalid_input_maps_to_bad_request() {
        let api_err = ApiError::from(Error::InvalidInput("label_ids is required".to_string()));
        assert!(matches!(api_err, ApiError::BadRequest(ref m) if m == "label_ids is required"));
    }

    #[test]
    fn test_unexpected_database_error_is_internal() {
        let api_err = ApiError::from(Error::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(api_err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_validation_body_shape() {
        let api_err = ApiError::from(Error::field("color", MSG_COLOR));
        let (status, body) = body_json(api_err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"error": "Validation failed", "fields": {"color": [MSG_COLOR]}})
        );
    }

    #[tokio::test]
    async fn test_internal_body_hides_detail() {
        let (status, body) =
            body_json(ApiError::Internal("connection reset by peer".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Internal server error"}));
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let (status, body) = body_json(ApiError::not_found()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Not found."}));
    }
}
