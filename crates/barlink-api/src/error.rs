use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use barlink_db::StorageError;
use barlink_types::conversation::ConversationKeyError;

/// Request-level errors, rendered as a structured JSON body
/// `{"error": <stable code>, "message": <human text>}`.
///
/// Upstream failure detail is logged server-side and never echoed to the
/// client; the `Upstream` variant deliberately carries no message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("upstream service unavailable")]
    Upstream,
}

impl ApiError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Upstream => "upstream_unavailable",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Conflict => ApiError::Conflict("entity"),
            StorageError::NotFound => ApiError::NotFound("entity"),
            StorageError::InvalidFilter(msg) => {
                ApiError::InvalidRequest(format!("invalid filter expression: {msg}"))
            }
            StorageError::Unavailable(detail) => {
                error!("storage call failed: {detail}");
                ApiError::Upstream
            }
        }
    }
}

impl From<ConversationKeyError> for ApiError {
    fn from(e: ConversationKeyError) -> Self {
        ApiError::InvalidRequest(e.to_string())
    }
}

pub(crate) fn join_error(e: tokio::task::JoinError) -> ApiError {
    error!("spawn_blocking join error: {e}");
    ApiError::Upstream
}

/// Pull a required request field; absence or emptiness is a 400, never a 500.
pub(crate) fn require(field: Option<String>, name: &str) -> Result<String, ApiError> {
    match field {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::InvalidRequest(format!(
            "missing required field '{name}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_is_invalid_request() {
        assert!(matches!(
            require(None, "user"),
            Err(ApiError::InvalidRequest(_))
        ));
        assert!(matches!(
            require(Some(String::new()), "user"),
            Err(ApiError::InvalidRequest(_))
        ));
        assert_eq!(require(Some("alice".into()), "user").unwrap(), "alice");
    }

    #[test]
    fn storage_errors_map_to_distinct_kinds() {
        assert!(matches!(
            ApiError::from(StorageError::Conflict),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(StorageError::NotFound),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(StorageError::InvalidFilter("x".into())),
            ApiError::InvalidRequest(_)
        ));
        // Upstream detail is swallowed from the client-facing error.
        let e = ApiError::from(StorageError::Unavailable("secret detail".into()));
        assert!(matches!(e, ApiError::Upstream));
        assert!(!e.to_string().contains("secret"));
    }
}
