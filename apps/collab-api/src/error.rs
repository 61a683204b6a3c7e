//! HTTP error responses. Codes match the `code` field of WebSocket `error`
//! events so clients handle both surfaces the same way.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::collab::CollabError;

/// Body of every non-2xx response: `{ "error": { "code", "message" } }`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorDetail {
    /// `INVALID_REQUEST`, `NOT_JOINED`, `TRANSPORT_FAILURE` or `NOT_FOUND`.
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND",
            message: message.into(),
        }
    }
}

impl From<CollabError> for ApiError {
    fn from(err: CollabError) -> Self {
        let status = match err {
            CollabError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CollabError::NotJoined { .. } => StatusCode::CONFLICT,
            CollabError::TransportFailure { .. } => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collab_errors_keep_their_wire_code() {
        let err = ApiError::from(CollabError::invalid("projectId is required"));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "INVALID_REQUEST");
        assert_eq!(err.message, "invalid request: projectId is required");

        let err = ApiError::from(CollabError::not_joined("p"));
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, "NOT_JOINED");
    }

    #[test]
    fn not_found_renders_structured_body() {
        let resp = ApiError::not_found("Route not found").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
