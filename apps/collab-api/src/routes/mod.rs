pub mod health;
pub mod projects;

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::collab::server::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api/v1", projects::router())
        .fallback(not_found)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Collaboration
        projects::project_status,
        projects::collab_stats,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            // Route request/response types
            health::HealthResponse,
            crate::collab::ProjectStatus,
            crate::collab::CollabStats,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Collaboration", description = "Real-time project sessions"),
    )
)]
pub struct ApiDoc;
