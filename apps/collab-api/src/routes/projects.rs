//! Read-only views of the collaboration registry.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::collab::{CollabError, CollabStats, ProjectStatus};
use crate::error::{ApiError, ApiErrorBody};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/collab/projects/{project_id}/status", get(project_status))
        .route("/collab/stats", get(collab_stats))
}

// ---------------------------------------------------------------------------
// GET /api/v1/collab/projects/:project_id/status
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/collab/projects/{project_id}/status",
    tag = "Collaboration",
    params(
        ("project_id" = String, Path, description = "Project ID"),
    ),
    responses(
        (status = 200, description = "Session status (inactive if no one is editing)", body = ProjectStatus),
        (status = 400, description = "Blank project ID", body = ApiErrorBody),
    ),
)]
pub async fn project_status(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectStatus>, ApiError> {
    if project_id.trim().is_empty() {
        return Err(CollabError::invalid("projectId is required").into());
    }
    Ok(Json(state.coordinator.status(&project_id)))
}

// ---------------------------------------------------------------------------
// GET /api/v1/collab/stats
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/collab/stats",
    tag = "Collaboration",
    responses(
        (status = 200, description = "Active project sessions", body = CollabStats),
    ),
)]
pub async fn collab_stats(State(state): State<AppState>) -> Json<CollabStats> {
    Json(state.coordinator.stats())
}
