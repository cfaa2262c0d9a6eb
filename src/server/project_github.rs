use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::auth::middleware::RequireUser;
use crate::github::SyncService;
use crate::server::AppState;
use crate::server::dto::CreateFromGitHubRequest;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::projects::{require_owner, with_relations};
use crate::types::Project;

fn require_github(state: &AppState) -> Result<&Arc<SyncService>, ApiError> {
    state
        .github
        .as_ref()
        .ok_or_else(|| ApiError::unavailable("GitHub integration is not configured"))
}

/// Remote repositories not yet tracked by any project.
pub async fn list_available(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let github = require_github(&state)?;

    let repositories = github.available_repositories().await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(repositories)))
}

/// Creates a project from a remote repository through the regular
/// creation path.
pub async fn create_from_github(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateFromGitHubRequest>,
) -> impl IntoResponse {
    let github = require_github(&state)?;
    let store = state.store.as_ref();

    let draft = github.prepare_creation_data(&req.owner, &req.name).await?;

    if store
        .get_project_by_repo_url(&draft.repo_url)
        .api_err("Failed to check repository URL")?
        .is_some()
    {
        return Err(ApiError::conflict(
            "A project already tracks this repository",
        ));
    }

    let project = Project {
        id: Uuid::new_v4().to_string(),
        user_id: auth.user.id,
        title: draft.title,
        description: draft.description,
        status: draft.status,
        repo_url: draft.repo_url,
        deploy_url: None,
        date_created: draft.date_created,
        last_update: draft.last_update,
    };

    store
        .create_project(&project)
        .api_err("Failed to create project")?;

    let body = with_relations(store, project)?;
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(body))))
}

/// Refreshes title, description, and last-update from the remote
/// repository.
pub async fn sync(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let github = require_github(&state)?;
    let store = state.store.as_ref();

    let project = store
        .get_project(&id)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    require_owner(&auth.user, &project)?;

    let project = github.sync_project(project).await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(with_relations(store, project)?)))
}

/// Associates a TechStack entry for every detected language.
pub async fn sync_languages(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let github = require_github(&state)?;
    let store = state.store.as_ref();

    let project = store
        .get_project(&id)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    require_owner(&auth.user, &project)?;

    github.sync_languages(&project).await?;

    let tech = store
        .list_project_tech(&project.id)
        .api_err("Failed to list project tech stack")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tech)))
}

/// Associates a Tag for every repository topic.
pub async fn sync_topics(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let github = require_github(&state)?;
    let store = state.store.as_ref();

    let project = store
        .get_project(&id)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    require_owner(&auth.user, &project)?;

    github.sync_topics(&project).await?;

    let tags = store
        .list_project_tags(&project.id)
        .api_err("Failed to list project tags")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tags)))
}
