use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::middleware::RequireUser;
use crate::server::AppState;
use crate::server::dto::{CreateProjectRequest, PaginationParams, UpdateProjectRequest};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::server::validation::{validate_repo_url, validate_title};
use crate::store::Store;
use crate::types::{Project, ProjectWithRelations, User};

pub(super) fn with_relations(
    store: &dyn Store,
    project: Project,
) -> Result<ProjectWithRelations, ApiError> {
    let tags = store
        .list_project_tags(&project.id)
        .api_err("Failed to list project tags")?;
    let tech_stack = store
        .list_project_tech(&project.id)
        .api_err("Failed to list project tech stack")?;

    Ok(ProjectWithRelations {
        project,
        tags,
        tech_stack,
    })
}

pub(super) fn require_owner(user: &User, project: &Project) -> Result<(), ApiError> {
    if project.user_id != user.id {
        return Err(ApiError::forbidden("Only the project owner can do that"));
    }
    Ok(())
}

pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let cursor = params.cursor.as_deref().unwrap_or("");

    let projects = store
        .list_projects(cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list projects")?;

    let (projects, next_cursor, has_more) = paginate(projects, DEFAULT_PAGE_SIZE as usize, |p| {
        p.date_created.to_rfc3339()
    });

    let projects = projects
        .into_iter()
        .map(|p| with_relations(store, p))
        .collect::<Result<Vec<_>, _>>()?;

    Ok::<_, ApiError>(Json(PaginatedResponse::new(projects, next_cursor, has_more)))
}

pub async fn create_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProjectRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_title(&req.title)?;
    validate_repo_url(&req.repo_url)?;

    if store
        .get_project_by_repo_url(&req.repo_url)
        .api_err("Failed to check repository URL")?
        .is_some()
    {
        return Err(ApiError::conflict(
            "A project already tracks this repository",
        ));
    }

    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4().to_string(),
        user_id: auth.user.id,
        title: req.title,
        description: req.description,
        status: req.status.unwrap_or_default(),
        repo_url: req.repo_url,
        deploy_url: req.deploy_url,
        date_created: now,
        last_update: now,
    };

    store
        .create_project(&project)
        .api_err("Failed to create project")?;

    let body = with_relations(store, project)?;
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(body))))
}

pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let project = store
        .get_project(&id)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(with_relations(store, project)?)))
}

pub async fn update_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProjectRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let mut project = store
        .get_project(&id)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    require_owner(&auth.user, &project)?;

    if let Some(title) = req.title {
        validate_title(&title)?;
        project.title = title;
    }
    if let Some(description) = req.description {
        project.description = description;
    }
    if let Some(status) = req.status {
        project.status = status;
    }
    if let Some(deploy_url) = req.deploy_url {
        project.deploy_url = deploy_url;
    }
    project.last_update = Utc::now();

    store
        .update_project(&project)
        .api_err("Failed to update project")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(with_relations(store, project)?)))
}

pub async fn delete_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let project = store
        .get_project(&id)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    require_owner(&auth.user, &project)?;

    store
        .delete_project(&project.id)
        .api_err("Failed to delete project")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
