use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::middleware::RequireUser;
use crate::server::AppState;
use crate::server::dto::{RelationIdsRequest, ToggleRequest};
use crate::server::projects::require_owner;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::store::Store;
use crate::types::Project;
use serde_json::json;

fn load_project(store: &dyn Store, id: &str) -> Result<Project, ApiError> {
    store
        .get_project(id)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")
}

fn validate_tag_ids(store: &dyn Store, ids: &[String]) -> Result<(), ApiError> {
    for tag_id in ids {
        store
            .get_tag(tag_id)
            .api_err("Failed to get tag")?
            .ok_or_else(|| ApiError::not_found(format!("Tag not found: {tag_id}")))?;
    }
    Ok(())
}

fn validate_tech_ids(store: &dyn Store, ids: &[String]) -> Result<(), ApiError> {
    for tech_id in ids {
        store
            .get_tech_stack(tech_id)
            .api_err("Failed to get tech stack entry")?
            .ok_or_else(|| ApiError::not_found(format!("Tech stack entry not found: {tech_id}")))?;
    }
    Ok(())
}

// Tags

pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let project = load_project(store, &id)?;

    let tags = store
        .list_project_tags(&project.id)
        .api_err("Failed to list project tags")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tags)))
}

pub async fn add_tags(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RelationIdsRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let project = load_project(store, &id)?;

    require_owner(&auth.user, &project)?;
    validate_tag_ids(store, &req.ids)?;

    for tag_id in &req.ids {
        store
            .add_project_tag(&project.id, tag_id)
            .api_err("Failed to add project tag")?;
    }

    let tags = store
        .list_project_tags(&project.id)
        .api_err("Failed to list project tags")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tags)))
}

pub async fn set_tags(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RelationIdsRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let project = load_project(store, &id)?;

    require_owner(&auth.user, &project)?;
    validate_tag_ids(store, &req.ids)?;

    store
        .set_project_tags(&project.id, &req.ids)
        .api_err("Failed to set project tags")?;

    let tags = store
        .list_project_tags(&project.id)
        .api_err("Failed to list project tags")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tags)))
}

pub async fn toggle_tag(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ToggleRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let project = load_project(store, &id)?;

    require_owner(&auth.user, &project)?;
    validate_tag_ids(store, std::slice::from_ref(&req.id))?;

    let linked = store
        .toggle_project_tag(&project.id, &req.id)
        .api_err("Failed to toggle project tag")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(json!({ "linked": linked }))))
}

pub async fn remove_tag(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((id, tag_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let project = load_project(store, &id)?;

    require_owner(&auth.user, &project)?;

    store
        .get_tag(&tag_id)
        .api_err("Failed to get tag")?
        .or_not_found("Tag not found")?;

    store
        .remove_project_tag(&project.id, &tag_id)
        .api_err("Failed to remove project tag")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

// Tech stack

pub async fn list_tech(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let project = load_project(store, &id)?;

    let tech = store
        .list_project_tech(&project.id)
        .api_err("Failed to list project tech stack")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tech)))
}

pub async fn add_tech(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RelationIdsRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let project = load_project(store, &id)?;

    require_owner(&auth.user, &project)?;
    validate_tech_ids(store, &req.ids)?;

    for tech_id in &req.ids {
        store
            .add_project_tech(&project.id, tech_id)
            .api_err("Failed to add project tech stack entry")?;
    }

    let tech = store
        .list_project_tech(&project.id)
        .api_err("Failed to list project tech stack")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tech)))
}

pub async fn set_tech(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RelationIdsRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let project = load_project(store, &id)?;

    require_owner(&auth.user, &project)?;
    validate_tech_ids(store, &req.ids)?;

    store
        .set_project_tech(&project.id, &req.ids)
        .api_err("Failed to set project tech stack")?;

    let tech = store
        .list_project_tech(&project.id)
        .api_err("Failed to list project tech stack")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tech)))
}

pub async fn toggle_tech(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ToggleRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let project = load_project(store, &id)?;

    require_owner(&auth.user, &project)?;
    validate_tech_ids(store, std::slice::from_ref(&req.id))?;

    let linked = store
        .toggle_project_tech(&project.id, &req.id)
        .api_err("Failed to toggle project tech stack entry")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(json!({ "linked": linked }))))
}

pub async fn remove_tech(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((id, tech_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let project = load_project(store, &id)?;

    require_owner(&auth.user, &project)?;

    store
        .get_tech_stack(&tech_id)
        .api_err("Failed to get tech stack entry")?
        .or_not_found("Tech stack entry not found")?;

    store
        .remove_project_tech(&project.id, &tech_id)
        .api_err("Failed to remove project tech stack entry")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
