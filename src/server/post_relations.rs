use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::auth::middleware::RequireUser;
use crate::server::AppState;
use crate::server::dto::{RelationIdsRequest, ToggleRequest};
use crate::server::posts::require_author;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::store::Store;
use crate::types::Post;

fn load_post(store: &dyn Store, id: &str) -> Result<Post, ApiError> {
    store
        .get_post(id)
        .api_err("Failed to get post")?
        .or_not_found("Post not found")
}

fn validate_project_ids(store: &dyn Store, ids: &[String]) -> Result<(), ApiError> {
    for project_id in ids {
        store
            .get_project(project_id)
            .api_err("Failed to get project")?
            .ok_or_else(|| ApiError::not_found(format!("Project not found: {project_id}")))?;
    }
    Ok(())
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

// Projects

pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = load_post(store, &id)?;

    let projects = store
        .list_post_projects(&post.id)
        .api_err("Failed to list post projects")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(projects)))
}

pub async fn add_projects(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RelationIdsRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = load_post(store, &id)?;

    require_author(&auth.user, &post)?;
    validate_project_ids(store, &req.ids)?;

    for project_id in &req.ids {
        store
            .add_post_project(&post.id, project_id)
            .api_err("Failed to add post project")?;
    }

    let projects = store
        .list_post_projects(&post.id)
        .api_err("Failed to list post projects")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(projects)))
}

pub async fn set_projects(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RelationIdsRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = load_post(store, &id)?;

    require_author(&auth.user, &post)?;
    validate_project_ids(store, &req.ids)?;

    store
        .set_post_projects(&post.id, &req.ids)
        .api_err("Failed to set post projects")?;

    let projects = store
        .list_post_projects(&post.id)
        .api_err("Failed to list post projects")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(projects)))
}

pub async fn toggle_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ToggleRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = load_post(store, &id)?;

    require_author(&auth.user, &post)?;
    validate_project_ids(store, std::slice::from_ref(&req.id))?;

    let linked = store
        .toggle_post_project(&post.id, &req.id)
        .api_err("Failed to toggle post project")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(json!({ "linked": linked }))))
}

pub async fn remove_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((id, project_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = load_post(store, &id)?;

    require_author(&auth.user, &post)?;

    store
        .get_project(&project_id)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    store
        .remove_post_project(&post.id, &project_id)
        .api_err("Failed to remove post project")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

// Tags

pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = load_post(store, &id)?;

    let tags = store
        .list_post_tags(&post.id)
        .api_err("Failed to list post tags")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tags)))
}

pub async fn add_tags(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RelationIdsRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = load_post(store, &id)?;

    require_author(&auth.user, &post)?;
    validate_tag_ids(store, &req.ids)?;

    for tag_id in &req.ids {
        store
            .add_post_tag(&post.id, tag_id)
            .api_err("Failed to add post tag")?;
    }

    let tags = store
        .list_post_tags(&post.id)
        .api_err("Failed to list post tags")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tags)))
}

pub async fn set_tags(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RelationIdsRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = load_post(store, &id)?;

    require_author(&auth.user, &post)?;
    validate_tag_ids(store, &req.ids)?;

    store
        .set_post_tags(&post.id, &req.ids)
        .api_err("Failed to set post tags")?;

    let tags = store
        .list_post_tags(&post.id)
        .api_err("Failed to list post tags")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tags)))
}

pub async fn toggle_tag(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ToggleRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = load_post(store, &id)?;

    require_author(&auth.user, &post)?;
    validate_tag_ids(store, std::slice::from_ref(&req.id))?;

    let linked = store
        .toggle_post_tag(&post.id, &req.id)
        .api_err("Failed to toggle post tag")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(json!({ "linked": linked }))))
}

pub async fn remove_tag(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((id, tag_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = load_post(store, &id)?;

    require_author(&auth.user, &post)?;

    store
        .get_tag(&tag_id)
        .api_err("Failed to get tag")?
        .or_not_found("Tag not found")?;

    store
        .remove_post_tag(&post.id, &tag_id)
        .api_err("Failed to remove post tag")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

// Tech stack

pub async fn list_tech(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = load_post(store, &id)?;

    let tech = store
        .list_post_tech(&post.id)
        .api_err("Failed to list post tech stack")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tech)))
}

pub async fn add_tech(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RelationIdsRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = load_post(store, &id)?;

    require_author(&auth.user, &post)?;
    validate_tech_ids(store, &req.ids)?;

    for tech_id in &req.ids {
        store
            .add_post_tech(&post.id, tech_id)
            .api_err("Failed to add post tech stack entry")?;
    }

    let tech = store
        .list_post_tech(&post.id)
        .api_err("Failed to list post tech stack")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tech)))
}

pub async fn set_tech(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RelationIdsRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = load_post(store, &id)?;

    require_author(&auth.user, &post)?;
    validate_tech_ids(store, &req.ids)?;

    store
        .set_post_tech(&post.id, &req.ids)
        .api_err("Failed to set post tech stack")?;

    let tech = store
        .list_post_tech(&post.id)
        .api_err("Failed to list post tech stack")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tech)))
}

pub async fn toggle_tech(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ToggleRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = load_post(store, &id)?;

    require_author(&auth.user, &post)?;
    validate_tech_ids(store, std::slice::from_ref(&req.id))?;

    let linked = store
        .toggle_post_tech(&post.id, &req.id)
        .api_err("Failed to toggle post tech stack entry")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(json!({ "linked": linked }))))
}

pub async fn remove_tech(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((id, tech_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = load_post(store, &id)?;

    require_author(&auth.user, &post)?;

    store
        .get_tech_stack(&tech_id)
        .api_err("Failed to get tech stack entry")?
        .or_not_found("Tech stack entry not found")?;

    store
        .remove_post_tech(&post.id, &tech_id)
        .api_err("Failed to remove post tech stack entry")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
