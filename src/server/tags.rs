use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::auth::middleware::RequireUser;
use crate::server::AppState;
use crate::server::dto::{CreateNamedRequest, DeleteNamedParams, PaginationParams, UpdateNamedRequest};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::server::validation::validate_name;
use crate::types::Tag;

pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let cursor = params.cursor.as_deref().unwrap_or("");

    let tags = store
        .list_tags(cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list tags")?;

    let (tags, next_cursor, has_more) =
        paginate(tags, DEFAULT_PAGE_SIZE as usize, |t| t.name.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(tags, next_cursor, has_more)))
}

pub async fn create_tag(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNamedRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_name(&req.name)?;

    if store
        .get_tag_by_name(&req.name)
        .api_err("Failed to check tag")?
        .is_some()
    {
        return Err(ApiError::conflict("Tag already exists"));
    }

    let tag = Tag {
        id: Uuid::new_v4().to_string(),
        name: req.name,
    };

    store.create_tag(&tag).api_err("Failed to create tag")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(tag))))
}

pub async fn get_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let tag = store
        .get_tag(&id)
        .api_err("Failed to get tag")?
        .or_not_found("Tag not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tag)))
}

pub async fn update_tag(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateNamedRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let mut tag = store
        .get_tag(&id)
        .api_err("Failed to get tag")?
        .or_not_found("Tag not found")?;

    validate_name(&req.name)?;

    if req.name != tag.name
        && store
            .get_tag_by_name(&req.name)
            .api_err("Failed to check tag name")?
            .is_some()
    {
        return Err(ApiError::conflict("Tag name already exists"));
    }
    tag.name = req.name;

    store.update_tag(&tag).api_err("Failed to update tag")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tag)))
}

pub async fn delete_tag(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<DeleteNamedParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let tag = store
        .get_tag(&id)
        .api_err("Failed to get tag")?
        .or_not_found("Tag not found")?;

    let usage = store
        .count_tag_usage(&tag.id)
        .api_err("Failed to count tag usage")?;

    if usage > 0 && params.force != Some(true) {
        return Err(ApiError::conflict(
            "Tag is in use. Use ?force=true to delete anyway",
        ));
    }

    store.delete_tag(&tag.id).api_err("Failed to delete tag")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
