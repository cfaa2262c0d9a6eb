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
use crate::types::TechStack;

pub async fn list_tech_stack(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let cursor = params.cursor.as_deref().unwrap_or("");

    let entries = store
        .list_tech_stack(cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list tech stack")?;

    let (entries, next_cursor, has_more) =
        paginate(entries, DEFAULT_PAGE_SIZE as usize, |t| t.name.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(entries, next_cursor, has_more)))
}

pub async fn create_tech_stack(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNamedRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_name(&req.name)?;

    if store
        .get_tech_stack_by_name(&req.name)
        .api_err("Failed to check tech stack entry")?
        .is_some()
    {
        return Err(ApiError::conflict("Tech stack entry already exists"));
    }

    let tech = TechStack {
        id: Uuid::new_v4().to_string(),
        name: req.name,
    };

    store
        .create_tech_stack(&tech)
        .api_err("Failed to create tech stack entry")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(tech))))
}

pub async fn get_tech_stack(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let tech = store
        .get_tech_stack(&id)
        .api_err("Failed to get tech stack entry")?
        .or_not_found("Tech stack entry not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tech)))
}

pub async fn update_tech_stack(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateNamedRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let mut tech = store
        .get_tech_stack(&id)
        .api_err("Failed to get tech stack entry")?
        .or_not_found("Tech stack entry not found")?;

    validate_name(&req.name)?;

    if req.name != tech.name
        && store
            .get_tech_stack_by_name(&req.name)
            .api_err("Failed to check tech stack name")?
            .is_some()
    {
        return Err(ApiError::conflict("Tech stack name already exists"));
    }
    tech.name = req.name;

    store
        .update_tech_stack(&tech)
        .api_err("Failed to update tech stack entry")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tech)))
}

pub async fn delete_tech_stack(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<DeleteNamedParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let tech = store
        .get_tech_stack(&id)
        .api_err("Failed to get tech stack entry")?
        .or_not_found("Tech stack entry not found")?;

    let usage = store
        .count_tech_stack_usage(&tech.id)
        .api_err("Failed to count tech stack usage")?;

    if usage > 0 && params.force != Some(true) {
        return Err(ApiError::conflict(
            "Tech stack entry is in use. Use ?force=true to delete anyway",
        ));
    }

    store
        .delete_tech_stack(&tech.id)
        .api_err("Failed to delete tech stack entry")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
