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
use crate::server::dto::{CreatePostRequest, PaginationParams, UpdatePostRequest};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::server::validation::validate_title;
use crate::store::Store;
use crate::types::{Post, PostWithRelations, User};

pub(super) fn with_relations(
    store: &dyn Store,
    post: Post,
) -> Result<PostWithRelations, ApiError> {
    let projects = store
        .list_post_projects(&post.id)
        .api_err("Failed to list post projects")?;
    let tags = store
        .list_post_tags(&post.id)
        .api_err("Failed to list post tags")?;
    let tech_stack = store
        .list_post_tech(&post.id)
        .api_err("Failed to list post tech stack")?;

    Ok(PostWithRelations {
        post,
        projects,
        tags,
        tech_stack,
    })
}

pub(super) fn require_author(user: &User, post: &Post) -> Result<(), ApiError> {
    if post.user_id != user.id {
        return Err(ApiError::forbidden("Only the post author can do that"));
    }
    Ok(())
}

pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let cursor = params.cursor.as_deref().unwrap_or("");

    let posts = store
        .list_posts(cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list posts")?;

    let (posts, next_cursor, has_more) = paginate(posts, DEFAULT_PAGE_SIZE as usize, |p| {
        p.date_created.to_rfc3339()
    });

    let posts = posts
        .into_iter()
        .map(|p| with_relations(store, p))
        .collect::<Result<Vec<_>, _>>()?;

    Ok::<_, ApiError>(Json(PaginatedResponse::new(posts, next_cursor, has_more)))
}

pub async fn create_post(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePostRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_title(&req.title)?;

    let now = Utc::now();
    let post = Post {
        id: Uuid::new_v4().to_string(),
        user_id: auth.user.id,
        title: req.title,
        content: req.content,
        date_created: now,
        last_update: now,
    };

    store.create_post(&post).api_err("Failed to create post")?;

    let body = with_relations(store, post)?;
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(body))))
}

pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let post = store
        .get_post(&id)
        .api_err("Failed to get post")?
        .or_not_found("Post not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(with_relations(store, post)?)))
}

pub async fn update_post(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePostRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let mut post = store
        .get_post(&id)
        .api_err("Failed to get post")?
        .or_not_found("Post not found")?;

    require_author(&auth.user, &post)?;

    if let Some(title) = req.title {
        validate_title(&title)?;
        post.title = title;
    }
    if let Some(content) = req.content {
        post.content = content;
    }
    post.last_update = Utc::now();

    store.update_post(&post).api_err("Failed to update post")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(with_relations(store, post)?)))
}

pub async fn delete_post(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let post = store
        .get_post(&id)
        .api_err("Failed to get post")?
        .or_not_found("Post not found")?;

    require_author(&auth.user, &post)?;

    store
        .delete_post(&post.id)
        .api_err("Failed to delete post")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
