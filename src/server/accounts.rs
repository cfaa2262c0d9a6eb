use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::TokenGenerator;
use crate::auth::middleware::RequireUser;
use crate::auth::password::{hash_password, verify_password};
use crate::server::AppState;
use crate::server::dto::{AuthResponse, LoginRequest, RegisterRequest};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::{validate_password, validate_username};
use crate::store::Store;
use crate::types::{Token, User};

const TOKEN_CREATE_ATTEMPTS: usize = 3;

/// Issues a token for the user, retrying on the unlikely lookup-prefix
/// collision.
fn issue_token(store: &dyn Store, user_id: &str) -> Result<String, ApiError> {
    let generator = TokenGenerator::new();

    for _ in 0..TOKEN_CREATE_ATTEMPTS {
        let (raw_token, lookup, hash) = generator
            .generate()
            .map_err(|_| ApiError::internal("Failed to generate token"))?;

        let token = Token {
            id: Uuid::new_v4().to_string(),
            token_hash: hash,
            token_lookup: lookup,
            user_id: user_id.to_string(),
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };

        match store.create_token(&token) {
            Ok(()) => return Ok(raw_token),
            Err(crate::error::Error::TokenLookupCollision) => continue,
            Err(_) => return Err(ApiError::internal("Failed to store token")),
        }
    }

    Err(ApiError::internal("Failed to store token"))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_username(&req.username)?;
    validate_password(&req.password)?;

    if store
        .get_user_by_username(&req.username)
        .api_err("Failed to check username")?
        .is_some()
    {
        return Err(ApiError::conflict("Username is already taken"));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        username: req.username,
        email: req.email,
        first_name: req.first_name.unwrap_or_default(),
        last_name: req.last_name.unwrap_or_default(),
        password_hash: hash_password(&req.password)
            .map_err(|_| ApiError::internal("Failed to hash password"))?,
        date_joined: Utc::now(),
        last_login: None,
    };

    store.create_user(&user).api_err("Failed to create user")?;

    let token = issue_token(store, &user.id)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(AuthResponse { token, user })),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    // Same error for unknown user and bad password
    let user = store
        .get_user_by_username(&req.username)
        .api_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    let valid = verify_password(&req.password, &user.password_hash)
        .map_err(|_| ApiError::internal("Failed to verify password"))?;
    if !valid {
        return Err(ApiError::unauthorized("Invalid username or password"));
    }

    store
        .update_user_last_login(&user.id)
        .api_err("Failed to update last login")?;

    let token = issue_token(store, &user.id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(AuthResponse { token, user })))
}

pub async fn logout(auth: RequireUser, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state
        .store
        .delete_token(&auth.token.id)
        .api_err("Failed to delete token")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn me(auth: RequireUser) -> impl IntoResponse {
    Json(ApiResponse::success(auth.user))
}
