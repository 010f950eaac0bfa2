//! API route handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use roster_cache::CacheStats;
use roster_core::types::{NewUser, User, UserId};

use crate::dto::*;
use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

fn parse_id(raw: &str) -> Result<UserId> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid user id: {}", raw)))
}

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

/// POST /user
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateUserResponse>)> {
    let new_user = body(payload)?;
    let id = state.users.create_user(new_user).await?;
    Ok((StatusCode::CREATED, Json(CreateUserResponse { id })))
}

/// GET /user/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<User>> {
    let id = parse_id(&id)?;
    let user = state.users.get_user(id).await?;
    debug!(%id, "Served user");
    Ok(Json(user))
}

/// PUT /user
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<User>, JsonRejection>,
) -> Result<StatusCode> {
    let user = body(payload)?;
    state.users.update_user(user).await?;
    Ok(StatusCode::OK)
}

/// DELETE /user/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_id(&id)?;
    state.users.delete_user(id).await?;
    Ok(StatusCode::OK)
}

/// GET /cache/stats
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        cached_entries: state.cache.len(),
        cache_ttl_secs: state.cache.ttl().as_secs(),
    })
}
