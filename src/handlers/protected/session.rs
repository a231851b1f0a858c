// handlers/protected/session.rs - POST /api/auth/logout, GET /api/auth/me

use axum::extract::State;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, Authenticated};
use crate::services::users::AdminUser;
use crate::state::AppState;

/// Tokens are stateless, so the client simply discards its copy.
pub async fn logout_post(State(state): State<AppState>, session: Authenticated) -> ApiResult<Value> {
    let _ = state.sessions().logout(session.principal()).await?;
    Ok(ApiResponse::success(json!({ "logged_out": true })))
}

pub async fn me_get(State(state): State<AppState>, session: Authenticated) -> ApiResult<AdminUser> {
    let user = state.sessions().me(session.principal()).await?;
    Ok(ApiResponse::success(user))
}
