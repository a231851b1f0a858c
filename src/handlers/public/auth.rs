// handlers/public/auth.rs - POST /api/auth/login

use axum::{extract::State, http::HeaderMap};
use chrono::Utc;
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::{forwarded_for, ApiResponse, ApiResult, JsonBody};
use crate::services::sessions::LoginResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/login - Exchange credentials for a session token
///
/// Attempts are counted per client address (or per e-mail when no proxy header
/// is present). Over the limit the request is refused before any credential check.
pub async fn login_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let client = forwarded_for(&headers).unwrap_or_else(|| payload.email.trim().to_lowercase());
    let key = format!("login:{}", client);

    let now = Utc::now();
    let decision = state.rate_limiter.check_at(&key, state.login_limit(), now);
    if !decision.success {
        tracing::warn!("Login rate limit hit for {}", key);
        return Err(ApiError::too_many_requests(
            "Too many login attempts. Try again later.",
            decision.retry_after_secs(now),
        ));
    }

    let response = state.sessions().login(&payload.email, &payload.password).await?;
    Ok(ApiResponse::success(response))
}
