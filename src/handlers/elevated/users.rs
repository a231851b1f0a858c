// handlers/elevated/users.rs - /api/admin/users

use axum::extract::State;
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, Authenticated, JsonBody, PathParam};
use crate::services::users::{AdminUser, NewUserInput, UpdateUserInput};
use crate::state::AppState;

pub async fn users_list(State(state): State<AppState>, session: Authenticated) -> ApiResult<Vec<AdminUser>> {
    Ok(ApiResponse::success(state.users().list(session.principal()).await?))
}

pub async fn user_get(
    State(state): State<AppState>,
    session: Authenticated,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<AdminUser> {
    Ok(ApiResponse::success(state.users().get(session.principal(), id).await?))
}

pub async fn user_post(
    State(state): State<AppState>,
    session: Authenticated,
    JsonBody(input): JsonBody<NewUserInput>,
) -> ApiResult<AdminUser> {
    let created = state.users().create(session.principal(), input).await?;
    Ok(ApiResponse::created(created.into_inner()))
}

pub async fn user_put(
    State(state): State<AppState>,
    session: Authenticated,
    PathParam(id): PathParam<Uuid>,
    JsonBody(input): JsonBody<UpdateUserInput>,
) -> ApiResult<AdminUser> {
    let updated = state.users().update(session.principal(), id, input).await?;
    Ok(ApiResponse::success(updated.into_inner()))
}

/// Deleting your own account is refused before anything is read or written.
pub async fn user_delete(
    State(state): State<AppState>,
    session: Authenticated,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<AdminUser> {
    let deleted = state.users().delete(session.principal(), id).await?;
    Ok(ApiResponse::success(deleted.into_inner()))
}
