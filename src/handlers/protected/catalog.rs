// handlers/protected/catalog.rs - Categories, partners and segments
//
// Flat tables sharing the same create/update/delete shape.

use axum::extract::State;
use uuid::Uuid;

use crate::auth::{authorize, Access};
use crate::middleware::{ApiResponse, ApiResult, Authenticated, JsonBody, PathParam};
use crate::services::categories::{Category, CategoryInput};
use crate::services::partners::{Partner, PartnerInput};
use crate::services::segments::{Segment, SegmentInput};
use crate::state::AppState;

// Categories

pub async fn categories_list(State(state): State<AppState>, session: Authenticated) -> ApiResult<Vec<Category>> {
    authorize(session.principal(), Access::Authenticated)?;
    Ok(ApiResponse::success(state.categories().list().await?))
}

pub async fn category_post(
    State(state): State<AppState>,
    session: Authenticated,
    JsonBody(input): JsonBody<CategoryInput>,
) -> ApiResult<Category> {
    let created = state.categories().create(session.principal(), input).await?;
    Ok(ApiResponse::created(created.into_inner()))
}

pub async fn category_put(
    State(state): State<AppState>,
    session: Authenticated,
    PathParam(id): PathParam<Uuid>,
    JsonBody(input): JsonBody<CategoryInput>,
) -> ApiResult<Category> {
    let updated = state.categories().update(session.principal(), id, input).await?;
    Ok(ApiResponse::success(updated.into_inner()))
}

pub async fn category_delete(
    State(state): State<AppState>,
    session: Authenticated,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Category> {
    let deleted = state.categories().delete(session.principal(), id).await?;
    Ok(ApiResponse::success(deleted.into_inner()))
}

// Partners

pub async fn partners_list(State(state): State<AppState>, session: Authenticated) -> ApiResult<Vec<Partner>> {
    Ok(ApiResponse::success(state.partners().list(session.principal()).await?))
}

pub async fn partner_post(
    State(state): State<AppState>,
    session: Authenticated,
    JsonBody(input): JsonBody<PartnerInput>,
) -> ApiResult<Partner> {
    let created = state.partners().create(session.principal(), input).await?;
    Ok(ApiResponse::created(created.into_inner()))
}

pub async fn partner_put(
    State(state): State<AppState>,
    session: Authenticated,
    PathParam(id): PathParam<Uuid>,
    JsonBody(input): JsonBody<PartnerInput>,
) -> ApiResult<Partner> {
    let updated = state.partners().update(session.principal(), id, input).await?;
    Ok(ApiResponse::success(updated.into_inner()))
}

pub async fn partner_delete(
    State(state): State<AppState>,
    session: Authenticated,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Partner> {
    let deleted = state.partners().delete(session.principal(), id).await?;
    Ok(ApiResponse::success(deleted.into_inner()))
}

// Segments

pub async fn segments_list(State(state): State<AppState>, session: Authenticated) -> ApiResult<Vec<Segment>> {
    Ok(ApiResponse::success(state.segments().list(session.principal()).await?))
}

pub async fn segment_post(
    State(state): State<AppState>,
    session: Authenticated,
    JsonBody(input): JsonBody<SegmentInput>,
) -> ApiResult<Segment> {
    let created = state.segments().create(session.principal(), input).await?;
    Ok(ApiResponse::created(created.into_inner()))
}

pub async fn segment_put(
    State(state): State<AppState>,
    session: Authenticated,
    PathParam(id): PathParam<Uuid>,
    JsonBody(input): JsonBody<SegmentInput>,
) -> ApiResult<Segment> {
    let updated = state.segments().update(session.principal(), id, input).await?;
    Ok(ApiResponse::success(updated.into_inner()))
}

pub async fn segment_delete(
    State(state): State<AppState>,
    session: Authenticated,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Segment> {
    let deleted = state.segments().delete(session.principal(), id).await?;
    Ok(ApiResponse::success(deleted.into_inner()))
}
