// handlers/protected/testimonials.rs - /api/admin/testimonials

use axum::extract::State;
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, Authenticated, JsonBody, PathParam};
use crate::services::testimonials::{TestimonialInput, TestimonialWithTranslations};
use crate::state::AppState;

pub async fn testimonials_list(
    State(state): State<AppState>,
    session: Authenticated,
) -> ApiResult<Vec<TestimonialWithTranslations>> {
    let testimonials = state.testimonials().list(session.principal()).await?;
    Ok(ApiResponse::success(testimonials))
}

pub async fn testimonial_post(
    State(state): State<AppState>,
    session: Authenticated,
    JsonBody(input): JsonBody<TestimonialInput>,
) -> ApiResult<TestimonialWithTranslations> {
    let created = state.testimonials().create(session.principal(), input).await?;
    Ok(ApiResponse::created(created.into_inner()))
}

pub async fn testimonial_put(
    State(state): State<AppState>,
    session: Authenticated,
    PathParam(id): PathParam<Uuid>,
    JsonBody(input): JsonBody<TestimonialInput>,
) -> ApiResult<TestimonialWithTranslations> {
    let updated = state.testimonials().update(session.principal(), id, input).await?;
    Ok(ApiResponse::success(updated.into_inner()))
}

pub async fn testimonial_delete(
    State(state): State<AppState>,
    session: Authenticated,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<TestimonialWithTranslations> {
    let deleted = state.testimonials().delete(session.principal(), id).await?;
    Ok(ApiResponse::success(deleted.into_inner()))
}
