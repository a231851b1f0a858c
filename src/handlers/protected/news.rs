// handlers/protected/news.rs - /api/admin/news

use axum::extract::State;
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, Authenticated, JsonBody, PathParam, QueryParams};
use crate::services::news::{NewsArticle, NewsFilter, NewsInput};
use crate::state::AppState;

/// GET /api/admin/news?status&category_id&limit&offset - every status
pub async fn news_list(
    State(state): State<AppState>,
    session: Authenticated,
    QueryParams(filter): QueryParams<NewsFilter>,
) -> ApiResult<Vec<NewsArticle>> {
    let news = state.news().list(session.principal(), &filter).await?;
    Ok(ApiResponse::success(news))
}

pub async fn news_get(
    State(state): State<AppState>,
    session: Authenticated,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<NewsArticle> {
    let article = state.news().get(session.principal(), id).await?;
    Ok(ApiResponse::success(article))
}

/// POST /api/admin/news - the `pt` translation is required
pub async fn news_post(
    State(state): State<AppState>,
    session: Authenticated,
    JsonBody(input): JsonBody<NewsInput>,
) -> ApiResult<NewsArticle> {
    let created = state.news().create(session.principal(), input).await?;
    Ok(ApiResponse::created(created.into_inner()))
}

pub async fn news_put(
    State(state): State<AppState>,
    session: Authenticated,
    PathParam(id): PathParam<Uuid>,
    JsonBody(input): JsonBody<NewsInput>,
) -> ApiResult<NewsArticle> {
    let updated = state.news().update(session.principal(), id, input).await?;
    Ok(ApiResponse::success(updated.into_inner()))
}

pub async fn news_delete(
    State(state): State<AppState>,
    session: Authenticated,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<NewsArticle> {
    let deleted = state.news().delete(session.principal(), id).await?;
    Ok(ApiResponse::success(deleted.into_inner()))
}
