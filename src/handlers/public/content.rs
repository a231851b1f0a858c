// handlers/public/content.rs - Public site content

use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;

use crate::handlers::parse_segment;
use crate::middleware::{ApiResponse, ApiResult, PathParam, QueryParams};
use crate::services::categories::Category;
use crate::services::news::{LocalizedNews, PublicNewsFilter};
use crate::services::partners::Partner;
use crate::services::segments::Segment;
use crate::services::testimonials::LocalizedTestimonial;
use crate::state::AppState;
use crate::types::Locale;

#[derive(Debug, Default, Deserialize)]
pub struct LocaleQuery {
    pub locale: Option<Locale>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartnerQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// GET /api/news?locale&category&limit&offset
pub async fn news_list(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<PublicNewsFilter>,
) -> ApiResult<Vec<LocalizedNews>> {
    let news = state.news().list_published(&filter).await?;
    Ok(ApiResponse::success(news))
}

/// GET /api/news/:slug?locale
pub async fn news_get(
    State(state): State<AppState>,
    PathParam(slug): PathParam<String>,
    QueryParams(query): QueryParams<LocaleQuery>,
) -> ApiResult<LocalizedNews> {
    let locale = query.locale.unwrap_or(Locale::FALLBACK);
    let article = state.news().get_published(&slug, locale).await?;
    Ok(ApiResponse::success(article))
}

/// GET /api/categories
pub async fn categories_list(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    Ok(ApiResponse::success(state.categories().list().await?))
}

/// GET /api/partners?type
pub async fn partners_list(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PartnerQuery>,
) -> ApiResult<Vec<Partner>> {
    let partners = state.partners().list_public(query.kind.as_deref()).await?;
    Ok(ApiResponse::success(partners))
}

/// GET /api/testimonials?locale
pub async fn testimonials_list(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<LocaleQuery>,
) -> ApiResult<Vec<LocalizedTestimonial>> {
    let locale = query.locale.unwrap_or(Locale::FALLBACK);
    let testimonials = state.testimonials().list_public(locale).await?;
    Ok(ApiResponse::success(testimonials))
}

/// GET /api/segments
pub async fn segments_list(State(state): State<AppState>) -> ApiResult<Vec<Segment>> {
    Ok(ApiResponse::success(state.segments().list_public().await?))
}

/// GET /api/landing/:locale/:slug
pub async fn landing_get(
    State(state): State<AppState>,
    PathParam((locale, slug)): PathParam<(String, String)>,
) -> ApiResult<Value> {
    let locale: Locale = parse_segment(&locale)?;
    let page = state.landing_pages().read(locale, &slug).await?;
    Ok(ApiResponse::success(page))
}
