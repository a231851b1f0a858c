// handlers/protected/landing.rs - /api/admin/landing

use axum::extract::State;
use serde_json::Value;

use crate::handlers::parse_segment;
use crate::handlers::public::content::LocaleQuery;
use crate::middleware::{ApiResponse, ApiResult, Authenticated, JsonBody, PathParam, QueryParams};
use crate::services::landing_pages::LandingPageRef;
use crate::state::AppState;
use crate::types::Locale;

/// GET /api/admin/landing?locale - every stored page, optionally for one locale
pub async fn landing_list(
    State(state): State<AppState>,
    session: Authenticated,
    QueryParams(query): QueryParams<LocaleQuery>,
) -> ApiResult<Vec<LandingPageRef>> {
    let pages = state.landing_pages().list(session.principal(), query.locale).await?;
    Ok(ApiResponse::success(pages))
}

/// PUT /api/admin/landing/:locale/:slug - replace the whole document
pub async fn landing_put(
    State(state): State<AppState>,
    session: Authenticated,
    PathParam((locale, slug)): PathParam<(String, String)>,
    JsonBody(content): JsonBody<Value>,
) -> ApiResult<Value> {
    let locale: Locale = parse_segment(&locale)?;
    let saved = state
        .landing_pages()
        .save(session.principal(), locale, &slug, content)
        .await?;
    Ok(ApiResponse::success(saved.into_inner()))
}
