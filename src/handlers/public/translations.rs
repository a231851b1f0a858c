// handlers/public/translations.rs - GET /api/translations/:locale[/:namespace]

use std::collections::BTreeMap;

use axum::extract::State;
use serde_json::Value;

use crate::handlers::parse_segment;
use crate::middleware::{ApiResponse, ApiResult, PathParam};
use crate::state::AppState;
use crate::types::{Locale, Namespace};

/// Every namespace for a locale; namespaces with no content anywhere are omitted.
pub async fn translations_get(
    State(state): State<AppState>,
    PathParam(locale): PathParam<String>,
) -> ApiResult<BTreeMap<Namespace, Value>> {
    let locale: Locale = parse_segment(&locale)?;
    let bundle = state.translations().resolve_all_namespaces(locale).await;
    Ok(ApiResponse::success(bundle))
}

/// One namespace: database copy first, then the bundled file, else 404.
pub async fn namespace_get(
    State(state): State<AppState>,
    PathParam((locale, namespace)): PathParam<(String, String)>,
) -> ApiResult<Value> {
    let locale: Locale = parse_segment(&locale)?;
    let namespace: Namespace = parse_segment(&namespace)?;
    let content = state.translations().resolve_namespace(locale, namespace).await?;
    Ok(ApiResponse::success(content))
}
