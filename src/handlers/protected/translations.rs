// handlers/protected/translations.rs - PUT /api/admin/translations/:locale/:namespace

use axum::extract::State;
use serde_json::Value;

use crate::handlers::parse_segment;
use crate::middleware::{ApiResponse, ApiResult, Authenticated, JsonBody, PathParam};
use crate::services::translations::TranslationRecord;
use crate::state::AppState;
use crate::types::{Locale, Namespace};

/// Replace the stored document for one namespace. The body is the new content.
pub async fn namespace_put(
    State(state): State<AppState>,
    session: Authenticated,
    PathParam((locale, namespace)): PathParam<(String, String)>,
    JsonBody(content): JsonBody<Value>,
) -> ApiResult<TranslationRecord> {
    let locale: Locale = parse_segment(&locale)?;
    let namespace: Namespace = parse_segment(&namespace)?;
    let saved = state
        .translations()
        .save_namespace(session.principal(), locale, namespace, content)
        .await?;
    Ok(ApiResponse::success(saved.into_inner()))
}
