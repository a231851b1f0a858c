// handlers/elevated/audit_logs.rs - /api/admin/audit-logs

use axum::extract::State;
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, Authenticated, PathParam, QueryParams};
use crate::services::{AuditEntry, AuditFilter};
use crate::state::AppState;

/// GET /api/admin/audit-logs?entity&action&user_id&limit&offset - newest first
pub async fn audit_logs_list(
    State(state): State<AppState>,
    session: Authenticated,
    QueryParams(filter): QueryParams<AuditFilter>,
) -> ApiResult<Vec<AuditEntry>> {
    let entries = state.audit.list(session.principal(), &filter).await?;
    Ok(ApiResponse::success(entries))
}

pub async fn audit_log_get(
    State(state): State<AppState>,
    session: Authenticated,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<AuditEntry> {
    Ok(ApiResponse::success(state.audit.get(session.principal(), id).await?))
}
