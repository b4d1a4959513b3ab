//! Audit trail read endpoint.
use crate::api::dal_error;
use crate::api::error::ApiError;
use crate::api::types::AuditListResponse;
use crate::app::AppState;
use axum::Json;
use axum::extract::State;

pub const AUDIT_LIST_LIMIT: i64 = 100;

#[utoipa::path(
    get,
    path = "/api/audit",
    tag = "audit",
    responses((status = 200, description = "Most recent audit entries, newest first", body = AuditListResponse))
)]
pub(crate) async fn list_audit(
    State(state): State<AppState>,
) -> Result<Json<AuditListResponse>, ApiError> {
    let data = state
        .store
        .recent_audit(AUDIT_LIST_LIMIT)
        .await
        .map_err(|err| dal_error(&state, "Failed to load audit trail", err.into()))?;
    Ok(Json(AuditListResponse { data }))
}
