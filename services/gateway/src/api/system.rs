//! System/health API handlers.
//!
//! # Purpose and responsibility
//! Liveness text at `/`, a configuration-aware health probe and the OpenAPI
//! document. None of these require a credential.
//!
//! # Key invariants
//! - Health checks are fast and side-effect free.
//! - Health never reveals secrets, only whether they are configured.
use crate::api::error::{ApiError, api_store_error};
use crate::api::openapi::ApiDoc;
use crate::api::types::HealthStatus;
use crate::app::AppState;
use axum::Json;
use axum::extract::State;
use utoipa::OpenApi;

pub const ROOT_BANNER: &str = "Spotdesk gateway OK";

#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses((status = 200, description = "Plain-text liveness banner", body = String))
)]
pub(crate) async fn root() -> &'static str {
    ROOT_BANNER
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "system",
    responses(
        (status = 200, description = "Gateway health", body = HealthStatus),
        (status = 500, description = "Storage unavailable", body = crate::api::types::ErrorResponse)
    )
)]
/// Return gateway health.
///
/// # Errors
/// - Returns 500 if the storage health check fails.
pub(crate) async fn health(State(state): State<AppState>) -> Result<Json<HealthStatus>, ApiError> {
    state
        .store
        .health_check()
        .await
        .map_err(|err| api_store_error(state.reporter.as_ref(), "storage unavailable", err))?;
    Ok(Json(HealthStatus {
        ok: true,
        backend_configured: state.resolver.is_some(),
        storage_backend: state.store.backend_name().to_string(),
        audit_enabled: state.audit.is_enabled(),
    }))
}

pub(crate) async fn openapi_document() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
