//! Session endpoints.
//!
//! `GET /api/session` verifies the caller, provisions a profile row on first
//! sign-in and reports whether the caller may use the admin screens.
//! `DELETE /api/session` drops the cached identity for the credential.
//! Neither route requires the admin role.
use crate::api::error::ApiError;
use crate::api::types::{OkResponse, SessionResponse};
use crate::app::AppState;
use crate::auth::guard::authenticate;
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;

#[utoipa::path(
    get,
    path = "/api/session",
    tag = "session",
    responses(
        (status = 200, description = "Resolved session", body = SessionResponse),
        (status = 401, description = "Missing or invalid credential", body = crate::api::types::ErrorResponse),
        (status = 503, description = "Identity backend not configured", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, ApiError> {
    let (credential, identity) = authenticate(&state, &headers).await?;
    let identity = match state.resolver.as_ref() {
        Some(resolver) => match resolver.provision(&credential, &identity).await {
            Ok(provisioned) => provisioned,
            Err(err) => {
                // The session is still valid without a profile row.
                tracing::warn!(error = %err, subject = %identity.subject_id, "profile provisioning failed");
                state.reporter.capture("session.provision", &err);
                identity
            }
        },
        None => identity,
    };
    Ok(Json(SessionResponse {
        authenticated: true,
        privileged: identity.privileged,
        user: identity,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/session",
    tag = "session",
    responses(
        (status = 200, description = "Cached session dropped", body = OkResponse),
        (status = 401, description = "Missing credential", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn end_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<OkResponse>, ApiError> {
    let (credential, identity) = authenticate(&state, &headers).await?;
    if let Some(resolver) = state.resolver.as_ref() {
        resolver.invalidate(&credential);
    }
    tracing::debug!(subject = %identity.subject_id, "session ended");
    Ok(Json(OkResponse::ok()))
}
