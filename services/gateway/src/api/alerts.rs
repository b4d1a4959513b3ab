//! Alert API handler.
use crate::api::error::ApiError;
use crate::api::types::{AlertCreateRequest, AlertResponse};
use crate::api::{audit_payload, dal_error, json_body};
use crate::app::AppState;
use crate::auth::Identity;
use crate::dal::mutations;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::Uri;
use axum::{Extension, Json};

#[utoipa::path(
    post,
    path = "/api/alerts",
    tag = "alerts",
    request_body = AlertCreateRequest,
    responses(
        (status = 200, description = "Alert created", body = AlertResponse),
        (status = 400, description = "Missing title or rejected insert", body = crate::api::types::ErrorResponse)
    )
)]
/// Publish a public alert.
///
/// `status` defaults to `LIVE`. Without an explicit `live_until`, the expiry
/// comes from the alert type's default TTL when category and subtype match one.
pub(crate) async fn create_alert(
    State(state): State<AppState>,
    Extension(actor): Extension<Identity>,
    uri: Uri,
    payload: Result<Json<AlertCreateRequest>, JsonRejection>,
) -> Result<Json<AlertResponse>, ApiError> {
    let alert = mutations::create_alert(state.store.as_ref(), json_body(payload)?)
        .await
        .map_err(|err| dal_error(&state, "Failed to create alert", err))?;
    let snapshot = audit_payload("alert.insert", &alert);
    state
        .audit
        .record("alert.insert", Some(&actor), uri.path(), snapshot)
        .await;
    Ok(Json(AlertResponse { data: alert }))
}
