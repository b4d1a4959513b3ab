//! Authority dispatch API handlers.
//!
//! A dispatch assigns a report to an authority. New dispatches start as
//! `pending`; later status changes are restricted to the dispatch vocabulary.
use crate::api::error::ApiError;
use crate::api::types::{DispatchCreateRequest, DispatchResponse, DispatchStatusRequest};
use crate::api::{audit_payload, dal_error, invalid, json_body};
use crate::app::AppState;
use crate::auth::Identity;
use crate::dal::{mutations, parse_path_id};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::Uri;
use axum::{Extension, Json};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/api/dispatch",
    tag = "dispatch",
    request_body = DispatchCreateRequest,
    responses(
        (status = 200, description = "Dispatch created", body = DispatchResponse),
        (status = 400, description = "Missing report or authority", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_dispatch(
    State(state): State<AppState>,
    Extension(actor): Extension<Identity>,
    uri: Uri,
    payload: Result<Json<DispatchCreateRequest>, JsonRejection>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let dispatch = mutations::create_dispatch(state.store.as_ref(), json_body(payload)?)
        .await
        .map_err(|err| dal_error(&state, "Failed to create dispatch", err))?;
    let snapshot = audit_payload("dispatch.create", &dispatch);
    state
        .audit
        .record("dispatch.create", Some(&actor), uri.path(), snapshot)
        .await;
    Ok(Json(DispatchResponse { data: dispatch }))
}

#[utoipa::path(
    post,
    path = "/api/dispatch/{id}/status",
    tag = "dispatch",
    params(("id" = String, Path, description = "Dispatch id")),
    request_body = DispatchStatusRequest,
    responses(
        (status = 200, description = "Dispatch updated", body = DispatchResponse),
        (status = 400, description = "Invalid id or status", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Dispatch not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_dispatch_status(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(actor): Extension<Identity>,
    uri: Uri,
    payload: Result<Json<DispatchStatusRequest>, JsonRejection>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let dispatch_id = parse_path_id(&id, "dispatch").map_err(invalid)?;
    let status = mutations::validate_dispatch_status(json_body(payload)?).map_err(invalid)?;
    let dispatch = mutations::update_dispatch_status(state.store.as_ref(), dispatch_id, &status)
        .await
        .map_err(|err| dal_error(&state, "Failed to update dispatch", err))?;
    state
        .audit
        .record(
            "dispatch.update",
            Some(&actor),
            uri.path(),
            json!({ "id": dispatch_id, "status": status }),
        )
        .await;
    Ok(Json(DispatchResponse { data: dispatch }))
}
