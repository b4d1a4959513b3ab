//! Report API handlers.
//!
//! # Purpose
//! Dashboard reads (incident and complaint tables, map markers, detail panel)
//! and the report mutations: status/priority/TTL update, delete and notes.
//! Every successful mutation is audited.
use crate::api::error::{ApiError, api_not_found};
use crate::api::types::{
    ComplaintListResponse, IncidentListResponse, NoteRequest, OkResponse, ReportDetailResponse,
    ReportLocationListResponse, ReportResponse, ReportUpdateRequest,
};
use crate::api::{audit_payload, dal_error, invalid, json_body};
use crate::app::AppState;
use crate::auth::Identity;
use crate::dal::{mutations, parse_path_id, views};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::Uri;
use axum::{Extension, Json};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/api/incidents",
    tag = "reports",
    responses(
        (status = 200, description = "Newest reports classified as incidents", body = IncidentListResponse),
        (status = 403, description = "Caller is not an admin", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_incidents(
    State(state): State<AppState>,
) -> Result<Json<IncidentListResponse>, ApiError> {
    let data = views::fetch_incidents(state.store.as_ref(), &state.policy)
        .await
        .map_err(|err| dal_error(&state, "Failed to load incidents", err))?;
    Ok(Json(IncidentListResponse { data }))
}

#[utoipa::path(
    get,
    path = "/api/complaints",
    tag = "reports",
    responses(
        (status = 200, description = "Newest reports classified as complaints", body = ComplaintListResponse),
        (status = 403, description = "Caller is not an admin", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_complaints(
    State(state): State<AppState>,
) -> Result<Json<ComplaintListResponse>, ApiError> {
    let data = views::fetch_complaints(state.store.as_ref(), &state.policy)
        .await
        .map_err(|err| dal_error(&state, "Failed to load complaints", err))?;
    Ok(Json(ComplaintListResponse { data }))
}

#[utoipa::path(
    get,
    path = "/api/map/reports",
    tag = "reports",
    responses(
        (status = 200, description = "Report map markers", body = ReportLocationListResponse)
    )
)]
pub(crate) async fn list_report_locations(
    State(state): State<AppState>,
) -> Result<Json<ReportLocationListResponse>, ApiError> {
    let data = views::fetch_report_locations(state.store.as_ref(), &state.policy)
        .await
        .map_err(|err| dal_error(&state, "Failed to load report locations", err))?;
    Ok(Json(ReportLocationListResponse { data }))
}

#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    tag = "reports",
    params(("id" = String, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report detail", body = ReportDetailResponse),
        (status = 400, description = "Invalid report id", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Report not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_report(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ReportDetailResponse>, ApiError> {
    let report_id = parse_path_id(&id, "report").map_err(invalid)?;
    let detail = views::fetch_report_detail(state.store.as_ref(), report_id)
        .await
        .map_err(|err| dal_error(&state, "Failed to load report", err))?
        .ok_or_else(|| api_not_found("report not found"))?;
    Ok(Json(ReportDetailResponse { data: detail }))
}

#[utoipa::path(
    post,
    path = "/api/reports/{id}",
    tag = "reports",
    params(("id" = String, Path, description = "Report id")),
    request_body = ReportUpdateRequest,
    responses(
        (status = 200, description = "Updated report row", body = ReportResponse),
        (status = 400, description = "Invalid id, body or rejected update", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Report not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_report(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(actor): Extension<Identity>,
    uri: Uri,
    payload: Result<Json<ReportUpdateRequest>, JsonRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    const FAILED: &str = "Failed to update report";
    let report_id = parse_path_id(&id, "report").map_err(invalid)?;
    let update = mutations::validate_report_update(json_body(payload)?).map_err(invalid)?;
    let audit_updates = audit_payload("report.update", &update);
    let row = mutations::update_report(state.store.as_ref(), report_id, update)
        .await
        .map_err(|err| dal_error(&state, FAILED, err))?;
    state
        .audit
        .record(
            "report.update",
            Some(&actor),
            uri.path(),
            json!({ "report_id": report_id, "updates": audit_updates }),
        )
        .await;
    Ok(Json(ReportResponse { data: row }))
}

#[utoipa::path(
    post,
    path = "/api/reports/{id}/delete",
    tag = "reports",
    params(("id" = String, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report and its media deleted", body = OkResponse),
        (status = 404, description = "Report not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_report(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(actor): Extension<Identity>,
    uri: Uri,
) -> Result<Json<OkResponse>, ApiError> {
    const FAILED: &str = "Failed to delete report";
    let report_id = parse_path_id(&id, "report").map_err(invalid)?;
    mutations::delete_report(state.store.as_ref(), report_id)
        .await
        .map_err(|err| dal_error(&state, FAILED, err))?;
    state
        .audit
        .record(
            "report.delete",
            Some(&actor),
            uri.path(),
            json!({ "report_id": report_id }),
        )
        .await;
    Ok(Json(OkResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/api/reports/{id}/note",
    tag = "reports",
    params(("id" = String, Path, description = "Report id")),
    request_body = NoteRequest,
    responses(
        (status = 200, description = "Note added", body = OkResponse),
        (status = 400, description = "Missing message or admin profile", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn add_note(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(actor): Extension<Identity>,
    uri: Uri,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    const FAILED: &str = "Failed to add note";
    let report_id = parse_path_id(&id, "report").map_err(invalid)?;
    let (message, author_id) =
        mutations::validate_note(json_body(payload)?, &actor).map_err(invalid)?;
    mutations::add_note(state.store.as_ref(), report_id, author_id, &message)
        .await
        .map_err(|err| dal_error(&state, FAILED, err))?;
    state
        .audit
        .record(
            "report.note",
            Some(&actor),
            uri.path(),
            json!({ "report_id": report_id, "comment": message }),
        )
        .await;
    Ok(Json(OkResponse::ok()))
}
