//! OpenAPI schema aggregation for the gateway API.
//!
//! # Purpose
//! Collects all routes and schema types into a single document served at
//! `/api/openapi.json`.
use crate::api::{
    alerts, audit, dispatch, reports, session, system,
    types::{
        AlertCreateRequest, AlertResponse, AuditListResponse, ComplaintListResponse,
        DispatchCreateRequest, DispatchResponse, DispatchStatusRequest, ErrorResponse,
        HealthStatus, IncidentListResponse, NoteRequest, OkResponse,
        ReportDetailResponse, ReportLocationListResponse, ReportResponse, ReportUpdateRequest,
        SessionResponse, UserListResponse,
    },
    users,
};
use crate::auth::Identity;
use crate::store::{Alert, AuditEntry, Dispatch, ReportRow, UserRow};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "spotdesk-gateway",
        version = "v1",
        description = "Spotdesk admin mutation gateway HTTP API"
    ),
    paths(
        system::root,
        system::health,
        session::get_session,
        session::end_session,
        reports::list_incidents,
        reports::list_complaints,
        reports::list_report_locations,
        reports::get_report,
        reports::update_report,
        reports::delete_report,
        reports::add_note,
        alerts::create_alert,
        dispatch::create_dispatch,
        dispatch::update_dispatch_status,
        users::list_users,
        users::suspend_user,
        users::activate_user,
        audit::list_audit
    ),
    components(schemas(
        ErrorResponse,
        OkResponse,
        HealthStatus,
        Identity,
        SessionResponse,
        IncidentListResponse,
        ComplaintListResponse,
        ReportLocationListResponse,
        ReportDetailResponse,
        ReportResponse,
        ReportRow,
        ReportUpdateRequest,
        NoteRequest,
        Alert,
        AlertCreateRequest,
        AlertResponse,
        Dispatch,
        DispatchCreateRequest,
        DispatchStatusRequest,
        DispatchResponse,
        UserRow,
        UserListResponse,
        AuditEntry,
        AuditListResponse
    )),
    tags(
        (name = "system", description = "Liveness, health and API description"),
        (name = "session", description = "Caller session and profile provisioning"),
        (name = "reports", description = "Incident and complaint reports"),
        (name = "alerts", description = "Public alerts"),
        (name = "dispatch", description = "Authority dispatches"),
        (name = "users", description = "User management"),
        (name = "audit", description = "Admin audit trail")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_admin_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/health",
            "/api/session",
            "/api/reports/{id}",
            "/api/reports/{id}/note",
            "/api/dispatch/{id}/status",
            "/api/users/{id}/suspend",
            "/api/audit",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
