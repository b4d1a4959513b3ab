//! HTTP API request/response types.
//!
//! # Purpose
//! Payload shapes for the gateway routes and the OpenAPI document. Successful
//! reads and mutations answer `{ "data": ... }` or `{ "ok": true }`; failures
//! answer [`ErrorResponse`].
use crate::auth::Identity;
use crate::store::{Alert, AuditEntry, Dispatch, ReportRow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use spotdesk_common::view::{ComplaintRow, IncidentRow, ReportDetail, ReportLocation, UserBrief};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub ok: bool,
    pub backend_configured: bool,
    pub storage_backend: String,
    pub audit_enabled: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub privileged: bool,
    pub user: Identity,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IncidentListResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<IncidentRow>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComplaintListResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<ComplaintRow>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportLocationListResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<ReportLocation>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportDetailResponse {
    #[schema(value_type = Object)]
    pub data: ReportDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<UserBrief>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditListResponse {
    pub data: Vec<AuditEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportResponse {
    pub data: ReportRow,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AlertResponse {
    pub data: Alert,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DispatchResponse {
    pub data: Dispatch,
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct ReportUpdateRequest {
    pub status: Option<String>,
    pub priority: Option<String>,
    /// `null` clears the override; omit the field to leave it unchanged.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub ttl_minutes_override: Option<Option<i32>>,
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct NoteRequest {
    pub message: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct AlertCreateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub subtype: Option<String>,
    pub status: Option<String>,
    pub live_until: Option<DateTime<Utc>>,
    #[schema(value_type = Option<Object>)]
    pub geom: Option<serde_json::Value>,
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct DispatchCreateRequest {
    pub report_id: Option<i64>,
    pub authority_id: Option<i64>,
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct DispatchStatusRequest {
    pub status: Option<String>,
}
