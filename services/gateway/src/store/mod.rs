//! Storage traits and row types for the gateway.
//!
//! # Purpose
//! The gateway consumes a schema it does not own (`reports`, `users`, `alerts`,
//! ...). These traits describe exactly the reads and writes the dashboard and
//! the mutation routes need, so handlers can run against Postgres in
//! production and against [`memory::InMemoryStore`] in dev and tests.
//!
//! # Error mapping
//! - A missing row targeted by a mutation is [`StoreError::NotFound`].
//! - A database refusal (constraint, bad enum value, ...) is
//!   [`StoreError::Rejected`] carrying the database message for the client.
//! - A privilege refusal (`42501`) is [`StoreError::PermissionDenied`].
//! - Anything else (pool, transport, decoding) is [`StoreError::Unexpected`].
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use utoipa::ToSchema;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Rejected(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

const PERMISSION_DENIED_CODE: &str = "42501";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row".to_string()),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                let denied = db_err.code().as_deref() == Some(PERMISSION_DENIED_CODE)
                    || message.to_lowercase().contains("permission denied");
                if denied {
                    StoreError::PermissionDenied(message)
                } else {
                    StoreError::Rejected(message)
                }
            }
            _ => StoreError::Unexpected(anyhow::Error::new(err)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReportRow {
    pub report_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub notify_scope: Option<String>,
    pub location_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub user_id: Option<i64>,
    pub category_id: Option<i64>,
    pub subcategory_id: Option<i64>,
    pub ttl_minutes_override: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub category_id: i64,
    pub name: String,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Subcategory {
    pub subcategory_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MediaRow {
    pub media_id: i64,
    pub report_id: i64,
    pub media_type: String,
    pub storage_url: String,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserRow {
    pub user_id: i64,
    pub auth_user_id: Option<String>,
    pub full_name: Option<String>,
    pub id_number: Option<String>,
    pub role: Option<String>,
    pub account_status: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Suspended,
    Pending,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
            AccountStatus::Pending => "pending",
        }
    }
}

/// Partial report update. `None` leaves a column untouched; for the TTL
/// override, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_minutes_override: Option<Option<i32>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub report_id: i64,
    pub user_id: i64,
    pub feedback_type: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Alert {
    pub alert_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub subtype: Option<String>,
    pub status: String,
    pub live_until: Option<DateTime<Utc>>,
    #[schema(value_type = Option<Object>)]
    pub geom: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub subtype: Option<String>,
    pub status: String,
    pub live_until: Option<DateTime<Utc>>,
    pub geom: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Dispatch {
    pub id: i64,
    pub report_id: i64,
    pub authority_id: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuditEntry {
    pub action: String,
    pub actor_auth_user_id: Option<String>,
    pub actor_app_user_id: Option<i64>,
    pub request_path: String,
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn list_subcategories(&self) -> StoreResult<Vec<Subcategory>>;
    /// Newest reports first.
    async fn recent_reports(&self, limit: i64) -> StoreResult<Vec<ReportRow>>;
    /// Newest reports that carry both coordinates.
    async fn located_reports(&self, limit: i64) -> StoreResult<Vec<ReportRow>>;
    async fn get_report(&self, report_id: i64) -> StoreResult<Option<ReportRow>>;
    /// Media for a report, oldest first.
    async fn report_media(&self, report_id: i64) -> StoreResult<Vec<MediaRow>>;
    async fn update_report(&self, report_id: i64, update: ReportUpdate) -> StoreResult<ReportRow>;
    /// Delete a report and its media.
    async fn delete_report(&self, report_id: i64) -> StoreResult<()>;
    async fn add_feedback(&self, feedback: NewFeedback) -> StoreResult<()>;
    async fn alert_type_ttl_minutes(
        &self,
        category: &str,
        subtype: &str,
    ) -> StoreResult<Option<i64>>;
    async fn create_alert(&self, alert: NewAlert) -> StoreResult<Alert>;
    async fn create_dispatch(&self, report_id: i64, authority_id: i64) -> StoreResult<Dispatch>;
    async fn update_dispatch_status(&self, id: i64, status: &str) -> StoreResult<Dispatch>;

    async fn health_check(&self) -> StoreResult<()>;
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn profile_by_auth_id(&self, auth_user_id: &str) -> StoreResult<Option<UserRow>>;
    /// Return the profile for `auth_user_id`, inserting a `user`/`pending` row
    /// when none exists.
    async fn ensure_profile(&self, auth_user_id: &str, email: Option<&str>)
    -> StoreResult<UserRow>;
    async fn users_by_ids(&self, user_ids: &[i64]) -> StoreResult<Vec<UserRow>>;
    /// Users ordered by id.
    async fn list_users(&self, limit: i64) -> StoreResult<Vec<UserRow>>;
    async fn set_account_status(&self, user_id: i64, status: AccountStatus) -> StoreResult<()>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert_audit(&self, entry: AuditEntry) -> StoreResult<()>;
    /// Newest entries first.
    async fn recent_audit(&self, limit: i64) -> StoreResult<Vec<AuditEntry>>;
}

pub trait GatewayStore: ReportStore + ProfileStore + AuditStore {}

impl<T> GatewayStore for T where T: ReportStore + ProfileStore + AuditStore {}
