//! Write side of the data access layer.
//!
//! Each operation validates its request before touching the store, so a
//! rejected request never issues a query.
use super::{DalResult, ValidationError};
use crate::api::types::{
    AlertCreateRequest, DispatchCreateRequest, DispatchStatusRequest, NoteRequest,
    ReportUpdateRequest,
};
use crate::auth::Identity;
use crate::store::{
    AccountStatus, Alert, Dispatch, GatewayStore, NewAlert, NewFeedback, ReportRow, ReportUpdate,
};
use chrono::{Duration, Utc};

pub const REPORT_STATUSES: &[&str] = &["submitted", "reviewing", "assigned", "published", "resolved"];
pub const REPORT_PRIORITIES: &[&str] = &["low", "normal", "medium", "high", "critical"];
pub const DEFAULT_ALERT_STATUS: &str = "LIVE";
const NOTE_FEEDBACK_TYPE: &str = "comment";

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn one_of(
    value: String,
    allowed: &[&str],
    err: fn(String) -> ValidationError,
) -> Result<String, ValidationError> {
    let normalized = value.to_lowercase();
    if allowed.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(err(value))
    }
}

/// Build the partial update; empty strings count as absent.
pub fn validate_report_update(request: ReportUpdateRequest) -> Result<ReportUpdate, ValidationError> {
    let status = non_blank(request.status)
        .map(|status| one_of(status, REPORT_STATUSES, ValidationError::InvalidStatus))
        .transpose()?;
    let priority = non_blank(request.priority)
        .map(|priority| one_of(priority, REPORT_PRIORITIES, ValidationError::InvalidPriority))
        .transpose()?;
    if let Some(Some(ttl)) = request.ttl_minutes_override
        && ttl < 0
    {
        return Err(ValidationError::NegativeTtl);
    }
    let update = ReportUpdate {
        status,
        priority,
        ttl_minutes_override: request.ttl_minutes_override,
    };
    if update == ReportUpdate::default() {
        return Err(ValidationError::EmptyUpdate);
    }
    Ok(update)
}

pub async fn update_report(
    store: &dyn GatewayStore,
    report_id: i64,
    update: ReportUpdate,
) -> DalResult<ReportRow> {
    Ok(store.update_report(report_id, update).await?)
}

pub async fn delete_report(store: &dyn GatewayStore, report_id: i64) -> DalResult<()> {
    Ok(store.delete_report(report_id).await?)
}

/// Validate a note and resolve its author. Returns the trimmed message.
pub fn validate_note(request: NoteRequest, actor: &Identity) -> Result<(String, i64), ValidationError> {
    let message = non_blank(request.message).ok_or(ValidationError::MessageRequired)?;
    let author = actor.app_user_id.ok_or(ValidationError::MissingProfile)?;
    Ok((message, author))
}

pub async fn add_note(
    store: &dyn GatewayStore,
    report_id: i64,
    author_id: i64,
    message: &str,
) -> DalResult<()> {
    store
        .add_feedback(NewFeedback {
            report_id,
            user_id: author_id,
            feedback_type: NOTE_FEEDBACK_TYPE.to_string(),
            comment: message.to_string(),
        })
        .await?;
    Ok(())
}

/// Create an alert. When `live_until` is omitted and both category and
/// subtype are given, the alert type's default TTL sets the expiry.
pub async fn create_alert(store: &dyn GatewayStore, request: AlertCreateRequest) -> DalResult<Alert> {
    let title = non_blank(request.title).ok_or(ValidationError::TitleRequired)?;
    let category = non_blank(request.category);
    let subtype = non_blank(request.subtype);

    let mut live_until = request.live_until;
    if live_until.is_none()
        && let (Some(category), Some(subtype)) = (category.as_deref(), subtype.as_deref())
    {
        match store.alert_type_ttl_minutes(category, subtype).await {
            Ok(Some(minutes)) if minutes > 0 => {
                live_until = Some(Utc::now() + Duration::minutes(minutes));
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, category, subtype, "alert type lookup failed");
            }
        }
    }

    let alert = NewAlert {
        title,
        description: request.description,
        category,
        subtype,
        status: non_blank(request.status).unwrap_or_else(|| DEFAULT_ALERT_STATUS.to_string()),
        live_until,
        geom: request.geom.filter(|geom| !geom.is_null()),
    };
    Ok(store.create_alert(alert).await?)
}

pub async fn create_dispatch(
    store: &dyn GatewayStore,
    request: DispatchCreateRequest,
) -> DalResult<Dispatch> {
    let (Some(report_id), Some(authority_id)) = (request.report_id, request.authority_id) else {
        return Err(ValidationError::DispatchTargetRequired.into());
    };
    if report_id <= 0 || authority_id <= 0 {
        return Err(ValidationError::DispatchTargetRequired.into());
    }
    Ok(store.create_dispatch(report_id, authority_id).await?)
}

/// Any non-blank status is forwarded; the dispatch table's own constraint
/// decides which values it accepts.
pub fn validate_dispatch_status(request: DispatchStatusRequest) -> Result<String, ValidationError> {
    non_blank(request.status).ok_or(ValidationError::StatusRequired)
}

pub async fn update_dispatch_status(
    store: &dyn GatewayStore,
    dispatch_id: i64,
    status: &str,
) -> DalResult<Dispatch> {
    Ok(store.update_dispatch_status(dispatch_id, status).await?)
}

pub async fn set_user_status(
    store: &dyn GatewayStore,
    user_id: i64,
    status: AccountStatus,
) -> DalResult<()> {
    Ok(store.set_account_status(user_id, status).await?)
}
