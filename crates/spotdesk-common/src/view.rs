//! Dashboard view models and the pure row → view mapping rules.
//!
//! # Purpose
//! Shapes consumed by the dashboard tables, detail panel and map. Every value
//! here is derived from remote rows; nothing is stored back.
use crate::classify::{ComplaintBucket, ReportKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Submitted,
    Assigned,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyScope {
    People,
    Government,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Verified,
    Pending,
    Banned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRow {
    pub id: String,
    pub title: String,
    pub area: String,
    pub severity: Severity,
    pub status: RowStatus,
    pub reported_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerted: Option<NotifyScope>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintRow {
    pub id: String,
    pub title: String,
    pub area: String,
    pub category: ComplaintBucket,
    pub status: RowStatus,
    pub reported_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerted: Option<NotifyScope>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: i64,
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDetail {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub alerted: Option<String>,
    pub location_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub reporter_name: Option<String>,
    pub reporter_id: Option<String>,
    pub media: Vec<MediaItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportLocation {
    pub id: i64,
    pub lon: f64,
    pub lat: f64,
    pub title: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub kind: ReportKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBrief {
    pub id: String,
    pub name: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

pub fn incident_row_id(report_id: i64) -> String {
    format!("R#{report_id}")
}

pub fn complaint_row_id(report_id: i64) -> String {
    format!("C#{report_id}")
}

/// Fallback title for rows stored without one.
pub fn report_title(title: Option<&str>, report_id: i64) -> String {
    match title.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => format!("Report #{report_id}"),
    }
}

/// Area shown in tables: location name, then city, then empty.
pub fn report_area(location_name: Option<&str>, city: Option<&str>) -> String {
    location_name
        .filter(|value| !value.is_empty())
        .or(city.filter(|value| !value.is_empty()))
        .unwrap_or_default()
        .to_string()
}

pub fn normalize_label(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn map_severity(priority: Option<&str>) -> Severity {
    match priority.unwrap_or("low").to_lowercase().as_str() {
        "normal" | "medium" | "high" | "critical" => Severity::Normal,
        _ => Severity::Low,
    }
}

pub fn map_status(status: Option<&str>) -> RowStatus {
    match status.unwrap_or("submitted").to_lowercase().as_str() {
        "resolved" => RowStatus::Resolved,
        "assigned" | "reviewing" | "published" => RowStatus::Assigned,
        _ => RowStatus::Submitted,
    }
}

pub fn map_notify_scope(scope: Option<&str>) -> Option<NotifyScope> {
    match scope?.to_lowercase().as_str() {
        "people" => Some(NotifyScope::People),
        "government" => Some(NotifyScope::Government),
        "both" => Some(NotifyScope::Both),
        _ => None,
    }
}

pub fn map_user_role(role: Option<&str>) -> UserRole {
    match role {
        Some("admin") => UserRole::Admin,
        _ => UserRole::User,
    }
}

/// Map a stored account status onto the dashboard status and active flag.
pub fn map_account_status(account_status: Option<&str>) -> (UserStatus, bool) {
    match account_status.unwrap_or("pending").to_lowercase().as_str() {
        "active" => (UserStatus::Verified, true),
        "suspended" => (UserStatus::Banned, false),
        _ => (UserStatus::Pending, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident(id: i64, title: &str) -> IncidentRow {
        IncidentRow {
            id: incident_row_id(id),
            title: title.to_string(),
            area: String::new(),
            severity: Severity::Low,
            status: RowStatus::Submitted,
            reported_date: Utc::now(),
            reporter: None,
            reporter_id: None,
            category: None,
            subcategory: None,
            alerted: None,
        }
    }

    #[test]
    fn severity_mapping() {
        assert_eq!(map_severity(Some("HIGH")), Severity::Normal);
        assert_eq!(map_severity(Some("medium")), Severity::Normal);
        assert_eq!(map_severity(Some("low")), Severity::Low);
        assert_eq!(map_severity(None), Severity::Low);
        assert_eq!(map_severity(Some("weird")), Severity::Low);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(map_status(Some("resolved")), RowStatus::Resolved);
        assert_eq!(map_status(Some("Reviewing")), RowStatus::Assigned);
        assert_eq!(map_status(Some("published")), RowStatus::Assigned);
        assert_eq!(map_status(Some("open")), RowStatus::Submitted);
        assert_eq!(map_status(None), RowStatus::Submitted);
    }

    #[test]
    fn account_status_mapping() {
        assert_eq!(map_account_status(Some("active")), (UserStatus::Verified, true));
        assert_eq!(map_account_status(Some("suspended")), (UserStatus::Banned, false));
        assert_eq!(map_account_status(None), (UserStatus::Pending, false));
    }

    #[test]
    fn title_and_area_fallbacks() {
        assert_eq!(report_title(None, 7), "Report #7");
        assert_eq!(report_title(Some("  "), 7), "Report #7");
        assert_eq!(report_title(Some("Crash"), 7), "Crash");
        assert_eq!(report_area(Some(""), Some("Cairo")), "Cairo");
        assert_eq!(report_area(None, None), "");
    }

    #[test]
    fn incident_row_serializes_camel_case() {
        let value = serde_json::to_value(incident(5, "x")).expect("json");
        assert_eq!(value["id"], "R#5");
        assert!(value.get("reportedDate").is_some());
        assert!(value.get("reporter").is_none());
    }
}
