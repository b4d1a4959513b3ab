//! Read side of the data access layer: rows in, dashboard views out.
use super::DalResult;
use crate::store::{Category, GatewayStore, ReportRow, UserRow};
use spotdesk_common::ClassificationPolicy;
use spotdesk_common::classify::{ReportKind, complaint_bucket};
use spotdesk_common::view::{
    ComplaintRow, IncidentRow, MediaItem, ReportDetail, ReportLocation, UserBrief,
    complaint_row_id, incident_row_id, map_account_status, map_notify_scope, map_severity,
    map_status, map_user_role, normalize_label, report_area, report_title,
};
use std::collections::{BTreeSet, HashMap};

pub const REPORT_LIST_LIMIT: i64 = 200;
pub const REPORT_LOCATION_LIMIT: i64 = 250;
pub const USER_LIST_LIMIT: i64 = 200;

/// Category and subcategory names keyed by id.
#[derive(Debug, Default)]
struct Lookups {
    categories: HashMap<i64, Category>,
    subcategories: HashMap<i64, String>,
}

impl Lookups {
    fn category(&self, id: Option<i64>) -> Option<&Category> {
        id.and_then(|id| self.categories.get(&id))
    }

    fn subcategory(&self, id: Option<i64>) -> Option<&str> {
        id.and_then(|id| self.subcategories.get(&id))
            .map(String::as_str)
    }

    /// Classification key: slug when present, otherwise the display name.
    fn category_key(&self, id: Option<i64>) -> Option<&str> {
        self.category(id).map(|category| {
            category
                .slug
                .as_deref()
                .filter(|slug| !slug.is_empty())
                .unwrap_or(category.name.as_str())
        })
    }
}

async fn load_lookups(store: &dyn GatewayStore) -> Lookups {
    let mut lookups = Lookups::default();
    match store.list_categories().await {
        Ok(rows) => {
            lookups.categories = rows
                .into_iter()
                .map(|category| (category.category_id, category))
                .collect();
        }
        Err(err) => tracing::warn!(error = %err, "category lookup failed"),
    }
    match store.list_subcategories().await {
        Ok(rows) => {
            lookups.subcategories = rows
                .into_iter()
                .map(|sub| (sub.subcategory_id, sub.name))
                .collect();
        }
        Err(err) => tracing::warn!(error = %err, "subcategory lookup failed"),
    }
    lookups
}

async fn load_reporters(store: &dyn GatewayStore, reports: &[ReportRow]) -> HashMap<i64, UserRow> {
    let ids: Vec<i64> = reports
        .iter()
        .filter_map(|row| row.user_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if ids.is_empty() {
        return HashMap::new();
    }
    match store.users_by_ids(&ids).await {
        Ok(users) => users.into_iter().map(|user| (user.user_id, user)).collect(),
        Err(err) => {
            tracing::warn!(error = %err, "reporter lookup failed");
            HashMap::new()
        }
    }
}

fn reporter_fields(
    reporters: &HashMap<i64, UserRow>,
    user_id: Option<i64>,
) -> (Option<String>, Option<String>) {
    let Some(user) = user_id.and_then(|id| reporters.get(&id)) else {
        return (None, None);
    };
    let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
    (non_empty(&user.full_name), non_empty(&user.id_number))
}

struct ClassifiedReports {
    lookups: Lookups,
    reporters: HashMap<i64, UserRow>,
    rows: Vec<ReportRow>,
}

async fn load_classified(
    store: &dyn GatewayStore,
    policy: &ClassificationPolicy,
    kind: ReportKind,
) -> DalResult<ClassifiedReports> {
    let lookups = load_lookups(store).await;
    let reports = store.recent_reports(REPORT_LIST_LIMIT).await?;
    let rows: Vec<ReportRow> = reports
        .into_iter()
        .filter(|row| {
            policy.classify(
                lookups.category_key(row.category_id),
                lookups.subcategory(row.subcategory_id),
            ) == kind
        })
        .collect();
    tracing::debug!(kind = kind.as_str(), rows = rows.len(), "classified reports");
    let reporters = load_reporters(store, &rows).await;
    Ok(ClassifiedReports {
        lookups,
        reporters,
        rows,
    })
}

/// Newest reports classified as incidents, mapped for the incident table.
pub async fn fetch_incidents(
    store: &dyn GatewayStore,
    policy: &ClassificationPolicy,
) -> DalResult<Vec<IncidentRow>> {
    let ClassifiedReports {
        lookups,
        reporters,
        rows,
    } = load_classified(store, policy, ReportKind::Incident).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let (reporter, reporter_id) = reporter_fields(&reporters, row.user_id);
            IncidentRow {
                id: incident_row_id(row.report_id),
                title: report_title(row.title.as_deref(), row.report_id),
                area: report_area(row.location_name.as_deref(), row.city.as_deref()),
                severity: map_severity(row.priority.as_deref()),
                status: map_status(row.status.as_deref()),
                reported_date: row.created_at,
                reporter,
                reporter_id,
                category: normalize_label(
                    lookups
                        .category(row.category_id)
                        .map(|category| category.name.as_str()),
                ),
                subcategory: normalize_label(lookups.subcategory(row.subcategory_id)),
                alerted: map_notify_scope(row.notify_scope.as_deref()),
            }
        })
        .collect())
}

/// Newest reports classified as complaints, bucketed for the complaint table.
pub async fn fetch_complaints(
    store: &dyn GatewayStore,
    policy: &ClassificationPolicy,
) -> DalResult<Vec<ComplaintRow>> {
    let ClassifiedReports {
        lookups,
        reporters,
        rows,
    } = load_classified(store, policy, ReportKind::Complaint).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let (reporter, reporter_id) = reporter_fields(&reporters, row.user_id);
            let category_name = lookups
                .category(row.category_id)
                .map(|category| category.name.as_str());
            ComplaintRow {
                id: complaint_row_id(row.report_id),
                title: report_title(row.title.as_deref(), row.report_id),
                area: report_area(row.location_name.as_deref(), row.city.as_deref()),
                category: complaint_bucket(category_name, lookups.subcategory(row.subcategory_id)),
                status: map_status(row.status.as_deref()),
                reported_date: row.created_at,
                reporter,
                reporter_id,
                alerted: map_notify_scope(row.notify_scope.as_deref()),
            }
        })
        .collect())
}

/// Full detail for one report, or `None` when it does not exist.
pub async fn fetch_report_detail(
    store: &dyn GatewayStore,
    report_id: i64,
) -> DalResult<Option<ReportDetail>> {
    let Some(row) = store.get_report(report_id).await? else {
        return Ok(None);
    };
    let media = match store.report_media(report_id).await {
        Ok(items) => items,
        Err(err) => {
            tracing::warn!(error = %err, report_id, "media lookup failed");
            Vec::new()
        }
    };
    let reporters = match row.user_id {
        Some(_) => load_reporters(store, std::slice::from_ref(&row)).await,
        None => HashMap::new(),
    };
    let (reporter_name, reporter_id) = reporter_fields(&reporters, row.user_id);
    let lookups = if row.category_id.is_some() || row.subcategory_id.is_some() {
        load_lookups(store).await
    } else {
        Lookups::default()
    };

    Ok(Some(ReportDetail {
        id: row.report_id,
        title: report_title(row.title.as_deref(), row.report_id),
        description: row.description,
        status: row.status.unwrap_or_else(|| "submitted".to_string()),
        priority: row.priority,
        created_at: row.created_at,
        updated_at: row.updated_at,
        category: normalize_label(
            lookups
                .category(row.category_id)
                .map(|category| category.name.as_str()),
        ),
        subcategory: normalize_label(lookups.subcategory(row.subcategory_id)),
        alerted: row.notify_scope,
        location_name: row.location_name,
        address: row.address,
        city: row.city,
        latitude: row.latitude,
        longitude: row.longitude,
        reporter_name,
        reporter_id,
        media: media
            .into_iter()
            .map(|item| MediaItem {
                id: item.media_id,
                media_type: item.media_type,
                url: item.storage_url,
                thumbnail_url: item.thumbnail_url,
            })
            .collect(),
    }))
}

/// Map markers. Classified by category name only; subcategory is not loaded.
pub async fn fetch_report_locations(
    store: &dyn GatewayStore,
    policy: &ClassificationPolicy,
) -> DalResult<Vec<ReportLocation>> {
    let lookups = load_lookups(store).await;
    let rows = store.located_reports(REPORT_LOCATION_LIMIT).await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let (lat, lon) = (row.latitude?, row.longitude?);
            let category = normalize_label(
                lookups
                    .category(row.category_id)
                    .map(|category| category.name.as_str()),
            );
            Some(ReportLocation {
                id: row.report_id,
                lon,
                lat,
                title: row
                    .title
                    .filter(|title| !title.is_empty())
                    .unwrap_or_else(|| "Report".to_string()),
                status: row
                    .status
                    .filter(|status| !status.is_empty())
                    .unwrap_or_else(|| "open".to_string()),
                kind: policy.classify(category.as_deref(), None),
                category,
            })
        })
        .collect())
}

/// First users by id for the user management table.
pub async fn fetch_users_brief(store: &dyn GatewayStore) -> DalResult<Vec<UserBrief>> {
    let users = store.list_users(USER_LIST_LIMIT).await?;
    Ok(users
        .into_iter()
        .map(|user| {
            let (status, active) = map_account_status(user.account_status.as_deref());
            UserBrief {
                id: user.user_id.to_string(),
                name: user
                    .full_name
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| "Unknown".to_string()),
                role: map_user_role(user.role.as_deref()),
                status,
                active,
                email: user.email.filter(|email| !email.is_empty()),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use crate::store::{MediaRow, Subcategory};
    use chrono::{Duration, TimeZone, Utc};
    use spotdesk_common::ComplaintBucket;
    use spotdesk_common::view::{NotifyScope, RowStatus, Severity, UserRole, UserStatus};

    fn report(id: i64, category_id: Option<i64>, subcategory_id: Option<i64>) -> ReportRow {
        ReportRow {
            report_id: id,
            title: None,
            description: Some("details".to_string()),
            status: Some("reviewing".to_string()),
            priority: Some("high".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
                + Duration::minutes(id),
            updated_at: None,
            notify_scope: Some("both".to_string()),
            location_name: None,
            address: None,
            city: Some("Cairo".to_string()),
            latitude: None,
            longitude: None,
            user_id: Some(7),
            category_id,
            subcategory_id,
            ttl_minutes_override: None,
        }
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_category(Category {
                category_id: 1,
                name: " Fire ".to_string(),
                slug: Some("fire_explosion".to_string()),
            })
            .await;
        store
            .insert_category(Category {
                category_id: 2,
                name: "Roads".to_string(),
                slug: Some("roadway_hazard".to_string()),
            })
            .await;
        store
            .insert_subcategory(Subcategory {
                subcategory_id: 20,
                name: "pothole".to_string(),
            })
            .await;
        store
            .insert_user(UserRow {
                user_id: 7,
                auth_user_id: None,
                full_name: Some("Mona".to_string()),
                id_number: Some("29901011234567".to_string()),
                role: None,
                account_status: Some("active".to_string()),
                email: None,
            })
            .await;
        store.insert_report(report(1, Some(1), None)).await;
        store.insert_report(report(2, Some(2), Some(20))).await;
        store
    }

    #[tokio::test]
    async fn incidents_keep_only_incident_rows() {
        let store = seeded().await;
        let rows = fetch_incidents(&store, &ClassificationPolicy::default())
            .await
            .expect("incidents");
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.id, "R#1");
        assert_eq!(row.title, "Report #1");
        assert_eq!(row.area, "Cairo");
        assert_eq!(row.severity, Severity::Normal);
        assert_eq!(row.status, RowStatus::Assigned);
        assert_eq!(row.category.as_deref(), Some("Fire"));
        assert_eq!(row.reporter.as_deref(), Some("Mona"));
        assert_eq!(row.reporter_id.as_deref(), Some("29901011234567"));
        assert_eq!(row.alerted, Some(NotifyScope::Both));
    }

    #[tokio::test]
    async fn complaints_are_bucketed() {
        let store = seeded().await;
        let rows = fetch_complaints(&store, &ClassificationPolicy::default())
            .await
            .expect("complaints");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "C#2");
        assert_eq!(rows[0].category, ComplaintBucket::Road);
    }

    #[tokio::test]
    async fn detail_includes_media_and_names() {
        let store = seeded().await;
        store
            .insert_media(MediaRow {
                media_id: 5,
                report_id: 2,
                media_type: "image".to_string(),
                storage_url: "https://cdn.example/5.jpg".to_string(),
                thumbnail_url: None,
                created_at: Utc::now(),
            })
            .await;
        let detail = fetch_report_detail(&store, 2)
            .await
            .expect("detail")
            .expect("present");
        assert_eq!(detail.category.as_deref(), Some("Roads"));
        assert_eq!(detail.subcategory.as_deref(), Some("pothole"));
        assert_eq!(detail.reporter_name.as_deref(), Some("Mona"));
        assert_eq!(detail.media.len(), 1);
        assert_eq!(detail.media[0].url, "https://cdn.example/5.jpg");

        assert!(fetch_report_detail(&store, 99).await.expect("detail").is_none());
    }

    #[tokio::test]
    async fn locations_use_category_name_and_fallbacks() {
        let store = seeded().await;
        let mut located = report(3, Some(2), Some(20));
        located.latitude = Some(30.04);
        located.longitude = Some(31.23);
        located.status = None;
        store.insert_report(located).await;

        let rows = fetch_report_locations(&store, &ClassificationPolicy::default())
            .await
            .expect("locations");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Report");
        assert_eq!(rows[0].status, "open");
        assert_eq!(rows[0].lat, 30.04);
        // "Roads" alone carries no complaint term, so the default applies.
        assert_eq!(rows[0].kind, ReportKind::Incident);
    }

    #[tokio::test]
    async fn users_brief_maps_status_and_role() {
        let store = seeded().await;
        store
            .insert_user(UserRow {
                user_id: 8,
                auth_user_id: None,
                full_name: None,
                id_number: None,
                role: Some("admin".to_string()),
                account_status: Some("suspended".to_string()),
                email: Some("ops@example.com".to_string()),
            })
            .await;
        let users = fetch_users_brief(&store).await.expect("users");
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, "7");
        assert_eq!(users[0].status, UserStatus::Verified);
        assert!(users[0].active);
        assert_eq!(users[1].name, "Unknown");
        assert_eq!(users[1].role, UserRole::Admin);
        assert_eq!(users[1].status, UserStatus::Banned);
        assert!(!users[1].active);
    }
}
