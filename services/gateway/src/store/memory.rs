//! In-memory implementation of the gateway store.
//!
//! # Purpose
//! Implements [`ReportStore`], [`ProfileStore`] and [`AuditStore`] on maps
//! guarded by `tokio::sync::RwLock`. Used for local development and for the
//! HTTP test-suite; nothing survives a restart.
//!
//! # Notes
//! Seeding helpers (`insert_*`) stand in for the rows the mobile app and other
//! tools would write into the shared database.
use super::{
    AccountStatus, Alert, AuditEntry, AuditStore, Category, Dispatch, MediaRow, NewAlert,
    NewFeedback, ProfileStore, ReportRow, ReportStore, ReportUpdate, StoreError, StoreResult,
    Subcategory, UserRow,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFeedback {
    pub feedback_id: i64,
    pub report_id: i64,
    pub user_id: i64,
    pub feedback_type: String,
    pub comment: String,
}

pub struct InMemoryStore {
    reports: Arc<RwLock<BTreeMap<i64, ReportRow>>>,
    categories: Arc<RwLock<BTreeMap<i64, Category>>>,
    subcategories: Arc<RwLock<BTreeMap<i64, Subcategory>>>,
    media: Arc<RwLock<Vec<MediaRow>>>,
    users: Arc<RwLock<BTreeMap<i64, UserRow>>>,
    feedbacks: Arc<RwLock<Vec<StoredFeedback>>>,
    alert_types: Arc<RwLock<HashMap<(String, String), i64>>>,
    alerts: Arc<RwLock<Vec<Alert>>>,
    dispatches: Arc<RwLock<BTreeMap<i64, Dispatch>>>,
    audit: Arc<RwLock<Vec<AuditEntry>>>,
    /// Mirrors a deployment where the `audit_events` table was never created.
    audit_table: AtomicBool,
    /// Mirrors row-level security refusing profile reads to the service role.
    profile_reads_denied: AtomicBool,
    next_id: AtomicI64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            reports: Arc::new(RwLock::new(BTreeMap::new())),
            categories: Arc::new(RwLock::new(BTreeMap::new())),
            subcategories: Arc::new(RwLock::new(BTreeMap::new())),
            media: Arc::new(RwLock::new(Vec::new())),
            users: Arc::new(RwLock::new(BTreeMap::new())),
            feedbacks: Arc::new(RwLock::new(Vec::new())),
            alert_types: Arc::new(RwLock::new(HashMap::new())),
            alerts: Arc::new(RwLock::new(Vec::new())),
            dispatches: Arc::new(RwLock::new(BTreeMap::new())),
            audit: Arc::new(RwLock::new(Vec::new())),
            audit_table: AtomicBool::new(true),
            profile_reads_denied: AtomicBool::new(false),
            next_id: AtomicI64::new(1000),
        }
    }

    /// A store whose audit inserts always fail, as if the table were missing.
    pub fn without_audit_table() -> Self {
        let store = Self::new();
        store.audit_table.store(false, Ordering::SeqCst);
        store
    }

    pub fn deny_profile_reads(&self) {
        self.profile_reads_denied.store(true, Ordering::SeqCst);
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub async fn insert_report(&self, report: ReportRow) {
        self.reports.write().await.insert(report.report_id, report);
    }

    pub async fn insert_category(&self, category: Category) {
        self.categories
            .write()
            .await
            .insert(category.category_id, category);
    }

    pub async fn insert_subcategory(&self, subcategory: Subcategory) {
        self.subcategories
            .write()
            .await
            .insert(subcategory.subcategory_id, subcategory);
    }

    pub async fn insert_media(&self, media: MediaRow) {
        self.media.write().await.push(media);
    }

    pub async fn insert_user(&self, user: UserRow) {
        self.users.write().await.insert(user.user_id, user);
    }

    pub async fn insert_alert_type(&self, category: &str, subtype: &str, ttl_minutes: i64) {
        self.alert_types
            .write()
            .await
            .insert((category.to_string(), subtype.to_string()), ttl_minutes);
    }

    pub async fn feedbacks(&self) -> Vec<StoredFeedback> {
        self.feedbacks.read().await.clone()
    }

    pub async fn media_count(&self, report_id: i64) -> usize {
        self.media
            .read()
            .await
            .iter()
            .filter(|item| item.report_id == report_id)
            .count()
    }

    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.read().await.clone()
    }
}

fn newest_first(mut rows: Vec<ReportRow>) -> Vec<ReportRow> {
    rows.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then(b.report_id.cmp(&a.report_id))
    });
    rows
}

#[async_trait]
impl ReportStore for InMemoryStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self.categories.read().await.values().cloned().collect())
    }

    async fn list_subcategories(&self) -> StoreResult<Vec<Subcategory>> {
        Ok(self.subcategories.read().await.values().cloned().collect())
    }

    async fn recent_reports(&self, limit: i64) -> StoreResult<Vec<ReportRow>> {
        let rows = self.reports.read().await.values().cloned().collect();
        Ok(newest_first(rows)
            .into_iter()
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn located_reports(&self, limit: i64) -> StoreResult<Vec<ReportRow>> {
        let rows = self
            .reports
            .read()
            .await
            .values()
            .filter(|row| row.latitude.is_some() && row.longitude.is_some())
            .cloned()
            .collect();
        Ok(newest_first(rows)
            .into_iter()
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn get_report(&self, report_id: i64) -> StoreResult<Option<ReportRow>> {
        Ok(self.reports.read().await.get(&report_id).cloned())
    }

    async fn report_media(&self, report_id: i64) -> StoreResult<Vec<MediaRow>> {
        let mut items: Vec<MediaRow> = self
            .media
            .read()
            .await
            .iter()
            .filter(|item| item.report_id == report_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.created_at);
        Ok(items)
    }

    async fn update_report(&self, report_id: i64, update: ReportUpdate) -> StoreResult<ReportRow> {
        let mut reports = self.reports.write().await;
        let row = reports
            .get_mut(&report_id)
            .ok_or_else(|| StoreError::NotFound("report".into()))?;
        if let Some(status) = update.status {
            row.status = Some(status);
        }
        if let Some(priority) = update.priority {
            row.priority = Some(priority);
        }
        if let Some(ttl) = update.ttl_minutes_override {
            row.ttl_minutes_override = ttl;
        }
        row.updated_at = Some(Utc::now());
        Ok(row.clone())
    }

    async fn delete_report(&self, report_id: i64) -> StoreResult<()> {
        let mut reports = self.reports.write().await;
        if reports.remove(&report_id).is_none() {
            return Err(StoreError::NotFound("report".into()));
        }
        self.media
            .write()
            .await
            .retain(|item| item.report_id != report_id);
        Ok(())
    }

    async fn add_feedback(&self, feedback: NewFeedback) -> StoreResult<()> {
        if !self.reports.read().await.contains_key(&feedback.report_id) {
            return Err(StoreError::Rejected(format!(
                "report {} does not exist",
                feedback.report_id
            )));
        }
        let feedback_id = self.allocate_id();
        self.feedbacks.write().await.push(StoredFeedback {
            feedback_id,
            report_id: feedback.report_id,
            user_id: feedback.user_id,
            feedback_type: feedback.feedback_type,
            comment: feedback.comment,
        });
        Ok(())
    }

    async fn alert_type_ttl_minutes(
        &self,
        category: &str,
        subtype: &str,
    ) -> StoreResult<Option<i64>> {
        Ok(self
            .alert_types
            .read()
            .await
            .get(&(category.to_string(), subtype.to_string()))
            .copied())
    }

    async fn create_alert(&self, alert: NewAlert) -> StoreResult<Alert> {
        let row = Alert {
            alert_id: self.allocate_id(),
            title: alert.title,
            description: alert.description,
            category: alert.category,
            subtype: alert.subtype,
            status: alert.status,
            live_until: alert.live_until,
            geom: alert.geom,
            created_at: Utc::now(),
        };
        self.alerts.write().await.push(row.clone());
        Ok(row)
    }

    async fn create_dispatch(&self, report_id: i64, authority_id: i64) -> StoreResult<Dispatch> {
        if !self.reports.read().await.contains_key(&report_id) {
            return Err(StoreError::Rejected(format!(
                "report {report_id} does not exist"
            )));
        }
        let row = Dispatch {
            id: self.allocate_id(),
            report_id,
            authority_id,
            status: "pending".to_string(),
            created_at: Utc::now(),
        };
        self.dispatches.write().await.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_dispatch_status(&self, id: i64, status: &str) -> StoreResult<Dispatch> {
        let mut dispatches = self.dispatches.write().await;
        let row = dispatches
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("dispatch".into()))?;
        row.status = status.to_string();
        Ok(row.clone())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn profile_by_auth_id(&self, auth_user_id: &str) -> StoreResult<Option<UserRow>> {
        if self.profile_reads_denied.load(Ordering::SeqCst) {
            return Err(StoreError::PermissionDenied(
                "permission denied for table users".to_string(),
            ));
        }
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.auth_user_id.as_deref() == Some(auth_user_id))
            .cloned())
    }

    async fn ensure_profile(
        &self,
        auth_user_id: &str,
        email: Option<&str>,
    ) -> StoreResult<UserRow> {
        let mut users = self.users.write().await;
        if let Some(existing) = users
            .values()
            .find(|user| user.auth_user_id.as_deref() == Some(auth_user_id))
        {
            return Ok(existing.clone());
        }
        let row = UserRow {
            user_id: self.allocate_id(),
            auth_user_id: Some(auth_user_id.to_string()),
            full_name: None,
            id_number: None,
            role: Some("user".to_string()),
            account_status: Some(AccountStatus::Pending.as_str().to_string()),
            email: email.map(str::to_string),
        };
        users.insert(row.user_id, row.clone());
        Ok(row)
    }

    async fn users_by_ids(&self, user_ids: &[i64]) -> StoreResult<Vec<UserRow>> {
        let users = self.users.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| users.get(id).cloned())
            .collect())
    }

    async fn list_users(&self, limit: i64) -> StoreResult<Vec<UserRow>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn set_account_status(&self, user_id: i64, status: AccountStatus) -> StoreResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound("user".into()))?;
        user.account_status = Some(status.as_str().to_string());
        Ok(())
    }
}

#[async_trait]
impl AuditStore for InMemoryStore {
    async fn insert_audit(&self, entry: AuditEntry) -> StoreResult<()> {
        if !self.audit_table.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected(
                "relation \"audit_events\" does not exist".to_string(),
            ));
        }
        self.audit.write().await.push(entry);
        Ok(())
    }

    async fn recent_audit(&self, limit: i64) -> StoreResult<Vec<AuditEntry>> {
        Ok(self
            .audit
            .read()
            .await
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
