//! Postgres-backed implementation of the gateway store.
//!
//! # What this module is
//! Reads and writes against the shared application database through a
//! `sqlx` pool. The schema (reports, users, alerts, dispatches, audit events)
//! is owned by the wider application; this module never migrates it.
//!
//! # Key invariants
//! - Every mutation targets a single row by primary key and reports a missing
//!   row as [`StoreError::NotFound`].
//! - Report deletion prefers the `admin_delete_report` stored procedure and
//!   falls back to deleting media then the report inside one transaction.
//!
//! # Operational notes
//! Connect and acquire timeouts are explicit so a wedged database fails
//! requests quickly instead of hanging them. Avoid logging `pg.url`; it may
//! carry credentials.
use super::{
    AccountStatus, Alert, AuditEntry, AuditStore, Category, Dispatch, MediaRow, NewAlert,
    NewFeedback, ProfileStore, ReportRow, ReportStore, ReportUpdate, StoreError, StoreResult,
    Subcategory, UserRow,
};
use crate::config::PostgresConfig;
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;

const REPORT_COLUMNS: &str = "report_id, title, description, status, priority, created_at, \
     updated_at, notify_scope, location_name, address, city, latitude, longitude, user_id, \
     category_id, subcategory_id, ttl_minutes_override";

const USER_COLUMNS: &str = "user_id, auth_user_id, full_name, id_number, role, account_status, email";

const ALERT_COLUMNS: &str =
    "alert_id, title, description, category, subtype, status, live_until, geom, created_at";

const DISPATCH_COLUMNS: &str = "id, report_id, authority_id, status, created_at";

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let pool = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options);
        let pool = tokio::time::timeout(Duration::from_millis(pg.connect_timeout_ms), pool)
            .await
            .map_err(|_| StoreError::Unexpected(anyhow::anyhow!("postgres connect timed out")))??;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn report_exists(&self, report_id: i64) -> StoreResult<bool> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reports WHERE report_id = $1")
                .bind(report_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl ReportStore for PostgresStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT category_id, name, slug FROM report_categories ORDER BY category_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_subcategories(&self) -> StoreResult<Vec<Subcategory>> {
        let rows = sqlx::query_as::<_, Subcategory>(
            "SELECT subcategory_id, name FROM report_subcategories ORDER BY subcategory_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn recent_reports(&self, limit: i64) -> StoreResult<Vec<ReportRow>> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports ORDER BY created_at DESC, report_id DESC LIMIT $1"
        );
        let rows = sqlx::query_as::<_, ReportRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn located_reports(&self, limit: i64) -> StoreResult<Vec<ReportRow>> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports \
             WHERE latitude IS NOT NULL AND longitude IS NOT NULL \
             ORDER BY created_at DESC, report_id DESC LIMIT $1"
        );
        let rows = sqlx::query_as::<_, ReportRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_report(&self, report_id: i64) -> StoreResult<Option<ReportRow>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE report_id = $1");
        let row = sqlx::query_as::<_, ReportRow>(&sql)
            .bind(report_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn report_media(&self, report_id: i64) -> StoreResult<Vec<MediaRow>> {
        let rows = sqlx::query_as::<_, MediaRow>(
            "SELECT media_id, report_id, media_type, storage_url, thumbnail_url, created_at \
             FROM report_media WHERE report_id = $1 ORDER BY created_at ASC, media_id ASC",
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_report(&self, report_id: i64, update: ReportUpdate) -> StoreResult<ReportRow> {
        // $4 says whether the TTL override is being set at all; $5 is the new
        // value, which may be NULL to clear it.
        let sql = format!(
            "UPDATE reports SET \
                 status = COALESCE($2, status), \
                 priority = COALESCE($3, priority), \
                 ttl_minutes_override = CASE WHEN $4 THEN $5 ELSE ttl_minutes_override END, \
                 updated_at = NOW() \
             WHERE report_id = $1 RETURNING {REPORT_COLUMNS}"
        );
        let ttl_present = update.ttl_minutes_override.is_some();
        let ttl_value = update.ttl_minutes_override.flatten();
        sqlx::query_as::<_, ReportRow>(&sql)
            .bind(report_id)
            .bind(update.status)
            .bind(update.priority)
            .bind(ttl_present)
            .bind(ttl_value)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound("report".into()))
    }

    async fn delete_report(&self, report_id: i64) -> StoreResult<()> {
        if !self.report_exists(report_id).await? {
            return Err(StoreError::NotFound("report".into()));
        }

        match sqlx::query("SELECT admin_delete_report($1)")
            .bind(report_id)
            .execute(&self.pool)
            .await
        {
            Ok(_) => return Ok(()),
            Err(err) => {
                tracing::warn!(error = %err, report_id, "admin_delete_report failed, deleting directly");
            }
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM report_media WHERE report_id = $1")
            .bind(report_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM reports WHERE report_id = $1")
            .bind(report_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("report".into()));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn add_feedback(&self, feedback: NewFeedback) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO report_feedbacks (report_id, user_id, feedback_type, comment) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(feedback.report_id)
        .bind(feedback.user_id)
        .bind(&feedback.feedback_type)
        .bind(&feedback.comment)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn alert_type_ttl_minutes(
        &self,
        category: &str,
        subtype: &str,
    ) -> StoreResult<Option<i64>> {
        let ttl = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT default_ttl_minutes::BIGINT FROM alert_types \
             WHERE category = $1 AND subtype = $2 LIMIT 1",
        )
        .bind(category)
        .bind(subtype)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ttl.flatten())
    }

    async fn create_alert(&self, alert: NewAlert) -> StoreResult<Alert> {
        let sql = format!(
            "INSERT INTO alerts (title, description, category, subtype, status, live_until, geom) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ALERT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Alert>(&sql)
            .bind(&alert.title)
            .bind(&alert.description)
            .bind(&alert.category)
            .bind(&alert.subtype)
            .bind(&alert.status)
            .bind(alert.live_until)
            .bind(&alert.geom)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_dispatch(&self, report_id: i64, authority_id: i64) -> StoreResult<Dispatch> {
        let sql = format!(
            "INSERT INTO report_authority_dispatches (report_id, authority_id, status) \
             VALUES ($1, $2, 'pending') RETURNING {DISPATCH_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Dispatch>(&sql)
            .bind(report_id)
            .bind(authority_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_dispatch_status(&self, id: i64, status: &str) -> StoreResult<Dispatch> {
        let sql = format!(
            "UPDATE report_authority_dispatches SET status = $2 WHERE id = $1 \
             RETURNING {DISPATCH_COLUMNS}"
        );
        sqlx::query_as::<_, Dispatch>(&sql)
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound("dispatch".into()))
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait]
impl ProfileStore for PostgresStore {
    async fn profile_by_auth_id(&self, auth_user_id: &str) -> StoreResult<Option<UserRow>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE auth_user_id = $1 LIMIT 1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(auth_user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn ensure_profile(
        &self,
        auth_user_id: &str,
        email: Option<&str>,
    ) -> StoreResult<UserRow> {
        if let Some(existing) = self.profile_by_auth_id(auth_user_id).await? {
            return Ok(existing);
        }
        let sql = format!(
            "INSERT INTO users (auth_user_id, email, role, account_status) \
             VALUES ($1, $2, 'user', $3) RETURNING {USER_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, UserRow>(&sql)
            .bind(auth_user_id)
            .bind(email)
            .bind(AccountStatus::Pending.as_str())
            .fetch_one(&self.pool)
            .await;
        match inserted {
            Ok(row) => Ok(row),
            // A concurrent first sign-in won the insert.
            Err(err) if is_unique_violation(&err) => self
                .profile_by_auth_id(auth_user_id)
                .await?
                .ok_or_else(|| StoreError::NotFound("profile".into())),
            Err(err) => Err(err.into()),
        }
    }

    async fn users_by_ids(&self, user_ids: &[i64]) -> StoreResult<Vec<UserRow>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ANY($1)");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_users(&self, limit: i64) -> StoreResult<Vec<UserRow>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY user_id ASC LIMIT $1");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn set_account_status(&self, user_id: i64, status: AccountStatus) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET account_status = $2, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AuditStore for PostgresStore {
    async fn insert_audit(&self, entry: AuditEntry) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO audit_events \
             (action, actor_auth_user_id, actor_app_user_id, request_path, payload, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&entry.action)
        .bind(&entry.actor_auth_user_id)
        .bind(entry.actor_app_user_id)
        .bind(&entry.request_path)
        .bind(&entry.payload)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_audit(&self, limit: i64) -> StoreResult<Vec<AuditEntry>> {
        let rows = sqlx::query_as::<_, AuditEntry>(
            "SELECT action, actor_auth_user_id, actor_app_user_id, request_path, payload, created_at \
             FROM audit_events ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}
