#![cfg(feature = "pg-tests")]

use gateway::config::PostgresConfig;
use gateway::store::postgres::PostgresStore;
use gateway::store::{
    AccountStatus, AuditEntry, AuditStore, NewFeedback, ProfileStore, ReportStore, ReportUpdate,
    StoreError,
};
use serial_test::serial;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

const FIXTURE: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        user_id BIGSERIAL PRIMARY KEY,
        auth_user_id TEXT UNIQUE,
        full_name TEXT,
        id_number TEXT,
        role TEXT,
        account_status TEXT,
        email TEXT,
        updated_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS reports (
        report_id BIGSERIAL PRIMARY KEY,
        title TEXT,
        description TEXT,
        status TEXT,
        priority TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ,
        notify_scope TEXT,
        location_name TEXT,
        address TEXT,
        city TEXT,
        latitude DOUBLE PRECISION,
        longitude DOUBLE PRECISION,
        user_id BIGINT,
        category_id BIGINT,
        subcategory_id BIGINT,
        ttl_minutes_override INT
    )",
    "CREATE TABLE IF NOT EXISTS report_media (
        media_id BIGSERIAL PRIMARY KEY,
        report_id BIGINT NOT NULL,
        media_type TEXT NOT NULL,
        storage_url TEXT NOT NULL,
        thumbnail_url TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS report_feedbacks (
        feedback_id BIGSERIAL PRIMARY KEY,
        report_id BIGINT NOT NULL REFERENCES reports(report_id) ON DELETE CASCADE,
        user_id BIGINT NOT NULL,
        feedback_type TEXT NOT NULL,
        comment TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS audit_events (
        id BIGSERIAL PRIMARY KEY,
        action TEXT NOT NULL,
        actor_auth_user_id TEXT,
        actor_app_user_id BIGINT,
        request_path TEXT NOT NULL,
        payload JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "TRUNCATE report_feedbacks, report_media, reports, users, audit_events RESTART IDENTITY",
];

async fn pg_store() -> Option<(PostgresStore, sqlx::PgPool)> {
    let url = match std::env::var("SPOTDESK_TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("skipping pg-tests: set SPOTDESK_TEST_DATABASE_URL or DATABASE_URL");
            return None;
        }
    };
    let pool = match tokio::time::timeout(
        Duration::from_secs(2),
        PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(2))
            .connect(&url),
    )
    .await
    {
        Ok(Ok(pool)) => pool,
        Ok(Err(err)) => {
            eprintln!("skipping pg-tests: cannot connect to postgres: {err}");
            return None;
        }
        Err(_) => {
            eprintln!("skipping pg-tests: postgres connect timed out");
            return None;
        }
    };
    for statement in FIXTURE {
        sqlx::query(statement).execute(&pool).await.expect("fixture");
    }
    let store = PostgresStore::connect(&PostgresConfig {
        url,
        max_connections: 2,
        connect_timeout_ms: 5_000,
        acquire_timeout_ms: 5_000,
    })
    .await
    .expect("connect");
    Some((store, pool))
}

async fn insert_report(pool: &sqlx::PgPool, title: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO reports (title, status, priority, latitude, longitude) \
         VALUES ($1, 'submitted', 'normal', -26.2, 28.04) RETURNING report_id",
    )
    .bind(title)
    .fetch_one(pool)
    .await
    .expect("insert report")
}

#[tokio::test]
#[serial]
async fn report_update_and_delete_round_trip() {
    let Some((store, pool)) = pg_store().await else {
        return;
    };
    store.health_check().await.expect("health");
    let report_id = insert_report(&pool, "Burst pipe").await;
    sqlx::query(
        "INSERT INTO report_media (report_id, media_type, storage_url) VALUES ($1, 'image', 'u')",
    )
    .bind(report_id)
    .execute(&pool)
    .await
    .expect("media");

    let row = store
        .update_report(
            report_id,
            ReportUpdate {
                status: Some("assigned".to_string()),
                ttl_minutes_override: Some(Some(30)),
                ..ReportUpdate::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(row.status.as_deref(), Some("assigned"));
    assert_eq!(row.priority.as_deref(), Some("normal"));
    assert_eq!(row.ttl_minutes_override, Some(30));
    assert!(row.updated_at.is_some());

    let cleared = store
        .update_report(
            report_id,
            ReportUpdate {
                ttl_minutes_override: Some(None),
                ..ReportUpdate::default()
            },
        )
        .await
        .expect("clear ttl");
    assert_eq!(cleared.ttl_minutes_override, None);
    assert_eq!(cleared.status.as_deref(), Some("assigned"));

    assert_eq!(store.located_reports(10).await.expect("located").len(), 1);

    store.delete_report(report_id).await.expect("delete");
    assert!(store.get_report(report_id).await.expect("get").is_none());
    assert!(store.report_media(report_id).await.expect("media").is_empty());
    assert!(matches!(
        store.delete_report(report_id).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
#[serial]
async fn feedback_requires_existing_report() {
    let Some((store, pool)) = pg_store().await else {
        return;
    };
    let report_id = insert_report(&pool, "Streetlight out").await;
    store
        .add_feedback(NewFeedback {
            report_id,
            user_id: 1,
            feedback_type: "comment".to_string(),
            comment: "on it".to_string(),
        })
        .await
        .expect("feedback");
    let err = store
        .add_feedback(NewFeedback {
            report_id: report_id + 1000,
            user_id: 1,
            feedback_type: "comment".to_string(),
            comment: "orphan".to_string(),
        })
        .await
        .expect_err("foreign key");
    assert!(matches!(err, StoreError::Rejected(_)));
}

#[tokio::test]
#[serial]
async fn profiles_are_provisioned_once_and_status_changes() {
    let Some((store, _pool)) = pg_store().await else {
        return;
    };
    let first = store
        .ensure_profile("auth-1", Some("one@example.com"))
        .await
        .expect("ensure");
    let second = store.ensure_profile("auth-1", None).await.expect("ensure");
    assert_eq!(first.user_id, second.user_id);
    assert_eq!(first.account_status.as_deref(), Some("pending"));

    store
        .set_account_status(first.user_id, AccountStatus::Suspended)
        .await
        .expect("suspend");
    let reloaded = store
        .profile_by_auth_id("auth-1")
        .await
        .expect("lookup")
        .expect("profile");
    assert_eq!(reloaded.account_status.as_deref(), Some("suspended"));
    assert!(matches!(
        store.set_account_status(9_999, AccountStatus::Active).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
#[serial]
async fn audit_entries_are_listed_newest_first() {
    let Some((store, _pool)) = pg_store().await else {
        return;
    };
    for (offset, action) in ["report.update", "report.delete"].iter().enumerate() {
        store
            .insert_audit(AuditEntry {
                action: action.to_string(),
                actor_auth_user_id: Some("auth-admin".to_string()),
                actor_app_user_id: Some(1),
                request_path: "/api/reports/1".to_string(),
                payload: serde_json::json!({ "report_id": 1 }),
                created_at: chrono::Utc::now() + chrono::Duration::seconds(offset as i64),
            })
            .await
            .expect("audit");
    }
    let entries = store.recent_audit(10).await.expect("recent");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, "report.delete");
    assert_eq!(entries[0].payload["report_id"], 1);
}
