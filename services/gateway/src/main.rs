//! Spotdesk gateway HTTP service entry point.
//!
//! # Purpose
//! Wires configuration, storage, the session resolver and the HTTP router,
//! then serves until Ctrl-C.
//!
//! # Notes
//! `build_state` keeps wiring testable and `main` small.
use anyhow::Context;
use gateway::app::{AppState, build_router};
use gateway::auth::provider::HostedIdentityProvider;
use gateway::auth::session::{AuthCache, SessionResolver};
use gateway::config::{GatewayConfig, StorageBackend};
use gateway::observability;
use gateway::reporting::{ErrorReporter, TracingErrorReporter};
use gateway::store::GatewayStore;
use gateway::store::memory::InMemoryStore;
use gateway::store::postgres::PostgresStore;
use spotdesk_common::ClassificationPolicy;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const SERVICE_NAME: &str = "spotdesk-gateway";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env_or_yaml().context("load gateway config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: GatewayConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability(SERVICE_NAME, &config.environment);
    let state = build_state(config.clone()).await?;
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);
    let addr = config.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, "gateway listening");
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()) => {
            result?;
        }
        _ = &mut shutdown => {
            tracing::info!("shutdown requested");
        }
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

fn load_policy(config: &GatewayConfig) -> anyhow::Result<ClassificationPolicy> {
    let Some(path) = config.classification_policy_path.as_ref() else {
        return Ok(ClassificationPolicy::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("read classification policy {}", path.display()))?;
    ClassificationPolicy::from_yaml(&contents)
        .with_context(|| format!("parse classification policy {}", path.display()))
}

async fn build_state(config: GatewayConfig) -> anyhow::Result<AppState> {
    let tracker = TracingErrorReporter::new(
        config.environment.clone(),
        config.error_tracking_dsn.as_deref(),
    );
    if !tracker.is_forwarding() {
        tracing::info!("error tracking DSN not set; captured errors are only logged");
    }
    let reporter: Arc<dyn ErrorReporter> = Arc::new(tracker);
    let policy = load_policy(&config)?;
    let store: Arc<dyn GatewayStore> = match config.storage {
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            Arc::new(
                PostgresStore::connect(pg)
                    .await
                    .context("connect postgres pool")?,
            )
        }
    };

    let resolver = match config.identity.as_ref() {
        Some(identity) => {
            let provider =
                HostedIdentityProvider::new(identity).context("build identity client")?;
            Some(SessionResolver::new(
                Arc::new(provider),
                store.clone(),
                AuthCache::new(
                    Duration::from_secs(config.auth_cache.ttl_secs),
                    config.auth_cache.max_entries,
                ),
                config.privileged_role.clone(),
                reporter.clone(),
            ))
        }
        None => {
            tracing::warn!("identity backend not configured; admin routes will answer 503");
            None
        }
    };

    tracing::info!(
        backend = store.backend_name(),
        admin_enabled = resolver.is_some(),
        audit_enabled = config.audit_enabled,
        "gateway state ready"
    );
    Ok(AppState::new(
        store,
        resolver,
        reporter,
        config.rate_limit,
        config.audit_enabled,
    )
    .with_policy(policy))
}
