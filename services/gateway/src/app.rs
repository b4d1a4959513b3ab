//! Gateway HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Layering
//! trace → CORS → panic catcher → body limit → (`/api/*`) rate limiter →
//! (admin routes) admin guard → handler. Unauthorized requests stop at the
//! guard and never reach the data layer.
use crate::api;
use crate::api::error::api_internal_message;
use crate::audit::AuditRecorder;
use crate::auth;
use crate::auth::session::SessionResolver;
use crate::config::RateLimitConfig;
use crate::observability;
use crate::ratelimit::{self, RateLimiter};
use crate::reporting::ErrorReporter;
use crate::store::GatewayStore;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use spotdesk_common::ClassificationPolicy;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GatewayStore>,
    /// `None` when no identity backend is configured; admin routes answer 503.
    pub resolver: Option<SessionResolver>,
    pub audit: AuditRecorder,
    pub reporter: Arc<dyn ErrorReporter>,
    pub limiter: Arc<RateLimiter>,
    pub policy: Arc<ClassificationPolicy>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn GatewayStore>,
        resolver: Option<SessionResolver>,
        reporter: Arc<dyn ErrorReporter>,
        rate_limit: RateLimitConfig,
        audit_enabled: bool,
    ) -> Self {
        Self {
            audit: AuditRecorder::new(store.clone(), reporter.clone(), audit_enabled),
            store,
            resolver,
            reporter,
            limiter: Arc::new(RateLimiter::new(rate_limit)),
            policy: Arc::new(ClassificationPolicy::default()),
        }
    }

    pub fn with_policy(mut self, policy: ClassificationPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/incidents", get(api::reports::list_incidents))
        .route("/api/complaints", get(api::reports::list_complaints))
        .route("/api/map/reports", get(api::reports::list_report_locations))
        .route(
            "/api/reports/:id",
            get(api::reports::get_report).post(api::reports::update_report),
        )
        .route("/api/reports/:id/delete", post(api::reports::delete_report))
        .route("/api/reports/:id/note", post(api::reports::add_note))
        .route("/api/alerts", post(api::alerts::create_alert))
        .route("/api/dispatch", post(api::dispatch::create_dispatch))
        .route(
            "/api/dispatch/:id/status",
            post(api::dispatch::update_dispatch_status),
        )
        .route("/api/users", get(api::users::list_users))
        .route("/api/users/:id/suspend", post(api::users::suspend_user))
        .route("/api/users/:id/activate", post(api::users::activate_user))
        .route("/api/audit", get(api::audit::list_audit))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::guard::require_admin,
        ))
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    let reporter = state.reporter.clone();
    let panic_layer = CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| -> Response {
        let message = panic_message(panic.as_ref());
        tracing::error!(panic = %message, "handler panicked");
        reporter.capture("http.panic", &message);
        api_internal_message("Internal server error").into_response()
    });

    let api_routes = Router::new()
        .route("/api/health", get(api::system::health))
        .route("/api/openapi.json", get(api::system::openapi_document))
        .route(
            "/api/session",
            get(api::session::get_session).delete(api::session::end_session),
        )
        .merge(admin_routes(&state))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            ratelimit::rate_limit,
        ));

    Router::new()
        .route("/", get(api::system::root))
        .merge(api_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(panic_layer)
        .layer(CorsLayer::permissive())
        .layer(trace_layer)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_common_payloads() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("boom"));
        assert_eq!(panic_message(owned.as_ref()), "boom");
        let borrowed: Box<dyn Any + Send> = Box::new("static boom");
        assert_eq!(panic_message(borrowed.as_ref()), "static boom");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
