//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Centralizes HTTP error construction so every gateway route answers with the
//! same `{ "error": ..., "code": ... }` shape.
//!
//! # Key invariants and assumptions
//! - `status` always matches the semantics of `body.code`.
//! - Store rejections pass the database message through (400); unexpected
//!   failures are logged, reported and answered with a generic message (500).
use crate::api::types::ErrorResponse;
use crate::reporting::ErrorReporter;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Structured API error returned by handlers and middleware.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
        },
    }
}

pub fn api_not_found(message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found", message)
}

/// Build a 400 error for malformed or disallowed client input.
pub fn api_validation_error(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// Build a 400 error carrying the store's refusal message.
pub fn api_rejected(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "rejected", message)
}

pub fn api_unauthorized(message: &str) -> ApiError {
    api_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

pub fn api_forbidden(message: &str) -> ApiError {
    api_error(StatusCode::FORBIDDEN, "forbidden", message)
}

pub fn api_rate_limited(message: &str) -> ApiError {
    api_error(StatusCode::TOO_MANY_REQUESTS, "rate_limited", message)
}

/// Build a 503 error for a gateway missing its identity backend.
pub fn api_unavailable(message: &str) -> ApiError {
    api_error(StatusCode::SERVICE_UNAVAILABLE, "unavailable", message)
}

/// Build a 500 error with a generic message. Callers log and report first.
pub fn api_internal_message(message: &str) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Translate a store failure into an HTTP error.
///
/// # What it does
/// - `NotFound` becomes 404 with `"<entity> not found"`.
/// - `Rejected` and `PermissionDenied` become 400 with the store message.
/// - `Unexpected` is logged, handed to the reporter and becomes a 500 with
///   `message`, which must not leak internals.
pub fn api_store_error(reporter: &dyn ErrorReporter, message: &str, err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound(entity) => api_not_found(&format!("{entity} not found")),
        StoreError::Rejected(detail) | StoreError::PermissionDenied(detail) => {
            tracing::warn!(error = %detail, "store rejected request");
            api_rejected(&detail)
        }
        StoreError::Unexpected(err) => {
            tracing::error!(error = ?err, "gateway storage error");
            reporter.capture(message, &err);
            api_internal_message(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ErrorReporter for Recorder {
        fn capture(&self, context: &str, _error: &dyn std::fmt::Display) {
            self.0.lock().expect("lock").push(context.to_string());
        }
    }

    #[test]
    fn api_error_helpers_build_expected_codes() {
        let cases = [
            (api_not_found("x"), StatusCode::NOT_FOUND, "not_found"),
            (api_validation_error("x"), StatusCode::BAD_REQUEST, "validation_error"),
            (api_rejected("x"), StatusCode::BAD_REQUEST, "rejected"),
            (api_unauthorized("x"), StatusCode::UNAUTHORIZED, "unauthorized"),
            (api_forbidden("x"), StatusCode::FORBIDDEN, "forbidden"),
            (api_rate_limited("x"), StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            (api_unavailable("x"), StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            (api_internal_message("x"), StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status, status);
            assert_eq!(err.body.code, code);
            assert_eq!(err.body.error, "x");
        }
    }

    #[test]
    fn store_errors_map_to_statuses() {
        let reporter = Recorder::default();
        let not_found = api_store_error(&reporter, "Failed", StoreError::NotFound("report".into()));
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found.body.error, "report not found");

        let rejected = api_store_error(
            &reporter,
            "Failed",
            StoreError::Rejected("invalid input value for enum".into()),
        );
        assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
        assert_eq!(rejected.body.error, "invalid input value for enum");
        assert!(reporter.0.lock().expect("lock").is_empty());

        let internal = api_store_error(
            &reporter,
            "Failed to update report",
            StoreError::Unexpected(anyhow::anyhow!("pool timed out")),
        );
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.body.error, "Failed to update report");
        assert_eq!(reporter.0.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn api_error_into_response_sets_status_and_body() {
        let response = api_forbidden("Admin privileges required").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(value["error"], "Admin privileges required");
        assert_eq!(value["code"], "forbidden");
    }
}
