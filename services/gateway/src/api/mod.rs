//! Gateway HTTP API module.
//!
//! # Purpose
//! Route handler modules plus the helpers they share for request body
//! parsing and data-access error translation.
pub mod alerts;
pub mod audit;
pub mod dispatch;
pub mod error;
pub mod openapi;
pub mod reports;
pub mod session;
pub mod system;
pub mod types;
pub mod users;

use crate::api::error::{ApiError, api_store_error, api_validation_error};
use crate::app::AppState;
use crate::dal::{DalError, ValidationError};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde::Serialize;

/// Unwrap a JSON body, answering 400 with the parser's message on failure.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| api_validation_error(&rejection.body_text()))
}

pub(crate) fn invalid(err: ValidationError) -> ApiError {
    api_validation_error(&err.to_string())
}

/// Translate a data-access failure; `message` is the generic 500 text.
pub(crate) fn dal_error(state: &AppState, message: &str, err: DalError) -> ApiError {
    match err {
        DalError::Invalid(err) => invalid(err),
        DalError::Store(store) => api_store_error(state.reporter.as_ref(), message, store),
    }
}

/// Serialize a mutation result for the audit trail. A value that cannot be
/// serialized is logged and recorded as `null`.
pub(crate) fn audit_payload<T: Serialize>(action: &str, value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|err| {
        tracing::warn!(error = %err, action, "audit payload serialization failed");
        serde_json::Value::Null
    })
}
