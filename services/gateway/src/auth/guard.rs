//! Admin guard middleware.
//!
//! # Purpose
//! Gates the admin routes: every request must carry a bearer credential that
//! resolves to a privileged [`Identity`]. The identity is stored in request
//! extensions for handlers (audit actor, note author).
//!
//! # Key invariants
//! - Pre-flight `OPTIONS` requests pass through untouched.
//! - A rejected request never reaches a handler or the store.
//! - No retries; one resolver call per request at most.
use crate::api::error::{
    ApiError, api_forbidden, api_internal_message, api_unauthorized, api_unavailable,
};
use crate::app::AppState;
use crate::auth::Identity;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Pull the credential out of `Authorization: Bearer <credential>`.
///
/// The scheme is matched case-insensitively and may be followed by any
/// whitespace.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim_start().split_once(char::is_whitespace))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, credential)| credential.trim())
        .filter(|credential| !credential.is_empty())
}

/// Resolve the caller without checking privilege.
///
/// Returns the credential alongside the identity so session routes can
/// invalidate or refresh the cache entry.
pub(crate) async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(String, Identity), ApiError> {
    let Some(resolver) = state.resolver.as_ref() else {
        return Err(api_unavailable("Server not configured for admin actions"));
    };
    let credential =
        extract_bearer(headers).ok_or_else(|| api_unauthorized("Missing bearer token"))?;
    match resolver.resolve(credential).await {
        Ok(Some(identity)) => Ok((credential.to_string(), identity)),
        Ok(None) => Err(api_unauthorized("Invalid or expired token")),
        Err(err) => {
            tracing::error!(error = %err, "session resolution failed");
            Err(api_internal_message("Failed to verify session"))
        }
    }
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }
    let identity = match authenticate(&state, request.headers()).await {
        Ok((_, identity)) => identity,
        Err(err) => {
            metrics::counter!("spotdesk_gateway_auth_rejections_total", "status" => err.status.as_str().to_string())
                .increment(1);
            return err.into_response();
        }
    };
    if !identity.privileged {
        tracing::debug!(subject = %identity.subject_id, "non-admin caller rejected");
        metrics::counter!("spotdesk_gateway_auth_rejections_total", "status" => "403")
            .increment(1);
        return api_forbidden("Admin privileges required").into_response();
    }
    request.extensions_mut().insert(identity);
    next.run(request).await
}
