//! Caller authentication for the gateway.
//!
//! # Purpose
//! - [`provider`]: verifies a bearer credential against the identity backend.
//! - [`session`]: turns a credential into an [`Identity`], with a short-lived
//!   bounded cache in front of the provider and profile lookups.
//! - [`guard`]: axum middleware gating the admin routes.
pub mod guard;
pub mod provider;
pub mod session;

use serde::Serialize;
use utoipa::ToSchema;

/// A verified caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Identity {
    /// Identity provider user id.
    pub subject_id: String,
    /// Application profile id, when a profile row exists.
    pub app_user_id: Option<i64>,
    pub email: Option<String>,
    pub privileged: bool,
}
