//! Data access layer.
//!
//! # Purpose
//! Turns store rows into dashboard views ([`views`]) and validates and applies
//! the admin mutations ([`mutations`]). Each operation is independent: it
//! validates its own input and returns either its mapped result or a
//! [`DalError`].
//!
//! # Notes
//! Auxiliary lookups (category names, reporter profiles, alert type TTLs) are
//! best effort. A failure there is logged and the operation continues with
//! less detail rather than failing the whole read.
pub mod mutations;
pub mod views;

use crate::store::StoreError;
use thiserror::Error;

/// Client input that fails validation before any store call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid {0} id")]
    InvalidId(&'static str),
    #[error("No updates provided")]
    EmptyUpdate,
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
    #[error("Invalid priority: {0}")]
    InvalidPriority(String),
    #[error("ttl_minutes_override must be zero or greater")]
    NegativeTtl,
    #[error("Message is required")]
    MessageRequired,
    #[error("Admin profile not found")]
    MissingProfile,
    #[error("Title is required")]
    TitleRequired,
    #[error("report_id and authority_id required")]
    DispatchTargetRequired,
    #[error("Status required")]
    StatusRequired,
}

#[derive(Debug, Error)]
pub enum DalError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type DalResult<T> = Result<T, DalError>;

/// Parse a path segment into a row id, naming the entity in the error.
pub fn parse_path_id(raw: &str, entity: &'static str) -> Result<i64, ValidationError> {
    spotdesk_common::parse_id(raw).map_err(|_| ValidationError::InvalidId(entity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_id_message_names_entity() {
        let err = parse_path_id("abc", "report").unwrap_err();
        assert_eq!(err.to_string(), "Invalid report id");
        assert_eq!(parse_path_id("42", "dispatch").unwrap(), 42);
    }
}
