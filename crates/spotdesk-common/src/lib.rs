// Shared report types, classification policy and row mapping helpers.
pub mod classify;
pub mod view;

pub use classify::{ClassificationPolicy, ComplaintBucket, OutageRule, ReportKind};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid id: {0}")]
    InvalidId(String),
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("policy error: {0}")]
    Policy(String),
}

/// Parse a path identifier into a positive row id.
///
/// Only ASCII digits are accepted; zero, signs, whitespace and trailing garbage
/// are rejected so no query is issued for a malformed id.
pub fn parse_id(input: &str) -> Result<i64> {
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidId(input.to_string()));
    }
    match input.parse::<i64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(Error::InvalidId(input.to_string())),
    }
}
