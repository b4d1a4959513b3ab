//! Spotdesk mutation gateway library crate.
//!
//! # Purpose
//! Exposes the gateway's HTTP API, session resolution, configuration, data
//! access layer and storage implementations for use by the binary and tests.
pub mod api;
pub mod app;
pub mod audit;
pub mod auth;
pub mod config;
pub mod dal;
pub mod observability;
pub mod ratelimit;
pub mod reporting;
pub mod store;
