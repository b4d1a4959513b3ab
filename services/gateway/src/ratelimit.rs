//! Per-client fixed-window rate limiting for `/api/*`.
//!
//! # Purpose
//! Caps each client address at `max_requests` per `window`. Responses carry
//! `RateLimit` and `RateLimit-Policy` headers in the IETF draft-7 shape; a
//! rejected request gets 429 with `Retry-After`.
//!
//! # Notes
//! Windows live in a `DashMap` keyed by client IP. Requests without a known
//! peer address (in-process tests) share the `unknown` bucket. Stale windows
//! are swept when the map grows past [`SWEEP_THRESHOLD`].
use crate::api::error::api_rate_limited;
use crate::app::AppState;
use crate::config::RateLimitConfig;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_secs: u64,
}

#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            window: Duration::from_secs(config.window_secs.max(1)),
            max_requests: config.max_requests.max(1),
        }
    }

    pub fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        if self.windows.len() > SWEEP_THRESHOLD {
            let window = self.window;
            self.windows
                .retain(|_, entry| now.duration_since(entry.started) < window);
        }
        let mut entry = self.windows.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }
        let allowed = entry.count < self.max_requests;
        if allowed {
            entry.count += 1;
        }
        let elapsed = now.duration_since(entry.started);
        let reset_secs = self.window.saturating_sub(elapsed).as_secs().max(1);
        RateDecision {
            allowed,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.count),
            reset_secs,
        }
    }

    fn policy_header(&self) -> String {
        format!("{};w={}", self.max_requests, self.window.as_secs())
    }
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn apply_headers(response: &mut Response, decision: &RateDecision, policy: &str) {
    let headers = response.headers_mut();
    let state = format!(
        "limit={}, remaining={}, reset={}",
        decision.limit, decision.remaining, decision.reset_secs
    );
    if let Ok(value) = HeaderValue::from_str(&state) {
        headers.insert(HeaderName::from_static("ratelimit"), value);
    }
    if let Ok(value) = HeaderValue::from_str(policy) {
        headers.insert(HeaderName::from_static("ratelimit-policy"), value);
    }
}

pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let client = client_key(&request);
    let decision = state.limiter.check(&client);
    let policy = state.limiter.policy_header();
    if !decision.allowed {
        metrics::counter!("spotdesk_gateway_rate_limited_total").increment(1);
        tracing::debug!(%client, "rate limit exceeded");
        let mut response =
            api_rate_limited("Too many requests, please try again later.").into_response();
        apply_headers(&mut response, &decision, &policy);
        if let Ok(value) = HeaderValue::from_str(&decision.reset_secs.to_string()) {
            response
                .headers_mut()
                .insert(axum::http::header::RETRY_AFTER, value);
        }
        return response;
    }
    let mut response = next.run(request).await;
    apply_headers(&mut response, &decision, &policy);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            window_secs: 60,
            max_requests: max,
        })
    }

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let limiter = limiter(3);
        let now = Instant::now();
        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check_at("10.0.0.1", now);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }
        let rejected = limiter.check_at("10.0.0.1", now);
        assert!(!rejected.allowed);
        assert_eq!(rejected.remaining, 0);
    }

    #[test]
    fn clients_are_isolated() {
        let limiter = limiter(1);
        let now = Instant::now();
        assert!(limiter.check_at("10.0.0.1", now).allowed);
        assert!(!limiter.check_at("10.0.0.1", now).allowed);
        assert!(limiter.check_at("10.0.0.2", now).allowed);
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = limiter(1);
        let start = Instant::now();
        assert!(limiter.check_at("c", start).allowed);
        assert!(!limiter.check_at("c", start + Duration::from_secs(30)).allowed);
        let later = limiter.check_at("c", start + Duration::from_secs(61));
        assert!(later.allowed);
        assert_eq!(later.reset_secs, 60);
    }

    #[test]
    fn policy_header_shape() {
        assert_eq!(limiter(120).policy_header(), "120;w=60");
    }
}
