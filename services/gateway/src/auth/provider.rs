//! Identity provider client.
//!
//! # Purpose
//! Exchanges a caller's bearer credential for the provider's user record. The
//! hosted implementation calls `GET {url}/auth/v1/user` with the service key in
//! the `apikey` header and the caller's credential as the bearer token.
//!
//! # Notes
//! A provider refusal (401/403/404) is not an error: it means the credential
//! is invalid or expired and resolves to `None`.
use crate::config::IdentityConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifiedSubject {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("identity provider returned status {0}")]
    Status(u16),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<Option<VerifiedSubject>, IdentityError>;
}

#[derive(Debug, Clone)]
pub struct HostedIdentityProvider {
    client: reqwest::Client,
    user_url: String,
    service_key: String,
}

impl HostedIdentityProvider {
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder().timeout(VERIFY_TIMEOUT).build()?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: &IdentityConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            user_url: format!("{}/auth/v1/user", config.url.trim_end_matches('/')),
            service_key: config.service_key.clone(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HostedIdentityProvider {
    async fn verify(&self, credential: &str) -> Result<Option<VerifiedSubject>, IdentityError> {
        let response = self
            .client
            .get(&self.user_url)
            .header("apikey", &self.service_key)
            .bearer_auth(credential)
            .send()
            .await?;
        match response.status() {
            status if status.is_success() => Ok(Some(response.json().await?)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            status => Err(IdentityError::Status(status.as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use std::net::SocketAddr;

    async fn fake_user(headers: HeaderMap) -> axum::response::Response {
        use axum::response::IntoResponse;
        let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
        let auth = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        match (apikey, auth) {
            (Some("service-key"), Some("Bearer good")) => axum::Json(serde_json::json!({
                "id": "auth-1",
                "email": "admin@example.com",
                "aud": "authenticated"
            }))
            .into_response(),
            (Some("service-key"), Some("Bearer broken")) => {
                axum::http::StatusCode::BAD_GATEWAY.into_response()
            }
            _ => axum::http::StatusCode::UNAUTHORIZED.into_response(),
        }
    }

    async fn spawn_identity_backend() -> SocketAddr {
        let app = axum::Router::new().route("/auth/v1/user", axum::routing::get(fake_user));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app.into_make_service()).await;
        });
        addr
    }

    fn provider(addr: SocketAddr, key: &str) -> HostedIdentityProvider {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .no_proxy()
            .build()
            .expect("client");
        HostedIdentityProvider::with_client(
            &IdentityConfig {
                url: format!("http://{addr}/"),
                service_key: key.to_string(),
            },
            client,
        )
    }

    #[tokio::test]
    async fn verify_returns_subject_for_valid_credential() {
        let addr = spawn_identity_backend().await;
        let subject = provider(addr, "service-key")
            .verify("good")
            .await
            .expect("verify")
            .expect("subject");
        assert_eq!(subject.id, "auth-1");
        assert_eq!(subject.email.as_deref(), Some("admin@example.com"));
    }

    #[tokio::test]
    async fn verify_returns_none_when_rejected() {
        let addr = spawn_identity_backend().await;
        assert!(provider(addr, "service-key")
            .verify("expired")
            .await
            .expect("verify")
            .is_none());
        assert!(provider(addr, "wrong-key")
            .verify("good")
            .await
            .expect("verify")
            .is_none());
    }

    #[tokio::test]
    async fn verify_surfaces_backend_failures() {
        let addr = spawn_identity_backend().await;
        let err = provider(addr, "service-key")
            .verify("broken")
            .await
            .expect_err("502");
        assert!(matches!(err, IdentityError::Status(502)));
    }
}
