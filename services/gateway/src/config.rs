use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "0.0.0.0:4000";
pub const DEFAULT_METRICS_BIND: &str = "0.0.0.0:9464";
pub const DEFAULT_PRIVILEGED_ROLE: &str = "admin";
pub const DEFAULT_AUTH_CACHE_TTL_SECS: u64 = 60;
pub const DEFAULT_AUTH_CACHE_MAX_ENTRIES: usize = 1024;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 120;
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_DATABASE_ACQUIRE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            other => bail!("unknown storage backend: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_ms: u64,
    pub acquire_timeout_ms: u64,
}

/// Hosted identity backend. Present only when both URL and service key are set.
#[derive(Clone, Deserialize)]
pub struct IdentityConfig {
    pub url: String,
    pub service_key: String,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("url", &self.url)
            .field("service_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
            max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthCacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for AuthCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_AUTH_CACHE_TTL_SECS,
            max_entries: DEFAULT_AUTH_CACHE_MAX_ENTRIES,
        }
    }
}

// Gateway configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub identity: Option<IdentityConfig>,
    pub privileged_role: String,
    pub auth_cache: AuthCacheConfig,
    pub rate_limit: RateLimitConfig,
    pub audit_enabled: bool,
    pub error_tracking_dsn: Option<String>,
    pub environment: String,
    pub classification_policy_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<StorageBackend>,
    postgres: Option<PostgresConfig>,
    identity: Option<IdentityConfig>,
    privileged_role: Option<String>,
    auth_cache_ttl_secs: Option<u64>,
    auth_cache_max_entries: Option<usize>,
    rate_limit_window_secs: Option<u64>,
    rate_limit_max_requests: Option<u32>,
    audit_enabled: Option<bool>,
    error_tracking_dsn: Option<String>,
    environment: Option<String>,
    classification_policy_path: Option<PathBuf>,
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(value) => value
            .parse()
            .map_err(|err| anyhow::anyhow!("parse {key}: {err}")),
        None => Ok(default),
    }
}

fn env_bool(key: &str, default: bool) -> Result<bool> {
    match env_opt(key) {
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => bail!("parse {key}: expected boolean, got {other}"),
        },
        None => Ok(default),
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_opt("SPOTDESK_GATEWAY_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse()
            .with_context(|| "parse SPOTDESK_GATEWAY_BIND")?;
        let metrics_bind = env_opt("SPOTDESK_GATEWAY_METRICS_BIND")
            .unwrap_or_else(|| DEFAULT_METRICS_BIND.to_string())
            .parse()
            .with_context(|| "parse SPOTDESK_GATEWAY_METRICS_BIND")?;
        let storage = env_parse("SPOTDESK_STORAGE_BACKEND", StorageBackend::Memory)?;
        let postgres = match env_opt("SPOTDESK_DATABASE_URL") {
            Some(url) => Some(PostgresConfig {
                url,
                max_connections: env_parse(
                    "SPOTDESK_DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                )?,
                connect_timeout_ms: env_parse(
                    "SPOTDESK_DATABASE_CONNECT_TIMEOUT_MS",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_MS,
                )?,
                acquire_timeout_ms: env_parse(
                    "SPOTDESK_DATABASE_ACQUIRE_TIMEOUT_MS",
                    DEFAULT_DATABASE_ACQUIRE_TIMEOUT_MS,
                )?,
            }),
            None => None,
        };
        let identity = match (
            env_opt("SPOTDESK_IDENTITY_URL"),
            env_opt("SPOTDESK_SERVICE_KEY"),
        ) {
            (Some(url), Some(service_key)) => Some(IdentityConfig { url, service_key }),
            _ => None,
        };
        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            identity,
            privileged_role: env_opt("SPOTDESK_PRIVILEGED_ROLE")
                .unwrap_or_else(|| DEFAULT_PRIVILEGED_ROLE.to_string()),
            auth_cache: AuthCacheConfig {
                ttl_secs: env_parse("SPOTDESK_AUTH_CACHE_TTL_SECS", DEFAULT_AUTH_CACHE_TTL_SECS)?,
                max_entries: env_parse(
                    "SPOTDESK_AUTH_CACHE_MAX_ENTRIES",
                    DEFAULT_AUTH_CACHE_MAX_ENTRIES,
                )?,
            },
            rate_limit: RateLimitConfig {
                window_secs: env_parse(
                    "SPOTDESK_RATE_LIMIT_WINDOW_SECS",
                    DEFAULT_RATE_LIMIT_WINDOW_SECS,
                )?,
                max_requests: env_parse(
                    "SPOTDESK_RATE_LIMIT_MAX_REQUESTS",
                    DEFAULT_RATE_LIMIT_MAX_REQUESTS,
                )?,
            },
            audit_enabled: env_bool("SPOTDESK_AUDIT_ENABLED", true)?,
            error_tracking_dsn: env_opt("SPOTDESK_ERROR_TRACKING_DSN"),
            environment: env_opt("SPOTDESK_ENVIRONMENT").unwrap_or_else(|| "development".into()),
            classification_policy_path: env_opt("SPOTDESK_CLASSIFICATION_POLICY").map(PathBuf::from),
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Some(path) = env_opt("SPOTDESK_GATEWAY_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read SPOTDESK_GATEWAY_CONFIG: {path}"))?;
            let override_cfg: GatewayConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse gateway config yaml")?;
            config.apply_override(override_cfg)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn apply_override(&mut self, override_cfg: GatewayConfigOverride) -> Result<()> {
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.storage {
            self.storage = value;
        }
        if let Some(value) = override_cfg.postgres {
            self.postgres = Some(value);
        }
        if let Some(value) = override_cfg.identity {
            self.identity = Some(value);
        }
        if let Some(value) = override_cfg.privileged_role {
            self.privileged_role = value;
        }
        if let Some(value) = override_cfg.auth_cache_ttl_secs {
            self.auth_cache.ttl_secs = value;
        }
        if let Some(value) = override_cfg.auth_cache_max_entries {
            self.auth_cache.max_entries = value;
        }
        if let Some(value) = override_cfg.rate_limit_window_secs {
            self.rate_limit.window_secs = value;
        }
        if let Some(value) = override_cfg.rate_limit_max_requests {
            self.rate_limit.max_requests = value;
        }
        if let Some(value) = override_cfg.audit_enabled {
            self.audit_enabled = value;
        }
        if let Some(value) = override_cfg.error_tracking_dsn {
            self.error_tracking_dsn = Some(value);
        }
        if let Some(value) = override_cfg.environment {
            self.environment = value;
        }
        if let Some(value) = override_cfg.classification_policy_path {
            self.classification_policy_path = Some(value);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.auth_cache.max_entries == 0 {
            bail!("auth cache max entries must be positive");
        }
        if self.rate_limit.window_secs == 0 || self.rate_limit.max_requests == 0 {
            bail!("rate limit window and max requests must be positive");
        }
        Ok(())
    }
}
