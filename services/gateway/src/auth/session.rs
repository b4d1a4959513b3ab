//! Session resolution with a bounded authorization cache.
//!
//! # Purpose
//! Resolves a bearer credential into an [`Identity`]: verify the credential
//! with the identity provider, look up the caller's profile row and compare its
//! role with the configured privileged role.
//!
//! # Key invariants
//! - A cache entry is never served past its expiry.
//! - There is at most one entry per credential string.
//! - The cache never holds more than `max_entries` entries; inserts purge
//!   expired entries first, then evict the entry closest to expiry.
//! - A permission-denied profile lookup degrades to a non-privileged identity
//!   and is not cached.
//!
//! # Concurrency
//! Entries live in a `DashMap`. Two concurrent misses for the same credential
//! may both verify; the later insert wins.
use super::Identity;
use super::provider::{IdentityError, IdentityProvider};
use crate::reporting::ErrorReporter;
use crate::store::{GatewayStore, StoreError};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Provider(#[from] IdentityError),
    #[error("profile lookup failed: {0}")]
    Profile(#[from] StoreError),
}

#[derive(Debug, Clone)]
struct CachedIdentity {
    identity: Identity,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct AuthCache {
    entries: DashMap<String, CachedIdentity>,
    ttl: Duration,
    max_entries: usize,
}

impl AuthCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn get(&self, credential: &str) -> Option<Identity> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(credential)
            && entry.expires_at > now
        {
            return Some(entry.identity.clone());
        }
        self.entries
            .remove_if(credential, |_, entry| entry.expires_at <= now);
        None
    }

    pub fn insert(&self, credential: &str, identity: Identity) {
        if !self.entries.contains_key(credential) && self.entries.len() >= self.max_entries {
            self.make_room();
        }
        self.entries.insert(
            credential.to_string(),
            CachedIdentity {
                identity,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn invalidate(&self, credential: &str) -> bool {
        self.entries.remove(credential).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn make_room(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().expires_at)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                    metrics::counter!("spotdesk_auth_cache_evictions_total").increment(1);
                }
                None => break,
            }
        }
    }
}

#[derive(Clone)]
pub struct SessionResolver {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn GatewayStore>,
    cache: Arc<AuthCache>,
    privileged_role: String,
    reporter: Arc<dyn ErrorReporter>,
}

impl SessionResolver {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn GatewayStore>,
        cache: AuthCache,
        privileged_role: impl Into<String>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            provider,
            store,
            cache: Arc::new(cache),
            privileged_role: privileged_role.into(),
            reporter,
        }
    }

    pub fn cache(&self) -> &AuthCache {
        &self.cache
    }

    /// Resolve a credential. `Ok(None)` means the provider rejected it.
    pub async fn resolve(&self, credential: &str) -> Result<Option<Identity>, SessionError> {
        if let Some(identity) = self.cache.get(credential) {
            metrics::counter!("spotdesk_auth_cache_hits_total").increment(1);
            return Ok(Some(identity));
        }
        metrics::counter!("spotdesk_auth_cache_misses_total").increment(1);

        let subject = match self.provider.verify(credential).await {
            Ok(Some(subject)) => subject,
            Ok(None) => return Ok(None),
            Err(err) => {
                self.reporter.capture("session.verify", &err);
                return Err(err.into());
            }
        };

        match self.store.profile_by_auth_id(&subject.id).await {
            Ok(profile) => {
                let privileged = profile
                    .as_ref()
                    .and_then(|row| row.role.as_deref())
                    .is_some_and(|role| role == self.privileged_role);
                let identity = Identity {
                    subject_id: subject.id,
                    app_user_id: profile.as_ref().map(|row| row.user_id),
                    email: subject
                        .email
                        .or_else(|| profile.and_then(|row| row.email)),
                    privileged,
                };
                self.cache.insert(credential, identity.clone());
                Ok(Some(identity))
            }
            Err(StoreError::PermissionDenied(message)) => {
                tracing::debug!(subject = %subject.id, %message, "profile lookup denied, treating caller as unprivileged");
                Ok(Some(Identity {
                    subject_id: subject.id,
                    app_user_id: None,
                    email: subject.email,
                    privileged: false,
                }))
            }
            Err(err) => {
                self.reporter.capture("session.profile", &err);
                Err(err.into())
            }
        }
    }

    /// Drop the cached identity for a credential (sign-out).
    pub fn invalidate(&self, credential: &str) -> bool {
        self.cache.invalidate(credential)
    }

    /// Ensure a profile row exists for the caller, then refresh the cached
    /// identity so the new profile id is visible to later requests.
    pub async fn provision(
        &self,
        credential: &str,
        identity: &Identity,
    ) -> Result<Identity, SessionError> {
        if identity.app_user_id.is_some() {
            return Ok(identity.clone());
        }
        let profile = self
            .store
            .ensure_profile(&identity.subject_id, identity.email.as_deref())
            .await?;
        let refreshed = Identity {
            subject_id: identity.subject_id.clone(),
            app_user_id: Some(profile.user_id),
            email: identity.email.clone().or(profile.email),
            privileged: profile.role.as_deref() == Some(self.privileged_role.as_str()),
        };
        self.cache.insert(credential, refreshed.clone());
        Ok(refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::provider::VerifiedSubject;
    use crate::store::UserRow;
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentityProvider for CountingProvider {
        async fn verify(
            &self,
            credential: &str,
        ) -> Result<Option<VerifiedSubject>, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match credential {
                "admin-token" => Ok(Some(VerifiedSubject {
                    id: "auth-admin".to_string(),
                    email: Some("admin@example.com".to_string()),
                })),
                "user-token" => Ok(Some(VerifiedSubject {
                    id: "auth-user".to_string(),
                    email: None,
                })),
                "outage" => Err(IdentityError::Status(503)),
                _ => Ok(None),
            }
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        contexts: Mutex<Vec<String>>,
    }

    impl ErrorReporter for RecordingReporter {
        fn capture(&self, context: &str, _error: &dyn std::fmt::Display) {
            self.contexts.lock().expect("lock").push(context.to_string());
        }
    }

    fn identity(subject: &str) -> Identity {
        Identity {
            subject_id: subject.to_string(),
            app_user_id: None,
            email: None,
            privileged: false,
        }
    }

    async fn seeded_store() -> Arc<InMemoryStore> {
        let store = InMemoryStore::new();
        store
            .insert_user(UserRow {
                user_id: 1,
                auth_user_id: Some("auth-admin".to_string()),
                full_name: Some("Admin".to_string()),
                id_number: None,
                role: Some("admin".to_string()),
                account_status: Some("active".to_string()),
                email: None,
            })
            .await;
        store
            .insert_user(UserRow {
                user_id: 2,
                auth_user_id: Some("auth-user".to_string()),
                full_name: None,
                id_number: None,
                role: Some("user".to_string()),
                account_status: Some("active".to_string()),
                email: None,
            })
            .await;
        Arc::new(store)
    }

    fn resolver(
        store: Arc<InMemoryStore>,
        ttl: Duration,
    ) -> (SessionResolver, Arc<CountingProvider>, Arc<RecordingReporter>) {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let reporter = Arc::new(RecordingReporter::default());
        let resolver = SessionResolver::new(
            provider.clone(),
            store,
            AuthCache::new(ttl, 16),
            "admin",
            reporter.clone(),
        );
        (resolver, provider, reporter)
    }

    #[test]
    fn cache_is_bounded_and_evicts_closest_to_expiry() {
        let cache = AuthCache::new(Duration::from_secs(60), 2);
        cache.insert("a", identity("a"));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("b", identity("b"));
        cache.insert("c", identity("c"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn cache_never_serves_expired_entries() {
        let cache = AuthCache::new(Duration::from_millis(10), 4);
        cache.insert("a", identity("a"));
        assert!(cache.get("a").is_some());
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn reinserting_same_credential_keeps_one_entry() {
        let cache = AuthCache::new(Duration::from_secs(60), 1);
        cache.insert("a", identity("a"));
        cache.insert("a", identity("a2"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").expect("entry").subject_id, "a2");
    }

    #[tokio::test]
    async fn cached_credential_skips_provider() {
        let (resolver, provider, _) = resolver(seeded_store().await, Duration::from_secs(60));

        let first = resolver.resolve("admin-token").await.expect("resolve");
        assert!(first.expect("identity").privileged);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let second = resolver.resolve("admin-token").await.expect("resolve");
        assert_eq!(second.expect("identity").app_user_id, Some(1));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn uncached_credential_verifies_once_per_call() {
        let (resolver, provider, _) = resolver(seeded_store().await, Duration::from_millis(1));
        resolver.resolve("user-token").await.expect("resolve");
        tokio::time::sleep(Duration::from_millis(5)).await;
        resolver.resolve("user-token").await.expect("resolve");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_admin_role_is_not_privileged() {
        let (resolver, _, _) = resolver(seeded_store().await, Duration::from_secs(60));
        let identity = resolver
            .resolve("user-token")
            .await
            .expect("resolve")
            .expect("identity");
        assert!(!identity.privileged);
        assert_eq!(identity.app_user_id, Some(2));
    }

    #[tokio::test]
    async fn rejected_credential_resolves_to_none() {
        let (resolver, _, reporter) = resolver(seeded_store().await, Duration::from_secs(60));
        assert!(resolver.resolve("garbage").await.expect("resolve").is_none());
        assert!(resolver.cache().is_empty());
        assert!(reporter.contexts.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn provider_outage_is_reported() {
        let (resolver, _, reporter) = resolver(seeded_store().await, Duration::from_secs(60));
        let err = resolver.resolve("outage").await.expect_err("outage");
        assert!(matches!(err, SessionError::Provider(_)));
        assert_eq!(
            reporter.contexts.lock().expect("lock").as_slice(),
            ["session.verify"]
        );
    }

    #[tokio::test]
    async fn permission_denied_profile_lookup_is_unprivileged_and_uncached() {
        let store = seeded_store().await;
        store.deny_profile_reads();
        let (resolver, provider, reporter) = resolver(store, Duration::from_secs(60));
        let identity = resolver
            .resolve("admin-token")
            .await
            .expect("resolve")
            .expect("identity");
        assert!(!identity.privileged);
        assert!(resolver.cache().is_empty());
        assert!(reporter.contexts.lock().expect("lock").is_empty());

        resolver.resolve("admin-token").await.expect("resolve");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_reverification() {
        let (resolver, provider, _) = resolver(seeded_store().await, Duration::from_secs(60));
        resolver.resolve("admin-token").await.expect("resolve");
        assert!(resolver.invalidate("admin-token"));
        resolver.resolve("admin-token").await.expect("resolve");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn provision_creates_profile_for_unknown_subject() {
        let store = Arc::new(InMemoryStore::new());
        let (resolver, _, _) = resolver(store.clone(), Duration::from_secs(60));
        let identity = resolver
            .resolve("admin-token")
            .await
            .expect("resolve")
            .expect("identity");
        assert_eq!(identity.app_user_id, None);

        let provisioned = resolver
            .provision("admin-token", &identity)
            .await
            .expect("provision");
        assert!(provisioned.app_user_id.is_some());
        assert!(!provisioned.privileged);
        assert_eq!(
            resolver.cache().get("admin-token").expect("cached").app_user_id,
            provisioned.app_user_id
        );
    }
}
