//! Best-effort audit trail for privileged mutations.
//!
//! Every successful admin mutation appends an [`AuditEntry`]. Auditing never
//! fails the parent request: the first insert failure (typically a deployment
//! without the `audit_events` table) is logged, reported and switches the
//! recorder off for the rest of the process lifetime.
use crate::auth::Identity;
use crate::reporting::ErrorReporter;
use crate::store::{AuditEntry, GatewayStore};
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn GatewayStore>,
    reporter: Arc<dyn ErrorReporter>,
    supported: Arc<AtomicBool>,
}

impl AuditRecorder {
    pub fn new(
        store: Arc<dyn GatewayStore>,
        reporter: Arc<dyn ErrorReporter>,
        enabled: bool,
    ) -> Self {
        Self {
            store,
            reporter,
            supported: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.supported.load(Ordering::Relaxed)
    }

    pub async fn record(
        &self,
        action: &str,
        actor: Option<&Identity>,
        request_path: &str,
        payload: serde_json::Value,
    ) {
        if !self.is_enabled() {
            return;
        }
        let entry = AuditEntry {
            action: action.to_string(),
            actor_auth_user_id: actor.map(|identity| identity.subject_id.clone()),
            actor_app_user_id: actor.and_then(|identity| identity.app_user_id),
            request_path: request_path.to_string(),
            payload,
            created_at: Utc::now(),
        };
        match self.store.insert_audit(entry).await {
            Ok(()) => {
                metrics::counter!("spotdesk_audit_entries_total", "action" => action.to_string())
                    .increment(1);
            }
            Err(err) => {
                // Only the first failure is reported; later calls return early.
                if self.supported.swap(false, Ordering::SeqCst) {
                    tracing::warn!(error = %err, action, "audit insert failed, disabling audit trail");
                    self.reporter.capture("audit.insert", &err);
                }
            }
        }
    }
}
