//! Error-tracking collaborator.
//!
//! Unexpected failures (store transport errors, identity backend outages,
//! handler panics) are handed to an [`ErrorReporter`] in addition to being
//! logged. The default reporter emits a structured event on the
//! `error_tracking` target and bumps a Prometheus counter, so a log shipper can
//! forward the events to whichever tracker the deployment uses.
use std::fmt::Display;

pub trait ErrorReporter: Send + Sync {
    fn capture(&self, context: &str, error: &dyn Display);
}

#[derive(Debug, Clone)]
pub struct TracingErrorReporter {
    environment: String,
    dsn_configured: bool,
}

impl TracingErrorReporter {
    pub fn new(environment: impl Into<String>, dsn: Option<&str>) -> Self {
        Self {
            environment: environment.into(),
            dsn_configured: dsn.is_some_and(|value| !value.is_empty()),
        }
    }

    pub fn is_forwarding(&self) -> bool {
        self.dsn_configured
    }
}

impl ErrorReporter for TracingErrorReporter {
    fn capture(&self, context: &str, error: &dyn Display) {
        tracing::error!(
            target: "error_tracking",
            environment = %self.environment,
            forwarding = self.dsn_configured,
            context,
            error = %error,
            "captured error"
        );
        metrics::counter!("spotdesk_gateway_errors_captured_total", "context" => context.to_string())
            .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarding_requires_non_empty_dsn() {
        assert!(!TracingErrorReporter::new("test", None).is_forwarding());
        assert!(!TracingErrorReporter::new("test", Some("")).is_forwarding());
        assert!(TracingErrorReporter::new("test", Some("https://key@errors.example/1")).is_forwarding());
    }

    #[test]
    fn capture_does_not_panic_without_subscriber() {
        let reporter = TracingErrorReporter::new("test", None);
        reporter.capture("unit", &"boom");
    }
}
