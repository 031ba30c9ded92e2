//! Injected Capabilities
//!
//! The request wrapper reports failures and redirects through these traits
//! instead of reaching for process-wide singletons.

use async_trait::async_trait;

/// Shows transient messages to the user
pub trait Notifier: Send + Sync {
    /// Display an error message
    fn error(&self, message: &str);
}

/// Performs client-side navigation
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Replace the current location with `location`
    async fn redirect(&self, location: &str);
}

/// Notifier that writes messages to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, message: &str) {
        tracing::error!(target: "openikt::notify", "{}", message);
    }
}

/// Notifier that prints messages to stderr, for terminal use
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn error(&self, message: &str) {
        eprintln!("error: {}", message);
    }
}

/// Navigator that only records the redirect in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

#[async_trait]
impl Navigator for NoopNavigator {
    async fn redirect(&self, location: &str) {
        tracing::debug!("Ignoring redirect to {}", location);
    }
}
