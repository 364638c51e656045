//! ---
//! pid_section: "06-security-access-control"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Credential persistence, audit trail, and access control."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use prometheus::{IntCounter, Registry};
use std::sync::Arc;

/// Security metrics exported via Prometheus.
#[derive(Clone)]
pub struct SecurityMetrics {
    registry: Arc<Registry>,
    auth_attempts_total: IntCounter,
    auth_failures_total: IntCounter,
    lockouts_total: IntCounter,
}

impl SecurityMetrics {
    /// Register metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> anyhow::Result<Self> {
        let auth_attempts_total =
            IntCounter::new("pidgen_auth_attempts_total", "Total authentication attempts")?;
        let auth_failures_total = IntCounter::new(
            "pidgen_auth_failures_total",
            "Authentication attempts rejected for a wrong secret",
        )?;
        let lockouts_total = IntCounter::new(
            "pidgen_lockouts_total",
            "Lockouts triggered by exhausting the attempt bound",
        )?;

        registry.register(Box::new(auth_attempts_total.clone()))?;
        registry.register(Box::new(auth_failures_total.clone()))?;
        registry.register(Box::new(lockouts_total.clone()))?;

        Ok(Self {
            registry,
            auth_attempts_total,
            auth_failures_total,
            lockouts_total,
        })
    }

    /// Access the underlying registry.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Increment authentication attempts.
    pub fn inc_auth_attempt(&self) {
        self.auth_attempts_total.inc();
    }

    /// Increment authentication failures.
    pub fn inc_auth_failure(&self) {
        self.auth_failures_total.inc();
    }

    /// Increment lockouts.
    pub fn inc_lockout(&self) {
        self.lockouts_total.inc();
    }
}

impl std::fmt::Debug for SecurityMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityMetrics").finish_non_exhaustive()
    }
}
