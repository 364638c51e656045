//! ---
//! pid_section: "03-persistence-logging"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Record store abstractions and storage bindings."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use std::sync::Arc;

use prometheus::{IntCounterVec, Opts, Registry};

use crate::Result;

/// Metrics published by the record stores.
#[derive(Clone)]
pub struct PersistenceMetrics {
    records_appended: IntCounterVec,
    append_failures: IntCounterVec,
    #[allow(dead_code)]
    registry: Arc<Registry>,
}

impl PersistenceMetrics {
    /// Register all persistence metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> Result<Self> {
        let records_appended = IntCounterVec::new(
            Opts::new(
                "pidgen_records_appended_total",
                "Rows durably appended to a record store",
            ),
            &["store"],
        )?;
        registry.register(Box::new(records_appended.clone()))?;

        let append_failures = IntCounterVec::new(
            Opts::new(
                "pidgen_record_append_failures_total",
                "Record store appends that failed to load or save",
            ),
            &["store"],
        )?;
        registry.register(Box::new(append_failures.clone()))?;

        Ok(Self {
            records_appended,
            append_failures,
            registry,
        })
    }

    /// Record a durable append to `store`.
    pub fn record_append(&self, store: &str) {
        self.records_appended.with_label_values(&[store]).inc();
    }

    /// Record a failed append to `store`.
    pub fn record_append_failure(&self, store: &str) {
        self.append_failures.with_label_values(&[store]).inc();
    }
}

impl std::fmt::Debug for PersistenceMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceMetrics").finish_non_exhaustive()
    }
}
