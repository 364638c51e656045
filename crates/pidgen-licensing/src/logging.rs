//! ---
//! pid_section: "14-licensing-system"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Trial license enforcement for enrollment."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use once_cell::sync::Lazy;
use prometheus::{register_int_counter, IntCounter};
use tracing::info;

use crate::core::DenialReason;

static LICENSE_CHECKS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "pidgen_license_checks_total",
        "Total number of license gate evaluations"
    )
    .expect("metric registration to succeed")
});

static LICENSE_DENIED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "pidgen_license_denied_total",
        "Total number of license gate evaluations that refused enrollment"
    )
    .expect("metric registration to succeed")
});

/// Record a gate evaluation.
pub fn record_license_check() {
    LICENSE_CHECKS_TOTAL.inc();
}

/// Record a refused gate evaluation.
pub fn record_license_denied(reason: &DenialReason) {
    LICENSE_DENIED_TOTAL.inc();
    info!(reason = %reason, "license rejected");
}

/// Snapshot of the process-wide counters as `(checks, denied)`.
pub fn license_counters() -> (u64, u64) {
    (LICENSE_CHECKS_TOTAL.get(), LICENSE_DENIED_TOTAL.get())
}
