//! ---
//! pid_section: "14-licensing-system"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Trial license enforcement for enrollment."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! PIDGen licensing crate: the trial start-date persistence, the
//! fail-closed gate consulted before each enrollment, and its telemetry.

pub mod core;
pub mod logging;

pub use crate::core::{
    DenialReason, LicenseAuthority, LicenseError, LicenseGate, LicenseState, LicenseStatus,
    MockLicenseAuthority, TRIAL_WINDOW_DAYS,
};
