//! ---
//! pid_section: "06-security-access-control"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Credential persistence, audit trail, and access control."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Two-role access control for the enrollment pipeline: hashed credential
//! persistence, the append-only authentication audit trail, the secret
//! strength policy, and the login/lockout/override/rotation state machine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub mod access;
pub mod audit;
pub mod credentials;
pub mod metrics;
pub mod policy;

pub use access::{
    AccessController, AuthOutcome, Authorization, OverrideOutcome, RotationOutcome, UserState,
};
pub use audit::{AuditLog, AuditLogEntry};
pub use credentials::{
    AdminCredential, CredentialState, CredentialStore, Role, SecretDigest, UserCredential,
    DEFAULT_ADMIN_SECRET,
};
pub use metrics::SecurityMetrics;
pub use policy::{strength_violations, RolePolicy, StrengthViolation};

/// Infrastructure failures of the credential store.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// A credential file exists but could not be read.
    #[error("unable to read credential file {path}: {source}")]
    Read {
        /// Offending file.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
    /// A credential file could not be saved; the previous contents are intact.
    #[error("unable to persist credential file {path}: {source}")]
    Persist {
        /// Offending file.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
}
