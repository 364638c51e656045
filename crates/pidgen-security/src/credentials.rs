//! ---
//! pid_section: "06-security-access-control"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Credential persistence, audit trail, and access control."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use pidgen_common::fs::write_atomic;
use sha2::{Digest, Sha256};
use strum::{AsRefStr, Display, EnumString};
use tracing::{debug, warn};

use crate::policy::MAX_USER_ATTEMPTS;
use crate::SecurityError;

/// Secret installed for the Admin role on first run. Must be rotated.
pub const DEFAULT_ADMIN_SECRET: &str = "Admin@123";

/// The two operator roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive)]
pub enum Role {
    /// Day-to-day operator issuing identifiers.
    User,
    /// Supervisor owning both secrets.
    Admin,
}

/// Hex-encoded SHA-256 digest of a secret. Never holds the raw secret.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretDigest(String);

impl SecretDigest {
    /// Digest a candidate secret.
    pub fn of(secret: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Wrap a digest read back from disk.
    pub fn from_hex(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.len() == 64 && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(raw.to_ascii_lowercase()))
        } else {
            None
        }
    }

    /// True when `secret` digests to this value.
    pub fn matches(&self, secret: &str) -> bool {
        *self == Self::of(secret)
    }

    /// Hex form as persisted.
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretDigest(<redacted>)")
    }
}

/// Persisted User credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCredential {
    /// Digest of the current secret.
    pub secret_hash: SecretDigest,
    /// Last successful rotation; `None` forces a rotation.
    pub last_rotated: Option<DateTime<Utc>>,
    /// Consecutive failed logins, survives restarts.
    pub failed_attempts: u8,
}

impl UserCredential {
    /// Credential freshly (re)issued at `now`.
    pub fn issued(secret: &str, now: DateTime<Utc>) -> Self {
        Self {
            secret_hash: SecretDigest::of(secret),
            last_rotated: Some(now),
            failed_attempts: 0,
        }
    }

    /// Attempt bound reached.
    pub fn is_locked(&self) -> bool {
        self.failed_attempts >= MAX_USER_ATTEMPTS
    }
}

/// Persisted Admin credential. Lockout for Admin is session-scoped and not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredential {
    /// Digest of the current secret.
    pub secret_hash: SecretDigest,
}

/// Complete cross-session state, reloaded at start and written back after every mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialState {
    /// `None` until the first rotation issues a User secret.
    pub user: Option<UserCredential>,
    /// `None` only when the installation was never bootstrapped.
    pub admin: Option<AdminCredential>,
}

/// File-backed credential store.
///
/// The User file holds three ordered lines: digest, ISO-8601 rotation
/// timestamp, attempt count. The Admin file holds a single digest.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    user_path: PathBuf,
    admin_path: PathBuf,
}

impl CredentialStore {
    /// Store over the given User and Admin credential files.
    pub fn new(user_path: impl Into<PathBuf>, admin_path: impl Into<PathBuf>) -> Self {
        Self {
            user_path: user_path.into(),
            admin_path: admin_path.into(),
        }
    }

    /// Location of the User credential file.
    pub fn user_path(&self) -> &Path {
        &self.user_path
    }

    /// Location of the Admin credential file.
    pub fn admin_path(&self) -> &Path {
        &self.admin_path
    }

    /// Write the default Admin digest if no Admin credential exists yet.
    /// Returns true when the default was installed.
    pub fn ensure_admin_default(&self) -> Result<bool, SecurityError> {
        if self.admin_path.exists() {
            return Ok(false);
        }
        self.save_admin(&AdminCredential {
            secret_hash: SecretDigest::of(DEFAULT_ADMIN_SECRET),
        })?;
        warn!(path = %self.admin_path.display(), "installed default admin secret; rotate it");
        Ok(true)
    }

    /// Load both credentials.
    pub fn load(&self) -> Result<CredentialState, SecurityError> {
        Ok(CredentialState {
            user: self.load_user()?,
            admin: self.load_admin()?,
        })
    }

    fn load_user(&self) -> Result<Option<UserCredential>, SecurityError> {
        let Some(raw) = read_optional(&self.user_path)? else {
            return Ok(None);
        };
        let lines: Vec<&str> = raw.lines().map(str::trim).collect();
        if lines.len() < 3 {
            debug!(path = %self.user_path.display(), "user credential incomplete; treating as unset");
            return Ok(None);
        }
        let Some(secret_hash) = SecretDigest::from_hex(lines[0]) else {
            warn!(path = %self.user_path.display(), "user credential digest malformed; treating as unset");
            return Ok(None);
        };
        let last_rotated = parse_timestamp(lines[1]);
        if last_rotated.is_none() && !lines[1].is_empty() {
            warn!(path = %self.user_path.display(), "rotation timestamp unparsable; rotation required");
        }
        let failed_attempts = match lines[2].parse::<u8>() {
            Ok(count) => count.min(MAX_USER_ATTEMPTS),
            Err(_) => {
                warn!(path = %self.user_path.display(), "attempt counter unparsable; treating as locked");
                MAX_USER_ATTEMPTS
            }
        };
        Ok(Some(UserCredential {
            secret_hash,
            last_rotated,
            failed_attempts,
        }))
    }

    fn load_admin(&self) -> Result<Option<AdminCredential>, SecurityError> {
        let Some(raw) = read_optional(&self.admin_path)? else {
            return Ok(None);
        };
        Ok(SecretDigest::from_hex(&raw).map(|secret_hash| AdminCredential { secret_hash }))
    }

    /// Persist the User credential.
    pub fn save_user(&self, credential: &UserCredential) -> Result<(), SecurityError> {
        let timestamp = credential
            .last_rotated
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Micros, true))
            .unwrap_or_default();
        let body = format!(
            "{}\n{}\n{}",
            credential.secret_hash.as_hex(),
            timestamp,
            credential.failed_attempts
        );
        write_atomic(&self.user_path, body.as_bytes()).map_err(|source| SecurityError::Persist {
            path: self.user_path.clone(),
            source,
        })
    }

    /// Persist the Admin credential.
    pub fn save_admin(&self, credential: &AdminCredential) -> Result<(), SecurityError> {
        write_atomic(&self.admin_path, credential.secret_hash.as_hex().as_bytes()).map_err(
            |source| SecurityError::Persist {
                path: self.admin_path.clone(),
                source,
            },
        )
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, SecurityError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SecurityError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Accepts RFC 3339 and offset-less ISO-8601 (interpreted as local time).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
}
