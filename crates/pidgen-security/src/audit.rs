//! ---
//! pid_section: "06-security-access-control"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Credential persistence, audit trail, and access control."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

use crate::credentials::Role;

const STATUS_MARKER: &str = " login status: ";

/// Entry recorded in the authentication audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogEntry {
    /// When the outcome was decided.
    pub timestamp: DateTime<FixedOffset>,
    /// Role the operation concerned.
    pub role: Role,
    /// Human-readable outcome.
    pub outcome: String,
}

impl AuditLogEntry {
    /// `<ISO timestamp> | <role> login status: <outcome text>`
    pub fn to_line(&self) -> String {
        format!(
            "{} | {}{}{}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.role,
            STATUS_MARKER,
            self.outcome
        )
    }

    /// Parse a line previously produced by [`AuditLogEntry::to_line`].
    pub fn parse_line(line: &str) -> Result<Self> {
        let (timestamp, rest) = line
            .split_once(" | ")
            .ok_or_else(|| anyhow!("audit line missing separator: {line}"))?;
        let (role, outcome) = rest
            .split_once(STATUS_MARKER)
            .ok_or_else(|| anyhow!("audit line missing status marker: {line}"))?;
        Ok(Self {
            timestamp: DateTime::parse_from_rfc3339(timestamp.trim())
                .with_context(|| format!("invalid audit timestamp '{timestamp}'"))?,
            role: role
                .trim()
                .parse()
                .map_err(|_| anyhow!("unknown audit role '{role}'"))?,
            outcome: outcome.to_owned(),
        })
    }
}

/// Append-only audit log, one line per authentication event.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Audit log at the given path. The file is created on first append.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a new entry to the log.
    pub fn append(&self, at: DateTime<Utc>, role: Role, outcome: &str) -> Result<AuditLogEntry> {
        let entry = AuditLogEntry {
            timestamp: at.fixed_offset(),
            role,
            outcome: outcome.replace(['\r', '\n'], " "),
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("unable to open audit log {}", self.path.display()))?;
        file.write_all(entry.to_line().as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(entry)
    }

    /// Read every entry back in write order.
    pub fn entries(&self) -> Result<Vec<AuditLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for line in BufReader::new(fs::File::open(&self.path)?).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(AuditLogEntry::parse_line(&line)?);
        }
        Ok(entries)
    }
}
