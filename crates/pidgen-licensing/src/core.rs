//! ---
//! pid_section: "14-licensing-system"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Trial license enforcement for enrollment."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use pidgen_common::time::{format_dmy, parse_dmy};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::logging::{record_license_check, record_license_denied};

/// Length of the trial window counted from the recorded start date.
pub const TRIAL_WINDOW_DAYS: i64 = 300;

/// Errors raised while reading or initialising the license start date.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The license file could not be read or written.
    #[error("license file {path} is not accessible: {source}")]
    Io {
        /// Location of the license file.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
    /// The license file does not contain a `dd-mm-YYYY` date.
    #[error("license file {path} holds an unparsable start date '{raw}'")]
    Unparsable {
        /// Location of the license file.
        path: PathBuf,
        /// Raw file contents (trimmed).
        raw: String,
    },
}

/// Persisted trial state. Read-only once initialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LicenseState {
    /// First day of the trial.
    pub start_date: NaiveDate,
}

impl LicenseState {
    /// Last day on which enrollment is still permitted, or `None` when the
    /// window runs past the representable calendar.
    #[must_use]
    pub fn last_valid_day(&self) -> Option<NaiveDate> {
        self.start_date
            .checked_add_signed(Duration::days(TRIAL_WINDOW_DAYS))
    }

    /// `today > start + 300 days`; the boundary day itself is still licensed.
    /// A window that cannot be computed counts as expired.
    #[must_use]
    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.last_valid_day().map_or(true, |last| today > last)
    }

    /// Whole days until the last licensed day; negative once expired.
    #[must_use]
    pub fn days_remaining(&self, today: NaiveDate) -> Option<i64> {
        self.last_valid_day().map(|last| (last - today).num_days())
    }
}

/// Why the gate refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// The trial window has elapsed.
    WindowElapsed {
        /// Recorded trial start.
        start_date: NaiveDate,
        /// Last licensed day.
        last_valid_day: NaiveDate,
    },
    /// The license file is missing or unreadable.
    Unreadable(String),
    /// The license file does not hold a valid date.
    Unparsable(String),
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::WindowElapsed {
                start_date,
                last_valid_day,
            } => write!(
                f,
                "trial started {} expired after {}",
                format_dmy(*start_date),
                format_dmy(*last_valid_day)
            ),
            DenialReason::Unreadable(detail) => write!(f, "license unreadable: {detail}"),
            DenialReason::Unparsable(detail) => write!(f, "license unparsable: {detail}"),
        }
    }
}

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseStatus {
    /// Enrollment permitted.
    Active {
        /// State the decision was derived from.
        state: LicenseState,
        /// Whole days until the last licensed day.
        days_remaining: i64,
    },
    /// Enrollment refused; fail-closed.
    Expired(DenialReason),
}

impl LicenseStatus {
    /// Returns true when enrollment must be refused.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, LicenseStatus::Expired(_))
    }
}

/// Strategy consulted before each enrollment.
pub trait LicenseAuthority {
    /// Evaluate the license for the given civil date. Must not cache.
    fn check(&self, today: NaiveDate) -> LicenseStatus;
}

/// File-backed trial gate storing the start date as `dd-mm-YYYY`.
#[derive(Debug, Clone)]
pub struct LicenseGate {
    path: PathBuf,
}

impl LicenseGate {
    /// Gate backed by the given start-date file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the start-date file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `today` as the trial start unless a start date already exists.
    ///
    /// An existing file is never rewritten, even if it is unparsable; the gate
    /// then stays closed until an operator repairs it.
    pub fn initialize(&self, today: NaiveDate) -> Result<LicenseState, LicenseError> {
        if self.path.exists() {
            return self.load();
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
            }
        }
        fs::write(&self.path, format_dmy(today)).map_err(|source| self.io_error(source))?;
        info!(license_path = %self.path.display(), start_date = %format_dmy(today), "trial license initialised");
        Ok(LicenseState { start_date: today })
    }

    /// Read the persisted start date.
    pub fn load(&self) -> Result<LicenseState, LicenseError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        let trimmed = raw.trim();
        let unparsable = || LicenseError::Unparsable {
            path: self.path.clone(),
            raw: trimmed.to_owned(),
        };
        let start_date = parse_dmy(trimmed).map_err(|_| unparsable())?;
        let state = LicenseState { start_date };
        if state.last_valid_day().is_none() {
            return Err(unparsable());
        }
        Ok(state)
    }

    fn io_error(&self, source: io::Error) -> LicenseError {
        LicenseError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl LicenseAuthority for LicenseGate {
    fn check(&self, today: NaiveDate) -> LicenseStatus {
        record_license_check();
        let status = match self.load() {
            Ok(state) => match state.last_valid_day() {
                Some(last_valid_day) if today > last_valid_day => {
                    LicenseStatus::Expired(DenialReason::WindowElapsed {
                        start_date: state.start_date,
                        last_valid_day,
                    })
                }
                Some(last_valid_day) => LicenseStatus::Active {
                    state,
                    days_remaining: (last_valid_day - today).num_days(),
                },
                None => LicenseStatus::Expired(DenialReason::Unparsable(format!(
                    "trial window from {} is out of range",
                    format_dmy(state.start_date)
                ))),
            },
            Err(err @ LicenseError::Io { .. }) => {
                LicenseStatus::Expired(DenialReason::Unreadable(err.to_string()))
            }
            Err(err @ LicenseError::Unparsable { .. }) => {
                LicenseStatus::Expired(DenialReason::Unparsable(err.to_string()))
            }
        };
        match &status {
            LicenseStatus::Active { days_remaining, .. } => {
                debug!(days_remaining, "license active");
            }
            LicenseStatus::Expired(reason) => {
                record_license_denied(reason);
                warn!(reason = %reason, "license gate closed");
            }
        }
        status
    }
}

/// Mock authority returning a predetermined response, useful for tests and examples.
#[derive(Debug, Clone)]
pub struct MockLicenseAuthority {
    response: LicenseStatus,
}

impl MockLicenseAuthority {
    /// Construct a new mock authority.
    #[must_use]
    pub fn new(response: LicenseStatus) -> Self {
        Self { response }
    }

    /// Authority that always permits enrollment.
    #[must_use]
    pub fn active() -> Self {
        let start_date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default();
        Self::new(LicenseStatus::Active {
            state: LicenseState { start_date },
            days_remaining: TRIAL_WINDOW_DAYS,
        })
    }

    /// Authority that always refuses enrollment.
    #[must_use]
    pub fn expired() -> Self {
        Self::new(LicenseStatus::Expired(DenialReason::Unreadable(
            "mock license".to_owned(),
        )))
    }
}

impl LicenseAuthority for MockLicenseAuthority {
    fn check(&self, _today: NaiveDate) -> LicenseStatus {
        self.response.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(raw: &str) -> NaiveDate {
        parse_dmy(raw).unwrap()
    }

    #[test]
    fn boundary_day_is_licensed_and_next_day_is_not() {
        let dir = tempdir().unwrap();
        let gate = LicenseGate::new(dir.path().join("start_date.txt"));
        let start = date("01-01-2025");
        gate.initialize(start).unwrap();

        let boundary = start + Duration::days(300);
        assert!(matches!(
            gate.check(boundary),
            LicenseStatus::Active {
                days_remaining: 0,
                ..
            }
        ));
        assert!(matches!(
            gate.check(start + Duration::days(301)),
            LicenseStatus::Expired(DenialReason::WindowElapsed { .. })
        ));
    }

    #[test]
    fn initialize_keeps_existing_start_date() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("license").join("start_date.txt");
        let gate = LicenseGate::new(&path);
        gate.initialize(date("10-03-2025")).unwrap();
        let again = gate.initialize(date("10-09-2025")).unwrap();
        assert_eq!(again.start_date, date("10-03-2025"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "10-03-2025");
    }

    #[test]
    fn missing_or_garbled_file_fails_closed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("start_date.txt");
        let gate = LicenseGate::new(&path);
        assert!(matches!(
            gate.check(date("01-01-2025")),
            LicenseStatus::Expired(DenialReason::Unreadable(_))
        ));

        fs::write(&path, "2025/01/01").unwrap();
        assert!(matches!(
            gate.check(date("01-01-2025")),
            LicenseStatus::Expired(DenialReason::Unparsable(_))
        ));
    }

    #[test]
    fn start_date_at_calendar_edge_fails_closed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("start_date.txt");
        let gate = LicenseGate::new(&path);

        fs::write(&path, "31-12-+262142").unwrap();
        assert!(matches!(gate.load(), Err(LicenseError::Unparsable { .. })));
        assert!(matches!(
            gate.check(date("01-01-2025")),
            LicenseStatus::Expired(DenialReason::Unparsable(_))
        ));

        let edge = LicenseState {
            start_date: NaiveDate::MAX,
        };
        assert_eq!(edge.last_valid_day(), None);
        assert!(edge.is_expired_on(date("01-01-2025")));
        assert_eq!(edge.days_remaining(date("01-01-2025")), None);
    }

    #[test]
    fn check_reads_fresh_state_every_call() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("start_date.txt");
        let gate = LicenseGate::new(&path);
        gate.initialize(date("01-01-2025")).unwrap();
        assert!(!gate.check(date("02-01-2025")).is_expired());

        fs::write(&path, "01-01-2020").unwrap();
        assert!(gate.check(date("02-01-2025")).is_expired());
    }
}
