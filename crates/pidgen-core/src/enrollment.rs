//! ---
//! pid_section: "01-core-functionality"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Enrollment coordination and installation lifecycle."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
//! License-gated enrollment.
//!
//! The primary store append is the binding event: everything before it can
//! abort without leaving a trace, everything after it is best effort and is
//! reported as a warning rather than undoing the issued record.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use pidgen_common::time::{age_on, Clock, SystemClock};
use pidgen_licensing::{DenialReason, LicenseAuthority, LicenseStatus};
use pidgen_logging::{log_system_event, pid_error, pid_info, pid_warn, LogContext, SystemEventOutcome};
use pidgen_persistence::{
    IdentifierAllocator, MediaRow, PatientRecord, PersistenceError, PrimaryRow, RecordStore,
};
use thiserror::Error;

use crate::intake::{RecordInput, ValidatedRecordInput, ValidationError};
use crate::render::{ArtifactRenderer, RenderError, RenderStyle, RenderedArtifact};

/// Failure that aborts an enrollment with nothing issued.
#[derive(Debug, Error)]
pub enum EnrollmentError {
    /// The primary store could not be scanned for allocation.
    #[error("identifier allocation failed: {0}")]
    Allocation(#[source] PersistenceError),
    /// Both render styles failed, or the standard style failed for a reason other than missing resources.
    #[error("card rendering failed: {0}")]
    Render(#[from] RenderError),
    /// The binding append to the primary store failed.
    #[error("primary record store append failed: {0}")]
    PrimaryAppend(#[source] PersistenceError),
}

/// Non-fatal problem encountered after, or on the way to, a successful issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentWarning {
    /// The standard style lacked resources; the fallback style was used.
    DegradedRender(String),
    /// The card could not be copied into the media directory; the media mirror was skipped.
    ArtifactCopyFailed {
        /// Copy destination.
        destination: PathBuf,
        /// Failure detail.
        reason: String,
    },
    /// The media store append failed.
    MediaAppendFailed(String),
}

impl fmt::Display for EnrollmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrollmentWarning::DegradedRender(reason) => {
                write!(f, "card rendered with fallback style ({reason})")
            }
            EnrollmentWarning::ArtifactCopyFailed {
                destination,
                reason,
            } => write!(
                f,
                "card not copied to {} ({reason}); media record skipped",
                destination.display()
            ),
            EnrollmentWarning::MediaAppendFailed(reason) => {
                write!(f, "media record not written ({reason})")
            }
        }
    }
}

/// Result of one enrollment.
#[derive(Debug)]
pub enum EnrollmentOutcome {
    /// Issued with every secondary step completed.
    Success(PatientRecord),
    /// Issued; the primary record is durable but some secondary step degraded.
    Degraded {
        /// The durably issued record.
        record: PatientRecord,
        /// What degraded.
        warnings: Vec<EnrollmentWarning>,
    },
    /// Intake validation failed; nothing changed.
    Rejected(Vec<ValidationError>),
    /// License gate closed; nothing was attempted.
    LicenseExpired(DenialReason),
    /// Aborted before or at the binding event; no identifier consumed.
    Fatal(EnrollmentError),
}

impl EnrollmentOutcome {
    /// Issued record, when the binding event succeeded.
    pub fn record(&self) -> Option<&PatientRecord> {
        match self {
            EnrollmentOutcome::Success(record) | EnrollmentOutcome::Degraded { record, .. } => {
                Some(record)
            }
            _ => None,
        }
    }

    /// True when a record was issued, degraded or not.
    pub fn is_issued(&self) -> bool {
        self.record().is_some()
    }
}

/// Drives one enrollment at a time over the configured stores.
#[derive(Debug)]
pub struct EnrollmentCoordinator<L, P, M, R, C = SystemClock> {
    license: L,
    primary: P,
    media: M,
    renderer: R,
    allocator: IdentifierAllocator,
    media_dir: PathBuf,
    clock: C,
}

impl<L, P, M, R, C> EnrollmentCoordinator<L, P, M, R, C>
where
    L: LicenseAuthority,
    P: RecordStore<Row = PrimaryRow>,
    M: RecordStore<Row = MediaRow>,
    R: ArtifactRenderer,
    C: Clock,
{
    /// Assemble a coordinator. `media_dir` receives copies of rendered cards.
    pub fn new(
        license: L,
        primary: P,
        media: M,
        renderer: R,
        allocator: IdentifierAllocator,
        media_dir: impl Into<PathBuf>,
        clock: C,
    ) -> Self {
        Self {
            license,
            primary,
            media,
            renderer,
            allocator,
            media_dir: media_dir.into(),
            clock,
        }
    }

    /// Primary Record Store.
    pub fn primary(&self) -> &P {
        &self.primary
    }

    /// Media Record Store.
    pub fn media(&self) -> &M {
        &self.media
    }

    /// Validate raw input against today and enroll it.
    pub fn submit(&mut self, input: &RecordInput) -> EnrollmentOutcome {
        match input.validate(self.clock.today()) {
            Ok(candidate) => self.enroll(candidate),
            Err(errors) => {
                pid_warn!(
                    context = LogContext::new().with_operation("enroll"),
                    "intake rejected with {} field error(s)",
                    errors.len()
                );
                EnrollmentOutcome::Rejected(errors)
            }
        }
    }

    /// Run the ordered enrollment protocol for a validated candidate.
    pub fn enroll(&mut self, candidate: ValidatedRecordInput) -> EnrollmentOutcome {
        let today = self.clock.today();

        if let LicenseStatus::Expired(reason) = self.license.check(today) {
            log_system_event(
                Some(&LogContext::new().with_operation("enroll")),
                "enrollment.license_expired",
                &reason.to_string(),
                SystemEventOutcome::Fault,
            );
            return EnrollmentOutcome::LicenseExpired(reason);
        }

        // Validation ran against the caller's notion of today.
        if candidate.dob() > today {
            return EnrollmentOutcome::Rejected(vec![ValidationError::DobInFuture(candidate.dob())]);
        }

        let id = match self.allocator.allocate(&self.primary) {
            Ok(id) => id,
            Err(err) => return self.abort(None, EnrollmentError::Allocation(err)),
        };

        let record = PatientRecord {
            id: id.clone(),
            name: candidate.name().to_owned(),
            dob: candidate.dob(),
            age: age_on(candidate.dob(), today),
            gender: candidate.gender(),
            care_of: candidate.care_of().to_owned(),
            phone: candidate.phone().to_owned(),
            registration_date: today,
            timestamp: self.clock.now().with_timezone(&Local).naive_local(),
        };

        let mut warnings = Vec::new();
        let artifact = match self.render(&record, &mut warnings) {
            Ok(artifact) => artifact,
            Err(err) => return self.abort(Some(&id), err.into()),
        };

        let row = PrimaryRow::new(&record, artifact.card_path.display().to_string());
        if let Err(err) = self.primary.append(row) {
            discard(&artifact.card_path);
            discard(&artifact.qr_path);
            return self.abort(Some(&id), EnrollmentError::PrimaryAppend(err));
        }
        pid_info!(
            context = LogContext::new().with_patient(&id).with_operation("enroll"),
            "record issued"
        );

        self.mirror(&record, &artifact, &mut warnings);
        discard(&artifact.qr_path);

        let ctx = LogContext::new().with_patient(&id).with_operation("enroll");
        if warnings.is_empty() {
            log_system_event(
                Some(&ctx),
                "enrollment.issued",
                "record issued",
                SystemEventOutcome::Success,
            );
            EnrollmentOutcome::Success(record)
        } else {
            for warning in &warnings {
                pid_warn!(context = ctx.clone(), "{warning}");
            }
            log_system_event(
                Some(&ctx),
                "enrollment.issued",
                "record issued with warnings",
                SystemEventOutcome::Degraded,
            );
            EnrollmentOutcome::Degraded { record, warnings }
        }
    }

    fn render(
        &self,
        record: &PatientRecord,
        warnings: &mut Vec<EnrollmentWarning>,
    ) -> Result<RenderedArtifact, RenderError> {
        match self.renderer.render(record, &record.id, RenderStyle::Standard) {
            Err(RenderError::ResourcesUnavailable(resource)) => {
                let reason = format!("missing {}", resource.display());
                let artifact = self
                    .renderer
                    .render(record, &record.id, RenderStyle::Fallback)?;
                warnings.push(EnrollmentWarning::DegradedRender(reason));
                Ok(artifact)
            }
            other => other,
        }
    }

    // Copy then mirror; a failed copy skips the media row.
    fn mirror(
        &mut self,
        record: &PatientRecord,
        artifact: &RenderedArtifact,
        warnings: &mut Vec<EnrollmentWarning>,
    ) {
        let destination = match artifact.card_path.file_name() {
            Some(name) => self.media_dir.join(name),
            None => self.media_dir.clone(),
        };
        let copied = fs::create_dir_all(&self.media_dir)
            .and_then(|()| fs::copy(&artifact.card_path, &destination));
        if let Err(err) = copied {
            warnings.push(EnrollmentWarning::ArtifactCopyFailed {
                destination,
                reason: err.to_string(),
            });
            return;
        }
        if let Err(err) = self.media.append(MediaRow::from(record)) {
            warnings.push(EnrollmentWarning::MediaAppendFailed(err.to_string()));
        }
    }

    fn abort(&self, id: Option<&str>, err: EnrollmentError) -> EnrollmentOutcome {
        let ctx = LogContext::new().with_operation("enroll");
        let ctx = match id {
            Some(id) => ctx.with_patient(id),
            None => ctx,
        };
        pid_error!(context = ctx.clone(), "enrollment aborted: {err}");
        log_system_event(
            Some(&ctx),
            "enrollment.aborted",
            "nothing issued",
            SystemEventOutcome::Fault,
        );
        EnrollmentOutcome::Fatal(err)
    }
}

fn discard(path: &Path) {
    let _ = fs::remove_file(path);
}
